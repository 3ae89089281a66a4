// src/lib.rs
//! Core of an AR ruler.
//!
//! The user taps a live camera view to place two labeled markers on detected
//! surfaces and gets the distance between them. This crate drives one frame
//! at a time: it pulls a frame from a tracking session, updates markers and
//! lighting, and issues the ordered draw sequence against a GPU backend.
//! Tracking and the GPU itself are external and reached through traits.

pub mod anchors;
pub mod assets;
pub mod config;
pub mod error;
pub mod gpu;
pub mod input;
pub mod lighting;
pub mod orchestrator;
pub mod pose;
pub mod scene;
pub mod settings;
pub mod status;
pub mod surface;
pub mod tracking;
pub mod ui;

pub use self::error::{Error, Result};
pub use self::orchestrator::{FrameOrchestrator, FrameReport};
pub use self::pose::Pose;
