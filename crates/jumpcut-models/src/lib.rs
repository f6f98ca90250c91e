//! Shared data models for the jumpcut silence editor.
//!
//! This crate provides the plain types the editing pipeline is built on:
//! - Edit points and playback speed tables
//! - The in-memory audio buffer representation
//! - The immutable editing configuration bundle
//! - Frame/timecode conversion helpers

pub mod audio;
pub mod config;
pub mod edit_point;
pub mod timecode;

// Re-export common types
pub use audio::AudioBuffer;
pub use config::EditConfig;
pub use edit_point::{EditPoint, SpeedTable};
pub use timecode::{
    duration_to_frames, format_frame_timecode, parse_chapter_timecode, TimecodeError,
};
