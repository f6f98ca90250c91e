//! Silence-driven edit-point engine.
//!
//! Turns an audio track into a sequence of edit points (kept and silent
//! spans), time-remaps each span's audio, and streams the result through an
//! output sink. The engine is media-framework agnostic: it consumes a raw
//! [`jumpcut_models::AudioBuffer`] and produces edit events; encoding,
//! muxing, and file layout belong to the sinks and the media layer.

pub mod engine;
pub mod error;
pub mod extract;
pub mod loudness;
pub mod remap;
pub mod section;
pub mod sinks;
pub mod stretch;

pub use engine::{EditProgress, EditSummary, Engine, ProgressFn};
pub use error::{EngineError, EngineResult, SectionParseError, SinkError, StretchError};
pub use extract::{dilate, extract_edit_points};
pub use loudness::{classify_loudness, LoudnessMap};
pub use remap::{RemappedChunk, TimeRemapper};
pub use section::{parse_sections, Section, SectionTracker};
pub use sinks::{EdlSink, EditSink, MappingLog};
pub use stretch::{TimeStretch, Wsola};
