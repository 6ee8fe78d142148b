//! promptfit: token-budget enforcement for multimodal prompts.
//!
//! Given a rendered prompt (tokenized text runs interleaved with
//! atomic media segments) and a budget derived from the engine's
//! context window, decides whether the prompt fits and, if not,
//! produces a reduced sequence that does:
//! - Turn-aligned cropping excises whole turns from the middle,
//!   keeping the system prefix and the most recent turns.
//! - Suffix cropping is the fallback, keeping the trailing tokens.
//!
//! [`enforce_budget`] is the single entry point; [`InferenceRequest`]
//! covers the wire format the engine receives upstream.

pub mod budget;
pub mod config;
pub mod crop;
pub mod request;
pub mod scanner;
pub mod segment;

// Re-export key types
pub use budget::{enforce_budget, Budget, DEFAULT_PROMPT_PROPORTION};
pub use config::{Config, ConfigError};
pub use crop::{crop_by_boundary, crop_by_suffix, CropError};
pub use request::{ChatMessage, InferenceRequest, MediaPart, RequestError, Role};
pub use scanner::find_marker;
pub use segment::{
    BoundaryMarker, Cursor, MediaHandle, OpaqueSegment, PromptSequence, Segment, TextSegment,
    Token,
};
