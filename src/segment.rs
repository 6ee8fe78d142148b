//! Prompt segment model.
//!
//! The typed representation of a rendered prompt: ordered runs of
//! already-tokenized text interleaved with atomic non-textual segments
//! (one per embedded media item). Croppers consume and rebuild these
//! values; they never mutate a segment in place.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// An opaque token identifier from the engine's vocabulary.
///
/// Equality-comparable only; no other semantics are known here.
pub type Token = u32;

/// Handle to a decoded media payload owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaHandle(pub u64);

/// A run of tokenized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSegment {
    pub tokens: Vec<Token>,
}

impl TextSegment {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Non-textual prompt content (e.g. one decoded image).
///
/// Carries only the number of context-window tokens it consumes and a
/// handle to the payload. Atomic: a crop keeps it whole or discards it
/// entirely, never partially.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueSegment {
    /// Context-window tokens this segment consumes.
    pub weight: usize,
    pub handle: MediaHandle,
}

impl OpaqueSegment {
    pub fn new(weight: usize, handle: MediaHandle) -> Self {
        Self { weight, handle }
    }
}

/// One unit of rendered prompt content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    Text(TextSegment),
    Opaque(OpaqueSegment),
}

impl Segment {
    pub fn text(tokens: Vec<Token>) -> Self {
        Self::Text(TextSegment::new(tokens))
    }

    pub fn opaque(weight: usize, handle: MediaHandle) -> Self {
        Self::Opaque(OpaqueSegment::new(weight, handle))
    }

    /// Context-window tokens this segment contributes.
    pub fn token_count(&self) -> usize {
        match self {
            Self::Text(t) => t.len(),
            Self::Opaque(o) => o.weight,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

/// Ordered list of segments making up one rendered prompt.
///
/// Invariant: concatenating the token streams of all segments in order
/// (an opaque segment contributing its weight but no queryable tokens)
/// yields exactly the prompt the engine will consume. Reordering is
/// never permitted; croppers only remove content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptSequence {
    segments: Vec<Segment>,
}

impl PromptSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total context-window tokens across all segments.
    pub fn total_tokens(&self) -> usize {
        self.segments.iter().map(Segment::token_count).sum()
    }
}

impl From<Vec<Segment>> for PromptSequence {
    fn from(segments: Vec<Segment>) -> Self {
        Self { segments }
    }
}

impl FromIterator<Segment> for PromptSequence {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

/// Position inside a [`PromptSequence`]: segment index plus intra-segment
/// token offset. Offsets are only meaningful inside text segments;
/// scanning skips opaque segments and resets the offset to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub segment: usize,
    pub offset: usize,
}

impl Cursor {
    /// Start of the sequence.
    pub const START: Cursor = Cursor {
        segment: 0,
        offset: 0,
    };

    pub fn new(segment: usize, offset: usize) -> Self {
        Self { segment, offset }
    }
}

/// The fixed token sub-sequence that delimits turns in the rendered
/// prompt (engine/template specific, e.g. the turn-start marker).
///
/// Validated non-empty at construction; an empty marker would match
/// everywhere and is a configuration mistake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Token>", into = "Vec<Token>")]
pub struct BoundaryMarker {
    tokens: Vec<Token>,
}

impl BoundaryMarker {
    pub fn new(tokens: Vec<Token>) -> Result<Self, ConfigError> {
        if tokens.is_empty() {
            return Err(ConfigError::EmptyMarker);
        }
        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() // always false by construction
    }
}

impl TryFrom<Vec<Token>> for BoundaryMarker {
    type Error = ConfigError;

    fn try_from(tokens: Vec<Token>) -> Result<Self, Self::Error> {
        Self::new(tokens)
    }
}

impl From<BoundaryMarker> for Vec<Token> {
    fn from(marker: BoundaryMarker) -> Self {
        marker.tokens
    }
}
