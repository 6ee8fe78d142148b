//! Budget orchestration.
//!
//! Decides, once per request, whether a rendered prompt fits the
//! context window and which cropper to apply when it does not. Pure
//! decision logic; no state survives the call.

use tracing::warn;

use crate::crop::{crop_by_boundary, crop_by_suffix};
use crate::segment::{BoundaryMarker, PromptSequence};

/// Fraction of the context window reserved for prompt content; the
/// rest is headroom for generation.
pub const DEFAULT_PROMPT_PROPORTION: f64 = 0.8;

/// The token budget a prompt may occupy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Budget {
    pub context_window: usize,
    pub prompt_proportion: f64,
}

impl Budget {
    pub fn new(context_window: usize, prompt_proportion: f64) -> Self {
        Self {
            context_window,
            prompt_proportion,
        }
    }

    /// Budget with the default prompt proportion.
    pub fn for_window(context_window: usize) -> Self {
        Self::new(context_window, DEFAULT_PROMPT_PROPORTION)
    }

    /// Maximum prompt tokens: `floor(context_window * proportion)`.
    pub fn max_tokens(&self) -> usize {
        (self.context_window as f64 * self.prompt_proportion) as usize
    }
}

/// Fit `sequence` into `budget`, cropping if necessary.
///
/// Returns the sequence unchanged when it already fits (the comparison
/// is inclusive). Otherwise tries boundary-aligned cropping and falls
/// back to suffix retention, which always succeeds. The returned
/// sequence satisfies the budget except in one documented case: a
/// single opaque segment whose weight alone exceeds the budget cannot
/// be reduced.
pub fn enforce_budget(
    sequence: PromptSequence,
    budget: &Budget,
    marker: &BoundaryMarker,
) -> PromptSequence {
    let limit = budget.max_tokens();
    let total = sequence.total_tokens();

    if total <= limit {
        return sequence;
    }

    warn!(
        "prompt is {} tokens, over the {} token budget ({} window x {}), cropping",
        total, limit, budget.context_window, budget.prompt_proportion
    );

    match crop_by_boundary(&sequence, total, limit, marker) {
        Ok(cropped) => cropped,
        Err(_) => crop_by_suffix(&sequence, limit),
    }
}
