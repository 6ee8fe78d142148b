//! Prompt croppers.
//!
//! Two strategies for bringing an over-budget prompt under its token
//! limit:
//!
//! - [`crop_by_boundary`]: excise whole turns from the middle of the
//!   sequence, so the removed region always starts and ends on a turn
//!   marker. Keeps the earliest context (anything before the first
//!   marker, typically the system prompt) and the most recent turns.
//! - [`crop_by_suffix`]: fallback that keeps the tokens closest to the
//!   end of the sequence, splitting text segments but never opaque ones.
//!
//! Both produce a fresh [`PromptSequence`]; the input is never mutated.

use thiserror::Error;
use tracing::{debug, info};

use crate::scanner::find_marker;
use crate::segment::{BoundaryMarker, Cursor, PromptSequence, Segment, TextSegment, Token};

/// Why boundary-aligned cropping could not reach the budget.
///
/// These are control-flow signals for the orchestrator, which falls
/// back to suffix cropping; they never escape the top-level entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CropError {
    /// The turn marker never occurs in the sequence.
    #[error("turn marker not found in prompt")]
    NoBoundaryFound,
    /// Removing every whole turn still leaves the prompt over budget.
    #[error("not enough turn boundaries to reach the budget")]
    InsufficientBoundaries,
}

/// Crop whole turns out of the middle of the sequence until it fits.
///
/// The excised region starts at the first marker occurrence (the
/// anchor) and advances one marked turn at a time, so no turn is ever
/// truncated mid-content. On failure the input is left untouched and
/// the caller is expected to fall back to [`crop_by_suffix`].
pub fn crop_by_boundary(
    sequence: &PromptSequence,
    total_tokens: usize,
    budget: usize,
    marker: &BoundaryMarker,
) -> Result<PromptSequence, CropError> {
    debug!("attempting crop at turn boundaries");

    let anchor = find_marker(sequence, marker, Cursor::START).ok_or(CropError::NoBoundaryFound)?;

    let mut frontier = anchor;
    let mut remaining = total_tokens;
    while remaining > budget {
        // Restart the search one marker length past the frontier so the
        // same occurrence is never matched twice.
        let resume = Cursor::new(frontier.segment, frontier.offset + marker.len());
        let next = find_marker(sequence, marker, resume)
            .ok_or(CropError::InsufficientBoundaries)?;
        remaining -= span_tokens(sequence, frontier, next);
        frontier = next;
    }

    let cropped = rebuild(sequence, anchor, frontier);
    info!(
        "cropped {} tokens at turn boundaries",
        total_tokens - remaining
    );
    Ok(cropped)
}

/// Tokens between two cursors, the left one lying in a text segment.
///
/// Opaque segments inside the span contribute their full weight; they
/// are part of the removed mass even though they are never scanned.
fn span_tokens(sequence: &PromptSequence, from: Cursor, to: Cursor) -> usize {
    if from.segment == to.segment {
        return to.offset - from.offset;
    }

    let segments = sequence.segments();
    let mut count = segments[from.segment].token_count() - from.offset;
    for segment in &segments[from.segment + 1..to.segment] {
        count += segment.token_count();
    }
    count + to.offset
}

/// Rebuild the sequence with the region between `anchor` and `frontier`
/// removed. Both cursors lie in text segments by construction.
fn rebuild(sequence: &PromptSequence, anchor: Cursor, frontier: Cursor) -> PromptSequence {
    let segments = sequence.segments();
    let mut result: Vec<Segment> = segments[..anchor.segment].to_vec();

    let mut head = text_tokens(&segments[anchor.segment])[..anchor.offset].to_vec();
    let tail = &text_tokens(&segments[frontier.segment])[frontier.offset..];

    if anchor.segment == frontier.segment {
        head.extend_from_slice(tail);
        push_text(&mut result, head);
    } else {
        push_text(&mut result, head);
        push_text(&mut result, tail.to_vec());
    }

    result.extend_from_slice(&segments[frontier.segment + 1..]);
    result.into()
}

fn text_tokens(segment: &Segment) -> &[Token] {
    match segment {
        Segment::Text(text) => &text.tokens,
        // Cursors produced by the scanner always point into text.
        Segment::Opaque(_) => unreachable!("cursor into opaque segment"),
    }
}

fn push_text(result: &mut Vec<Segment>, tokens: Vec<Token>) {
    if !tokens.is_empty() {
        result.push(Segment::Text(TextSegment::new(tokens)));
    }
}

/// Keep the trailing `budget` tokens of the sequence.
///
/// Scans backward, splitting text segments as needed. An opaque segment
/// that does not fit in the remaining budget is discarded along with
/// everything older than it: it cannot be partially represented, and
/// keeping earlier content past a dropped media item would leave a
/// dangling reference. Always succeeds; the result's total is at most
/// `budget`. If a single opaque segment outweighs the whole budget the
/// result may retain only the text after it, possibly nothing.
pub fn crop_by_suffix(sequence: &PromptSequence, budget: usize) -> PromptSequence {
    debug!("cropping to trailing {} tokens", budget);

    let mut kept: Vec<Segment> = Vec::new();
    let mut keep = budget;

    for segment in sequence.segments().iter().rev() {
        if keep == 0 {
            break;
        }
        match segment {
            Segment::Text(text) => {
                let take = text.len().min(keep);
                if take > 0 {
                    kept.push(Segment::text(text.tokens[text.len() - take..].to_vec()));
                    keep -= take;
                }
            }
            Segment::Opaque(opaque) => {
                if opaque.weight <= keep {
                    keep -= opaque.weight;
                    kept.push(segment.clone());
                } else {
                    // Atomic: cannot split, so this segment and all
                    // older content are dropped.
                    break;
                }
            }
        }
    }

    kept.reverse();
    let result: PromptSequence = kept.into();
    info!(
        "cropped {} tokens from prompt head",
        sequence.total_tokens() - result.total_tokens()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::MediaHandle;

    const M: Token = 9;

    fn marker() -> BoundaryMarker {
        BoundaryMarker::new(vec![M]).unwrap()
    }

    /// [text "SYS" | M turn-A M turn-B M turn-C] in a single segment.
    fn turns_in_one_segment() -> PromptSequence {
        let mut tokens = vec![1, 2, 3]; // system prefix
        for turn in [vec![10; 30], vec![11; 30], vec![12; 30]] {
            tokens.push(M);
            tokens.extend(turn);
        }
        vec![Segment::text(tokens)].into()
    }

    #[test]
    fn test_boundary_crop_keeps_prefix_and_tail() {
        let seq = turns_in_one_segment();
        let total = seq.total_tokens();
        assert_eq!(total, 96);

        let out = crop_by_boundary(&seq, total, 40, &marker()).unwrap();
        assert!(out.total_tokens() <= 40);

        // System prefix intact, cut starts at a marker, tail starts at one.
        let tokens = match &out.segments()[0] {
            Segment::Text(t) => &t.tokens,
            _ => panic!("expected text"),
        };
        assert_eq!(&tokens[..3], &[1, 2, 3]);
        assert_eq!(tokens[3], M);
        assert_eq!(tokens[4], 12); // turn C follows the kept marker
    }

    #[test]
    fn test_boundary_crop_across_segments_drops_opaque_in_span() {
        let seq: PromptSequence = vec![
            Segment::text(vec![1, 1, M, 10, 10]),
            Segment::opaque(40, MediaHandle(7)),
            Segment::text(vec![10, M, 12, 12]),
        ]
        .into();
        let total = seq.total_tokens();
        assert_eq!(total, 49);

        let out = crop_by_boundary(&seq, total, 10, &marker()).unwrap();
        // Excised: M 10 10 [opaque 40] 10 -> kept "1 1" + "M 12 12".
        let expected: PromptSequence = vec![
            Segment::text(vec![1, 1]),
            Segment::text(vec![M, 12, 12]),
        ]
        .into();
        assert_eq!(out, expected);
        assert_eq!(out.total_tokens(), 5);
    }

    #[test]
    fn test_boundary_crop_no_marker() {
        let seq: PromptSequence = vec![Segment::text(vec![1; 100])].into();
        let err = crop_by_boundary(&seq, 100, 50, &marker()).unwrap_err();
        assert_eq!(err, CropError::NoBoundaryFound);
    }

    #[test]
    fn test_boundary_crop_single_marker_cannot_reduce() {
        // One marker, no second occurrence: the pair search fails.
        let seq: PromptSequence = vec![Segment::text(vec![M, 1, 2, 3, 4, 5])].into();
        let err = crop_by_boundary(&seq, 6, 3, &marker()).unwrap_err();
        assert_eq!(err, CropError::InsufficientBoundaries);
    }

    #[test]
    fn test_boundary_crop_leaves_input_untouched_on_failure() {
        let seq: PromptSequence = vec![Segment::text(vec![M, 1, 2])].into();
        let before = seq.clone();
        let _ = crop_by_boundary(&seq, 3, 1, &marker());
        assert_eq!(seq, before);
    }

    #[test]
    fn test_boundary_crop_adjacent_markers() {
        // Back-to-back markers: each is found in turn, removing one
        // marker length per step.
        let seq: PromptSequence = vec![Segment::text(vec![M, M, M, 1, 1])].into();
        let out = crop_by_boundary(&seq, 5, 4, &marker()).unwrap();
        assert_eq!(out.total_tokens(), 4);
        let expected: PromptSequence = vec![Segment::text(vec![M, M, 1, 1])].into();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_boundary_crop_marker_longer_than_one_token() {
        let m = BoundaryMarker::new(vec![8, 9]).unwrap();
        let seq: PromptSequence =
            vec![Segment::text(vec![1, 8, 9, 10, 10, 10, 8, 9, 11])].into();
        let out = crop_by_boundary(&seq, 9, 5, &m).unwrap();
        let expected: PromptSequence = vec![Segment::text(vec![1, 8, 9, 11])].into();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_suffix_keeps_trailing_tokens() {
        let tokens: Vec<Token> = (0..100).collect();
        let seq: PromptSequence = vec![Segment::Text(TextSegment::new(tokens))].into();
        let out = crop_by_suffix(&seq, 50);
        assert_eq!(out.total_tokens(), 50);
        match &out.segments()[0] {
            Segment::Text(t) => assert_eq!(t.tokens, (50..100).collect::<Vec<_>>()),
            _ => panic!("expected text"),
        }
    }

    #[test]
    fn test_suffix_discards_unfitting_opaque_and_older() {
        let seq: PromptSequence = vec![
            Segment::text(vec![1; 10]),
            Segment::opaque(50, MediaHandle(0)),
            Segment::text(vec![2; 10]),
        ]
        .into();
        let out = crop_by_suffix(&seq, 30);
        // The image does not fit after the trailing text; it and the
        // older text are both dropped.
        let expected: PromptSequence = vec![Segment::text(vec![2; 10])].into();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_suffix_keeps_fitting_opaque_whole() {
        let seq: PromptSequence = vec![
            Segment::text(vec![1; 20]),
            Segment::opaque(5, MediaHandle(1)),
            Segment::text(vec![2; 10]),
        ]
        .into();
        let out = crop_by_suffix(&seq, 20);
        assert_eq!(out.total_tokens(), 20);
        assert_eq!(out.len(), 3);
        // Oldest text split down to the remaining budget.
        match &out.segments()[0] {
            Segment::Text(t) => assert_eq!(t.len(), 5),
            _ => panic!("expected text"),
        }
        assert!(matches!(out.segments()[1], Segment::Opaque(_)));
    }

    #[test]
    fn test_suffix_zero_budget() {
        let seq: PromptSequence = vec![Segment::text(vec![1, 2, 3])].into();
        let out = crop_by_suffix(&seq, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_suffix_oversized_opaque_alone() {
        let seq: PromptSequence = vec![Segment::opaque(100, MediaHandle(0))].into();
        let out = crop_by_suffix(&seq, 30);
        assert!(out.is_empty());
    }

    #[test]
    fn test_suffix_preserves_order() {
        let seq: PromptSequence = vec![
            Segment::text(vec![1, 2]),
            Segment::opaque(3, MediaHandle(0)),
            Segment::text(vec![3, 4]),
        ]
        .into();
        let out = crop_by_suffix(&seq, 7);
        assert_eq!(out, seq);
    }
}
