//! Boundary scanner.
//!
//! Locates occurrences of the turn marker inside the token stream
//! implied by a run of segments, resuming from an arbitrary cursor.
//! Matching is a naive literal sub-sequence search; markers are short
//! and always rendered inside a single text segment, so nothing
//! fancier is needed.

use crate::segment::{BoundaryMarker, Cursor, PromptSequence, Segment, Token};

/// Find the first occurrence of `marker` at or after `from`.
///
/// Only text segments are scanned, in sequence order. A match must lie
/// entirely within one text segment; matches never span into or across
/// an opaque segment. Opaque segments are skipped with the offset reset
/// to 0. Returns the cursor of the match start, or `None` if the marker
/// does not occur before the sequence ends.
pub fn find_marker(
    sequence: &PromptSequence,
    marker: &BoundaryMarker,
    from: Cursor,
) -> Option<Cursor> {
    let mut offset = from.offset;

    for (index, segment) in sequence.segments().iter().enumerate().skip(from.segment) {
        if let Segment::Text(text) = segment {
            if let Some(pos) = find_in_tokens(&text.tokens, marker.tokens(), offset) {
                return Some(Cursor::new(index, pos));
            }
        }
        offset = 0;
    }

    None
}

/// Literal sub-sequence search within one token run, starting at `from`.
fn find_in_tokens(tokens: &[Token], marker: &[Token], from: usize) -> Option<usize> {
    // An offset at or past the end means no candidates in this run
    // (happens when the caller skips past a marker at the segment tail).
    if from >= tokens.len() || marker.len() > tokens.len() - from {
        return None;
    }
    tokens[from..]
        .windows(marker.len())
        .position(|w| w == marker)
        .map(|pos| from + pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::MediaHandle;

    fn marker(tokens: Vec<Token>) -> BoundaryMarker {
        BoundaryMarker::new(tokens).unwrap()
    }

    #[test]
    fn test_finds_marker_in_first_segment() {
        let seq: PromptSequence = vec![Segment::text(vec![1, 2, 9, 9, 3])].into();
        let found = find_marker(&seq, &marker(vec![9, 9]), Cursor::START);
        assert_eq!(found, Some(Cursor::new(0, 2)));
    }

    #[test]
    fn test_resumes_from_offset() {
        let seq: PromptSequence = vec![Segment::text(vec![9, 9, 1, 9, 9])].into();
        let m = marker(vec![9, 9]);
        assert_eq!(find_marker(&seq, &m, Cursor::START), Some(Cursor::new(0, 0)));
        assert_eq!(
            find_marker(&seq, &m, Cursor::new(0, 2)),
            Some(Cursor::new(0, 3))
        );
    }

    #[test]
    fn test_skips_opaque_segments() {
        let seq: PromptSequence = vec![
            Segment::text(vec![1, 2]),
            Segment::opaque(100, MediaHandle(0)),
            Segment::text(vec![9, 9, 4]),
        ]
        .into();
        let found = find_marker(&seq, &marker(vec![9, 9]), Cursor::START);
        assert_eq!(found, Some(Cursor::new(2, 0)));
    }

    #[test]
    fn test_no_match_across_segment_boundary() {
        // Marker 9,9 split across two text segments must not match.
        let seq: PromptSequence =
            vec![Segment::text(vec![1, 9]), Segment::text(vec![9, 2])].into();
        assert_eq!(find_marker(&seq, &marker(vec![9, 9]), Cursor::START), None);
    }

    #[test]
    fn test_offset_past_segment_end() {
        let seq: PromptSequence =
            vec![Segment::text(vec![1, 2]), Segment::text(vec![9, 9])].into();
        // Offset past the first segment's end: scan moves to the next segment.
        let found = find_marker(&seq, &marker(vec![9, 9]), Cursor::new(0, 5));
        assert_eq!(found, Some(Cursor::new(1, 0)));
    }

    #[test]
    fn test_candidate_near_end_does_not_overrun() {
        let seq: PromptSequence = vec![Segment::text(vec![1, 9])].into();
        assert_eq!(find_marker(&seq, &marker(vec![9, 9]), Cursor::START), None);
    }

    #[test]
    fn test_absent_marker() {
        let seq: PromptSequence = vec![Segment::text(vec![1, 2, 3])].into();
        assert_eq!(find_marker(&seq, &marker(vec![7]), Cursor::START), None);
    }
}
