//! Segment sequence normalization
//!
//! `merge_adjacent_text` is the single repair primitive for a slide's
//! segment list. Every structural mutation routes through it.

use super::manuscript::Segment;

/// Collapse consecutive text segments into one
///
/// Ruby segments pass through untouched. The result is never empty: an empty
/// input yields a single empty text segment. Idempotent.
pub fn merge_adjacent_text<I>(segments: I) -> Vec<Segment>
where
    I: IntoIterator<Item = Segment>,
{
    let mut merged: Vec<Segment> = Vec::new();
    for seg in segments {
        if let Segment::Text { content } = &seg {
            if let Some(Segment::Text { content: prev }) = merged.last_mut() {
                prev.push_str(content);
                continue;
            }
        }
        merged.push(seg);
    }
    if merged.is_empty() {
        merged.push(Segment::empty_text());
    }
    merged
}

/// True when both sequences have the same length and the same kind at every
/// index (content may differ)
pub fn same_structure(a: &[Segment], b: &[Segment]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.kind() == y.kind())
}

/// Sum of the model lengths of all segments
pub fn total_model_len(segments: &[Segment]) -> usize {
    segments.iter().map(Segment::model_len).sum()
}

/// Model text of `segments` between two model offsets (clamped)
pub fn model_text_between(segments: &[Segment], start: usize, end: usize) -> String {
    let (start, end) = if start <= end { (start, end) } else { (end, start) };
    segments
        .iter()
        .flat_map(|seg| seg.model_text().chars())
        .skip(start)
        .take(end - start)
        .collect()
}
