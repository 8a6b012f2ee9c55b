//! Find and replace across slides
//!
//! Searches text contents and ruby bases; readings are never searched or
//! rewritten. Matches never span a segment boundary.

use super::DocumentContext;
use crate::models::Segment;

/// Non-overlapping occurrences of `query` in the segments
pub fn count_in_segments(segments: &[Segment], query: &str) -> usize {
    if query.is_empty() {
        return 0;
    }
    segments.iter().map(|seg| seg.model_text().matches(query).count()).sum()
}

/// Replace `query` in the segments
///
/// With `once`, only the first occurrence in the first segment containing
/// it is replaced. Returns `None` when nothing matched.
pub fn replace_in_segments(segments: &[Segment], query: &str, replacement: &str, once: bool) -> Option<Vec<Segment>> {
    if query.is_empty() {
        return None;
    }
    let mut replaced = false;
    let out = segments
        .iter()
        .map(|seg| {
            if replaced && once {
                return seg.clone();
            }
            if !seg.model_text().contains(query) {
                return seg.clone();
            }
            replaced = true;
            let rewrite = |s: &str| {
                if once {
                    s.replacen(query, replacement, 1)
                } else {
                    s.replace(query, replacement)
                }
            };
            match seg {
                Segment::Text { content } => Segment::text(rewrite(content.as_str())),
                Segment::Ruby { base, reading } => Segment::ruby(rewrite(base.as_str()), reading.as_str()),
            }
        })
        .collect();
    replaced.then_some(out)
}

impl DocumentContext {
    /// Occurrences of `query` across every slide
    pub fn count_matches(&self, query: &str) -> usize {
        self.slides()
            .iter()
            .map(|slide| count_in_segments(&slide.segments, query))
            .sum()
    }

    /// Replace the first occurrence in document order as one undo entry.
    /// Returns false if there was nothing to replace.
    pub fn replace_one(&mut self, query: &str, replacement: &str) -> bool {
        let found = self
            .slides()
            .iter()
            .enumerate()
            .find_map(|(i, slide)| replace_in_segments(&slide.segments, query, replacement, true).map(|s| (i, s)));
        let Some((slide, segments)) = found else {
            return false;
        };
        self.push_undo();
        self.store_segments(slide, segments);
        log::debug!("replaced one {:?} on slide {}", query, slide);
        true
    }

    /// Replace every occurrence on every slide as one undo entry. Returns
    /// the number of slides changed.
    pub fn replace_all(&mut self, query: &str, replacement: &str) -> usize {
        let updates: Vec<(usize, Vec<Segment>)> = self
            .slides()
            .iter()
            .enumerate()
            .filter_map(|(i, slide)| replace_in_segments(&slide.segments, query, replacement, false).map(|s| (i, s)))
            .collect();
        if updates.is_empty() {
            return 0;
        }
        self.push_undo();
        let changed = updates.len();
        for (slide, segments) in updates {
            self.store_segments(slide, segments);
        }
        log::info!("replaced {:?} with {:?} on {} slides", query, replacement, changed);
        changed
    }
}
