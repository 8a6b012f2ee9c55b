//! Ruby operations
//!
//! Rubies are created, replaced and removed only here, always as whole
//! segments and always as recorded mutations.

use super::{DocumentContext, DocumentError};
use crate::models::{merge_adjacent_text, Segment};

impl DocumentContext {
    /// Turn the model range `start..end` of a slide into a ruby
    ///
    /// The range must lie inside one text segment; that segment is split into
    /// `before | ruby | after`, dropping empty parts.
    pub fn add_ruby(
        &mut self,
        slide: usize,
        start: usize,
        end: usize,
        base: &str,
        reading: &str,
    ) -> Result<(), DocumentError> {
        if base.is_empty() {
            return Err(DocumentError::EmptyRubyBase);
        }
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        let segments = split_for_ruby(self.segments(slide)?, start, end, base, reading)
            .ok_or(DocumentError::SelectionNotInText { start, end })?;
        log::debug!("ruby {:?} added to slide {} at {}..{}", base, slide, start, end);
        self.update_segments(slide, segments)
    }

    /// Replace an existing ruby segment
    pub fn edit_ruby(
        &mut self,
        slide: usize,
        segment: usize,
        base: &str,
        reading: &str,
    ) -> Result<(), DocumentError> {
        if base.is_empty() {
            return Err(DocumentError::EmptyRubyBase);
        }
        let mut segments = self.segments(slide)?.to_vec();
        match segments.get(segment) {
            Some(seg) if seg.is_ruby() => {}
            Some(_) => return Err(DocumentError::NotRuby { index: segment }),
            None => {
                return Err(DocumentError::SegmentOutOfRange {
                    index: segment,
                    count: segments.len(),
                })
            }
        }
        segments[segment] = Segment::ruby(base, reading);
        self.update_segments(slide, segments)
    }

    /// Convert every ruby on a slide back to its base text
    pub fn remove_all_ruby(&mut self, slide: usize) -> Result<(), DocumentError> {
        let segments: Vec<Segment> = self
            .segments(slide)?
            .iter()
            .map(|seg| match seg {
                Segment::Ruby { base, .. } => Segment::text(base.as_str()),
                text => text.clone(),
            })
            .collect();
        self.update_segments(slide, merge_adjacent_text(segments))
    }

    /// Text contents and ruby bases concatenated
    pub fn slide_plain_text(&self, slide: usize) -> Result<String, DocumentError> {
        Ok(self.slide(slide)?.plain_text())
    }
}

/// Split the text segment containing model range `start..end` around a new
/// ruby. `None` when no single text segment contains the range.
fn split_for_ruby(segments: &[Segment], start: usize, end: usize, base: &str, reading: &str) -> Option<Vec<Segment>> {
    let mut out = Vec::with_capacity(segments.len() + 2);
    let mut seg_start = 0;
    let mut handled = false;

    for seg in segments {
        let seg_end = seg_start + seg.model_len();
        match seg {
            Segment::Text { content } if !handled && start >= seg_start && end <= seg_end => {
                let before: String = content.chars().take(start - seg_start).collect();
                let after: String = content.chars().skip(end - seg_start).collect();
                if !before.is_empty() {
                    out.push(Segment::text(before));
                }
                out.push(Segment::ruby(base, reading));
                if !after.is_empty() {
                    out.push(Segment::text(after));
                }
                handled = true;
            }
            other => out.push(other.clone()),
        }
        seg_start = seg_end;
    }

    handled.then_some(out)
}
