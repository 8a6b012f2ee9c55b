//! Automatic annotation
//!
//! The tokenizer that produces readings lives outside this crate, behind
//! [`Annotator`]. [`ReadingAligner`] holds the alignment rules such an
//! annotator needs to turn one token's surface form and reading into
//! segments where only kanji runs carry a ruby.

use thiserror::Error;

use super::{DocumentContext, DocumentError};
use crate::models::{merge_adjacent_text, Segment};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotateError {
    #[error("annotation failed: {0}")]
    Failed(String),
}

/// Converts plain text into annotated segments
pub trait Annotator {
    fn annotate(&mut self, text: &str) -> Result<Vec<Segment>, AnnotateError>;
}

impl<F> Annotator for F
where
    F: FnMut(&str) -> Result<Vec<Segment>, AnnotateError>,
{
    fn annotate(&mut self, text: &str) -> Result<Vec<Segment>, AnnotateError> {
        self(text)
    }
}

impl DocumentContext {
    /// Replace one slide with the annotator's output (recorded). Blank
    /// slides are skipped; returns whether the slide was annotated.
    pub fn annotate_slide(&mut self, annotator: &mut dyn Annotator, slide: usize) -> Result<bool, DocumentError> {
        let text = self.slide_plain_text(slide)?;
        if text.trim().is_empty() {
            return Ok(false);
        }
        let segments = annotator.annotate(&text)?;
        self.update_segments(slide, segments)?;
        Ok(true)
    }

    /// Annotate every non-blank slide as one undo entry
    ///
    /// A failure stops at the failing slide; slides already annotated keep
    /// their new content and the single undo entry reverts all of them.
    /// An all-blank manuscript is left alone with no undo entry.
    pub fn annotate_all(&mut self, annotator: &mut dyn Annotator) -> Result<usize, DocumentError> {
        let any_text = (0..self.slide_count())
            .any(|slide| self.slide_plain_text(slide).is_ok_and(|text| !text.trim().is_empty()));
        if !any_text {
            log::debug!("annotate_all: nothing to annotate");
            return Ok(0);
        }
        self.snapshot_for_undo();
        let mut annotated = 0;
        for slide in 0..self.slide_count() {
            let text = self.slide_plain_text(slide)?;
            if text.trim().is_empty() {
                continue;
            }
            let segments = annotator.annotate(&text).map_err(|err| {
                log::warn!("annotation of slide {} failed: {}", slide, err);
                err
            })?;
            self.update_segments_silent(slide, segments)?;
            annotated += 1;
        }
        log::info!("annotated {} slides", annotated);
        Ok(annotated)
    }
}

/// Kana/kanji alignment of a token's surface with its reading
pub struct ReadingAligner;

impl ReadingAligner {
    pub fn katakana_to_hiragana(input: &str) -> String {
        input
            .chars()
            .map(|c| match c as u32 {
                code @ 0x30A1..=0x30F6 => char::from_u32(code - 0x60).unwrap_or(c),
                _ => c,
            })
            .collect()
    }

    /// CJK unified ideographs and extension A
    pub fn is_kanji(c: char) -> bool {
        matches!(c as u32, 0x4E00..=0x9FFF | 0x3400..=0x4DBF)
    }

    pub fn contains_kanji(s: &str) -> bool {
        s.chars().any(Self::is_kanji)
    }

    /// Segments for one token: kana runs stay text, each kanji run gets the
    /// part of the reading between its kana anchors. Any mismatch falls back
    /// to one ruby over the whole token. Readings come out in hiragana.
    pub fn split_ruby(surface: &str, reading: &str) -> Vec<Segment> {
        let reading = Self::katakana_to_hiragana(reading);
        Self::align(surface, &reading).unwrap_or_else(|| vec![Segment::ruby(surface, reading)])
    }

    fn align(surface: &str, reading: &str) -> Option<Vec<Segment>> {
        let groups = group_by_kanji(surface);
        if groups.len() == 1 {
            return None;
        }

        let reading: Vec<char> = reading.chars().collect();
        let mut segments = Vec::new();
        let mut pos = 0;

        for (i, (is_kanji, run)) in groups.iter().enumerate() {
            if !is_kanji {
                // A kana run must appear literally in the reading
                let kana: Vec<char> = Self::katakana_to_hiragana(run).chars().collect();
                if reading.get(pos..pos + kana.len())? != kana.as_slice() {
                    return None;
                }
                segments.push(Segment::text(run.as_str()));
                pos += kana.len();
                continue;
            }

            let anchor = groups
                .get(i + 1)
                .filter(|(next_is_kanji, _)| !next_is_kanji)
                .map(|(_, next)| Self::katakana_to_hiragana(next).chars().collect::<Vec<char>>());

            // Every kanji run reads as at least one character
            let kanji_end = match anchor {
                Some(anchor) => (pos + 1..=reading.len().saturating_sub(anchor.len()))
                    .find(|&j| reading[j..j + anchor.len()] == anchor[..])?,
                None => reading.len(),
            };
            if kanji_end <= pos {
                return None;
            }
            let part: String = reading[pos..kanji_end].iter().collect();
            segments.push(Segment::ruby(run.as_str(), part));
            pos = kanji_end;
        }
        if pos != reading.len() {
            return None;
        }

        Some(merge_adjacent_text(segments))
    }
}

/// Alternating runs of kanji and non-kanji characters
fn group_by_kanji(s: &str) -> Vec<(bool, String)> {
    let mut groups: Vec<(bool, String)> = Vec::new();
    for c in s.chars() {
        let is_kanji = ReadingAligner::is_kanji(c);
        match groups.last_mut() {
            Some((last_kanji, run)) if *last_kanji == is_kanji => run.push(c),
            _ => groups.push((is_kanji, c.to_string())),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_katakana_to_hiragana() {
        assert_eq!(ReadingAligner::katakana_to_hiragana("イソガシイ"), "いそがしい");
        assert_eq!(ReadingAligner::katakana_to_hiragana("abc漢"), "abc漢");
    }

    #[test]
    fn test_split_ruby_mixed_token() {
        assert_eq!(
            ReadingAligner::split_ruby("お忙しい", "おいそがしい"),
            vec![Segment::text("お"), Segment::ruby("忙", "いそが"), Segment::text("しい")]
        );
    }

    #[test]
    fn test_split_ruby_all_kanji_is_one_ruby() {
        assert_eq!(ReadingAligner::split_ruby("漢字", "カンジ"), vec![Segment::ruby("漢字", "かんじ")]);
    }

    #[test]
    fn test_split_ruby_mismatch_falls_back() {
        assert_eq!(
            ReadingAligner::split_ruby("お忙しい", "ちがう"),
            vec![Segment::ruby("お忙しい", "ちがう")]
        );
    }

    #[test]
    fn test_split_ruby_trailing_kanji() {
        assert_eq!(
            ReadingAligner::split_ruby("お茶", "おちゃ"),
            vec![Segment::text("お"), Segment::ruby("茶", "ちゃ")]
        );
    }

    fn fake_annotator(text: &str) -> Result<Vec<Segment>, AnnotateError> {
        if text.contains('!') {
            return Err(AnnotateError::Failed("bad input".to_string()));
        }
        Ok(vec![Segment::ruby(text, "よみ")])
    }

    #[test]
    fn test_annotate_slide_is_recorded() {
        let mut ctx = DocumentContext::default();
        ctx.update_segments_silent(0, vec![Segment::text("猫")]).unwrap();
        let mut annotator = fake_annotator;
        assert_eq!(ctx.annotate_slide(&mut annotator, 0), Ok(true));
        assert_eq!(ctx.segments(0).unwrap(), &[Segment::ruby("猫", "よみ")]);
        assert_eq!(ctx.undo_depth(), 1);
    }

    #[test]
    fn test_annotate_skips_blank_slides() {
        let mut ctx = DocumentContext::default();
        ctx.update_segments_silent(0, vec![Segment::text("  ")]).unwrap();
        let mut annotator = fake_annotator;
        assert_eq!(ctx.annotate_slide(&mut annotator, 0), Ok(false));
        assert!(!ctx.can_undo());
    }

    #[test]
    fn test_annotate_all_is_one_undo_entry() {
        let mut ctx = DocumentContext::default();
        ctx.update_segments_silent(0, vec![Segment::text("猫")]).unwrap();
        ctx.add_slide(None);
        ctx.add_slide(None);
        ctx.update_segments_silent(2, vec![Segment::text("犬")]).unwrap();
        let depth = ctx.undo_depth();

        let mut annotator = fake_annotator;
        assert_eq!(ctx.annotate_all(&mut annotator), Ok(2));
        assert_eq!(ctx.undo_depth(), depth + 1);
        assert_eq!(ctx.segments(2).unwrap(), &[Segment::ruby("犬", "よみ")]);

        ctx.undo();
        assert_eq!(ctx.segments(0).unwrap(), &[Segment::text("猫")]);
        assert_eq!(ctx.segments(2).unwrap(), &[Segment::text("犬")]);
    }

    #[test]
    fn test_annotate_all_on_blank_manuscript_keeps_redo() {
        let mut ctx = DocumentContext::default();
        ctx.add_slide(None);
        ctx.undo();
        assert!(ctx.can_redo());

        let mut annotator = fake_annotator;
        assert_eq!(ctx.annotate_all(&mut annotator), Ok(0));
        assert!(!ctx.can_undo());
        assert!(ctx.can_redo());
    }

    #[test]
    fn test_annotator_error_propagates() {
        let mut ctx = DocumentContext::default();
        ctx.update_segments_silent(0, vec![Segment::text("oops!")]).unwrap();
        let mut annotator = fake_annotator;
        assert!(matches!(
            ctx.annotate_slide(&mut annotator, 0),
            Err(DocumentError::Annotate(AnnotateError::Failed(_)))
        ));
    }
}
