//! Core data structures for the ruby slide editor
//!
//! A manuscript is an ordered list of slides; a slide is an ordered list of
//! segments. Segments alternate between plain text and atomic ruby
//! annotations (a base string glossed with a phonetic reading).

use serde::{Deserialize, Serialize};

use super::segments::merge_adjacent_text;

/// Discriminant of a [`Segment`], used for structural comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Text,
    Ruby,
}

impl SegmentKind {
    /// Value written to the surface `data-type` attribute
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Text => "text",
            SegmentKind::Ruby => "ruby",
        }
    }

    pub fn from_attr(value: &str) -> Option<Self> {
        match value {
            "text" => Some(SegmentKind::Text),
            "ruby" => Some(SegmentKind::Ruby),
            _ => None,
        }
    }
}

/// The atomic unit of a slide's content
///
/// A ruby segment is never split or edited in place: it is replaced whole
/// through the ruby operations on the document context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Segment {
    Text { content: String },
    Ruby { base: String, reading: String },
}

impl Segment {
    pub fn text(content: impl Into<String>) -> Self {
        Segment::Text { content: content.into() }
    }

    pub fn ruby(base: impl Into<String>, reading: impl Into<String>) -> Self {
        Segment::Ruby {
            base: base.into(),
            reading: reading.into(),
        }
    }

    pub fn empty_text() -> Self {
        Segment::Text { content: String::new() }
    }

    pub fn kind(&self) -> SegmentKind {
        match self {
            Segment::Text { .. } => SegmentKind::Text,
            Segment::Ruby { .. } => SegmentKind::Ruby,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Segment::Text { .. })
    }

    pub fn is_ruby(&self) -> bool {
        matches!(self, Segment::Ruby { .. })
    }

    /// The string that occupies model-offset space: text content, or the
    /// ruby base (a reading never contributes)
    pub fn model_text(&self) -> &str {
        match self {
            Segment::Text { content } => content,
            Segment::Ruby { base, .. } => base,
        }
    }

    /// Length in model-offset units (Unicode scalar values)
    pub fn model_len(&self) -> usize {
        self.model_text().chars().count()
    }
}

/// One projected slide
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    /// Never empty; see [`merge_adjacent_text`]
    pub segments: Vec<Segment>,

    /// Single key that jumps to this slide during projection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_binding: Option<String>,

    /// Font size override in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,

    /// Font color override (CSS color string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
}

impl Slide {
    /// A slide holding one empty text segment
    pub fn empty() -> Self {
        Self::from_segments(Vec::new())
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self::from_segments(vec![Segment::text(text)])
    }

    /// Build a slide, normalizing the segments through the merge invariant
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self {
            segments: merge_adjacent_text(segments),
            key_binding: None,
            font_size: None,
            font_color: None,
        }
    }

    /// Total model length of the slide
    pub fn model_len(&self) -> usize {
        self.segments.iter().map(Segment::model_len).sum()
    }

    /// Text contents and ruby bases concatenated
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(Segment::model_text).collect()
    }

    /// Re-apply the merge invariant. Returns true if anything changed.
    pub fn normalize(&mut self) -> bool {
        let before = self.segments.len();
        self.segments = merge_adjacent_text(std::mem::take(&mut self.segments));
        self.segments.len() != before
    }
}

impl Default for Slide {
    fn default() -> Self {
        Self::empty()
    }
}

/// A complete document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manuscript {
    pub title: String,
    /// RFC 3339 creation timestamp
    pub created: String,
    /// Never empty
    pub slides: Vec<Slide>,
}

impl Manuscript {
    /// A fresh manuscript with one empty slide, stamped with the current time
    pub fn new() -> Self {
        Self::with_created(now_rfc3339())
    }

    pub fn with_created(created: impl Into<String>) -> Self {
        Self {
            title: String::new(),
            created: created.into(),
            slides: vec![Slide::empty()],
        }
    }

    /// Build a manuscript from imported plain-text chunks, one slide each
    pub fn from_import(title: impl Into<String>, chunks: &[String]) -> Self {
        let mut manuscript = Self {
            title: title.into(),
            created: now_rfc3339(),
            slides: chunks.iter().map(|chunk| Slide::from_text(chunk.as_str())).collect(),
        };
        manuscript.normalize();
        manuscript
    }

    /// Repair a loaded or imported document in place
    ///
    /// An empty slide list gains one empty slide; every slide's segments are
    /// merged (which also turns an empty segment list into one empty text
    /// segment). Returns the number of repairs made.
    pub fn normalize(&mut self) -> usize {
        let mut repairs = 0;
        if self.slides.is_empty() {
            self.slides.push(Slide::empty());
            repairs += 1;
        }
        for slide in &mut self.slides {
            if slide.normalize() {
                repairs += 1;
            }
        }
        repairs
    }
}

impl Default for Manuscript {
    fn default() -> Self {
        Self::new()
    }
}

/// Current time as an RFC 3339 string
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
