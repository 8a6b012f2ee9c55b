//! Surface node tree
//!
//! A small DOM-like tree: elements carry a tag, ordered attributes and
//! children; text nodes carry a string. Nodes are addressed by a path of
//! child indices from the surface root.

use serde::{Deserialize, Serialize};

use crate::models::{Segment, SegmentKind};

/// Cursor-placement marker inserted after explicit line breaks
pub const ZERO_WIDTH_SPACE: char = '\u{200B}';

pub const ATTR_SEGMENT_INDEX: &str = "data-seg";
pub const ATTR_SEGMENT_TYPE: &str = "data-type";
pub const ATTR_PLACEHOLDER: &str = "data-placeholder";
pub const ATTR_CONTENT_EDITABLE: &str = "contenteditable";

/// Child indices from the surface root down to a node
pub type NodePath = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceNode {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<SurfaceNode>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_children(mut self, children: Vec<SurfaceNode>) -> Self {
        self.children = children;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    /// Segment index and kind this element was rendered from, if tagged
    pub fn segment_tag(&self) -> Option<(usize, SegmentKind)> {
        let kind = SegmentKind::from_attr(self.attr(ATTR_SEGMENT_TYPE)?)?;
        let index = self.attr(ATTR_SEGMENT_INDEX)?.parse().ok()?;
        Some((index, kind))
    }

    pub fn is_ruby_tagged(&self) -> bool {
        self.attr(ATTR_SEGMENT_TYPE) == Some(SegmentKind::Ruby.as_str())
    }

    pub fn is_line_break(&self) -> bool {
        self.tag.eq_ignore_ascii_case("br")
    }

    /// Break rendered only to keep an empty text segment focusable
    pub fn is_placeholder_break(&self) -> bool {
        self.is_line_break() && self.attr(ATTR_PLACEHOLDER).is_some()
    }

    /// Untagged `div`/`p` blocks start a new line (inserted by Enter or paste)
    pub fn is_block(&self) -> bool {
        (self.tag.eq_ignore_ascii_case("div") || self.tag.eq_ignore_ascii_case("p"))
            && self.attr(ATTR_SEGMENT_TYPE).is_none()
    }

    pub fn is_editable(&self) -> bool {
        self.attr(ATTR_CONTENT_EDITABLE) != Some("false")
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&SurfaceNode> {
        let (first, rest) = path.split_first()?;
        let child = self.children.get(*first)?;
        if rest.is_empty() {
            return Some(child);
        }
        child.as_element()?.node_at(rest)
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut SurfaceNode> {
        let (first, rest) = path.split_first()?;
        let child = self.children.get_mut(*first)?;
        if rest.is_empty() {
            return Some(child);
        }
        child.as_element_mut()?.node_at_mut(rest)
    }

    /// The element at `path`; the empty path is `self`
    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        if path.is_empty() {
            return Some(self);
        }
        self.node_at_mut(path)?.as_element_mut()
    }
}

impl SurfaceNode {
    pub fn text(content: impl Into<String>) -> Self {
        SurfaceNode::Text(content.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            SurfaceNode::Element(el) => Some(el),
            SurfaceNode::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            SurfaceNode::Element(el) => Some(el),
            SurfaceNode::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SurfaceNode::Text(text) => Some(text),
            SurfaceNode::Element(_) => None,
        }
    }

    /// Model text length: visible characters, one unit per line break, zero
    /// for placeholder breaks and cursor markers. A ruby-tagged element counts
    /// its segment's base length, looked up in `segments` by its tag.
    pub fn model_len(&self, segments: &[Segment]) -> usize {
        match self {
            SurfaceNode::Text(text) => visible_len(text),
            SurfaceNode::Element(el) if el.is_ruby_tagged() => ruby_base_len(el, segments),
            SurfaceNode::Element(el) if el.is_line_break() => usize::from(!el.is_placeholder_break()),
            SurfaceNode::Element(el) => {
                usize::from(el.is_block()) + el.children.iter().map(|c| c.model_len(segments)).sum::<usize>()
            }
        }
    }
}

impl From<Element> for SurfaceNode {
    fn from(el: Element) -> Self {
        SurfaceNode::Element(el)
    }
}

/// The prior ruby segment a ruby-tagged element stands for
pub fn tagged_ruby<'a>(el: &Element, segments: &'a [Segment]) -> Option<&'a Segment> {
    let (index, _) = el.segment_tag()?;
    segments.get(index).filter(|seg| seg.is_ruby())
}

fn ruby_base_len(el: &Element, segments: &[Segment]) -> usize {
    tagged_ruby(el, segments).map_or(0, Segment::model_len)
}

pub fn strip_markers(text: &str) -> String {
    text.chars().filter(|&c| c != ZERO_WIDTH_SPACE).collect()
}

pub fn visible_len(text: &str) -> usize {
    text.chars().filter(|&c| c != ZERO_WIDTH_SPACE).count()
}

/// Number of visible characters among the first `offset` characters
pub fn visible_prefix_len(text: &str, offset: usize) -> usize {
    text.chars().take(offset).filter(|&c| c != ZERO_WIDTH_SPACE).count()
}

/// Character offset just after the `visible`-th visible character (clamped)
pub fn raw_offset_for_visible(text: &str, visible: usize) -> usize {
    if visible == 0 {
        return 0;
    }
    let mut seen = 0;
    for (index, c) in text.chars().enumerate() {
        if c != ZERO_WIDTH_SPACE {
            seen += 1;
            if seen == visible {
                return index + 1;
            }
        }
    }
    text.chars().count()
}
