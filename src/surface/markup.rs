//! Segment ⇄ surface conversion
//!
//! `render` turns a segment sequence into one top-level surface node per
//! segment, tagged with the segment index and kind. `parse` reads an
//! arbitrarily edited tree back into segments. Ruby-tagged nodes are never
//! re-derived from their rendered text: the parser reuses the prior segment
//! they were rendered from, so stray mutations inside a ruby cannot change
//! its base or reading.
//!
//! The markup dialect is XHTML-like (`<br/>`, quoted attributes) so that it
//! round-trips through an XML parser.

use quick_xml::escape::escape;
use thiserror::Error;

use super::node::{
    strip_markers, tagged_ruby, Element, SurfaceNode, ATTR_CONTENT_EDITABLE, ATTR_PLACEHOLDER,
    ATTR_SEGMENT_INDEX, ATTR_SEGMENT_TYPE,
};
use crate::models::{merge_adjacent_text, same_structure, Segment, SegmentKind};

/// Wrapper element used when parsing a markup fragment
const FRAGMENT_ROOT: &str = "surface";

#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("malformed surface markup: {0}")]
    Xml(#[from] roxmltree::Error),
}

/// Result of reading the surface back into the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub segments: Vec<Segment>,
    /// Segment count or any per-index kind differs from the prior sequence.
    /// When false the caller may skip re-rendering.
    pub structure_changed: bool,
}

// ============================================================================
// Rendering
// ============================================================================

/// Render segments into top-level surface nodes
pub fn render_nodes(segments: &[Segment]) -> Vec<SurfaceNode> {
    segments
        .iter()
        .enumerate()
        .map(|(index, seg)| render_segment(index, seg).into())
        .collect()
}

/// Render segments into surface markup
pub fn render(segments: &[Segment]) -> String {
    to_markup(&render_nodes(segments))
}

fn render_segment(index: usize, seg: &Segment) -> Element {
    let tagged = |tag: &str, kind: SegmentKind| {
        Element::new(tag)
            .with_attr(ATTR_SEGMENT_INDEX, index.to_string())
            .with_attr(ATTR_SEGMENT_TYPE, kind.as_str())
    };

    match seg {
        Segment::Text { content } => {
            let mut children: Vec<SurfaceNode> = Vec::new();
            for (i, line) in content.split('\n').enumerate() {
                if i > 0 {
                    children.push(Element::new("br").into());
                }
                if !line.is_empty() {
                    children.push(SurfaceNode::text(line));
                }
            }
            if children.is_empty() {
                // Keeps an empty segment focusable; contributes nothing when parsed
                children.push(Element::new("br").with_attr(ATTR_PLACEHOLDER, "true").into());
            }
            tagged("span", SegmentKind::Text).with_children(children)
        }
        Segment::Ruby { base, reading } => {
            let paren = |c: &str| -> SurfaceNode {
                Element::new("rp").with_children(vec![SurfaceNode::text(c)]).into()
            };
            let mut children: Vec<SurfaceNode> = Vec::new();
            if !base.is_empty() {
                children.push(SurfaceNode::text(base.as_str()));
            }
            children.push(paren("("));
            children.push(Element::new("rt").with_children(vec![SurfaceNode::text(reading.as_str())]).into());
            children.push(paren(")"));
            tagged("ruby", SegmentKind::Ruby)
                .with_attr(ATTR_CONTENT_EDITABLE, "false")
                .with_children(children)
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Read surface nodes back into a normalized segment sequence
pub fn parse_nodes(nodes: &[SurfaceNode], prior: &[Segment]) -> Vec<Segment> {
    collect_all(nodes, prior).0
}

/// Parse and report whether the segment structure changed
///
/// A ruby that now sits at a different index than its tag names (rubies
/// reordered on the surface) also counts as a structure change, since the
/// surface tags must be refreshed before the next parse.
pub fn parse_with_outcome(nodes: &[SurfaceNode], prior: &[Segment]) -> ParseOutcome {
    let (segments, ruby_tags) = collect_all(nodes, prior);
    let ruby_indices = segments
        .iter()
        .enumerate()
        .filter(|(_, seg)| seg.is_ruby())
        .map(|(index, _)| index);
    let retagged = !ruby_indices.eq(ruby_tags.iter().copied());
    let structure_changed = retagged || !same_structure(&segments, prior);
    ParseOutcome { segments, structure_changed }
}

/// Merged segments plus the tag index of every reused ruby, in order
fn collect_all(nodes: &[SurfaceNode], prior: &[Segment]) -> (Vec<Segment>, Vec<usize>) {
    let mut out = Vec::new();
    let mut ruby_tags = Vec::new();
    for node in nodes {
        collect_segments(node, prior, &mut out, &mut ruby_tags);
    }
    (merge_adjacent_text(out), ruby_tags)
}

/// Parse surface markup directly
pub fn parse_markup(markup: &str, prior: &[Segment]) -> Result<Vec<Segment>, MarkupError> {
    Ok(parse_nodes(&nodes_from_markup(markup)?, prior))
}

fn collect_segments(node: &SurfaceNode, prior: &[Segment], out: &mut Vec<Segment>, ruby_tags: &mut Vec<usize>) {
    match node {
        SurfaceNode::Text(text) => push_text(out, strip_markers(text)),
        SurfaceNode::Element(el) if el.is_ruby_tagged() => {
            // A tag pointing at something other than a prior ruby is dropped
            if let (Some(seg), Some((index, _))) = (tagged_ruby(el, prior), el.segment_tag()) {
                out.push(seg.clone());
                ruby_tags.push(index);
            } else {
                log::warn!("dropping ruby node with stale tag {:?}", el.attr(ATTR_SEGMENT_INDEX));
            }
        }
        SurfaceNode::Element(el) if el.is_line_break() => {
            if !el.is_placeholder_break() {
                push_text(out, "\n".to_string());
            }
        }
        SurfaceNode::Element(el) => {
            if el.is_block() {
                push_text(out, "\n".to_string());
            }
            for child in &el.children {
                collect_segments(child, prior, out, ruby_tags);
            }
        }
    }
}

fn push_text(out: &mut Vec<Segment>, content: String) {
    if !content.is_empty() {
        out.push(Segment::Text { content });
    }
}

// ============================================================================
// Markup text
// ============================================================================

/// Serialize nodes to markup
pub fn to_markup(nodes: &[SurfaceNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &SurfaceNode, out: &mut String) {
    match node {
        SurfaceNode::Text(text) => out.push_str(&escape(text.as_str())),
        SurfaceNode::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape(value.as_str()));
                out.push('"');
            }
            if el.children.is_empty() && el.is_line_break() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in &el.children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

/// Parse a markup fragment (any number of top-level nodes)
pub fn nodes_from_markup(markup: &str) -> Result<Vec<SurfaceNode>, MarkupError> {
    let wrapped = format!("<{FRAGMENT_ROOT}>{markup}</{FRAGMENT_ROOT}>");
    let doc = roxmltree::Document::parse(&wrapped)?;
    Ok(doc.root_element().children().filter_map(convert_node).collect())
}

fn convert_node(node: roxmltree::Node) -> Option<SurfaceNode> {
    if node.is_text() {
        return node.text().map(SurfaceNode::text);
    }
    if !node.is_element() {
        return None;
    }
    let mut el = Element::new(node.tag_name().name());
    for attr in node.attributes() {
        el.set_attr(attr.name(), attr.value());
    }
    el.children = node.children().filter_map(convert_node).collect();
    Some(el.into())
}
