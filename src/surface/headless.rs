//! In-memory editable surface
//!
//! Behaves like a browser editable region reduced to what the controller
//! observes: a node tree, a selection and a focus flag. Typing and deletion
//! go through the same primitives a live region applies, so sync tests
//! exercise real uncontrolled edits.

use super::editing;
use super::markup::nodes_from_markup;
use super::node::{Element, SurfaceNode, ATTR_SEGMENT_INDEX, ATTR_SEGMENT_TYPE};
use super::offsets::{to_model_offset, to_surface_position};
use super::position::{SurfacePosition, SurfaceRange};
use super::{EditableSurface, MarkupError};
use crate::models::Segment;

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessSurface {
    root: Element,
    selection: Option<SurfaceRange>,
    focused: bool,
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self {
            root: Element::new("div"),
            selection: None,
            focused: false,
        }
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    /// Put the caret at a model offset of the rendered `segments`
    pub fn place_caret(&mut self, segments: &[Segment], offset: usize) {
        let pos = to_surface_position(&self.root, segments, offset);
        self.set_caret(pos);
    }

    /// Select between two model offsets (anchor, focus)
    pub fn select_model_range(&mut self, segments: &[Segment], anchor: usize, focus: usize) {
        let anchor = to_surface_position(&self.root, segments, anchor);
        let focus = to_surface_position(&self.root, segments, focus);
        self.set_selection(Some(SurfaceRange::new(anchor, focus)));
    }

    /// Select a raw surface range
    pub fn select(&mut self, anchor: SurfacePosition, focus: SurfacePosition) {
        self.set_selection(Some(SurfaceRange::new(anchor, focus)));
    }

    pub fn type_text(&mut self, text: &str) -> bool {
        self.insert_text(text)
    }

    /// Backspace: delete the selection, or the unit before the caret
    ///
    /// A ruby before the caret is deleted whole.
    pub fn delete_backward(&mut self, segments: &[Segment]) -> bool {
        self.delete_unit(segments, unit_before)
    }

    /// Delete key: delete the selection, or the unit after the caret
    pub fn delete_forward(&mut self, segments: &[Segment]) -> bool {
        self.delete_unit(segments, unit_after)
    }

    fn delete_unit(&mut self, segments: &[Segment], unit: fn(&[Segment], usize) -> Option<(usize, usize)>) -> bool {
        let Some(range) = self.selection.clone() else {
            return false;
        };
        if !range.is_collapsed() {
            return self.delete_contents().is_some();
        }
        let caret = to_model_offset(&self.root, segments, &range.focus);
        let Some((start, end)) = unit(segments, caret) else {
            return false;
        };
        let range = SurfaceRange::new(
            to_surface_position(&self.root, segments, start),
            to_surface_position(&self.root, segments, end),
        );
        let caret = editing::delete_contents(&mut self.root, &range);
        self.set_caret(caret);
        true
    }

    /// Paste a markup fragment at the caret, replacing the selection
    ///
    /// Pasted nodes are foreign content: segment tags are stripped so a
    /// pasted ruby can never alias an existing segment.
    pub fn paste_markup(&mut self, fragment: &str) -> Result<bool, MarkupError> {
        let mut nodes = nodes_from_markup(fragment)?;
        nodes.iter_mut().for_each(strip_segment_tags);

        if self.selection.as_ref().is_some_and(|range| !range.is_collapsed()) {
            self.delete_contents();
        }
        if self.selection.is_none() {
            return Ok(false);
        }
        for node in nodes {
            match node {
                SurfaceNode::Text(text) => {
                    self.insert_text(&text);
                }
                element => {
                    self.insert_node(element);
                }
            }
        }
        Ok(true)
    }
}

impl EditableSurface for HeadlessSurface {
    fn root(&self) -> &Element {
        &self.root
    }

    fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    fn selection(&self) -> Option<&SurfaceRange> {
        self.selection.as_ref()
    }

    fn set_selection(&mut self, range: Option<SurfaceRange>) {
        self.selection = range;
    }

    fn is_focused(&self) -> bool {
        self.focused
    }
}

/// Model span of the unit ending at `offset`: one character, or a whole ruby
fn unit_before(segments: &[Segment], offset: usize) -> Option<(usize, usize)> {
    let mut start = 0;
    for seg in segments {
        let end = start + seg.model_len();
        if start < offset && offset <= end {
            return Some(if seg.is_ruby() { (start, end) } else { (offset - 1, offset) });
        }
        start = end;
    }
    None
}

fn unit_after(segments: &[Segment], offset: usize) -> Option<(usize, usize)> {
    let mut start = 0;
    for seg in segments {
        let end = start + seg.model_len();
        if start <= offset && offset < end {
            return Some(if seg.is_ruby() { (start, end) } else { (offset, offset + 1) });
        }
        start = end;
    }
    None
}

fn strip_segment_tags(node: &mut SurfaceNode) {
    if let SurfaceNode::Element(el) = node {
        el.attrs
            .retain(|(name, _)| name != ATTR_SEGMENT_INDEX && name != ATTR_SEGMENT_TYPE);
        el.children.iter_mut().for_each(strip_segment_tags);
    }
}
