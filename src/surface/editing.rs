//! Tree editing primitives
//!
//! The operations a live editable region performs on its own content:
//! deleting the contents of a range, inserting a node at a boundary point,
//! and inserting typed text. Non-editable elements (rubies) are atomic: a
//! boundary point inside one is first moved out, so a range touching a ruby
//! either deletes it whole or leaves it intact.

use super::node::{Element, NodePath, SurfaceNode};
use super::position::{SurfacePosition, SurfaceRange};
use crate::models::SegmentKind;

/// Move a position that lies inside a non-editable element to the gap just
/// before (or, with `after`, just after) the outermost such element
pub fn escape_atomic(root: &Element, pos: &SurfacePosition, after: bool) -> SurfacePosition {
    for depth in 1..=pos.container.len() {
        let path = &pos.container[..depth];
        let atomic = root
            .node_at(path)
            .and_then(SurfaceNode::as_element)
            .is_some_and(|el| !el.is_editable());
        if atomic {
            let index = path[depth - 1];
            return SurfacePosition::new(path[..depth - 1].to_vec(), index + usize::from(after));
        }
    }
    pos.clone()
}

/// Delete everything between the range's endpoints
///
/// Returns the collapsed caret position (the range start). Elements emptied
/// by the deletion are left in place; the parser ignores them.
pub fn delete_contents(root: &mut Element, range: &SurfaceRange) -> SurfacePosition {
    let start = escape_atomic(root, range.start(), false);
    let end = escape_atomic(root, range.end(), true);
    if start >= end {
        return start;
    }
    delete_between(
        root,
        Some((start.container.as_slice(), start.offset)),
        Some((end.container.as_slice(), end.offset)),
    );
    start
}

/// A boundary relative to some node: remaining path below it plus offset
type Bound<'a> = Option<(&'a [usize], usize)>;

/// Delete the contents of `el` between two relative boundaries (`None` is
/// the start or end of `el`)
fn delete_between(el: &mut Element, start: Bound, end: Bound) {
    let len = el.children.len();

    // (index of a partially covered child, its inner bound) and the range of
    // fully covered children
    let (start_partial, first_full) = match start {
        None => (None, 0),
        Some(([], offset)) => (None, offset.min(len)),
        Some(([index, rest @ ..], offset)) => (Some((*index, (rest, offset))), index + 1),
    };
    let (end_partial, last_full) = match end {
        None => (None, len),
        Some(([], offset)) => (None, offset.min(len)),
        Some(([index, rest @ ..], offset)) => (Some((*index, (rest, offset))), *index),
    };

    if let (Some((s, s_inner)), Some((e, e_inner))) = (start_partial, end_partial) {
        if s == e {
            if let Some(child) = el.children.get_mut(s) {
                trim_node(child, Some(s_inner), Some(e_inner));
            }
            return;
        }
    }

    // Highest index first so earlier indices stay valid
    if let Some((index, inner)) = end_partial {
        if let Some(child) = el.children.get_mut(index) {
            trim_node(child, None, Some(inner));
        }
    }
    let last_full = last_full.min(el.children.len());
    if first_full < last_full {
        el.children.drain(first_full..last_full);
    }
    if let Some((index, inner)) = start_partial {
        if let Some(child) = el.children.get_mut(index) {
            trim_node(child, Some(inner), None);
        }
    }
}

fn trim_node(node: &mut SurfaceNode, start: Bound, end: Bound) {
    match node {
        SurfaceNode::Text(text) => {
            let count = text.chars().count();
            let from = start.map_or(0, |(_, offset)| offset.min(count));
            let to = end.map_or(count, |(_, offset)| offset.min(count));
            if from < to {
                *text = text
                    .chars()
                    .enumerate()
                    .filter(|(i, _)| *i < from || *i >= to)
                    .map(|(_, c)| c)
                    .collect();
            }
        }
        SurfaceNode::Element(el) => delete_between(el, start, end),
    }
}

/// Insert `node` at a boundary point, splitting a text node if necessary
///
/// Returns the path of the inserted node, or `None` if `pos` does not
/// resolve to a container.
pub fn insert_node(root: &mut Element, pos: &SurfacePosition, node: SurfaceNode) -> Option<NodePath> {
    let pos = escape_atomic(root, pos, false);

    if let Some(SurfaceNode::Text(text)) = root.node_at(&pos.container) {
        let (index, parent_path) = pos.container.split_last()?;
        let (left, right) = split_chars(text, pos.offset);
        let parent = root.element_at_mut(parent_path)?;

        let mut pieces = Vec::with_capacity(3);
        let node_index = index + usize::from(!left.is_empty());
        if !left.is_empty() {
            pieces.push(SurfaceNode::Text(left));
        }
        pieces.push(node);
        if !right.is_empty() {
            pieces.push(SurfaceNode::Text(right));
        }
        parent.children.splice(*index..=*index, pieces);

        let mut path = parent_path.to_vec();
        path.push(node_index);
        return Some(path);
    }

    let parent = root.element_at_mut(&pos.container)?;
    let index = pos.offset.min(parent.children.len());
    parent.children.insert(index, node);
    let mut path = pos.container.clone();
    path.push(index);
    Some(path)
}

/// Insert typed text at a boundary point and return the caret after it
///
/// At a gap between nodes the text joins an adjacent text run when there is
/// one (preferring the preceding run), so typing extends the segment the
/// caret sits in rather than creating a foreign node.
pub fn insert_text(root: &mut Element, pos: &SurfacePosition, text: &str) -> Option<SurfacePosition> {
    let pos = escape_atomic(root, pos, false);
    let inserted = text.chars().count();

    if let Some(SurfaceNode::Text(existing)) = root.node_at_mut(&pos.container) {
        let at = byte_index(existing, pos.offset);
        existing.insert_str(at, text);
        let offset = existing[..at].chars().count() + inserted;
        return Some(SurfacePosition::new(pos.container, offset));
    }

    let parent = root.element_at_mut(&pos.container)?;
    let index = pos.offset.min(parent.children.len());
    let mut base = pos.container.clone();

    // Append to the preceding text run
    if index > 0 {
        if let Some((inner, offset)) = append_to_end(&mut parent.children[index - 1], text) {
            base.push(index - 1);
            base.extend(inner);
            return Some(SurfacePosition::new(base, offset));
        }
    }
    // Prepend to the following text run
    if let Some(next) = parent.children.get_mut(index) {
        if let Some(inner) = prepend_to_start(next, text) {
            base.push(index);
            base.extend(inner);
            return Some(SurfacePosition::new(base, inserted));
        }
    }

    parent.children.insert(index, SurfaceNode::text(text));
    base.push(index);
    Some(SurfacePosition::new(base, inserted))
}

/// Append to a text node, or to the end of a text-tagged span. Returns the
/// path of the text node below `node` and the caret offset in it.
fn append_to_end(node: &mut SurfaceNode, text: &str) -> Option<(NodePath, usize)> {
    match node {
        SurfaceNode::Text(existing) => {
            existing.push_str(text);
            Some((Vec::new(), existing.chars().count()))
        }
        SurfaceNode::Element(el) if is_text_span(el) => {
            if let Some(SurfaceNode::Text(existing)) = el.children.last_mut() {
                existing.push_str(text);
                let offset = existing.chars().count();
                return Some((vec![el.children.len() - 1], offset));
            }
            el.children.push(SurfaceNode::text(text));
            Some((vec![el.children.len() - 1], text.chars().count()))
        }
        SurfaceNode::Element(_) => None,
    }
}

fn prepend_to_start(node: &mut SurfaceNode, text: &str) -> Option<NodePath> {
    match node {
        SurfaceNode::Text(existing) => {
            existing.insert_str(0, text);
            Some(Vec::new())
        }
        SurfaceNode::Element(el) if is_text_span(el) => {
            if let Some(SurfaceNode::Text(existing)) = el.children.first_mut() {
                existing.insert_str(0, text);
            } else {
                el.children.insert(0, SurfaceNode::text(text));
            }
            Some(vec![0])
        }
        SurfaceNode::Element(_) => None,
    }
}

fn is_text_span(el: &Element) -> bool {
    matches!(el.segment_tag(), Some((_, SegmentKind::Text)))
}

fn byte_index(text: &str, char_offset: usize) -> usize {
    text.char_indices().nth(char_offset).map_or(text.len(), |(i, _)| i)
}

fn split_chars(text: &str, char_offset: usize) -> (String, String) {
    let at = byte_index(text, char_offset);
    (text[..at].to_string(), text[at..].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Segment;
    use crate::surface::markup::{parse_nodes, render_nodes};

    fn surface(segments: &[Segment]) -> Element {
        Element::new("div").with_children(render_nodes(segments))
    }

    fn example() -> Vec<Segment> {
        vec![Segment::text("AB"), Segment::ruby("漢字", "かんじ"), Segment::text("CD")]
    }

    #[test]
    fn test_escape_atomic() {
        let root = surface(&example());
        let inside = SurfacePosition::new(vec![1, 2, 0], 1);
        assert_eq!(escape_atomic(&root, &inside, false), SurfacePosition::in_root(1));
        assert_eq!(escape_atomic(&root, &inside, true), SurfacePosition::in_root(2));

        let text = SurfacePosition::new(vec![0, 0], 1);
        assert_eq!(escape_atomic(&root, &text, true), text);
    }

    #[test]
    fn test_delete_within_text() {
        let segs = vec![Segment::text("Hello")];
        let mut root = surface(&segs);
        let range = SurfaceRange::new(SurfacePosition::new(vec![0, 0], 1), SurfacePosition::new(vec![0, 0], 4));

        let caret = delete_contents(&mut root, &range);
        assert_eq!(caret, SurfacePosition::new(vec![0, 0], 1));
        assert_eq!(parse_nodes(&root.children, &segs), vec![Segment::text("Ho")]);
    }

    #[test]
    fn test_delete_across_ruby_removes_it_whole() {
        let segs = example();
        let mut root = surface(&segs);
        // From inside "AB" to inside "CD", backward selection
        let range = SurfaceRange::new(SurfacePosition::new(vec![2, 0], 1), SurfacePosition::new(vec![0, 0], 1));

        delete_contents(&mut root, &range);
        assert_eq!(parse_nodes(&root.children, &segs), vec![Segment::text("AD")]);
    }

    #[test]
    fn test_delete_range_ending_inside_ruby_takes_the_ruby() {
        let segs = example();
        let mut root = surface(&segs);
        let range = SurfaceRange::new(SurfacePosition::new(vec![0, 0], 2), SurfacePosition::new(vec![1, 0], 1));

        delete_contents(&mut root, &range);
        assert_eq!(parse_nodes(&root.children, &segs), vec![Segment::text("ABCD")]);
    }

    #[test]
    fn test_range_inside_one_ruby_deletes_the_ruby() {
        let segs = example();
        let mut root = surface(&segs);
        let before = root.clone();
        let range = SurfaceRange::new(SurfacePosition::new(vec![1, 0], 0), SurfacePosition::new(vec![1, 0], 2));

        let caret = delete_contents(&mut root, &range);
        // Escaped to the gaps around the ruby: the ruby itself is the range
        assert_eq!(caret, SurfacePosition::in_root(1));
        assert_ne!(root, before);
        assert_eq!(parse_nodes(&root.children, &segs), vec![Segment::text("ABCD")]);
    }

    #[test]
    fn test_insert_node_splits_text() {
        let mut root = surface(&[Segment::text("abcd")]);
        let path = insert_node(&mut root, &SurfacePosition::new(vec![0, 0], 2), Element::new("br").into()).unwrap();
        assert_eq!(path, vec![0, 1]);
        assert_eq!(parse_nodes(&root.children, &[]), vec![Segment::text("ab\ncd")]);

        // At the very start: no empty left piece
        let mut root = surface(&[Segment::text("ab")]);
        let path = insert_node(&mut root, &SurfacePosition::new(vec![0, 0], 0), Element::new("br").into()).unwrap();
        assert_eq!(path, vec![0, 0]);
    }

    #[test]
    fn test_insert_text_into_text_node() {
        let segs = vec![Segment::text("Hello")];
        let mut root = surface(&segs);
        let caret = insert_text(&mut root, &SurfacePosition::new(vec![0, 0], 2), "X").unwrap();
        assert_eq!(caret, SurfacePosition::new(vec![0, 0], 3));
        assert_eq!(parse_nodes(&root.children, &segs), vec![Segment::text("HeXllo")]);
    }

    #[test]
    fn test_insert_text_after_ruby_joins_following_text() {
        let segs = example();
        let mut root = surface(&segs);
        let caret = insert_text(&mut root, &SurfacePosition::in_root(2), "x").unwrap();
        assert_eq!(caret, SurfacePosition::new(vec![2, 0], 1));
        assert_eq!(parse_nodes(&root.children, &segs)[2], Segment::text("xCD"));
    }

    #[test]
    fn test_insert_text_before_ruby_joins_preceding_text() {
        let segs = example();
        let mut root = surface(&segs);
        let caret = insert_text(&mut root, &SurfacePosition::in_root(1), "x").unwrap();
        assert_eq!(caret, SurfacePosition::new(vec![0, 0], 3));
        assert_eq!(parse_nodes(&root.children, &segs)[0], Segment::text("ABx"));
    }

    #[test]
    fn test_insert_text_into_empty_segment() {
        let segs = vec![Segment::empty_text()];
        let mut root = surface(&segs);
        let caret = insert_text(&mut root, &SurfacePosition::new(vec![0], 1), "あ").unwrap();
        assert_eq!(caret, SurfacePosition::new(vec![0, 1], 1));
        assert_eq!(parse_nodes(&root.children, &segs), vec![Segment::text("あ")]);
    }

    #[test]
    fn test_insert_text_between_rubies_creates_node() {
        let segs = vec![Segment::ruby("猫", "ねこ"), Segment::ruby("犬", "いぬ")];
        let mut root = surface(&segs);
        let caret = insert_text(&mut root, &SurfacePosition::in_root(1), "と").unwrap();
        assert_eq!(caret, SurfacePosition::new(vec![1], 1));
        assert_eq!(
            parse_nodes(&root.children, &segs),
            vec![Segment::ruby("猫", "ねこ"), Segment::text("と"), Segment::ruby("犬", "いぬ")]
        );
    }

    #[test]
    fn test_insert_text_inside_ruby_is_moved_out() {
        let segs = example();
        let mut root = surface(&segs);
        insert_text(&mut root, &SurfacePosition::new(vec![1, 0], 1), "z").unwrap();
        let parsed = parse_nodes(&root.children, &segs);
        assert_eq!(parsed[0], Segment::text("ABz"));
        assert_eq!(parsed[1], Segment::ruby("漢字", "かんじ"));
    }
}
