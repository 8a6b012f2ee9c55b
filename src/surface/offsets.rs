//! Offset mapper
//!
//! Converts between model offsets (positions over the concatenated text
//! contents and ruby bases of a slide) and boundary points in the surface
//! tree. Both directions share the length rules of
//! [`SurfaceNode::model_len`].
//!
//! Rubies are atomic: any surface position inside a ruby maps to the ruby's
//! start offset, and a model offset strictly inside a ruby's span maps to
//! the gap just before the ruby node. An offset equal to a ruby's end maps
//! to the gap just after it.
//!
//! Hosts that place the caret after a ruby for an offset inside it will see
//! it before the ruby instead; reading the caret back gives the ruby's start.

use super::node::{raw_offset_for_visible, visible_prefix_len, Element, SurfaceNode};
use super::position::SurfacePosition;
use crate::models::Segment;

/// Model offset of a surface position
///
/// `segments` must be the sequence the surface was rendered from; ruby
/// lengths are looked up through each ruby node's segment tag.
pub fn to_model_offset(root: &Element, segments: &[Segment], pos: &SurfacePosition) -> usize {
    count_in_children(&root.children, &pos.container, pos.offset, segments)
}

/// Surface position of a model offset
///
/// Offsets past the end of the content clamp to the end of the surface.
pub fn to_surface_position(root: &Element, segments: &[Segment], offset: usize) -> SurfacePosition {
    locate_in_children(&root.children, &[], offset, segments)
        .unwrap_or_else(|_| SurfacePosition::in_root(root.children.len()))
}

/// Model length of everything on the surface
pub fn surface_model_len(root: &Element, segments: &[Segment]) -> usize {
    root.children.iter().map(|c| c.model_len(segments)).sum()
}

/// Model units before the boundary point `(path, offset)`, relative to a
/// list of siblings
fn count_in_children(children: &[SurfaceNode], path: &[usize], offset: usize, segments: &[Segment]) -> usize {
    let Some((&index, rest)) = path.split_first() else {
        let end = offset.min(children.len());
        return children[..end].iter().map(|c| c.model_len(segments)).sum();
    };
    let Some(child) = children.get(index) else {
        // Stale path: count everything
        return children.iter().map(|c| c.model_len(segments)).sum();
    };
    let before: usize = children[..index].iter().map(|c| c.model_len(segments)).sum();
    before + count_in_node(child, rest, offset, segments)
}

fn count_in_node(node: &SurfaceNode, path: &[usize], offset: usize, segments: &[Segment]) -> usize {
    match node {
        SurfaceNode::Text(text) => visible_prefix_len(text, offset),
        // Inside a ruby: the ruby's start, never a sub-position
        SurfaceNode::Element(el) if el.is_ruby_tagged() || !el.is_editable() => 0,
        SurfaceNode::Element(el) if el.is_line_break() => 0,
        SurfaceNode::Element(el) => {
            usize::from(el.is_block()) + count_in_children(&el.children, path, offset, segments)
        }
    }
}

/// Find the boundary point for `remaining` model units within `children`
/// (whose own path is `base`). `Err` carries the units left over.
fn locate_in_children(
    children: &[SurfaceNode],
    base: &[usize],
    mut remaining: usize,
    segments: &[Segment],
) -> Result<SurfacePosition, usize> {
    for (index, child) in children.iter().enumerate() {
        let len = child.model_len(segments);
        let atomic = matches!(child, SurfaceNode::Element(el) if el.is_ruby_tagged() || !el.is_editable());

        if atomic {
            if remaining == len {
                return Ok(SurfacePosition::new(base.to_vec(), index + 1));
            }
            if remaining < len {
                return Ok(SurfacePosition::new(base.to_vec(), index));
            }
        } else if remaining <= len {
            return Ok(locate_in_node(child, base, index, remaining, segments));
        }
        remaining -= len;
    }
    Err(remaining)
}

/// Boundary point `remaining` units into `node`, the `index`-th child of the
/// container at `parent`. Requires `remaining <= node.model_len()`.
fn locate_in_node(
    node: &SurfaceNode,
    parent: &[usize],
    index: usize,
    remaining: usize,
    segments: &[Segment],
) -> SurfacePosition {
    let mut path = parent.to_vec();
    path.push(index);

    match node {
        SurfaceNode::Text(text) => SurfacePosition::new(path, raw_offset_for_visible(text, remaining)),
        SurfaceNode::Element(el) if el.is_line_break() => {
            if remaining == 0 && !el.is_placeholder_break() {
                SurfacePosition::new(parent.to_vec(), index)
            } else {
                SurfacePosition::new(parent.to_vec(), index + 1)
            }
        }
        SurfaceNode::Element(el) => {
            let mut remaining = remaining;
            if el.is_block() {
                if remaining == 0 {
                    return SurfacePosition::new(parent.to_vec(), index);
                }
                remaining -= 1;
            }
            if el.children.is_empty() {
                return SurfacePosition::new(path, 0);
            }
            locate_in_children(&el.children, &path, remaining, segments)
                .unwrap_or_else(|_| SurfacePosition::new(parent.to_vec(), index + 1))
        }
    }
}
