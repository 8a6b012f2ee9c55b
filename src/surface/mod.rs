//! Editable surface
//!
//! The live region a user types into, abstracted as a node tree plus a
//! selection. A concrete host (a browser `contenteditable` mirror, a native
//! text widget, [`HeadlessSurface`] in tests) implements the required
//! accessors; rendering, parsing and the editing primitives are provided.

pub mod editing;
pub mod headless;
pub mod markup;
pub mod node;
pub mod offsets;
pub mod position;

pub use headless::HeadlessSurface;
pub use markup::{parse_markup, parse_nodes, parse_with_outcome, render, render_nodes, MarkupError, ParseOutcome};
pub use node::{Element, NodePath, SurfaceNode, ZERO_WIDTH_SPACE};
pub use offsets::{surface_model_len, to_model_offset, to_surface_position};
pub use position::{SurfacePosition, SurfaceRange};

use crate::models::Segment;

pub trait EditableSurface {
    /// Root element; its children are the rendered segment nodes
    fn root(&self) -> &Element;
    fn root_mut(&mut self) -> &mut Element;

    fn selection(&self) -> Option<&SurfaceRange>;
    fn set_selection(&mut self, range: Option<SurfaceRange>);

    fn is_focused(&self) -> bool;

    /// Replace the whole surface content with the rendering of `segments`
    ///
    /// The selection does not survive; callers restore it through the
    /// offset mapper.
    fn render(&mut self, segments: &[Segment]) {
        self.root_mut().children = render_nodes(segments);
        self.set_selection(None);
    }

    /// Read the current content back into segments
    fn parse(&self, prior: &[Segment]) -> ParseOutcome {
        parse_with_outcome(&self.root().children, prior)
    }

    /// Move the caret, collapsing any selection
    fn set_caret(&mut self, pos: SurfacePosition) {
        self.set_selection(Some(SurfaceRange::collapsed(pos)));
    }

    /// The caret (selection focus)
    fn caret(&self) -> Option<&SurfacePosition> {
        self.selection().map(|range| &range.focus)
    }

    /// Delete the selected content and collapse the selection to its start
    fn delete_contents(&mut self) -> Option<SurfacePosition> {
        let range = self.selection()?.clone();
        let caret = editing::delete_contents(self.root_mut(), &range);
        self.set_caret(caret.clone());
        Some(caret)
    }

    /// Insert a node at the caret and move the caret just after it
    fn insert_node(&mut self, node: SurfaceNode) -> Option<NodePath> {
        let at = self.caret()?.clone();
        let path = editing::insert_node(self.root_mut(), &at, node)?;
        if let Some((index, parent)) = path.split_last() {
            self.set_caret(SurfacePosition::new(parent.to_vec(), index + 1));
        }
        Some(path)
    }

    /// Replace the selection with typed text
    fn insert_text(&mut self, text: &str) -> bool {
        if !self.selection().is_some_and(SurfaceRange::is_collapsed) {
            self.delete_contents();
        }
        let Some(at) = self.caret().cloned() else {
            return false;
        };
        match editing::insert_text(self.root_mut(), &at, text) {
            Some(caret) => {
                self.set_caret(caret);
                true
            }
            None => false,
        }
    }

    /// Replace the content with parsed markup (a host mirroring its live region)
    fn load_markup(&mut self, markup: &str) -> Result<(), MarkupError> {
        self.root_mut().children = markup::nodes_from_markup(markup)?;
        Ok(())
    }

    fn markup(&self) -> String {
        markup::to_markup(&self.root().children)
    }
}
