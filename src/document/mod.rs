//! Document context
//!
//! Owns the manuscript, the undo/redo history and the dirty flag. Every
//! mutation of the manuscript goes through a method here. Mutations come in
//! two styles:
//!
//! - *recorded*: push an undo snapshot, then mutate (discrete user actions)
//! - *silent*: mutate only; the input controller's debounce timer records
//!   continuous typing through [`DocumentContext::snapshot_for_undo`]
//!
//! Both styles mark the document dirty. Observers subscribe explicitly and
//! receive a [`DocumentEvent`] after each change.

pub mod annotate;
pub mod find;
pub mod import;
pub mod ruby;

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::EditorConfig;
use crate::models::{merge_adjacent_text, Manuscript, Segment, Slide};
use crate::undo::{History, Snapshot};

pub use annotate::{AnnotateError, Annotator, ReadingAligner};
pub use find::{count_in_segments, replace_in_segments};
pub use import::{import_title_from_path, split_import_text, DEFAULT_IMPORT_DELIMITER};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("slide index {index} out of range ({count} slides)")]
    SlideOutOfRange { index: usize, count: usize },

    #[error("segment index {index} out of range ({count} segments)")]
    SegmentOutOfRange { index: usize, count: usize },

    #[error("segment {index} is not a ruby")]
    NotRuby { index: usize },

    #[error("selection {start}..{end} does not lie within a single text segment")]
    SelectionNotInText { start: usize, end: usize },

    #[error("ruby base must not be empty")]
    EmptyRubyBase,

    #[error(transparent)]
    Annotate(#[from] AnnotateError),
}

/// Change notifications delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// The whole manuscript was replaced (load, new, import)
    Replaced,
    TitleChanged,
    /// Slides were added, removed, reordered or restored from history
    SlidesChanged,
    SegmentsChanged { slide: usize },
    SlideStyleChanged { slide: usize },
    HistoryChanged { can_undo: bool, can_redo: bool },
    DirtyChanged(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&DocumentEvent)>;

pub struct DocumentContext {
    manuscript: Manuscript,
    history: History,
    dirty: bool,
    current_slide: usize,
    file_path: Option<PathBuf>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl fmt::Debug for DocumentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentContext")
            .field("manuscript", &self.manuscript)
            .field("dirty", &self.dirty)
            .field("current_slide", &self.current_slide)
            .field("file_path", &self.file_path)
            .field("undo_depth", &self.history.undo_count())
            .field("redo_depth", &self.history.redo_count())
            .finish_non_exhaustive()
    }
}

impl Default for DocumentContext {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl DocumentContext {
    /// A context holding a fresh manuscript
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            manuscript: Manuscript::new(),
            history: History::new(config.undo_limit),
            dirty: false,
            current_slide: 0,
            file_path: None,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn manuscript(&self) -> &Manuscript {
        &self.manuscript
    }

    pub fn title(&self) -> &str {
        &self.manuscript.title
    }

    pub fn slides(&self) -> &[Slide] {
        &self.manuscript.slides
    }

    pub fn slide_count(&self) -> usize {
        self.manuscript.slides.len()
    }

    pub fn slide(&self, index: usize) -> Result<&Slide, DocumentError> {
        self.manuscript.slides.get(index).ok_or(DocumentError::SlideOutOfRange {
            index,
            count: self.manuscript.slides.len(),
        })
    }

    pub fn segments(&self, slide: usize) -> Result<&[Segment], DocumentError> {
        Ok(&self.slide(slide)?.segments)
    }

    pub fn current_slide_index(&self) -> usize {
        self.current_slide
    }

    pub fn current_slide(&self) -> &Slide {
        // current_slide is kept in range by every slide mutation
        &self.manuscript.slides[self.current_slide.min(self.manuscript.slides.len() - 1)]
    }

    pub fn set_current_slide(&mut self, index: usize) -> Result<(), DocumentError> {
        self.check_slide(index)?;
        self.current_slide = index;
        Ok(())
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_depth(&self) -> usize {
        self.history.undo_count()
    }

    pub fn redo_depth(&self) -> usize {
        self.history.redo_count()
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    pub fn subscribe(&mut self, subscriber: impl FnMut(&DocumentEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    fn emit(&mut self, event: DocumentEvent) {
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&event);
        }
    }

    fn emit_history(&mut self) {
        let event = DocumentEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        };
        self.emit(event);
    }

    fn set_dirty(&mut self, dirty: bool) {
        if self.dirty != dirty {
            self.dirty = dirty;
            self.emit(DocumentEvent::DirtyChanged(dirty));
        }
    }

    // ========================================================================
    // Whole-document replacement
    // ========================================================================

    /// Install a loaded manuscript; history is reset and the document is clean
    pub fn load_manuscript(&mut self, mut manuscript: Manuscript, path: Option<PathBuf>) {
        let repairs = manuscript.normalize();
        if repairs > 0 {
            log::warn!("loaded manuscript repaired ({} fixes)", repairs);
        }
        log::info!("manuscript loaded: {} slides", manuscript.slides.len());
        self.replace(manuscript, path, false);
    }

    pub fn new_manuscript(&mut self) {
        log::info!("new manuscript");
        self.replace(Manuscript::new(), None, false);
    }

    /// Install an imported manuscript. It has no backing file, so it starts
    /// dirty.
    pub fn import_manuscript(&mut self, mut manuscript: Manuscript) {
        manuscript.normalize();
        log::info!("manuscript imported: {} slides", manuscript.slides.len());
        self.replace(manuscript, None, true);
    }

    fn replace(&mut self, manuscript: Manuscript, path: Option<PathBuf>, dirty: bool) {
        self.manuscript = manuscript;
        self.file_path = path;
        self.current_slide = 0;
        self.history.clear();
        self.emit(DocumentEvent::Replaced);
        self.emit_history();
        self.set_dirty(dirty);
    }

    /// The document was written to `path`
    pub fn mark_saved(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        log::info!("manuscript saved to {}", path.display());
        self.file_path = Some(path);
        self.set_dirty(false);
    }

    /// Clear the dirty flag without changing the file path
    pub fn mark_clean(&mut self) {
        self.set_dirty(false);
    }

    // ========================================================================
    // History
    // ========================================================================

    fn snapshot(&self) -> Snapshot {
        Snapshot::new(&self.manuscript.title, &self.manuscript.slides)
    }

    /// Record the current state as an undo entry and drop the redo history
    pub fn push_undo(&mut self) {
        let snapshot = self.snapshot();
        self.history.push(snapshot);
        log::debug!("undo entry pushed (depth {})", self.history.undo_count());
        self.emit_history();
    }

    /// Debounce-timer hook for continuous typing
    pub fn snapshot_for_undo(&mut self) {
        self.push_undo();
    }

    /// Returns false (and changes nothing) when there is nothing to undo
    pub fn undo(&mut self) -> bool {
        let current = self.snapshot();
        let Some(previous) = self.history.undo(current) else {
            log::debug!("undo: history empty");
            return false;
        };
        self.restore(previous);
        true
    }

    pub fn redo(&mut self) -> bool {
        let current = self.snapshot();
        let Some(next) = self.history.redo(current) else {
            log::debug!("redo: nothing to redo");
            return false;
        };
        self.restore(next);
        true
    }

    fn restore(&mut self, snapshot: Snapshot) {
        let title_changed = self.manuscript.title != snapshot.title;
        self.manuscript.title = snapshot.title;
        self.manuscript.slides = snapshot.slides;
        self.manuscript.normalize();
        self.clamp_current_slide();
        if title_changed {
            self.emit(DocumentEvent::TitleChanged);
        }
        self.emit(DocumentEvent::SlidesChanged);
        self.emit_history();
        self.set_dirty(true);
    }

    // ========================================================================
    // Structural mutations (recorded)
    // ========================================================================

    pub fn set_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        if title == self.manuscript.title {
            return;
        }
        self.push_undo();
        self.manuscript.title = title;
        self.emit(DocumentEvent::TitleChanged);
        self.set_dirty(true);
    }

    /// Insert an empty slide (at the end by default) and select it
    pub fn add_slide(&mut self, at: Option<usize>) -> usize {
        let count = self.manuscript.slides.len();
        let index = at.unwrap_or(count).min(count);
        self.push_undo();
        self.manuscript.slides.insert(index, Slide::empty());
        self.current_slide = index;
        log::debug!("slide added at {}", index);
        self.after_slides_changed();
        index
    }

    /// Insert a copy of a slide right after it and select the copy
    pub fn duplicate_slide(&mut self, index: usize) -> Result<usize, DocumentError> {
        let copy = self.slide(index)?.clone();
        self.push_undo();
        self.manuscript.slides.insert(index + 1, copy);
        self.current_slide = index + 1;
        log::debug!("slide {} duplicated", index);
        self.after_slides_changed();
        Ok(index + 1)
    }

    /// Remove a slide. The last remaining slide is never removed (returns false).
    pub fn remove_slide(&mut self, index: usize) -> Result<bool, DocumentError> {
        self.check_slide(index)?;
        if self.manuscript.slides.len() <= 1 {
            log::debug!("remove_slide: keeping the only slide");
            return Ok(false);
        }
        self.push_undo();
        self.manuscript.slides.remove(index);
        self.clamp_current_slide();
        log::debug!("slide {} removed", index);
        self.after_slides_changed();
        Ok(true)
    }

    /// Move a slide and select it at its new position
    pub fn move_slide(&mut self, from: usize, to: usize) -> Result<(), DocumentError> {
        self.check_slide(from)?;
        self.check_slide(to)?;
        if from == to {
            return Ok(());
        }
        self.push_undo();
        let slide = self.manuscript.slides.remove(from);
        self.manuscript.slides.insert(to, slide);
        self.current_slide = to;
        log::debug!("slide moved {} -> {}", from, to);
        self.after_slides_changed();
        Ok(())
    }

    fn after_slides_changed(&mut self) {
        self.emit(DocumentEvent::SlidesChanged);
        self.set_dirty(true);
    }

    fn clamp_current_slide(&mut self) {
        if self.current_slide >= self.manuscript.slides.len() {
            self.current_slide = self.manuscript.slides.len().saturating_sub(1);
        }
    }

    fn check_slide(&self, index: usize) -> Result<(), DocumentError> {
        self.slide(index).map(|_| ())
    }

    // ========================================================================
    // Content mutations
    // ========================================================================

    /// Replace a slide's segments as one undoable action
    pub fn update_segments(&mut self, slide: usize, segments: Vec<Segment>) -> Result<(), DocumentError> {
        self.check_slide(slide)?;
        self.push_undo();
        self.store_segments(slide, segments);
        Ok(())
    }

    /// Replace a slide's segments without recording an undo entry
    pub fn update_segments_silent(&mut self, slide: usize, segments: Vec<Segment>) -> Result<(), DocumentError> {
        self.check_slide(slide)?;
        self.store_segments(slide, segments);
        Ok(())
    }

    fn store_segments(&mut self, slide: usize, segments: Vec<Segment>) {
        self.manuscript.slides[slide].segments = merge_adjacent_text(segments);
        self.emit(DocumentEvent::SegmentsChanged { slide });
        self.set_dirty(true);
    }

    pub fn set_slide_key_binding(&mut self, slide: usize, key: Option<String>) -> Result<(), DocumentError> {
        self.update_slide_style(slide, |s| s.key_binding = key)
    }

    pub fn set_slide_font_size(&mut self, slide: usize, size: Option<u32>) -> Result<(), DocumentError> {
        self.update_slide_style(slide, |s| s.font_size = size)
    }

    pub fn set_slide_font_color(&mut self, slide: usize, color: Option<String>) -> Result<(), DocumentError> {
        self.update_slide_style(slide, |s| s.font_color = color)
    }

    fn update_slide_style(&mut self, slide: usize, apply: impl FnOnce(&mut Slide)) -> Result<(), DocumentError> {
        self.check_slide(slide)?;
        self.push_undo();
        apply(&mut self.manuscript.slides[slide]);
        self.emit(DocumentEvent::SlideStyleChanged { slide });
        self.set_dirty(true);
        Ok(())
    }
}
