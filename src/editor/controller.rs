//! Input/composition controller
//!
//! Mediates raw surface events into document mutations. Typing is applied
//! silently and coalesced into undo entries by a debounce timer; IME
//! composition suspends synchronization until it ends; Enter is intercepted
//! and turned into an explicit line break.
//!
//! One synchronization pass always runs in the same order: parse, merge,
//! silent model update, then (only when the segment structure changed)
//! re-render and caret restore.

use serde::{Deserialize, Serialize};

use super::timers::DebounceTimer;
use crate::config::EditorConfig;
use crate::document::{DocumentContext, DocumentError};
use crate::models::{model_text_between, Segment};
use crate::surface::node::{Element, SurfaceNode, ZERO_WIDTH_SPACE};
use crate::surface::{to_model_offset, to_surface_position, EditableSurface, SurfacePosition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompositionState {
    Idle,
    /// IME in progress; nothing on the surface is read into the model
    Composing,
}

/// Raw surface events, as a host delivers them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum InputEvent {
    /// The surface content changed
    Input { now_ms: u64, is_composing: bool },
    /// Delivered before the surface applies its default action
    KeyDown { key: String, is_composing: bool },
    CompositionStart,
    CompositionEnd { now_ms: u64 },
    SelectionChange,
    Click { position: SurfacePosition },
}

/// What the host must do after an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOutcome {
    /// Suppress the surface's default action for this event
    pub prevent_default: bool,
    pub sync: Option<SyncOutcome>,
}

/// Result of one synchronization pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// The model now holds different segments
    pub segments_changed: bool,
    /// The surface was re-rendered (content and caret replaced)
    pub rerendered: bool,
}

/// A non-empty selection in model-offset space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentSelection {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

pub type SelectionListener = Box<dyn FnMut(Option<SegmentSelection>)>;
pub type RubyClickListener = Box<dyn FnMut(usize)>;

pub struct InputController<S: EditableSurface> {
    surface: S,
    state: CompositionState,
    debounce: DebounceTimer,
    /// Slide the surface is editing
    slide: usize,
    /// Segments the surface was last rendered from or synced to. Segment tags
    /// on the surface index into this sequence.
    rendered: Vec<Segment>,
    selection_listener: Option<SelectionListener>,
    ruby_click_listener: Option<RubyClickListener>,
    destroyed: bool,
}

impl<S: EditableSurface> InputController<S> {
    pub fn new(surface: S, config: &EditorConfig) -> Self {
        Self {
            surface,
            state: CompositionState::Idle,
            debounce: DebounceTimer::new(config.debounce_ms),
            slide: 0,
            rendered: Vec::new(),
            selection_listener: None,
            ruby_click_listener: None,
            destroyed: false,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn state(&self) -> CompositionState {
        self.state
    }

    pub fn slide_index(&self) -> usize {
        self.slide
    }

    pub fn rendered_segments(&self) -> &[Segment] {
        &self.rendered
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Deadline of the pending undo snapshot, if typing is being coalesced
    pub fn snapshot_deadline(&self) -> Option<u64> {
        self.debounce.deadline()
    }

    pub fn on_selection_change(&mut self, listener: impl FnMut(Option<SegmentSelection>) + 'static) {
        self.selection_listener = Some(Box::new(listener));
    }

    pub fn on_ruby_click(&mut self, listener: impl FnMut(usize) + 'static) {
        self.ruby_click_listener = Some(Box::new(listener));
    }

    /// Dispatch one surface event
    pub fn handle(&mut self, ctx: &mut DocumentContext, event: InputEvent) -> EventOutcome {
        if self.destroyed {
            log::debug!("event after teardown ignored: {:?}", event);
            return EventOutcome::default();
        }

        match event {
            InputEvent::Input { now_ms, is_composing } => {
                if is_composing || self.state == CompositionState::Composing {
                    return EventOutcome::default();
                }
                // An expired timer fires before this input extends it
                self.tick(ctx, now_ms);
                let sync = self.sync(ctx);
                self.debounce.schedule(now_ms);
                EventOutcome { prevent_default: false, sync }
            }
            InputEvent::KeyDown { key, is_composing } => {
                if key == "Enter" && !is_composing && self.state == CompositionState::Idle {
                    let sync = self.insert_line_break(ctx);
                    return EventOutcome { prevent_default: true, sync };
                }
                EventOutcome::default()
            }
            InputEvent::CompositionStart => {
                log::debug!("composition started");
                self.state = CompositionState::Composing;
                EventOutcome::default()
            }
            InputEvent::CompositionEnd { now_ms } => {
                log::debug!("composition ended");
                self.state = CompositionState::Idle;
                self.tick(ctx, now_ms);
                let sync = self.sync(ctx);
                self.debounce.schedule(now_ms);
                EventOutcome { prevent_default: false, sync }
            }
            InputEvent::SelectionChange => {
                if self.state == CompositionState::Idle {
                    let selection = self.current_selection();
                    if let Some(listener) = self.selection_listener.as_mut() {
                        listener(selection);
                    }
                }
                EventOutcome::default()
            }
            InputEvent::Click { position } => {
                if let Some(index) = self.ruby_at(&position) {
                    log::debug!("ruby {} clicked", index);
                    if let Some(listener) = self.ruby_click_listener.as_mut() {
                        listener(index);
                    }
                }
                EventOutcome::default()
            }
        }
    }

    /// Fire the debounced undo snapshot if it is due. Returns true if it fired.
    pub fn tick(&mut self, ctx: &mut DocumentContext, now_ms: u64) -> bool {
        if self.destroyed || !self.debounce.poll(now_ms) {
            return false;
        }
        log::debug!("debounced undo snapshot at {}ms", now_ms);
        ctx.snapshot_for_undo();
        true
    }

    /// Read the surface into the model
    pub fn sync(&mut self, ctx: &mut DocumentContext) -> Option<SyncOutcome> {
        if self.destroyed {
            log::debug!("sync after teardown swallowed");
            return None;
        }
        if self.state == CompositionState::Composing {
            return None;
        }

        let outcome = self.surface.parse(&self.rendered);
        let segments_changed = match ctx.segments(self.slide) {
            Ok(current) => current != outcome.segments.as_slice(),
            Err(err) => {
                log::warn!("sync skipped: {}", err);
                return None;
            }
        };
        if segments_changed {
            if let Err(err) = ctx.update_segments_silent(self.slide, outcome.segments.clone()) {
                log::warn!("sync skipped: {}", err);
                return None;
            }
        }

        if !outcome.structure_changed {
            self.rendered = outcome.segments;
            return Some(SyncOutcome { segments_changed, rerendered: false });
        }

        log::debug!("segment structure changed; re-rendering slide {}", self.slide);
        self.render_preserving_caret(outcome.segments);
        Some(SyncOutcome { segments_changed, rerendered: true })
    }

    /// Re-render the surface from the model (after undo/redo or any
    /// recorded mutation), keeping the caret at the same model offset
    pub fn refresh(&mut self, ctx: &DocumentContext) {
        if self.destroyed {
            return;
        }
        if self.slide >= ctx.slide_count() {
            self.slide = ctx.current_slide_index();
        }
        let segments = match ctx.segments(self.slide) {
            Ok(segments) => segments.to_vec(),
            Err(err) => {
                log::warn!("refresh skipped: {}", err);
                return;
            }
        };
        self.render_preserving_caret(segments);
    }

    /// Point the surface at another slide
    pub fn set_slide(&mut self, ctx: &mut DocumentContext, index: usize) -> Result<(), DocumentError> {
        ctx.set_current_slide(index)?;
        self.slide = index;
        self.state = CompositionState::Idle;
        let segments = ctx.segments(index)?.to_vec();
        self.surface.render(&segments);
        self.rendered = segments;
        Ok(())
    }

    /// Tear down: cancel the pending snapshot and detach listeners. Every
    /// later event is ignored.
    pub fn destroy(&mut self) {
        log::debug!("input controller destroyed");
        self.debounce.cancel();
        self.selection_listener = None;
        self.ruby_click_listener = None;
        self.state = CompositionState::Idle;
        self.destroyed = true;
    }

    /// The focused, non-empty selection in model offsets
    pub fn current_selection(&self) -> Option<SegmentSelection> {
        if !self.surface.is_focused() {
            return None;
        }
        let range = self.surface.selection()?;
        if range.is_collapsed() {
            return None;
        }
        let root = self.surface.root();
        let start = to_model_offset(root, &self.rendered, range.start());
        let end = to_model_offset(root, &self.rendered, range.end());
        let text = model_text_between(&self.rendered, start, end);
        if text.is_empty() {
            return None;
        }
        Some(SegmentSelection { text, start, end })
    }

    /// Model offset of the caret, if the surface has one
    pub fn caret_offset(&self) -> Option<usize> {
        let caret = self.surface.caret()?;
        Some(to_model_offset(self.surface.root(), &self.rendered, caret))
    }

    /// Enter: replace the selection with a line break followed by a cursor
    /// marker, put the caret on the marker, then sync
    fn insert_line_break(&mut self, ctx: &mut DocumentContext) -> Option<SyncOutcome> {
        if self.surface.selection().is_none() {
            return None;
        }
        self.surface.delete_contents();
        self.surface.insert_node(Element::new("br").into())?;
        let marker = self
            .surface
            .insert_node(SurfaceNode::text(ZERO_WIDTH_SPACE.to_string()))?;
        self.surface.set_caret(SurfacePosition::new(marker, 0));
        self.sync(ctx)
    }

    fn render_preserving_caret(&mut self, segments: Vec<Segment>) {
        let caret = self.caret_offset();
        self.surface.render(&segments);
        self.rendered = segments;
        if let Some(offset) = caret {
            let pos = to_surface_position(self.surface.root(), &self.rendered, offset);
            self.surface.set_caret(pos);
        }
    }

    /// Rendered index of the ruby containing `position`
    fn ruby_at(&self, position: &SurfacePosition) -> Option<usize> {
        let root = self.surface.root();
        (1..=position.container.len()).find_map(|depth| {
            let el = root.node_at(&position.container[..depth])?.as_element()?;
            if el.is_ruby_tagged() {
                el.segment_tag().map(|(index, _)| index)
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::HeadlessSurface;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn setup(segments: Vec<Segment>) -> (DocumentContext, InputController<HeadlessSurface>) {
        let mut ctx = DocumentContext::default();
        ctx.update_segments(0, segments).unwrap();
        ctx.mark_clean();
        let mut controller = InputController::new(HeadlessSurface::new(), &EditorConfig::default());
        controller.set_slide(&mut ctx, 0).unwrap();
        controller.surface_mut().focus();
        (ctx, controller)
    }

    fn input(now_ms: u64) -> InputEvent {
        InputEvent::Input { now_ms, is_composing: false }
    }

    fn example() -> Vec<Segment> {
        vec![Segment::text("AB"), Segment::ruby("漢字", "かんじ"), Segment::text("CD")]
    }

    #[test]
    fn test_typing_syncs_silently_without_rerender() {
        let (mut ctx, mut controller) = setup(vec![Segment::text("Hello")]);
        let undo_before = ctx.undo_depth();

        let segs = controller.rendered_segments().to_vec();
        controller.surface_mut().place_caret(&segs, 2);
        controller.surface_mut().type_text("X");
        let outcome = controller.handle(&mut ctx, input(0));

        assert_eq!(outcome.sync, Some(SyncOutcome { segments_changed: true, rerendered: false }));
        assert_eq!(ctx.segments(0).unwrap(), &[Segment::text("HeXllo")]);
        assert_eq!(ctx.undo_depth(), undo_before);
        assert!(ctx.is_dirty());
    }

    #[test]
    fn test_structure_change_rerenders_and_restores_caret() {
        let (mut ctx, mut controller) = setup(example());
        let segs = controller.rendered_segments().to_vec();
        controller.surface_mut().place_caret(&segs, 4);
        controller.surface_mut().delete_backward(&segs);

        let outcome = controller.handle(&mut ctx, input(0));
        assert_eq!(outcome.sync, Some(SyncOutcome { segments_changed: true, rerendered: true }));
        assert_eq!(ctx.segments(0).unwrap(), &[Segment::text("ABCD")]);
        assert_eq!(controller.caret_offset(), Some(2));
    }

    #[test]
    fn test_composition_suspends_sync() {
        let (mut ctx, mut controller) = setup(vec![Segment::text("ab")]);
        controller.handle(&mut ctx, InputEvent::CompositionStart);
        assert_eq!(controller.state(), CompositionState::Composing);

        let segs = controller.rendered_segments().to_vec();
        controller.surface_mut().place_caret(&segs, 2);
        controller.surface_mut().type_text("か");
        let outcome = controller.handle(&mut ctx, input(10));
        assert_eq!(outcome.sync, None);
        assert_eq!(ctx.segments(0).unwrap(), &[Segment::text("ab")]);

        let outcome = controller.handle(&mut ctx, InputEvent::CompositionEnd { now_ms: 20 });
        assert_eq!(controller.state(), CompositionState::Idle);
        assert!(outcome.sync.is_some());
        assert_eq!(ctx.segments(0).unwrap(), &[Segment::text("abか")]);
        assert_eq!(controller.snapshot_deadline(), Some(520));
    }

    #[test]
    fn test_enter_inserts_line_break_with_marker() {
        let (mut ctx, mut controller) = setup(vec![Segment::text("abcd")]);
        let segs = controller.rendered_segments().to_vec();
        controller.surface_mut().place_caret(&segs, 2);

        let outcome = controller.handle(
            &mut ctx,
            InputEvent::KeyDown { key: "Enter".to_string(), is_composing: false },
        );
        assert!(outcome.prevent_default);
        assert_eq!(ctx.segments(0).unwrap(), &[Segment::text("ab\ncd")]);
        assert_eq!(controller.caret_offset(), Some(3));
        assert_eq!(controller.surface().caret().map(|caret| caret.offset), Some(0), "caret sits on the marker");
        assert!(controller.surface().markup().contains(ZERO_WIDTH_SPACE));

        // Typing on the marker lands on the new line
        controller.surface_mut().type_text("x");
        controller.handle(&mut ctx, input(0));
        assert_eq!(ctx.segments(0).unwrap(), &[Segment::text("ab\nxcd")]);
    }

    #[test]
    fn test_enter_while_composing_is_left_to_the_ime() {
        let (mut ctx, mut controller) = setup(vec![Segment::text("ab")]);
        let segs = controller.rendered_segments().to_vec();
        controller.surface_mut().place_caret(&segs, 1);
        let outcome = controller.handle(
            &mut ctx,
            InputEvent::KeyDown { key: "Enter".to_string(), is_composing: true },
        );
        assert!(!outcome.prevent_default);
        assert_eq!(ctx.segments(0).unwrap(), &[Segment::text("ab")]);
    }

    #[test]
    fn test_debounce_records_one_entry_per_burst() {
        let (mut ctx, mut controller) = setup(vec![Segment::text("")]);
        let depth = ctx.undo_depth();

        for (i, now) in [0u64, 100, 200, 300].into_iter().enumerate() {
            let segs = controller.rendered_segments().to_vec();
            controller.surface_mut().place_caret(&segs, i);
            controller.surface_mut().type_text("a");
            controller.handle(&mut ctx, input(now));
        }
        assert!(!controller.tick(&mut ctx, 799));
        assert!(controller.tick(&mut ctx, 800));
        assert_eq!(ctx.undo_depth(), depth + 1);

        // A second burst after the idle period is a separate entry
        controller.surface_mut().type_text("b");
        controller.handle(&mut ctx, input(2000));
        assert!(controller.tick(&mut ctx, 2500));
        assert_eq!(ctx.undo_depth(), depth + 2);
    }

    #[test]
    fn test_expired_timer_fires_before_next_input() {
        let (mut ctx, mut controller) = setup(vec![Segment::text("")]);
        let depth = ctx.undo_depth();
        let segs = controller.rendered_segments().to_vec();
        controller.surface_mut().place_caret(&segs, 0);
        controller.surface_mut().type_text("a");
        controller.handle(&mut ctx, input(0));
        controller.surface_mut().type_text("b");
        controller.handle(&mut ctx, input(700));
        assert_eq!(ctx.undo_depth(), depth + 1);
        assert_eq!(controller.snapshot_deadline(), Some(1200));
    }

    #[test]
    fn test_expired_timer_fires_before_composition_end() {
        let (mut ctx, mut controller) = setup(vec![Segment::text("")]);
        let depth = ctx.undo_depth();
        let segs = controller.rendered_segments().to_vec();
        controller.surface_mut().place_caret(&segs, 0);
        controller.surface_mut().type_text("a");
        controller.handle(&mut ctx, input(0));

        controller.handle(&mut ctx, InputEvent::CompositionStart);
        controller.surface_mut().type_text("か");
        controller.handle(&mut ctx, InputEvent::Input { now_ms: 900, is_composing: true });
        controller.handle(&mut ctx, InputEvent::CompositionEnd { now_ms: 1000 });
        assert_eq!(ctx.undo_depth(), depth + 1);
        assert_eq!(ctx.segments(0).unwrap(), &[Segment::text("aか")]);

        assert!(controller.tick(&mut ctx, 5000));
        assert_eq!(ctx.undo_depth(), depth + 2);
    }

    #[test]
    fn test_swapped_rubies_keep_their_new_order() {
        let (mut ctx, mut controller) =
            setup(vec![Segment::ruby("猫", "ねこ"), Segment::ruby("犬", "いぬ"), Segment::text("x")]);
        controller.surface_mut().root_mut().children.swap(0, 1);

        let outcome = controller.handle(&mut ctx, input(0));
        assert_eq!(outcome.sync, Some(SyncOutcome { segments_changed: true, rerendered: true }));
        assert!(controller.surface().markup().starts_with("<ruby data-seg=\"0\" data-type=\"ruby\" contenteditable=\"false\">犬"));

        let segs = controller.rendered_segments().to_vec();
        controller.surface_mut().place_caret(&segs, 3);
        controller.surface_mut().type_text("y");
        controller.handle(&mut ctx, input(100));

        let segments = ctx.segments(0).unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(&segments[..2], &[Segment::ruby("犬", "いぬ"), Segment::ruby("猫", "ねこ")]);
    }

    #[test]
    fn test_selection_reporting() {
        let (mut ctx, mut controller) = setup(example());
        let reports = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&reports);
        controller.on_selection_change(move |sel| sink.borrow_mut().push(sel));

        let segs = controller.rendered_segments().to_vec();
        controller.surface_mut().select_model_range(&segs, 1, 5);
        controller.handle(&mut ctx, InputEvent::SelectionChange);

        controller.surface_mut().place_caret(&segs, 1);
        controller.handle(&mut ctx, InputEvent::SelectionChange);

        let reports = reports.borrow();
        assert_eq!(
            reports[0],
            Some(SegmentSelection { text: "B漢字C".to_string(), start: 1, end: 5 })
        );
        assert_eq!(reports[1], None);
    }

    #[test]
    fn test_selection_ignored_while_composing() {
        let (mut ctx, mut controller) = setup(example());
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        controller.on_selection_change(move |_| *sink.borrow_mut() += 1);

        controller.handle(&mut ctx, InputEvent::CompositionStart);
        controller.handle(&mut ctx, InputEvent::SelectionChange);
        assert_eq!(*count.borrow(), 0);
    }

    #[test]
    fn test_unfocused_surface_reports_no_selection() {
        let (_ctx, mut controller) = setup(example());
        let segs = controller.rendered_segments().to_vec();
        controller.surface_mut().select_model_range(&segs, 0, 2);
        controller.surface_mut().blur();
        assert_eq!(controller.current_selection(), None);
    }

    #[test]
    fn test_ruby_click() {
        let (mut ctx, mut controller) = setup(example());
        let clicked = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&clicked);
        controller.on_ruby_click(move |index| *sink.borrow_mut() = Some(index));

        controller.handle(&mut ctx, InputEvent::Click { position: SurfacePosition::new(vec![1, 2, 0], 1) });
        assert_eq!(*clicked.borrow(), Some(1));

        *clicked.borrow_mut() = None;
        controller.handle(&mut ctx, InputEvent::Click { position: SurfacePosition::new(vec![0, 0], 1) });
        assert_eq!(*clicked.borrow(), None);
    }

    #[test]
    fn test_destroy_swallows_later_events() {
        let (mut ctx, mut controller) = setup(vec![Segment::text("ab")]);
        controller.handle(&mut ctx, InputEvent::CompositionStart);
        controller.surface_mut().place_caret(&[Segment::text("ab")], 2);
        controller.surface_mut().type_text("z");
        controller.destroy();

        let outcome = controller.handle(&mut ctx, InputEvent::CompositionEnd { now_ms: 0 });
        assert_eq!(outcome, EventOutcome::default());
        assert_eq!(ctx.segments(0).unwrap(), &[Segment::text("ab")]);
        assert!(!ctx.is_dirty());
        assert!(!controller.tick(&mut ctx, 10_000));
    }

    #[test]
    fn test_refresh_after_undo() {
        let (mut ctx, mut controller) = setup(example());
        ctx.remove_all_ruby(0).unwrap();
        controller.refresh(&ctx);
        assert_eq!(controller.rendered_segments(), &[Segment::text("AB漢字CD")]);

        ctx.undo();
        controller.refresh(&ctx);
        assert_eq!(controller.rendered_segments(), example().as_slice());
        assert!(controller.surface().markup().contains("かんじ"));
    }
}
