//! The `SlideEditor` handle exported to JavaScript
//!
//! One editor owns a document context and an input controller over a
//! [`HeadlessSurface`]. The host mirrors its live editable region into the
//! headless surface (`mirrorSurface`), forwards raw events (`handleEvent`)
//! and, when an outcome reports a re-render, replaces its region with
//! `surfaceMarkup()` and puts the caret at `caretPosition()`.
//!
//! Timers are polled: the host calls `tick()` from its own timer and
//! `autoSaveDue()` from its auto-save interval.

use wasm_bindgen::prelude::*;

use super::helpers::{deserialize, serialize, timestamp_ms, to_js_error, validate_selection_range, validation_error};
use crate::config::EditorConfig;
use crate::document::{import_title_from_path, split_import_text, DocumentContext, DEFAULT_IMPORT_DELIMITER};
use crate::editor::{AutoSaveTimer, InputController, InputEvent};
use crate::models::{Manuscript, Segment};
use crate::persistence;
use crate::surface::{EditableSurface, HeadlessSurface, SurfaceRange};
use crate::{wasm_error, wasm_warn};

#[wasm_bindgen]
pub struct SlideEditor {
    ctx: DocumentContext,
    controller: InputController<HeadlessSurface>,
    auto_save: AutoSaveTimer,
}

impl SlideEditor {
    fn from_config(config: &EditorConfig) -> Self {
        let mut editor = Self {
            ctx: DocumentContext::new(config),
            controller: InputController::new(HeadlessSurface::new(), config),
            auto_save: AutoSaveTimer::from_config(config),
        };
        editor.show_current_slide();
        editor
    }

    /// Point the controller at the context's current slide
    fn show_current_slide(&mut self) {
        let index = self.ctx.current_slide_index();
        if let Err(err) = self.controller.set_slide(&mut self.ctx, index) {
            wasm_warn!("could not show slide {}: {}", index, err);
        }
    }

    /// Re-render after a recorded mutation; follows the current slide when
    /// the mutation moved it
    fn rerender(&mut self) {
        if self.controller.slide_index() == self.ctx.current_slide_index() {
            self.controller.refresh(&self.ctx);
        } else {
            self.show_current_slide();
        }
    }

    fn install(&mut self) {
        self.auto_save.start(timestamp_ms(None));
        self.show_current_slide();
    }
}

#[wasm_bindgen]
impl SlideEditor {
    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Create an editor. `config` is an optional partial `EditorConfig`.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<SlideEditor, JsValue> {
        let config: EditorConfig = if config.is_undefined() || config.is_null() {
            EditorConfig::default()
        } else {
            deserialize(config, "Invalid editor configuration")?
        };
        let mut editor = Self::from_config(&config);
        editor.auto_save.start(timestamp_ms(None));
        log::info!("slide editor created (undo limit {})", config.undo_limit);
        Ok(editor)
    }

    /// Cancel timers and detach callbacks; later events are ignored
    pub fn destroy(&mut self) {
        self.controller.destroy();
        self.auto_save.cancel();
        log::info!("slide editor destroyed");
    }

    // ── Whole-document operations ─────────────────────────────────────────

    #[wasm_bindgen(js_name = loadManuscript)]
    pub fn load_manuscript(&mut self, data: JsValue, path: Option<String>) -> Result<(), JsValue> {
        let manuscript: Manuscript = deserialize(data, "Invalid manuscript")?;
        self.ctx.load_manuscript(manuscript, path.map(Into::into));
        self.install();
        Ok(())
    }

    #[wasm_bindgen(js_name = newManuscript)]
    pub fn new_manuscript(&mut self) {
        self.ctx.new_manuscript();
        self.install();
    }

    #[wasm_bindgen(js_name = importManuscript)]
    pub fn import_manuscript(&mut self, data: JsValue) -> Result<(), JsValue> {
        let manuscript: Manuscript = deserialize(data, "Invalid manuscript")?;
        self.ctx.import_manuscript(manuscript);
        self.install();
        Ok(())
    }

    /// Import plain text, one slide per delimited chunk
    #[wasm_bindgen(js_name = importText)]
    pub fn import_text(&mut self, text: &str, source_path: &str, delimiter: Option<String>) -> usize {
        let delimiter = delimiter.as_deref().unwrap_or(DEFAULT_IMPORT_DELIMITER);
        let chunks = split_import_text(text, delimiter);
        let title = import_title_from_path(source_path);
        self.ctx.import_manuscript(Manuscript::from_import(title, &chunks));
        self.install();
        self.ctx.slide_count()
    }

    /// Load a manuscript file's TOML content
    #[wasm_bindgen(js_name = loadToml)]
    pub fn load_toml(&mut self, content: &str, path: Option<String>) -> Result<(), JsValue> {
        let manuscript = persistence::from_toml_str(content).map_err(|e| to_js_error(e, "Failed to load manuscript"))?;
        self.ctx.load_manuscript(manuscript, path.map(Into::into));
        self.install();
        Ok(())
    }

    /// The manuscript encoded for saving
    #[wasm_bindgen(js_name = toToml)]
    pub fn to_toml(&self) -> Result<String, JsValue> {
        persistence::to_toml_string(self.ctx.manuscript()).map_err(|e| to_js_error(e, "Failed to save manuscript"))
    }

    /// The host finished writing the manuscript to `path`
    #[wasm_bindgen(js_name = markSaved)]
    pub fn mark_saved(&mut self, path: &str) {
        self.ctx.mark_saved(path);
    }

    pub fn manuscript(&self) -> Result<JsValue, JsValue> {
        serialize(self.ctx.manuscript(), "Failed to serialize manuscript")
    }

    #[wasm_bindgen(js_name = filePath)]
    pub fn file_path(&self) -> Option<String> {
        self.ctx.file_path().map(|p| p.display().to_string())
    }

    #[wasm_bindgen(js_name = isDirty)]
    pub fn is_dirty(&self) -> bool {
        self.ctx.is_dirty()
    }

    // ── Structural mutations ──────────────────────────────────────────────

    pub fn title(&self) -> String {
        self.ctx.title().to_string()
    }

    #[wasm_bindgen(js_name = setTitle)]
    pub fn set_title(&mut self, title: &str) {
        self.ctx.set_title(title);
    }

    #[wasm_bindgen(js_name = slideCount)]
    pub fn slide_count(&self) -> usize {
        self.ctx.slide_count()
    }

    #[wasm_bindgen(js_name = currentSlide)]
    pub fn current_slide(&self) -> usize {
        self.ctx.current_slide_index()
    }

    #[wasm_bindgen(js_name = selectSlide)]
    pub fn select_slide(&mut self, index: usize) -> Result<(), JsValue> {
        self.controller
            .set_slide(&mut self.ctx, index)
            .map_err(|e| to_js_error(e, "Failed to select slide"))
    }

    #[wasm_bindgen(js_name = addSlide)]
    pub fn add_slide(&mut self, at: Option<usize>) -> usize {
        let index = self.ctx.add_slide(at);
        self.rerender();
        index
    }

    #[wasm_bindgen(js_name = duplicateSlide)]
    pub fn duplicate_slide(&mut self, index: usize) -> Result<usize, JsValue> {
        let copy = self
            .ctx
            .duplicate_slide(index)
            .map_err(|e| to_js_error(e, "Failed to duplicate slide"))?;
        self.rerender();
        Ok(copy)
    }

    /// Returns false when the slide is the only one left
    #[wasm_bindgen(js_name = removeSlide)]
    pub fn remove_slide(&mut self, index: usize) -> Result<bool, JsValue> {
        let removed = self
            .ctx
            .remove_slide(index)
            .map_err(|e| to_js_error(e, "Failed to remove slide"))?;
        if removed {
            self.show_current_slide();
        }
        Ok(removed)
    }

    #[wasm_bindgen(js_name = moveSlide)]
    pub fn move_slide(&mut self, from: usize, to: usize) -> Result<(), JsValue> {
        self.ctx
            .move_slide(from, to)
            .map_err(|e| to_js_error(e, "Failed to move slide"))?;
        self.show_current_slide();
        Ok(())
    }

    // ── Content ───────────────────────────────────────────────────────────

    pub fn segments(&self, slide: usize) -> Result<JsValue, JsValue> {
        let segments = self.ctx.segments(slide).map_err(|e| to_js_error(e, "Failed to read segments"))?;
        serialize(&segments, "Failed to serialize segments")
    }

    #[wasm_bindgen(js_name = updateSegments)]
    pub fn update_segments(&mut self, slide: usize, segments: JsValue) -> Result<(), JsValue> {
        let segments: Vec<Segment> = deserialize(segments, "Invalid segments")?;
        self.ctx
            .update_segments(slide, segments)
            .map_err(|e| to_js_error(e, "Failed to update segments"))?;
        self.rerender();
        Ok(())
    }

    #[wasm_bindgen(js_name = updateSegmentsSilent)]
    pub fn update_segments_silent(&mut self, slide: usize, segments: JsValue) -> Result<(), JsValue> {
        let segments: Vec<Segment> = deserialize(segments, "Invalid segments")?;
        self.ctx
            .update_segments_silent(slide, segments)
            .map_err(|e| to_js_error(e, "Failed to update segments"))?;
        self.rerender();
        Ok(())
    }

    #[wasm_bindgen(js_name = snapshotForUndo)]
    pub fn snapshot_for_undo(&mut self) {
        self.ctx.snapshot_for_undo();
    }

    #[wasm_bindgen(js_name = setSlideKeyBinding)]
    pub fn set_slide_key_binding(&mut self, slide: usize, key: Option<String>) -> Result<(), JsValue> {
        self.ctx
            .set_slide_key_binding(slide, key)
            .map_err(|e| to_js_error(e, "Failed to set key binding"))
    }

    #[wasm_bindgen(js_name = setSlideFontSize)]
    pub fn set_slide_font_size(&mut self, slide: usize, size: Option<u32>) -> Result<(), JsValue> {
        self.ctx
            .set_slide_font_size(slide, size)
            .map_err(|e| to_js_error(e, "Failed to set font size"))
    }

    #[wasm_bindgen(js_name = setSlideFontColor)]
    pub fn set_slide_font_color(&mut self, slide: usize, color: Option<String>) -> Result<(), JsValue> {
        self.ctx
            .set_slide_font_color(slide, color)
            .map_err(|e| to_js_error(e, "Failed to set font color"))
    }

    // ── History ───────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        let undone = self.ctx.undo();
        if undone {
            self.rerender();
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.ctx.redo();
        if redone {
            self.rerender();
        }
        redone
    }

    #[wasm_bindgen(js_name = canUndo)]
    pub fn can_undo(&self) -> bool {
        self.ctx.can_undo()
    }

    #[wasm_bindgen(js_name = canRedo)]
    pub fn can_redo(&self) -> bool {
        self.ctx.can_redo()
    }

    // ── Ruby ──────────────────────────────────────────────────────────────

    #[wasm_bindgen(js_name = addRuby)]
    pub fn add_ruby(&mut self, slide: usize, start: usize, end: usize, base: &str, reading: &str) -> Result<(), JsValue> {
        let len = self
            .ctx
            .slide(slide)
            .map_err(|e| to_js_error(e, "Failed to add ruby"))?
            .model_len();
        validate_selection_range(start.min(end), start.max(end), len).map_err(validation_error)?;
        self.ctx
            .add_ruby(slide, start, end, base, reading)
            .map_err(|e| to_js_error(e, "Failed to add ruby"))?;
        self.rerender();
        Ok(())
    }

    #[wasm_bindgen(js_name = editRuby)]
    pub fn edit_ruby(&mut self, slide: usize, segment: usize, base: &str, reading: &str) -> Result<(), JsValue> {
        self.ctx
            .edit_ruby(slide, segment, base, reading)
            .map_err(|e| to_js_error(e, "Failed to edit ruby"))?;
        self.rerender();
        Ok(())
    }

    #[wasm_bindgen(js_name = removeAllRuby)]
    pub fn remove_all_ruby(&mut self, slide: usize) -> Result<(), JsValue> {
        self.ctx
            .remove_all_ruby(slide)
            .map_err(|e| to_js_error(e, "Failed to remove rubies"))?;
        self.rerender();
        Ok(())
    }

    #[wasm_bindgen(js_name = slidePlainText)]
    pub fn slide_plain_text(&self, slide: usize) -> Result<String, JsValue> {
        self.ctx
            .slide_plain_text(slide)
            .map_err(|e| to_js_error(e, "Failed to read slide"))
    }

    // ── Find / replace ────────────────────────────────────────────────────

    #[wasm_bindgen(js_name = countMatches)]
    pub fn count_matches(&self, query: &str) -> usize {
        self.ctx.count_matches(query)
    }

    #[wasm_bindgen(js_name = replaceOne)]
    pub fn replace_one(&mut self, query: &str, replacement: &str) -> bool {
        let replaced = self.ctx.replace_one(query, replacement);
        if replaced {
            self.rerender();
        }
        replaced
    }

    #[wasm_bindgen(js_name = replaceAll)]
    pub fn replace_all(&mut self, query: &str, replacement: &str) -> usize {
        let changed = self.ctx.replace_all(query, replacement);
        if changed > 0 {
            self.rerender();
        }
        changed
    }

    // ── Surface ───────────────────────────────────────────────────────────

    /// Copy the host's live region into the editor: its markup, its
    /// selection (a `SurfaceRange` or null) and its focus state
    #[wasm_bindgen(js_name = mirrorSurface)]
    pub fn mirror_surface(&mut self, markup: &str, selection: JsValue, focused: bool) -> Result<(), JsValue> {
        let selection: Option<SurfaceRange> = if selection.is_undefined() || selection.is_null() {
            None
        } else {
            Some(deserialize(selection, "Invalid surface selection")?)
        };
        let surface = self.controller.surface_mut();
        surface
            .load_markup(markup)
            .map_err(|e| to_js_error(e, "Invalid surface markup"))?;
        surface.set_selection(selection);
        if focused {
            surface.focus();
        } else {
            surface.blur();
        }
        Ok(())
    }

    /// Dispatch one `InputEvent`; returns the `EventOutcome`
    #[wasm_bindgen(js_name = handleEvent)]
    pub fn handle_event(&mut self, event: JsValue) -> Result<JsValue, JsValue> {
        let event: InputEvent = deserialize(event, "Invalid input event")?;
        let outcome = self.controller.handle(&mut self.ctx, event);
        serialize(&outcome, "Failed to serialize event outcome")
    }

    /// Fire the debounced undo snapshot if due
    pub fn tick(&mut self, now_ms: Option<f64>) -> bool {
        self.controller.tick(&mut self.ctx, timestamp_ms(now_ms))
    }

    /// The rendered surface content
    #[wasm_bindgen(js_name = surfaceMarkup)]
    pub fn surface_markup(&self) -> String {
        self.controller.surface().markup()
    }

    /// The surface caret (`SurfacePosition`) or null
    #[wasm_bindgen(js_name = caretPosition)]
    pub fn caret_position(&self) -> Result<JsValue, JsValue> {
        match self.controller.surface().caret() {
            Some(caret) => serialize(caret, "Failed to serialize caret"),
            None => Ok(JsValue::NULL),
        }
    }

    /// Caret as a model offset, if there is a caret
    #[wasm_bindgen(js_name = caretOffset)]
    pub fn caret_offset(&self) -> Option<usize> {
        self.controller.caret_offset()
    }

    // ── Callbacks ─────────────────────────────────────────────────────────

    /// `callback({text, start, end} | null)` on every selection change
    #[wasm_bindgen(js_name = onSelectionChange)]
    pub fn on_selection_change(&mut self, callback: js_sys::Function) {
        self.controller.on_selection_change(move |selection| {
            let value = match serialize(&selection, "Failed to serialize selection") {
                Ok(value) => value,
                Err(_) => JsValue::NULL,
            };
            if let Err(err) = callback.call1(&JsValue::NULL, &value) {
                wasm_error!("selection callback failed: {:?}", err);
            }
        });
    }

    /// `callback(segmentIndex)` when a click lands on a ruby
    #[wasm_bindgen(js_name = onRubyClick)]
    pub fn on_ruby_click(&mut self, callback: js_sys::Function) {
        self.controller.on_ruby_click(move |index| {
            if let Err(err) = callback.call1(&JsValue::NULL, &JsValue::from(index as u32)) {
                wasm_error!("ruby click callback failed: {:?}", err);
            }
        });
    }

    // ── Auto-save ─────────────────────────────────────────────────────────

    #[wasm_bindgen(js_name = setAutoSave)]
    pub fn set_auto_save(&mut self, enabled: bool) {
        self.auto_save.set_enabled(enabled);
        if !self.auto_save.is_running() {
            self.auto_save.start(timestamp_ms(None));
        }
    }

    /// True when the host should save now (auto-save on, dirty, path known)
    #[wasm_bindgen(js_name = autoSaveDue)]
    pub fn auto_save_due(&mut self, now_ms: Option<f64>) -> bool {
        if self.controller.is_destroyed() {
            return false;
        }
        self.auto_save.due(timestamp_ms(now_ms), &self.ctx)
    }
}
