// Surface/model synchronization: offset mapping, render/parse round trips,
// ruby atomicity under uncontrolled edits, Enter and IME handling

use ruby_slides::editor::{CompositionState, InputController, InputEvent, SyncOutcome};
use ruby_slides::surface::{
    parse_markup, render, to_model_offset, to_surface_position, EditableSurface, HeadlessSurface, SurfacePosition,
};
use ruby_slides::{merge_adjacent_text, DocumentContext, EditorConfig, Segment};

fn example() -> Vec<Segment> {
    vec![Segment::text("AB"), Segment::ruby("漢字", "かんじ"), Segment::text("CD")]
}

fn editing(segments: Vec<Segment>) -> (DocumentContext, InputController<HeadlessSurface>) {
    let mut ctx = DocumentContext::default();
    ctx.update_segments_silent(0, segments).expect("slide 0 exists");
    ctx.mark_clean();
    let mut controller = InputController::new(HeadlessSurface::new(), &EditorConfig::default());
    controller.set_slide(&mut ctx, 0).expect("slide 0 exists");
    controller.surface_mut().focus();
    (ctx, controller)
}

fn input(now_ms: u64) -> InputEvent {
    InputEvent::Input { now_ms, is_composing: false }
}

fn rubies(segments: &[Segment]) -> Vec<Segment> {
    segments.iter().filter(|s| s.is_ruby()).cloned().collect()
}

#[test]
fn test_silent_insert_at_model_offset() {
    let (mut ctx, mut controller) = editing(vec![Segment::text("Hello")]);
    let segs = controller.rendered_segments().to_vec();
    controller.surface_mut().place_caret(&segs, 2);
    controller.surface_mut().type_text("X");
    controller.handle(&mut ctx, input(0));

    assert_eq!(ctx.segments(0).unwrap(), &[Segment::text("HeXllo")]);
    assert!(!ctx.can_undo(), "typing is silent until the debounce fires");
    assert!(ctx.is_dirty());
}

#[test]
fn test_offset_inside_ruby_resolves_to_its_boundary() {
    let mut surface = HeadlessSurface::new();
    surface.render(&example());
    let root = surface.root();

    let pos = to_surface_position(root, &example(), 3);
    // A boundary between top-level nodes, never inside the ruby's text
    assert!(pos.container.is_empty(), "resolved into {:?}", pos);
    assert_eq!(to_model_offset(root, &example(), &pos), 2);
}

#[test]
fn test_offset_round_trip_normalizes_inside_ruby() {
    let mut surface = HeadlessSurface::new();
    surface.render(&example());
    let root = surface.root();

    for offset in 0..=6 {
        let pos = to_surface_position(root, &example(), offset);
        let expected = if offset == 3 { 2 } else { offset };
        assert_eq!(to_model_offset(root, &example(), &pos), expected, "offset {}", offset);
    }

    // Out-of-range requests clamp
    let pos = to_surface_position(root, &example(), 99);
    assert_eq!(to_model_offset(root, &example(), &pos), 6);
}

#[test]
fn test_render_parse_round_trip_for_text() {
    let cases = vec![
        vec![Segment::text("plain")],
        vec![Segment::text("line one\nline two")],
        vec![Segment::text("\nleading"), Segment::text("trailing\n")],
        vec![Segment::text("")],
        vec![Segment::text(""), Segment::text("x"), Segment::text("")],
        vec![Segment::text("\n\n")],
        vec![Segment::text("<&> \"quoted\"")],
    ];
    for segments in cases {
        let parsed = parse_markup(&render(&segments), &segments).expect("rendered markup parses");
        assert_eq!(parsed, merge_adjacent_text(segments.clone()), "round trip of {:?}", segments);
    }
}

#[test]
fn test_render_parse_keeps_rubies() {
    let parsed = parse_markup(&render(&example()), &example()).unwrap();
    assert_eq!(parsed, example());
}

#[test]
fn test_typing_next_to_ruby_never_touches_it() {
    let (mut ctx, mut controller) = editing(example());
    for (offset, text) in [(2, "x"), (3, "y"), (4, "z")] {
        let segs = controller.rendered_segments().to_vec();
        controller.surface_mut().place_caret(&segs, offset);
        controller.surface_mut().type_text(text);
        controller.handle(&mut ctx, input(0));
        assert_eq!(rubies(ctx.segments(0).unwrap()), vec![Segment::ruby("漢字", "かんじ")]);
    }
    assert_eq!(ctx.slide_plain_text(0).unwrap().chars().count(), 9);
}

#[test]
fn test_backspace_after_ruby_removes_it_whole() {
    let (mut ctx, mut controller) = editing(example());
    let segs = controller.rendered_segments().to_vec();
    controller.surface_mut().place_caret(&segs, 4);
    controller.surface_mut().delete_backward(&segs);
    let outcome = controller.handle(&mut ctx, input(0));

    assert_eq!(outcome.sync, Some(SyncOutcome { segments_changed: true, rerendered: true }));
    assert_eq!(ctx.segments(0).unwrap(), &[Segment::text("ABCD")]);
    assert_eq!(controller.caret_offset(), Some(2));
}

#[test]
fn test_selection_delete_across_ruby() {
    let (mut ctx, mut controller) = editing(example());
    let segs = controller.rendered_segments().to_vec();
    controller.surface_mut().select_model_range(&segs, 1, 5);
    controller.surface_mut().type_text("-");
    controller.handle(&mut ctx, input(0));

    assert_eq!(ctx.segments(0).unwrap(), &[Segment::text("A-D")]);
}

#[test]
fn test_pasted_ruby_markup_does_not_become_a_ruby() {
    let (mut ctx, mut controller) = editing(example());
    let segs = controller.rendered_segments().to_vec();
    controller.surface_mut().place_caret(&segs, 6);
    controller
        .surface_mut()
        .paste_markup("<ruby data-seg=\"1\" data-type=\"ruby\">猫<rt>ねこ</rt></ruby>")
        .expect("fragment is well formed");
    controller.handle(&mut ctx, input(0));

    let segments = ctx.segments(0).unwrap();
    assert_eq!(rubies(segments), vec![Segment::ruby("漢字", "かんじ")]);
    assert!(ctx.slide_plain_text(0).unwrap().starts_with("AB漢字CD"));
}

#[test]
fn test_malformed_paste_is_rejected() {
    let (_ctx, mut controller) = editing(example());
    let segs = controller.rendered_segments().to_vec();
    controller.surface_mut().place_caret(&segs, 0);
    assert!(controller.surface_mut().paste_markup("<b>open").is_err());
}

#[test]
fn test_enter_then_typing() {
    let (mut ctx, mut controller) = editing(vec![Segment::text("ab")]);
    let segs = controller.rendered_segments().to_vec();
    controller.surface_mut().select_model_range(&segs, 1, 2);

    let outcome = controller.handle(&mut ctx, InputEvent::KeyDown { key: "Enter".to_string(), is_composing: false });
    assert!(outcome.prevent_default);
    assert_eq!(ctx.segments(0).unwrap(), &[Segment::text("a\n")]);

    controller.surface_mut().type_text("c");
    controller.handle(&mut ctx, input(10));
    assert_eq!(ctx.segments(0).unwrap(), &[Segment::text("a\nc")]);
}

#[test]
fn test_other_keys_are_left_to_the_surface() {
    let (mut ctx, mut controller) = editing(vec![Segment::text("ab")]);
    let outcome = controller.handle(&mut ctx, InputEvent::KeyDown { key: "a".to_string(), is_composing: false });
    assert!(!outcome.prevent_default);
    assert!(outcome.sync.is_none());
}

#[test]
fn test_uncommitted_ime_text_never_reaches_the_model() {
    let (mut ctx, mut controller) = editing(vec![Segment::text("今日")]);
    controller.handle(&mut ctx, InputEvent::CompositionStart);
    assert_eq!(controller.state(), CompositionState::Composing);

    let segs = controller.rendered_segments().to_vec();
    controller.surface_mut().place_caret(&segs, 2);
    controller.surface_mut().type_text("は");
    assert!(controller.handle(&mut ctx, input(5)).sync.is_none());
    assert!(controller.sync(&mut ctx).is_none());
    assert_eq!(ctx.segments(0).unwrap(), &[Segment::text("今日")]);
    assert!(!ctx.is_dirty());

    controller.handle(&mut ctx, InputEvent::CompositionEnd { now_ms: 30 });
    assert_eq!(ctx.segments(0).unwrap(), &[Segment::text("今日は")]);
}

#[test]
fn test_composition_end_after_teardown_is_swallowed() {
    let (mut ctx, mut controller) = editing(vec![Segment::text("a")]);
    controller.handle(&mut ctx, InputEvent::CompositionStart);
    controller.surface_mut().place_caret(&[Segment::text("a")], 1);
    controller.surface_mut().type_text("b");
    controller.destroy();

    controller.handle(&mut ctx, InputEvent::CompositionEnd { now_ms: 0 });
    assert_eq!(ctx.segments(0).unwrap(), &[Segment::text("a")]);
    assert!(controller.is_destroyed());
}

#[test]
fn test_refresh_restores_caret_after_ruby_added() {
    let (mut ctx, mut controller) = editing(vec![Segment::text("今日は晴れ")]);
    let segs = controller.rendered_segments().to_vec();
    controller.surface_mut().place_caret(&segs, 4);

    ctx.add_ruby(0, 0, 2, "今日", "きょう").unwrap();
    controller.refresh(&ctx);
    assert_eq!(controller.rendered_segments(), ctx.segments(0).unwrap());
    assert_eq!(controller.caret_offset(), Some(4));
    assert!(controller.surface().markup().contains("<rt>きょう</rt>"));
}

#[test]
fn test_click_reports_ruby_segment() {
    use std::cell::Cell;
    use std::rc::Rc;

    let (mut ctx, mut controller) = editing(example());
    let clicked = Rc::new(Cell::new(None));
    let sink = Rc::clone(&clicked);
    controller.on_ruby_click(move |index| sink.set(Some(index)));

    // Inside the reading of the ruby at top-level index 1
    controller.handle(&mut ctx, InputEvent::Click { position: SurfacePosition::new(vec![1, 2, 0], 0) });
    assert_eq!(clicked.get(), Some(1));
}
