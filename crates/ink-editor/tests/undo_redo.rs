//! Integration tests: history, ledger and coordinator driven through the
//! canvas controller.

use ink_core::id::ObjectId;
use ink_editor::canvas::{BackgroundOptions, SketchCanvas};
use ink_editor::config::SketchConfig;
use ink_editor::input::{InputEvent, PointerEvent};
use pretty_assertions::assert_eq;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn canvas(tool: &str, undo_steps: usize) -> SketchCanvas {
    init_logging();
    SketchCanvas::new(SketchConfig {
        tool: tool.to_string(),
        undo_steps,
        width: 800.0,
        height: 600.0,
        ..SketchConfig::default()
    })
}

fn drag(canvas: &mut SketchCanvas, from: (f64, f64), to: (f64, f64)) {
    canvas.handle(InputEvent::PointerDown(PointerEvent::at(from.0, from.1)));
    canvas.handle(InputEvent::PointerMove(PointerEvent::at(to.0, to.1)));
    canvas.handle(InputEvent::PointerUp(PointerEvent::at(to.0, to.1)));
}

/// Draw a 20×20 rectangle with its top-left at `(x, y)`.
fn draw_rect(canvas: &mut SketchCanvas, x: f64, y: f64) -> ObjectId {
    drag(canvas, (x, y), (x + 20.0, y + 20.0));
    *canvas.scene().object_ids().last().unwrap()
}

fn left(canvas: &SketchCanvas, id: ObjectId) -> f64 {
    canvas.scene().get(id).unwrap().state.placement.left
}

fn version(canvas: &SketchCanvas, id: ObjectId) -> u32 {
    canvas.scene().get(id).unwrap().version
}

/// `(left, scale_x)` of an object.
fn placement(canvas: &SketchCanvas, id: ObjectId) -> (f64, f64) {
    let p = canvas.scene().get(id).unwrap().state.placement;
    (p.left, p.scale_x)
}

// ─── Basic undo/redo ────────────────────────────────────────────────────

#[test]
fn rectangle_create_move_undo_redo() {
    let mut canvas = canvas("rectangle", 25);
    let id = draw_rect(&mut canvas, 10.0, 10.0);
    assert_eq!(version(&canvas, id), 1);

    canvas.set_tool("select");
    drag(&mut canvas, (15.0, 15.0), (55.0, 15.0));
    assert_eq!(left(&canvas, id), 50.0);
    assert_eq!(version(&canvas, id), 2);

    assert!(canvas.undo());
    assert_eq!(left(&canvas, id), 10.0);
    assert_eq!(version(&canvas, id), 1);

    assert!(canvas.undo());
    assert_eq!(canvas.object_count(), 0);
    assert_eq!(version(&canvas, id), 0);
    assert!(!canvas.undo());

    assert!(canvas.redo());
    assert_eq!(canvas.object_count(), 1);
    assert_eq!(left(&canvas, id), 10.0);
    assert_eq!(version(&canvas, id), 1);

    assert!(canvas.redo());
    assert_eq!(left(&canvas, id), 50.0);
    assert_eq!(version(&canvas, id), 2);
    assert!(!canvas.redo());
}

#[test]
fn n_commits_undo_back_to_empty() {
    let mut canvas = canvas("rectangle", 25);
    for i in 0..4 {
        draw_rect(&mut canvas, 30.0 * i as f64, 0.0);
    }
    assert_eq!(canvas.history().undo_len(), 4);

    for _ in 0..4 {
        assert!(canvas.undo());
    }
    assert_eq!(canvas.object_count(), 0);
    assert!(!canvas.can_undo());
    assert_eq!(canvas.history().redo_len(), 4);

    while canvas.redo() {}
    assert_eq!(canvas.object_count(), 4);
    assert_eq!(canvas.history().undo_len(), 4);
}

#[test]
fn new_change_clears_redo() {
    let mut canvas = canvas("rectangle", 25);
    draw_rect(&mut canvas, 0.0, 0.0);
    draw_rect(&mut canvas, 40.0, 0.0);
    canvas.undo();
    assert!(canvas.can_redo());

    draw_rect(&mut canvas, 80.0, 0.0);
    assert!(!canvas.can_redo());
    assert_eq!(canvas.object_count(), 2);
}

#[test]
fn undo_limit_drops_oldest() {
    let mut canvas = canvas("rectangle", 3);
    for i in 0..5 {
        draw_rect(&mut canvas, 30.0 * i as f64, 0.0);
    }
    let mut undone = 0;
    while canvas.undo() {
        undone += 1;
    }
    assert_eq!(undone, 3);
    assert_eq!(canvas.object_count(), 2);
}

// ─── Multi-selection ────────────────────────────────────────────────────

fn select_all(canvas: &mut SketchCanvas) {
    canvas.set_tool("select");
    drag(canvas, (90.0, 90.0), (400.0, 140.0));
}

#[test]
fn deleting_a_selection_is_one_step() {
    let mut canvas = canvas("rectangle", 25);
    let ids: Vec<ObjectId> = (0..3)
        .map(|i| draw_rect(&mut canvas, 100.0 + 40.0 * i as f64, 100.0))
        .collect();
    select_all(&mut canvas);
    assert_eq!(canvas.scene().selected().len(), 3);

    let before = canvas.history().undo_len();
    assert!(canvas.remove_selected());
    assert_eq!(canvas.object_count(), 0);
    assert_eq!(canvas.history().undo_len(), before + 1);

    assert!(canvas.undo());
    assert_eq!(canvas.object_count(), 3);
    let lefts: Vec<f64> = ids.iter().map(|id| left(&canvas, *id)).collect();
    assert_eq!(lefts, vec![100.0, 140.0, 180.0]);
    assert!(ids.iter().all(|id| version(&canvas, *id) == 1));

    assert!(canvas.redo());
    assert_eq!(canvas.object_count(), 0);
}

#[test]
fn moving_a_selection_undoes_atomically() {
    let mut canvas = canvas("rectangle", 25);
    let a = draw_rect(&mut canvas, 100.0, 100.0);
    let b = draw_rect(&mut canvas, 140.0, 100.0);
    select_all(&mut canvas);
    drag(&mut canvas, (110.0, 110.0), (160.0, 110.0));

    // Leave the selection so placements are back in canvas space.
    canvas.set_tool("pencil");
    assert_eq!((left(&canvas, a), left(&canvas, b)), (150.0, 190.0));
    assert_eq!(canvas.history().undo_len(), 3);

    assert!(canvas.undo());
    assert_eq!((left(&canvas, a), left(&canvas, b)), (100.0, 140.0));
    assert_eq!((version(&canvas, a), version(&canvas, b)), (1, 1));

    assert!(canvas.redo());
    assert_eq!((left(&canvas, a), left(&canvas, b)), (150.0, 190.0));
}

// ─── Tool switching ─────────────────────────────────────────────────────

#[test]
fn switching_tools_mid_drag_records_nothing() {
    let mut canvas = canvas("rectangle", 25);
    canvas.handle(InputEvent::PointerDown(PointerEvent::at(10.0, 10.0)));
    canvas.handle(InputEvent::PointerMove(PointerEvent::at(60.0, 60.0)));
    assert!(canvas.preview().is_some());

    canvas.set_tool("select");
    assert!(canvas.preview().is_none());
    assert_eq!(canvas.object_count(), 0);
    assert_eq!(canvas.history().undo_len(), 0);
}

#[test]
fn switching_tools_mid_move_reverts_it() {
    let mut canvas = canvas("rectangle", 25);
    let id = draw_rect(&mut canvas, 10.0, 10.0);
    canvas.set_tool("select");
    canvas.handle(InputEvent::PointerDown(PointerEvent::at(15.0, 15.0)));
    canvas.handle(InputEvent::PointerMove(PointerEvent::at(45.0, 15.0)));
    assert_eq!(left(&canvas, id), 40.0);

    canvas.set_tool("pencil");
    assert_eq!(left(&canvas, id), 10.0);
    assert_eq!(version(&canvas, id), 1);
    assert_eq!(canvas.history().undo_len(), 1);
}

// ─── Background eraser ──────────────────────────────────────────────────

#[test]
fn background_erasure_undoes_stroke_by_stroke() {
    let mut canvas = canvas("eraser", 25);
    let bg = canvas.set_background_image("data:bg", 300.0, 300.0, BackgroundOptions::default());
    let strokes = |canvas: &SketchCanvas| {
        canvas
            .scene()
            .get(bg)
            .unwrap()
            .state
            .eraser
            .as_ref()
            .map_or(0, |mask| mask.strokes.len())
    };

    drag(&mut canvas, (10.0, 10.0), (50.0, 10.0));
    drag(&mut canvas, (10.0, 40.0), (50.0, 40.0));
    assert_eq!(strokes(&canvas), 2);
    assert_eq!(canvas.history().undo_len(), 2);

    assert!(canvas.undo());
    assert_eq!(strokes(&canvas), 1);
    assert!(canvas.undo());
    assert_eq!(strokes(&canvas), 0);
    assert!(canvas.redo());
    assert_eq!(strokes(&canvas), 1);

    // The background never enters the undoable object set.
    assert_eq!(canvas.object_count(), 1);
    assert_eq!(version(&canvas, bg), 0);
}

#[test]
fn erasing_a_shape_records_a_modification() {
    let mut canvas = canvas("rectangle", 25);
    let id = draw_rect(&mut canvas, 100.0, 100.0);
    canvas.set_tool("eraser");
    drag(&mut canvas, (105.0, 110.0), (115.0, 110.0));
    assert_eq!(version(&canvas, id), 2);
    let mask = canvas.scene().get(id).unwrap().state.eraser.clone().unwrap();
    // Stored in the object's local frame.
    assert_eq!(mask.strokes[0].points[0], (5.0, 10.0));

    assert!(canvas.undo());
    assert!(canvas.scene().get(id).unwrap().state.eraser.is_none());
}

// ─── Zoom & resize ──────────────────────────────────────────────────────

#[test]
fn undo_after_zoom_lands_in_the_zoomed_frame() {
    let mut canvas = canvas("rectangle", 25);
    let id = draw_rect(&mut canvas, 10.0, 10.0);
    canvas.set_tool("select");
    drag(&mut canvas, (15.0, 15.0), (65.0, 15.0));
    assert_eq!(left(&canvas, id), 60.0);

    canvas.zoom(2.0);
    assert_eq!(placement(&canvas, id), (120.0, 2.0));

    assert!(canvas.undo());
    assert_eq!(placement(&canvas, id), (20.0, 2.0));
    assert!(canvas.redo());
    assert_eq!(placement(&canvas, id), (120.0, 2.0));

    assert!(canvas.undo());
    assert!(canvas.undo());
    assert_eq!(canvas.object_count(), 0);
    assert!(canvas.redo());
    assert_eq!(placement(&canvas, id), (20.0, 2.0));
}

#[test]
fn undo_after_resize_lands_in_the_resized_frame() {
    let mut canvas = canvas("rectangle", 25);
    let id = draw_rect(&mut canvas, 100.0, 100.0);
    // 800×600 → 400×300 after the 2px width correction.
    canvas.resize(402.0, 300.0);
    assert_eq!(placement(&canvas, id), (50.0, 0.5));

    canvas.set_tool("select");
    drag(&mut canvas, (55.0, 55.0), (75.0, 55.0));
    assert_eq!(left(&canvas, id), 70.0);
    assert_eq!(version(&canvas, id), 2);

    assert!(canvas.undo());
    assert_eq!(placement(&canvas, id), (50.0, 0.5));
    assert_eq!(version(&canvas, id), 1);
}

// ─── Resident objects ───────────────────────────────────────────────────

#[test]
fn abandoned_redos_are_purged() {
    let mut canvas = canvas("rectangle", 25);
    for _ in 0..50 {
        draw_rect(&mut canvas, 10.0, 10.0);
        assert!(canvas.undo());
    }
    draw_rect(&mut canvas, 10.0, 10.0);

    assert_eq!(canvas.object_count(), 1);
    assert_eq!(canvas.scene().resident_len(), 1);
    assert!(!canvas.can_redo());
}

#[test]
fn removals_past_the_undo_limit_are_purged() {
    let mut canvas = canvas("rectangle", 2);
    let doomed = draw_rect(&mut canvas, 100.0, 100.0);
    canvas.set_tool("select");
    drag(&mut canvas, (110.0, 110.0), (110.0, 110.0));
    assert!(canvas.remove_selected());
    assert!(canvas.scene().contains(doomed));

    canvas.set_tool("rectangle");
    draw_rect(&mut canvas, 200.0, 100.0);
    // The removal is still undoable.
    assert!(canvas.scene().contains(doomed));
    draw_rect(&mut canvas, 300.0, 100.0);

    assert!(!canvas.scene().contains(doomed));
    assert_eq!(canvas.scene().resident_len(), 2);
}

#[test]
fn replaced_background_images_are_purged() {
    let mut canvas = canvas("eraser", 25);
    let first = canvas.set_background_image("data:a", 300.0, 300.0, BackgroundOptions::default());
    drag(&mut canvas, (10.0, 10.0), (50.0, 10.0));
    assert!(canvas.can_undo());

    let second = canvas.set_background_image("data:b", 300.0, 300.0, BackgroundOptions::default());
    assert!(!canvas.scene().contains(first));
    assert_eq!(canvas.background_image(), Some(second));
    assert_eq!(canvas.scene().resident_len(), 1);
}

// ─── Listener ───────────────────────────────────────────────────────────

#[test]
fn undo_and_redo_notify_without_pointer() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut canvas = canvas("rectangle", 25);
    let seen: Rc<RefCell<Vec<bool>>> = Rc::default();
    let sink = Rc::clone(&seen);
    canvas.set_on_change(move |p| sink.borrow_mut().push(p.is_some()));

    draw_rect(&mut canvas, 0.0, 0.0);
    canvas.tick(10.0);
    canvas.undo();
    canvas.redo();
    assert_eq!(*seen.borrow(), vec![true, false, false]);
}
