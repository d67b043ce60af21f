//! Integration tests: drawing tools routed through the canvas.

use ink_core::model::{ObjectState, Placement, SceneObject, ShapeKind, ShapeStyle};
use ink_editor::canvas::SketchCanvas;
use ink_editor::config::SketchConfig;
use ink_editor::input::{InputEvent, Modifiers, PointerEvent};
use ink_editor::tools::{CanvasMode, DrawOptions, SceneMutation, Tool, ToolInput};
use pretty_assertions::assert_eq;

fn canvas(tool: &str) -> SketchCanvas {
    let _ = env_logger::builder().is_test(true).try_init();
    SketchCanvas::new(SketchConfig {
        tool: tool.to_string(),
        width: 800.0,
        height: 600.0,
        ..SketchConfig::default()
    })
}

fn down(canvas: &mut SketchCanvas, x: f64, y: f64) {
    canvas.handle(InputEvent::PointerDown(PointerEvent::at(x, y)));
}

fn move_to(canvas: &mut SketchCanvas, x: f64, y: f64) {
    canvas.handle(InputEvent::PointerMove(PointerEvent::at(x, y)));
}

fn up(canvas: &mut SketchCanvas, x: f64, y: f64) {
    canvas.handle(InputEvent::PointerUp(PointerEvent::at(x, y)));
}

fn top_shape(canvas: &SketchCanvas) -> ObjectState {
    let id = *canvas.scene().object_ids().last().unwrap();
    canvas.scene().get(id).unwrap().state.clone()
}

#[test]
fn pencil_stroke_becomes_one_path() {
    let mut canvas = canvas("pencil");
    down(&mut canvas, 10.0, 10.0);
    move_to(&mut canvas, 20.0, 15.0);
    move_to(&mut canvas, 30.0, 25.0);
    up(&mut canvas, 30.0, 25.0);

    assert_eq!(canvas.object_count(), 1);
    assert_eq!(canvas.history().undo_len(), 1);
    let state = top_shape(&canvas);
    assert_eq!(state.shape.type_name(), "path");
    assert_eq!((state.placement.left, state.placement.top), (10.0, 10.0));
    assert_eq!(state.style.stroke_width, 10.0);
}

#[test]
fn click_without_drag_draws_nothing() {
    for tool in ["pencil", "line", "arrow", "rectangle", "circle"] {
        let mut canvas = canvas(tool);
        down(&mut canvas, 50.0, 50.0);
        up(&mut canvas, 50.0, 50.0);
        assert_eq!(canvas.object_count(), 0, "{tool}");
        assert!(!canvas.can_undo(), "{tool}");
    }
}

#[test]
fn circle_radius_follows_the_drag() {
    let mut canvas = canvas("circle");
    down(&mut canvas, 100.0, 100.0);
    move_to(&mut canvas, 130.0, 140.0);
    up(&mut canvas, 130.0, 140.0);

    let state = top_shape(&canvas);
    assert_eq!(state.shape, ShapeKind::Ellipse { rx: 50.0, ry: 50.0 });
    assert_eq!((state.placement.left, state.placement.top), (50.0, 50.0));
}

#[test]
fn shift_constrains_rectangles_to_squares() {
    let mut canvas = canvas("rectangle");
    down(&mut canvas, 0.0, 0.0);
    canvas.handle(InputEvent::PointerUp(
        PointerEvent::at(30.0, 10.0).with_modifiers(Modifiers::SHIFT),
    ));
    assert_eq!(
        top_shape(&canvas).shape,
        ShapeKind::Rect {
            width: 30.0,
            height: 30.0
        }
    );
}

#[test]
fn configured_colors_reach_new_shapes() {
    let mut canvas = SketchCanvas::new(SketchConfig {
        tool: "rectangle".to_string(),
        line_color: "#FF0000".to_string(),
        fill_color: "#00FF00".to_string(),
        line_width: 3.0,
        ..SketchConfig::default()
    });
    down(&mut canvas, 0.0, 0.0);
    up(&mut canvas, 20.0, 20.0);
    let style = top_shape(&canvas).style;
    assert_eq!(style.stroke.map(|c| c.to_hex()), Some("#FF0000".to_string()));
    assert_eq!(style.fill.map(|c| c.to_hex()), Some("#00FF00".to_string()));
    assert_eq!(style.stroke_width, 3.0);
}

#[test]
fn shift_marquee_extends_the_selection() {
    let mut canvas = canvas("rectangle");
    down(&mut canvas, 100.0, 100.0);
    up(&mut canvas, 120.0, 120.0);
    down(&mut canvas, 300.0, 100.0);
    up(&mut canvas, 320.0, 120.0);

    canvas.set_tool("select");
    down(&mut canvas, 110.0, 110.0);
    up(&mut canvas, 110.0, 110.0);
    assert_eq!(canvas.scene().selected().len(), 1);

    let shift = |x, y| PointerEvent::at(x, y).with_modifiers(Modifiers::SHIFT);
    canvas.handle(InputEvent::PointerDown(shift(250.0, 50.0)));
    canvas.handle(InputEvent::PointerMove(shift(350.0, 150.0)));
    canvas.handle(InputEvent::PointerUp(shift(350.0, 150.0)));
    assert_eq!(canvas.scene().selected().len(), 2);
}

#[test]
fn text_and_images_are_centered() {
    let mut canvas = canvas("select");
    let text = canvas.add_text("hi", 40.0);
    let image = canvas.add_image("data:img", 200.0, 100.0, Default::default());

    let scene = canvas.scene();
    let text_state = &scene.get(text).unwrap().state;
    let bounds = text_state.shape.local_bounds();
    assert_eq!(text_state.placement.left, (800.0 - bounds.width()) / 2.0);
    assert!(text_state.style.fill.is_some());
    assert_eq!(text_state.style.stroke, None);

    let image_placement = scene.get(image).unwrap().state.placement;
    assert_eq!((image_placement.left, image_placement.top), (350.0, 275.0));
    assert_eq!(image_placement.scale_x, 0.5);
    assert_eq!(canvas.history().undo_len(), 2);
}

// ─── Custom tools ───────────────────────────────────────────────────────

/// Drops a fixed 10×10 square on every press.
struct StampTool;

impl Tool for StampTool {
    fn name(&self) -> &str {
        "stamp"
    }

    fn configure_canvas(&mut self, _options: &DrawOptions) -> CanvasMode {
        CanvasMode::ClickDrag
    }

    fn cleanup_tool(&mut self) -> Vec<SceneMutation> {
        Vec::new()
    }

    fn mouse_down(&mut self, input: &ToolInput) -> Vec<SceneMutation> {
        let state = ObjectState::new(
            ShapeKind::Rect {
                width: 10.0,
                height: 10.0,
            },
            Placement::at(input.x, input.y),
            ShapeStyle::default(),
        );
        vec![SceneMutation::Add(Box::new(SceneObject::with_state(state)))]
    }

    fn mouse_move(&mut self, _input: &ToolInput) -> Vec<SceneMutation> {
        Vec::new()
    }

    fn mouse_up(&mut self, _input: &ToolInput) -> Vec<SceneMutation> {
        Vec::new()
    }
}

#[test]
fn registered_tools_are_selectable_by_name() {
    let mut canvas = canvas("pencil");
    canvas.tools_mut().register(Box::new(StampTool));
    canvas.set_tool("stamp");
    assert_eq!(canvas.active_tool(), "stamp");
    assert_eq!(canvas.mode(), CanvasMode::ClickDrag);

    down(&mut canvas, 5.0, 5.0);
    up(&mut canvas, 5.0, 5.0);
    down(&mut canvas, 50.0, 5.0);
    up(&mut canvas, 50.0, 5.0);
    assert_eq!(canvas.object_count(), 2);
    assert!(canvas.undo());
    assert_eq!(canvas.object_count(), 1);
}
