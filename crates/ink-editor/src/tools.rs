//! Tool system for canvas interactions.
//!
//! Each tool translates pointer input into `SceneMutation`s that the canvas
//! applies to the scene graph. A tool owns its in-progress shape for the
//! length of one gesture and exposes it through [`Tool::preview`]; nothing
//! reaches the scene until the gesture completes.
//!
//! ## Modifier behaviors
//!
//! | Modifier  | Select Tool          | Rectangle Tool    | Line / Arrow Tool   |
//! |-----------|----------------------|-------------------|---------------------|
//! | **Shift** | Toggle / axis-lock   | Square constraint | Axis constraint     |

use crate::input::Modifiers;
use ink_core::id::ObjectId;
use ink_core::model::*;
use ink_core::transform::linear_distance;
use kurbo::{Point, Rect};
use std::collections::HashMap;

/// Built-in tool kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Select,
    Pencil,
    Line,
    Arrow,
    Rectangle,
    Circle,
    Pan,
    Eraser,
}

impl ToolKind {
    pub const ALL: [ToolKind; 8] = [
        ToolKind::Select,
        ToolKind::Pencil,
        ToolKind::Line,
        ToolKind::Arrow,
        ToolKind::Rectangle,
        ToolKind::Circle,
        ToolKind::Pan,
        ToolKind::Eraser,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Select => "select",
            ToolKind::Pencil => "pencil",
            ToolKind::Line => "line",
            ToolKind::Arrow => "arrow",
            ToolKind::Rectangle => "rectangle",
            ToolKind::Circle => "circle",
            ToolKind::Pan => "pan",
            ToolKind::Eraser => "eraser",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

/// How the canvas routes pointer input while a tool is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CanvasMode {
    /// Strokes are captured point by point.
    #[default]
    Freehand,
    /// Press, drag, release builds one shape.
    ClickDrag,
    /// Objects are selectable and draggable.
    Selection,
    /// Drags move the viewport.
    Pan,
}

/// Drawing defaults applied when a tool becomes active.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawOptions {
    pub stroke: Color,
    pub stroke_width: f64,
    pub fill: Option<Color>,
    pub opacity: f64,
    pub mode: CanvasMode,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            stroke: Color::BLACK,
            stroke_width: 10.0,
            fill: None,
            opacity: 1.0,
            mode: CanvasMode::default(),
        }
    }
}

impl DrawOptions {
    fn shape_style(&self, filled: bool) -> ShapeStyle {
        ShapeStyle {
            stroke: Some(self.stroke),
            stroke_width: self.stroke_width,
            fill: if filled { self.fill } else { None },
            opacity: self.opacity,
        }
    }
}

/// Pointer input as seen by a tool.
#[derive(Debug, Clone, Default)]
pub struct ToolInput {
    /// Scene-space position.
    pub x: f64,
    pub y: f64,
    /// Screen-space position (viewport independent).
    pub screen_x: f64,
    pub screen_y: f64,
    pub modifiers: Modifiers,
    /// Topmost object under the pointer.
    pub hit: Option<ObjectId>,
    /// The scene's current selection.
    pub selection: Vec<ObjectId>,
}

impl ToolInput {
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            screen_x: x,
            screen_y: y,
            ..Self::default()
        }
    }

    fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A change a tool asks the canvas to make.
#[derive(Debug, Clone)]
pub enum SceneMutation {
    /// Add a finished shape on top of the scene.
    Add(Box<SceneObject>),
    /// Replace the selection.
    Select(Vec<ObjectId>),
    /// Select everything intersecting `rect`, optionally keeping the
    /// current selection.
    SelectRect { rect: Rect, extend: bool },
    Deselect,
    /// Move the active object or selection live.
    MoveActive { dx: f64, dy: f64 },
    /// The active object or selection finished moving.
    CommitActive,
    /// Translate the viewport (screen pixels).
    Pan { dx: f64, dy: f64 },
    /// Mask every object under the stroke (scene space).
    Erase(EraserStroke),
}

/// Trait for tools that handle pointer input and produce mutations.
pub trait Tool {
    fn name(&self) -> &str;

    /// Apply drawing defaults; returns the input mode the canvas should use.
    fn configure_canvas(&mut self, options: &DrawOptions) -> CanvasMode;

    /// Drop transient state. A tool aborting a live drag returns the
    /// mutations that revert it.
    fn cleanup_tool(&mut self) -> Vec<SceneMutation>;

    fn mouse_down(&mut self, input: &ToolInput) -> Vec<SceneMutation>;

    fn mouse_move(&mut self, input: &ToolInput) -> Vec<SceneMutation>;

    fn mouse_up(&mut self, input: &ToolInput) -> Vec<SceneMutation>;

    fn mouse_out(&mut self, _input: &ToolInput) -> Vec<SceneMutation> {
        Vec::new()
    }

    /// The in-progress shape, if a gesture is building one.
    fn preview(&self) -> Option<&SceneObject> {
        None
    }
}

// ─── Registry ────────────────────────────────────────────────────────────

/// Tools keyed by name, constructed once per canvas.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ToolRegistry {
    pub fn empty() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(SelectTool::new()));
        registry.register(Box::new(PencilTool::new()));
        for kind in [
            ToolKind::Line,
            ToolKind::Arrow,
            ToolKind::Rectangle,
            ToolKind::Circle,
        ] {
            registry.register(Box::new(ShapeTool::new(kind)));
        }
        registry.register(Box::new(PanTool::new()));
        registry.register(Box::new(EraserTool::new()));
        registry
    }

    /// Add or replace a tool under its own name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn Tool + 'static)> {
        self.tools.get_mut(name).map(|t| t.as_mut())
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ─── Select Tool ─────────────────────────────────────────────────────────

pub struct SelectTool {
    /// Selection as of the current gesture.
    pub selected: Vec<ObjectId>,
    dragging: bool,
    last_x: f64,
    last_y: f64,
    /// Accumulated drag offset, for commit and revert.
    moved_x: f64,
    moved_y: f64,
    /// Marquee (rubber-band) start, set when pointer-down hits empty space.
    pub marquee_start: Option<(f64, f64)>,
    /// Current marquee rectangle. Updated during drag.
    pub marquee_rect: Option<Rect>,
}

impl Default for SelectTool {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectTool {
    pub fn new() -> Self {
        Self {
            selected: Vec::new(),
            dragging: false,
            last_x: 0.0,
            last_y: 0.0,
            moved_x: 0.0,
            moved_y: 0.0,
            marquee_start: None,
            marquee_rect: None,
        }
    }

    fn reset_gesture(&mut self) {
        self.dragging = false;
        self.moved_x = 0.0;
        self.moved_y = 0.0;
        self.marquee_start = None;
        self.marquee_rect = None;
    }
}

impl Tool for SelectTool {
    fn name(&self) -> &str {
        ToolKind::Select.as_str()
    }

    fn configure_canvas(&mut self, _options: &DrawOptions) -> CanvasMode {
        CanvasMode::Selection
    }

    fn cleanup_tool(&mut self) -> Vec<SceneMutation> {
        let revert = if self.dragging && (self.moved_x != 0.0 || self.moved_y != 0.0) {
            vec![SceneMutation::MoveActive {
                dx: -self.moved_x,
                dy: -self.moved_y,
            }]
        } else {
            Vec::new()
        };
        self.reset_gesture();
        self.selected.clear();
        revert
    }

    fn mouse_down(&mut self, input: &ToolInput) -> Vec<SceneMutation> {
        self.reset_gesture();
        self.selected = input.selection.clone();

        match input.hit {
            Some(hit_id) => {
                // Shift+click: toggle object in/out of selection
                if input.modifiers.shift {
                    if let Some(pos) = self.selected.iter().position(|id| *id == hit_id) {
                        self.selected.remove(pos);
                    } else {
                        self.selected.push(hit_id);
                    }
                } else if !self.selected.contains(&hit_id) {
                    self.selected = vec![hit_id];
                }
                // Clicking an already-selected object keeps the selection for drag
                self.dragging = self.selected.contains(&hit_id);
                self.last_x = input.x;
                self.last_y = input.y;
            }
            None => {
                if !input.modifiers.shift {
                    self.selected.clear();
                }
                self.marquee_start = Some((input.x, input.y));
                self.marquee_rect = Some(Rect::new(input.x, input.y, input.x, input.y));
            }
        }

        if self.selected.is_empty() {
            vec![SceneMutation::Deselect]
        } else {
            vec![SceneMutation::Select(self.selected.clone())]
        }
    }

    fn mouse_move(&mut self, input: &ToolInput) -> Vec<SceneMutation> {
        if let Some((sx, sy)) = self.marquee_start {
            self.marquee_rect = Some(Rect::from_points((sx, sy), (input.x, input.y)));
            return Vec::new();
        }
        if !self.dragging || self.selected.is_empty() {
            return Vec::new();
        }

        let mut dx = input.x - self.last_x;
        let mut dy = input.y - self.last_y;
        self.last_x = input.x;
        self.last_y = input.y;

        // Shift: constrain to dominant axis
        if input.modifiers.shift {
            if dx.abs() > dy.abs() {
                dy = 0.0;
            } else {
                dx = 0.0;
            }
        }
        if dx == 0.0 && dy == 0.0 {
            return Vec::new();
        }
        self.moved_x += dx;
        self.moved_y += dy;
        vec![SceneMutation::MoveActive { dx, dy }]
    }

    fn mouse_up(&mut self, input: &ToolInput) -> Vec<SceneMutation> {
        let mutations = if let Some(rect) = self.marquee_rect.take() {
            if rect.width() > 0.0 || rect.height() > 0.0 {
                vec![SceneMutation::SelectRect {
                    rect,
                    extend: input.modifiers.shift,
                }]
            } else {
                Vec::new()
            }
        } else if self.dragging && (self.moved_x != 0.0 || self.moved_y != 0.0) {
            vec![SceneMutation::CommitActive]
        } else {
            Vec::new()
        };
        self.reset_gesture();
        mutations
    }
}

// ─── Shape Tools (line, arrow, rectangle, circle) ────────────────────────

struct Drag {
    origin: Point,
    preview: SceneObject,
}

/// Click-drag tool for one of the basic shapes.
pub struct ShapeTool {
    kind: ToolKind,
    options: DrawOptions,
    drag: Option<Drag>,
}

impl ShapeTool {
    /// `kind` must be one of line, arrow, rectangle or circle.
    pub fn new(kind: ToolKind) -> Self {
        debug_assert!(matches!(
            kind,
            ToolKind::Line | ToolKind::Arrow | ToolKind::Rectangle | ToolKind::Circle
        ));
        Self {
            kind,
            options: DrawOptions::default(),
            drag: None,
        }
    }

    /// Shape and placement spanning `origin` → `to`.
    fn geometry(&self, origin: Point, to: Point, modifiers: Modifiers) -> (ShapeKind, Placement) {
        let mut dx = to.x - origin.x;
        let mut dy = to.y - origin.y;
        match self.kind {
            ToolKind::Circle => {
                let r = linear_distance(origin, to);
                (
                    ShapeKind::Ellipse { rx: r, ry: r },
                    Placement::at(origin.x - r, origin.y - r),
                )
            }
            ToolKind::Rectangle => {
                let mut w = dx.abs();
                let mut h = dy.abs();
                // Shift: constrain to square
                if modifiers.shift {
                    let side = w.max(h);
                    w = side;
                    h = side;
                }
                let left = if dx < 0.0 { origin.x - w } else { origin.x };
                let top = if dy < 0.0 { origin.y - h } else { origin.y };
                (
                    ShapeKind::Rect {
                        width: w,
                        height: h,
                    },
                    Placement::at(left, top),
                )
            }
            _ => {
                if modifiers.shift {
                    if dx.abs() > dy.abs() {
                        dy = 0.0;
                    } else {
                        dx = 0.0;
                    }
                }
                let shape = if self.kind == ToolKind::Arrow {
                    ShapeKind::Arrow {
                        x1: 0.0,
                        y1: 0.0,
                        x2: dx,
                        y2: dy,
                        head: (self.options.stroke_width * 3.0).max(10.0),
                    }
                } else {
                    ShapeKind::Line {
                        x1: 0.0,
                        y1: 0.0,
                        x2: dx,
                        y2: dy,
                    }
                };
                (shape, Placement::at(origin.x, origin.y))
            }
        }
    }

    fn is_degenerate(shape: &ShapeKind) -> bool {
        match *shape {
            ShapeKind::Rect { width, height } => width <= 0.0 || height <= 0.0,
            ShapeKind::Ellipse { rx, ry } => rx <= 0.0 || ry <= 0.0,
            ShapeKind::Line { x1, y1, x2, y2 } | ShapeKind::Arrow { x1, y1, x2, y2, .. } => {
                x1 == x2 && y1 == y2
            }
            _ => false,
        }
    }
}

impl Tool for ShapeTool {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn configure_canvas(&mut self, options: &DrawOptions) -> CanvasMode {
        self.options = options.clone();
        CanvasMode::ClickDrag
    }

    fn cleanup_tool(&mut self) -> Vec<SceneMutation> {
        self.drag = None;
        Vec::new()
    }

    fn mouse_down(&mut self, input: &ToolInput) -> Vec<SceneMutation> {
        let origin = input.point();
        let (shape, placement) = self.geometry(origin, origin, input.modifiers);
        let filled = matches!(self.kind, ToolKind::Rectangle | ToolKind::Circle);
        let state = ObjectState::new(shape, placement, self.options.shape_style(filled));
        self.drag = Some(Drag {
            origin,
            preview: SceneObject::with_state(state),
        });
        Vec::new()
    }

    fn mouse_move(&mut self, input: &ToolInput) -> Vec<SceneMutation> {
        let Some(origin) = self.drag.as_ref().map(|d| d.origin) else {
            return Vec::new();
        };
        let (shape, placement) = self.geometry(origin, input.point(), input.modifiers);
        if let Some(drag) = self.drag.as_mut() {
            drag.preview.state.shape = shape;
            drag.preview.state.placement = placement;
        }
        Vec::new()
    }

    fn mouse_up(&mut self, input: &ToolInput) -> Vec<SceneMutation> {
        let Some(mut drag) = self.drag.take() else {
            return Vec::new();
        };
        let (shape, placement) = self.geometry(drag.origin, input.point(), input.modifiers);
        if Self::is_degenerate(&shape) {
            log::trace!("{}: dropped zero-size shape", self.name());
            return Vec::new();
        }
        drag.preview.state.shape = shape;
        drag.preview.state.placement = placement;
        vec![SceneMutation::Add(Box::new(drag.preview))]
    }

    fn preview(&self) -> Option<&SceneObject> {
        self.drag.as_ref().map(|d| &d.preview)
    }
}

// ─── Pencil Tool (freehand) ──────────────────────────────────────────────

pub struct PencilTool {
    options: DrawOptions,
    points: Vec<Point>,
    preview: Option<SceneObject>,
}

impl Default for PencilTool {
    fn default() -> Self {
        Self::new()
    }
}

impl PencilTool {
    pub fn new() -> Self {
        Self {
            options: DrawOptions::default(),
            points: Vec::new(),
            preview: None,
        }
    }

    /// Smooth the sampled points into quadratic segments through the
    /// midpoints, in a frame whose origin is the stroke's top-left.
    fn build_path(points: &[Point]) -> (Vec<PathCmd>, Placement) {
        let Some(first) = points.first() else {
            return (Vec::new(), Placement::default());
        };
        let bounds = points
            .iter()
            .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p));
        let local = |p: Point| (p.x - bounds.x0, p.y - bounds.y0);

        let (x, y) = local(*first);
        let mut commands = vec![PathCmd::MoveTo(x, y)];
        for pair in points.windows(2).skip(1) {
            let (cx, cy) = local(pair[0]);
            let (nx, ny) = local(pair[1]);
            commands.push(PathCmd::QuadTo(cx, cy, (cx + nx) / 2.0, (cy + ny) / 2.0));
        }
        if let Some(last) = points.last() {
            let (x, y) = local(*last);
            commands.push(PathCmd::LineTo(x, y));
        }
        (commands, Placement::at(bounds.x0, bounds.y0))
    }

    fn stroke_state(&self) -> ObjectState {
        let (commands, placement) = Self::build_path(&self.points);
        ObjectState::new(
            ShapeKind::Path { commands },
            placement,
            self.options.shape_style(false),
        )
    }
}

impl Tool for PencilTool {
    fn name(&self) -> &str {
        ToolKind::Pencil.as_str()
    }

    fn configure_canvas(&mut self, options: &DrawOptions) -> CanvasMode {
        self.options = options.clone();
        CanvasMode::Freehand
    }

    fn cleanup_tool(&mut self) -> Vec<SceneMutation> {
        self.points.clear();
        self.preview = None;
        Vec::new()
    }

    fn mouse_down(&mut self, input: &ToolInput) -> Vec<SceneMutation> {
        self.points.clear();
        self.points.push(input.point());
        self.preview = Some(SceneObject::with_state(self.stroke_state()));
        Vec::new()
    }

    fn mouse_move(&mut self, input: &ToolInput) -> Vec<SceneMutation> {
        if self.preview.is_none() {
            return Vec::new();
        }
        self.points.push(input.point());
        let state = self.stroke_state();
        if let Some(preview) = self.preview.as_mut() {
            preview.state = state;
        }
        Vec::new()
    }

    fn mouse_up(&mut self, input: &ToolInput) -> Vec<SceneMutation> {
        let Some(mut stroke) = self.preview.take() else {
            return Vec::new();
        };
        if self.points.last() != Some(&input.point()) {
            self.points.push(input.point());
        }
        let distinct = self.points.windows(2).any(|w| w[0] != w[1]);
        if !distinct {
            self.points.clear();
            return Vec::new();
        }
        stroke.state = self.stroke_state();
        self.points.clear();
        vec![SceneMutation::Add(Box::new(stroke))]
    }

    fn preview(&self) -> Option<&SceneObject> {
        self.preview.as_ref()
    }
}

// ─── Pan Tool ────────────────────────────────────────────────────────────

pub struct PanTool {
    last: Option<(f64, f64)>,
}

impl Default for PanTool {
    fn default() -> Self {
        Self::new()
    }
}

impl PanTool {
    pub fn new() -> Self {
        Self { last: None }
    }
}

impl Tool for PanTool {
    fn name(&self) -> &str {
        ToolKind::Pan.as_str()
    }

    fn configure_canvas(&mut self, _options: &DrawOptions) -> CanvasMode {
        CanvasMode::Pan
    }

    fn cleanup_tool(&mut self) -> Vec<SceneMutation> {
        self.last = None;
        Vec::new()
    }

    fn mouse_down(&mut self, input: &ToolInput) -> Vec<SceneMutation> {
        self.last = Some((input.screen_x, input.screen_y));
        Vec::new()
    }

    fn mouse_move(&mut self, input: &ToolInput) -> Vec<SceneMutation> {
        let Some((lx, ly)) = self.last else {
            return Vec::new();
        };
        self.last = Some((input.screen_x, input.screen_y));
        vec![SceneMutation::Pan {
            dx: input.screen_x - lx,
            dy: input.screen_y - ly,
        }]
    }

    fn mouse_up(&mut self, _input: &ToolInput) -> Vec<SceneMutation> {
        self.last = None;
        Vec::new()
    }

    fn mouse_out(&mut self, _input: &ToolInput) -> Vec<SceneMutation> {
        self.last = None;
        Vec::new()
    }
}

// ─── Eraser Tool ─────────────────────────────────────────────────────────

pub struct EraserTool {
    width: f64,
    points: Option<Vec<(f64, f64)>>,
}

impl Default for EraserTool {
    fn default() -> Self {
        Self::new()
    }
}

impl EraserTool {
    pub fn new() -> Self {
        Self {
            width: DrawOptions::default().stroke_width,
            points: None,
        }
    }
}

impl Tool for EraserTool {
    fn name(&self) -> &str {
        ToolKind::Eraser.as_str()
    }

    fn configure_canvas(&mut self, options: &DrawOptions) -> CanvasMode {
        self.width = options.stroke_width;
        CanvasMode::Freehand
    }

    fn cleanup_tool(&mut self) -> Vec<SceneMutation> {
        self.points = None;
        Vec::new()
    }

    fn mouse_down(&mut self, input: &ToolInput) -> Vec<SceneMutation> {
        self.points = Some(vec![(input.x, input.y)]);
        Vec::new()
    }

    fn mouse_move(&mut self, input: &ToolInput) -> Vec<SceneMutation> {
        if let Some(points) = self.points.as_mut() {
            points.push((input.x, input.y));
        }
        Vec::new()
    }

    fn mouse_up(&mut self, input: &ToolInput) -> Vec<SceneMutation> {
        let Some(mut points) = self.points.take() else {
            return Vec::new();
        };
        if points.last() != Some(&(input.x, input.y)) {
            points.push((input.x, input.y));
        }
        vec![SceneMutation::Erase(EraserStroke {
            points,
            width: self.width,
        })]
    }
}
