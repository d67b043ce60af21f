//! Core drawing model: colors, shapes, placement, style, and the
//! `SceneObject` record that the scene graph, version ledger and history
//! engine all refer to.
//!
//! Geometry is expressed in an object-local frame whose origin is the
//! object's top-left corner. `Placement` maps that frame into the parent
//! frame (the canvas for top-level objects, the owning group otherwise).

use crate::id::ObjectId;
use crate::snapshot::ObjectSnapshot;
use kurbo::{Point, Rect};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Helper to parse a single hex digit.
pub fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a hex color string: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();

        let short = |i: usize| hex_val(bytes[i]).map(|v| (v * 17) as f32 / 255.0);
        let long = |i: usize| {
            Some((hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?) as f32 / 255.0)
        };

        match bytes.len() {
            3 => Some(Self::rgba(short(0)?, short(1)?, short(2)?, 1.0)),
            4 => Some(Self::rgba(short(0)?, short(1)?, short(2)?, short(3)?)),
            6 => Some(Self::rgba(long(0)?, long(2)?, long(4)?, 1.0)),
            8 => Some(Self::rgba(long(0)?, long(2)?, long(4)?, long(6)?)),
            _ => None,
        }
    }

    /// Parse a host color string: hex, `transparent`, or a basic CSS name.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "transparent" => Some(Self::TRANSPARENT),
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            "red" => Some(Self::rgba(1.0, 0.0, 0.0, 1.0)),
            "green" => Some(Self::rgba(0.0, 128.0 / 255.0, 0.0, 1.0)),
            "blue" => Some(Self::rgba(0.0, 0.0, 1.0, 1.0)),
            "yellow" => Some(Self::rgba(1.0, 1.0, 0.0, 1.0)),
            "gray" | "grey" => Some(Self::rgba(128.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0, 1.0)),
            _ => Self::from_hex(s),
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    /// Emit as shortest valid hex string.
    pub fn to_hex(&self) -> String {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let (r, g, b, a) = (channel(self.r), channel(self.g), channel(self.b), channel(self.a));
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color `{s}`")))
    }
}

// ─── Path data ───────────────────────────────────────────────────────────

/// A single path command, in object-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathCmd {
    MoveTo(f64, f64),
    LineTo(f64, f64),
    QuadTo(f64, f64, f64, f64), // control, end
    Close,
}

impl PathCmd {
    fn points(&self) -> SmallVec<[Point; 2]> {
        match *self {
            PathCmd::MoveTo(x, y) | PathCmd::LineTo(x, y) => smallvec::smallvec![Point::new(x, y)],
            PathCmd::QuadTo(cx, cy, x, y) => {
                smallvec::smallvec![Point::new(cx, cy), Point::new(x, y)]
            }
            PathCmd::Close => SmallVec::new(),
        }
    }
}

// ─── Shapes ──────────────────────────────────────────────────────────────

/// Geometry of a drawable object. Coordinates are object-local.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShapeKind {
    Rect {
        width: f64,
        height: f64,
    },
    /// Ellipse inscribed in `[0, 2rx] × [0, 2ry]`. Circles have `rx == ry`.
    Ellipse {
        rx: f64,
        ry: f64,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
    /// A line with an arrow head at `(x2, y2)`.
    Arrow {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        head: f64,
    },
    /// Freehand stroke.
    Path {
        commands: Vec<PathCmd>,
    },
    Text {
        text: String,
        #[serde(rename = "fontSize")]
        font_size: f64,
    },
    Image {
        src: String,
        width: f64,
        height: f64,
    },
    /// Container; members are owned through scene-graph edges.
    Group,
}

impl ShapeKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ShapeKind::Rect { .. } => "rect",
            ShapeKind::Ellipse { .. } => "ellipse",
            ShapeKind::Line { .. } => "line",
            ShapeKind::Arrow { .. } => "arrow",
            ShapeKind::Path { .. } => "path",
            ShapeKind::Text { .. } => "text",
            ShapeKind::Image { .. } => "image",
            ShapeKind::Group => "group",
        }
    }

    /// Local bounding box. Groups report an empty box here; their extent is
    /// the union of their members, computed by the scene graph.
    pub fn local_bounds(&self) -> Rect {
        match self {
            ShapeKind::Rect { width, height } => Rect::new(0.0, 0.0, *width, *height),
            ShapeKind::Ellipse { rx, ry } => Rect::new(0.0, 0.0, rx * 2.0, ry * 2.0),
            ShapeKind::Line { x1, y1, x2, y2 } | ShapeKind::Arrow { x1, y1, x2, y2, .. } => {
                Rect::from_points((*x1, *y1), (*x2, *y2))
            }
            ShapeKind::Path { commands } => {
                let mut pts = commands.iter().flat_map(PathCmd::points);
                match pts.next() {
                    Some(first) => pts.fold(Rect::from_points(first, first), |r, p| r.union_pt(p)),
                    None => Rect::ZERO,
                }
            }
            ShapeKind::Text { text, font_size } => {
                // Approximate metrics; rendering owns the exact ones.
                let longest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
                let lines = text.lines().count().max(1);
                Rect::new(
                    0.0,
                    0.0,
                    longest as f64 * font_size * 0.6,
                    lines as f64 * font_size * 1.16,
                )
            }
            ShapeKind::Image { width, height, .. } => Rect::new(0.0, 0.0, *width, *height),
            ShapeKind::Group => Rect::ZERO,
        }
    }
}

// ─── Placement ───────────────────────────────────────────────────────────

/// Position, rotation, scale and flip of an object within its parent frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Placement {
    pub left: f64,
    pub top: f64,
    /// Degrees, clockwise.
    pub angle: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            angle: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            flip_x: false,
            flip_y: false,
        }
    }
}

impl Placement {
    pub fn at(left: f64, top: f64) -> Self {
        Self {
            left,
            top,
            ..Self::default()
        }
    }
}

// ─── Style ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShapeStyle {
    pub stroke: Option<Color>,
    pub stroke_width: f64,
    pub fill: Option<Color>,
    pub opacity: f64,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            stroke: Some(Color::BLACK),
            stroke_width: 1.0,
            fill: None,
            opacity: 1.0,
        }
    }
}

// ─── Eraser mask ─────────────────────────────────────────────────────────

/// One eraser stroke, in the erased object's local frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraserStroke {
    pub points: Vec<(f64, f64)>,
    pub width: f64,
}

impl EraserStroke {
    /// Bounding box of the stroke including its half width.
    pub fn bounds(&self) -> Rect {
        let mut pts = self.points.iter().map(|&(x, y)| Point::new(x, y));
        let Some(first) = pts.next() else {
            return Rect::ZERO;
        };
        pts.fold(Rect::from_points(first, first), |r, p| r.union_pt(p))
            .inflate(self.width / 2.0, self.width / 2.0)
    }
}

/// Accumulated erased regions of an object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EraserMask {
    pub strokes: SmallVec<[EraserStroke; 2]>,
}

// ─── Object state ────────────────────────────────────────────────────────

/// Everything that describes how an object looks: geometry, placement,
/// style and erase mask. This is what snapshots capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectState {
    #[serde(flatten)]
    pub shape: ShapeKind,
    #[serde(flatten)]
    pub placement: Placement,
    #[serde(flatten)]
    pub style: ShapeStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eraser: Option<EraserMask>,
}

impl ObjectState {
    pub fn new(shape: ShapeKind, placement: Placement, style: ShapeStyle) -> Self {
        Self {
            shape,
            placement,
            style,
            eraser: None,
        }
    }
}

// ─── Scene objects ───────────────────────────────────────────────────────

/// A drawable primitive or group, as held by the scene graph.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub id: ObjectId,
    pub state: ObjectState,
    /// Weak back-reference to the owning group. Ownership runs the other
    /// way, through the group's scene-graph edges; this field survives the
    /// object being detached so an undo can still locate the group frame.
    pub group: Option<ObjectId>,
    /// Committed-state counter. `0` = not committed to history.
    pub version: u32,
    /// Soft-removal flag: set before a user-initiated delete detaches the
    /// object, so the removal can be undone.
    pub removed: bool,
    /// Last committed snapshot.
    pub original_state: Option<ObjectSnapshot>,
}

impl SceneObject {
    pub fn new(id: ObjectId, state: ObjectState) -> Self {
        Self {
            id,
            state,
            group: None,
            version: 0,
            removed: false,
            original_state: None,
        }
    }

    /// Create an object with a fresh ID derived from its shape type.
    pub fn with_state(state: ObjectState) -> Self {
        let id = ObjectId::with_prefix(state.shape.type_name());
        Self::new(id, state)
    }

    pub fn is_group(&self) -> bool {
        matches!(self.state.shape, ShapeKind::Group)
    }

    /// Snapshot the object's current state.
    pub fn snapshot(&self) -> ObjectSnapshot {
        ObjectSnapshot::of(self.state.clone())
    }
}
