//! Inkboard editor: history, version ledger, drawing tools and the canvas
//! controller that ties them to a scene graph.

pub mod canvas;
pub mod config;
pub mod coordinator;
pub mod history;
pub mod input;
pub mod ledger;
pub mod schedule;
pub mod shortcuts;
pub mod tools;

pub use canvas::{BackgroundOptions, ChangeListener, ImageOptions, SketchCanvas};
pub use config::SketchConfig;
pub use coordinator::MutationCoordinator;
pub use history::{Change, ChangeKind, History, HistoryEntry};
pub use input::{InputEvent, Modifiers, PointerEvent};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use tools::{CanvasMode, DrawOptions, SceneMutation, Tool, ToolInput, ToolKind, ToolRegistry};
