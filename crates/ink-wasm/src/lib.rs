//! WASM bridge for Inkboard: exposes the sketch canvas to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The host owns rendering and
//! the clock: it forwards pointer and key events, calls `tick` from a timer,
//! and redraws from `to_json` / `preview_json`.

mod console;

use ink_editor::canvas::{BackgroundOptions, ImageOptions, SketchCanvas};
use ink_editor::config::SketchConfig;
use ink_editor::input::{InputEvent, Modifiers, PointerEvent};
use ink_editor::tools::CanvasMode;
use wasm_bindgen::prelude::*;

/// The JS-facing canvas controller.
#[wasm_bindgen]
pub struct SketchBoard {
    canvas: SketchCanvas,
}

#[wasm_bindgen]
impl SketchBoard {
    /// Create a board from a (possibly partial, possibly empty) JSON config.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<SketchBoard, JsValue> {
        console_error_panic_hook_setup();
        console::init();

        let config = if config_json.trim().is_empty() {
            SketchConfig::default()
        } else {
            SketchConfig::from_json(config_json).map_err(to_js_error)?
        };
        Ok(Self {
            canvas: SketchCanvas::new(config),
        })
    }

    /// Register the change callback. It receives the triggering pointer
    /// position as `(x, y)`, or no arguments after undo, redo and loads.
    pub fn set_on_change(&mut self, callback: js_sys::Function) {
        self.canvas.set_on_change(move |pointer| {
            let result = match pointer {
                Some(p) => callback.call2(&JsValue::NULL, &p.x.into(), &p.y.into()),
                None => callback.call0(&JsValue::NULL),
            };
            if let Err(e) = result {
                log::warn!("change listener threw: {e:?}");
            }
        });
    }

    // ─── Pointer input ───────────────────────────────────────────────────

    /// Returns `true` if the scene or viewport changed.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_down(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        time_ms: f64,
    ) -> bool {
        let p = pointer(x, y, modifiers(shift, ctrl, alt, meta), time_ms);
        self.canvas.handle(InputEvent::PointerDown(p))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_move(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        time_ms: f64,
    ) -> bool {
        let p = pointer(x, y, modifiers(shift, ctrl, alt, meta), time_ms);
        self.canvas.handle(InputEvent::PointerMove(p))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_up(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        time_ms: f64,
    ) -> bool {
        let p = pointer(x, y, modifiers(shift, ctrl, alt, meta), time_ms);
        self.canvas.handle(InputEvent::PointerUp(p))
    }

    pub fn handle_pointer_out(&mut self, x: f64, y: f64, time_ms: f64) -> bool {
        let p = pointer(x, y, Modifiers::NONE, time_ms);
        self.canvas.handle(InputEvent::PointerOut(p))
    }

    /// Returns `true` if the key combo was bound.
    pub fn handle_key(&mut self, key: &str, shift: bool, ctrl: bool, alt: bool, meta: bool) -> bool {
        self.canvas.handle_key(key, modifiers(shift, ctrl, alt, meta))
    }

    /// Run deferred notifications and loads due at `now_ms`.
    pub fn tick(&mut self, now_ms: f64) {
        self.canvas.tick(now_ms);
    }

    pub fn has_pending_tasks(&self) -> bool {
        self.canvas.has_pending_tasks()
    }

    // ─── Tools ───────────────────────────────────────────────────────────

    pub fn set_tool(&mut self, name: &str) {
        self.canvas.set_tool(name);
    }

    pub fn active_tool(&self) -> String {
        self.canvas.active_tool().to_string()
    }

    /// Names accepted by `set_tool`, sorted.
    pub fn tool_names(&self) -> Vec<String> {
        self.canvas
            .tools()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// `"freehand"`, `"clickDrag"`, `"selection"` or `"pan"`.
    pub fn mode(&self) -> String {
        mode_name(self.canvas.mode()).to_string()
    }

    /// Replace style settings from a (possibly partial) JSON config.
    pub fn update_config(&mut self, config_json: &str) -> Result<(), JsValue> {
        let config = SketchConfig::from_json(config_json).map_err(to_js_error)?;
        self.canvas.update_config(config);
        Ok(())
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.canvas.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.canvas.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.canvas.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.canvas.can_redo()
    }

    // ─── Scene operations ────────────────────────────────────────────────

    /// Empty the board. Returns the discarded scene JSON.
    pub fn clear(&mut self) -> String {
        self.canvas.clear()
    }

    pub fn remove_selected(&mut self) -> bool {
        self.canvas.remove_selected()
    }

    pub fn copy(&mut self) -> bool {
        self.canvas.copy()
    }

    /// Returns the pasted object IDs as a JSON array.
    pub fn paste(&mut self) -> String {
        let ids: Vec<String> = self
            .canvas
            .paste()
            .into_iter()
            .map(|id| id.as_str().to_string())
            .collect();
        serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_string())
    }

    /// Returns the new object's ID.
    pub fn add_image(
        &mut self,
        src: &str,
        width: f64,
        height: f64,
        left: Option<f64>,
        top: Option<f64>,
        scale: Option<f64>,
    ) -> String {
        let options = ImageOptions {
            left,
            top,
            scale: scale.unwrap_or(ImageOptions::default().scale),
        };
        self.canvas
            .add_image(src, width, height, options)
            .as_str()
            .to_string()
    }

    /// Returns the new object's ID.
    pub fn add_text(&mut self, text: &str, font_size: Option<f64>) -> String {
        self.canvas
            .add_text(text, font_size.unwrap_or(40.0))
            .as_str()
            .to_string()
    }

    pub fn set_background_image(
        &mut self,
        src: &str,
        width: f64,
        height: f64,
        stretched: bool,
        left: Option<f64>,
        top: Option<f64>,
    ) -> String {
        let options = BackgroundOptions {
            stretched,
            left: left.unwrap_or(0.0),
            top: top.unwrap_or(0.0),
            ..BackgroundOptions::default()
        };
        self.canvas
            .set_background_image(src, width, height, options)
            .as_str()
            .to_string()
    }

    /// Returns `false` for an unparseable color.
    pub fn set_background_color(&mut self, color: &str) -> bool {
        self.canvas.set_background_color(color)
    }

    pub fn zoom(&mut self, factor: f64) {
        self.canvas.zoom(factor);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.canvas.resize(width, height);
    }

    // ─── Serialization ───────────────────────────────────────────────────

    pub fn to_json(&self) -> String {
        self.canvas.to_json()
    }

    /// Replace the scene immediately.
    pub fn load(&mut self, json: &str) -> Result<(), JsValue> {
        self.canvas.load_scene(json).map_err(to_js_error)
    }

    /// Replace the scene on a later `tick`. Parse errors are reported now.
    pub fn from_json(&mut self, json: &str) -> Result<(), JsValue> {
        self.canvas.from_json(json).map_err(to_js_error)
    }

    /// The in-progress shape of the active tool, as JSON.
    pub fn preview_json(&self) -> Option<String> {
        let preview = self.canvas.preview()?;
        serde_json::to_string(&preview.state)
            .inspect_err(|e| log::warn!("preview export failed: {e}"))
            .ok()
    }

    /// Viewport offset as `[x, y]`.
    pub fn offset(&self) -> Vec<f64> {
        let (x, y) = self.canvas.offset();
        vec![x, y]
    }
}

fn modifiers(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Modifiers {
    Modifiers {
        shift,
        ctrl,
        alt,
        meta,
    }
}

fn pointer(x: f64, y: f64, modifiers: Modifiers, time_ms: f64) -> PointerEvent {
    PointerEvent::at(x, y)
        .with_modifiers(modifiers)
        .at_time(time_ms)
}

fn mode_name(mode: CanvasMode) -> &'static str {
    match mode {
        CanvasMode::Freehand => "freehand",
        CanvasMode::ClickDrag => "clickDrag",
        CanvasMode::Selection => "selection",
        CanvasMode::Pan => "pan",
    }
}

fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Inkboard WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}
