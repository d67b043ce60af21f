//! The sketch canvas controller.
//!
//! Owns the scene graph, history, coordinator and tool registry, and routes
//! host input through them:
//!
//! ```text
//! pointer → active tool → SceneMutation → scene graph → signals
//!         → coordinator → ledger + history
//! ```
//!
//! Change notifications and deferred loads go through a `DeferredQueue`
//! that the host drives with [`SketchCanvas::tick`].

use crate::config::SketchConfig;
use crate::coordinator::{MutationCoordinator, soft_remove};
use crate::history::History;
use crate::input::{InputEvent, Modifiers, PointerEvent};
use crate::schedule::DeferredQueue;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::tools::{CanvasMode, SceneMutation, ToolInput, ToolKind, ToolRegistry};
use ink_core::document::{
    ObjectRecord, SceneDocument, export_document, import_document, parse_document,
};
use ink_core::error::SceneError;
use ink_core::hit::{hit_test_rect, hit_test_stroke, hit_test_where};
use ink_core::id::ObjectId;
use ink_core::model::*;
use ink_core::scene::SceneGraph;
use ink_core::transform::{scale_placement, total_scaling};
use kurbo::Point;

/// Delay between a mouse-up and its change notification.
const NOTIFY_DELAY_MS: f64 = 10.0;
/// Delay before a `from_json` document replaces the scene.
const LOAD_DELAY_MS: f64 = 100.0;
/// Offset applied to each successive paste.
const PASTE_OFFSET: f64 = 10.0;

/// Host listener called after committed mutations and after undo/redo.
/// Receives the pointer event that triggered the change, if any.
pub type ChangeListener = Box<dyn FnMut(Option<&PointerEvent>)>;

enum Deferred {
    Notify(Option<PointerEvent>),
    Load(Box<SceneDocument>),
}

/// Placement options for [`SketchCanvas::add_image`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageOptions {
    /// Defaults to centering the scaled image horizontally.
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub scale: f64,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            left: None,
            top: None,
            scale: 0.5,
        }
    }
}

/// Layout options for [`SketchCanvas::set_background_image`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BackgroundOptions {
    /// Stretch to the canvas in both directions.
    pub stretched: bool,
    pub stretched_x: bool,
    pub stretched_y: bool,
    pub left: f64,
    pub top: f64,
}

pub struct SketchCanvas {
    scene: SceneGraph,
    history: History,
    coordinator: MutationCoordinator,
    tools: ToolRegistry,
    /// Name of the active tool.
    tool: String,
    mode: CanvasMode,
    config: SketchConfig,
    /// Viewport translation in screen pixels.
    offset: (f64, f64),
    width: f64,
    height: f64,
    background: Option<Color>,
    clipboard: Option<Vec<ObjectRecord>>,
    deferred: DeferredQueue<Deferred>,
    on_change: Option<ChangeListener>,
    pointer_down: bool,
    /// Latest host time seen, in milliseconds.
    now_ms: f64,
}

impl Default for SketchCanvas {
    fn default() -> Self {
        Self::new(SketchConfig::default())
    }
}

impl SketchCanvas {
    pub fn new(config: SketchConfig) -> Self {
        Self::with_tools(config, ToolRegistry::with_builtins())
    }

    /// Build a canvas around a custom tool registry.
    pub fn with_tools(config: SketchConfig, tools: ToolRegistry) -> Self {
        let history = History::new(config.undo_steps).with_debug(config.debug_history);
        let mut canvas = Self {
            scene: SceneGraph::new(),
            history,
            coordinator: MutationCoordinator::new(),
            tools,
            tool: String::new(),
            mode: CanvasMode::default(),
            width: config.width,
            height: config.height,
            background: config.background(),
            config,
            offset: (0.0, 0.0),
            clipboard: None,
            deferred: DeferredQueue::new(),
            on_change: None,
            pointer_down: false,
            now_ms: 0.0,
        };
        let initial = canvas.config.tool.clone();
        canvas.set_tool(&initial);
        canvas
    }

    pub fn set_on_change(&mut self, listener: impl FnMut(Option<&PointerEvent>) + 'static) {
        self.on_change = Some(Box::new(listener));
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn tools_mut(&mut self) -> &mut ToolRegistry {
        &mut self.tools
    }

    pub fn active_tool(&self) -> &str {
        &self.tool
    }

    pub fn mode(&self) -> CanvasMode {
        self.mode
    }

    pub fn config(&self) -> &SketchConfig {
        &self.config
    }

    pub fn offset(&self) -> (f64, f64) {
        self.offset
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn background_color(&self) -> Option<Color> {
        self.background
    }

    pub fn background_image(&self) -> Option<ObjectId> {
        self.coordinator.background()
    }

    /// Number of top-level objects in the scene.
    pub fn object_count(&self) -> usize {
        self.scene.len()
    }

    /// The in-progress shape of the active tool.
    pub fn preview(&self) -> Option<&SceneObject> {
        self.tools.get(&self.tool).and_then(|t| t.preview())
    }

    // ─── Tools & config ──────────────────────────────────────────────────

    /// Switch tools. The outgoing tool is cleaned up first, so an abandoned
    /// gesture never reaches the scene. Unknown names fall back to the
    /// pencil.
    pub fn set_tool(&mut self, name: &str) {
        let name = if self.tools.contains(name) {
            name
        } else {
            log::warn!("unknown tool `{name}`, using pencil");
            ToolKind::Pencil.as_str()
        };

        let reverts = self
            .tools
            .get_mut(&self.tool)
            .map(|outgoing| outgoing.cleanup_tool())
            .unwrap_or_default();
        self.apply(reverts);
        self.scene.discard_active();
        self.pointer_down = false;

        self.tool = name.to_string();
        let options = self.config.draw_options();
        if let Some(tool) = self.tools.get_mut(&self.tool) {
            self.mode = tool.configure_canvas(&options);
        }
        log::debug!("tool: {} ({:?})", self.tool, self.mode);
    }

    /// Replace style settings and reconfigure the active tool.
    pub fn update_config(&mut self, config: SketchConfig) {
        self.background = config.background();
        self.config = config;
        let options = self.config.draw_options();
        if let Some(tool) = self.tools.get_mut(&self.tool) {
            self.mode = tool.configure_canvas(&options);
        }
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Route one pointer event through the active tool. Returns `true` when
    /// the scene or viewport changed.
    pub fn handle(&mut self, event: InputEvent) -> bool {
        let pointer = *event.pointer();
        self.now_ms = self.now_ms.max(pointer.time_ms);
        log::trace!("{event:?}");

        let input = self.tool_input(&pointer);
        let Some(tool) = self.tools.get_mut(&self.tool) else {
            return false;
        };
        let mutations = match event {
            InputEvent::PointerDown(_) => {
                self.pointer_down = true;
                tool.mouse_down(&input)
            }
            InputEvent::PointerMove(_) => tool.mouse_move(&input),
            InputEvent::PointerUp(_) => tool.mouse_up(&input),
            InputEvent::PointerOut(_) => tool.mouse_out(&input),
        };
        let changed = self.apply(mutations);

        match event {
            InputEvent::PointerUp(_) => {
                self.pointer_down = false;
                self.deferred.schedule(
                    pointer.time_ms,
                    NOTIFY_DELAY_MS,
                    Deferred::Notify(Some(pointer)),
                );
            }
            InputEvent::PointerOut(_) if self.pointer_down => self.notify(Some(&pointer)),
            _ => {}
        }
        changed
    }

    /// Resolve and run a keyboard shortcut. Returns `true` if bound.
    pub fn handle_key(&mut self, key: &str, modifiers: Modifiers) -> bool {
        let Some(action) = ShortcutMap::resolve(key, modifiers) else {
            return false;
        };
        match action {
            ShortcutAction::Tool(kind) => self.set_tool(kind.as_str()),
            ShortcutAction::Undo => {
                self.undo();
            }
            ShortcutAction::Redo => {
                self.redo();
            }
            ShortcutAction::Delete => {
                self.remove_selected();
            }
            ShortcutAction::Copy => {
                self.copy();
            }
            ShortcutAction::Paste => {
                self.paste();
            }
            ShortcutAction::Deselect => self.scene.discard_active(),
        }
        true
    }

    /// Run deferred tasks due at `now_ms`.
    pub fn tick(&mut self, now_ms: f64) {
        self.now_ms = self.now_ms.max(now_ms);
        for task in self.deferred.run_due(now_ms) {
            match task {
                Deferred::Notify(pointer) => self.notify(pointer.as_ref()),
                Deferred::Load(doc) => self.apply_document(&doc),
            }
        }
    }

    pub fn has_pending_tasks(&self) -> bool {
        !self.deferred.is_empty()
    }

    fn tool_input(&self, pointer: &PointerEvent) -> ToolInput {
        let x = pointer.x - self.offset.0;
        let y = pointer.y - self.offset.1;
        let background = self.coordinator.background();
        ToolInput {
            x,
            y,
            screen_x: pointer.x,
            screen_y: pointer.y,
            modifiers: pointer.modifiers,
            hit: hit_test_where(&self.scene, x, y, |id| Some(id) != background),
            selection: self.scene.selected(),
        }
    }

    /// Apply tool mutations. Returns `true` if anything visible changed.
    fn apply(&mut self, mutations: Vec<SceneMutation>) -> bool {
        let mut changed = false;
        for mutation in mutations {
            match mutation {
                SceneMutation::Add(obj) => {
                    self.scene.add(*obj);
                    self.sync();
                    changed = true;
                }
                SceneMutation::Select(ids) => {
                    self.scene.set_active(&ids);
                }
                SceneMutation::SelectRect { rect, extend } => {
                    let background = self.coordinator.background();
                    let mut ids = if extend {
                        self.scene.selected()
                    } else {
                        Vec::new()
                    };
                    for id in hit_test_rect(&self.scene, rect) {
                        if Some(id) != background && !ids.contains(&id) {
                            ids.push(id);
                        }
                    }
                    self.scene.set_active(&ids);
                }
                SceneMutation::Deselect => self.scene.discard_active(),
                SceneMutation::MoveActive { dx, dy } => {
                    if let Some(active) = self.scene.active() {
                        self.scene.translate(active, dx, dy);
                        changed = true;
                    }
                }
                SceneMutation::CommitActive => {
                    if let Some(active) = self.scene.active() {
                        self.scene.modified(active, None);
                        self.sync();
                        changed = true;
                    }
                }
                SceneMutation::Pan { dx, dy } => {
                    self.offset.0 += dx;
                    self.offset.1 += dy;
                    changed = true;
                }
                SceneMutation::Erase(stroke) => changed |= self.erase(&stroke),
            }
        }
        changed
    }

    /// Mask every object under `stroke` and raise one `ErasingEnd`.
    fn erase(&mut self, stroke: &EraserStroke) -> bool {
        let targets = hit_test_stroke(&self.scene, stroke);
        if targets.is_empty() {
            return false;
        }
        for &id in &targets {
            let world = self.scene.world_matrix(id);
            let inverse = world.inverse();
            let (sx, sy) = total_scaling(world);
            let local = EraserStroke {
                points: stroke
                    .points
                    .iter()
                    .map(|&(x, y)| {
                        let p = inverse * Point::new(x, y);
                        (p.x, p.y)
                    })
                    .collect(),
                width: stroke.width / ((sx + sy) / 2.0),
            };
            if let Some(obj) = self.scene.get_mut(id) {
                obj.state
                    .eraser
                    .get_or_insert_with(EraserMask::default)
                    .strokes
                    .push(local);
            }
        }
        self.scene.erasing_end(targets);
        self.sync();
        true
    }

    fn sync(&mut self) {
        self.coordinator.process(&mut self.scene, &mut self.history);
        self.collect_garbage();
    }

    /// Purge detached objects that only dropped history entries could have
    /// brought back.
    fn collect_garbage(&mut self) {
        let background = self.coordinator.background();
        for entry in self.history.take_dropped() {
            for change in entry.changes() {
                let id = change.object;
                if Some(id) == background || self.history.references(id) {
                    continue;
                }
                let purged = self.scene.purge(id);
                if !purged.is_empty() {
                    log::trace!("purged {purged:?}");
                }
            }
        }
    }

    fn notify(&mut self, pointer: Option<&PointerEvent>) {
        if let Some(listener) = self.on_change.as_mut() {
            listener(pointer);
        }
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// Revert the newest history entry. Returns `false` if there was none.
    pub fn undo(&mut self) -> bool {
        self.scene.discard_active();
        let done = self.coordinator.undo(&mut self.scene, &mut self.history);
        self.collect_garbage();
        self.notify(None);
        done
    }

    /// Reapply the newest undone entry. Returns `false` if there was none.
    pub fn redo(&mut self) -> bool {
        self.scene.discard_active();
        let done = self.coordinator.redo(&mut self.scene, &mut self.history);
        self.collect_garbage();
        self.notify(None);
        done
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ─── Scene operations ────────────────────────────────────────────────

    /// Empty the scene and history. The background image survives with its
    /// eraser mask dropped. Returns the discarded scene as JSON.
    pub fn clear(&mut self) -> String {
        let discarded = self.to_json();
        // Nothing to revert: the scene is rebuilt below.
        let _reverts = self
            .tools
            .get_mut(&self.tool)
            .map(|tool| tool.cleanup_tool());
        let background = self
            .coordinator
            .background()
            .and_then(|id| self.scene.get(id).cloned());

        self.scene.clear();
        self.history.clear();
        self.collect_garbage();
        self.coordinator.set_background(None, None);

        if let Some(mut image) = background {
            image.state.eraser = None;
            let id = image.id;
            let _guard = self.history.suppress();
            self.scene.add(image);
            self.sync();
            self.coordinator.set_background(Some(id), None);
        }
        discarded
    }

    /// Soft-remove the active object or every member of the active
    /// selection, as one undo step.
    pub fn remove_selected(&mut self) -> bool {
        let selected = self.scene.selected();
        if selected.is_empty() {
            return false;
        }
        self.scene.discard_active();
        self.history.atomic_start();
        for id in selected {
            soft_remove(&mut self.coordinator, &mut self.scene, &mut self.history, id);
        }
        self.history.atomic_end();
        self.collect_garbage();
        true
    }

    /// Copy the active object(s) to the internal clipboard.
    pub fn copy(&mut self) -> bool {
        let records: Vec<ObjectRecord> = self
            .scene
            .selected()
            .into_iter()
            .filter_map(|id| ObjectRecord::capture(&self.scene, id))
            .collect();
        if records.is_empty() {
            return false;
        }
        self.clipboard = Some(records);
        true
    }

    /// Add a fresh copy of the clipboard, offset from the previous paste,
    /// and select it. Returns the pasted IDs.
    pub fn paste(&mut self) -> Vec<ObjectId> {
        let Some(records) = self.clipboard.as_mut() else {
            return Vec::new();
        };
        for record in records.iter_mut() {
            record.state.placement.left += PASTE_OFFSET;
            record.state.placement.top += PASTE_OFFSET;
        }
        let mut doc = SceneDocument {
            objects: records.clone(),
            ..SceneDocument::default()
        };
        doc.objects.iter_mut().for_each(forget_identity);

        self.scene.discard_active();
        self.history.atomic_start();
        let ids = import_document(&mut self.scene, &doc);
        self.sync();
        self.history.atomic_end();
        self.collect_garbage();
        self.scene.set_active(&ids);
        ids
    }

    /// Add an image. Without an explicit position it is centered.
    pub fn add_image(
        &mut self,
        src: &str,
        width: f64,
        height: f64,
        options: ImageOptions,
    ) -> ObjectId {
        let left = options
            .left
            .unwrap_or((self.width - width * options.scale) / 2.0);
        let top = options
            .top
            .unwrap_or((self.height - height * options.scale) / 2.0);
        let placement = Placement {
            scale_x: options.scale,
            scale_y: options.scale,
            ..Placement::at(left, top)
        };
        let state = ObjectState::new(
            ShapeKind::Image {
                src: src.to_string(),
                width,
                height,
            },
            placement,
            ShapeStyle {
                stroke: None,
                ..ShapeStyle::default()
            },
        );
        let id = self.scene.add(SceneObject::with_state(state));
        self.sync();
        id
    }

    /// Add a text object centered on the canvas.
    pub fn add_text(&mut self, text: &str, font_size: f64) -> ObjectId {
        let shape = ShapeKind::Text {
            text: text.to_string(),
            font_size,
        };
        let bounds = shape.local_bounds();
        let placement = Placement::at(
            (self.width - bounds.width()) * 0.5,
            (self.height - bounds.height()) * 0.5,
        );
        let style = ShapeStyle {
            stroke: None,
            fill: Color::parse(&self.config.line_color).or(Some(Color::BLACK)),
            ..ShapeStyle::default()
        };
        let id = self
            .scene
            .add(SceneObject::with_state(ObjectState::new(shape, placement, style)));
        self.sync();
        id
    }

    /// Set the erasable background image. Not recorded; history is cleared
    /// afterwards.
    pub fn set_background_image(
        &mut self,
        src: &str,
        width: f64,
        height: f64,
        options: BackgroundOptions,
    ) -> ObjectId {
        self.scene.discard_active();
        let width = if options.stretched || options.stretched_x {
            self.width
        } else {
            width
        };
        let height = if options.stretched || options.stretched_y {
            self.height
        } else {
            height
        };
        let image = SceneObject::with_state(ObjectState::new(
            ShapeKind::Image {
                src: src.to_string(),
                width,
                height,
            },
            Placement::at(options.left, options.top),
            ShapeStyle {
                stroke: None,
                ..ShapeStyle::default()
            },
        ));
        let id = image.id;
        let previous = self.coordinator.background();
        {
            let _guard = self.history.suppress();
            if let Some(previous) = previous {
                self.scene.remove(previous);
            }
            self.scene.add(image);
            self.scene.send_to_back(id);
            self.sync();
        }
        self.coordinator.set_background(Some(id), None);
        self.history.clear();
        self.collect_garbage();
        if let Some(previous) = previous {
            self.scene.purge(previous);
        }
        id
    }

    pub fn set_background_color(&mut self, color: &str) -> bool {
        match Color::parse(color) {
            Some(c) => {
                self.background = Some(c).filter(|c| !c.is_transparent());
                self.config.background_color = color.to_string();
                true
            }
            None => false,
        }
    }

    /// Scale every object's position and size by `factor`. Not recorded:
    /// kept history is rescaled with the scene, so undo stays in the zoomed
    /// frame.
    pub fn zoom(&mut self, factor: f64) {
        self.scene.discard_active();
        let background = self.coordinator.background();
        let ids: Vec<ObjectId> = self.scene.object_ids().to_vec();
        for id in ids.into_iter().filter(|id| Some(*id) != background) {
            if let Some(obj) = self.scene.get_mut(id) {
                scale_placement(&mut obj.state.placement, factor, factor);
                if let Some(original) = obj.original_state.as_mut() {
                    scale_placement(&mut original.state.placement, factor, factor);
                }
            }
        }
        self.history.rescale(factor, factor, background);
    }

    /// Fit the canvas to a new host size, minus the configured corrections,
    /// rescaling objects and the background image to match.
    pub fn resize(&mut self, host_width: f64, host_height: f64) {
        let width = host_width - self.config.width_correction;
        let height = host_height - self.config.height_correction;
        let factor = |new: f64, old: f64| {
            if old > 0.0 {
                (new / old * 100.0).round() / 100.0
            } else {
                1.0
            }
        };
        let wf = factor(width, self.width);
        let hf = factor(height, self.height);
        self.width = width;
        self.height = height;

        self.scene.discard_active();
        let background = self.coordinator.background();
        let ids: Vec<ObjectId> = self.scene.object_ids().to_vec();
        for id in ids {
            let Some(obj) = self.scene.get_mut(id) else {
                continue;
            };
            if Some(id) == background {
                if let ShapeKind::Image { width, height, .. } = &mut obj.state.shape {
                    *width *= wf;
                    *height *= hf;
                }
            } else {
                scale_placement(&mut obj.state.placement, wf, hf);
                if let Some(original) = obj.original_state.as_mut() {
                    scale_placement(&mut original.state.placement, wf, hf);
                }
            }
        }
        self.history.rescale(wf, hf, background);
    }

    // ─── Serialization ───────────────────────────────────────────────────

    pub fn document(&self) -> SceneDocument {
        export_document(&self.scene, self.background, self.coordinator.background())
    }

    /// Export the scene.
    pub fn to_json(&self) -> String {
        ink_core::document::to_json(&self.document()).unwrap_or_else(|e| {
            log::warn!("scene export failed: {e}");
            String::from("{}")
        })
    }

    /// Replace the scene with a document, immediately. The loaded objects
    /// become the new baseline: history is cleared. Loads still pending
    /// from `from_json` are dropped.
    pub fn load_scene(&mut self, json: &str) -> Result<(), SceneError> {
        let doc = parse_document(json)?;
        self.deferred.cancel(|task| matches!(task, Deferred::Load(_)));
        self.apply_document(&doc);
        Ok(())
    }

    /// Parse now, replace the scene on the first `tick` at least 100 ms
    /// later.
    pub fn from_json(&mut self, json: &str) -> Result<(), SceneError> {
        let doc = parse_document(json)?;
        self.deferred
            .schedule(self.now_ms, LOAD_DELAY_MS, Deferred::Load(Box::new(doc)));
        Ok(())
    }

    fn apply_document(&mut self, doc: &SceneDocument) {
        // Dropped with the scene it would revert.
        let _reverts = self
            .tools
            .get_mut(&self.tool)
            .map(|tool| tool.cleanup_tool());
        self.scene.clear();
        self.history.clear();
        self.collect_garbage();
        {
            let _guard = self.history.suppress();
            import_document(&mut self.scene, doc);
            self.sync();
        }
        self.background = doc.background.filter(|c| !c.is_transparent());

        let image = doc.background_image.filter(|id| self.scene.contains(*id));
        let eraser = image
            .and_then(|id| self.scene.get(id))
            .and_then(|obj| obj.state.eraser.clone());
        if let Some(id) = image {
            self.scene.send_to_back(id);
        }
        self.coordinator.set_background(image, eraser);
        log::debug!("loaded {} objects", self.scene.len());
        self.notify(None);
    }
}

/// Strip identity and ledger fields so a record imports as a new object.
fn forget_identity(record: &mut ObjectRecord) {
    record.id = None;
    record.version = 0;
    record.original_state = None;
    record.objects.iter_mut().for_each(forget_identity);
}
