use std::path::PathBuf;
use std::sync::Arc;

use image::{imageops, DynamicImage};
use tiny_skia::Pixmap;

use super::history::{
    CanvasSnapshot, SnapshotHistory, DEFAULT_HISTORY_BYTE_BUDGET, DEFAULT_HISTORY_LIMIT,
};
use super::layout::{canvas_size_for, display_size_for};
use super::output::{decode_png_data_url, encode_png, export_file_name, png_data_url};
use super::surface::{self, layer_size, new_layer, pixmap_from_rgba};
use super::text_render::{rasterizer_for, TextRasterizer};
use super::tools::{
    Annotation, CanvasPoint, EraserPass, PenStroke, Size, StrokeColor, TextDraft,
    TextDraftAction, TextKey, ToolKind, ToolOptions, ViewportPoint,
};
use super::viewport::EditorViewport;
use super::{CanvasError, CanvasResult, EditorActionError};
use crate::config::AppConfig;
use crate::input::{resolve_shortcut, InputContext, ModifierState, PointerEvent, ShortcutAction, ShortcutKey};
use crate::notification::Notifier;
use crate::persist::PersistJob;
use crate::storage::{AnnotationRecord, AnnotationStore, StorageError};

const DEFAULT_MAX_CANVAS_DIMENSION: u32 = 8192;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl ImageSource {
    fn origin(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes(bytes) => format!("{} in-memory bytes", bytes.len()),
        }
    }

    fn decode(&self) -> CanvasResult<DynamicImage> {
        let decoded = match self {
            Self::Path(path) => image::open(path),
            Self::Bytes(bytes) => image::load_from_memory(bytes),
        };
        decoded.map_err(|source| CanvasError::Decode {
            origin: self.origin(),
            source,
        })
    }
}

/// How a decoded image maps onto the canvas backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CanvasSizing {
    /// Upscale the radiograph for annotation precision.
    Upscaled,
    /// Keep the decoded size; used for canvases that were already upscaled
    /// when they were saved.
    Native,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    Fallback,
    Blank,
}

/// Tool and view settings owned by one annotation session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawingSessionState {
    pub tools: ToolOptions,
    pub viewport: EditorViewport,
    pub viewport_size: Size,
    pub display_size: Size,
}

impl DrawingSessionState {
    pub fn new(viewport_size: Size) -> Self {
        Self {
            tools: ToolOptions::default(),
            viewport: EditorViewport::new(),
            viewport_size,
            display_size: viewport_size,
        }
    }

    /// Builds a stroke in the current color and width from canvas points.
    pub fn stroke_for(&self, points: &[CanvasPoint]) -> Option<PenStroke> {
        PenStroke::from_points(
            points,
            self.tools.color.color(),
            f32::from(self.tools.line_width),
        )
    }
}

#[derive(Debug, Clone)]
enum Gesture {
    Idle,
    Stroke(PenStroke),
    Erase(EraserPass),
    Pan { last: ViewportPoint },
}

struct LoadedCanvas {
    base: Pixmap,
    ink: Pixmap,
    annotations: Vec<Annotation>,
    history: SnapshotHistory<CanvasSnapshot>,
}

impl LoadedCanvas {
    fn size(&self) -> Size {
        layer_size(&self.base)
    }

    fn commit(&mut self, reason: &'static str) {
        let snapshot = match CanvasSnapshot::capture(&self.ink, &self.annotations) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(reason, %err, "failed to capture history snapshot");
                return;
            }
        };
        self.history.commit(snapshot);
        tracing::debug!(
            reason,
            len = self.history.len(),
            cursor = self.history.cursor(),
            "history snapshot committed"
        );
    }

    fn restore(&mut self, snapshot: &CanvasSnapshot) {
        if let Err(err) = snapshot.restore_ink(&mut self.ink) {
            tracing::warn!(%err, "failed to restore ink from history snapshot");
        }
        self.annotations = snapshot.annotations.to_vec();
    }
}

/// The annotation canvas for one radiograph: a base image, an ink layer for
/// pencil and eraser, text annotations on top, and a linear undo history.
pub struct AnnotationSession {
    state: DrawingSessionState,
    loaded: Option<LoadedCanvas>,
    gesture: Gesture,
    text_draft: Option<TextDraft>,
    next_annotation_id: u64,
    notes: String,
    rasterizer: Box<dyn TextRasterizer>,
    fallback_image: Option<PathBuf>,
    history_limit: usize,
    history_byte_budget: usize,
    max_canvas_dimension: u32,
}

impl std::fmt::Debug for AnnotationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationSession")
            .field("state", &self.state)
            .field("image_ready", &self.is_image_ready())
            .field("history_len", &self.history_len())
            .field("history_cursor", &self.history_cursor())
            .field("annotations", &self.annotations().len())
            .finish_non_exhaustive()
    }
}

impl AnnotationSession {
    pub fn new(viewport_size: Size) -> Self {
        Self {
            state: DrawingSessionState::new(viewport_size),
            loaded: None,
            gesture: Gesture::Idle,
            text_draft: None,
            next_annotation_id: 1,
            notes: String::new(),
            rasterizer: rasterizer_for(None),
            fallback_image: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
            history_byte_budget: DEFAULT_HISTORY_BYTE_BUDGET,
            max_canvas_dimension: DEFAULT_MAX_CANVAS_DIMENSION,
        }
    }

    pub fn from_config(config: &AppConfig, viewport_size: Size) -> Self {
        let mut session = Self::new(viewport_size);
        session.rasterizer = rasterizer_for(config.font_path.as_deref());
        session.fallback_image = config.fallback_image_path.clone();
        session.history_limit = config.history_limit;
        session.history_byte_budget = config.history_byte_budget;
        session.max_canvas_dimension = config.max_canvas_dimension;
        session
    }

    pub fn with_rasterizer(mut self, rasterizer: Box<dyn TextRasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn with_fallback_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.fallback_image = Some(path.into());
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_history_byte_budget(mut self, byte_budget: usize) -> Self {
        self.history_byte_budget = byte_budget;
        self
    }

    // --- Loading ---

    /// Decodes `source` into the base layer and resets ink, annotations and
    /// history. A decode failure retries once with the fallback image; if
    /// that fails too the canvas stays blank and drawing is disabled.
    pub fn load_image(&mut self, source: ImageSource) -> LoadOutcome {
        self.load_sized(&source, CanvasSizing::Upscaled)
    }

    fn load_sized(&mut self, source: &ImageSource, sizing: CanvasSizing) -> LoadOutcome {
        match self.install(source, sizing) {
            Ok(()) => return LoadOutcome::Loaded,
            Err(err) => tracing::warn!(%err, "radiograph failed to load"),
        }

        if let Some(fallback) = self.fallback_image.clone() {
            match self.install(&ImageSource::Path(fallback), CanvasSizing::Upscaled) {
                Ok(()) => return LoadOutcome::Fallback,
                Err(err) => tracing::warn!(%err, "fallback radiograph failed to load"),
            }
        }

        self.loaded = None;
        self.gesture = Gesture::Idle;
        self.text_draft = None;
        self.state.display_size = self.state.viewport_size;
        LoadOutcome::Blank
    }

    /// Reopens a previously persisted annotation as the new base image, at
    /// the canvas size it was saved with. Notes are only taken over when the
    /// saved image itself loaded.
    pub fn restore(&mut self, record: &AnnotationRecord) -> CanvasResult<LoadOutcome> {
        let png = decode_png_data_url(&record.image)?;
        let outcome = self.load_sized(&ImageSource::Bytes(png), CanvasSizing::Native);
        if outcome == LoadOutcome::Loaded {
            self.notes = record.notes.clone();
        } else {
            self.notes.clear();
            tracing::warn!(
                record_id = %record.record_id,
                ?outcome,
                "saved image did not load; its notes were not restored"
            );
        }
        tracing::info!(record_id = %record.record_id, ?outcome, "restored saved annotation");
        Ok(outcome)
    }

    fn install(&mut self, source: &ImageSource, sizing: CanvasSizing) -> CanvasResult<()> {
        let decoded = source.decode()?;
        let original = Size::new(decoded.width(), decoded.height());
        let (canvas, scale) = match sizing {
            CanvasSizing::Upscaled => {
                let layout =
                    canvas_size_for(original, self.state.viewport_size, self.max_canvas_dimension);
                (layout.canvas, layout.scale)
            }
            CanvasSizing::Native => (original, 1.0),
        };
        let rgba = decoded.to_rgba8();
        let base = if canvas == original {
            pixmap_from_rgba(&rgba)?
        } else {
            let resized = imageops::resize(
                &rgba,
                canvas.width,
                canvas.height,
                imageops::FilterType::Triangle,
            );
            pixmap_from_rgba(&resized)?
        };
        let ink = new_layer(canvas)?;
        let history = SnapshotHistory::new(CanvasSnapshot::capture(&ink, &[])?, self.history_limit)
            .with_byte_budget(self.history_byte_budget);

        self.loaded = Some(LoadedCanvas {
            base,
            ink,
            annotations: Vec::new(),
            history,
        });
        self.gesture = Gesture::Idle;
        self.text_draft = None;
        self.state.viewport.reset_view();
        self.state.display_size = display_size_for(canvas, self.state.viewport_size);
        tracing::info!(
            origin = %source.origin(),
            original = ?original,
            canvas = ?canvas,
            scale,
            "radiograph loaded"
        );
        Ok(())
    }

    // --- Accessors ---

    pub fn state(&self) -> &DrawingSessionState {
        &self.state
    }

    pub fn tool_options(&self) -> ToolOptions {
        self.state.tools
    }

    pub fn viewport(&self) -> EditorViewport {
        self.state.viewport
    }

    pub fn is_image_ready(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn canvas_size(&self) -> Option<Size> {
        self.loaded.as_ref().map(LoadedCanvas::size)
    }

    pub fn history_len(&self) -> usize {
        self.loaded.as_ref().map_or(0, |loaded| loaded.history.len())
    }

    pub fn history_cursor(&self) -> usize {
        self.loaded.as_ref().map_or(0, |loaded| loaded.history.cursor())
    }

    pub fn can_undo(&self) -> bool {
        self.loaded
            .as_ref()
            .is_some_and(|loaded| loaded.history.can_undo())
    }

    pub fn can_redo(&self) -> bool {
        self.loaded
            .as_ref()
            .is_some_and(|loaded| loaded.history.can_redo())
    }

    pub fn annotations(&self) -> &[Annotation] {
        self.loaded
            .as_ref()
            .map(|loaded| loaded.annotations.as_slice())
            .unwrap_or_default()
    }

    pub fn ink_pixels(&self) -> Option<&[u8]> {
        self.loaded.as_ref().map(|loaded| loaded.ink.data())
    }

    pub fn text_draft(&self) -> Option<&TextDraft> {
        self.text_draft.as_ref()
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    // --- Tool and view state ---

    pub fn set_tool(&mut self, tool: ToolKind) {
        if tool != ToolKind::Text {
            self.text_blur();
        }
        self.state.tools.select_tool(tool);
        tracing::debug!(tool = tool.label(), "tool selected");
    }

    pub fn set_color(&mut self, color: StrokeColor) {
        self.state.tools.set_color(color);
    }

    pub fn set_line_width(&mut self, line_width: u8) {
        self.state.tools.set_line_width(line_width);
    }

    pub fn set_text_size(&mut self, text_size: u8) {
        self.state.tools.set_text_size(text_size);
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.state.viewport.set_zoom(zoom);
    }

    pub fn zoom_in(&mut self) {
        self.state.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.state.viewport.zoom_out();
    }

    pub fn reset_view(&mut self) {
        self.state.viewport.reset_view();
    }

    pub fn pan_by(&mut self, delta_x: f32, delta_y: f32) {
        self.state.viewport.pan_by(delta_x, delta_y);
    }

    pub fn set_viewport_size(&mut self, viewport_size: Size) {
        self.state.viewport_size = viewport_size;
        self.state.display_size = match self.canvas_size() {
            Some(canvas) => display_size_for(canvas, viewport_size),
            None => viewport_size,
        };
    }

    /// Overrides the displayed canvas size when the host lays it out itself.
    pub fn set_display_size(&mut self, display_size: Size) {
        self.state.display_size = display_size;
    }

    pub fn to_canvas(&self, point: ViewportPoint) -> Option<CanvasPoint> {
        let canvas = self.canvas_size()?;
        Some(
            self.state
                .viewport
                .to_canvas(point, self.state.display_size, canvas),
        )
    }

    // --- Pointer gestures ---

    /// Returns `false` when the event was ignored.
    pub fn pointer_down(&mut self, event: PointerEvent) -> bool {
        if !self.is_image_ready() {
            tracing::debug!("pointer down before image is ready; ignoring");
            return false;
        }

        if event.starts_pan() {
            self.gesture = Gesture::Pan {
                last: event.position,
            };
            return true;
        }

        // Clicking the canvas takes focus away from an open text box.
        self.text_blur();

        let Some(point) = self.to_canvas(event.position) else {
            return false;
        };
        match self.state.tools.tool {
            ToolKind::Pencil => self.begin_stroke(point),
            ToolKind::Eraser => self.begin_erase(point),
            ToolKind::Text => self.place_text(point, event.position),
        }
        true
    }

    pub fn pointer_move(&mut self, event: PointerEvent) -> bool {
        if let Gesture::Pan { last } = &mut self.gesture {
            let delta_x = event.position.x - last.x;
            let delta_y = event.position.y - last.y;
            *last = event.position;
            self.state.viewport.pan_by(delta_x, delta_y);
            return true;
        }

        let Some(point) = self.to_canvas(event.position) else {
            return false;
        };
        match self.gesture {
            Gesture::Stroke(_) => self.continue_stroke(point),
            Gesture::Erase(_) => self.continue_erase(point),
            Gesture::Idle | Gesture::Pan { .. } => false,
        }
    }

    pub fn pointer_up(&mut self, event: PointerEvent) -> bool {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => false,
            Gesture::Pan { .. } => true,
            gesture @ Gesture::Stroke(_) => {
                self.gesture = gesture;
                if let Some(point) = self.to_canvas(event.position) {
                    self.continue_stroke(point);
                }
                self.end_stroke()
            }
            gesture @ Gesture::Erase(_) => {
                self.gesture = gesture;
                if let Some(point) = self.to_canvas(event.position) {
                    self.continue_erase(point);
                }
                self.end_erase()
            }
        }
    }

    fn begin_stroke(&mut self, point: CanvasPoint) {
        self.gesture = Gesture::Stroke(self.state.tools.new_stroke(point));
    }

    fn continue_stroke(&mut self, point: CanvasPoint) -> bool {
        let (Gesture::Stroke(stroke), Some(loaded)) = (&mut self.gesture, self.loaded.as_mut())
        else {
            return false;
        };
        if !stroke.append_point(point) {
            return false;
        }
        if let Some((from, to)) = stroke.last_segment() {
            surface::stroke_segment(&mut loaded.ink, from, to, stroke.color, stroke.width);
        }
        true
    }

    fn end_stroke(&mut self) -> bool {
        let Gesture::Stroke(stroke) = std::mem::replace(&mut self.gesture, Gesture::Idle) else {
            return false;
        };
        let Some(loaded) = self.loaded.as_mut() else {
            return false;
        };
        if stroke.is_dot() {
            surface::fill_dot(&mut loaded.ink, &stroke);
        }
        loaded.commit("stroke");
        true
    }

    fn begin_erase(&mut self, point: CanvasPoint) {
        let pass = self.state.tools.new_eraser_pass(point);
        if let Some(loaded) = self.loaded.as_mut() {
            surface::erase(&mut loaded.ink, point, pass.radius);
        }
        self.gesture = Gesture::Erase(pass);
    }

    fn continue_erase(&mut self, point: CanvasPoint) -> bool {
        let (Gesture::Erase(pass), Some(loaded)) = (&mut self.gesture, self.loaded.as_mut())
        else {
            return false;
        };
        surface::erase(&mut loaded.ink, point, pass.radius);
        pass.push(point);
        true
    }

    fn end_erase(&mut self) -> bool {
        let Gesture::Erase(pass) = std::mem::replace(&mut self.gesture, Gesture::Idle) else {
            return false;
        };
        let Some(loaded) = self.loaded.as_mut() else {
            return false;
        };
        loaded.commit("erase");
        tracing::debug!(centers = pass.centers.len(), "eraser gesture finished");
        true
    }

    // --- Text annotations ---

    fn place_text(&mut self, point: CanvasPoint, overlay_position: ViewportPoint) {
        let tools = self.state.tools;
        self.text_draft = Some(TextDraft::new(
            point,
            overlay_position,
            tools.color.color(),
            tools.text_size,
        ));
    }

    pub fn text_key(&mut self, key: TextKey) -> TextDraftAction {
        let Some(draft) = self.text_draft.as_mut() else {
            return TextDraftAction::Ignored;
        };
        let action = draft.resolve_key(key);
        self.finish_text_draft(action);
        action
    }

    /// The text box lost focus.
    pub fn text_blur(&mut self) -> TextDraftAction {
        let Some(draft) = self.text_draft.as_ref() else {
            return TextDraftAction::Ignored;
        };
        let action = draft.resolve_blur();
        self.finish_text_draft(action);
        action
    }

    fn finish_text_draft(&mut self, action: TextDraftAction) {
        match action {
            TextDraftAction::Commit => {
                let Some(draft) = self.text_draft.take() else {
                    return;
                };
                let Some(loaded) = self.loaded.as_mut() else {
                    return;
                };
                let id = self.next_annotation_id;
                self.next_annotation_id = self.next_annotation_id.saturating_add(1);
                loaded.annotations.push(draft.into_annotation(id));
                loaded.commit("text");
            }
            TextDraftAction::Cancel => {
                self.text_draft = None;
            }
            TextDraftAction::Edited | TextDraftAction::Ignored => {}
        }
    }

    /// Removes an annotation; the canvas is recomposed from base, ink and the
    /// remaining annotations.
    pub fn delete_annotation(&mut self, id: u64) -> bool {
        let Some(loaded) = self.loaded.as_mut() else {
            return false;
        };
        let Some(index) = loaded.annotations.iter().position(|a| a.id == id) else {
            tracing::debug!(id, "delete requested for unknown annotation");
            return false;
        };
        loaded.annotations.remove(index);
        loaded.commit("delete annotation");
        true
    }

    // --- History ---

    pub fn undo(&mut self) -> bool {
        self.step_history(|history| history.undo().cloned())
    }

    pub fn redo(&mut self) -> bool {
        self.step_history(|history| history.redo().cloned())
    }

    fn step_history(
        &mut self,
        step: impl FnOnce(&mut SnapshotHistory<CanvasSnapshot>) -> Option<CanvasSnapshot>,
    ) -> bool {
        let Some(loaded) = self.loaded.as_mut() else {
            return false;
        };
        let Some(snapshot) = step(&mut loaded.history) else {
            return false;
        };
        loaded.restore(&snapshot);
        self.gesture = Gesture::Idle;
        true
    }

    // --- Keyboard ---

    /// Resolves and applies a key press. Save and export are returned for the
    /// host to run since they need a record id and a store.
    pub fn handle_key(
        &mut self,
        key: ShortcutKey,
        modifiers: ModifierState,
    ) -> Option<ShortcutAction> {
        let context = InputContext {
            text_input_active: self.text_draft.is_some(),
            image_ready: self.is_image_ready(),
        };
        let action = resolve_shortcut(key, modifiers, context)?;
        match action {
            ShortcutAction::TextInsert(c) => {
                self.text_key(TextKey::Character(c));
            }
            ShortcutAction::TextBackspace => {
                self.text_key(TextKey::Backspace);
            }
            ShortcutAction::TextCursorLeft => {
                self.text_key(TextKey::CursorLeft);
            }
            ShortcutAction::TextCursorRight => {
                self.text_key(TextKey::CursorRight);
            }
            ShortcutAction::TextCommit => {
                self.text_key(TextKey::Enter);
            }
            ShortcutAction::TextCancel => {
                self.text_key(TextKey::Escape);
            }
            ShortcutAction::Undo => {
                self.undo();
            }
            ShortcutAction::Redo => {
                self.redo();
            }
            ShortcutAction::SelectPencil => self.set_tool(ToolKind::Pencil),
            ShortcutAction::SelectEraser => self.set_tool(ToolKind::Eraser),
            ShortcutAction::SelectText => self.set_tool(ToolKind::Text),
            ShortcutAction::ZoomIn => self.zoom_in(),
            ShortcutAction::ZoomOut => self.zoom_out(),
            ShortcutAction::ResetView => self.reset_view(),
            ShortcutAction::Save | ShortcutAction::Export => {}
        }
        Some(action)
    }

    // --- Output ---

    /// Base image, ink and annotations flattened into one raster.
    pub fn render(&self) -> Option<Pixmap> {
        let loaded = self.loaded.as_ref()?;
        Some(surface::compose(
            &loaded.base,
            &loaded.ink,
            &loaded.annotations,
            self.rasterizer.as_ref(),
        ))
    }

    pub fn render_png(&self) -> CanvasResult<Vec<u8>> {
        let pixmap = self.render().ok_or(CanvasError::ImageNotReady)?;
        encode_png(&pixmap)
    }

    /// Writes the flattened canvas to `dir` under a name derived from the
    /// record id.
    pub fn export_png(
        &self,
        dir: &std::path::Path,
        record_id: &str,
    ) -> Result<PathBuf, EditorActionError> {
        let file_name = export_file_name(record_id).map_err(|source| EditorActionError::Storage {
            operation: "exporting",
            record_id: record_id.to_string(),
            source,
        })?;
        let png = self.render_png().map_err(|source| EditorActionError::Canvas {
            operation: "exporting",
            record_id: record_id.to_string(),
            source,
        })?;
        let io_error = |source| EditorActionError::Storage {
            operation: "exporting",
            record_id: record_id.to_string(),
            source: StorageError::Io {
                operation: "writing export",
                record_id: record_id.to_string(),
                source,
            },
        };
        std::fs::create_dir_all(dir).map_err(io_error)?;
        let path = dir.join(file_name);
        std::fs::write(&path, png).map_err(io_error)?;
        tracing::info!(path = %path.display(), "annotated radiograph exported");
        Ok(path)
    }

    pub fn annotation_record(&self, record_id: &str) -> Result<AnnotationRecord, EditorActionError> {
        crate::storage::validate_record_id(record_id).map_err(|source| {
            EditorActionError::Storage {
                operation: "persisting",
                record_id: record_id.to_string(),
                source,
            }
        })?;
        let png = self.render_png().map_err(|source| EditorActionError::Canvas {
            operation: "persisting",
            record_id: record_id.to_string(),
            source,
        })?;
        Ok(AnnotationRecord::new(
            record_id,
            png_data_url(&png),
            self.notes.clone(),
        ))
    }

    /// Serializes the canvas and notes and saves them in the background.
    pub fn persist(
        &self,
        record_id: &str,
        store: Arc<dyn AnnotationStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<PersistJob, EditorActionError> {
        let record = self.annotation_record(record_id)?;
        Ok(PersistJob::spawn(store, record, notifier))
    }
}
