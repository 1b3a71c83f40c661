// ============================================================================
// CANVAS HOST: application state around one drawing surface
// ============================================================================
//
// Owns the tool settings, the requested canvas size and the initial image,
// and feeds them to the surface as props.  Also runs the generative expand
// flow: export → worker request → load at natural size → adopt.  The GUI
// calls `update` once per frame; nothing here touches egui.

use std::sync::{Arc, mpsc};
use std::time::Instant;

use crate::canvas::{PendingLoad, SurfaceConfig, SurfaceError};
use crate::components::toast::ToastStore;
use crate::components::tools::{MAX_BRUSH_SIZE, MIN_BRUSH_SIZE, Tool, ToolSettings};
use crate::io::ExportFormat;
use crate::ops::ai::{CanvasExpander, ExpandError, ExpandResponse, ExpandSettings};
use crate::surface::{DrawingSurface, SurfaceProps};

/// Base name of exported files.
pub const EXPORT_FILE_STEM: &str = "genesis_canvas";
/// Quality used by the "Export as JPEG" action.
pub const EXPORT_JPEG_QUALITY: f32 = 0.9;

/// An encoded snapshot ready to be saved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedImage {
    pub file_name: String,
    pub data_uri: String,
}

enum ExpandStage {
    Idle,
    /// Waiting on the expansion backend.
    Requesting,
    /// Backend answered; its image is decoding into the surface.
    Loading { pending: PendingLoad, uri: String },
}

pub struct CanvasHost {
    settings: ToolSettings,
    config: SurfaceConfig,
    initial_image: Option<String>,
    surface: DrawingSurface,
    toasts: ToastStore,
    expander: Option<Arc<dyn CanvasExpander>>,
    expand_sender: mpsc::Sender<Result<ExpandResponse, ExpandError>>,
    expand_receiver: mpsc::Receiver<Result<ExpandResponse, ExpandError>>,
    expand_stage: ExpandStage,
    /// Set when an expansion lands; consumed by the dialog to close itself.
    expand_completed: bool,
}

impl CanvasHost {
    /// Build the host and mount its surface at `config`.
    pub fn new(config: SurfaceConfig, expander: Option<Arc<dyn CanvasExpander>>) -> Self {
        let settings = ToolSettings::default();
        let mut surface = DrawingSurface::new(SurfaceProps {
            config,
            settings: settings.clone(),
            initial_image: None,
        });
        surface.mount();
        let (expand_sender, expand_receiver) = mpsc::channel();
        Self {
            settings,
            config,
            initial_image: None,
            surface,
            toasts: ToastStore::default(),
            expander,
            expand_sender,
            expand_receiver,
            expand_stage: ExpandStage::Idle,
            expand_completed: false,
        }
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn config(&self) -> SurfaceConfig {
        self.config
    }

    pub fn initial_image(&self) -> Option<&str> {
        self.initial_image.as_deref()
    }

    pub fn surface(&self) -> &DrawingSurface {
        &self.surface
    }

    /// Pointer events go straight to the surface.
    pub fn surface_mut(&mut self) -> &mut DrawingSurface {
        &mut self.surface
    }

    pub fn toasts(&self) -> &ToastStore {
        &self.toasts
    }

    pub fn toasts_mut(&mut self) -> &mut ToastStore {
        &mut self.toasts
    }

    pub fn has_expander(&self) -> bool {
        self.expander.is_some()
    }

    pub fn is_expanding(&self) -> bool {
        !matches!(self.expand_stage, ExpandStage::Idle)
    }

    /// True once per successful expansion.
    pub fn take_expand_completed(&mut self) -> bool {
        std::mem::take(&mut self.expand_completed)
    }

    /// Anything still running in the background.
    pub fn is_busy(&self) -> bool {
        self.is_expanding() || self.surface.pending_loads() > 0
    }

    fn push_props(&mut self) {
        self.surface.set_props(SurfaceProps {
            config: self.config,
            settings: self.settings.clone(),
            initial_image: self.initial_image.clone(),
        });
    }

    // ---- toolbar -----------------------------------------------------------

    pub fn set_tool(&mut self, tool: Tool) {
        self.settings.tool = tool;
        self.push_props();
    }

    pub fn set_color(&mut self, color: &str) {
        self.settings.color = color.to_string();
        self.push_props();
    }

    pub fn set_brush_size(&mut self, size: u32) {
        self.settings.size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
        self.push_props();
    }

    pub fn increase_brush_size(&mut self) {
        self.set_brush_size(self.settings.size.saturating_add(1));
    }

    pub fn decrease_brush_size(&mut self) {
        self.set_brush_size(self.settings.size.saturating_sub(1));
    }

    // ---- canvas actions ------------------------------------------------------

    /// PNG is lossless; JPEG uses the export quality.  `None` when the
    /// surface has nothing to give.
    pub fn export(&mut self, format: ExportFormat) -> Option<ExportedImage> {
        let quality = match format {
            ExportFormat::Png => 1.0,
            ExportFormat::Jpeg => EXPORT_JPEG_QUALITY,
        };
        let data_uri = self.surface.handle().get_current_image(format, quality);
        if data_uri.is_empty() {
            crate::log_warn!("Export as {} produced no data", format.mime_type());
            return None;
        }
        Some(ExportedImage {
            file_name: format!("{}.{}", EXPORT_FILE_STEM, format.extension()),
            data_uri,
        })
    }

    /// Clear to white and remember the blank result as the current image.
    pub fn clear_canvas(&mut self) {
        self.surface.handle().clear(Some("#FFFFFF"));
        let blank = self
            .surface
            .handle()
            .get_current_image(ExportFormat::Png, 1.0);
        if !blank.is_empty() {
            self.initial_image = Some(blank);
            self.surface.adopt(self.config, self.initial_image.clone());
        }
        crate::log_info!("Canvas cleared");
    }

    /// New dimensions drop the current image; the surface clears at the new size.
    pub fn resize_canvas(&mut self, width: u32, height: u32) {
        let config = SurfaceConfig::new(width, height);
        if !config.is_valid() {
            self.toasts
                .dispatch(format!("Invalid canvas size {}×{}", width, height));
            return;
        }
        self.config = config;
        self.initial_image = None;
        self.push_props();
        self.toasts.dispatch(format!(
            "Canvas Resized: New dimensions: {}x{}",
            width, height
        ));
    }

    /// Use `uri` as the surface's initial image (e.g. an opened file).
    pub fn open_image_uri(&mut self, uri: String) {
        self.initial_image = Some(uri);
        self.push_props();
    }

    // ---- generative expand -----------------------------------------------

    /// Kick off an expansion on a worker.  Failures are also toasted.
    pub fn start_expand(&mut self, settings: &ExpandSettings) -> Result<(), ExpandError> {
        let result = self.spawn_expand(settings);
        if let Err(e) = &result {
            self.expand_failed(e);
        }
        result
    }

    fn spawn_expand(&mut self, settings: &ExpandSettings) -> Result<(), ExpandError> {
        if self.is_expanding() {
            return Err(ExpandError::Busy);
        }
        let Some(expander) = self.expander.clone() else {
            return Err(ExpandError::NotConfigured);
        };
        let photo = self
            .surface
            .handle()
            .get_current_image(ExportFormat::Png, 1.0);
        let request = settings.to_request(photo)?;
        crate::log_info!(
            "Expanding canvas {} by {}px",
            request.expand_direction.label(),
            request.expand_amount
        );

        let sender = self.expand_sender.clone();
        rayon::spawn(move || {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                expander.expand(&request)
            }))
            .unwrap_or_else(|_| Err(ExpandError::Request("expansion backend panicked".into())));
            let _ = sender.send(result);
        });
        self.expand_stage = ExpandStage::Requesting;
        Ok(())
    }

    fn expand_failed(&mut self, err: &ExpandError) {
        crate::log_err!("Canvas expansion failed: {}", err);
        self.toasts.dispatch(format!("Expansion Failed: {}", err));
    }

    fn on_expand_response(&mut self, response: Result<ExpandResponse, ExpandError>) {
        match response {
            Ok(resp) if resp.expanded_canvas_data_uri.trim().is_empty() => {
                self.expand_stage = ExpandStage::Idle;
                self.expand_failed(&ExpandError::EmptyImage);
            }
            Ok(resp) => {
                let uri = resp.expanded_canvas_data_uri;
                let pending = self.surface.handle().load_image(&uri, None, None);
                self.expand_stage = ExpandStage::Loading { pending, uri };
            }
            Err(e) => {
                self.expand_stage = ExpandStage::Idle;
                self.expand_failed(&e);
            }
        }
    }

    fn on_expand_loaded(&mut self, outcome: Result<(), SurfaceError>, uri: String) {
        match outcome {
            Ok(()) => {
                let (width, height) = self.surface.dimensions();
                self.config = SurfaceConfig::new(width, height);
                self.initial_image = Some(uri);
                self.surface.adopt(self.config, self.initial_image.clone());
                self.expand_completed = true;
                crate::log_info!("Canvas expanded to {}×{}", width, height);
                self.toasts.dispatch(format!(
                    "Canvas Expanded: New dimensions: {}x{}",
                    width, height
                ));
            }
            Err(e) => self.expand_failed(&ExpandError::Load(e.to_string())),
        }
    }

    fn step_expand(&mut self) {
        match std::mem::replace(&mut self.expand_stage, ExpandStage::Idle) {
            ExpandStage::Idle => {}
            ExpandStage::Requesting => match self.expand_receiver.try_recv() {
                Ok(response) => self.on_expand_response(response),
                Err(mpsc::TryRecvError::Empty) => self.expand_stage = ExpandStage::Requesting,
                Err(mpsc::TryRecvError::Disconnected) => self.expand_failed(
                    &ExpandError::Request("expansion worker disappeared".into()),
                ),
            },
            ExpandStage::Loading { mut pending, uri } => match pending.try_result() {
                Some(outcome) => self.on_expand_loaded(outcome, uri),
                None => self.expand_stage = ExpandStage::Loading { pending, uri },
            },
        }
    }

    /// Per-frame housekeeping: apply decodes, advance the expansion, expire toasts.
    pub fn update(&mut self, now: Instant) {
        if let Some(Err(e)) = self.surface.poll()
            && e != SurfaceError::Superseded
        {
            self.toasts.dispatch(e.to_string());
        }
        self.step_expand();
        self.toasts.tick(now);
    }

    /// Block until background work (loads and any expansion) has settled.
    pub fn wait_for_idle(&mut self) {
        loop {
            if matches!(self.expand_stage, ExpandStage::Requesting) {
                match self.expand_receiver.recv() {
                    Ok(response) => {
                        self.expand_stage = ExpandStage::Idle;
                        self.on_expand_response(response);
                    }
                    Err(_) => {
                        self.expand_stage = ExpandStage::Idle;
                        self.expand_failed(&ExpandError::Request(
                            "expansion worker disappeared".into(),
                        ));
                    }
                }
            }
            if let Some(Err(e)) = self.surface.wait_for_loads()
                && e != SurfaceError::Superseded
            {
                self.toasts.dispatch(e.to_string());
            }
            self.step_expand();
            if !self.is_busy() {
                break;
            }
        }
    }
}
