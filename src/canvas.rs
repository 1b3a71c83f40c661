use std::sync::mpsc;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::components::pointer::SurfacePoint;
use crate::components::tools::{StrokeRenderer, StrokeStyle, ToolSettings, parse_hex_color};
use crate::io::{ExportFormat, decode_data_uri, image_to_data_uri};

pub const DEFAULT_CANVAS_WIDTH: u32 = 800;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 600;
/// Largest accepted side length; keeps every buffer allocation bounded.
pub const MAX_CANVAS_SIDE: u32 = 16384;
/// Background used by `clear` when the caller gives none.
pub const DEFAULT_BACKGROUND: &str = "#FFFFFF";

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Dimensions requested by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
        }
    }
}

impl SurfaceConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        dimensions_fit(self.width, self.height)
    }
}

/// Both sides in `1..=MAX_CANVAS_SIDE`.
pub fn dimensions_fit(width: u32, height: u32) -> bool {
    (1..=MAX_CANVAS_SIDE).contains(&width) && (1..=MAX_CANVAS_SIDE).contains(&height)
}

// ============================================================================
// ERRORS
// ============================================================================

/// Failures reported by the surface's asynchronous operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceError {
    /// The surface is not mounted, so there is no rendering context.
    ContextUnavailable,
    InvalidDimensions { width: u32, height: u32 },
    /// The image source could not be parsed or decoded.
    Decode(String),
    /// A later load (or clear) was issued before this one finished.
    Superseded,
    /// The surface went away before the load resolved.
    Disconnected,
}

impl std::fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceError::ContextUnavailable => write!(f, "Canvas not available"),
            SurfaceError::InvalidDimensions { width, height } => {
                write!(f, "Invalid canvas dimensions {}×{}", width, height)
            }
            SurfaceError::Decode(e) => write!(f, "Failed to load image: {}", e),
            SurfaceError::Superseded => write!(f, "Image load superseded by a newer request"),
            SurfaceError::Disconnected => write!(f, "Canvas closed before the image loaded"),
        }
    }
}

impl std::error::Error for SurfaceError {}

// ============================================================================
// PIXEL BUFFER + RENDERING CONTEXT
// ============================================================================

/// Rasterized surface content.  Each distinct allocation carries a fresh
/// generation so contexts acquired for an older buffer can be detected.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    pixels: RgbaImage,
    generation: u64,
}

impl PixelBuffer {
    fn new_filled(width: u32, height: u32, color: Rgba<u8>, generation: u64) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, color),
            generation,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Drawing state bound to one buffer generation.  Resizing allocates a new
/// buffer, which invalidates the context and resets its style.
#[derive(Clone, Copy, Debug)]
pub struct RenderContext {
    generation: u64,
    pub style: StrokeStyle,
}

impl RenderContext {
    fn acquire(buffer: &PixelBuffer) -> Self {
        Self {
            generation: buffer.generation,
            style: StrokeStyle::default(),
        }
    }

    pub fn is_valid_for(&self, buffer: &PixelBuffer) -> bool {
        self.generation == buffer.generation
    }
}

// ============================================================================
// ASYNC LOAD PLUMBING
// ============================================================================

/// Decode result sent back from the worker.
struct DecodedLoad {
    token: u64,
    width: Option<u32>,
    height: Option<u32>,
    result: Result<RgbaImage, String>,
    completion: mpsc::Sender<Result<(), SurfaceError>>,
}

/// Caller's side of a `load_image` request.  Resolves once the surface has
/// processed the decoded image (see `SurfaceState::poll_loads`).
#[derive(Debug)]
pub struct PendingLoad {
    token: u64,
    receiver: mpsc::Receiver<Result<(), SurfaceError>>,
    outcome: Option<Result<(), SurfaceError>>,
}

impl PendingLoad {
    fn new(token: u64, receiver: mpsc::Receiver<Result<(), SurfaceError>>) -> Self {
        Self {
            token,
            receiver,
            outcome: None,
        }
    }

    /// Load request id; 0 for requests rejected before they were issued.
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Non-blocking.  `None` while the load is still in flight.
    pub fn try_result(&mut self) -> Option<Result<(), SurfaceError>> {
        if self.outcome.is_none() {
            match self.receiver.try_recv() {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(mpsc::TryRecvError::Empty) => return None,
                Err(mpsc::TryRecvError::Disconnected) => {
                    self.outcome = Some(Err(SurfaceError::Disconnected))
                }
            }
        }
        self.outcome.clone()
    }
}

/// Operations the host may invoke on the surface.
pub trait CanvasHandle {
    /// Encode the committed pixels.  Empty string when no context is available.
    fn get_current_image(&self, format: ExportFormat, quality: f32) -> String;

    /// Replace the buffer with a decoded image.  `width`/`height` override the
    /// image's native size; the image is drawn at the origin and cropped or
    /// padded with transparency.  The buffer is untouched on failure.
    fn load_image(&mut self, uri: &str, width: Option<u32>, height: Option<u32>) -> PendingLoad;

    /// Reset to the configured dimensions and fill with `background`
    /// (opaque white when `None` or unparseable).
    fn clear(&mut self, background: Option<&str>);
}

// ============================================================================
// SURFACE STATE CONTROLLER
// ============================================================================

/// Sole owner of the pixel buffer.  Strokes, clears and exports run
/// synchronously; loads decode on a worker and are applied by `poll_loads`.
pub struct SurfaceState {
    config: SurfaceConfig,
    buffer: PixelBuffer,
    /// `None` until mounted.
    context: Option<RenderContext>,
    settings: ToolSettings,
    renderer: StrokeRenderer,
    next_generation: u64,
    /// Bumped on every pixel mutation; lets views skip redundant uploads.
    revision: u64,
    /// Id of the most recent load or clear; completions carrying an older id are discarded.
    load_token: u64,
    pending_loads: usize,
    load_sender: mpsc::Sender<DecodedLoad>,
    load_receiver: mpsc::Receiver<DecodedLoad>,
}

impl SurfaceState {
    pub fn new(config: SurfaceConfig) -> Self {
        let (load_sender, load_receiver) = mpsc::channel();
        let (width, height) = if config.is_valid() {
            (config.width, config.height)
        } else {
            (1, 1)
        };
        Self {
            config,
            buffer: PixelBuffer::new_filled(width, height, TRANSPARENT, 1),
            context: None,
            settings: ToolSettings::default(),
            renderer: StrokeRenderer::new(),
            next_generation: 2,
            revision: 0,
            load_token: 0,
            pending_loads: 0,
            load_sender,
            load_receiver,
        }
    }

    pub fn config(&self) -> SurfaceConfig {
        self.config
    }

    pub fn set_config(&mut self, config: SurfaceConfig) {
        self.config = config;
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub(crate) fn pixels(&self) -> &RgbaImage {
        &self.buffer.pixels
    }

    pub fn context(&self) -> Option<&RenderContext> {
        self.context.as_ref()
    }

    pub fn is_mounted(&self) -> bool {
        self.context.is_some()
    }

    pub fn is_drawing(&self) -> bool {
        self.renderer.is_active()
    }

    pub fn pending_loads(&self) -> usize {
        self.pending_loads
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Acquire a rendering context for the current buffer.
    pub fn mount(&mut self) {
        if self.context.is_none() {
            self.reacquire_context();
            crate::log_info!(
                "Surface mounted at {}×{}",
                self.buffer.width(),
                self.buffer.height()
            );
        }
    }

    /// Drop the context.  In-flight loads will resolve as superseded.
    pub fn unmount(&mut self) {
        self.context = None;
        self.renderer.finish();
        self.load_token += 1;
    }

    /// Store new tool settings and push them into the live context at once.
    pub fn apply_settings(&mut self, settings: &ToolSettings) {
        self.settings = settings.clone();
        if let Some(ctx) = self.context.as_mut() {
            ctx.style.apply(&self.settings);
        }
    }

    fn reacquire_context(&mut self) {
        let mut ctx = RenderContext::acquire(&self.buffer);
        ctx.style.apply(&self.settings);
        self.context = Some(ctx);
    }

    /// Swap in a new buffer; the old context and any open path die with it.
    fn replace_buffer(&mut self, pixels: RgbaImage) {
        self.buffer = PixelBuffer {
            pixels,
            generation: self.next_generation,
        };
        self.next_generation += 1;
        self.revision += 1;
        self.renderer.finish();
        self.reacquire_context();
    }

    // ---- strokes -----------------------------------------------------------

    pub fn begin_stroke(&mut self, at: SurfacePoint) {
        if self.context.is_none() {
            return;
        }
        if let Some(ctx) = self.context.as_mut() {
            ctx.style.apply(&self.settings);
        }
        self.renderer.begin(at);
    }

    /// Paint the segment to `to`.  False while idle or unmounted.
    pub fn continue_stroke(&mut self, to: SurfacePoint) -> bool {
        if self.context.is_none() {
            return false;
        }
        let Some(ctx) = self.context.as_ref() else {
            return false;
        };
        let painted = self.renderer.extend(&mut self.buffer.pixels, &ctx.style, to);
        if painted {
            self.revision += 1;
        }
        painted
    }

    pub fn end_stroke(&mut self) -> bool {
        self.renderer.finish().is_some()
    }

    // ---- loads -------------------------------------------------------------

    /// Apply every decode that has finished, without blocking.
    pub fn poll_loads(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(decoded) = self.load_receiver.try_recv() {
            self.finish_load(decoded);
            handled += 1;
        }
        handled
    }

    /// Block until every issued load has been decoded and applied.
    pub fn wait_for_loads(&mut self) {
        while self.pending_loads > 0 {
            match self.load_receiver.recv() {
                Ok(decoded) => self.finish_load(decoded),
                Err(_) => break,
            }
        }
    }

    fn finish_load(&mut self, decoded: DecodedLoad) {
        self.pending_loads = self.pending_loads.saturating_sub(1);
        let DecodedLoad {
            token,
            width,
            height,
            result,
            completion,
        } = decoded;

        if token != self.load_token {
            crate::log_info!(
                "Discarding stale image load #{} (latest is #{})",
                token,
                self.load_token
            );
            let _ = completion.send(Err(SurfaceError::Superseded));
            return;
        }
        if self.context.is_none() {
            let _ = completion.send(Err(SurfaceError::ContextUnavailable));
            return;
        }

        let outcome = match result {
            Ok(image) => {
                let w = width.unwrap_or(image.width());
                let h = height.unwrap_or(image.height());
                if !dimensions_fit(w, h) {
                    Err(SurfaceError::InvalidDimensions {
                        width: w,
                        height: h,
                    })
                } else {
                    let mut pixels = RgbaImage::from_pixel(w, h, TRANSPARENT);
                    image::imageops::replace(&mut pixels, &image, 0, 0);
                    self.replace_buffer(pixels);
                    crate::log_info!("Image load #{} applied at {}×{}", token, w, h);
                    Ok(())
                }
            }
            Err(e) => {
                crate::log_err!("Image load #{} failed: {}", token, e);
                Err(SurfaceError::Decode(e))
            }
        };
        let _ = completion.send(outcome);
    }
}

impl CanvasHandle for SurfaceState {
    fn get_current_image(&self, format: ExportFormat, quality: f32) -> String {
        if self.context.is_none() {
            return String::new();
        }
        image_to_data_uri(&self.buffer.pixels, format, quality).unwrap_or_else(|e| {
            crate::log_err!("Failed to encode canvas as {}: {}", format.mime_type(), e);
            String::new()
        })
    }

    fn load_image(&mut self, uri: &str, width: Option<u32>, height: Option<u32>) -> PendingLoad {
        let (done_tx, done_rx) = mpsc::channel();
        if self.context.is_none() {
            let _ = done_tx.send(Err(SurfaceError::ContextUnavailable));
            return PendingLoad::new(0, done_rx);
        }
        let explicit_ok =
            |side: Option<u32>| side.is_none_or(|v| (1..=MAX_CANVAS_SIDE).contains(&v));
        if !explicit_ok(width) || !explicit_ok(height) {
            let _ = done_tx.send(Err(SurfaceError::InvalidDimensions {
                width: width.unwrap_or_default(),
                height: height.unwrap_or_default(),
            }));
            return PendingLoad::new(0, done_rx);
        }

        self.load_token += 1;
        let token = self.load_token;
        self.pending_loads += 1;
        crate::log_info!("Image load #{} issued ({} bytes)", token, uri.len());

        let sender = self.load_sender.clone();
        let uri = uri.to_owned();
        rayon::spawn(move || {
            let result = std::panic::catch_unwind(|| decode_data_uri(&uri))
                .unwrap_or_else(|_| Err(crate::io::DataUriError::Malformed(
                    "decoder panicked".to_string(),
                )))
                .map_err(|e| e.to_string());
            let _ = sender.send(DecodedLoad {
                token,
                width,
                height,
                result,
                completion: done_tx,
            });
        });
        PendingLoad::new(token, done_rx)
    }

    fn clear(&mut self, background: Option<&str>) {
        if self.context.is_none() {
            return;
        }
        let color = match background {
            Some(bg) => parse_hex_color(bg).unwrap_or_else(|| {
                crate::log_warn!("Invalid background color {:?}, using white", bg);
                WHITE
            }),
            None => parse_hex_color(DEFAULT_BACKGROUND).unwrap_or(WHITE),
        };
        if !self.config.is_valid() {
            crate::log_warn!(
                "Refusing to clear to {}×{}",
                self.config.width,
                self.config.height
            );
            return;
        }
        // A clear outranks any load still decoding.
        self.load_token += 1;

        let (w, h) = (self.config.width, self.config.height);
        if self.buffer.dimensions() == (w, h) {
            for p in self.buffer.pixels.pixels_mut() {
                *p = color;
            }
            self.revision += 1;
        } else {
            self.replace_buffer(RgbaImage::from_pixel(w, h, color));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::tools::{CompositeMode, Tool};

    fn mounted(w: u32, h: u32) -> SurfaceState {
        let mut state = SurfaceState::new(SurfaceConfig::new(w, h));
        state.mount();
        state.clear(None);
        state
    }

    fn png_uri(img: &RgbaImage) -> String {
        image_to_data_uri(img, ExportFormat::Png, 1.0).unwrap()
    }

    #[test]
    fn unmounted_surface_is_inert() {
        let mut state = SurfaceState::new(SurfaceConfig::new(10, 10));
        assert_eq!(state.get_current_image(ExportFormat::Png, 1.0), "");
        state.clear(Some("#ff0000"));
        assert!(state.pixels().pixels().all(|p| *p == TRANSPARENT));
        state.begin_stroke(SurfacePoint::new(1.0, 1.0));
        assert!(!state.continue_stroke(SurfacePoint::new(5.0, 5.0)));

        let mut pending = state.load_image("data:image/png;base64,AAAA", None, None);
        assert_eq!(pending.try_result(), Some(Err(SurfaceError::ContextUnavailable)));
        assert_eq!(state.pending_loads(), 0);
    }

    #[test]
    fn clear_restores_configured_size() {
        let mut state = mounted(8, 6);
        state.replace_buffer(RgbaImage::from_pixel(20, 20, TRANSPARENT));
        state.clear(Some("#00ff00"));
        assert_eq!(state.dimensions(), (8, 6));
        assert!(state.pixels().pixels().all(|p| *p == Rgba([0, 255, 0, 255])));
    }

    #[test]
    fn invalid_background_falls_back_to_white() {
        let mut state = mounted(4, 4);
        state.clear(Some("chartreuse-ish"));
        assert!(state.pixels().pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn resize_reacquires_context_with_settings() {
        let mut state = mounted(10, 10);
        state.apply_settings(&ToolSettings {
            tool: Tool::Eraser,
            color: "#ff0000".to_string(),
            size: 12,
        });
        let before = state.context().unwrap().generation;
        state.set_config(SurfaceConfig::new(30, 20));
        state.clear(None);

        let ctx = state.context().unwrap();
        assert_ne!(ctx.generation, before);
        assert!(ctx.is_valid_for(state.buffer()));
        assert_eq!(ctx.style.width, 12.0);
        assert_eq!(ctx.style.composite, CompositeMode::DestinationOut);
    }

    #[test]
    fn load_uses_explicit_size_and_crops() {
        let mut state = mounted(4, 4);
        let src = RgbaImage::from_pixel(6, 3, Rgba([9, 8, 7, 255]));
        let mut pending = state.load_image(&png_uri(&src), Some(4), Some(5));
        state.wait_for_loads();
        assert_eq!(pending.try_result(), Some(Ok(())));
        assert_eq!(state.dimensions(), (4, 5));
        assert_eq!(*state.pixels().get_pixel(3, 2), Rgba([9, 8, 7, 255]));
        // Rows below the source image are padding.
        assert_eq!(*state.pixels().get_pixel(0, 4), TRANSPARENT);
    }

    #[test]
    fn failed_load_leaves_buffer_alone() {
        let mut state = mounted(5, 5);
        let mut pending = state.load_image("data:image/png;base64,bm90IGFuIGltYWdl", None, None);
        state.wait_for_loads();
        assert!(matches!(pending.try_result(), Some(Err(SurfaceError::Decode(_)))));
        assert_eq!(state.dimensions(), (5, 5));
        assert!(state.pixels().pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn zero_dimensions_are_rejected_up_front() {
        let mut state = mounted(5, 5);
        let mut pending = state.load_image("data:image/png;base64,AAAA", Some(0), None);
        assert_eq!(
            pending.try_result(),
            Some(Err(SurfaceError::InvalidDimensions { width: 0, height: 0 }))
        );
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut state = mounted(5, 5);
        let (tx, mut first) = {
            let (tx, rx) = mpsc::channel();
            (tx, PendingLoad::new(1, rx))
        };
        // Pretend load #1 was issued, then superseded by load #2 before decoding finished.
        state.load_token = 2;
        state.pending_loads = 1;
        state.finish_load(DecodedLoad {
            token: 1,
            width: None,
            height: None,
            result: Ok(RgbaImage::from_pixel(50, 50, Rgba([1, 2, 3, 255]))),
            completion: tx,
        });
        assert_eq!(first.try_result(), Some(Err(SurfaceError::Superseded)));
        assert_eq!(state.dimensions(), (5, 5));
        assert_eq!(state.pending_loads(), 0);
    }

    #[test]
    fn clear_supersedes_inflight_load() {
        let mut state = mounted(5, 5);
        let src = RgbaImage::from_pixel(9, 9, Rgba([1, 2, 3, 255]));
        let mut pending = state.load_image(&png_uri(&src), None, None);
        state.clear(Some("#000000"));
        state.wait_for_loads();
        assert_eq!(pending.try_result(), Some(Err(SurfaceError::Superseded)));
        assert_eq!(state.dimensions(), (5, 5));
        assert_eq!(*state.pixels().get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn settings_change_mid_stroke_reaches_next_segment() {
        let mut state = mounted(40, 10);
        state.apply_settings(&ToolSettings {
            tool: Tool::Pencil,
            color: "#000000".to_string(),
            size: 2,
        });
        state.begin_stroke(SurfacePoint::new(2.0, 5.0));
        state.continue_stroke(SurfacePoint::new(15.0, 5.0));
        state.apply_settings(&ToolSettings {
            tool: Tool::Pencil,
            color: "#ff0000".to_string(),
            size: 2,
        });
        state.continue_stroke(SurfacePoint::new(35.0, 5.0));
        state.end_stroke();

        assert_eq!(*state.pixels().get_pixel(8, 5), Rgba([0, 0, 0, 255]));
        assert_eq!(*state.pixels().get_pixel(28, 5), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn oversized_config_never_allocates() {
        let mut state = SurfaceState::new(SurfaceConfig::new(u32::MAX, u32::MAX));
        assert_eq!(state.dimensions(), (1, 1));
        state.mount();
        state.clear(None);
        assert_eq!(state.dimensions(), (1, 1));
        assert!(!SurfaceConfig::new(MAX_CANVAS_SIDE + 1, 10).is_valid());
        assert!(SurfaceConfig::new(MAX_CANVAS_SIDE, 1).is_valid());
    }

    #[test]
    fn oversized_clear_keeps_buffer() {
        let mut state = mounted(6, 4);
        state.set_config(SurfaceConfig::new(4_000_000_000, 4_000_000_000));
        state.clear(Some("#000000"));
        assert_eq!(state.dimensions(), (6, 4));
        assert!(state.pixels().pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn oversized_explicit_load_is_rejected_up_front() {
        let mut state = mounted(5, 5);
        let src = RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 255]));
        let mut pending = state.load_image(&png_uri(&src), Some(u32::MAX), Some(u32::MAX));
        assert_eq!(
            pending.try_result(),
            Some(Err(SurfaceError::InvalidDimensions {
                width: u32::MAX,
                height: u32::MAX
            }))
        );
        assert_eq!(state.pending_loads(), 0);
        assert_eq!(state.dimensions(), (5, 5));
    }

    #[test]
    fn oversized_decoded_target_is_rejected() {
        let mut state = mounted(5, 5);
        let (tx, mut pending) = {
            let (tx, rx) = mpsc::channel();
            (tx, PendingLoad::new(state.load_token + 1, rx))
        };
        state.load_token += 1;
        state.pending_loads = 1;
        state.finish_load(DecodedLoad {
            token: state.load_token,
            width: Some(MAX_CANVAS_SIDE + 1),
            height: None,
            result: Ok(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]))),
            completion: tx,
        });
        assert!(matches!(
            pending.try_result(),
            Some(Err(SurfaceError::InvalidDimensions { .. }))
        ));
        assert_eq!(state.dimensions(), (5, 5));
    }

    #[test]
    fn unmount_supersedes_inflight_load() {
        let mut state = mounted(5, 5);
        let src = RgbaImage::from_pixel(9, 9, Rgba([1, 2, 3, 255]));
        let mut pending = state.load_image(&png_uri(&src), None, None);
        state.unmount();
        state.wait_for_loads();
        assert_eq!(pending.try_result(), Some(Err(SurfaceError::Superseded)));
        assert_eq!(state.dimensions(), (5, 5));
        assert!(state.pixels().pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn load_reacquires_context_for_new_buffer() {
        let mut state = mounted(5, 5);
        state.apply_settings(&ToolSettings {
            tool: Tool::Brush,
            color: "#123456".to_string(),
            size: 7,
        });
        let before = state.buffer().generation();
        let src = RgbaImage::from_pixel(9, 6, Rgba([1, 2, 3, 255]));
        let mut pending = state.load_image(&png_uri(&src), None, None);
        state.wait_for_loads();
        assert_eq!(pending.try_result(), Some(Ok(())));

        let ctx = state.context().unwrap();
        assert_ne!(state.buffer().generation(), before);
        assert!(ctx.is_valid_for(state.buffer()));
        assert_eq!(ctx.style.width, 7.0);
        assert_eq!(ctx.style.color, Rgba([0x12, 0x34, 0x56, 255]));
    }
}
