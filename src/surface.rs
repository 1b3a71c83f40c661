// ============================================================================
// DRAWING SURFACE: pointer-interactive wrapper around the surface state
// ============================================================================
//
// The host hands in a full `SurfaceProps` on every frame.  Changes to the
// requested size or the initial image reconcile the buffer (load or clear);
// changes to the tool settings go straight into the live rendering context.

use image::RgbaImage;

use crate::canvas::{
    CanvasHandle, PendingLoad, SurfaceConfig, SurfaceError, SurfaceState,
};
use crate::components::pointer::{BoundingRect, PointerEvent, SurfacePoint, surface_point};
use crate::components::tools::ToolSettings;

/// Everything the host configures on the surface.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SurfaceProps {
    pub config: SurfaceConfig,
    pub settings: ToolSettings,
    /// Image to restore instead of starting blank (blob URI).
    pub initial_image: Option<String>,
}

pub struct DrawingSurface {
    state: SurfaceState,
    props: SurfaceProps,
    /// Load started by reconciliation, reported through `poll`.
    initial_load: Option<PendingLoad>,
}

impl DrawingSurface {
    /// Create an unmounted surface.  Nothing is drawn until `mount`.
    pub fn new(props: SurfaceProps) -> Self {
        let mut state = SurfaceState::new(props.config);
        state.apply_settings(&props.settings);
        Self {
            state,
            props,
            initial_load: None,
        }
    }

    /// Acquire the rendering context and bring the buffer in line with the props.
    pub fn mount(&mut self) {
        self.state.mount();
        self.reconcile();
    }

    pub fn unmount(&mut self) {
        self.state.unmount();
    }

    pub fn is_mounted(&self) -> bool {
        self.state.is_mounted()
    }

    pub fn props(&self) -> &SurfaceProps {
        &self.props
    }

    pub fn config(&self) -> SurfaceConfig {
        self.state.config()
    }

    /// Actual buffer size (may differ from the config right after a load).
    pub fn dimensions(&self) -> (u32, u32) {
        self.state.dimensions()
    }

    pub fn is_drawing(&self) -> bool {
        self.state.is_drawing()
    }

    pub(crate) fn pixels(&self) -> &RgbaImage {
        self.state.pixels()
    }

    /// Generation of the current buffer allocation; changes on every resize.
    pub fn buffer_generation(&self) -> u64 {
        self.state.buffer().generation()
    }

    /// Changes whenever the pixels do.
    pub fn revision(&self) -> u64 {
        self.state.revision()
    }

    /// The operation set exposed to the host.
    pub fn handle(&mut self) -> &mut dyn CanvasHandle {
        &mut self.state
    }

    /// Diff `props` against the last ones seen and react.
    pub fn set_props(&mut self, props: SurfaceProps) {
        if props == self.props {
            return;
        }
        let settings_changed = props.settings != self.props.settings;
        let needs_reconcile = props.config != self.props.config
            || props.initial_image != self.props.initial_image;
        self.props = props;

        if settings_changed {
            self.state.apply_settings(&self.props.settings);
        }
        if needs_reconcile {
            self.reconcile();
        }
    }

    /// Record props that the buffer already reflects (e.g. after the host
    /// loaded an expanded image itself), without clearing or reloading.
    pub fn adopt(&mut self, config: SurfaceConfig, initial_image: Option<String>) {
        self.props.config = config;
        self.props.initial_image = initial_image;
        self.state.set_config(config);
    }

    /// Load the initial image if there is one, otherwise clear to white at
    /// the configured size.
    fn reconcile(&mut self) {
        self.state.set_config(self.props.config);
        if !self.state.is_mounted() {
            return;
        }
        match self.props.initial_image.clone() {
            Some(uri) => {
                self.initial_load = Some(self.state.load_image(&uri, None, None));
            }
            None => {
                self.initial_load = None;
                self.state.clear(None);
            }
        }
    }

    /// Apply finished decodes.  Returns the outcome of a reconcile-initiated
    /// load once it resolves.
    pub fn poll(&mut self) -> Option<Result<(), SurfaceError>> {
        self.state.poll_loads();
        self.take_initial_load_outcome()
    }

    /// Block until all in-flight loads have been applied.
    pub fn wait_for_loads(&mut self) -> Option<Result<(), SurfaceError>> {
        self.state.wait_for_loads();
        self.take_initial_load_outcome()
    }

    fn take_initial_load_outcome(&mut self) -> Option<Result<(), SurfaceError>> {
        let outcome = self.initial_load.as_mut()?.try_result()?;
        self.initial_load = None;
        if let Err(e) = &outcome {
            crate::log_err!("Initial canvas image could not be restored: {}", e);
        }
        Some(outcome)
    }

    pub fn pending_loads(&self) -> usize {
        self.state.pending_loads()
    }

    // ---- pointer wiring ------------------------------------------------------

    pub fn pointer_down(&mut self, event: &PointerEvent, rect: &BoundingRect) {
        let at = surface_point(event, rect);
        self.state.begin_stroke(at);
    }

    pub fn pointer_move(&mut self, event: &PointerEvent, rect: &BoundingRect) -> bool {
        if !self.state.is_drawing() {
            return false;
        }
        let to = surface_point(event, rect);
        self.state.continue_stroke(to)
    }

    pub fn pointer_up(&mut self) {
        self.state.end_stroke();
    }

    pub fn pointer_leave(&mut self) {
        self.state.end_stroke();
    }

    /// Paint a polyline as one stroke, in surface coordinates.
    pub fn stroke_path(&mut self, points: &[SurfacePoint]) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        self.state.begin_stroke(*first);
        for p in rest {
            self.state.continue_stroke(*p);
        }
        self.state.end_stroke();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::tools::Tool;
    use crate::io::{ExportFormat, image_to_data_uri};
    use image::Rgba;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const ORIGIN: BoundingRect = BoundingRect {
        left: 0.0,
        top: 0.0,
        width: 0.0,
        height: 0.0,
    };

    fn surface(w: u32, h: u32) -> DrawingSurface {
        let mut s = DrawingSurface::new(SurfaceProps {
            config: SurfaceConfig::new(w, h),
            ..SurfaceProps::default()
        });
        s.mount();
        s
    }

    #[test]
    fn mount_without_image_clears_white() {
        let s = surface(800, 600);
        assert_eq!(s.dimensions(), (800, 600));
        assert!(s.pixels().pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn settings_change_does_not_touch_pixels() {
        let mut s = surface(20, 20);
        let generation = s.buffer_generation();
        let mut props = s.props().clone();
        props.settings.tool = Tool::Eraser;
        props.settings.size = 9;
        s.set_props(props);
        assert_eq!(s.buffer_generation(), generation);
        assert!(s.pixels().pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn config_change_clears_at_new_size() {
        let mut s = surface(20, 20);
        s.stroke_path(&[SurfacePoint::new(2.0, 2.0), SurfacePoint::new(18.0, 18.0)]);
        let mut props = s.props().clone();
        props.config = SurfaceConfig::new(30, 10);
        s.set_props(props);
        assert_eq!(s.dimensions(), (30, 10));
        assert!(s.pixels().pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn initial_image_is_loaded_not_cleared() {
        let mut s = surface(20, 20);
        let art = RgbaImage::from_pixel(12, 7, Rgba([40, 50, 60, 255]));
        let uri = image_to_data_uri(&art, ExportFormat::Png, 1.0).unwrap();
        let mut props = s.props().clone();
        props.initial_image = Some(uri);
        s.set_props(props);
        assert_eq!(s.wait_for_loads(), Some(Ok(())));
        assert_eq!(s.dimensions(), (12, 7));
        assert_eq!(s.config(), SurfaceConfig::new(20, 20));
        assert_eq!(*s.pixels().get_pixel(5, 5), Rgba([40, 50, 60, 255]));
    }

    #[test]
    fn broken_initial_image_is_reported() {
        let mut s = surface(10, 10);
        let mut props = s.props().clone();
        props.initial_image = Some("data:image/png;base64,AAAA".to_string());
        s.set_props(props);
        assert!(matches!(s.wait_for_loads(), Some(Err(SurfaceError::Decode(_)))));
        assert_eq!(s.dimensions(), (10, 10));
    }

    #[test]
    fn adopt_records_without_reconciling() {
        let mut s = surface(10, 10);
        s.stroke_path(&[SurfacePoint::new(1.0, 1.0), SurfacePoint::new(8.0, 1.0)]);
        let painted = s.pixels().clone();
        s.adopt(SurfaceConfig::new(10, 10), Some("data:image/png;base64,xyz".to_string()));
        assert_eq!(s.pending_loads(), 0);
        assert_eq!(*s.pixels(), painted);
    }

    #[test]
    fn pointer_leave_ends_stroke() {
        let mut s = surface(50, 20);
        s.pointer_down(&PointerEvent::mouse(5.0, 10.0), &ORIGIN);
        assert!(s.is_drawing());
        assert!(s.pointer_move(&PointerEvent::mouse(20.0, 10.0), &ORIGIN));
        s.pointer_leave();
        assert!(!s.is_drawing());
        assert!(!s.pointer_move(&PointerEvent::mouse(45.0, 10.0), &ORIGIN));
        assert_eq!(*s.pixels().get_pixel(40, 10), WHITE);
    }

    #[test]
    fn unmounted_surface_ignores_everything() {
        let mut s = DrawingSurface::new(SurfaceProps::default());
        s.pointer_down(&PointerEvent::mouse(5.0, 5.0), &ORIGIN);
        assert!(!s.pointer_move(&PointerEvent::mouse(50.0, 5.0), &ORIGIN));
        assert_eq!(s.handle().get_current_image(ExportFormat::Png, 1.0), "");
    }
}
