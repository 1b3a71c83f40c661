use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::components::pointer::SurfacePoint;

/// Smallest and largest brush sizes the toolbar offers.
pub const MIN_BRUSH_SIZE: u32 = 1;
pub const MAX_BRUSH_SIZE: u32 = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Pencil,
    Brush,
    Eraser,
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Pencil => "Pencil",
            Tool::Brush => "Brush",
            Tool::Eraser => "Eraser",
        }
    }

    pub fn all() -> &'static [Tool] {
        &[Tool::Pencil, Tool::Brush, Tool::Eraser]
    }
}

/// Tool selection supplied by the host on every render.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSettings {
    pub tool: Tool,
    /// `#RGB`, `#RRGGBB` or `#RRGGBBAA`.
    pub color: String,
    /// Stroke width in pixels.
    pub size: u32,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tool: Tool::Pencil,
            color: "#000000".to_string(),
            size: 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CapStyle {
    /// Segment ends exactly at its endpoints.
    #[default]
    Flat,
    /// Half-disc past each endpoint; consecutive segments join seamlessly.
    Round,
}

/// How stroke pixels combine with what is already in the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CompositeMode {
    /// Paint over: the stroke color is blended on top.
    #[default]
    SourceOver,
    /// Erase-through: destination alpha is removed under the stroke.
    DestinationOut,
}

/// Drawing state held by a rendering context.  A freshly acquired context
/// starts from `Default` (black, 1px, flat caps, paint over), which is why
/// tool settings must be re-applied after every reacquisition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgba<u8>,
    pub width: f32,
    pub cap: CapStyle,
    pub composite: CompositeMode,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: Rgba([0, 0, 0, 255]),
            width: 1.0,
            cap: CapStyle::Flat,
            composite: CompositeMode::SourceOver,
        }
    }
}

impl StrokeStyle {
    /// Copy `settings` into the style.  An unparseable color leaves the
    /// previous color in place, as a 2D context ignores invalid styles.
    pub fn apply(&mut self, settings: &ToolSettings) {
        match parse_hex_color(&settings.color) {
            Some(color) => self.color = color,
            None => crate::log_warn!("Ignoring invalid stroke color {:?}", settings.color),
        }
        self.width = settings.size.max(MIN_BRUSH_SIZE) as f32;
        self.cap = CapStyle::Round;
        self.composite = match settings.tool {
            Tool::Eraser => CompositeMode::DestinationOut,
            Tool::Pencil | Tool::Brush => CompositeMode::SourceOver,
        };
    }
}

/// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
pub fn parse_hex_color(s: &str) -> Option<Rgba<u8>> {
    let hex = s.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if !hex.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => {
            let mut out = [0u8; 4];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                out[i] = v * 17;
            }
            out[3] = 255;
            Some(Rgba(out))
        }
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

/// Straight-alpha source-over of `src` onto `dst`.
fn blend_source_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    if sa >= 1.0 {
        return src;
    }
    if sa <= 0.0 {
        return dst;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (src[c] as f32 * sa + dst[c] as f32 * da * (1.0 - sa)) / out_a;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round() as u8;
    Rgba(out)
}

/// Destination-out: remove `src_alpha` worth of coverage from `dst`.
fn blend_destination_out(dst: Rgba<u8>, src_alpha: u8) -> Rgba<u8> {
    let remaining = dst[3] as u32 * (255 - src_alpha as u32) / 255;
    if remaining == 0 {
        Rgba([0, 0, 0, 0])
    } else {
        Rgba([dst[0], dst[1], dst[2], remaining as u8])
    }
}

/// Rasterize one stroke segment into `pixels`.
///
/// A pixel is covered when its center lies within `width / 2` of the segment
/// (of the segment's endpoints too, for round caps).  Coverage is binary, so
/// every covered pixel is composited exactly once per segment.
pub fn paint_segment(
    pixels: &mut RgbaImage,
    style: &StrokeStyle,
    from: SurfacePoint,
    to: SurfacePoint,
) {
    let (width, height) = pixels.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let radius = style.width / 2.0;
    let radius_sq = radius * radius;
    if radius_sq < 0.001 {
        return;
    }

    let min_x = (from.x.min(to.x) - radius).floor().max(0.0);
    let min_y = (from.y.min(to.y) - radius).floor().max(0.0);
    let max_x = (from.x.max(to.x) + radius).ceil().min(width as f32 - 1.0);
    let max_y = (from.y.max(to.y) + radius).ceil().min(height as f32 - 1.0);
    if min_x > max_x || min_y > max_y {
        return;
    }

    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let len_sq = dx * dx + dy * dy;

    for py in min_y as u32..=max_y as u32 {
        for px in min_x as u32..=max_x as u32 {
            let cx = px as f32 + 0.5;
            let cy = py as f32 + 0.5;
            let t = if len_sq > 0.0 {
                ((cx - from.x) * dx + (cy - from.y) * dy) / len_sq
            } else {
                0.0
            };
            if style.cap == CapStyle::Flat && !(0.0..=1.0).contains(&t) {
                continue;
            }
            let t = t.clamp(0.0, 1.0);
            let nx = from.x + t * dx - cx;
            let ny = from.y + t * dy - cy;
            if nx * nx + ny * ny > radius_sq {
                continue;
            }
            let dst = *pixels.get_pixel(px, py);
            let out = match style.composite {
                CompositeMode::SourceOver => blend_source_over(dst, style.color),
                CompositeMode::DestinationOut => blend_destination_out(dst, style.color[3]),
            };
            pixels.put_pixel(px, py, out);
        }
    }
}

/// Open path of the stroke in progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeSession {
    pub start: SurfacePoint,
    pub last: SurfacePoint,
}

/// Idle/Active stroke state machine.  Geometry is dropped as soon as the
/// stroke ends; only the pixels it painted remain.
#[derive(Debug, Default)]
pub struct StrokeRenderer {
    session: Option<StrokeSession>,
}

impl StrokeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&StrokeSession> {
        self.session.as_ref()
    }

    /// Idle → Active.  A press alone paints nothing.
    pub fn begin(&mut self, at: SurfacePoint) {
        self.session = Some(StrokeSession { start: at, last: at });
    }

    /// Active → Active: paint the segment from the previous point to `to`.
    /// Returns false (and paints nothing) while idle.
    pub fn extend(&mut self, pixels: &mut RgbaImage, style: &StrokeStyle, to: SurfacePoint) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        paint_segment(pixels, style, session.last, to);
        session.last = to;
        true
    }

    /// Active → Idle.  Returns the closed session, if one was open.
    pub fn finish(&mut self) -> Option<StrokeSession> {
        self.session.take()
    }
}
