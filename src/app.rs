// ============================================================================
// GENESIS CANVAS APP: eframe shell around `CanvasHost`
// ============================================================================

use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui;
use egui::{Color32, ColorImage, Pos2, Rect, Sense, TextureHandle, TextureOptions, Vec2};

use crate::canvas::MAX_CANVAS_SIDE;
use crate::cli::CliArgs;
use crate::components::pointer::{BoundingRect, PointerEvent};
use crate::components::tools::{MAX_BRUSH_SIZE, MIN_BRUSH_SIZE, Tool};
use crate::host::CanvasHost;
use crate::io::{ExportFormat, file_to_data_uri, write_data_uri};
use crate::ops::ai::{
    CanvasExpander, ExpandDirection, ExpandSettings, HttpExpander, MAX_EXPAND_AMOUNT,
    MIN_EXPAND_AMOUNT,
};

pub struct GenesisApp {
    host: CanvasHost,
    texture: Option<TextureHandle>,
    /// Surface revision currently uploaded to `texture`.
    texture_revision: Option<u64>,
    /// Colour picker state, mirrored into the tool settings on change.
    color_rgb: [u8; 3],
    expand_open: bool,
    expand: ExpandSettings,
    resize_width: u32,
    resize_height: u32,
    last_pointer: Option<Pos2>,
}

impl GenesisApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, args: CliArgs) -> Self {
        let expander: Option<Arc<dyn CanvasExpander>> = match &args.expand_endpoint {
            Some(url) => match HttpExpander::new(url.clone()) {
                Ok(backend) => {
                    crate::log_info!("Canvas expansion endpoint: {}", backend.endpoint());
                    Some(Arc::new(backend))
                }
                Err(e) => {
                    crate::log_err!("Expansion backend unavailable: {}", e);
                    None
                }
            },
            None => None,
        };

        let config = args.config();
        let mut host = CanvasHost::new(config, expander);
        if let Some(path) = &args.open {
            match file_to_data_uri(path) {
                Ok(uri) => host.open_image_uri(uri),
                Err(e) => crate::log_err!("Could not open {}: {}", path.display(), e),
            }
        }

        Self {
            host,
            texture: None,
            texture_revision: None,
            color_rgb: [0, 0, 0],
            expand_open: false,
            expand: ExpandSettings::default(),
            resize_width: config.width,
            resize_height: config.height,
            last_pointer: None,
        }
    }

    // ---- toolbar ---------------------------------------------------------

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.heading("Genesis Canvas");
        ui.separator();

        ui.label("Tools");
        ui.horizontal(|ui| {
            for &tool in Tool::all() {
                let selected = self.host.settings().tool == tool;
                if ui.selectable_label(selected, tool.label()).clicked() {
                    self.host.set_tool(tool);
                }
            }
        });
        ui.separator();

        ui.label("Color");
        ui.horizontal(|ui| {
            if ui.color_edit_button_srgb(&mut self.color_rgb).changed() {
                let [r, g, b] = self.color_rgb;
                self.host.set_color(&format!("#{:02X}{:02X}{:02X}", r, g, b));
            }
            ui.monospace(self.host.settings().color.to_uppercase());
        });
        ui.separator();

        ui.label(format!("Brush Size: {}px", self.host.settings().size));
        ui.horizontal(|ui| {
            if ui.small_button("−").clicked() {
                self.host.decrease_brush_size();
            }
            let mut size = self.host.settings().size;
            let slider = egui::Slider::new(&mut size, MIN_BRUSH_SIZE..=MAX_BRUSH_SIZE).show_value(false);
            if ui.add(slider).changed() {
                self.host.set_brush_size(size);
            }
            if ui.small_button("+").clicked() {
                self.host.increase_brush_size();
            }
        });
        ui.separator();

        ui.label("Actions");
        let can_expand = !self.host.is_expanding();
        if ui.add_enabled(can_expand, egui::Button::new("AI Expand…")).clicked() {
            self.expand_open = true;
        }
        if ui.button("Clear Canvas").clicked() {
            self.host.clear_canvas();
        }
        if ui.button("Open Image…").clicked() {
            self.open_image();
        }
        ui.separator();

        ui.label("Canvas Size");
        ui.horizontal(|ui| {
            ui.add(egui::DragValue::new(&mut self.resize_width).clamp_range(1..=MAX_CANVAS_SIDE).suffix(" w"));
            ui.add(egui::DragValue::new(&mut self.resize_height).clamp_range(1..=MAX_CANVAS_SIDE).suffix(" h"));
        });
        if ui.button("Resize").clicked() {
            self.host.resize_canvas(self.resize_width, self.resize_height);
        }
        ui.separator();

        ui.label("Export");
        if ui.button("Export as PNG").clicked() {
            self.export(ExportFormat::Png);
        }
        if ui.button("Export as JPEG").clicked() {
            self.export(ExportFormat::Jpeg);
        }
    }

    fn export(&mut self, format: ExportFormat) {
        let Some(exported) = self.host.export(format) else {
            self.host.toasts_mut().dispatch("Nothing to export yet");
            return;
        };
        let label = match format {
            ExportFormat::Png => "PNG Image",
            ExportFormat::Jpeg => "JPEG Image",
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter(label, &[format.extension()])
            .set_file_name(&exported.file_name)
            .save_file()
        else {
            return;
        };
        match write_data_uri(&exported.data_uri, &path) {
            Ok(()) => crate::log_info!("Exported {}", path.display()),
            Err(e) => {
                crate::log_err!("Export failed: {}", e);
                self.host.toasts_mut().dispatch(e);
            }
        }
    }

    fn open_image(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg"])
            .pick_file()
        else {
            return;
        };
        match file_to_data_uri(&path) {
            Ok(uri) => self.host.open_image_uri(uri),
            Err(e) => {
                crate::log_err!("Could not open {}: {}", path.display(), e);
                self.host
                    .toasts_mut()
                    .dispatch(format!("Could not open {}", path.display()));
            }
        }
    }

    // ---- expand dialog ---------------------------------------------------

    fn expand_window(&mut self, ctx: &egui::Context) {
        if self.host.take_expand_completed() {
            self.expand_open = false;
            self.expand = ExpandSettings::default();
        }
        if !self.expand_open {
            return;
        }
        let mut open = true;
        let mut submit = false;
        let busy = self.host.is_expanding();
        egui::Window::new("Generative Expand Canvas")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label("Use AI to expand and 'hallucinate' details on an edge of the canvas.");
                if !self.host.has_expander() {
                    ui.colored_label(
                        Color32::from_rgb(200, 120, 0),
                        "No expansion endpoint configured (--expand-endpoint).",
                    );
                }
                ui.add_space(6.0);
                egui::ComboBox::from_label("Direction")
                    .selected_text(self.expand.direction.label())
                    .show_ui(ui, |ui| {
                        for &dir in ExpandDirection::all() {
                            ui.selectable_value(&mut self.expand.direction, dir, dir.label());
                        }
                    });
                ui.horizontal(|ui| {
                    ui.label("Amount");
                    ui.add(
                        egui::DragValue::new(&mut self.expand.amount)
                            .clamp_range(MIN_EXPAND_AMOUNT..=MAX_EXPAND_AMOUNT)
                            .suffix(" px"),
                    );
                });
                ui.label("Prompt (optional)");
                ui.add(
                    egui::TextEdit::multiline(&mut self.expand.prompt)
                        .hint_text("e.g., 'a mystical forest scene'")
                        .desired_rows(3),
                );
                ui.add_space(6.0);
                ui.horizontal(|ui| {
                    let label = if busy { "Expanding…" } else { "Expand Canvas" };
                    if ui.add_enabled(!busy, egui::Button::new(label)).clicked() {
                        submit = true;
                    }
                    if busy {
                        ui.spinner();
                    }
                });
            });
        if submit {
            // Errors are already toasted by the host.
            let _ = self.host.start_expand(&self.expand);
        }
        self.expand_open = open;
    }

    // ---- canvas view -----------------------------------------------------

    fn sync_texture(&mut self, ctx: &egui::Context) {
        let revision = self.host.surface().revision();
        if self.texture.is_some() && self.texture_revision == Some(revision) {
            return;
        }
        let pixels = self.host.surface().pixels();
        let size = [pixels.width() as usize, pixels.height() as usize];
        let image = ColorImage::from_rgba_unmultiplied(size, pixels.as_raw());
        match &mut self.texture {
            Some(texture) => texture.set(image, TextureOptions::NEAREST),
            None => {
                self.texture = Some(ctx.load_texture("canvas", image, TextureOptions::NEAREST))
            }
        }
        self.texture_revision = Some(revision);
    }

    fn canvas_view(&mut self, ui: &mut egui::Ui) {
        self.sync_texture(ui.ctx());
        let (w, h) = self.host.surface().dimensions();
        egui::ScrollArea::both().show(ui, |ui| {
            let (rect, _response) =
                ui.allocate_exact_size(Vec2::new(w as f32, h as f32), Sense::click_and_drag());
            let painter = ui.painter();
            painter.rect_filled(rect, 0.0, Color32::WHITE);
            if let Some(texture) = &self.texture {
                let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
                painter.image(texture.id(), rect, uv, Color32::WHITE);
            }
            self.route_pointer(ui, rect);
        });
    }

    /// Translate egui pointer state into surface down/move/up/leave events.
    fn route_pointer(&mut self, ui: &egui::Ui, rect: Rect) {
        let bounds = BoundingRect {
            left: rect.min.x,
            top: rect.min.y,
            width: rect.width(),
            height: rect.height(),
        };
        let (pressed, down, pos) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_down(),
                i.pointer.interact_pos(),
            )
        });
        let surface = self.host.surface_mut();

        let Some(pos) = pos else {
            if surface.is_drawing() {
                surface.pointer_leave();
            }
            self.last_pointer = None;
            return;
        };
        let inside = rect.contains(pos);
        let event = PointerEvent::mouse(pos.x, pos.y);

        if pressed && inside {
            surface.pointer_down(&event, &bounds);
        } else if surface.is_drawing() {
            if !inside {
                surface.pointer_leave();
            } else if !down {
                surface.pointer_up();
            } else if self.last_pointer != Some(pos) {
                surface.pointer_move(&event, &bounds);
            }
        }
        self.last_pointer = Some(pos);
    }

    // ---- toast -----------------------------------------------------------

    fn toast_overlay(&self, ctx: &egui::Context) {
        let state = self.host.toasts().state();
        if !state.is_visible {
            return;
        }
        let Some(message) = &state.message else {
            return;
        };
        egui::Area::new("toast")
            .anchor(egui::Align2::CENTER_BOTTOM, [0.0, -24.0])
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.label(message);
                });
            });
    }
}

impl eframe::App for GenesisApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.host.update(Instant::now());

        egui::SidePanel::left("toolbar")
            .resizable(false)
            .exact_width(240.0)
            .show(ctx, |ui| self.toolbar(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.canvas_view(ui));

        self.expand_window(ctx);
        self.toast_overlay(ctx);

        if self.host.is_busy() || self.host.toasts().state().is_visible {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }
}
