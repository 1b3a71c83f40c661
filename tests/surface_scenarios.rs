use genesis_canvas::canvas::{SurfaceConfig, SurfaceError};
use genesis_canvas::components::pointer::{BoundingRect, PointerEvent, SurfacePoint, TouchPoint};
use genesis_canvas::components::tools::{Tool, ToolSettings};
use genesis_canvas::io::{ExportFormat, decode_data_uri, image_to_data_uri, parse_data_uri};
use genesis_canvas::surface::{DrawingSurface, SurfaceProps};
use image::{Rgba, RgbaImage};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

fn mounted(width: u32, height: u32) -> DrawingSurface {
    let mut surface = DrawingSurface::new(SurfaceProps {
        config: SurfaceConfig::new(width, height),
        ..SurfaceProps::default()
    });
    surface.mount();
    surface
}

fn snapshot(surface: &mut DrawingSurface) -> RgbaImage {
    let uri = surface.handle().get_current_image(ExportFormat::Png, 1.0);
    decode_data_uri(&uri).unwrap()
}

fn set_settings(surface: &mut DrawingSurface, settings: ToolSettings) {
    let mut props = surface.props().clone();
    props.settings = settings;
    surface.set_props(props);
}

fn png(color: Rgba<u8>, width: u32, height: u32) -> String {
    image_to_data_uri(&RgbaImage::from_pixel(width, height, color), ExportFormat::Png, 1.0).unwrap()
}

#[test]
fn blank_config_clears_to_white() {
    let mut surface = mounted(800, 600);
    let img = snapshot(&mut surface);
    assert_eq!(img.dimensions(), (800, 600));
    assert!(img.pixels().all(|p| *p == WHITE));
}

#[test]
fn pencil_drag_paints_horizontal_segment() {
    let mut surface = mounted(800, 600);
    let rect = BoundingRect {
        left: 0.0,
        top: 0.0,
        width: 800.0,
        height: 600.0,
    };
    surface.pointer_down(&PointerEvent::mouse(100.0, 100.0), &rect);
    assert!(surface.pointer_move(&PointerEvent::mouse(150.0, 100.0), &rect));
    surface.pointer_up();

    let img = snapshot(&mut surface);
    for x in [100, 125, 149] {
        for y in 98..=101 {
            assert_eq!(*img.get_pixel(x, y), BLACK, "({}, {})", x, y);
        }
        assert_eq!(*img.get_pixel(x, 95), WHITE);
        assert_eq!(*img.get_pixel(x, 105), WHITE);
    }
    assert_eq!(*img.get_pixel(160, 100), WHITE);
    assert_eq!(*img.get_pixel(90, 100), WHITE);

    let painted = img.pixels().filter(|p| **p != WHITE).count();
    assert!(painted > 50 * 4 && painted < 60 * 7, "painted {}", painted);
}

#[test]
fn mapping_uses_rect_offset_and_first_touch() {
    let mut surface = mounted(100, 100);
    let rect = BoundingRect {
        left: 40.0,
        top: 30.0,
        width: 100.0,
        height: 100.0,
    };
    let touch = |x: f32, y: f32| PointerEvent::Touch {
        touches: vec![
            TouchPoint {
                client_x: x,
                client_y: y,
            },
            TouchPoint {
                client_x: 0.0,
                client_y: 0.0,
            },
        ],
    };
    surface.pointer_down(&touch(50.0, 80.0), &rect);
    surface.pointer_move(&touch(90.0, 80.0), &rect);
    surface.pointer_up();

    let img = snapshot(&mut surface);
    assert_eq!(*img.get_pixel(30, 50), BLACK);
    assert_eq!(*img.get_pixel(70, 80), WHITE);
}

#[test]
fn later_load_wins() {
    let mut surface = mounted(50, 50);
    let mut first = surface.handle().load_image(&png(Rgba([255, 0, 0, 255]), 40, 30), None, None);
    let mut second = surface.handle().load_image(&png(Rgba([0, 0, 255, 255]), 64, 48), None, None);
    assert!(second.token() > first.token());

    surface.wait_for_loads();
    assert_eq!(first.try_result(), Some(Err(SurfaceError::Superseded)));
    assert_eq!(second.try_result(), Some(Ok(())));

    let img = snapshot(&mut surface);
    assert_eq!(img.dimensions(), (64, 48));
    assert!(img.pixels().all(|p| *p == Rgba([0, 0, 255, 255])));
}

#[test]
fn png_round_trip_is_pixel_exact() {
    let mut surface = mounted(64, 40);
    set_settings(
        &mut surface,
        ToolSettings {
            tool: Tool::Brush,
            color: "#3366cc80".to_string(),
            size: 7,
        },
    );
    surface.stroke_path(&[
        SurfacePoint::new(5.0, 5.0),
        SurfacePoint::new(50.0, 30.0),
        SurfacePoint::new(60.0, 8.0),
    ]);
    let before = snapshot(&mut surface);
    let uri = surface.handle().get_current_image(ExportFormat::Png, 1.0);

    let mut other = mounted(10, 10);
    let mut pending = other.handle().load_image(&uri, Some(64), Some(40));
    other.wait_for_loads();
    assert_eq!(pending.try_result(), Some(Ok(())));
    assert_eq!(snapshot(&mut other), before);
}

#[test]
fn strokes_one_by_one_equal_batch_replay() {
    let strokes: Vec<(ToolSettings, Vec<SurfacePoint>)> = vec![
        (
            ToolSettings {
                tool: Tool::Pencil,
                color: "#000000".into(),
                size: 3,
            },
            vec![
                SurfacePoint::new(10.0, 10.0),
                SurfacePoint::new(60.0, 20.0),
                SurfacePoint::new(70.0, 55.0),
            ],
        ),
        (
            ToolSettings {
                tool: Tool::Brush,
                color: "#22aa44".into(),
                size: 12,
            },
            vec![SurfacePoint::new(5.0, 60.0), SurfacePoint::new(75.0, 5.0)],
        ),
        (
            ToolSettings {
                tool: Tool::Eraser,
                color: "#000000".into(),
                size: 6,
            },
            vec![SurfacePoint::new(40.0, 0.0), SurfacePoint::new(40.0, 70.0)],
        ),
    ];

    let rect = BoundingRect {
        left: 0.0,
        top: 0.0,
        width: 80.0,
        height: 70.0,
    };
    let mut live = mounted(80, 70);
    for (settings, points) in &strokes {
        set_settings(&mut live, settings.clone());
        let (first, rest) = points.split_first().unwrap();
        live.pointer_down(&PointerEvent::mouse(first.x, first.y), &rect);
        for p in rest {
            live.pointer_move(&PointerEvent::mouse(p.x, p.y), &rect);
        }
        live.pointer_up();
    }

    let mut batch = mounted(80, 70);
    for (settings, points) in &strokes {
        set_settings(&mut batch, settings.clone());
        batch.stroke_path(points);
    }

    assert_eq!(snapshot(&mut live), snapshot(&mut batch));
}

#[test]
fn clear_is_uniform_at_config_size() {
    let mut surface = mounted(30, 20);
    let mut pending = surface.handle().load_image(&png(BLACK, 12, 12), None, None);
    surface.wait_for_loads();
    assert_eq!(pending.try_result(), Some(Ok(())));
    assert_eq!(surface.dimensions(), (12, 12));

    surface.handle().clear(Some("#ffcc00"));
    let img = snapshot(&mut surface);
    assert_eq!(img.dimensions(), (30, 20));
    assert!(img.pixels().all(|p| *p == Rgba([255, 204, 0, 255])));
}

#[test]
fn eraser_makes_painted_pixels_transparent() {
    let mut surface = mounted(40, 40);
    set_settings(
        &mut surface,
        ToolSettings {
            tool: Tool::Brush,
            color: "#aa0000".into(),
            size: 10,
        },
    );
    surface.stroke_path(&[SurfacePoint::new(5.0, 20.0), SurfacePoint::new(35.0, 20.0)]);
    set_settings(
        &mut surface,
        ToolSettings {
            tool: Tool::Eraser,
            color: "#000000".into(),
            size: 10,
        },
    );
    surface.stroke_path(&[SurfacePoint::new(20.0, 5.0), SurfacePoint::new(20.0, 35.0)]);

    let img = snapshot(&mut surface);
    assert_eq!(img.get_pixel(20, 20)[3], 0);
    assert_eq!(img.get_pixel(20, 2)[3], 0);
    assert_eq!(*img.get_pixel(8, 20), Rgba([170, 0, 0, 255]));
}

#[test]
fn jpeg_export_carries_jpeg_mime() {
    let mut surface = mounted(32, 32);
    let uri = surface.handle().get_current_image(ExportFormat::Jpeg, 0.9);
    let parsed = parse_data_uri(&uri).unwrap();
    assert_eq!(parsed.mime, "image/jpeg");
    let img = decode_data_uri(&uri).unwrap();
    assert_eq!(img.dimensions(), (32, 32));
}

#[test]
fn malformed_load_leaves_buffer_alone() {
    let mut surface = mounted(16, 16);
    let before = snapshot(&mut surface);
    let mut pending = surface.handle().load_image("not a data uri", None, None);
    surface.wait_for_loads();
    assert!(matches!(pending.try_result(), Some(Err(SurfaceError::Decode(_)))));
    assert_eq!(snapshot(&mut surface), before);
}
