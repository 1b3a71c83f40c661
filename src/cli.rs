// ============================================================================
// Genesis Canvas CLI: launch options and headless rendering
// ============================================================================
//
// Usage examples:
//   GenesisCanvas --width 1024 --height 768
//   GenesisCanvas --open photo.png --expand-endpoint http://localhost:3400/expand
//   GenesisCanvas --strokes doodle.json -o doodle.png
//   GenesisCanvas --open photo.jpg --strokes marks.json -o marked.jpg --quality 85
//
// Passing --output / -o selects headless mode: no window is opened, the
// strokes are replayed synchronously and the result is written to disk.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use serde::Deserialize;

use crate::canvas::{DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH, SurfaceConfig};
use crate::components::pointer::SurfacePoint;
use crate::components::tools::{Tool, ToolSettings};
use crate::io::{ExportFormat, file_to_data_uri, write_data_uri};
use crate::surface::{DrawingSurface, SurfaceProps};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Genesis Canvas drawing surface.
///
/// Without --output the desktop app opens; with it, strokes are rendered headless.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "genesis-canvas",
    about = "Genesis Canvas drawing surface",
    long_about = "Freehand drawing canvas with generative expansion.\n\n\
                  Pass --output to render a stroke script without opening a window:\n  \
                  genesis-canvas --strokes doodle.json -o doodle.png"
)]
pub struct CliArgs {
    /// Canvas width in pixels.
    #[arg(long, default_value_t = DEFAULT_CANVAS_WIDTH)]
    pub width: u32,

    /// Canvas height in pixels.
    #[arg(long, default_value_t = DEFAULT_CANVAS_HEIGHT)]
    pub height: u32,

    /// Image to start from instead of a blank canvas (PNG or JPEG).
    #[arg(long, value_name = "IMAGE")]
    pub open: Option<PathBuf>,

    /// URL of the canvas expansion service.
    #[arg(long, env = "GENESIS_EXPAND_ENDPOINT", value_name = "URL")]
    pub expand_endpoint: Option<String>,

    /// JSON stroke script to replay (headless mode).
    #[arg(long, value_name = "STROKES.json")]
    pub strokes: Option<PathBuf>,

    /// Output file.  Format is inferred from the extension, defaulting to PNG.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// JPEG quality (1–100).
    #[arg(short, long, default_value_t = 90, value_name = "1-100",
          value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Print timing information and echo the log to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when the real process arguments ask for headless output.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--output" || a == "-o" || a.starts_with("--output="))
    }

    pub fn config(&self) -> SurfaceConfig {
        SurfaceConfig::new(self.width, self.height)
    }
}

// ============================================================================
// Stroke scripts
// ============================================================================

/// A replayable drawing, e.g.
/// `{"background":"#fffbe6","strokes":[{"tool":"brush","color":"#c00","size":8,"points":[[10,10],[90,40]]}]}`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct StrokeScript {
    /// Fill colour for a blank canvas; ignored when an image is opened.
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub strokes: Vec<ScriptStroke>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ScriptStroke {
    #[serde(default)]
    pub tool: Tool,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_size")]
    pub size: u32,
    pub points: Vec<[f32; 2]>,
}

fn default_color() -> String {
    ToolSettings::default().color
}

fn default_size() -> u32 {
    ToolSettings::default().size
}

impl ScriptStroke {
    fn settings(&self) -> ToolSettings {
        ToolSettings {
            tool: self.tool,
            color: self.color.clone(),
            size: self.size,
        }
    }

    fn path(&self) -> Vec<SurfacePoint> {
        self.points
            .iter()
            .map(|[x, y]| SurfacePoint::new(*x, *y))
            .collect()
    }
}

pub fn parse_stroke_script(source: &str) -> Result<StrokeScript, String> {
    serde_json::from_str(source).map_err(|e| format!("invalid stroke script: {}", e))
}

// ============================================================================
// Headless rendering
// ============================================================================

/// Render onto a fresh surface and return the encoded result as a blob URI.
pub fn render_headless(
    config: SurfaceConfig,
    initial_image: Option<String>,
    script: &StrokeScript,
    format: ExportFormat,
    quality: f32,
) -> Result<String, String> {
    if !config.is_valid() {
        return Err(format!(
            "invalid canvas size {}×{}",
            config.width, config.height
        ));
    }
    let opened = initial_image.is_some();
    let mut surface = DrawingSurface::new(SurfaceProps {
        config,
        settings: ToolSettings::default(),
        initial_image,
    });
    surface.mount();
    if let Some(Err(e)) = surface.wait_for_loads() {
        return Err(e.to_string());
    }
    if !opened && let Some(bg) = &script.background {
        surface.handle().clear(Some(bg.as_str()));
    }

    for stroke in &script.strokes {
        let mut props = surface.props().clone();
        props.settings = stroke.settings();
        surface.set_props(props);
        surface.stroke_path(&stroke.path());
    }

    let uri = surface.handle().get_current_image(format, quality);
    if uri.is_empty() {
        return Err("canvas produced no image data".to_string());
    }
    Ok(uri)
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run headless mode and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    let Some(output) = args.output.clone() else {
        eprintln!("error: --output is required in headless mode.");
        return ExitCode::FAILURE;
    };
    if args.verbose {
        crate::logger::set_echo(true);
    }
    let start = Instant::now();
    match run_one(&args, &output) {
        Ok(()) => {
            if args.verbose {
                println!(
                    "→ {} ({:.0}ms)",
                    output.display(),
                    start.elapsed().as_secs_f64() * 1000.0
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_one(args: &CliArgs, output: &Path) -> Result<(), String> {
    let initial_image = match &args.open {
        Some(path) => Some(
            file_to_data_uri(path)
                .map_err(|e| format!("could not read '{}': {}", path.display(), e))?,
        ),
        None => None,
    };
    let script = match &args.strokes {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
            parse_stroke_script(&source)?
        }
        None => StrokeScript::default(),
    };
    let format = ExportFormat::from_path(output).unwrap_or_default();
    let uri = render_headless(
        args.config(),
        initial_image,
        &script,
        format,
        args.quality as f32 / 100.0,
    )?;
    write_data_uri(&uri, output)
}
