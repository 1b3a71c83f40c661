use clap::Parser;
use eframe::egui;

use genesis_canvas::app::GenesisApp;
use genesis_canvas::cli::{self, CliArgs};
use genesis_canvas::logger;

fn main() -> Result<(), eframe::Error> {
    let args = CliArgs::parse();

    // -- CLI / headless mode ---------------------------------------------
    if CliArgs::is_cli_mode() {
        let code = cli::run(args);
        std::process::exit(if code == std::process::ExitCode::SUCCESS {
            0
        } else {
            1
        });
    }

    // -- GUI mode -----------------------------------------------------

    // Initialize session log (overwrites previous session log)
    logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title("Genesis Canvas"),
        ..Default::default()
    };

    eframe::run_native(
        "Genesis Canvas",
        options,
        Box::new(move |cc| Box::new(GenesisApp::new(cc, args))),
    )
}
