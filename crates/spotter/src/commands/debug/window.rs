use std::path::PathBuf;

use clap::Args;

/// Arguments for the `debug window` subcommand.
#[derive(Args)]
pub struct WindowArgs {
    /// Executable name of the target process, e.g. "game.exe"
    name: String,
    /// Capture the full window instead of the client area
    #[arg(long)]
    full_window: bool,
    /// Capture one frame and save it to this path
    #[arg(long)]
    save: Option<PathBuf>,
}

#[cfg(windows)]
pub fn execute(args: &WindowArgs) {
    use spotter_core::{CaptureArea, FrameSource};
    use spotter_windows::Win32Backend;
    use spotter_windows::strategy::default_strategies;

    spotter_windows::dpi::enable_dpi_awareness();

    let mut source = FrameSource::new(Win32Backend, default_strategies());
    if args.full_window {
        source.set_capture_area(CaptureArea::Window);
    }

    if !source.set_target(&args.name) {
        eprintln!("Error: no capturable window found for '{}'.", args.name);
        std::process::exit(1);
    }
    if let Some(info) = source.describe() {
        println!("{info}");
    }

    let Some(path) = &args.save else {
        return;
    };
    let Some(frame) = source.capture() else {
        eprintln!("Error: capture failed (window minimized, hidden or too small?).");
        std::process::exit(1);
    };
    match frame.save(path) {
        Ok(()) => println!(
            "Saved {}x{} frame to {}",
            frame.width(),
            frame.height(),
            path.display()
        ),
        Err(e) => {
            eprintln!("Error: could not save {}: {e}", path.display());
            std::process::exit(1);
        }
    }
}

#[cfg(not(windows))]
pub fn execute(args: &WindowArgs) {
    let _ = (&args.name, args.full_window, &args.save);
    eprintln!("Error: window inspection is only supported on Windows.");
    std::process::exit(1);
}
