use clap::Args;

/// Arguments for the `run` subcommand.
#[derive(Args)]
pub struct RunArgs {
    /// Log triggers instead of running the configured command
    #[arg(long)]
    dry_run: bool,
    /// Enable debug logging for Spotter's own modules
    #[arg(short, long)]
    verbose: bool,
}

#[cfg(windows)]
pub fn execute(args: &RunArgs) {
    let options = spotter_windows::daemon::RunOptions {
        dry_run: args.dry_run,
        verbose: args.verbose,
    };
    if let Err(e) = spotter_windows::daemon::run(options) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[cfg(not(windows))]
pub fn execute(args: &RunArgs) {
    let _ = (args.dry_run, args.verbose);
    eprintln!("Error: window capture is only supported on Windows.");
    std::process::exit(1);
}
