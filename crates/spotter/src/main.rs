mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "spotter",
    version,
    about = "Watches a game window and fires an action when a template image appears"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the default configuration file
    Init,
    /// Watch the configured window in the foreground until Ctrl+C
    Run(commands::run::RunArgs),
    /// Match a template against a saved frame image
    Check(commands::check::CheckArgs),
    /// Debugging and inspection tools
    Debug {
        #[command(subcommand)]
        command: DebugCommands,
    },
}

#[derive(Subcommand)]
enum DebugCommands {
    /// List running processes
    Processes,
    /// Resolve and describe the main window of a process
    Window(commands::debug::window::WindowArgs),
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Run(args) => commands::run::execute(&args),
        Commands::Check(args) => commands::check::execute(&args),
        Commands::Debug { command } => match command {
            DebugCommands::Processes => commands::debug::processes::execute(),
            DebugCommands::Window(args) => commands::debug::window::execute(&args),
        },
    }
}
