#[cfg(windows)]
use comfy_table::presets::UTF8_FULL;
#[cfg(windows)]
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

#[cfg(windows)]
pub fn execute() {
    let mut processes = match spotter_windows::process::running_processes() {
        Ok(processes) => processes,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    processes.sort_by_key(|p| p.exe_name.to_ascii_lowercase());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("PID").set_alignment(CellAlignment::Right),
            Cell::new("Executable"),
            Cell::new("Main window"),
        ]);

    for process in &processes {
        let title = spotter_windows::enumerate::find_main_window(process.pid)
            .and_then(|w| w.title().ok())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(process.pid).set_alignment(CellAlignment::Right),
            Cell::new(&process.exe_name),
            Cell::new(title),
        ]);
    }

    println!("{table}");
    println!("\n{} processes found", processes.len());
}

#[cfg(not(windows))]
pub fn execute() {
    eprintln!("Error: process inspection is only supported on Windows.");
    std::process::exit(1);
}
