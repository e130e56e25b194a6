use std::mem;

use spotter_core::{Error, ProcessId, WindowResult};

use windows::Win32::Foundation::{CloseHandle, HANDLE, STILL_ACTIVE};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Threading::{
    GetExitCodeProcess, OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION,
};

/// A running process from a Toolhelp snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: ProcessId,
    pub exe_name: String,
}

/// Checks whether a process with the given PID is still running.
///
/// Opens the process with minimal access rights and asks for its exit
/// code. A process that has exited but still has open handles reports a
/// real exit code instead of `STILL_ACTIVE`.
pub fn is_process_alive(pid: ProcessId) -> bool {
    // SAFETY: OpenProcess attempts to open an existing process.
    // PROCESS_QUERY_LIMITED_INFORMATION is the least-privilege access
    // right that still allows GetExitCodeProcess.
    let Ok(handle) = (unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }) else {
        return false;
    };

    let mut code = 0u32;
    // SAFETY: `handle` was just opened and is closed right after.
    let alive = unsafe { GetExitCodeProcess(handle, &mut code) }.is_ok()
        && code == STILL_ACTIVE.0 as u32;
    unsafe {
        let _ = CloseHandle(handle);
    }
    alive
}

/// Lists every running process.
pub fn running_processes() -> WindowResult<Vec<ProcessEntry>> {
    // SAFETY: the snapshot handle is owned by `Snapshot` and closed on drop.
    let snapshot = Snapshot(
        unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }
            .map_err(|e| Error::platform("CreateToolhelp32Snapshot", e))?,
    );

    let mut entry = PROCESSENTRY32W {
        dwSize: mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };
    let mut processes = Vec::new();

    // SAFETY: `entry.dwSize` is initialised as the API requires.
    let mut more = unsafe { Process32FirstW(snapshot.0, &mut entry) }.is_ok();
    while more {
        processes.push(ProcessEntry {
            pid: entry.th32ProcessID,
            exe_name: exe_name(&entry.szExeFile),
        });
        // SAFETY: same snapshot and entry as above.
        more = unsafe { Process32NextW(snapshot.0, &mut entry) }.is_ok();
    }

    Ok(processes)
}

/// Returns the PID of the first process whose executable name matches
/// `name` (case-insensitive).
pub fn find_process_id(name: &str) -> Option<ProcessId> {
    match running_processes() {
        Ok(processes) => processes
            .into_iter()
            .find(|p| p.exe_name.eq_ignore_ascii_case(name))
            .map(|p| p.pid),
        Err(e) => {
            tracing::warn!("could not enumerate processes: {e}");
            None
        }
    }
}

fn exe_name(raw: &[u16]) -> String {
    let len = raw.iter().position(|&c| c == 0).unwrap_or(raw.len());
    String::from_utf16_lossy(&raw[..len])
}

struct Snapshot(HANDLE);

impl Drop for Snapshot {
    fn drop(&mut self) {
        // SAFETY: the handle came from CreateToolhelp32Snapshot.
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}
