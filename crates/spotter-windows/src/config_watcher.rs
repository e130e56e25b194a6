//! Watches `config.toml` for changes and sends validated reloads.
//!
//! Uses `FindFirstChangeNotificationW` to monitor the config directory
//! for writes and renames. When a change is detected the file's mtime is
//! compared with the last seen one and only configs that parse are sent.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::time::SystemTime;

use spotter_core::RuntimeMsg;
use spotter_core::config;
use tracing::{info, warn};

use windows::Win32::Foundation::WAIT_OBJECT_0;
use windows::Win32::Storage::FileSystem::{
    FILE_NOTIFY_CHANGE_FILE_NAME, FILE_NOTIFY_CHANGE_LAST_WRITE, FindCloseChangeNotification,
    FindFirstChangeNotificationW, FindNextChangeNotification,
};
use windows::Win32::System::Threading::WaitForSingleObject;
use windows::core::HSTRING;

/// Timeout between stop-flag checks when no changes occur (ms).
const WAIT_TIMEOUT_MS: u32 = 5000;

/// Runs the watcher loop. Blocks until the stop flag is set or the
/// receiver is dropped.
pub fn watch(tx: Sender<RuntimeMsg>, stop: Arc<AtomicBool>) {
    let (Some(dir), Some(path)) = (config::config_dir(), config::config_path()) else {
        info!("config dir not found, watcher exiting");
        return;
    };
    if !dir.is_dir() {
        info!("{} does not exist, watcher exiting", dir.display());
        return;
    }

    let mut last_mtime = mtime(&path);

    let dir_str = HSTRING::from(dir.as_os_str());
    let flags = FILE_NOTIFY_CHANGE_LAST_WRITE | FILE_NOTIFY_CHANGE_FILE_NAME;

    let Ok(handle) = (unsafe { FindFirstChangeNotificationW(&dir_str, false, flags) }) else {
        warn!("FindFirstChangeNotificationW failed, watcher exiting");
        return;
    };

    while !stop.load(Ordering::Relaxed) {
        let result = unsafe { WaitForSingleObject(handle, WAIT_TIMEOUT_MS) };
        if stop.load(Ordering::Relaxed) {
            break;
        }
        if result != WAIT_OBJECT_0 {
            continue;
        }

        let current = mtime(&path);
        if current != last_mtime {
            last_mtime = current;
            match config::try_load_from(&path) {
                Ok(cfg) => {
                    info!("config.toml changed, reloading");
                    if tx.send(RuntimeMsg::Reload(Box::new(cfg))).is_err() {
                        break;
                    }
                }
                Err(e) => warn!("config.toml invalid, skipping: {e}"),
            }
        }

        let _ = unsafe { FindNextChangeNotification(handle) };
    }

    let _ = unsafe { FindCloseChangeNotification(handle) };
}

fn mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().ok().and_then(|m| m.modified().ok())
}
