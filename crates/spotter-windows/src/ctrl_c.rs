//! Ctrl+C and console-close handling using `SetConsoleCtrlHandler`.

use std::sync::OnceLock;
use std::sync::mpsc::Sender;

use spotter_core::{Error, RuntimeMsg, WindowResult};

use windows::Win32::System::Console::{
    CTRL_BREAK_EVENT, CTRL_C_EVENT, CTRL_CLOSE_EVENT, SetConsoleCtrlHandler,
};

/// Written once by `set_handler`, read by the callback.
static SENDER: OnceLock<Sender<RuntimeMsg>> = OnceLock::new();

/// Registers a handler that sends [`RuntimeMsg::Stop`] on the channel.
pub fn set_handler(tx: Sender<RuntimeMsg>) -> WindowResult<()> {
    SENDER
        .set(tx)
        .map_err(|_| Error::Config("Ctrl+C handler already registered".into()))?;

    // SAFETY: `handler` is a plain extern fn that only reads SENDER.
    unsafe { SetConsoleCtrlHandler(Some(handler), true) }
        .map_err(|e| Error::platform("SetConsoleCtrlHandler", e))
}

unsafe extern "system" fn handler(ctrl_type: u32) -> windows::core::BOOL {
    if matches!(ctrl_type, CTRL_C_EVENT | CTRL_BREAK_EVENT | CTRL_CLOSE_EVENT)
        && let Some(tx) = SENDER.get()
    {
        let _ = tx.send(RuntimeMsg::Stop);
    }
    windows::core::BOOL(1)
}
