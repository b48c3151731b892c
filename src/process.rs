//! Process spawning helpers.
//!
//! Every ffmpeg/ffprobe invocation goes through one of these so the
//! Windows-only creation flags live in a single place: without
//! `CREATE_NO_WINDOW`, each spawn from a GUI host flashes a console
//! window.

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Platform flags for a blocking `std::process::Command`.
pub fn configure_std_command(cmd: &mut std::process::Command) {
    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}

/// Platform flags for a `tokio::process::Command`.
pub fn configure_tokio_command(cmd: &mut tokio::process::Command) {
    #[cfg(target_os = "windows")]
    {
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}
