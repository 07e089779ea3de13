use std::io::Write;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

#[cfg(target_os = "macos")]
const CHIME: Option<(&str, &str)> = Some(("afplay", "/System/Library/Sounds/Blow.aiff"));

#[cfg(target_os = "linux")]
const CHIME: Option<(&str, &str)> = Some((
    "paplay",
    "/usr/share/sounds/freedesktop/stereo/complete.oga",
));

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
const CHIME: Option<(&str, &str)> = None;

/// Play a short completion sound. Falls back to the terminal bell.
pub fn chime() {
    if let Some((program, sound)) = CHIME {
        match Command::new(program)
            .arg(sound)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => return,
            Ok(status) => debug!(program, %status, "Chime player exited unsuccessfully"),
            Err(e) => debug!(program, error = %e, "Chime player unavailable"),
        }
    }

    let mut stdout = std::io::stdout();
    if let Err(e) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
        warn!(error = %e, "Failed to ring terminal bell");
    }
}
