//! Platform detection and interpreter discovery

use crate::{Result, WinttsError};
use log::debug;
use std::fs;
use std::process::{Command, Stdio};

/// Detect if running in WSL (Windows Subsystem for Linux)
///
/// Checks for WSL-specific indicators in /proc/version and environment variables.
pub fn is_wsl() -> bool {
    // Check for WSL-specific indicators in /proc/version
    if let Ok(contents) = fs::read_to_string("/proc/version") {
        let lower = contents.to_lowercase();
        if lower.contains("microsoft") || lower.contains("wsl") {
            return true;
        }
    }

    // Check for WSL environment variable
    std::env::var("WSL_DISTRO_NAME").is_ok()
}

/// Find a working PowerShell executable
///
/// Probes PATH first, then the WSL interop location, by running a
/// trivial version query. Errors with an actionable message when no
/// candidate responds.
pub fn find_powershell() -> Result<String> {
    let paths = vec![
        "powershell.exe",
        "/mnt/c/Windows/System32/WindowsPowerShell/v1.0/powershell.exe",
    ];

    for path in paths {
        if let Ok(status) = Command::new(path)
            .arg("-NoProfile")
            .arg("-Command")
            .arg("$PSVersionTable.PSVersion")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            if status.success() {
                debug!("Found PowerShell at: {}", path);
                return Ok(path.to_string());
            }
        }
    }

    Err(WinttsError::Spawn(
        "PowerShell not found. On WSL, make sure Windows interop is enabled.".to_string(),
    ))
}
