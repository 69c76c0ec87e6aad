//! wintts - Windows SAPI speech synthesis supervisor
//!
//! Speaks text through the Windows System.Speech API by spawning a
//! PowerShell process per utterance. Works from native Windows consoles
//! and from WSL via interop. At most one synthesis process is alive at
//! any time; a new request pre-empts the previous one.

pub mod command;
pub mod config;
pub mod error;
pub mod platform;
pub mod supervisor;
pub mod voice;

pub use error::{Result, WinttsError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "wintts";
