//! Install a curated desktop application set on Arch-based systems.
//!
//! Each registry entry is resolved through a fallback chain of package
//! ecosystems: pacman first, then an AUR helper, then flatpak.

pub mod backend;
pub mod batch;
pub mod bootstrap;
pub mod cmd;
pub mod error;
pub mod manifest;
pub mod paths;
pub mod resolver;
pub mod util;

pub use error::{Error, Result};
