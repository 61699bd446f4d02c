/// Primary repository tool
pub const PACMAN: &str = "pacman";

/// Privilege escalation wrapper for pacman when not running as root
pub const SUDO: &str = "sudo";

/// Default AUR helper binary and package
pub const DEFAULT_HELPER: &str = "yay";

/// Base URL for cloning AUR package repositories
pub const AUR_GIT_BASE: &str = "https://aur.archlinux.org";

/// Sandboxed application store tool
pub const FLATPAK: &str = "flatpak";

/// Default flatpak remote name
pub const DEFAULT_REMOTE: &str = "flathub";

/// Default flatpak remote definition
pub const DEFAULT_REMOTE_URL: &str = "https://flathub.org/repo/flathub.flatpakrepo";
