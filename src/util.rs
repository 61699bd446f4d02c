/// Privilege level of the running process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Root,
    User,
}

impl Privilege {
    /// Whether system package changes must go through sudo
    pub fn needs_sudo(&self) -> bool {
        matches!(self, Privilege::User)
    }

    /// AUR helpers refuse to build packages as root
    pub fn allows_aur_helper(&self) -> bool {
        matches!(self, Privilege::User)
    }

    /// Get a human-readable name for this privilege level
    pub fn name(&self) -> &'static str {
        match self {
            Privilege::Root => "root",
            Privilege::User => "user",
        }
    }
}

/// Detect the privilege level from the effective uid
pub fn detect_privilege() -> Privilege {
    if nix::unistd::Uid::effective().is_root() {
        Privilege::Root
    } else {
        Privilege::User
    }
}
