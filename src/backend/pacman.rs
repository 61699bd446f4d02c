use std::sync::Arc;

use super::{execute, probe, strings, Backend, BackendKind, InstallStatus, Timeouts};
use crate::cmd::{RunOptions, Runner};
use crate::error::Result;
use crate::paths::{PACMAN, SUDO};
use crate::util::Privilege;

/// Pacman package manager (Arch Linux, EndeavourOS, Manjaro, etc.)
pub struct Pacman {
    runner: Arc<dyn Runner>,
    privilege: Privilege,
    timeouts: Timeouts,
}

impl Pacman {
    pub fn new(runner: Arc<dyn Runner>, privilege: Privilege, timeouts: Timeouts) -> Self {
        Self {
            runner,
            privilege,
            timeouts,
        }
    }

    /// Prefix with sudo unless already root
    fn elevated(&self, args: &[&str]) -> (&'static str, Vec<String>) {
        if self.privilege.needs_sudo() {
            let mut full = vec![PACMAN.to_string()];
            full.extend(strings(args));
            (SUDO, full)
        } else {
            (PACMAN, strings(args))
        }
    }

    fn sync(&self, flags: &str, id: &str) -> Result<InstallStatus> {
        let (program, args) = self.elevated(&[flags, "--needed", "--noconfirm", id]);
        execute(
            self.runner.as_ref(),
            program,
            &args,
            &RunOptions::echoed(self.timeouts.install),
        )
    }
}

impl Backend for Pacman {
    fn kind(&self) -> BackendKind {
        BackendKind::PrimaryRepo
    }

    fn name(&self) -> &str {
        PACMAN
    }

    fn is_present(&self) -> bool {
        which::which(PACMAN).is_ok()
    }

    fn query_available(&self, id: &str) -> Result<bool> {
        probe(
            self.runner.as_ref(),
            PACMAN,
            &strings(&["-Si", id]),
            self.timeouts.query,
        )
    }

    fn install(&self, id: &str) -> Result<InstallStatus> {
        self.sync("-S", id)
    }

    fn upgrade_install(&self, id: &str) -> Result<InstallStatus> {
        self.sync("-Syu", id)
    }
}
