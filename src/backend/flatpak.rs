use std::sync::Arc;

use super::{execute, probe, strings, Backend, BackendKind, InstallStatus, Timeouts};
use crate::cmd::{RunOptions, Runner};
use crate::error::Result;
use crate::paths::FLATPAK;

/// Flatpak applications from a single remote. Runs unprivileged.
pub struct Flatpak {
    runner: Arc<dyn Runner>,
    remote: String,
    remote_url: String,
    timeouts: Timeouts,
}

impl Flatpak {
    pub fn new(
        runner: Arc<dyn Runner>,
        remote: impl Into<String>,
        remote_url: impl Into<String>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            runner,
            remote: remote.into(),
            remote_url: remote_url.into(),
            timeouts,
        }
    }

    /// Check whether the remote is already registered
    fn has_remote(&self) -> Result<bool> {
        let exit = self.runner.run(
            FLATPAK,
            &strings(&["remotes", "--columns=name"]),
            &RunOptions::quiet(self.timeouts.query),
        )?;

        Ok(exit.is_success() && exit.stdout.lines().any(|line| line.trim() == self.remote))
    }
}

impl Backend for Flatpak {
    fn kind(&self) -> BackendKind {
        BackendKind::SandboxStore
    }

    fn name(&self) -> &str {
        FLATPAK
    }

    fn is_present(&self) -> bool {
        which::which(FLATPAK).is_ok()
    }

    fn query_available(&self, id: &str) -> Result<bool> {
        probe(
            self.runner.as_ref(),
            FLATPAK,
            &strings(&["remote-info", &self.remote, id]),
            self.timeouts.query,
        )
    }

    fn install(&self, id: &str) -> Result<InstallStatus> {
        execute(
            self.runner.as_ref(),
            FLATPAK,
            &strings(&["install", "-y", "--noninteractive", &self.remote, id]),
            &RunOptions::echoed(self.timeouts.install),
        )
    }

    fn provision(&self, primary: &dyn Backend) -> Result<InstallStatus> {
        tracing::info!("installing flatpak with a full system update");
        primary.upgrade_install(FLATPAK)
    }

    fn prepare(&self) -> Result<InstallStatus> {
        if self.has_remote()? {
            tracing::debug!(remote = %self.remote, "flatpak remote already registered");
            return Ok(InstallStatus::Installed);
        }

        tracing::info!(remote = %self.remote, url = %self.remote_url, "registering flatpak remote");
        execute(
            self.runner.as_ref(),
            FLATPAK,
            &strings(&["remote-add", "--if-not-exists", &self.remote, &self.remote_url]),
            &RunOptions::echoed(self.timeouts.install),
        )
    }
}
