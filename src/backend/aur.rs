use std::sync::Arc;

use super::{execute, probe, strings, Backend, BackendKind, InstallStatus, Timeouts};
use crate::cmd::{RunOptions, Runner};
use crate::error::Result;
use crate::paths::AUR_GIT_BASE;

/// Packages makepkg needs to build the helper from the AUR
const BUILD_DEPS: &[&str] = &["git", "base-devel"];

/// AUR helper (yay, paru, ...). Escalates through sudo on its own.
pub struct AurHelper {
    runner: Arc<dyn Runner>,
    helper: String,
    timeouts: Timeouts,
}

impl AurHelper {
    pub fn new(runner: Arc<dyn Runner>, helper: impl Into<String>, timeouts: Timeouts) -> Self {
        Self {
            runner,
            helper: helper.into(),
            timeouts,
        }
    }

    /// Clone `<helper>-bin` from the AUR and build it with makepkg
    fn build_from_aur(&self, primary: &dyn Backend) -> Result<InstallStatus> {
        for dep in BUILD_DEPS {
            if let InstallStatus::Failed(cause) = primary.install(dep)? {
                return Ok(InstallStatus::Failed(format!(
                    "could not install build dependency {}: {}",
                    dep, cause
                )));
            }
        }

        let workdir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                return Ok(InstallStatus::Failed(format!(
                    "could not create build directory: {}",
                    e
                )))
            }
        };

        let package = format!("{}-bin", self.helper);
        let url = format!("{}/{}.git", AUR_GIT_BASE, package);
        let checkout = workdir.path().join(&package);
        let opts = RunOptions::echoed(self.timeouts.install);

        let cloned = execute(
            self.runner.as_ref(),
            "git",
            &[
                "clone".to_string(),
                "--depth".to_string(),
                "1".to_string(),
                url,
                checkout.to_string_lossy().to_string(),
            ],
            &opts,
        )?;
        if !cloned.is_installed() {
            return Ok(cloned);
        }

        execute(
            self.runner.as_ref(),
            "makepkg",
            &strings(&["-si", "--noconfirm"]),
            &opts.in_dir(&checkout),
        )
    }
}

impl Backend for AurHelper {
    fn kind(&self) -> BackendKind {
        BackendKind::CommunityHelper
    }

    fn name(&self) -> &str {
        &self.helper
    }

    fn is_present(&self) -> bool {
        which::which(&self.helper).is_ok()
    }

    fn query_available(&self, id: &str) -> Result<bool> {
        probe(
            self.runner.as_ref(),
            &self.helper,
            &strings(&["-Si", id]),
            self.timeouts.query,
        )
    }

    fn install(&self, id: &str) -> Result<InstallStatus> {
        execute(
            self.runner.as_ref(),
            &self.helper,
            &strings(&["-S", "--needed", "--noconfirm", id]),
            &RunOptions::echoed(self.timeouts.install),
        )
    }

    /// Prefer a repository build of the helper (EndeavourOS, CachyOS and
    /// others ship one), otherwise build it from the AUR.
    fn provision(&self, primary: &dyn Backend) -> Result<InstallStatus> {
        if primary.query_available(&self.helper)? {
            tracing::info!(helper = %self.helper, "installing helper from {}", primary.name());
            return primary.install(&self.helper);
        }

        tracing::info!(helper = %self.helper, "building helper from the AUR");
        self.build_from_aur(primary)
    }
}
