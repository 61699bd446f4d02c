//! One-time host preparation before any package is resolved.
//!
//! pacman must exist; without it nothing can run. The AUR helper and
//! flatpak are provisioned when missing, and a failure there only disables
//! that backend for the rest of the run.

use colored::Colorize;

use crate::backend::{Backend, BackendKind, InstallStatus};
use crate::error::{Error, Result};
use crate::paths::PACMAN;
use crate::util::Privilege;

/// Which optional backends may be used for this run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    pub community_helper: bool,
    pub sandbox_store: bool,
}

impl Availability {
    pub fn all() -> Self {
        Self {
            community_helper: true,
            sandbox_store: true,
        }
    }

    /// The primary repository is always allowed; bootstrap fails without it.
    pub fn allows(&self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::PrimaryRepo => true,
            BackendKind::CommunityHelper => self.community_helper,
            BackendKind::SandboxStore => self.sandbox_store,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapOptions {
    /// Only check presence, never provision
    pub dry_run: bool,
    pub privilege: Privilege,
}

fn find(chain: &[Box<dyn Backend>], kind: BackendKind) -> Option<&dyn Backend> {
    chain.iter().find(|b| b.kind() == kind).map(|b| b.as_ref())
}

/// Verify and provision the backends, returning what this run may use
pub fn run(chain: &[Box<dyn Backend>], opts: &BootstrapOptions) -> Result<Availability> {
    let Some(primary) = find(chain, BackendKind::PrimaryRepo) else {
        return Err(Error::MissingPrimary {
            tool: PACMAN.to_string(),
        });
    };
    if !primary.is_present() {
        return Err(Error::MissingPrimary {
            tool: primary.name().to_string(),
        });
    }

    let community_helper = match find(chain, BackendKind::CommunityHelper) {
        Some(helper) if !opts.privilege.allows_aur_helper() => {
            tracing::warn!(
                helper = helper.name(),
                "running as root; AUR helpers refuse to build as root, AUR disabled for this run"
            );
            false
        }
        Some(helper) => ensure(helper, primary, opts.dry_run)?,
        None => false,
    };

    let sandbox_store = match find(chain, BackendKind::SandboxStore) {
        Some(store) => ensure(store, primary, opts.dry_run)?,
        None => false,
    };

    let availability = Availability {
        community_helper,
        sandbox_store,
    };
    tracing::info!(community_helper, sandbox_store, "bootstrap complete");

    Ok(availability)
}

/// Make one optional backend usable. `Ok(false)` disables it.
fn ensure(backend: &dyn Backend, primary: &dyn Backend, dry_run: bool) -> Result<bool> {
    let name = backend.name();

    if backend.is_present() {
        tracing::debug!(backend = name, "already installed");
    } else if dry_run {
        tracing::warn!(backend = name, "not installed; dry run will not provision it");
        return Ok(false);
    } else {
        println!("{} {} is not installed, setting it up...", "::".blue().bold(), name);

        match backend.provision(primary)? {
            InstallStatus::Installed if backend.is_present() => {
                println!("{} Installed {}", "✓".green(), name);
            }
            InstallStatus::Installed => {
                tracing::warn!(backend = name, "still not found after provisioning; disabled for this run");
                return Ok(false);
            }
            InstallStatus::Failed(cause) => {
                tracing::warn!(backend = name, %cause, "bootstrap failed; disabled for this run");
                return Ok(false);
            }
        }
    }

    if dry_run {
        return Ok(true);
    }

    match backend.prepare()? {
        InstallStatus::Installed => Ok(true),
        InstallStatus::Failed(cause) => {
            tracing::warn!(backend = name, %cause, "setup failed; disabled for this run");
            Ok(false)
        }
    }
}
