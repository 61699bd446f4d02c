//! Fallback-chain resolution of a single registry entry.
//!
//! Native backends (pacman, then the AUR helper) are queried by package
//! name and installed from on a hit. The sandbox store is installed from
//! directly by application id. The walk stops at the first successful
//! install. Entries marked `force_sandbox` only ever touch the sandbox store.

use std::fmt;

use crate::backend::{Backend, BackendKind, InstallStatus};
use crate::bootstrap::Availability;
use crate::error::Result;
use crate::manifest::PackageRequest;

const NO_PATH: &str = "no installation path";
const NO_IDENTIFIER: &str = "no identifier provided";
const NO_IDENTIFIER_EXHAUSTED: &str = "no identifier and no prior backend succeeded";

/// Terminal result for one registry entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed { via: BackendKind },
    Skipped { reason: String },
    Failed { via: BackendKind, cause: String },
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installed { via } => write!(f, "installed via {}", via),
            Self::Skipped { reason } => write!(f, "skipped: {}", reason),
            Self::Failed { via, cause } => write!(f, "failed via {}: {}", via, cause),
        }
    }
}

/// What happened on the way down the chain
#[derive(Debug, Default)]
struct Trail {
    /// A backend was left out because bootstrap disabled it
    disabled: bool,
    /// The sandbox store was reached without an application id
    missing_id: Option<BackendKind>,
    last_failure: Option<(BackendKind, String)>,
}

impl Trail {
    fn conclude(self) -> InstallOutcome {
        match (self.missing_id, self.last_failure) {
            (Some(_), None) if self.disabled => InstallOutcome::Skipped {
                reason: NO_PATH.to_string(),
            },
            (Some(via), None) => InstallOutcome::Failed {
                via,
                cause: NO_IDENTIFIER_EXHAUSTED.to_string(),
            },
            (Some(via), Some((_, last))) => InstallOutcome::Failed {
                via,
                cause: format!("{} (last failure: {})", NO_IDENTIFIER_EXHAUSTED, last),
            },
            (None, Some((via, cause))) => InstallOutcome::Failed { via, cause },
            (None, None) => InstallOutcome::Skipped {
                reason: NO_PATH.to_string(),
            },
        }
    }
}

/// Walks the backend chain for one request at a time
pub struct Resolver<'a> {
    chain: &'a [Box<dyn Backend>],
    availability: Availability,
    dry_run: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(chain: &'a [Box<dyn Backend>], availability: Availability) -> Self {
        Self {
            chain,
            availability,
            dry_run: false,
        }
    }

    /// Query as usual but report installs instead of running them
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Resolve one request. Only an interrupt escapes as an error.
    pub fn resolve(&self, request: &PackageRequest) -> Result<InstallOutcome> {
        if request.force_sandbox {
            return self.resolve_forced(request);
        }

        let mut trail = Trail::default();

        for backend in self.chain {
            let kind = backend.kind();

            if !self.availability.allows(kind) {
                tracing::debug!(package = %request.name, backend = backend.name(), "backend disabled for this run");
                trail.disabled = true;
                continue;
            }

            let id = if kind.is_native() {
                request.name.as_str()
            } else {
                match request.sandbox_id() {
                    Some(id) => id,
                    None => {
                        tracing::debug!(package = %request.name, backend = backend.name(), "no identifier for backend");
                        trail.missing_id = Some(kind);
                        continue;
                    }
                }
            };

            if kind.is_native() && !backend.query_available(id)? {
                tracing::debug!(package = %request.name, backend = backend.name(), "not available");
                continue;
            }

            match self.attempt(backend.as_ref(), id)? {
                InstallStatus::Installed => return Ok(InstallOutcome::Installed { via: kind }),
                InstallStatus::Failed(cause) => {
                    tracing::warn!(package = %request.name, backend = backend.name(), %cause, "install failed, trying next backend");
                    trail.last_failure = Some((kind, cause));
                }
            }
        }

        Ok(trail.conclude())
    }

    /// Sandbox-only entries never fall back to another backend
    fn resolve_forced(&self, request: &PackageRequest) -> Result<InstallOutcome> {
        let via = BackendKind::SandboxStore;

        let Some(id) = request.sandbox_id() else {
            return Ok(InstallOutcome::Failed {
                via,
                cause: NO_IDENTIFIER.to_string(),
            });
        };

        let store = match self.chain.iter().find(|b| b.kind() == via) {
            Some(store) if self.availability.allows(via) => store,
            Some(store) => {
                return Ok(InstallOutcome::Failed {
                    via,
                    cause: format!("{} is unavailable", store.name()),
                })
            }
            None => {
                return Ok(InstallOutcome::Failed {
                    via,
                    cause: "no sandbox store configured".to_string(),
                })
            }
        };

        match self.attempt(store.as_ref(), id)? {
            InstallStatus::Installed => Ok(InstallOutcome::Installed { via }),
            InstallStatus::Failed(cause) => {
                tracing::warn!(package = %request.name, backend = store.name(), %cause, "forced install failed");
                Ok(InstallOutcome::Failed { via, cause })
            }
        }
    }

    fn attempt(&self, backend: &dyn Backend, id: &str) -> Result<InstallStatus> {
        if self.dry_run {
            tracing::info!(backend = backend.name(), id, "dry run: would install");
            return Ok(InstallStatus::Installed);
        }

        backend.install(id)
    }
}
