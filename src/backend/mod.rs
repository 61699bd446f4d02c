mod aur;
mod flatpak;
mod pacman;

#[cfg(test)]
pub(crate) mod testing;

pub use aur::AurHelper;
pub use flatpak::Flatpak;
pub use pacman::Pacman;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cmd::{RunOptions, Runner};
use crate::error::Result;
use crate::manifest::Settings;
use crate::paths::SUDO;
use crate::util::Privilege;

/// The package ecosystems a request can be satisfied from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Official repositories through pacman
    PrimaryRepo,
    /// AUR through a helper such as yay
    CommunityHelper,
    /// Flatpak applications from a remote such as Flathub
    SandboxStore,
}

impl BackendKind {
    /// Native backends are addressed by package name and queried before install.
    /// The sandbox store is addressed by application id and installed directly.
    pub fn is_native(&self) -> bool {
        matches!(self, Self::PrimaryRepo | Self::CommunityHelper)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PrimaryRepo => "primary repository",
            Self::CommunityHelper => "community helper",
            Self::SandboxStore => "sandbox store",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Result of one install call against one backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallStatus {
    Installed,
    Failed(String),
}

impl InstallStatus {
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed)
    }
}

/// Uniform capability over one package ecosystem
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Tool name (e.g., "pacman", "yay", "flatpak")
    fn name(&self) -> &str;

    /// Whether the tool is executable on this host
    fn is_present(&self) -> bool;

    /// Read-only lookup. Any failure of the query counts as "not available".
    fn query_available(&self, id: &str) -> Result<bool>;

    /// Non-interactive install. Failures are reported, never raised.
    fn install(&self, id: &str) -> Result<InstallStatus>;

    /// Refresh the system and install in one step
    fn upgrade_install(&self, id: &str) -> Result<InstallStatus> {
        self.install(id)
    }

    /// Make this backend's tool present, using the primary backend if needed
    fn provision(&self, primary: &dyn Backend) -> Result<InstallStatus> {
        let _ = primary;
        Ok(InstallStatus::Failed(format!(
            "{} cannot be provisioned automatically",
            self.name()
        )))
    }

    /// One-time setup once the tool is present
    fn prepare(&self) -> Result<InstallStatus> {
        Ok(InstallStatus::Installed)
    }
}

/// Per-invocation limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub query: Duration,
    pub install: Duration,
}

impl From<&Settings> for Timeouts {
    fn from(settings: &Settings) -> Self {
        Self {
            query: settings.query_timeout(),
            install: settings.install_timeout(),
        }
    }
}

/// Build the backends in priority order: pacman, AUR helper, flatpak
pub fn default_chain(
    runner: Arc<dyn Runner>,
    settings: &Settings,
    privilege: Privilege,
) -> Vec<Box<dyn Backend>> {
    let timeouts = Timeouts::from(settings);

    vec![
        Box::new(Pacman::new(Arc::clone(&runner), privilege, timeouts)),
        Box::new(AurHelper::new(
            Arc::clone(&runner),
            settings.helper.clone(),
            timeouts,
        )),
        Box::new(Flatpak::new(
            runner,
            settings.remote.clone(),
            settings.remote_url.clone(),
            timeouts,
        )),
    ]
}

/// Run a read-only query; anything but a clean exit is a miss
fn probe(runner: &dyn Runner, program: &str, args: &[String], timeout: Duration) -> Result<bool> {
    let exit = runner.run(program, args, &RunOptions::quiet(timeout))?;

    if !exit.is_success() {
        tracing::debug!(cause = %exit.cause(program), "query missed");
    }

    Ok(exit.is_success())
}

/// Run a mutating command and map its exit to an [`InstallStatus`]
fn execute(
    runner: &dyn Runner,
    program: &str,
    args: &[String],
    opts: &RunOptions,
) -> Result<InstallStatus> {
    let exit = runner.run(program, args, opts)?;

    // Name the elevated tool, not sudo, in the cause
    let label = match args.first() {
        Some(tool) if program == SUDO => tool.as_str(),
        _ => program,
    };

    if exit.is_success() {
        Ok(InstallStatus::Installed)
    } else {
        Ok(InstallStatus::Failed(exit.cause(label)))
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
