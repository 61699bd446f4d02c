use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Conditions that escape a single package and stop the whole run.
///
/// Everything else (availability misses, failed installs, bootstrap
/// problems) is absorbed into a per-package outcome.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{tool} not found in PATH; this tool requires an Arch-based system")]
    MissingPrimary { tool: String },

    #[error("interrupted while running {program}")]
    Interrupted { program: String },
}

impl Error {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::MissingPrimary { .. } => 1,
            Error::Interrupted { .. } => 130,
        }
    }
}
