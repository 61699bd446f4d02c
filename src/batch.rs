use colored::Colorize;

use crate::backend::{Backend, BackendKind};
use crate::bootstrap::{self, Availability, BootstrapOptions};
use crate::error::Result;
use crate::manifest::PackageRequest;
use crate::resolver::{InstallOutcome, Resolver};
use crate::util::Privilege;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub dry_run: bool,
    pub privilege: Privilege,
}

/// Counts per outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub installed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Every request with its outcome, in registry order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub availability: Availability,
    pub outcomes: Vec<(String, InstallOutcome)>,
}

impl Report {
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for (_, outcome) in &self.outcomes {
            match outcome {
                InstallOutcome::Installed { .. } => summary.installed += 1,
                InstallOutcome::Skipped { .. } => summary.skipped += 1,
                InstallOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &BackendKind, &str)> {
        self.outcomes.iter().filter_map(|(name, outcome)| match outcome {
            InstallOutcome::Failed { via, cause } => Some((name.as_str(), via, cause.as_str())),
            _ => None,
        })
    }
}

/// Bootstrap once, then resolve every request in order.
///
/// Per-package failures land in the report. Only a missing pacman or a
/// user interrupt stops the run.
pub fn run(
    chain: &[Box<dyn Backend>],
    requests: &[PackageRequest],
    opts: &Options,
) -> Result<Report> {
    let availability = bootstrap::run(
        chain,
        &BootstrapOptions {
            dry_run: opts.dry_run,
            privilege: opts.privilege,
        },
    )?;

    let resolver = Resolver::new(chain, availability).dry_run(opts.dry_run);
    let total = requests.len();
    let mut outcomes = Vec::with_capacity(total);

    for (i, request) in requests.iter().enumerate() {
        println!("\n{} {}", format!("[{}/{}]", i + 1, total).dimmed(), request.name.bold());

        let outcome = resolver.resolve(request)?;
        println!("{}", status_line(chain, &request.name, &outcome));

        outcomes.push((request.name.clone(), outcome));
    }

    Ok(Report {
        availability,
        outcomes,
    })
}

/// Tool name for a backend kind, falling back to the kind itself
fn tool_name(chain: &[Box<dyn Backend>], kind: BackendKind) -> String {
    chain
        .iter()
        .find(|b| b.kind() == kind)
        .map(|b| b.name().to_string())
        .unwrap_or_else(|| kind.to_string())
}

fn status_line(chain: &[Box<dyn Backend>], name: &str, outcome: &InstallOutcome) -> String {
    match outcome {
        InstallOutcome::Installed { via } => {
            format!("{} {} via {}", "✓".green(), name, tool_name(chain, *via))
        }
        InstallOutcome::Skipped { reason } => {
            format!("{} {} skipped: {}", "-".yellow(), name, reason)
        }
        InstallOutcome::Failed { via, cause } => format!(
            "{} {} failed via {}: {}",
            "✗".red(),
            name,
            tool_name(chain, *via),
            cause
        ),
    }
}

pub fn print_summary(report: &Report, dry_run: bool) {
    let summary = report.summary();
    let title = if dry_run { "Dry run complete" } else { "Install complete" };

    println!("\n=== {} ===\n", title);
    println!(
        "{} installed, {} skipped, {} failed",
        summary.installed.to_string().green(),
        summary.skipped.to_string().yellow(),
        summary.failed.to_string().red()
    );

    if summary.failed > 0 {
        println!("\nFailed:");
        for (name, via, cause) in report.failures() {
            println!("  {} {} ({}): {}", "✗".red(), name, via, cause);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{FakeBackend, Journal};
    use crate::error::Error;

    fn user() -> Options {
        Options {
            dry_run: false,
            privilege: Privilege::User,
        }
    }

    fn registry() -> Vec<PackageRequest> {
        vec![
            PackageRequest::new("brave-bin").with_sandbox("com.brave.Browser"),
            PackageRequest::new("discord")
                .with_sandbox("com.discordapp.Discord")
                .forced(),
            PackageRequest::new("obscure-pkg"),
            PackageRequest::new("gimp").with_sandbox("org.gimp.GIMP"),
        ]
    }

    #[test]
    fn every_request_gets_one_outcome() {
        let journal = Journal::default();
        let chain = vec![
            FakeBackend::primary(&journal).has("brave-bin").boxed(),
            FakeBackend::helper(&journal).boxed(),
            FakeBackend::store(&journal).fails("org.gimp.GIMP").boxed(),
        ];

        let report = run(&chain, &registry(), &user()).unwrap();

        let names: Vec<_> = report.outcomes.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["brave-bin", "discord", "obscure-pkg", "gimp"]);
        assert_eq!(
            report.summary(),
            Summary {
                installed: 2,
                skipped: 0,
                failed: 2
            }
        );
        let failed: Vec<_> = report.failures().map(|(name, _, _)| name).collect();
        assert_eq!(failed, vec!["obscure-pkg", "gimp"]);
    }

    #[test]
    fn failures_do_not_stop_later_requests() {
        let journal = Journal::default();
        let chain = vec![
            FakeBackend::primary(&journal)
                .has("brave-bin")
                .fails("brave-bin")
                .boxed(),
            FakeBackend::helper(&journal).boxed(),
            FakeBackend::store(&journal)
                .fails("com.brave.Browser")
                .boxed(),
        ];
        let requests = vec![
            PackageRequest::new("brave-bin").with_sandbox("com.brave.Browser"),
            PackageRequest::new("vlc").with_sandbox("org.videolan.VLC"),
        ];

        let report = run(&chain, &requests, &user()).unwrap();

        assert!(matches!(report.outcomes[0].1, InstallOutcome::Failed { .. }));
        assert_eq!(
            report.outcomes[1].1,
            InstallOutcome::Installed {
                via: BackendKind::SandboxStore
            }
        );
    }

    #[test]
    fn missing_primary_aborts_before_any_request() {
        let journal = Journal::default();
        let chain = vec![
            FakeBackend::primary(&journal).absent().boxed(),
            FakeBackend::helper(&journal).boxed(),
            FakeBackend::store(&journal).boxed(),
        ];

        let err = run(&chain, &registry(), &user()).unwrap_err();

        assert!(matches!(err, Error::MissingPrimary { .. }));
        assert!(journal.events().is_empty());
    }

    #[test]
    fn interrupt_aborts_the_batch() {
        let journal = Journal::default();
        let chain = vec![
            FakeBackend::primary(&journal)
                .has("brave-bin")
                .interrupts("brave-bin")
                .boxed(),
            FakeBackend::helper(&journal).boxed(),
            FakeBackend::store(&journal).boxed(),
        ];

        let err = run(&chain, &registry(), &user()).unwrap_err();

        assert!(matches!(err, Error::Interrupted { .. }));
        assert!(!journal
            .events()
            .iter()
            .any(|e| e.contains("com.discordapp.Discord")));
    }

    #[test]
    fn root_run_skips_entries_without_a_path() {
        let journal = Journal::default();
        let chain = vec![
            FakeBackend::primary(&journal).boxed(),
            FakeBackend::helper(&journal).has("obscure-pkg").boxed(),
            FakeBackend::store(&journal).boxed(),
        ];
        let opts = Options {
            dry_run: false,
            privilege: Privilege::Root,
        };

        let report = run(&chain, &[PackageRequest::new("obscure-pkg")], &opts).unwrap();

        assert!(!report.availability.community_helper);
        assert_eq!(
            report.outcomes[0].1,
            InstallOutcome::Skipped {
                reason: "no installation path".into()
            }
        );
    }

    #[test]
    fn dry_run_changes_nothing() {
        let journal = Journal::default();
        let chain = vec![
            FakeBackend::primary(&journal).has("brave-bin").boxed(),
            FakeBackend::helper(&journal).absent().boxed(),
            FakeBackend::store(&journal).boxed(),
        ];
        let opts = Options {
            dry_run: true,
            privilege: Privilege::User,
        };

        let report = run(&chain, &registry(), &opts).unwrap();

        assert_eq!(report.outcomes.len(), 4);
        assert!(journal.installs().is_empty());
        assert!(!journal
            .events()
            .iter()
            .any(|e| e.contains("provision") || e.contains("prepare")));
    }

    #[test]
    fn status_lines_name_the_tool() {
        let journal = Journal::default();
        let chain = vec![
            FakeBackend::primary(&journal).boxed(),
            FakeBackend::store(&journal).boxed(),
        ];
        colored::control::set_override(false);

        let installed = status_line(
            &chain,
            "vlc",
            &InstallOutcome::Installed {
                via: BackendKind::PrimaryRepo,
            },
        );
        let failed = status_line(
            &chain,
            "zoom",
            &InstallOutcome::Failed {
                via: BackendKind::SandboxStore,
                cause: "flatpak exited with code 1".into(),
            },
        );
        let skipped = status_line(
            &chain,
            "timeshift",
            &InstallOutcome::Skipped {
                reason: "no installation path".into(),
            },
        );

        assert_eq!(installed, "✓ vlc via pacman");
        assert_eq!(failed, "✗ zoom failed via flatpak: flatpak exited with code 1");
        assert_eq!(skipped, "- timeshift skipped: no installation path");
        assert_eq!(tool_name(&chain, BackendKind::CommunityHelper), "community helper");
    }
}
