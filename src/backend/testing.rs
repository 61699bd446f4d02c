//! Scripted runner and in-memory backends for unit tests.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{Backend, BackendKind, InstallStatus};
use crate::cmd::{Exit, RunOptions, Runner};
use crate::error::{Error, Result};

enum Reply {
    Exit(Exit),
    Interrupt,
}

/// Records every invocation and answers by command-line prefix.
/// Unmatched commands succeed.
#[derive(Default)]
pub(crate) struct ScriptedRunner {
    rules: Vec<(String, Reply)>,
    calls: Mutex<Vec<(String, Option<PathBuf>)>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, prefix: &str, exit: Exit) -> Self {
        self.rules.push((prefix.to_string(), Reply::Exit(exit)));
        self
    }

    pub fn interrupt_on(mut self, prefix: &str) -> Self {
        self.rules.push((prefix.to_string(), Reply::Interrupt));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(line, _)| line.clone())
            .collect()
    }

    pub fn dirs(&self) -> Vec<Option<PathBuf>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, dir)| dir.clone())
            .collect()
    }
}

impl Runner for ScriptedRunner {
    fn run(&self, program: &str, args: &[String], opts: &RunOptions) -> Result<Exit> {
        let line = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls
            .lock()
            .unwrap()
            .push((line.clone(), opts.cwd.clone()));

        match self.rules.iter().find(|(prefix, _)| line.starts_with(prefix)) {
            Some((_, Reply::Exit(exit))) => Ok(exit.clone()),
            Some((_, Reply::Interrupt)) => Err(Error::Interrupted {
                program: program.to_string(),
            }),
            None => Ok(Exit::success()),
        }
    }
}

/// Shared, ordered log of backend calls across several fakes
#[derive(Debug, Clone, Default)]
pub(crate) struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn record(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Events that mutate the system
    pub fn installs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.contains(" install ") || e.contains(" upgrade-install "))
            .collect()
    }
}

/// In-memory backend with a fixed catalogue
pub(crate) struct FakeBackend {
    kind: BackendKind,
    name: String,
    present: AtomicBool,
    available: HashSet<String>,
    failing: HashSet<String>,
    interrupting: HashSet<String>,
    provision: InstallStatus,
    prepare: InstallStatus,
    journal: Journal,
}

impl FakeBackend {
    pub fn new(kind: BackendKind, name: &str, journal: &Journal) -> Self {
        Self {
            kind,
            name: name.to_string(),
            present: AtomicBool::new(true),
            available: HashSet::new(),
            failing: HashSet::new(),
            interrupting: HashSet::new(),
            provision: InstallStatus::Installed,
            prepare: InstallStatus::Installed,
            journal: journal.clone(),
        }
    }

    pub fn primary(journal: &Journal) -> Self {
        Self::new(BackendKind::PrimaryRepo, "pacman", journal)
    }

    pub fn helper(journal: &Journal) -> Self {
        Self::new(BackendKind::CommunityHelper, "yay", journal)
    }

    pub fn store(journal: &Journal) -> Self {
        Self::new(BackendKind::SandboxStore, "flatpak", journal)
    }

    /// Report `id` as available to queries
    pub fn has(mut self, id: &str) -> Self {
        self.available.insert(id.to_string());
        self
    }

    /// Make installs of `id` fail
    pub fn fails(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    /// Make installs of `id` look like the user pressed Ctrl-C
    pub fn interrupts(mut self, id: &str) -> Self {
        self.interrupting.insert(id.to_string());
        self
    }

    pub fn absent(self) -> Self {
        self.present.store(false, Ordering::SeqCst);
        self
    }

    pub fn provision_fails(mut self, cause: &str) -> Self {
        self.provision = InstallStatus::Failed(cause.to_string());
        self
    }

    pub fn prepare_fails(mut self, cause: &str) -> Self {
        self.prepare = InstallStatus::Failed(cause.to_string());
        self
    }

    pub fn boxed(self) -> Box<dyn Backend> {
        Box::new(self)
    }

    fn mutate(&self, action: &str, id: &str) -> Result<InstallStatus> {
        self.journal
            .record(format!("{} {} {}", self.name, action, id));

        if self.interrupting.contains(id) {
            return Err(Error::Interrupted {
                program: self.name.clone(),
            });
        }
        if self.failing.contains(id) {
            return Ok(InstallStatus::Failed(format!(
                "{} exited with code 1",
                self.name
            )));
        }
        Ok(InstallStatus::Installed)
    }
}

impl Backend for FakeBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_present(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }

    fn query_available(&self, id: &str) -> Result<bool> {
        self.journal.record(format!("{} query {}", self.name, id));
        Ok(self.available.contains(id))
    }

    fn install(&self, id: &str) -> Result<InstallStatus> {
        self.mutate("install", id)
    }

    fn upgrade_install(&self, id: &str) -> Result<InstallStatus> {
        self.mutate("upgrade-install", id)
    }

    fn provision(&self, primary: &dyn Backend) -> Result<InstallStatus> {
        self.journal
            .record(format!("{} provision via {}", self.name, primary.name()));
        if self.provision.is_installed() {
            self.present.store(true, Ordering::SeqCst);
        }
        Ok(self.provision.clone())
    }

    fn prepare(&self) -> Result<InstallStatus> {
        self.journal.record(format!("{} prepare", self.name));
        Ok(self.prepare.clone())
    }
}
