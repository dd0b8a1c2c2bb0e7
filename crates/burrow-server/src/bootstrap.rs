//! Startup pipeline
//!
//! ```text
//! Unconfigured → ConfigLoading → ConfigFound | ConfigMissing → WizardRunning → ConfigCreated
//!   → CredentialLoading → CredentialFound | CredentialMissing → WizardRunning → UserCreated
//!   → StorageInit → ModulesConstructing → ModulesStarting → Serving
//! ```
//!
//! Every stage returns a `Result`; the first failure moves the pipeline to
//! `Fatal` and is returned to the caller.

use crate::error::BootstrapError;
use crate::module::{self, ModuleRegistry, StartedModule};
use crate::setup::{self, Prompter};
use crate::state::ModuleContext;
use axum::Router;
use burrow_core::{Config, ConfigError, ConfigStore, CredentialStore};
use burrow_storage::{LocalStorage, Storage};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Stages of the startup state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootstrapStage {
    Unconfigured,
    ConfigLoading,
    ConfigFound,
    ConfigMissing,
    WizardRunning,
    ConfigCreated,
    CredentialLoading,
    CredentialFound,
    CredentialMissing,
    UserCreated,
    StorageInit,
    ModulesConstructing,
    ModulesStarting,
    Serving,
    Fatal,
}

impl fmt::Display for BootstrapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Locations of the persisted config and credential files
#[derive(Clone, Debug)]
pub struct BootstrapPaths {
    pub config: PathBuf,
    pub auth: PathBuf,
}

impl Default for BootstrapPaths {
    fn default() -> Self {
        Self {
            config: PathBuf::from("./config.json"),
            auth: PathBuf::from("./auth.json"),
        }
    }
}

/// Result of a successful bootstrap: providers plus the composed router
pub struct Bootstrapped {
    /// Shared providers
    pub context: ModuleContext,
    /// Router carrying every module's routes
    pub router: Router,
    /// Modules in start order
    pub modules: Vec<StartedModule>,
    /// Config file, credential file and storage roots; never served as static assets
    pub private_paths: Vec<PathBuf>,
    /// Stages visited, in order
    pub stages: Vec<BootstrapStage>,
}

struct StageLog {
    stages: Vec<BootstrapStage>,
}

impl StageLog {
    fn new() -> Self {
        Self {
            stages: vec![BootstrapStage::Unconfigured],
        }
    }

    fn enter(&mut self, stage: BootstrapStage) {
        info!(stage = %stage, "bootstrap");
        self.stages.push(stage);
    }
}

/// Load the config, running the wizard only when the file is absent
pub fn load_config(
    store: &ConfigStore,
    prompter: &mut impl Prompter,
) -> Result<(Config, bool), BootstrapError> {
    match store.parse() {
        Ok(config) => Ok((config, false)),
        Err(ConfigError::NotFound(_)) => Ok((setup::create_config(prompter, store)?, true)),
        Err(e) => Err(e.into()),
    }
}

/// Open the credential store, creating the first user when the file is absent
pub fn load_credentials(
    path: PathBuf,
    prompter: &mut impl Prompter,
) -> Result<(CredentialStore, bool), BootstrapError> {
    let credentials = CredentialStore::open(path)?;
    if credentials.exists_auth() {
        return Ok((credentials, false));
    }
    setup::create_user(prompter, &credentials)?;
    Ok((credentials, true))
}

/// Validate the storage roots named by `config`
pub fn init_storage(config: &Config) -> Result<Arc<dyn Storage>, BootstrapError> {
    let storage = LocalStorage::new(&config.root_data_dir, &config.root_temp_dir)?;
    Ok(Arc::new(storage))
}

/// Run the whole pipeline up to, but not including, binding the listener
pub fn bootstrap(
    paths: &BootstrapPaths,
    prompter: &mut impl Prompter,
    registry: &ModuleRegistry,
) -> Result<Bootstrapped, BootstrapError> {
    let mut log = StageLog::new();
    run_stages(paths, prompter, registry, &mut log).inspect_err(|e| {
        log.enter(BootstrapStage::Fatal);
        error!(error = %e, "Bootstrap failed");
    })
}

fn run_stages(
    paths: &BootstrapPaths,
    prompter: &mut impl Prompter,
    registry: &ModuleRegistry,
    log: &mut StageLog,
) -> Result<Bootstrapped, BootstrapError> {
    log.enter(BootstrapStage::ConfigLoading);
    let config_store = ConfigStore::new(&paths.config);
    if !config_store.exists() {
        log.enter(BootstrapStage::ConfigMissing);
        log.enter(BootstrapStage::WizardRunning);
    }
    let (config, created) = load_config(&config_store, prompter)?;
    log.enter(if created {
        BootstrapStage::ConfigCreated
    } else {
        BootstrapStage::ConfigFound
    });

    log.enter(BootstrapStage::CredentialLoading);
    if !paths.auth.exists() {
        log.enter(BootstrapStage::CredentialMissing);
        log.enter(BootstrapStage::WizardRunning);
    }
    let (credentials, created) = load_credentials(paths.auth.clone(), prompter)?;
    log.enter(if created {
        BootstrapStage::UserCreated
    } else {
        BootstrapStage::CredentialFound
    });

    log.enter(BootstrapStage::StorageInit);
    let storage = init_storage(&config)?;

    let private_paths = vec![
        paths.config.clone(),
        paths.auth.clone(),
        PathBuf::from(&config.root_data_dir),
        PathBuf::from(&config.root_temp_dir),
    ];
    let context = ModuleContext::new(Arc::new(config), Arc::new(credentials), storage);

    log.enter(BootstrapStage::ModulesConstructing);
    let constructed = registry.construct_all(&context)?;
    log.enter(BootstrapStage::ModulesStarting);
    let (router, modules) = module::start_all(&constructed, Router::new())?;
    log.enter(BootstrapStage::Serving);

    Ok(Bootstrapped {
        context,
        router,
        modules,
        private_paths,
        stages: std::mem::take(&mut log.stages),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::tests::{failing, failing_start, recording, Journal};
    use crate::module::ModuleError;
    use crate::modules::default_registry;
    use crate::setup::ScriptedPrompter;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn scripted(lines: &str) -> ScriptedPrompter<Cursor<Vec<u8>>, Vec<u8>> {
        ScriptedPrompter::new(Cursor::new(lines.as_bytes().to_vec()), Vec::new())
    }

    fn paths(dir: &TempDir) -> BootstrapPaths {
        BootstrapPaths {
            config: dir.path().join("config.json"),
            auth: dir.path().join("auth.json"),
        }
    }

    fn answers(dir: &TempDir) -> String {
        format!(
            "8080\n{}\n{}\n/site/\n{}\nadmin\nsecret1\nAdmin\na@b.com\n",
            dir.path().join("data").display(),
            dir.path().join("tmp").display(),
            dir.path().join("web").display(),
        )
    }

    #[test]
    fn test_fresh_deployment_runs_both_wizards() {
        let dir = TempDir::new().unwrap();
        let mut prompter = scripted(&answers(&dir));

        let booted = bootstrap(&paths(&dir), &mut prompter, &default_registry()).unwrap();

        assert_eq!(booted.context.config.port, 8080);
        assert_eq!(booted.context.config.web_url, "/site");
        assert!(booted.context.credentials.verify("admin", "secret1").is_some());
        assert!(booted.stages.contains(&BootstrapStage::ConfigCreated));
        assert!(booted.stages.contains(&BootstrapStage::UserCreated));
        assert_eq!(booted.stages.last(), Some(&BootstrapStage::Serving));
        let names: Vec<_> = booted.modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["auth", "webdav", "files"]);
    }

    #[test]
    fn test_existing_files_skip_wizard() {
        let dir = TempDir::new().unwrap();
        bootstrap(&paths(&dir), &mut scripted(&answers(&dir)), &default_registry()).unwrap();
        let before = std::fs::read(dir.path().join("config.json")).unwrap();

        // No answers at all: any prompt would fail with closed input
        let mut prompter = scripted("");
        let booted = bootstrap(&paths(&dir), &mut prompter, &default_registry()).unwrap();

        assert!(booted.stages.contains(&BootstrapStage::ConfigFound));
        assert!(booted.stages.contains(&BootstrapStage::CredentialFound));
        assert!(!booted.stages.contains(&BootstrapStage::WizardRunning));
        assert!(prompter.into_output().is_empty());
        assert_eq!(std::fs::read(dir.path().join("config.json")).unwrap(), before);
    }

    #[test]
    fn test_token_secret_stable_across_restarts() {
        let dir = TempDir::new().unwrap();
        let first =
            bootstrap(&paths(&dir), &mut scripted(&answers(&dir)), &default_registry()).unwrap();
        let second = bootstrap(&paths(&dir), &mut scripted(""), &default_registry()).unwrap();

        assert_eq!(
            first.context.config.token_secret,
            second.context.config.token_secret
        );
    }

    #[test]
    fn test_only_credentials_missing() {
        let dir = TempDir::new().unwrap();
        bootstrap(&paths(&dir), &mut scripted(&answers(&dir)), &default_registry()).unwrap();
        std::fs::remove_file(dir.path().join("auth.json")).unwrap();

        let mut prompter = scripted("root\nhunter22\nRoot\nroot@example.com\n");
        let booted = bootstrap(&paths(&dir), &mut prompter, &default_registry()).unwrap();

        assert!(booted.stages.contains(&BootstrapStage::ConfigFound));
        assert!(booted.stages.contains(&BootstrapStage::UserCreated));
        assert!(booted.context.credentials.verify("root", "hunter22").is_some());
        assert!(booted.context.credentials.get_user("admin").is_none());
    }

    #[test]
    fn test_bad_port_is_fatal() {
        let dir = TempDir::new().unwrap();
        let mut prompter = scripted("eighty\n");

        let result = bootstrap(&paths(&dir), &mut prompter, &default_registry());

        assert!(matches!(result, Err(BootstrapError::Parse(_))));
        assert!(!dir.path().join("config.json").exists());
        assert!(!dir.path().join("auth.json").exists());
    }

    #[test]
    fn test_malformed_config_is_fatal_and_untouched() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.json"), b"{\"port\": ").unwrap();

        let result = bootstrap(&paths(&dir), &mut scripted(""), &default_registry());

        assert!(matches!(result, Err(BootstrapError::Parse(_))));
        assert_eq!(std::fs::read(dir.path().join("config.json")).unwrap(), b"{\"port\": ");
    }

    #[test]
    fn test_unusable_storage_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let input = format!(
            "\n{}\n{}\n\n\nadmin\npw\nAdmin\na@b.com\n",
            blocker.join("data").display(),
            dir.path().join("tmp").display(),
        );

        let result = bootstrap(&paths(&dir), &mut scripted(&input), &default_registry());
        assert!(matches!(result, Err(BootstrapError::ProviderInit(_))));
    }

    #[test]
    fn test_construction_failure_starts_nothing() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::default();
        let mut registry = ModuleRegistry::new();
        recording(&mut registry, "auth", &journal);
        failing(&mut registry, "webdav", &journal);
        recording(&mut registry, "files", &journal);

        let result = bootstrap(&paths(&dir), &mut scripted(&answers(&dir)), &registry);

        assert!(matches!(result, Err(BootstrapError::ModuleInit(_))));
        let events = journal.events();
        assert_eq!(events, vec!["construct:auth", "construct:webdav"]);
        assert!(events.iter().all(|e| !e.starts_with("start:")));
    }

    #[test]
    fn test_construction_failure_never_enters_start_stage() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::default();
        let mut registry = ModuleRegistry::new();
        recording(&mut registry, "auth", &journal);
        failing(&mut registry, "webdav", &journal);

        let mut log = StageLog::new();
        let result = run_stages(&paths(&dir), &mut scripted(&answers(&dir)), &registry, &mut log);

        assert!(result.is_err());
        assert_eq!(log.stages.last(), Some(&BootstrapStage::ModulesConstructing));
        assert!(!log.stages.contains(&BootstrapStage::ModulesStarting));
    }

    #[test]
    fn test_start_failure_is_fatal_after_all_constructed() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::default();
        let mut registry = ModuleRegistry::new();
        recording(&mut registry, "auth", &journal);
        failing_start(&mut registry, "webdav", &journal);
        recording(&mut registry, "files", &journal);

        let mut log = StageLog::new();
        let result = run_stages(&paths(&dir), &mut scripted(&answers(&dir)), &registry, &mut log);

        assert!(matches!(
            result,
            Err(BootstrapError::ModuleInit(ModuleError::Start { ref module, .. })) if module == "webdav"
        ));
        assert_eq!(log.stages.last(), Some(&BootstrapStage::ModulesStarting));
        assert_eq!(
            journal.events(),
            vec![
                "construct:auth",
                "construct:webdav",
                "construct:files",
                "start:auth",
                "start:webdav",
            ]
        );
    }

    #[test]
    fn test_private_paths_cover_secrets_and_roots() {
        let dir = TempDir::new().unwrap();
        let booted =
            bootstrap(&paths(&dir), &mut scripted(&answers(&dir)), &default_registry()).unwrap();

        assert_eq!(
            booted.private_paths,
            vec![
                dir.path().join("config.json"),
                dir.path().join("auth.json"),
                dir.path().join("data"),
                dir.path().join("tmp"),
            ]
        );
    }

    #[test]
    fn test_modules_start_in_registration_order() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::default();
        let mut registry = ModuleRegistry::new();
        recording(&mut registry, "first", &journal);
        recording(&mut registry, "second", &journal);
        recording(&mut registry, "third", &journal);

        bootstrap(&paths(&dir), &mut scripted(&answers(&dir)), &registry).unwrap();

        assert_eq!(
            journal.events(),
            vec![
                "construct:first",
                "construct:second",
                "construct:third",
                "start:first",
                "start:second",
                "start:third",
            ]
        );
    }
}
