//! API module contract and the registry that composes modules
//!
//! Every module is built from the same [`ModuleContext`]. The registry
//! constructs all of them before starting any, so a construction failure
//! never leaves a partial route set behind.

use crate::state::ModuleContext;
use axum::Router;
use burrow_storage::StorageError;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while constructing or starting modules
#[derive(Error, Debug)]
pub enum ModuleError {
    /// The module rejected the shared configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The module could not use the storage capability
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Two route owners claimed the same mount path
    #[error("mount path {path} claimed by both {first} and {second}")]
    MountConflict {
        path: String,
        first: String,
        second: String,
    },

    /// A module failed to construct
    #[error("module {module} failed to construct: {source}")]
    Construct {
        module: String,
        #[source]
        source: Box<ModuleError>,
    },

    /// A module failed to start
    #[error("module {module} failed to start: {source}")]
    Start {
        module: String,
        #[source]
        source: Box<ModuleError>,
    },
}

/// A constructed API module that owns a subset of routes
pub trait ApiModule: Send + Sync {
    /// Module name used in logs
    fn name(&self) -> &str;

    /// URL prefix under which all of this module's routes live
    fn mount_path(&self) -> &str;

    /// Add this module's routes to the shared router
    fn start(&self, router: Router) -> Result<Router, ModuleError>;
}

type Constructor =
    Box<dyn Fn(&ModuleContext) -> Result<Box<dyn ApiModule>, ModuleError> + Send + Sync>;

/// Modules that were started, in start order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedModule {
    pub name: String,
    pub mount_path: String,
}

/// Ordered set of module constructors
#[derive(Default)]
pub struct ModuleRegistry {
    constructors: Vec<(String, Constructor)>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a module constructor; start order follows registration order
    pub fn register<F>(&mut self, name: impl Into<String>, construct: F) -> &mut Self
    where
        F: Fn(&ModuleContext) -> Result<Box<dyn ApiModule>, ModuleError> + Send + Sync + 'static,
    {
        self.constructors.push((name.into(), Box::new(construct)));
        self
    }

    /// Registered module names in order
    pub fn names(&self) -> Vec<&str> {
        self.constructors.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Construct every module and check that mount paths are unique.
    ///
    /// Nothing is started here, so a failure leaves no routes behind.
    pub fn construct_all(&self, ctx: &ModuleContext) -> Result<Vec<Box<dyn ApiModule>>, ModuleError> {
        let mut modules: Vec<Box<dyn ApiModule>> = Vec::with_capacity(self.constructors.len());
        for (name, construct) in &self.constructors {
            debug!(module = %name, "constructing module");
            let module = construct(ctx).map_err(|e| ModuleError::Construct {
                module: name.clone(),
                source: Box::new(e),
            })?;
            modules.push(module);
        }

        check_mount_paths(&modules)?;
        Ok(modules)
    }
}

/// Start constructed modules in order; a start failure aborts the rest
pub fn start_all(
    modules: &[Box<dyn ApiModule>],
    router: Router,
) -> Result<(Router, Vec<StartedModule>), ModuleError> {
    let mut router = router;
    let mut started = Vec::with_capacity(modules.len());
    for module in modules {
        router = module.start(router).map_err(|e| ModuleError::Start {
            module: module.name().to_string(),
            source: Box::new(e),
        })?;
        info!(module = %module.name(), mount = %module.mount_path(), "module started");
        started.push(StartedModule {
            name: module.name().to_string(),
            mount_path: module.mount_path().to_string(),
        });
    }

    Ok((router, started))
}

fn check_mount_paths(modules: &[Box<dyn ApiModule>]) -> Result<(), ModuleError> {
    for (i, module) in modules.iter().enumerate() {
        if let Some(earlier) = modules[..i]
            .iter()
            .find(|m| m.mount_path() == module.mount_path())
        {
            return Err(ModuleError::MountConflict {
                path: module.mount_path().to_string(),
                first: earlier.name().to_string(),
                second: module.name().to_string(),
            });
        }
    }
    Ok(())
}
