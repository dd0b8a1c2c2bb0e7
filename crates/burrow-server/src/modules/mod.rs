//! Built-in API modules

pub mod auth;
pub mod files;
pub mod webdav;

pub use auth::AuthModule;
pub use files::FilesModule;
pub use webdav::WebDavModule;

use crate::module::{ApiModule, ModuleRegistry};

/// Registry holding the built-in modules in start order: auth, WebDAV, files
pub fn default_registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry
        .register("auth", |ctx| Ok(Box::new(AuthModule::new(ctx)?) as Box<dyn ApiModule>))
        .register("webdav", |ctx| Ok(Box::new(WebDavModule::new(ctx)?) as Box<dyn ApiModule>))
        .register("files", |ctx| Ok(Box::new(FilesModule::new(ctx)?) as Box<dyn ApiModule>));
    registry
}
