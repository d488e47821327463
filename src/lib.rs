//! i18n-registry - a shared, lazily-loaded translation registry
//!
//! Resolves a locale-specific message bundle from a remote source, caches
//! it, persists configuration and cache across sessions, and notifies
//! dependent views when the active locale or source changes.
//!
//! ```no_run
//! use i18n_registry::{HttpFetcher, Params, Registry, SetupOptions, StorageLocation};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = HttpFetcher::new(&Default::default())?;
//! let registry = Registry::new(Arc::new(fetcher));
//! registry.setup(
//!     SetupOptions::new("https://example.org/i18n/{locale}.json", "en")
//!         .save(StorageLocation::durable("my-app.i18n")),
//! )?;
//!
//! let text = registry.translate("greet.hi", &Params::new().with(0, "Ada")).await;
//! println!("{}", text);
//! # Ok(())
//! # }
//! ```

pub mod bundle;
pub mod config;
pub mod error;
pub mod fetch;
pub mod message;
pub mod registry;
pub mod storage;

pub use bundle::Bundle;
pub use config::{Config, FetchConfig, SetupOptions};
pub use error::{LoadError, RegistryError, RegistryResult, StorageError};
pub use fetch::{Fetcher, HttpFetcher};
pub use message::{render, Params};
pub use registry::Registry;
pub use storage::{ConfigurationStore, StorageKind, StorageLocation, StoredConfiguration};
