//! Configuration store for the translation registry
//!
//! Persists and retrieves a small JSON snapshot (locale, source, cached
//! bundle, freshness timestamp) in one of two backends:
//! - `session`: lives as long as the process
//! - `durable`: survives restarts (files under the data directory)
//!
//! A backend and key are selected by a [`StorageLocation`], usually parsed
//! from a descriptor such as `durable[my-app.i18n]`.

pub mod backend;

pub use backend::{Backend, FileBackend, MemoryBackend};

use crate::bundle::Bundle;
use crate::error::{DescriptorError, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Descriptor pattern: backend name followed by a bracketed key
const DESCRIPTOR_PATTERN: &str = r"(durable|session|localStorage|sessionStorage)\[(.+)\]";

fn descriptor_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(DESCRIPTOR_PATTERN).expect("descriptor pattern is valid"))
}

/// Which backend a location refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageKind {
    /// Survives restarts
    Durable,
    /// Lives as long as the process
    Session,
}

impl StorageKind {
    /// Descriptor prefix for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Durable => "durable",
            StorageKind::Session => "session",
        }
    }
}

/// A backend plus the key under which the configuration is stored
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageLocation {
    pub kind: StorageKind,
    pub key: String,
}

impl StorageLocation {
    pub fn durable(key: impl Into<String>) -> Self {
        Self {
            kind: StorageKind::Durable,
            key: key.into(),
        }
    }

    pub fn session(key: impl Into<String>) -> Self {
        Self {
            kind: StorageKind::Session,
            key: key.into(),
        }
    }

    /// Parse a descriptor such as `durable[key]` or `session[key]`
    ///
    /// `localStorage[key]` and `sessionStorage[key]` are accepted as aliases.
    /// The pattern may appear anywhere in the descriptor.
    pub fn parse(descriptor: &str) -> Result<Self, DescriptorError> {
        let captures = descriptor_regex()
            .captures(descriptor)
            .ok_or_else(|| DescriptorError::Unrecognized(descriptor.to_string()))?;

        let kind = match &captures[1] {
            "durable" | "localStorage" => StorageKind::Durable,
            _ => StorageKind::Session,
        };

        Ok(Self {
            kind,
            key: captures[2].to_string(),
        })
    }
}

impl std::str::FromStr for StorageLocation {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind.as_str(), self.key)
    }
}

/// Persisted snapshot of the registry
///
/// `cache` is only meaningful together with `date`: a snapshot without a date
/// is always treated as stale when a freshness date is supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredConfiguration {
    /// Active locale
    pub locale: Option<String>,

    /// Source URL template
    pub source: Option<String>,

    /// Cached bundle for `locale`
    pub cache: Option<Bundle>,

    /// Creation time of the load that produced `cache`, in milliseconds since the epoch
    pub date: Option<i64>,
}

impl StoredConfiguration {
    /// Stored date as a timestamp
    pub fn date_time(&self) -> Option<DateTime<Utc>> {
        self.date.and_then(DateTime::from_timestamp_millis)
    }

    /// Whether the cached bundle must be reloaded for the given freshness date
    ///
    /// A missing cache is always stale. With a freshness date, a missing or
    /// older stored date is stale too.
    pub fn is_stale(&self, freshness: Option<DateTime<Utc>>) -> bool {
        if self.cache.is_none() {
            return true;
        }

        match freshness {
            Some(freshness) => match self.date {
                Some(stored) => stored < freshness.timestamp_millis(),
                None => true,
            },
            None => false,
        }
    }
}

/// Binds a location to a backend and reads/writes the persisted snapshot
pub struct ConfigurationStore {
    durable: Arc<dyn Backend>,
    session: Arc<dyn Backend>,
    binding: Option<StorageLocation>,
}

impl ConfigurationStore {
    /// Create a store over the given durable and session backends
    pub fn new(durable: Arc<dyn Backend>, session: Arc<dyn Backend>) -> Self {
        Self {
            durable,
            session,
            binding: None,
        }
    }

    /// Create a store using only in-memory backends
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()), Arc::new(MemoryBackend::new()))
    }

    /// Bind to a location, or unbind with `None`
    ///
    /// Each call fully replaces the previous binding.
    pub fn configure(&mut self, location: Option<StorageLocation>) -> &mut Self {
        match &location {
            Some(location) => log::debug!("Configuration store bound to {}", location),
            None => log::debug!("Configuration store unbound"),
        }
        self.binding = location;
        self
    }

    /// Bind from a descriptor string
    ///
    /// An empty or unrecognized descriptor unbinds the store.
    pub fn configure_descriptor(&mut self, descriptor: Option<&str>) -> &mut Self {
        let location = descriptor
            .filter(|d| !d.is_empty())
            .and_then(|d| StorageLocation::parse(d).ok());
        self.configure(location)
    }

    /// Current binding
    pub fn location(&self) -> Option<&StorageLocation> {
        self.binding.as_ref()
    }

    /// Whether reads and writes reach a backend
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Load the persisted snapshot
    ///
    /// Returns `None` when unbound or when nothing is stored. Stored text that
    /// is not a valid snapshot is an error.
    pub fn load(&self) -> StorageResult<Option<StoredConfiguration>> {
        let Some(location) = &self.binding else {
            return Ok(None);
        };

        let raw = match self.backend(location.kind).read(&location.key)? {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(None),
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::ParseError {
                key: location.key.clone(),
                source: e,
            })
    }

    /// Persist a snapshot, overwriting any previous one
    ///
    /// Does nothing when unbound.
    pub fn save(&self, config: &StoredConfiguration) -> StorageResult<()> {
        let Some(location) = &self.binding else {
            return Ok(());
        };

        let content = serde_json::to_string(config).map_err(StorageError::SerializeError)?;
        self.backend(location.kind).write(&location.key, &content)
    }

    fn backend(&self, kind: StorageKind) -> &dyn Backend {
        match kind {
            StorageKind::Durable => self.durable.as_ref(),
            StorageKind::Session => self.session.as_ref(),
        }
    }
}

impl Default for ConfigurationStore {
    /// File backend in the data directory plus a process-wide memory backend
    fn default() -> Self {
        let durable: Arc<dyn Backend> = match FileBackend::in_data_dir() {
            Ok(backend) => Arc::new(backend),
            Err(e) => {
                log::warn!("{}; durable storage will not survive restarts", e);
                Arc::new(MemoryBackend::new())
            }
        };
        Self::new(durable, Arc::new(MemoryBackend::new()))
    }
}

impl fmt::Debug for ConfigurationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationStore")
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}
