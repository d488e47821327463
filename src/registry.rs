//! Translation registry
//!
//! The registry owns the active locale and source, decides when a bundle must
//! be (re)loaded, shares the current load with every lookup, persists its
//! configuration and cache through a [`ConfigurationStore`], and notifies
//! listeners whenever the locale or source changes.
//!
//! # Lifecycle
//!
//! Create one registry at application start and hand clones of it to the
//! components that display text. Clones share all state. There is no
//! teardown.
//!
//! # Loads
//!
//! Exactly one load is current at any time. Starting a new load replaces the
//! previous one: lookups issued afterwards always observe the new load, while
//! lookups already waiting on the old one still receive its result. Loads run
//! as Tokio tasks. A reload requested outside a Tokio runtime still persists
//! the configuration, but its load fails with [`LoadError::Aborted`].

use crate::bundle::Bundle;
use crate::config::{SetupOptions, LOCALE_PLACEHOLDER};
use crate::error::{LoadError, LoadResult, RegistryError, RegistryResult};
use crate::fetch::{load_bundle, Fetcher};
use crate::message::{render, Params};
use crate::storage::{ConfigurationStore, StorageLocation, StoredConfiguration};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

type LoadFuture = BoxFuture<'static, LoadResult<Arc<Bundle>>>;

/// A load shared by every lookup waiting on it
pub type SharedLoad = Shared<LoadFuture>;

/// Callback fired after each reload
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// The current load and the generation it was started in
#[derive(Clone)]
struct PendingLoad {
    generation: u64,
    future: SharedLoad,
}

/// Mutable registry state
#[derive(Default)]
struct State {
    locale: Option<String>,
    source: Option<String>,
    pending: Option<PendingLoad>,
    last_load: Option<DateTime<Utc>>,
    initialized: bool,
    generation: u64,
    persist_task: Option<JoinHandle<()>>,
}

impl State {
    /// Replace the current load, returning its generation
    fn replace_pending(&mut self, future: SharedLoad) -> u64 {
        self.generation += 1;
        self.pending = Some(PendingLoad {
            generation: self.generation,
            future,
        });
        self.generation
    }

    fn snapshot(&self, cache: Option<Bundle>) -> StoredConfiguration {
        StoredConfiguration {
            locale: self.locale.clone(),
            source: self.source.clone(),
            cache,
            date: self.last_load.map(|d| d.timestamp_millis()),
        }
    }
}

struct Inner {
    fetcher: Arc<dyn Fetcher>,
    state: Mutex<State>,
    store: Mutex<ConfigurationStore>,
    listeners: Mutex<Vec<Listener>>,
}

/// Shared translation registry
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Inner>,
}

impl Registry {
    /// Create a registry persisting through the default configuration store
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_store(fetcher, ConfigurationStore::default())
    }

    /// Create a registry persisting through `store`
    pub fn with_store(fetcher: Arc<dyn Fetcher>, store: ConfigurationStore) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                state: Mutex::new(State::default()),
                store: Mutex::new(store),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Configure the registry
    ///
    /// Binds persistence to `options.save`. Unless `force` is set, a persisted
    /// configuration takes precedence over `options.source`/`options.locale`
    /// and its cached bundle is reused when fresh. A persisted configuration
    /// that cannot be parsed is returned as an error.
    pub fn setup(&self, options: SetupOptions) -> RegistryResult<()> {
        self.store().configure(options.save.clone());

        if options.force {
            self.apply(&options, true);
        } else {
            let persisted = self.store().load()?;
            match persisted {
                Some(persisted) => self.adopt(persisted, &options),
                None => self.apply(&options, false),
            }
        }

        self.state().initialized = true;
        Ok(())
    }

    /// Register a callback fired after every reload
    ///
    /// Listeners run in registration order and are never removed.
    pub fn add_listener<F>(&self, listener: F) -> &Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners().push(Arc::new(listener));
        self
    }

    /// Active locale
    pub fn locale(&self) -> Option<String> {
        self.state().locale.clone()
    }

    /// Change the locale and reload, even when unchanged
    pub fn set_locale(&self, locale: impl Into<String>) {
        self.state().locale = Some(locale.into());
        self.reload();
    }

    /// Source URL template
    pub fn source(&self) -> Option<String> {
        self.state().source.clone()
    }

    /// Change the source template and reload, even when unchanged
    pub fn set_source(&self, source: impl Into<String>) {
        self.state().source = Some(source.into());
        self.reload();
    }

    /// Whether `setup` has completed at least once
    pub fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    /// Start time of the current load
    pub fn last_load(&self) -> Option<DateTime<Utc>> {
        self.state().last_load
    }

    /// Location the configuration is persisted to
    pub fn storage_location(&self) -> Option<StorageLocation> {
        self.store().location().cloned()
    }

    /// Wait until the most recently started load has been persisted
    ///
    /// Returns immediately when nothing is pending.
    pub async fn flush(&self) {
        let task = self.state().persist_task.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                log::warn!("Persisting translations did not complete: {}", e);
            }
        }
    }

    /// Look up the value at a dotted key path
    ///
    /// Starts a load when none exists yet. The returned future resolves once
    /// the current load completes: to the stored value, or to `None` when the
    /// path does not exist. A failed load resolves to its error.
    pub fn get(&self, key: &str) -> impl Future<Output = RegistryResult<Option<Value>>> + Send + 'static {
        let load = self.current_load();
        let key = key.to_string();

        async move {
            let load = load.ok_or(RegistryError::NotConfigured)?;
            let bundle = load.await?;
            Ok(bundle.lookup(&key).cloned())
        }
    }

    /// Look up `key` and render it with `params`
    ///
    /// Missing translations and failed loads render as the empty string.
    pub fn translate(&self, key: &str, params: &Params) -> impl Future<Output = String> + Send + 'static {
        let lookup = self.get(key);
        let key = key.to_string();
        let params = params.clone();

        async move {
            match lookup.await {
                Ok(value) => render(value.as_ref(), &params),
                Err(e) => {
                    log::debug!("No translation for {}: {}", key, e);
                    String::new()
                }
            }
        }
    }

    /// Apply source and locale from options
    ///
    /// When no load can start, the configuration is still persisted and any
    /// load left over from the previous configuration is dropped.
    fn apply(&self, options: &SetupOptions, force: bool) {
        let reload = {
            let mut state = self.state();
            state.source = options.source.clone();
            state.locale = options.locale.clone();

            let reload = force || state.initialized;
            state.initialized |= reload;
            reload
        };

        if !(reload && self.reload()) {
            self.state().pending = None;
            self.persist();
        }
    }

    /// Take over a persisted configuration without fetching
    fn adopt(&self, persisted: StoredConfiguration, options: &SetupOptions) {
        let stale = persisted.is_stale(options.date);

        let mut state = self.state();
        state.locale = persisted.locale;
        state.source = persisted.source;

        match persisted.cache {
            Some(bundle) if !stale => {
                log::info!(
                    "Using cached translations for {}",
                    state.locale.as_deref().unwrap_or("<none>")
                );
                let ready: SharedLoad = futures::future::ready(Ok(Arc::new(bundle))).boxed().shared();
                state.replace_pending(ready);
            }
            _ => {
                log::info!("Persisted translations are stale, reloading on first lookup");
                state.pending = None;
            }
        }
    }

    /// Current load, starting one if none exists
    fn current_load(&self) -> Option<SharedLoad> {
        self.start_load(true);
        self.state().pending.as_ref().map(|p| p.future.clone())
    }

    /// Start a new load, persist, and notify listeners
    ///
    /// Does nothing until `setup` has run and both locale and source are set.
    /// Returns whether a load was started.
    fn reload(&self) -> bool {
        self.start_load(false)
    }

    /// Start a load; with `only_if_missing`, only when none is current
    ///
    /// The current-load check and the replacement happen under one lock, so
    /// concurrent first lookups share a single load.
    fn start_load(&self, only_if_missing: bool) -> bool {
        {
            let mut state = self.state();
            if !state.initialized || (only_if_missing && state.pending.is_some()) {
                return false;
            }
            let (Some(locale), Some(source)) = (state.locale.clone(), state.source.clone()) else {
                return false;
            };
            if locale.is_empty() || source.is_empty() {
                return false;
            }

            state.last_load = Some(Utc::now());
            let url = source.replacen(LOCALE_PLACEHOLDER, &locale, 1);
            log::debug!("Loading translations for {} from {}", locale, url);

            let future: LoadFuture = match Handle::try_current() {
                Ok(runtime) => {
                    let fetcher = Arc::clone(&self.inner.fetcher);
                    let task = runtime.spawn(async move {
                        load_bundle(fetcher.as_ref(), &url).await.map(Arc::new)
                    });
                    async move {
                        task.await
                            .unwrap_or_else(|e| Err(LoadError::Aborted(e.to_string())))
                    }
                    .boxed()
                }
                Err(e) => {
                    log::warn!("Cannot load {} outside a Tokio runtime: {}", url, e);
                    futures::future::ready(Err(LoadError::Aborted(format!(
                        "no Tokio runtime to load {}",
                        url
                    ))))
                    .boxed()
                }
            };

            state.replace_pending(future.shared());
        }

        self.persist();
        self.fire_listeners();
        true
    }

    /// Persist configuration, with the cache once the current load resolves
    fn persist(&self) {
        let state = self.state();
        let Some(pending) = state.pending.clone() else {
            let snapshot = state.snapshot(None);
            drop(state);
            self.save(&snapshot);
            return;
        };
        drop(state);

        let Ok(runtime) = Handle::try_current() else {
            // Without a runtime the load cannot resolve, so only the configuration is kept.
            let snapshot = self.state().snapshot(None);
            self.save(&snapshot);
            return;
        };

        let registry = self.clone();
        let task = runtime.spawn(async move {
            match pending.future.await {
                Ok(bundle) => registry.persist_loaded(pending.generation, &bundle),
                Err(e) => log::warn!("Translations not cached: {}", e),
            }
        });
        self.state().persist_task = Some(task);
    }

    /// Persist a resolved bundle unless a newer load has replaced it
    fn persist_loaded(&self, generation: u64, bundle: &Bundle) {
        let snapshot = {
            let state = self.state();
            match &state.pending {
                Some(current) if current.generation == generation => {
                    state.snapshot(Some(bundle.clone()))
                }
                _ => {
                    log::debug!("Skipping cache of superseded load {}", generation);
                    return;
                }
            }
        };
        self.save(&snapshot);
    }

    fn save(&self, snapshot: &StoredConfiguration) {
        if let Err(e) = self.store().save(snapshot) {
            log::warn!("Failed to persist translation configuration: {}", e);
        }
    }

    /// Invoke every listener in registration order
    ///
    /// A panicking listener is logged and does not prevent the others from running.
    fn fire_listeners(&self) {
        let listeners = self.listeners().clone();

        for (index, listener) in listeners.iter().enumerate() {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener())) {
                log::error!("Translation listener {} panicked: {}", index, panic_message(&*panic));
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn store(&self) -> MutexGuard<'_, ConfigurationStore> {
        self.inner.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<Listener>> {
        self.inner.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Registry")
            .field("locale", &state.locale)
            .field("source", &state.source)
            .field("initialized", &state.initialized)
            .field("loaded", &state.pending.is_some())
            .field("last_load", &state.last_load)
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
