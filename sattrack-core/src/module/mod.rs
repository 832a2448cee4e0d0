//! The satellite-tracking module aggregate.
//!
//! A [`Module`] owns the satellite mapping, the ground-station record, the
//! registered views and the simulation-time controller, all behind a single
//! mutex. The two acquisition disciplines are deliberate and documented at
//! the call sites: `tick` *skips* when the guard is held (ticks are dropped,
//! never queued), while reload, reconfigure and the time-control setters
//! *block* until the guard is free.

pub mod ticker;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::{ConfigError, ModuleConfig, Preferences};
use crate::qth::Qth;
use crate::sat::{SatDataSource, SatMap, StoreError};
use crate::time::Clock;
use crate::timectl::{TimeController, TimeMode};
use crate::view::{View, ViewFactory};
use self::ticker::Ticker;

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("module is already running")]
    AlreadyRunning,
}

/// Display placement of a module.
///
/// Transitions happen on explicit user action only and are independent of
/// the time mode; every state is reachable from every other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleState {
    #[default]
    Docked,
    Windowed,
    Fullscreen,
}

/// Kind of controller sub-window owned by a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    Rotator,
    Radio,
}

/// Handle to an open rotator or radio controller.
///
/// Owned by the module and closed before the module itself is torn down.
#[derive(Debug)]
pub struct ControllerWindow {
    kind: ControllerKind,
    opened_at: DateTime<Utc>,
}

impl ControllerWindow {
    fn open(kind: ControllerKind, now: DateTime<Utc>) -> Self {
        tracing::info!("{:?} controller opened", kind);
        Self {
            kind,
            opened_at: now,
        }
    }

    pub fn kind(&self) -> ControllerKind {
        self.kind
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    fn close(self) {
        tracing::info!("{:?} controller closed", self.kind);
    }
}

/// Everything mutable about a module, guarded by one mutex.
struct ModuleInner {
    config: ModuleConfig,
    prefs: Preferences,
    qth: Qth,
    state: ModuleState,
    timectl: TimeController,
    satellites: SatMap,
    views: Vec<Box<dyn View>>,
    controllers: Vec<ControllerWindow>,
}

/// State shared between the module handle and its tick task.
pub(crate) struct ModuleShared {
    pub(crate) name: String,
    inner: Mutex<ModuleInner>,
    store: Arc<dyn SatDataSource>,
    clock: Arc<dyn Clock>,
}

impl ModuleShared {
    /// One scheduler tick.
    ///
    /// If the guard is held — a reload in progress, or a previous tick still
    /// running — the tick is dropped, never queued. Otherwise: sample real
    /// time, advance simulated time, recompute every satellite position,
    /// then notify each view in registration order, fire-and-forget.
    pub(crate) async fn tick(&self) {
        let Ok(mut inner) = self.inner.try_lock() else {
            tracing::trace!("tick skipped for '{}': module busy", self.name);
            return;
        };
        let now = self.clock.now();
        let daynum = inner.timectl.advance(now);

        let inner = &mut *inner;
        for record in inner.satellites.values_mut() {
            record.position = self.store.position_at(record, daynum);
            record.last_computed = Some(daynum);
        }
        for view in &inner.views {
            view.render(daynum, &inner.satellites);
        }
    }
}

/// The module aggregate root.
pub struct Module {
    shared: Arc<ModuleShared>,
    cfg_path: PathBuf,
    prefs_path: Option<PathBuf>,
    view_factory: Arc<ViewFactory>,
    ticker: Option<Ticker>,
}

impl Module {
    /// Open a module from its configuration file.
    ///
    /// Loads the config, ground station and layout, builds the views through
    /// `view_factory`, then performs the initial satellite load from the
    /// store. Any failure leaves nothing behind.
    pub async fn open(
        cfg_path: impl AsRef<Path>,
        prefs_path: Option<PathBuf>,
        store: Arc<dyn SatDataSource>,
        clock: Arc<dyn Clock>,
        view_factory: Arc<ViewFactory>,
    ) -> Result<Self, ModuleError> {
        let cfg_path = cfg_path.as_ref().to_path_buf();
        let config = ModuleConfig::from_file(&cfg_path)?;
        let prefs = match &prefs_path {
            Some(path) => Preferences::from_file(path)?,
            None => Preferences::default(),
        };
        let qth = Qth::from_file(config.resolve_qth_path(&cfg_path))?;
        let cells = config.layout_cells()?;
        let views: Vec<Box<dyn View>> = cells.iter().map(|cell| view_factory(cell)).collect();
        let timectl = TimeController::new(clock.now(), config.effective_throttle(&prefs));

        let shared = Arc::new(ModuleShared {
            name: config.name.clone(),
            inner: Mutex::new(ModuleInner {
                config,
                prefs,
                qth,
                state: ModuleState::default(),
                timectl,
                satellites: HashMap::new(),
                views,
                controllers: Vec::new(),
            }),
            store,
            clock,
        });

        let module = Self {
            shared,
            cfg_path,
            prefs_path,
            view_factory,
            ticker: None,
        };
        let count = module.reload_satellites().await?;
        tracing::info!("module '{}' opened with {} satellites", module.name(), count);
        Ok(module)
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Run one scheduler tick. Dropped, never queued, when the module guard
    /// is held by a reload or a still-running tick.
    pub async fn tick(&self) {
        self.shared.tick().await;
    }

    /// Start periodic ticking at the effective configured interval.
    ///
    /// The first tick fires immediately. Registration is a scoped resource:
    /// the handle lives inside the module and is cancelled exactly once, by
    /// [`Module::stop`] or [`Module::close`].
    pub async fn start(&mut self) -> Result<(), ModuleError> {
        if self.ticker.is_some() {
            return Err(ModuleError::AlreadyRunning);
        }
        let interval_ms = {
            let inner = self.shared.inner.lock().await;
            inner.config.effective_tick_interval(&inner.prefs)
        };
        self.ticker = Some(Ticker::spawn(self.shared.clone(), interval_ms));
        tracing::info!("module '{}' ticking every {} ms", self.shared.name, interval_ms);
        Ok(())
    }

    /// Stop periodic ticking. An in-flight tick finishes first; manual
    /// [`Module::tick`] calls remain possible afterwards.
    pub async fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop().await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Set the time throttle; takes effect on the next tick.
    pub async fn set_throttle(&self, factor: i32) {
        let mut inner = self.shared.inner.lock().await;
        inner.timectl.set_throttle(factor);
        tracing::debug!(
            "module '{}' throttle set to {} ({})",
            self.shared.name,
            inner.timectl.throttle(),
            inner.timectl.state_label()
        );
    }

    /// Request a one-shot manual jump, consumed by the next tick.
    pub async fn set_manual_time(&self, t: DateTime<Utc>) {
        let mut inner = self.shared.inner.lock().await;
        inner.timectl.set_manual_time(t);
    }

    pub async fn simulated_daynum(&self) -> f64 {
        self.shared.inner.lock().await.timectl.current_daynum()
    }

    pub async fn time_mode(&self) -> TimeMode {
        self.shared.inner.lock().await.timectl.mode()
    }

    /// RT / SRT / MAN status label.
    pub async fn time_label(&self) -> &'static str {
        self.shared.inner.lock().await.timectl.state_label()
    }

    pub async fn display_state(&self) -> ModuleState {
        self.shared.inner.lock().await.state
    }

    /// Change display placement. Explicit user action only.
    pub async fn set_display_state(&self, next: ModuleState) {
        let mut inner = self.shared.inner.lock().await;
        if inner.state != next {
            tracing::info!(
                "module '{}' display state {:?} -> {:?}",
                self.shared.name,
                inner.state,
                next
            );
            inner.state = next;
        }
    }

    pub async fn qth(&self) -> Qth {
        self.shared.inner.lock().await.qth.clone()
    }

    /// Snapshot of the satellite mapping.
    pub async fn satellites(&self) -> SatMap {
        self.shared.inner.lock().await.satellites.clone()
    }

    /// Open a controller sub-window; a second open of the same kind is a
    /// no-op.
    pub async fn open_controller(&self, kind: ControllerKind) {
        let mut inner = self.shared.inner.lock().await;
        if inner.controllers.iter().any(|c| c.kind() == kind) {
            tracing::warn!(
                "{:?} controller already open for '{}'",
                kind,
                self.shared.name
            );
            return;
        }
        let now = self.shared.clock.now();
        inner.controllers.push(ControllerWindow::open(kind, now));
    }

    pub async fn close_controller(&self, kind: ControllerKind) {
        let mut inner = self.shared.inner.lock().await;
        if let Some(idx) = inner.controllers.iter().position(|c| c.kind() == kind) {
            inner.controllers.remove(idx).close();
        }
    }

    pub async fn open_controllers(&self) -> Vec<ControllerKind> {
        self.shared
            .inner
            .lock()
            .await
            .controllers
            .iter()
            .map(|c| c.kind())
            .collect()
    }

    /// Replace the satellite mapping from the data store.
    ///
    /// Blocks until the guard is free (ticks are skipped meanwhile). The
    /// replacement is atomic: the store's id list and every record load must
    /// succeed before anything is swapped in, so a failing store leaves the
    /// prior mapping fully intact.
    pub async fn reload_satellites(&self) -> Result<usize, ModuleError> {
        let mut inner = self.shared.inner.lock().await;

        let ids = self.shared.store.satellite_ids(&self.shared.name).await?;
        let mut fresh: SatMap = HashMap::with_capacity(ids.len());
        for catnum in ids {
            let record = self.shared.store.load(catnum).await?;
            fresh.insert(catnum, record);
        }

        let count = fresh.len();
        inner.satellites = fresh;
        tracing::info!("module '{}' loaded {} satellites", self.shared.name, count);
        Ok(count)
    }

    /// Re-read configuration. With `local` set, only module-local settings
    /// (ground station, layout, overrides) are refreshed; otherwise the
    /// daemon preferences are re-read as well and interval/throttle defaults
    /// re-applied.
    ///
    /// Everything is parsed before anything is mutated, so a bad file leaves
    /// all prior in-memory state untouched.
    pub async fn reconfigure(&mut self, local: bool) -> Result<(), ModuleError> {
        let config = ModuleConfig::from_file(&self.cfg_path)?;
        let qth = Qth::from_file(config.resolve_qth_path(&self.cfg_path))?;
        let cells = config.layout_cells()?;
        let prefs = if local {
            None
        } else {
            Some(match &self.prefs_path {
                Some(path) => Preferences::from_file(path)?,
                None => Preferences::default(),
            })
        };

        let new_interval;
        {
            let mut inner = self.shared.inner.lock().await;
            inner.views = cells.iter().map(|cell| (self.view_factory)(cell)).collect();
            inner.qth = qth;
            if let Some(prefs) = prefs {
                inner.timectl.set_throttle(config.effective_throttle(&prefs));
                inner.prefs = prefs;
            }
            new_interval = config.effective_tick_interval(&inner.prefs);
            inner.config = config;
        }

        let needs_restart = self
            .ticker
            .as_ref()
            .is_some_and(|t| t.interval_ms() != new_interval);
        if needs_restart {
            if let Some(ticker) = self.ticker.take() {
                ticker.stop().await;
            }
            self.ticker = Some(Ticker::spawn(self.shared.clone(), new_interval));
            tracing::info!(
                "module '{}' tick interval changed to {} ms",
                self.shared.name,
                new_interval
            );
        }
        tracing::info!(
            "module '{}' reconfigured ({})",
            self.shared.name,
            if local { "local" } else { "full" }
        );
        Ok(())
    }

    /// Close the module.
    ///
    /// Stops future ticks without aborting one in flight, waits for the
    /// guard to come free, then tears down owned controller windows before
    /// the module itself is dropped.
    pub async fn close(mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop().await;
        }
        let mut inner = self.shared.inner.lock().await;
        let controllers: Vec<ControllerWindow> = inner.controllers.drain(..).collect();
        for controller in controllers {
            controller.close();
        }
        tracing::info!("module '{}' closed", self.shared.name);
    }
}
