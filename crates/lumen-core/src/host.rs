use crate::concurrency::ShutdownSignal;
use crate::fatal;
use crate::lifecycle::{validate_transition, LifecycleState};
use crate::pump::{self, EventConsumer, EventPump, LogConsumer};
use crate::{dispatch, CoreError};
use lumen_runtime::{select_backend, AppContext, EngineBackend, NativeEngine};
use lumen_schema::{
    baseline_batch, find_profile, get_profile, EngineSettings, FatalPolicy, LumenConfig,
    ProfileError, QualityProfile,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Everything the host needs besides the backend.
#[derive(Debug, Clone)]
pub struct HostOptions {
    pub settings: EngineSettings,
    pub shader_dir: Option<PathBuf>,
    /// Event wait timeout for the pump; `None` blocks until woken.
    pub wait_timeout: Option<Duration>,
    pub fatal_policy: FatalPolicy,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            settings: EngineSettings::default(),
            shader_dir: None,
            wait_timeout: None,
            fatal_policy: FatalPolicy::Terminate,
        }
    }
}

impl HostOptions {
    pub fn from_config(config: &LumenConfig) -> Self {
        Self {
            settings: config.engine.clone(),
            shader_dir: config.shader_dir().map(PathBuf::from),
            wait_timeout: config.event_pump.wait_timeout(),
            fatal_policy: config.fatal.policy,
        }
    }
}

#[derive(Default)]
struct Slot {
    state: LifecycleState,
    engine: Option<Arc<dyn NativeEngine>>,
    pump: Option<EventPump>,
    profile: Option<&'static QualityProfile>,
}

impl Slot {
    fn live_engine(&self) -> Result<&Arc<dyn NativeEngine>, CoreError> {
        match &self.engine {
            Some(engine) if self.state.is_live() => Ok(engine),
            _ => Err(CoreError::NotCreated(self.state)),
        }
    }

    fn initialized_engine(&self) -> Result<&Arc<dyn NativeEngine>, CoreError> {
        match &self.engine {
            Some(engine) if self.state == LifecycleState::Initialized => Ok(engine),
            _ => Err(CoreError::NotInitialized(self.state)),
        }
    }
}

/// Sole owner of the engine handle.
///
/// Lifecycle calls (`create`, `apply_profile`, `init`, `destroy`) are
/// serialized against each other. Dispatches hold a shared lock on the handle
/// for the duration of the native call and may run concurrently with each
/// other and with the event pump; `destroy` waits for in-flight dispatches
/// before releasing the handle.
///
/// Lifecycle calls made from inside an event consumer fail with
/// [`CoreError::CalledFromEventThread`], since `destroy` joins that thread.
pub struct EngineHost {
    backend: Box<dyn EngineBackend>,
    options: HostOptions,
    signal: Arc<ShutdownSignal>,
    lifecycle: Mutex<()>,
    slot: RwLock<Slot>,
}

impl EngineHost {
    pub fn new(backend: Box<dyn EngineBackend>, options: HostOptions) -> Self {
        Self {
            backend,
            options,
            signal: Arc::new(ShutdownSignal::new()),
            lifecycle: Mutex::new(()),
            slot: RwLock::new(Slot::default()),
        }
    }

    pub fn from_config(config: &LumenConfig) -> Result<Self, CoreError> {
        let backend = select_backend(&config.engine.backend)?;
        Ok(Self::new(backend, HostOptions::from_config(config)))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn options(&self) -> &HostOptions {
        &self.options
    }

    pub fn state(&self) -> LifecycleState {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).state
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == LifecycleState::Initialized
    }

    pub fn active_profile(&self) -> Option<&'static QualityProfile> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).profile
    }

    pub fn is_event_pump_running(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .pump
            .as_ref()
            .is_some_and(|p| !p.is_finished())
    }

    /// Allocate the engine handle and apply the baseline option batch.
    ///
    /// If a baseline option is rejected the fresh handle is released and the
    /// state is left as it was.
    pub fn create(&self, ctx: &AppContext) -> Result<(), CoreError> {
        let _guard = self.enter_lifecycle()?;
        let state = self.read_slot()?.state;
        validate_transition(state, LifecycleState::Created)?;

        let engine = self
            .backend
            .create(ctx)
            .map_err(|e| self.fatal(CoreError::EngineCreateFailed(e)))?;

        let settings = &self.options.settings;
        let baseline = baseline_batch(settings, self.options.shader_dir.as_deref());
        debug!("applying baseline batch ({} options)", baseline.len());
        let configured = engine
            .request_log_messages(&settings.log_level)
            .and_then(|()| engine.apply_batch(&baseline));
        if let Err(e) = configured {
            warn!("baseline configuration rejected: {e}");
            engine.terminate_destroy();
            return Err(CoreError::OptionRejected(e));
        }

        let mut slot = self.write_slot()?;
        *slot = Slot {
            state: LifecycleState::Created,
            engine: Some(engine),
            pump: None,
            profile: None,
        };
        info!("engine created ({} backend, client {})", self.backend.name(), ctx.client);
        Ok(())
    }

    /// Apply the catalog profile at `index`: set hardware decoding, the
    /// scalers and debanding, clear the shader chain, then append the
    /// profile's shaders in order.
    ///
    /// An option rejected midway leaves the options applied before it in
    /// effect; the active profile is only recorded on success.
    pub fn apply_profile(&self, index: i64) -> Result<(), CoreError> {
        let profile = get_profile(index)?;
        self.apply_catalog_profile(profile)
    }

    pub fn apply_profile_named(&self, name: &str) -> Result<(), CoreError> {
        let profile =
            find_profile(name).ok_or_else(|| ProfileError::UnknownName(name.to_owned()))?;
        self.apply_catalog_profile(profile)
    }

    fn apply_catalog_profile(&self, profile: &'static QualityProfile) -> Result<(), CoreError> {
        let _guard = self.enter_lifecycle()?;
        let mut slot = self.write_slot()?;
        let engine = slot.live_engine()?;

        let batch = profile.option_batch(self.options.shader_dir.as_deref());
        debug!("applying profile '{}' ({} options)", profile.name, batch.len());
        engine.apply_batch(&batch).map_err(CoreError::OptionRejected)?;

        slot.profile = Some(profile);
        info!("profile '{}' applied", profile.name);
        Ok(())
    }

    /// Initialize the engine and start the event pump, routing events into
    /// `tracing`.
    pub fn init(&self) -> Result<(), CoreError> {
        self.init_with(Box::new(LogConsumer))
    }

    /// Initialize the engine and start the event pump with `consumer`.
    pub fn init_with(&self, consumer: Box<dyn EventConsumer>) -> Result<(), CoreError> {
        let _guard = self.enter_lifecycle()?;
        let mut slot = self.write_slot()?;
        validate_transition(slot.state, LifecycleState::Initialized)?;
        let engine = Arc::clone(slot.live_engine()?);

        engine
            .set_option("config", "no")
            .map_err(CoreError::OptionRejected)?;
        engine
            .initialize()
            .map_err(|e| self.fatal(CoreError::EngineInitFailed(e)))?;

        self.signal.clear();
        let pump = EventPump::start(
            engine,
            Arc::clone(&self.signal),
            consumer,
            self.options.wait_timeout,
        )
        .map_err(|e| self.fatal(CoreError::ThreadSpawnFailed(e)))?;
        debug!("event pump spawned");

        slot.pump = Some(pump);
        slot.state = LifecycleState::Initialized;
        info!("engine initialized");
        Ok(())
    }

    /// Stop the event pump and release the handle. Safe to call any number of
    /// times; only a call that finds a live handle does anything.
    pub fn destroy(&self) -> Result<(), CoreError> {
        let _guard = self.enter_lifecycle()?;
        let (engine, pump) = {
            let mut slot = self.write_slot()?;
            if !slot.state.is_live() {
                debug!("destroy: no live engine (state: {})", slot.state);
                return Ok(());
            }
            slot.state = LifecycleState::Destroyed;
            slot.profile = None;
            (slot.engine.take(), slot.pump.take())
        };

        if let Some(engine) = engine {
            self.signal.raise(engine.as_ref());
            if let Some(pump) = pump {
                pump.join();
                debug!("event pump joined");
            }
            engine.terminate_destroy();
        }
        info!("engine destroyed");
        Ok(())
    }

    /// Submit a command. Only valid while initialized.
    pub fn dispatch<S: AsRef<str>>(&self, args: &[S]) -> Result<(), CoreError> {
        let slot = self.read_slot()?;
        let engine = slot.initialized_engine()?;
        dispatch::dispatch(engine.as_ref(), args)
    }

    pub fn dispatch_string(&self, command: &str) -> Result<(), CoreError> {
        let slot = self.read_slot()?;
        let engine = slot.initialized_engine()?;
        dispatch::dispatch_string(engine.as_ref(), command)
    }

    fn enter_lifecycle(&self) -> Result<MutexGuard<'_, ()>, CoreError> {
        if pump::on_event_thread_of(&self.signal) {
            return Err(CoreError::CalledFromEventThread);
        }
        self.lifecycle.lock().map_err(|_| CoreError::LockPoisoned)
    }

    fn read_slot(&self) -> Result<RwLockReadGuard<'_, Slot>, CoreError> {
        self.slot.read().map_err(|_| CoreError::LockPoisoned)
    }

    fn write_slot(&self) -> Result<RwLockWriteGuard<'_, Slot>, CoreError> {
        self.slot.write().map_err(|_| CoreError::LockPoisoned)
    }

    fn fatal(&self, err: CoreError) -> CoreError {
        fatal::enforce(self.options.fatal_policy, err)
    }
}

impl Drop for EngineHost {
    fn drop(&mut self) {
        let slot = self.slot.get_mut().unwrap_or_else(PoisonError::into_inner);
        if !slot.state.is_live() {
            return;
        }
        slot.state = LifecycleState::Destroyed;
        let engine = slot.engine.take();
        let events = slot.pump.take();
        if let Some(engine) = engine {
            self.signal.raise(engine.as_ref());
            // The last reference may be dropped by a consumer; the pump then
            // exits on its own once the consumer returns.
            if let Some(events) = events.filter(|_| !pump::on_event_thread_of(&self.signal)) {
                events.join();
            }
            engine.terminate_destroy();
        }
        debug!("engine host dropped");
    }
}
