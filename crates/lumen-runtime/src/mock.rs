use crate::args::CommandArgs;
use crate::backend::{AppContext, EngineBackend, NativeEngine};
use crate::event::{EngineEvent, EventKind};
use crate::RuntimeError;
use lumen_schema::{EngineOption, SHADERS_APPEND, SHADERS_CLEAR};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

// libmpv error codes the mock reports.
const ERROR_UNINITIALIZED: i32 = -3;
const ERROR_OPTION_NOT_FOUND: i32 = -5;
const ERROR_COMMAND: i32 = -12;
const ERROR_GENERIC: i32 = -20;

#[derive(Default)]
struct MockState {
    // Cumulative across handles.
    options: Vec<EngineOption>,
    log_requests: Vec<String>,
    command_strings: Vec<String>,
    commands: Vec<Vec<String>>,
    creates: usize,
    terminations: usize,
    wakeups: usize,
    live_handles: usize,

    // Per handle; reset on create.
    values: BTreeMap<String, String>,
    shader_chain: Vec<String>,
    initialized: bool,
    pending_wakeup: bool,
    queue: VecDeque<EngineEvent>,

    fail_create: bool,
    fail_init: bool,
    reject_commands: bool,
    silent: bool,
    rejected_options: Vec<String>,
}

/// Shared view into the mock engine: records every call and lets tests
/// script events and failures.
#[derive(Default)]
pub struct MockProbe {
    state: Mutex<MockState>,
    cond: Condvar,
}

impl MockProbe {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn options(&self) -> Vec<EngineOption> {
        self.lock().options.clone()
    }

    /// Current value of `name` on the live handle.
    pub fn option(&self, name: &str) -> Option<String> {
        self.lock().values.get(name).cloned()
    }

    pub fn shader_chain(&self) -> Vec<String> {
        self.lock().shader_chain.clone()
    }

    pub fn log_requests(&self) -> Vec<String> {
        self.lock().log_requests.clone()
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        self.lock().commands.clone()
    }

    pub fn command_strings(&self) -> Vec<String> {
        self.lock().command_strings.clone()
    }

    pub fn creates(&self) -> usize {
        self.lock().creates
    }

    pub fn terminations(&self) -> usize {
        self.lock().terminations
    }

    pub fn wakeups(&self) -> usize {
        self.lock().wakeups
    }

    pub fn live_handles(&self) -> usize {
        self.lock().live_handles
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    pub fn push_event(&self, event: EngineEvent) {
        self.lock().queue.push_back(event);
        self.cond.notify_all();
    }

    pub fn fail_create(&self, fail: bool) {
        self.lock().fail_create = fail;
    }

    pub fn fail_init(&self, fail: bool) {
        self.lock().fail_init = fail;
    }

    pub fn reject_commands(&self, reject: bool) {
        self.lock().reject_commands = reject;
    }

    pub fn reject_option(&self, name: &str) {
        self.lock().rejected_options.push(name.to_owned());
    }

    /// Stop `loadfile`/`quit` from producing playback events.
    pub fn set_silent(&self, silent: bool) {
        self.lock().silent = silent;
    }
}

pub struct MockBackend {
    probe: Arc<MockProbe>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::with_probe(Arc::new(MockProbe::new()))
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probe(probe: Arc<MockProbe>) -> Self {
        Self { probe }
    }

    pub fn probe(&self) -> Arc<MockProbe> {
        Arc::clone(&self.probe)
    }
}

impl EngineBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn available(&self) -> bool {
        true
    }

    fn create(&self, _ctx: &AppContext) -> Result<Arc<dyn NativeEngine>, RuntimeError> {
        let mut state = self.probe.lock();
        if state.fail_create {
            return Err(RuntimeError::CreateFailed(
                "mock engine refused allocation".to_owned(),
            ));
        }
        state.creates += 1;
        state.live_handles += 1;
        state.values.clear();
        state.shader_chain.clear();
        state.initialized = false;
        state.pending_wakeup = false;
        state.queue.clear();
        drop(state);

        Ok(Arc::new(MockEngine {
            probe: Arc::clone(&self.probe),
            terminated: AtomicBool::new(false),
        }))
    }
}

pub struct MockEngine {
    probe: Arc<MockProbe>,
    terminated: AtomicBool,
}

impl MockEngine {
    fn check_live(&self, call: &'static str) -> Result<(), RuntimeError> {
        if self.terminated.load(Ordering::SeqCst) {
            return Err(RuntimeError::Engine {
                call,
                code: ERROR_UNINITIALIZED,
                message: "handle terminated".to_owned(),
            });
        }
        Ok(())
    }
}

impl NativeEngine for MockEngine {
    fn set_option(&self, name: &str, value: &str) -> Result<(), RuntimeError> {
        self.check_live("set_option")?;
        let mut state = self.probe.lock();
        if state.rejected_options.iter().any(|n| n == name) {
            return Err(RuntimeError::Engine {
                call: "set_option",
                code: ERROR_OPTION_NOT_FOUND,
                message: format!("{name}={value}: option not found"),
            });
        }
        state.options.push(EngineOption {
            name: name.to_owned(),
            value: value.to_owned(),
        });
        match name {
            SHADERS_CLEAR => state.shader_chain.clear(),
            SHADERS_APPEND => state.shader_chain.push(value.to_owned()),
            _ => {
                state.values.insert(name.to_owned(), value.to_owned());
            }
        }
        Ok(())
    }

    fn request_log_messages(&self, level: &str) -> Result<(), RuntimeError> {
        self.check_live("request_log_messages")?;
        self.probe.lock().log_requests.push(level.to_owned());
        Ok(())
    }

    fn command_string(&self, command: &str) -> Result<(), RuntimeError> {
        self.check_live("command_string")?;
        let mut state = self.probe.lock();
        if !state.initialized {
            return Err(RuntimeError::Engine {
                call: "command_string",
                code: ERROR_UNINITIALIZED,
                message: "engine not initialized".to_owned(),
            });
        }
        if state.reject_commands {
            return Err(RuntimeError::Engine {
                call: "command_string",
                code: ERROR_COMMAND,
                message: format!("'{command}' rejected"),
            });
        }
        state.command_strings.push(command.to_owned());
        Ok(())
    }

    fn initialize(&self) -> Result<(), RuntimeError> {
        self.check_live("initialize")?;
        let mut state = self.probe.lock();
        if state.fail_init || state.initialized {
            return Err(RuntimeError::Engine {
                call: "initialize",
                code: ERROR_GENERIC,
                message: "mock initialization failed".to_owned(),
            });
        }
        state.initialized = true;
        Ok(())
    }

    fn command(&self, args: &CommandArgs) -> Result<(), RuntimeError> {
        self.check_live("command")?;
        let mut state = self.probe.lock();
        if !state.initialized {
            return Err(RuntimeError::Engine {
                call: "command",
                code: ERROR_UNINITIALIZED,
                message: "engine not initialized".to_owned(),
            });
        }
        let argv = args.to_strings();
        state.commands.push(argv.clone());
        if state.reject_commands {
            return Err(RuntimeError::Engine {
                call: "command",
                code: ERROR_COMMAND,
                message: format!("'{}' rejected", argv.join(" ")),
            });
        }

        if !state.silent {
            match argv.first().map(String::as_str) {
                Some("loadfile") => {
                    for kind in [EventKind::StartFile, EventKind::FileLoaded, EventKind::EndFile] {
                        state.queue.push_back(EngineEvent::new(kind));
                    }
                }
                Some("quit") => state.queue.push_back(EngineEvent::new(EventKind::Shutdown)),
                _ => {}
            }
            self.probe.cond.notify_all();
        }
        Ok(())
    }

    fn wait_event(&self, timeout: Option<Duration>) -> Option<EngineEvent> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.probe.lock();
        loop {
            if self.terminated.load(Ordering::SeqCst) {
                return None;
            }
            if let Some(event) = state.queue.pop_front() {
                return Some(event);
            }
            if state.pending_wakeup {
                state.pending_wakeup = false;
                return None;
            }
            state = match deadline {
                None => self
                    .probe
                    .cond
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return None;
                    }
                    self.probe
                        .cond
                        .wait_timeout(state, remaining)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    fn wakeup(&self) {
        let mut state = self.probe.lock();
        state.wakeups += 1;
        state.pending_wakeup = true;
        drop(state);
        self.probe.cond.notify_all();
    }

    fn terminate_destroy(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut state = self.probe.lock();
        state.terminations += 1;
        state.live_handles -= 1;
        state.initialized = false;
        drop(state);
        self.probe.cond.notify_all();
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        self.terminate_destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn engine() -> (Arc<MockProbe>, Arc<dyn NativeEngine>) {
        let backend = MockBackend::new();
        let probe = backend.probe();
        let engine = backend.create(&AppContext::default()).unwrap();
        (probe, engine)
    }

    #[test]
    fn mock_lifecycle() {
        let (probe, engine) = engine();
        assert_eq!(probe.creates(), 1);
        assert_eq!(probe.live_handles(), 1);

        assert!(engine.command(&CommandArgs::marshal(&["stop"]).unwrap()).is_err());
        engine.initialize().unwrap();
        assert!(probe.is_initialized());
        assert!(engine.initialize().is_err());

        engine
            .command(&CommandArgs::marshal(&["seek", "10"]).unwrap())
            .unwrap();
        assert_eq!(probe.commands(), [vec!["seek", "10"]]);

        engine.terminate_destroy();
        engine.terminate_destroy();
        assert_eq!(probe.terminations(), 1);
        assert_eq!(probe.live_handles(), 0);
        assert!(engine.set_option("vo", "gpu").is_err());
    }

    #[test]
    fn shader_chain_emulation() {
        let (probe, engine) = engine();
        engine.set_option(SHADERS_APPEND, "a.glsl").unwrap();
        engine.set_option(SHADERS_APPEND, "b.glsl").unwrap();
        engine.set_option(SHADERS_CLEAR, "").unwrap();
        engine.set_option(SHADERS_APPEND, "c.glsl").unwrap();
        assert_eq!(probe.shader_chain(), ["c.glsl"]);
        assert_eq!(probe.options().len(), 4);
    }

    #[test]
    fn loadfile_produces_playback_events() {
        let (_probe, engine) = engine();
        engine.initialize().unwrap();
        engine
            .command(&CommandArgs::marshal(&["loadfile", "/tmp/a.mkv"]).unwrap())
            .unwrap();

        let kinds: Vec<EventKind> = (0..3)
            .filter_map(|_| engine.wait_event(Some(Duration::ZERO)))
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            [EventKind::StartFile, EventKind::FileLoaded, EventKind::EndFile]
        );
        assert!(engine.wait_event(Some(Duration::from_millis(10))).is_none());
    }

    #[test]
    fn wakeup_interrupts_blocking_wait() {
        let (probe, engine) = engine();
        let waiter = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.wait_event(None))
        };
        thread::sleep(Duration::from_millis(20));
        engine.wakeup();
        assert!(waiter.join().unwrap().is_none());
        assert_eq!(probe.wakeups(), 1);
    }

    #[test]
    fn wakeup_before_wait_is_not_lost() {
        let (_probe, engine) = engine();
        engine.wakeup();
        assert!(engine.wait_event(None).is_none());
    }

    #[test]
    fn scripted_failures() {
        let backend = MockBackend::new();
        let probe = backend.probe();

        probe.fail_create(true);
        assert!(matches!(
            backend.create(&AppContext::default()),
            Err(RuntimeError::CreateFailed(_))
        ));
        probe.fail_create(false);

        let engine = backend.create(&AppContext::default()).unwrap();
        probe.fail_init(true);
        assert!(engine.initialize().is_err());
        probe.fail_init(false);
        engine.initialize().unwrap();

        probe.reject_commands(true);
        let err = engine
            .command(&CommandArgs::marshal(&["loadfile", "x"]).unwrap())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Engine { code: ERROR_COMMAND, .. }));
    }

    #[test]
    fn create_resets_per_handle_state() {
        let backend = MockBackend::new();
        let probe = backend.probe();

        let first = backend.create(&AppContext::default()).unwrap();
        first.set_option("deband", "no").unwrap();
        first.set_option(SHADERS_APPEND, "a.glsl").unwrap();
        first.terminate_destroy();

        let _second = backend.create(&AppContext::default()).unwrap();
        assert_eq!(probe.option("deband"), None);
        assert!(probe.shader_chain().is_empty());
        assert_eq!(probe.options().len(), 2);
    }
}
