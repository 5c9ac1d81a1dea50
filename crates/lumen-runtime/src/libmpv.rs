//! libmpv backend, loaded at run time.
//!
//! The client library is opened with `libloading` on first use, so binaries
//! and tests that never select this backend do not need libmpv installed.
#![allow(unsafe_code)]

use crate::args::CommandArgs;
use crate::backend::{AppContext, EngineBackend, NativeEngine};
use crate::event::{EngineEvent, EventKind, LogMessage};
use crate::RuntimeError;
use libloading::Library;
use std::ffi::{c_char, c_double, c_int, c_void, CStr, CString};
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info};

const LIBRARY_NAMES: &[&str] = &[
    "libmpv.so.2",
    "libmpv.so.1",
    "libmpv.so",
    "libmpv.2.dylib",
    "libmpv.dylib",
    "libmpv-2.dll",
    "mpv-2.dll",
];

const EVENT_NONE: c_int = 0;
const EVENT_LOG_MESSAGE: c_int = 2;

type Handle = c_void;

#[repr(C)]
struct RawEvent {
    event_id: c_int,
    error: c_int,
    reply_userdata: u64,
    data: *mut c_void,
}

#[repr(C)]
struct RawLogMessage {
    prefix: *const c_char,
    level: *const c_char,
    text: *const c_char,
    #[allow(dead_code)]
    log_level: c_int,
}

/// Client API entry points resolved from the loaded library.
struct Api {
    create: unsafe extern "C" fn() -> *mut Handle,
    set_option_string: unsafe extern "C" fn(*mut Handle, *const c_char, *const c_char) -> c_int,
    request_log_messages: unsafe extern "C" fn(*mut Handle, *const c_char) -> c_int,
    command_string: unsafe extern "C" fn(*mut Handle, *const c_char) -> c_int,
    initialize: unsafe extern "C" fn(*mut Handle) -> c_int,
    command: unsafe extern "C" fn(*mut Handle, *mut *const c_char) -> c_int,
    wait_event: unsafe extern "C" fn(*mut Handle, c_double) -> *mut RawEvent,
    wakeup: unsafe extern "C" fn(*mut Handle),
    terminate_destroy: unsafe extern "C" fn(*mut Handle),
    error_string: unsafe extern "C" fn(c_int) -> *const c_char,
    // Keeps the function pointers above valid.
    _library: Library,
}

impl Api {
    fn load() -> Result<Self, RuntimeError> {
        let mut last_error = String::from("no candidate library names");
        for name in LIBRARY_NAMES {
            // SAFETY: loading libmpv runs its initializers, which have no
            // preconditions beyond being loaded once per process image.
            match unsafe { Library::new(name) } {
                Ok(library) => {
                    debug!("loaded {name}");
                    return Self::resolve(library);
                }
                Err(e) => last_error = format!("{name}: {e}"),
            }
        }
        Err(RuntimeError::LibraryLoad(last_error))
    }

    fn resolve(library: Library) -> Result<Self, RuntimeError> {
        // SAFETY: each symbol is declared with the signature libmpv's
        // client.h gives it; the library outlives the copied pointers because
        // it is stored alongside them.
        unsafe {
            Ok(Self {
                create: symbol(&library, b"mpv_create\0")?,
                set_option_string: symbol(&library, b"mpv_set_option_string\0")?,
                request_log_messages: symbol(&library, b"mpv_request_log_messages\0")?,
                command_string: symbol(&library, b"mpv_command_string\0")?,
                initialize: symbol(&library, b"mpv_initialize\0")?,
                command: symbol(&library, b"mpv_command\0")?,
                wait_event: symbol(&library, b"mpv_wait_event\0")?,
                wakeup: symbol(&library, b"mpv_wakeup\0")?,
                terminate_destroy: symbol(&library, b"mpv_terminate_destroy\0")?,
                error_string: symbol(&library, b"mpv_error_string\0")?,
                _library: library,
            })
        }
    }

    fn describe(&self, code: c_int) -> String {
        // SAFETY: mpv_error_string accepts any value and returns a static string.
        let ptr = unsafe { (self.error_string)(code) };
        cstr_lossy(ptr)
    }
}

unsafe fn symbol<T: Copy>(library: &Library, name: &[u8]) -> Result<T, RuntimeError> {
    library.get::<T>(name).map(|s| *s).map_err(|e| {
        RuntimeError::LibraryLoad(format!(
            "missing symbol {}: {e}",
            String::from_utf8_lossy(&name[..name.len() - 1])
        ))
    })
}

fn cstr_lossy(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    // SAFETY: non-null pointers handed out by libmpv are NUL-terminated and
    // valid until the next call on the same handle.
    unsafe { CStr::from_ptr(ptr) }
        .to_string_lossy()
        .into_owned()
}

fn to_cstring(s: &str) -> Result<CString, RuntimeError> {
    CString::new(s).map_err(|_| RuntimeError::InvalidString(s.to_owned()))
}

pub struct LibMpvBackend {
    api: OnceLock<Result<Arc<Api>, String>>,
}

impl Default for LibMpvBackend {
    fn default() -> Self {
        Self {
            api: OnceLock::new(),
        }
    }
}

impl LibMpvBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn api(&self) -> Result<Arc<Api>, RuntimeError> {
        self.api
            .get_or_init(|| Api::load().map(Arc::new).map_err(|e| e.to_string()))
            .clone()
            .map_err(RuntimeError::LibraryLoad)
    }
}

impl EngineBackend for LibMpvBackend {
    fn name(&self) -> &'static str {
        "libmpv"
    }

    fn available(&self) -> bool {
        self.api().is_ok()
    }

    fn create(&self, ctx: &AppContext) -> Result<Arc<dyn NativeEngine>, RuntimeError> {
        let api = self.api()?;
        set_numeric_locale();

        // SAFETY: mpv_create has no preconditions; null signals failure.
        let handle = unsafe { (api.create)() };
        if handle.is_null() {
            return Err(RuntimeError::CreateFailed("mpv_create returned null".to_owned()));
        }
        info!("created libmpv handle for client '{}'", ctx.client);
        Ok(Arc::new(MpvEngine {
            api,
            handle: AtomicPtr::new(handle),
        }))
    }
}

/// libmpv refuses to create a handle unless numbers are formatted the C way.
fn set_numeric_locale() {
    // SAFETY: the locale string is a valid NUL-terminated literal. setlocale
    // is not thread-safe, but it runs only on the lifecycle path, which the
    // host serializes.
    unsafe {
        libc::setlocale(libc::LC_NUMERIC, b"C\0".as_ptr().cast());
    }
}

/// A live `mpv_handle`.
///
/// The client API is thread-safe apart from two rules the host upholds: a
/// single `mpv_wait_event` caller, and no call racing `mpv_terminate_destroy`.
/// The handle is swapped to null on termination so it is released once.
pub struct MpvEngine {
    api: Arc<Api>,
    handle: AtomicPtr<Handle>,
}

impl MpvEngine {
    fn handle(&self, call: &'static str) -> Result<*mut Handle, RuntimeError> {
        let handle = self.handle.load(Ordering::Acquire);
        if handle.is_null() {
            tracing::warn!("{call} on a terminated libmpv handle");
            return Err(RuntimeError::Terminated);
        }
        Ok(handle)
    }

    fn check(&self, call: &'static str, code: c_int, detail: &str) -> Result<(), RuntimeError> {
        if code >= 0 {
            return Ok(());
        }
        Err(RuntimeError::Engine {
            call,
            code,
            message: format!("{detail}: {}", self.api.describe(code)),
        })
    }
}

impl NativeEngine for MpvEngine {
    fn set_option(&self, name: &str, value: &str) -> Result<(), RuntimeError> {
        let handle = self.handle("mpv_set_option_string")?;
        let c_name = to_cstring(name)?;
        let c_value = to_cstring(value)?;
        // SAFETY: live handle, NUL-terminated strings that outlive the call.
        let code =
            unsafe { (self.api.set_option_string)(handle, c_name.as_ptr(), c_value.as_ptr()) };
        self.check("mpv_set_option_string", code, &format!("{name}={value}"))
    }

    fn request_log_messages(&self, level: &str) -> Result<(), RuntimeError> {
        let handle = self.handle("mpv_request_log_messages")?;
        let c_level = to_cstring(level)?;
        // SAFETY: live handle, NUL-terminated string that outlives the call.
        let code = unsafe { (self.api.request_log_messages)(handle, c_level.as_ptr()) };
        self.check("mpv_request_log_messages", code, level)
    }

    fn command_string(&self, command: &str) -> Result<(), RuntimeError> {
        let handle = self.handle("mpv_command_string")?;
        let c_command = to_cstring(command)?;
        // SAFETY: live handle, NUL-terminated string that outlives the call.
        let code = unsafe { (self.api.command_string)(handle, c_command.as_ptr()) };
        self.check("mpv_command_string", code, command)
    }

    fn initialize(&self) -> Result<(), RuntimeError> {
        let handle = self.handle("mpv_initialize")?;
        // SAFETY: live handle.
        let code = unsafe { (self.api.initialize)(handle) };
        self.check("mpv_initialize", code, "initialize")
    }

    fn command(&self, args: &CommandArgs) -> Result<(), RuntimeError> {
        let handle = self.handle("mpv_command")?;
        // SAFETY: `args` keeps a null-terminated pointer vector and the
        // strings it points into alive for the duration of the call; libmpv
        // only reads through the pointers.
        let code = unsafe { (self.api.command)(handle, args.as_ptr().cast_mut()) };
        let name = args
            .name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.check("mpv_command", code, &name)
    }

    fn wait_event(&self, timeout: Option<Duration>) -> Option<EngineEvent> {
        let handle = self.handle.load(Ordering::Acquire);
        if handle.is_null() {
            return None;
        }
        let timeout = timeout.map_or(-1.0, |t| t.as_secs_f64());
        // SAFETY: live handle; the pump is the only caller of wait_event.
        let raw = unsafe { (self.api.wait_event)(handle, timeout) };
        if raw.is_null() {
            return None;
        }
        // SAFETY: libmpv returns a pointer to an event it owns, valid until
        // the next wait_event call on this handle, which cannot happen before
        // this function returns.
        let raw = unsafe { &*raw };
        if raw.event_id == EVENT_NONE {
            return None;
        }

        let mut event = EngineEvent::new(EventKind::from_id(raw.event_id as u32));
        event.error = raw.error;
        event.reply_userdata = raw.reply_userdata;
        if raw.event_id == EVENT_LOG_MESSAGE && !raw.data.is_null() {
            // SAFETY: log-message events carry an mpv_event_log_message.
            let msg = unsafe { &*raw.data.cast::<RawLogMessage>() };
            event.log = Some(LogMessage {
                prefix: cstr_lossy(msg.prefix),
                level: cstr_lossy(msg.level),
                text: cstr_lossy(msg.text),
            });
        }
        Some(event)
    }

    fn wakeup(&self) {
        let handle = self.handle.load(Ordering::Acquire);
        if !handle.is_null() {
            // SAFETY: live handle; mpv_wakeup may be called from any thread.
            unsafe { (self.api.wakeup)(handle) };
        }
    }

    fn terminate_destroy(&self) {
        let handle = self.handle.swap(std::ptr::null_mut(), Ordering::AcqRel);
        if handle.is_null() {
            return;
        }
        debug!("terminating libmpv handle");
        // SAFETY: the swap above hands this thread the only copy of the
        // handle, so it is destroyed exactly once.
        unsafe { (self.api.terminate_destroy)(handle) };
    }
}

impl Drop for MpvEngine {
    fn drop(&mut self) {
        self.terminate_destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_probe_does_not_panic() {
        let backend = LibMpvBackend::new();
        let first = backend.available();
        assert_eq!(backend.available(), first);
    }

    #[test]
    fn raw_event_layout_matches_client_header() {
        assert_eq!(
            std::mem::size_of::<RawEvent>(),
            8 + 8 + std::mem::size_of::<*mut c_void>()
        );
        assert_eq!(std::mem::offset_of!(RawEvent, reply_userdata), 8);
    }

    #[test]
    #[ignore = "requires libmpv to be installed"]
    fn libmpv_create_initialize_terminate() {
        let backend = LibMpvBackend::new();
        let engine = backend.create(&AppContext::default()).unwrap();
        engine.set_option("vo", "null").unwrap();
        engine.set_option("ao", "null").unwrap();
        engine.set_option("config", "no").unwrap();
        engine.initialize().unwrap();
        engine.wakeup();
        assert!(engine.wait_event(Some(Duration::from_secs(1))).is_none());
        engine.terminate_destroy();
        assert!(matches!(
            engine.set_option("pause", "yes"),
            Err(RuntimeError::Terminated)
        ));
    }
}
