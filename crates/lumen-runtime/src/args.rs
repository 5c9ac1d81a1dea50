//! Scoped marshalling of command argument lists.

use std::ffi::{c_char, CStr, CString};
use thiserror::Error;

/// Largest argument list a single command may carry.
pub const MAX_COMMAND_ARGS: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarshalError {
    #[error("too many command arguments: {count} (max {max})")]
    TooManyArguments { count: usize, max: usize },
    #[error("command argument {index} contains an interior NUL byte")]
    InteriorNul { index: usize },
}

/// One command invocation, marshalled for the native call.
///
/// Owns a C string per argument plus a contiguous pointer vector with one
/// extra slot that is always null. The pointers borrow from `strings`, whose
/// heap buffers never move once built; everything is released on drop, on
/// every exit path. The value is `!Send`: it lives for a single synchronous
/// call on the caller's thread.
#[derive(Debug)]
pub struct CommandArgs {
    strings: Vec<CString>,
    ptrs: Vec<*const c_char>,
}

impl CommandArgs {
    /// Marshal `args`. The bound is checked before any argument is converted.
    pub fn marshal<S: AsRef<str>>(args: &[S]) -> Result<Self, MarshalError> {
        if args.len() > MAX_COMMAND_ARGS {
            return Err(MarshalError::TooManyArguments {
                count: args.len(),
                max: MAX_COMMAND_ARGS,
            });
        }

        let strings = args
            .iter()
            .enumerate()
            .map(|(index, arg)| {
                CString::new(arg.as_ref()).map_err(|_| MarshalError::InteriorNul { index })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut ptrs = Vec::with_capacity(strings.len() + 1);
        ptrs.extend(strings.iter().map(|s| s.as_ptr()));
        ptrs.push(std::ptr::null());

        Ok(Self { strings, ptrs })
    }

    /// Null-terminated `const char **` view, valid while `self` is alive.
    pub fn as_ptr(&self) -> *const *const c_char {
        self.ptrs.as_ptr()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CStr> {
        self.strings.iter().map(CString::as_c_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Command name, i.e. the first argument.
    pub fn name(&self) -> Option<&CStr> {
        self.strings.first().map(CString::as_c_str)
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.iter()
            .map(|s| s.to_string_lossy().into_owned())
            .collect()
    }
}
