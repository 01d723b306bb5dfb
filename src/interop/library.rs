//! Shared library loading for the Python runtime
//!
//! When the bridge itself is loaded into a host as a plugin, the interpreter's
//! symbols are private to the bridge. Python extension modules (`.so` files
//! imported later) link against those symbols, so the library is reopened with
//! global visibility before the interpreter starts.

use core::ffi::c_void;
use core::ptr::NonNull;
use std::ffi::{CStr, CString};

use crate::errors::BridgeError;
use crate::logging::{debug, info};

/// Handle to a dynamically loaded library
pub struct Library {
    handle: NonNull<c_void>,
    name: String,
}

impl Library {
    /// Load with `RTLD_NOW | RTLD_GLOBAL` so later libraries can bind to its symbols
    #[cfg(unix)]
    pub fn load_global(name: &str) -> Result<Self, BridgeError> {
        let cname = CString::new(name)
            .map_err(|_| BridgeError::LoadFailure(format!("invalid library name {:?}", name)))?;

        // SAFETY: `cname` is NUL-terminated and outlives the call
        let handle = unsafe { libc::dlopen(cname.as_ptr(), libc::RTLD_NOW | libc::RTLD_GLOBAL) };
        match NonNull::new(handle) {
            Some(handle) => {
                info!(target: "bridge", library = name, "loaded python library with global symbols");
                Ok(Self {
                    handle,
                    name: name.to_string(),
                })
            }
            None => Err(BridgeError::LoadFailure(format!("{}: {}", name, last_error()))),
        }
    }

    #[cfg(not(unix))]
    pub fn load_global(name: &str) -> Result<Self, BridgeError> {
        Err(BridgeError::LoadFailure(format!(
            "{}: global library loading is only supported on unix",
            name
        )))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the library exports `symbol`
    #[cfg(unix)]
    pub fn has_symbol(&self, symbol: &str) -> bool {
        let Ok(csymbol) = CString::new(symbol) else {
            return false;
        };
        // SAFETY: the handle stays open until drop
        let ptr = unsafe { libc::dlsym(self.handle.as_ptr(), csymbol.as_ptr()) };
        !ptr.is_null()
    }

    #[cfg(not(unix))]
    pub fn has_symbol(&self, _symbol: &str) -> bool {
        false
    }
}

#[cfg(unix)]
fn last_error() -> String {
    // SAFETY: dlerror returns a thread-local message or null
    unsafe {
        let err = libc::dlerror();
        if err.is_null() {
            "unknown error".into()
        } else {
            CStr::from_ptr(err).to_string_lossy().into_owned()
        }
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        debug!(target: "bridge", library = %self.name, "closing library handle");
        // SAFETY: the handle came from a successful dlopen and is closed once
        #[cfg(unix)]
        unsafe {
            libc::dlclose(self.handle.as_ptr());
        };
    }
}
