//! HostRuntime trait: the host primitives the SDK programs against
//!
//! The host runtime owns allocation, builtin values, the format-grammar
//! parse/build primitives, module objects and the error indicator. The SDK
//! never depends on a concrete host: a runtime implements [`HostRuntime`]
//! and installs itself once with [`install`]. Synthesized adapters reach it
//! through [`current`].

use std::ffi::CStr;

use once_cell::sync::OnceCell;

use crate::error::{ErrorKind, GraftError, GraftResult};
use crate::marshal::{Dest, Src};
use crate::module::ModuleDef;
use crate::object::{Handle, Object};
use crate::type_object::TypeObject;

/// Abstract host operations.
///
/// All constructors return a new reference, or null with the error indicator
/// set. The host serializes object dispatch, so implementations need no
/// locking around object state.
pub trait HostRuntime: Send + Sync {
    // ========================================================================
    // Type Readiness
    // ========================================================================

    /// Validate a sealed descriptor and fill host-owned slots (`alloc`, `free`)
    fn ready(&self, kind: &mut TypeObject) -> Result<(), String>;

    // ========================================================================
    // Value Creation
    // ========================================================================

    /// The `None` singleton
    fn none(&self) -> *mut Object;

    /// The singleton binary slots return for "operation not supported"
    fn not_implemented(&self) -> *mut Object;

    /// Boolean object
    fn new_bool(&self, value: bool) -> *mut Object;

    /// Integer object
    fn new_int(&self, value: i64) -> *mut Object;

    /// Float object
    fn new_float(&self, value: f64) -> *mut Object;

    /// String object
    fn new_str(&self, value: &str) -> *mut Object;

    /// Bytes object
    fn new_bytes(&self, value: &[u8]) -> *mut Object;

    /// Tuple object taking ownership of `items`
    fn new_tuple(&self, items: Vec<Handle>) -> *mut Object;

    // ========================================================================
    // Format-Grammar Primitives
    // ========================================================================

    /// Unpack the tuple `args` into `dests` following `format`.
    ///
    /// Returns false with the error indicator set on any mismatch. Units after
    /// `|` may be missing from `args`; their destinations are left untouched.
    fn parse_tuple(&self, args: *mut Object, format: &CStr, dests: &mut [Dest<'_>]) -> bool;

    /// Build one value from `srcs` following `format`
    fn build_value(&self, format: &CStr, srcs: Vec<Src>) -> *mut Object;

    // ========================================================================
    // Errors and Modules
    // ========================================================================

    /// Set the error indicator of the calling thread
    fn set_error(&self, kind: ErrorKind, message: &str);

    /// Create a module object from a process-lifetime definition
    fn create_module(&self, def: &'static ModuleDef) -> *mut Object;

    /// Attach a type to a module under `name`
    fn module_add_type(&self, module: *mut Object, name: &str, kind: &'static TypeObject) -> bool;

    /// Attach an object to a module under `name`, consuming the handle
    fn module_add_object(&self, module: *mut Object, name: &str, value: Handle) -> bool;
}

static HOST: OnceCell<&'static dyn HostRuntime> = OnceCell::new();

/// Install the process host runtime. Only the first call succeeds.
pub fn install(host: &'static dyn HostRuntime) -> GraftResult<()> {
    HOST.set(host).map_err(|_| GraftError::HostAlreadyInstalled)?;
    tracing::debug!("host runtime installed");
    Ok(())
}

/// The installed host runtime, if any
pub fn current() -> Option<&'static dyn HostRuntime> {
    HOST.get().copied()
}

/// The installed host runtime or [`GraftError::NoHost`]
pub fn require() -> GraftResult<&'static dyn HostRuntime> {
    current().ok_or(GraftError::NoHost)
}

/// Set an error on the installed host, if there is one
pub fn raise(kind: ErrorKind, message: &str) {
    if let Some(host) = current() {
        host.set_error(kind, message);
    }
}
