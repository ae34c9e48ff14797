//! Graft reference host - a minimal in-process host runtime
//!
//! Implements [`HostRuntime`] over boxed builtin objects and a generic
//! zeroing allocator, so extension types can be registered, instantiated
//! and driven through their slots without an external interpreter.
//!
//! ```ignore
//! let host = graft_host::install();
//! let module = graft_host::load(graft_module_init)?;
//! let result = graft_host::call(&module, "count", &graft_host::objects::tuple(vec![]))?;
//! ```

pub mod error;
pub mod grammar;
pub mod objects;
pub mod protocol;

use std::ffi::CStr;
use std::mem;

use graft_sdk::{Dest, ErrorKind, Handle, HostRuntime, ModuleDef, Object, Src, TypeObject};
use once_cell::sync::OnceCell;

pub use error::{error_occurred, set_error, take_error, HostError, HostResult};
pub use objects::{alloc_stats, AllocStats, Attr};
pub use protocol::{
    binary_op, call, inplace_op, instantiate, invoke, module_attr, module_object, module_type,
    repr_of, str_of, to_float, to_int, truthy, unary_op,
};

/// The reference host runtime
#[derive(Debug, Default)]
pub struct ReferenceHost;

static HOST: ReferenceHost = ReferenceHost;
static INSTALLED: OnceCell<()> = OnceCell::new();

/// Install the reference host as the process host runtime.
///
/// Idempotent; later calls return the same instance.
pub fn install() -> &'static ReferenceHost {
    INSTALLED.get_or_init(|| match graft_sdk::host::install(&HOST) {
        Ok(()) => tracing::debug!("reference host installed"),
        Err(err) => tracing::warn!(%err, "reference host not installed"),
    });
    &HOST
}

/// Run a module entry point and take ownership of the module it returns.
pub fn load(init: extern "C" fn() -> *mut Object) -> HostResult<Handle> {
    install();
    let module = init();
    unsafe { Handle::from_owned(module) }.ok_or_else(|| error::take_or_missing("module init"))
}

fn raise(err: HostError) {
    error::set_error(err.kind, &err.message);
}

impl HostRuntime for ReferenceHost {
    fn ready(&self, kind: &mut TypeObject) -> Result<(), String> {
        if kind.name.is_empty() {
            return Err("type name is empty".to_string());
        }
        if kind.basic_size < mem::size_of::<Object>() {
            return Err(format!(
                "instance size {} is smaller than the object header",
                kind.basic_size
            ));
        }
        if !kind.basic_align.is_power_of_two() || kind.basic_align < mem::align_of::<Object>() {
            return Err(format!("invalid instance alignment {}", kind.basic_align));
        }
        kind.alloc = Some(objects::generic_alloc);
        kind.free = Some(objects::generic_free);
        tracing::debug!(name = kind.name, size = kind.basic_size, "type ready");
        Ok(())
    }

    fn none(&self) -> *mut Object {
        objects::none_ptr()
    }

    fn not_implemented(&self) -> *mut Object {
        objects::not_implemented_ptr()
    }

    fn new_bool(&self, value: bool) -> *mut Object {
        objects::bool_ptr(value)
    }

    fn new_int(&self, value: i64) -> *mut Object {
        objects::int(value).into_raw()
    }

    fn new_float(&self, value: f64) -> *mut Object {
        objects::float(value).into_raw()
    }

    fn new_str(&self, value: &str) -> *mut Object {
        objects::string(value).into_raw()
    }

    fn new_bytes(&self, value: &[u8]) -> *mut Object {
        objects::bytes(value).into_raw()
    }

    fn new_tuple(&self, items: Vec<Handle>) -> *mut Object {
        objects::tuple(items).into_raw()
    }

    fn parse_tuple(&self, args: *mut Object, format: &CStr, dests: &mut [Dest<'_>]) -> bool {
        match grammar::parse_tuple(args, format, dests) {
            Ok(()) => true,
            Err(err) => {
                raise(err);
                false
            }
        }
    }

    fn build_value(&self, format: &CStr, srcs: Vec<Src>) -> *mut Object {
        match grammar::build_value(format, srcs) {
            Ok(value) => value.into_raw(),
            Err(err) => {
                raise(err);
                std::ptr::null_mut()
            }
        }
    }

    fn set_error(&self, kind: ErrorKind, message: &str) {
        error::set_error(kind, message);
    }

    fn create_module(&self, def: &'static ModuleDef) -> *mut Object {
        tracing::debug!(module = def.name(), "creating module");
        objects::module(def).into_raw()
    }

    fn module_add_type(&self, module: *mut Object, name: &str, kind: &'static TypeObject) -> bool {
        self.add_attr(module, name, Attr::Type(kind))
    }

    fn module_add_object(&self, module: *mut Object, name: &str, value: Handle) -> bool {
        self.add_attr(module, name, Attr::Object(value))
    }
}

impl ReferenceHost {
    fn add_attr(&self, module: *mut Object, name: &str, attr: Attr) -> bool {
        match unsafe { objects::as_module_object(module) } {
            Some(m) => {
                tracing::trace!(module = m.def.name(), name, "attribute added");
                m.attrs.insert(name.to_string(), attr);
                true
            }
            None => {
                error::set_error(
                    ErrorKind::TypeError,
                    &format!("'{}' object is not a module", protocol::type_name(module)),
                );
                false
            }
        }
    }
}
