//! Module registration surface
//!
//! A [`ModuleDef`] is the ordered `{name, function, convention, doc}` table
//! handed to the host's module-creation primitive. Hosts iterate
//! [`ModuleDef::methods`] in order; the slice length replaces the C-style
//! sentinel entry.
//!
//! Types listed with [`ModuleDef::with_type`] are attached right after the
//! host creates the module object, the way an init function would call
//! `add_type` by hand.

use crate::error::{GraftError, GraftResult};
use crate::host;
use crate::instance::{Extension, Instance};
use crate::method::MethodDef;
use crate::object::Handle;
use crate::type_object::TypeObject;

type TypeLookup = fn() -> Option<&'static TypeObject>;

/// Definition of a host module.
#[derive(Debug, Clone)]
pub struct ModuleDef {
    name: &'static str,
    doc: &'static str,
    methods: Vec<MethodDef>,
    types: Vec<(&'static str, &'static str, TypeLookup)>,
}

impl ModuleDef {
    /// Empty module named `name`
    pub fn new(name: &'static str) -> Self {
        ModuleDef {
            name,
            doc: "",
            methods: Vec::new(),
            types: Vec::new(),
        }
    }

    /// Set the module docstring
    pub fn doc(mut self, doc: &'static str) -> Self {
        self.doc = doc;
        self
    }

    /// Append a method
    pub fn method(mut self, def: MethodDef) -> Self {
        self.methods.push(def);
        self
    }

    /// Attach the sealed type of `T` under `name` once the module exists
    pub fn with_type<T: Extension>(mut self, name: &'static str) -> Self {
        self.types.push((name, T::NAME, Instance::<T>::type_object as TypeLookup));
        self
    }

    /// Module name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Module docstring
    pub fn docstring(&self) -> &'static str {
        self.doc
    }

    /// Method table, in registration order
    pub fn methods(&self) -> &[MethodDef] {
        &self.methods
    }

    /// Look up a method by name
    pub fn find(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Hand the definition to the host and return the new module object.
    ///
    /// The definition lives for the rest of the process, like the static
    /// tables hosts expect.
    pub fn create(self) -> GraftResult<Handle> {
        let host = host::require()?;
        let name = self.name;
        let def: &'static ModuleDef = Box::leak(Box::new(self));
        let module = unsafe { Handle::from_owned(host.create_module(def)) }
            .ok_or_else(|| GraftError::ModuleCreation(name.to_string()))?;
        for (attr, type_name, lookup) in &def.types {
            let kind = lookup().ok_or_else(|| never_sealed(type_name))?;
            attach_type(host, &module, attr, kind)?;
        }
        tracing::debug!(module = name, methods = def.methods.len(), "module created");
        Ok(module)
    }
}

/// Attach the sealed type of `T` to `module` under `name`.
pub fn add_type<T: Extension>(module: &Handle, name: &str) -> GraftResult<()> {
    let host = host::require()?;
    let kind = Instance::<T>::type_object().ok_or_else(|| never_sealed(T::NAME))?;
    attach_type(host, module, name, kind)
}

fn attach_type(
    host: &dyn host::HostRuntime,
    module: &Handle,
    name: &str,
    kind: &'static TypeObject,
) -> GraftResult<()> {
    if host.module_add_type(module.as_ptr(), name, kind) {
        Ok(())
    } else {
        Err(GraftError::ModuleAttribute(name.to_string()))
    }
}

fn never_sealed(name: &str) -> GraftError {
    GraftError::NotReady {
        name: name.to_string(),
        reason: "type was never sealed".to_string(),
    }
}

/// What a module init function may return.
pub trait ModuleInit {
    /// The definition, or the error that prevented building it
    fn into_module(self) -> GraftResult<ModuleDef>;
}

impl ModuleInit for ModuleDef {
    fn into_module(self) -> GraftResult<ModuleDef> {
        Ok(self)
    }
}

impl ModuleInit for GraftResult<ModuleDef> {
    fn into_module(self) -> GraftResult<ModuleDef> {
        self
    }
}

/// Attach `value` to `module` under `name`, consuming the handle.
pub fn add_object(module: &Handle, name: &str, value: Handle) -> GraftResult<()> {
    let host = host::require()?;
    if host.module_add_object(module.as_ptr(), name, value) {
        Ok(())
    } else {
        Err(GraftError::ModuleAttribute(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::{CFunction, CallConvention};
    use crate::object::Object;
    use std::ptr;

    unsafe extern "C" fn primes(_module: *mut Object, _args: *mut Object) -> *mut Object {
        ptr::null_mut()
    }

    #[test]
    fn test_methods_keep_registration_order() {
        let def = ModuleDef::new("cpp")
            .doc("sample module")
            .method(MethodDef::new("primes", primes as CFunction, "prime numbers under ten"))
            .method(MethodDef::new("again", primes as CFunction, ""));

        let names: Vec<_> = def.methods().iter().map(|m| m.name).collect();
        assert_eq!(names, ["primes", "again"]);
        assert_eq!(def.name(), "cpp");
        assert_eq!(def.docstring(), "sample module");
        assert_eq!(def.find("primes").map(|m| m.convention), Some(CallConvention::Positional));
        assert!(def.find("missing").is_none());
    }
}
