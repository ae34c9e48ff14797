//! Graft SDK - expose native Rust types to a reference-counted host runtime
//!
//! This crate derives, at compile time, everything a dynamically-typed host
//! needs to treat a native value type as a first-class object:
//!
//! - which operators and conversions the type supports ([`probe!`], [`number_methods!`])
//! - the operator dispatch table built from those probes ([`NumberMethods`])
//! - the argument format descriptor for a parameter list ([`ArgList::FORMAT`])
//! - argument marshalling in both directions ([`parse_tuple`], [`build_value`])
//! - the per-type descriptor record ([`register_type`], [`TypeObject`])
//! - the calling convention of a registered function ([`MethodDef`])
//!
//! The host itself is abstract: a runtime implements [`HostRuntime`] and
//! installs itself once with [`host::install`].
//!
//! # Example
//!
//! ```ignore
//! use graft_sdk::{register_type, ModuleDef};
//! use graft_native::{function, module, Extension};
//!
//! #[derive(Clone, Extension)]
//! #[extension(name = "vec.Vec", number)]
//! struct Vec3 { x: f32, y: f32, z: f32 }
//!
//! #[function]
//! fn count() -> i64 { 1 }
//!
//! #[module]
//! fn init() -> ModuleDef {
//!     ModuleDef::new("vec").method(count_def())
//! }
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod host;
pub mod instance;
pub mod marshal;
pub mod method;
pub mod module;
pub mod number;
pub mod object;
pub mod ops;
pub mod probe;
pub mod type_object;

pub use config::{Config, ConfigError, Truthiness, TypeOverrides};
pub use convert::IntoHost;
pub use error::{ErrorKind, GraftError, GraftResult};
pub use format::{ArgList, Buffer, Format, FormatUnit, Optional, StrObject, FORMAT_CAPACITY};
pub use host::HostRuntime;
pub use instance::{Extension, ExtensionSlots, Instance};
pub use marshal::{build_value, parse_tuple, unpack, BuildArgs, Dest, ParseArgs, Src};
pub use method::{CFunction, CallConvention, KeywordFunction, MethodDef, MethodFn, MethodPtr};
pub use module::{add_object, add_type, ModuleDef, ModuleInit};
pub use number::{NumberMethods, NumberSlot};
pub use object::{release, retain, Handle, Object, ObjectLayout, IMMORTAL};
pub use ops::Positive;
pub use probe::{catch_panic, Capability, Probed};
pub use type_object::{
    default_new, raw_new, register_type, AllocFunc, BinaryFunc, Destructor, FreeFunc, InitFn,
    InitProc, InquiryFunc, InstanceInit, InstanceRepr, NewFunc, ReprFn, ReprFunc, TypeBuilder,
    TypeFlags, TypeObject, UnaryFunc,
};
