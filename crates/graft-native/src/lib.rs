// graft-native: code generation front end for graft extension modules
//
// Provides:
// - #[derive(Extension)] - synthesizes the host slots of a native type
// - #[function] - wraps a free Rust function as a positional host function
// - #[module] - exports the module entry point
//
// Example:
// ```
// use graft_native::{function, module, Extension};
// use graft_sdk::ModuleDef;
//
// #[function]
// fn add(a: i32, b: i32) -> i32 {
//     a + b
// }
//
// #[module]
// fn init() -> ModuleDef {
//     ModuleDef::new("math").method(add_def())
// }
// ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput, ItemFn};

mod derive;
mod function;
mod module;

/// Implements `graft_sdk::Extension` and `graft_sdk::IntoHost` for a type.
///
/// Every slot is found by capability probing: `Default` selects
/// allocate-and-construct, `Display` fills `str`, `Debug` fills `repr`, and
/// with `number` each operator the type implements fills its table slot.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone, Default, Extension)]
/// #[extension(name = "vec.Vec", doc = "A 3D vector", number)]
/// struct Vec3 {
///     x: f32,
///     y: f32,
///     z: f32,
/// }
/// ```
///
/// Without `name` the type's identifier is used; without `doc` its doc
/// comments are. Generic types are rejected.
#[proc_macro_derive(Extension, attributes(extension))]
pub fn derive_extension(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    derive::expand_extension(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Marks a Rust function as a host function.
///
/// Generates:
/// - `<name>_host`: positional-convention adapter that unpacks the argument
///   tuple through the marshaller, catches panics, and converts the result
///   with `IntoHost`
/// - `<name>_def()`: the `MethodDef` for a module table
///
/// # Example
///
/// ```ignore
/// /// Returns the number of times called.
/// #[function]
/// fn count() -> i64 {
///     COUNTER.fetch_add(1, Ordering::SeqCst) + 1
/// }
///
/// ModuleDef::new("count").method(count_def());
/// ```
///
/// `#[function(name = "...")]` changes the host-visible name.
#[proc_macro_attribute]
pub fn function(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    function::expand_function(attr.into(), input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Defines a module initialization function.
///
/// Must be applied to a function named `init()` returning `ModuleDef` or
/// `GraftResult<ModuleDef>`. Generates the `graft_module_init()` entry point
/// the host calls when loading the library; it returns the new module
/// reference, or null with the host error set.
#[proc_macro_attribute]
pub fn module(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    module::expand_module(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
