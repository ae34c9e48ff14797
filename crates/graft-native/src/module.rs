// #[module] proc-macro implementation
//
// Generates the module entry point the host calls on load.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{ItemFn, Result};

/// Expands the #[module] attribute macro.
///
/// Example expansion:
/// ```ignore
/// // Input:
/// #[module]
/// fn init() -> ModuleDef {
///     ModuleDef::new("count").method(count_def())
/// }
///
/// // Output:
/// fn init() -> ModuleDef {
///     ModuleDef::new("count").method(count_def())
/// }
///
/// #[no_mangle]
/// pub extern "C" fn graft_module_init() -> *mut ::graft_sdk::Object {
///     // init(), then ModuleDef::create(); null with the error set on failure
/// }
/// ```
pub fn expand_module(func: ItemFn) -> Result<TokenStream> {
    // Validate function signature
    if func.sig.ident != "init" {
        return Err(syn::Error::new_spanned(
            &func.sig.ident,
            "#[module] must be applied to a function named 'init'",
        ));
    }

    if !func.sig.inputs.is_empty() {
        return Err(syn::Error::new_spanned(
            &func.sig.inputs,
            "Module init function must not have parameters",
        ));
    }

    // Check return type is ModuleDef or GraftResult<ModuleDef>
    let returns_module = match &func.sig.output {
        syn::ReturnType::Type(_, ty) => {
            if let syn::Type::Path(type_path) = &**ty {
                type_path
                    .path
                    .segments
                    .last()
                    .map(|s| s.ident == "ModuleDef" || s.ident == "GraftResult")
                    .unwrap_or(false)
            } else {
                false
            }
        }
        _ => false,
    };

    if !returns_module {
        return Err(syn::Error::new_spanned(
            &func.sig.output,
            "Module init function must return ModuleDef or GraftResult<ModuleDef>",
        ));
    }

    Ok(quote! {
        #func

        /// Entry point called by the host when loading this module.
        #[no_mangle]
        pub extern "C" fn graft_module_init() -> *mut ::graft_sdk::Object {
            let created = ::graft_sdk::catch_panic(
                ::core::result::Result::Err(::graft_sdk::GraftError::ModuleCreation(
                    ::std::string::String::from("init panicked"),
                )),
                || ::graft_sdk::ModuleInit::into_module(init()).and_then(::graft_sdk::ModuleDef::create),
            );
            match created {
                ::core::result::Result::Ok(module) => module.into_raw(),
                ::core::result::Result::Err(err) => {
                    ::graft_sdk::host::raise(::graft_sdk::ErrorKind::SystemError, &err.to_string());
                    ::core::ptr::null_mut()
                }
            }
        }
    })
}
