// #[function] proc-macro implementation
//
// Generates the positional-convention host adapter and the method table
// entry for a free Rust function.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Attribute, Expr, ItemFn, Lit, LitStr, Meta, Result};

/// Joined `///` lines of an item
pub fn doc_comment(attrs: &[Attribute]) -> String {
    let mut lines = Vec::new();
    for attr in attrs {
        if let Meta::NameValue(nv) = &attr.meta {
            if nv.path.is_ident("doc") {
                if let Expr::Lit(expr) = &nv.value {
                    if let Lit::Str(s) = &expr.lit {
                        lines.push(s.value().trim().to_string());
                    }
                }
            }
        }
    }
    lines.join("\n").trim().to_string()
}

fn parse_name(attr: TokenStream) -> Result<Option<LitStr>> {
    if attr.is_empty() {
        return Ok(None);
    }
    let mut name = None;
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("name") {
            name = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("expected `name = \"...\"`"))
        }
    });
    syn::parse::Parser::parse2(parser, attr)?;
    Ok(name)
}

/// Expands the #[function] attribute macro.
///
/// Example expansion:
/// ```ignore
/// // Input:
/// #[function]
/// fn add(a: i32, b: i32) -> i32 {
///     a + b
/// }
///
/// // Output:
/// fn add(a: i32, b: i32) -> i32 {
///     a + b
/// }
///
/// unsafe extern "C" fn add_host(
///     _module: *mut ::graft_sdk::Object,
///     args: *mut ::graft_sdk::Object,
/// ) -> *mut ::graft_sdk::Object {
///     // Unpack "ii", call with panic catching, convert the result
/// }
///
/// fn add_def() -> ::graft_sdk::MethodDef {
///     ::graft_sdk::MethodDef::new("add", add_host as ::graft_sdk::CFunction, "")
/// }
/// ```
pub fn expand_function(attr: TokenStream, func: ItemFn) -> Result<TokenStream> {
    let export_name = parse_name(attr)?;
    let func_name = &func.sig.ident;
    let vis = &func.vis;
    let host_name = format_ident!("{}_host", func_name);
    let def_name = format_ident!("{}_def", func_name);

    if func.sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            func.sig.asyncness,
            "async functions cannot be host functions",
        ));
    }
    if !func.sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &func.sig.generics,
            "generic functions cannot be host functions",
        ));
    }

    // Extract argument names and types
    let mut arg_names = Vec::new();
    let mut arg_types = Vec::new();

    for arg in &func.sig.inputs {
        match arg {
            syn::FnArg::Typed(pat_type) => {
                if let syn::Pat::Ident(pat_ident) = &*pat_type.pat {
                    arg_names.push(pat_ident.ident.clone());
                    arg_types.push(pat_type.ty.clone());
                } else {
                    return Err(syn::Error::new_spanned(
                        arg,
                        "Only simple identifiers are supported as arguments",
                    ));
                }
            }
            syn::FnArg::Receiver(_) => {
                return Err(syn::Error::new_spanned(
                    arg,
                    "Methods (self) are not supported in #[function]",
                ));
            }
        }
    }

    let name = export_name
        .map(|lit| lit.value())
        .unwrap_or_else(|| func_name.to_string());
    let doc = doc_comment(&func.attrs);

    Ok(quote! {
        #func

        #[doc(hidden)]
        #vis unsafe extern "C" fn #host_name(
            _module: *mut ::graft_sdk::Object,
            args: *mut ::graft_sdk::Object,
        ) -> *mut ::graft_sdk::Object {
            let ::core::option::Option::Some((#(#arg_names,)*)) =
                ::graft_sdk::unpack::<(#(#arg_types,)*)>(args)
            else {
                return ::core::ptr::null_mut();
            };
            ::graft_sdk::catch_panic(::core::ptr::null_mut(), || {
                ::graft_sdk::IntoHost::into_host(#func_name(#(#arg_names),*))
            })
        }

        #[doc = concat!("Method table entry for `", #name, "`")]
        #vis fn #def_name() -> ::graft_sdk::MethodDef {
            ::graft_sdk::MethodDef::new(#name, #host_name as ::graft_sdk::CFunction, #doc)
        }
    })
}
