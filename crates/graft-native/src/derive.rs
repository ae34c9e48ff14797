// #[derive(Extension)] implementation
//
// Expands into graft_sdk's probe macros for the concrete type, so the slot
// selection itself happens in the SDK.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, LitStr, Result};

use crate::function::doc_comment;

#[derive(Default)]
struct ExtensionArgs {
    name: Option<LitStr>,
    doc: Option<LitStr>,
    number: bool,
}

fn parse_args(input: &DeriveInput) -> Result<ExtensionArgs> {
    let mut args = ExtensionArgs::default();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("extension")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                args.name = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("doc") {
                args.doc = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("number") {
                args.number = true;
                Ok(())
            } else {
                Err(meta.error("expected `name`, `doc` or `number`"))
            }
        })?;
    }
    Ok(args)
}

/// Expands #[derive(Extension)].
///
/// Example expansion:
/// ```ignore
/// // Input:
/// #[derive(Clone, Extension)]
/// #[extension(name = "vec.Vec", number)]
/// struct Vec3 { x: f32, y: f32, z: f32 }
///
/// // Output:
/// impl ::graft_sdk::Extension for Vec3 {
///     const NAME: &'static str = "vec.Vec";
///     const DOC: &'static str = "";
///     fn slots() -> ::graft_sdk::ExtensionSlots {
///         ::graft_sdk::extension_slots!(Vec3, number)
///     }
/// }
///
/// impl ::graft_sdk::IntoHost for Vec3 {
///     fn into_host(self) -> *mut ::graft_sdk::Object {
///         ::graft_sdk::Instance::<Vec3>::make(self)
///     }
/// }
/// ```
pub fn expand_extension(input: DeriveInput) -> Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[derive(Extension)] requires a concrete type; capability probing cannot see through generics",
        ));
    }

    let args = parse_args(&input)?;
    let ident = &input.ident;
    let name = args
        .name
        .map(|lit| lit.value())
        .unwrap_or_else(|| ident.to_string());
    let doc = args
        .doc
        .map(|lit| lit.value())
        .unwrap_or_else(|| doc_comment(&input.attrs));
    let slots = if args.number {
        quote! { ::graft_sdk::extension_slots!(#ident, number) }
    } else {
        quote! { ::graft_sdk::extension_slots!(#ident) }
    };

    Ok(quote! {
        impl ::graft_sdk::Extension for #ident {
            const NAME: &'static str = #name;
            const DOC: &'static str = #doc;

            fn slots() -> ::graft_sdk::ExtensionSlots {
                #slots
            }
        }

        impl ::graft_sdk::IntoHost for #ident {
            fn into_host(self) -> *mut ::graft_sdk::Object {
                ::graft_sdk::Instance::<#ident>::make(self)
            }
        }
    })
}
