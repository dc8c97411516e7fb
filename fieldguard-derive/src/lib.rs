//! Derive macros for `fieldguard`.
//!
//! This crate generates the metadata and field access code behind
//! `#[derive(Guarded)]`. It:
//! - reads `#[guard(...)]` field and container attributes
//! - emits a `FieldAccess` implementation that hands out fields by position
//! - emits a `Guarded` implementation describing every eligible field and
//!   dispatching declared overrides
//!
//! It does **not** compile plans or validate algorithm names. Those live in the
//! main `fieldguard` crate and run when a `Processor` is constructed.

// <https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html>
#![warn(
    anonymous_parameters,
    bare_trait_objects,
    elided_lifetimes_in_paths,
    missing_copy_implementations,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_code,
    unused_extern_crates,
    unused_import_braces
)]
// <https://rust-lang.github.io/rust-clippy/stable>
#![warn(
    clippy::all,
    clippy::cargo,
    clippy::dbg_macro,
    clippy::float_cmp_const,
    clippy::get_unwrap,
    clippy::mem_forget,
    clippy::nursery,
    clippy::pedantic,
    clippy::todo,
    clippy::unwrap_used,
    clippy::uninlined_format_args
)]
// Allow some clippy lints
#![allow(
    clippy::default_trait_access,
    clippy::doc_markdown,
    clippy::if_not_else,
    clippy::module_name_repetitions,
    clippy::multiple_crate_versions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::use_self,
    clippy::cargo_common_metadata,
    clippy::missing_errors_doc,
    clippy::enum_glob_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::option_if_let_else
)]
// Allow some lints while testing
#![cfg_attr(test, allow(clippy::unwrap_used))]

#[allow(unused_extern_crates)]
extern crate proc_macro;

use proc_macro2::TokenStream;
use proc_macro_crate::{crate_name, FoundCrate};
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, Data, DeriveInput, Result};

mod container;
mod derive_struct;
mod directive;
mod generics;
mod types;
use container::{parse_container_options, ContainerOptions};
use derive_struct::{derive_struct, StructDeriveOutput};
use directive::ActionKind;
use generics::{add_clone_predicate, add_guarded_bounds, add_static_bounds};

/// Derives `fieldguard::FieldAccess` and `fieldguard::Guarded` for structs.
///
/// # Field Attributes
///
/// - **No annotation**: the field is never visited.
///
/// - `#[guard]`: the field holds a nested record that also derives `Guarded`.
///   Accepted forms are `T`, `Box<T>`, `Option<T>` and `Option<Box<T>>`; the
///   `Option` forms are optional references and are skipped when `None`.
///
/// - `#[guard(boundary(action = "parameter"), ...)]`: binds boundary actions to
///   a capability parameter. Valid pairs are `receive(hash)`, `load(decrypt)`,
///   `store(encrypt)`, `send(mask)` and `send(redact)`. Directives may be split
///   across several attributes. The field type must be `String`, `Vec<u8>`,
///   `Vec<String>`, `HashMap<K, String>` or `BTreeMap<K, String>`; directives on
///   any other type are ignored.
///
/// # Container Attributes
///
/// - `#[guard(overrides(hash, decrypt, encrypt, mask, redact))]`: the type
///   implements the matching override traits (`Hashable`, `Decryptable`,
///   `Encryptable`, `Maskable`, `Redactable`), which replace field traversal
///   for those actions.
///
/// Enums and unions are rejected at compile time.
#[proc_macro_derive(Guarded, attributes(guard))]
pub fn derive_guarded(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

/// Returns the token stream to reference the fieldguard crate root.
///
/// Handles crate renaming (e.g., `guard = { package = "fieldguard", ... }`).
/// Inside the crate itself the root resolves through
/// `extern crate self as fieldguard`.
fn crate_root() -> TokenStream {
    match crate_name("fieldguard") {
        Ok(FoundCrate::Itself) | Err(_) => quote! { ::fieldguard },
        Ok(FoundCrate::Name(name)) => {
            let ident = format_ident!("{}", name);
            quote! { ::#ident }
        }
    }
}

fn crate_path(item: &str) -> TokenStream {
    let root = crate_root();
    let item_ident = syn::parse_str::<syn::Path>(item).expect("fieldguard crate path should parse");
    quote! { #root::#item_ident }
}

fn override_dispatch(overrides: &[ActionKind]) -> TokenStream {
    let root = crate_root();
    let arms = overrides.iter().map(|action| {
        let variant = format_ident!("{}", action.variant());
        let call = match action {
            ActionKind::Hash => quote! {
                <Self as #root::Hashable>::hash(self, capabilities.hashers())
            },
            ActionKind::Decrypt => quote! {
                <Self as #root::Decryptable>::decrypt(self, capabilities.encryptors())
            },
            ActionKind::Encrypt => quote! {
                <Self as #root::Encryptable>::encrypt(self, capabilities.encryptors())
            },
            ActionKind::Mask => quote! {
                <Self as #root::Maskable>::mask(self, capabilities.maskers())
            },
            ActionKind::Redact => quote! {
                <Self as #root::Redactable>::redact(self)
            },
        };
        quote! {
            #root::Action::#variant => ::core::option::Option::Some(#call),
        }
    });

    quote! {
        #[allow(unreachable_patterns, unused_variables)]
        fn run_override(
            &mut self,
            action: #root::Action,
            capabilities: &#root::Capabilities,
        ) -> ::core::option::Option<::core::result::Result<(), #root::CapabilityError>> {
            match action {
                #(#arms)*
                _ => ::core::option::Option::None,
            }
        }
    }
}

fn expand(input: DeriveInput) -> Result<TokenStream> {
    let DeriveInput {
        ident,
        generics,
        data,
        attrs,
        ..
    } = input;

    let ContainerOptions { overrides } = parse_container_options(&attrs)?;

    let StructDeriveOutput {
        access_arms,
        field_metas,
        nested_generics,
    } = match data {
        Data::Struct(data) => derive_struct(data, &generics)?,
        Data::Enum(e) => {
            return Err(syn::Error::new(
                e.enum_token.span(),
                "`Guarded` can only be derived for structs",
            ));
        }
        Data::Union(u) => {
            return Err(syn::Error::new(
                u.union_token.span(),
                "`Guarded` cannot be derived for unions",
            ));
        }
    };

    let root = crate_root();
    let bounded = add_static_bounds(add_guarded_bounds(generics, &nested_generics));
    let (impl_generics, ty_generics, where_clause) = bounded.split_for_impl();
    let cloneable = add_clone_predicate(bounded.clone());
    let (_, _, guarded_where_clause) = cloneable.split_for_impl();

    let override_variants = overrides.iter().map(|action| {
        let variant = format_ident!("{}", action.variant());
        quote! { #root::Action::#variant }
    });
    let override_fn = if overrides.is_empty() {
        quote! {}
    } else {
        override_dispatch(&overrides)
    };

    Ok(quote! {
        impl #impl_generics #root::FieldAccess for #ident #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn field_mut(&mut self, index: usize) -> ::core::option::Option<#root::FieldSlot<'_>> {
                match index {
                    #(#access_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl #impl_generics #root::Guarded for #ident #ty_generics #guarded_where_clause {
            const OVERRIDES: &'static [#root::Action] = &[#(#override_variants),*];

            fn schema() -> #root::Schema {
                #root::Schema::new::<Self>(stringify!(#ident), ::std::vec![#(#field_metas),*])
            }

            #override_fn
        }
    })
}
