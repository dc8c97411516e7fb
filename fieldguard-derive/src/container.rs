//! Container-level attribute parsing for `#[derive(Guarded)]`.
//!
//! This module handles attributes on the struct itself, not on fields.

use syn::{Attribute, Meta, Result};

use crate::directive::ActionKind;

/// Options parsed from container-level `#[guard(...)]` attributes.
#[derive(Clone, Debug, Default)]
pub(crate) struct ContainerOptions {
    /// Actions for which the type implements its own override trait.
    pub(crate) overrides: Vec<ActionKind>,
}

fn override_action(name: &str) -> Option<ActionKind> {
    match name {
        "hash" => Some(ActionKind::Hash),
        "decrypt" => Some(ActionKind::Decrypt),
        "encrypt" => Some(ActionKind::Encrypt),
        "mask" => Some(ActionKind::Mask),
        "redact" => Some(ActionKind::Redact),
        _ => None,
    }
}

/// Parses container-level `#[guard(...)]` attributes.
pub(crate) fn parse_container_options(attrs: &[Attribute]) -> Result<ContainerOptions> {
    let mut options = ContainerOptions::default();

    for attr in attrs {
        if !attr.path().is_ident("guard") {
            continue;
        }

        match &attr.meta {
            Meta::Path(_) => {
                // Bare #[guard] on container - currently no meaning, ignore
            }
            Meta::List(list) => {
                list.parse_nested_meta(|meta| {
                    if !meta.path.is_ident("overrides") {
                        return Err(meta.error(format!(
                            "unknown container option `{}`; expected `overrides(...)`",
                            meta.path
                                .get_ident()
                                .map_or_else(|| "?".to_string(), ToString::to_string)
                        )));
                    }
                    meta.parse_nested_meta(|action| {
                        let name = action
                            .path
                            .get_ident()
                            .map_or_else(|| "?".to_string(), ToString::to_string);
                        let Some(kind) = override_action(&name) else {
                            return Err(action.error(format!(
                                "unknown override `{name}`; expected hash, decrypt, encrypt, mask or redact"
                            )));
                        };
                        if !options.overrides.contains(&kind) {
                            options.overrides.push(kind);
                        }
                        Ok(())
                    })
                })?;
            }
            Meta::NameValue(nv) => {
                return Err(syn::Error::new_spanned(
                    nv,
                    "name-value syntax is not supported for container-level #[guard]",
                ));
            }
        }
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use quote::quote;
    use syn::DeriveInput;

    use super::*;

    fn parse_attrs(tokens: proc_macro2::TokenStream) -> Vec<Attribute> {
        let input: DeriveInput = syn::parse2(quote! {
            #tokens
            struct Dummy;
        })
        .expect("should parse as DeriveInput");
        input.attrs
    }

    #[test]
    fn no_attribute_returns_defaults() {
        let options = parse_container_options(&parse_attrs(quote! {})).unwrap();
        assert!(options.overrides.is_empty());
    }

    #[test]
    fn overrides_are_parsed_in_order() {
        let attrs = parse_attrs(quote! { #[guard(overrides(mask, hash))] });
        let options = parse_container_options(&attrs).unwrap();
        assert_eq!(options.overrides, vec![ActionKind::Mask, ActionKind::Hash]);
    }

    #[test]
    fn repeated_override_is_collapsed() {
        let attrs = parse_attrs(quote! {
            #[guard(overrides(redact))]
            #[guard(overrides(redact, encrypt))]
        });
        let options = parse_container_options(&attrs).unwrap();
        assert_eq!(
            options.overrides,
            vec![ActionKind::Redact, ActionKind::Encrypt]
        );
    }

    #[test]
    fn unknown_override_errors() {
        let attrs = parse_attrs(quote! { #[guard(overrides(compress))] });
        let err = parse_container_options(&attrs).unwrap_err();
        assert!(err.to_string().contains("unknown override `compress`"));
    }

    #[test]
    fn unknown_option_errors() {
        let attrs = parse_attrs(quote! { #[guard(skip_debug)] });
        let err = parse_container_options(&attrs).unwrap_err();
        assert!(err.to_string().contains("unknown container option"));
    }

    #[test]
    fn bare_guard_on_container_is_ignored() {
        let options = parse_container_options(&parse_attrs(quote! { #[guard] })).unwrap();
        assert!(options.overrides.is_empty());
    }
}
