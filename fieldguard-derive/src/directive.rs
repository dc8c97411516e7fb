//! Parsing of `#[guard(...)]` field attributes.
//!
//! This module maps attribute syntax to field strategies and produces
//! structured errors for invalid forms. Parameter *values* are not checked
//! here; the runtime plan compiler rejects unknown algorithms when a
//! processor is constructed.

use proc_macro2::Span;
use syn::{meta::ParseNestedMeta, spanned::Spanned, Attribute, LitStr, Meta, Result};

/// The five boundary-action pairs a directive can bind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ActionKind {
    Hash,
    Decrypt,
    Encrypt,
    Mask,
    Redact,
}

impl ActionKind {
    /// Resolves `boundary(action = ...)` to an action, if the pair is valid.
    fn resolve(boundary: &str, action: &str) -> Option<Self> {
        match (boundary, action) {
            ("receive", "hash") => Some(Self::Hash),
            ("load", "decrypt") => Some(Self::Decrypt),
            ("store", "encrypt") => Some(Self::Encrypt),
            ("send", "mask") => Some(Self::Mask),
            ("send", "redact") => Some(Self::Redact),
            _ => None,
        }
    }

    /// Variant name of `fieldguard::Action`.
    pub(crate) fn variant(self) -> &'static str {
        match self {
            Self::Hash => "Hash",
            Self::Decrypt => "Decrypt",
            Self::Encrypt => "Encrypt",
            Self::Mask => "Mask",
            Self::Redact => "Redact",
        }
    }
}

/// One `boundary(action = "parameter")` entry.
#[derive(Clone, Debug)]
pub(crate) struct Directive {
    pub(crate) action: ActionKind,
    pub(crate) parameter: LitStr,
}

/// Field handling based on `#[guard(...)]` attributes.
///
/// | Attribute | Strategy | Behavior |
/// |-----------|----------|----------|
/// | None | `PassThrough` | Field never appears in a plan |
/// | `#[guard]` | `Nested` | Walk into a nested record |
/// | `#[guard(send(mask = "email"))]` | `Directives` | Transform at the boundary |
#[derive(Clone, Debug)]
pub(crate) enum Strategy {
    PassThrough,
    Nested,
    Directives(Vec<Directive>),
}

fn ident_of(meta: &ParseNestedMeta<'_>) -> String {
    meta.path
        .get_ident()
        .map_or_else(|| "?".to_string(), ToString::to_string)
}

fn parse_directive_list(attr: &Attribute, directives: &mut Vec<Directive>) -> Result<()> {
    attr.parse_nested_meta(|boundary| {
        let boundary_name = ident_of(&boundary);
        if !matches!(boundary_name.as_str(), "receive" | "load" | "store" | "send") {
            return Err(boundary.error(format!(
                "unknown boundary `{boundary_name}`; expected `receive`, `load`, `store` or `send`"
            )));
        }

        boundary.parse_nested_meta(|action| {
            let action_name = ident_of(&action);
            let Some(kind) = ActionKind::resolve(&boundary_name, &action_name) else {
                return Err(action.error(format!(
                    "`{boundary_name}.{action_name}` is not a valid directive; expected one of \
                     receive(hash), load(decrypt), store(encrypt), send(mask), send(redact)"
                )));
            };
            let parameter: LitStr = action.value()?.parse()?;
            if directives.iter().any(|existing| existing.action == kind) {
                return Err(action.error(format!(
                    "duplicate `{boundary_name}.{action_name}` directive on the same field"
                )));
            }
            directives.push(Directive {
                action: kind,
                parameter,
            });
            Ok(())
        })
    })
}

fn conflict(span: Span) -> syn::Error {
    syn::Error::new(
        span,
        "a nested #[guard] field cannot also carry directives; \
         put the directives on the nested record's own fields",
    )
}

pub(crate) fn parse_field_strategy(attrs: &[Attribute]) -> Result<Strategy> {
    let mut nested = false;
    let mut directives = Vec::new();

    for attr in attrs {
        if !attr.path().is_ident("guard") {
            continue;
        }

        match &attr.meta {
            Meta::Path(_) => {
                if nested {
                    return Err(syn::Error::new(
                        attr.span(),
                        "multiple bare #[guard] attributes specified on the same field",
                    ));
                }
                if !directives.is_empty() {
                    return Err(conflict(attr.span()));
                }
                nested = true;
            }
            Meta::List(_) => {
                if nested {
                    return Err(conflict(attr.span()));
                }
                parse_directive_list(attr, &mut directives)?;
            }
            Meta::NameValue(_) => {
                return Err(syn::Error::new(
                    attr.span(),
                    "name-value syntax is not supported for #[guard]",
                ));
            }
        }
    }

    if nested {
        Ok(Strategy::Nested)
    } else if directives.is_empty() {
        Ok(Strategy::PassThrough)
    } else {
        Ok(Strategy::Directives(directives))
    }
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

    fn directives(strategy: Strategy) -> Vec<Directive> {
        match strategy {
            Strategy::Directives(directives) => directives,
            other => panic!("expected directives, got {other:?}"),
        }
    }

    #[test]
    fn no_attribute_returns_passthrough() {
        let strategy = parse_field_strategy(&parse_attrs(quote! {})).unwrap();
        assert!(matches!(strategy, Strategy::PassThrough));
    }

    #[test]
    fn bare_guard_returns_nested() {
        let strategy = parse_field_strategy(&parse_attrs(quote! { #[guard] })).unwrap();
        assert!(matches!(strategy, Strategy::Nested));
    }

    #[test]
    fn single_directive_is_parsed() {
        let attrs = parse_attrs(quote! { #[guard(receive(hash = "argon2"))] });
        let parsed = directives(parse_field_strategy(&attrs).unwrap());
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].action, ActionKind::Hash);
        assert_eq!(parsed[0].parameter.value(), "argon2");
    }

    #[test]
    fn directives_accumulate_across_boundaries_and_attributes() {
        let attrs = parse_attrs(quote! {
            #[guard(store(encrypt = "aes"), load(decrypt = "aes"))]
            #[guard(send(mask = "email", redact = "***"))]
        });
        let parsed = directives(parse_field_strategy(&attrs).unwrap());
        let actions: Vec<_> = parsed.iter().map(|d| d.action).collect();
        assert_eq!(
            actions,
            vec![
                ActionKind::Encrypt,
                ActionKind::Decrypt,
                ActionKind::Mask,
                ActionKind::Redact
            ]
        );
    }

    #[test]
    fn parameter_values_are_not_validated_here() {
        let attrs = parse_attrs(quote! { #[guard(store(encrypt = "rot13"))] });
        let parsed = directives(parse_field_strategy(&attrs).unwrap());
        assert_eq!(parsed[0].parameter.value(), "rot13");
    }

    #[test]
    fn invalid_pair_errors() {
        let attrs = parse_attrs(quote! { #[guard(receive(encrypt = "aes"))] });
        let err = parse_field_strategy(&attrs).unwrap_err();
        assert!(err.to_string().contains("`receive.encrypt` is not a valid directive"));
    }

    #[test]
    fn unknown_boundary_errors() {
        let attrs = parse_attrs(quote! { #[guard(archive(encrypt = "aes"))] });
        let err = parse_field_strategy(&attrs).unwrap_err();
        assert!(err.to_string().contains("unknown boundary `archive`"));
    }

    #[test]
    fn duplicate_directive_errors() {
        let attrs = parse_attrs(quote! {
            #[guard(send(mask = "email"))]
            #[guard(send(mask = "name"))]
        });
        let err = parse_field_strategy(&attrs).unwrap_err();
        assert!(err.to_string().contains("duplicate `send.mask` directive"));
    }

    #[test]
    fn non_string_parameter_errors() {
        let attrs = parse_attrs(quote! { #[guard(send(redact = 5))] });
        assert!(parse_field_strategy(&attrs).is_err());
    }

    #[test]
    fn nested_with_directives_errors() {
        let attrs = parse_attrs(quote! {
            #[guard]
            #[guard(send(redact = "x"))]
        });
        let err = parse_field_strategy(&attrs).unwrap_err();
        assert!(err.to_string().contains("cannot also carry directives"));
    }

    #[test]
    fn multiple_bare_attributes_error() {
        let attrs = parse_attrs(quote! {
            #[guard]
            #[guard]
        });
        let err = parse_field_strategy(&attrs).unwrap_err();
        assert!(err.to_string().contains("multiple bare #[guard]"));
    }

    #[test]
    fn name_value_syntax_error() {
        let attrs = parse_attrs(quote! { #[guard = "value"] });
        let err = parse_field_strategy(&attrs).unwrap_err();
        assert!(err.to_string().contains("name-value syntax is not supported"));
    }

    #[test]
    fn other_attributes_ignored() {
        let attrs = parse_attrs(quote! {
            #[serde(skip)]
            #[doc = "field"]
        });
        let strategy = parse_field_strategy(&attrs).unwrap();
        assert!(matches!(strategy, Strategy::PassThrough));
    }
}
