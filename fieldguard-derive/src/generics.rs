//! Generic type parameter handling and trait bound management.
//!
//! Nested record fields need their type parameters bounded by `Guarded`.
//! Every type parameter is additionally bounded by `'static`, because plans
//! are cached per `TypeId`.
//!
//! ## PhantomData Handling
//!
//! `PhantomData<T>` fields are skipped when collecting generics, so a marker
//! parameter never picks up a `Guarded` bound it cannot satisfy.

use syn::{parse_quote, Ident};

use crate::crate_path;

pub(crate) fn collect_generics_from_type(
    ty: &syn::Type,
    generics: &syn::Generics,
    result: &mut Vec<Ident>,
) {
    if let syn::Type::Path(path) = ty {
        if let Some(segment) = path.path.segments.last() {
            if segment.ident == "PhantomData" {
                return;
            }

            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                for arg in &args.args {
                    if let syn::GenericArgument::Type(inner_ty) = arg {
                        collect_generics_from_type(inner_ty, generics, result);
                    }
                }
            }

            for param in generics.type_params() {
                if segment.ident == param.ident && !result.iter().any(|g| g == &param.ident) {
                    result.push(param.ident.clone());
                }
            }
        }
    }
}

/// Adds `Guarded` bounds to generic parameters used in nested fields.
pub(crate) fn add_guarded_bounds(
    mut generics: syn::Generics,
    nested_generics: &[Ident],
) -> syn::Generics {
    let guarded_path = crate_path("Guarded");
    for param in generics.type_params_mut() {
        if nested_generics.iter().any(|g| g == &param.ident) {
            param.bounds.push(parse_quote!(#guarded_path));
        }
    }
    generics
}

/// Adds `'static` to every type parameter.
pub(crate) fn add_static_bounds(mut generics: syn::Generics) -> syn::Generics {
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!('static));
    }
    generics
}

/// Adds `Self: Clone` to the where-clause.
///
/// `Clone` is a supertrait of `Guarded`, and a derived `Clone` only holds when
/// every type parameter is `Clone`. Parameters outside nested fields carry no
/// such bound, so the impl defers to whatever `Clone` impl the type has.
pub(crate) fn add_clone_predicate(mut generics: syn::Generics) -> syn::Generics {
    generics
        .make_where_clause()
        .predicates
        .push(parse_quote!(Self: ::core::clone::Clone));
    generics
}

#[cfg(test)]
mod tests {
    use quote::quote;

    use super::*;

    fn generics(tokens: proc_macro2::TokenStream) -> syn::Generics {
        let input: syn::DeriveInput = syn::parse2(quote! { struct Dummy #tokens; })
            .expect("should parse as DeriveInput");
        input.generics
    }

    fn collect(ty: proc_macro2::TokenStream, generics: &syn::Generics) -> Vec<String> {
        let ty: syn::Type = syn::parse2(ty).expect("should parse as Type");
        let mut result = Vec::new();
        collect_generics_from_type(&ty, generics, &mut result);
        result.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn collects_parameters_through_wrappers() {
        let generics = generics(quote! { <A, B> });
        assert_eq!(collect(quote! { Option<Box<A>> }, &generics), vec!["A"]);
        assert!(collect(quote! { String }, &generics).is_empty());
    }

    #[test]
    fn phantom_data_is_skipped() {
        let generics = generics(quote! { <A> });
        assert!(collect(quote! { PhantomData<A> }, &generics).is_empty());
    }

    #[test]
    fn static_bound_added_to_every_parameter() {
        let bounded = add_static_bounds(generics(quote! { <A, B: Clone> }));
        for param in bounded.type_params() {
            assert!(param
                .bounds
                .iter()
                .any(|bound| matches!(bound, syn::TypeParamBound::Lifetime(l) if l.ident == "static")));
        }
    }

    #[test]
    fn clone_predicate_is_added_to_where_clause() {
        let bounded = add_clone_predicate(generics(quote! { <M> }));
        let predicates = &bounded
            .where_clause
            .as_ref()
            .expect("where clause should exist")
            .predicates;
        assert_eq!(predicates.len(), 1);
        let expected: syn::WherePredicate = parse_quote!(Self: ::core::clone::Clone);
        let predicates = predicates.iter();
        assert_eq!(
            quote!(#(#predicates)*).to_string(),
            quote!(#expected).to_string()
        );
    }
}
