//! Struct-specific `Guarded` derivation.
//!
//! This module generates the index-based field accessor and the schema
//! entries for each field, and collects generic parameters that require
//! `Guarded` bounds.

use proc_macro2::{Ident, Span, TokenStream};
use quote::{format_ident, quote, quote_spanned};
use syn::{spanned::Spanned, DataStruct, Fields, Member, Result};

use crate::{
    crate_path,
    directive::{parse_field_strategy, Strategy},
    generics::collect_generics_from_type,
    types::{leaf_shape, nested_form, LeafShape, NestedForm},
};

pub(crate) struct StructDeriveOutput {
    /// Match arms for `FieldAccess::field_mut`.
    pub(crate) access_arms: Vec<TokenStream>,
    /// `FieldMeta` constructors for `Guarded::schema`.
    pub(crate) field_metas: Vec<TokenStream>,
    pub(crate) nested_generics: Vec<Ident>,
}

pub(crate) fn derive_struct(data: DataStruct, generics: &syn::Generics) -> Result<StructDeriveOutput> {
    let mut output = StructDeriveOutput {
        access_arms: Vec::new(),
        field_metas: Vec::new(),
        nested_generics: Vec::new(),
    };

    let fields: Vec<(Member, String, syn::Field)> = match data.fields {
        Fields::Named(fields) => fields
            .named
            .into_iter()
            .map(|field| {
                let ident = field.ident.clone().expect("named field should have an identifier");
                let name = ident.to_string();
                (Member::Named(ident), name, field)
            })
            .collect(),
        Fields::Unnamed(fields) => fields
            .unnamed
            .into_iter()
            .enumerate()
            .map(|(index, field)| (Member::from(index), index.to_string(), field))
            .collect(),
        Fields::Unit => Vec::new(),
    };

    for (index, (member, name, field)) in fields.into_iter().enumerate() {
        let span = field.span();
        match parse_field_strategy(&field.attrs)? {
            Strategy::PassThrough => {}
            Strategy::Nested => {
                let (form, record_ty) = nested_form(&field.ty);
                collect_generics_from_type(record_ty, generics, &mut output.nested_generics);
                output
                    .access_arms
                    .push(nested_arm(index, &member, form, span));
                output
                    .field_metas
                    .push(nested_meta(index, &name, form, record_ty, span));
            }
            Strategy::Directives(directives) => {
                // Unsupported shapes are skipped: the field is not eligible
                // for any transform and never reaches a plan.
                let Some(shape) = leaf_shape(&field.ty) else {
                    continue;
                };
                let action_path = crate_path("Action");
                let directive_path = crate_path("RawDirective");
                let raw_directives = directives.iter().map(|directive| {
                    let variant = format_ident!("{}", directive.action.variant());
                    let parameter = &directive.parameter;
                    quote_spanned! { parameter.span() =>
                        #directive_path::new(#action_path::#variant, #parameter)
                    }
                });
                let shape_tokens = shape_path(shape);
                let field_meta = crate_path("FieldMeta");
                output.access_arms.push(leaf_arm(index, &member, shape, span));
                output.field_metas.push(quote_spanned! { span =>
                    #field_meta::leaf(#index, #name, #shape_tokens, ::std::vec![#(#raw_directives),*])
                });
            }
        }
    }

    Ok(output)
}

fn shape_path(shape: LeafShape) -> TokenStream {
    let shape_path = crate_path("Shape");
    match shape {
        LeafShape::Text => quote! { #shape_path::Text },
        LeafShape::Bytes => quote! { #shape_path::Bytes },
        LeafShape::TextSequence => quote! { #shape_path::TextSequence },
        LeafShape::TextMapping => quote! { #shape_path::TextMapping },
    }
}

fn leaf_arm(index: usize, member: &Member, shape: LeafShape, span: Span) -> TokenStream {
    let slot = crate_path("FieldSlot");
    let variant = match shape {
        LeafShape::Text => quote! { Text },
        LeafShape::Bytes => quote! { Bytes },
        LeafShape::TextSequence => quote! { TextSequence },
        LeafShape::TextMapping => quote! { TextMapping },
    };
    quote_spanned! { span =>
        #index => ::core::option::Option::Some(#slot::#variant(&mut self.#member)),
    }
}

fn nested_arm(index: usize, member: &Member, form: NestedForm, span: Span) -> TokenStream {
    let slot = crate_path("FieldSlot");
    match form {
        NestedForm::Plain => quote_spanned! { span =>
            #index => ::core::option::Option::Some(#slot::Record(&mut self.#member)),
        },
        NestedForm::Boxed => quote_spanned! { span =>
            #index => ::core::option::Option::Some(#slot::Record(&mut *self.#member)),
        },
        NestedForm::Optional => quote_spanned! { span =>
            #index => ::core::option::Option::Some(match self.#member.as_mut() {
                ::core::option::Option::Some(inner) => #slot::Record(inner),
                ::core::option::Option::None => #slot::Absent,
            }),
        },
        NestedForm::OptionalBoxed => quote_spanned! { span =>
            #index => ::core::option::Option::Some(match self.#member.as_deref_mut() {
                ::core::option::Option::Some(inner) => #slot::Record(inner),
                ::core::option::Option::None => #slot::Absent,
            }),
        },
    }
}

fn nested_meta(
    index: usize,
    name: &str,
    form: NestedForm,
    record_ty: &syn::Type,
    span: Span,
) -> TokenStream {
    let field_meta = crate_path("FieldMeta");
    let guarded = crate_path("Guarded");
    let optional = form.is_optional();
    quote_spanned! { span =>
        #field_meta::nested(#index, #name, #optional, <#record_ty as #guarded>::schema)
    }
}
