//! Type utilities for the derive macro.
//!
//! Shapes are recognised syntactically from the last path segment, so
//! `String`, `std::string::String` and `alloc::string::String` all match.
//! Type aliases are not resolved.

use syn::{GenericArgument, PathArguments, PathSegment, Type};

/// The transformable shape of a directive-bearing field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LeafShape {
    Text,
    Bytes,
    TextSequence,
    TextMapping,
}

/// How a nested record is held by its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NestedForm {
    /// `T`
    Plain,
    /// `Box<T>`
    Boxed,
    /// `Option<T>`
    Optional,
    /// `Option<Box<T>>`
    OptionalBoxed,
}

impl NestedForm {
    pub(crate) fn is_optional(self) -> bool {
        matches!(self, Self::Optional | Self::OptionalBoxed)
    }
}

fn last_segment(ty: &Type) -> Option<&PathSegment> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path.path.segments.last(),
        Type::Group(group) => last_segment(&group.elem),
        Type::Paren(paren) => last_segment(&paren.elem),
        _ => None,
    }
}

fn type_arguments(segment: &PathSegment) -> Vec<&Type> {
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return Vec::new();
    };
    args.args
        .iter()
        .filter_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        })
        .collect()
}

fn is_bare(ty: &Type, name: &str) -> bool {
    last_segment(ty).is_some_and(|segment| segment.ident == name && segment.arguments.is_empty())
}

/// Returns the single type argument of `Wrapper<T>` when `ty` is that wrapper.
fn unwrap_single<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let segment = last_segment(ty)?;
    if segment.ident != wrapper {
        return None;
    }
    match type_arguments(segment).as_slice() {
        [inner] => Some(inner),
        _ => None,
    }
}

/// Classifies a field type as one of the transformable shapes.
///
/// Returns `None` for anything else; such fields never appear in a plan even
/// when they carry directives.
pub(crate) fn leaf_shape(ty: &Type) -> Option<LeafShape> {
    if is_bare(ty, "String") {
        return Some(LeafShape::Text);
    }

    let segment = last_segment(ty)?;
    let args = type_arguments(segment);
    match segment.ident.to_string().as_str() {
        "Vec" => match args.as_slice() {
            [inner] if is_bare(inner, "u8") => Some(LeafShape::Bytes),
            [inner] if is_bare(inner, "String") => Some(LeafShape::TextSequence),
            _ => None,
        },
        "HashMap" => match args.as_slice() {
            [_, value] | [_, value, _] if is_bare(value, "String") => Some(LeafShape::TextMapping),
            _ => None,
        },
        "BTreeMap" => match args.as_slice() {
            [_, value] if is_bare(value, "String") => Some(LeafShape::TextMapping),
            _ => None,
        },
        _ => None,
    }
}

/// Splits a nested-record field type into its holding form and record type.
pub(crate) fn nested_form(ty: &Type) -> (NestedForm, &Type) {
    if let Some(inner) = unwrap_single(ty, "Option") {
        return match unwrap_single(inner, "Box") {
            Some(record) => (NestedForm::OptionalBoxed, record),
            None => (NestedForm::Optional, inner),
        };
    }
    match unwrap_single(ty, "Box") {
        Some(record) => (NestedForm::Boxed, record),
        None => (NestedForm::Plain, ty),
    }
}
