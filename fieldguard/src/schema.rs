//! Type metadata and positional field access.
//!
//! `#[derive(Guarded)]` generates both halves for a struct:
//! - [`Guarded::schema`] describes every eligible field once, at plan
//!   compilation time.
//! - [`FieldAccess::field_mut`] hands out a typed mutable view of a field by
//!   its declaration index, which is all the traversal engine needs at call
//!   time.
//!
//! Both can be written by hand for types the derive cannot handle. The two
//! must agree: an index described as a text leaf in the schema must yield
//! [`FieldSlot::Text`].

use std::{
    any::TypeId,
    collections::{BTreeMap, HashMap},
    fmt,
};

use crate::{
    boundary::Action,
    capability::CapabilityError,
    registry::Capabilities,
};

/// The shape of a transformable field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    /// `String`
    Text,
    /// `Vec<u8>`
    Bytes,
    /// `Vec<String>`; every element is transformed.
    TextSequence,
    /// A map with `String` values; every value is transformed, keys never.
    TextMapping,
}

/// Mutable access to the string values of a map, keys left untouched.
pub trait TextMapping {
    /// Iterates entries as `(key, value)`. Keys are only used in diagnostics.
    fn entries_mut<'a>(
        &'a mut self,
    ) -> Box<dyn Iterator<Item = (&'a dyn fmt::Debug, &'a mut String)> + 'a>;
}

fn debug_entry<'a, K: fmt::Debug>(
    (key, value): (&'a K, &'a mut String),
) -> (&'a dyn fmt::Debug, &'a mut String) {
    (key, value)
}

impl<K: fmt::Debug, S> TextMapping for HashMap<K, String, S> {
    fn entries_mut<'a>(
        &'a mut self,
    ) -> Box<dyn Iterator<Item = (&'a dyn fmt::Debug, &'a mut String)> + 'a> {
        Box::new(self.iter_mut().map(debug_entry))
    }
}

impl<K: fmt::Debug> TextMapping for BTreeMap<K, String> {
    fn entries_mut<'a>(
        &'a mut self,
    ) -> Box<dyn Iterator<Item = (&'a dyn fmt::Debug, &'a mut String)> + 'a> {
        Box::new(self.iter_mut().map(debug_entry))
    }
}

/// A mutable view of one field.
pub enum FieldSlot<'a> {
    Text(&'a mut String),
    Bytes(&'a mut Vec<u8>),
    TextSequence(&'a mut Vec<String>),
    TextMapping(&'a mut dyn TextMapping),
    /// A nested record to walk into.
    Record(&'a mut dyn FieldAccess),
    /// An optional nested record that is currently `None`.
    Absent,
}

impl fmt::Debug for FieldSlot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text(_) => "Text",
            Self::Bytes(_) => "Bytes",
            Self::TextSequence(_) => "TextSequence",
            Self::TextMapping(_) => "TextMapping",
            Self::Record(_) => "Record",
            Self::Absent => "Absent",
        })
    }
}

/// Positional mutable field access.
pub trait FieldAccess {
    /// Returns the field at declaration index `index`, or `None` if the index
    /// is not one the schema describes.
    fn field_mut(&mut self, index: usize) -> Option<FieldSlot<'_>>;
}

/// A record type whose fields carry boundary directives.
///
/// `Clone` must be a deep copy: outbound boundaries transform a clone and the
/// caller's value must stay untouched.
pub trait Guarded: FieldAccess + Clone + 'static {
    /// Actions for which the type supplies its own implementation through the
    /// override traits ([`crate::Hashable`] and friends).
    const OVERRIDES: &'static [Action] = &[];

    /// Describes the type's eligible fields.
    fn schema() -> Schema;

    /// Runs the override for `action`, or returns `None` when the type has none.
    fn run_override(
        &mut self,
        action: Action,
        capabilities: &Capabilities,
    ) -> Option<Result<(), CapabilityError>> {
        let _ = (action, capabilities);
        None
    }
}

/// A directive as written on a field: the action and its unchecked parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawDirective {
    action: Action,
    parameter: &'static str,
}

impl RawDirective {
    #[must_use]
    pub const fn new(action: Action, parameter: &'static str) -> Self {
        Self { action, parameter }
    }

    #[must_use]
    pub const fn action(&self) -> Action {
        self.action
    }

    #[must_use]
    pub const fn parameter(&self) -> &'static str {
        self.parameter
    }
}

#[derive(Clone, Debug)]
pub enum FieldKind {
    /// A transformable field.
    Leaf {
        shape: Shape,
        directives: Vec<RawDirective>,
    },
    /// A nested record, optionally behind an `Option`.
    Nested {
        optional: bool,
        schema: fn() -> Schema,
    },
}

/// One field of a [`Schema`].
#[derive(Clone, Debug)]
pub struct FieldMeta {
    index: usize,
    name: &'static str,
    kind: FieldKind,
}

impl FieldMeta {
    #[must_use]
    pub fn leaf(
        index: usize,
        name: &'static str,
        shape: Shape,
        directives: Vec<RawDirective>,
    ) -> Self {
        Self {
            index,
            name,
            kind: FieldKind::Leaf { shape, directives },
        }
    }

    #[must_use]
    pub fn nested(index: usize, name: &'static str, optional: bool, schema: fn() -> Schema) -> Self {
        Self {
            index,
            name,
            kind: FieldKind::Nested { optional, schema },
        }
    }

    /// Declaration index, as accepted by [`FieldAccess::field_mut`].
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }
}

/// Field metadata for one record type.
#[derive(Clone, Debug)]
pub struct Schema {
    type_id: TypeId,
    type_name: &'static str,
    fields: Vec<FieldMeta>,
}

impl Schema {
    #[must_use]
    pub fn new<T: 'static>(type_name: &'static str, fields: Vec<FieldMeta>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name,
            fields,
        }
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mappings_expose_values_and_keep_keys() {
        let mut map: HashMap<u32, String> = HashMap::from([(1, "a".into()), (2, "b".into())]);
        for (_, value) in map.entries_mut() {
            value.push('!');
        }
        assert_eq!(map[&1], "a!");
        assert_eq!(map[&2], "b!");

        let mut ordered: BTreeMap<String, String> = BTreeMap::from([("k".into(), "v".into())]);
        let keys: Vec<String> = ordered
            .entries_mut()
            .map(|(key, _)| format!("{key:?}"))
            .collect();
        assert_eq!(keys, vec!["\"k\""]);
    }

    #[test]
    fn schema_records_type_identity() {
        struct Marker;
        let schema = Schema::new::<Marker>(
            "Marker",
            vec![FieldMeta::leaf(
                0,
                "secret",
                Shape::Text,
                vec![RawDirective::new(Action::Redact, "[hidden]")],
            )],
        );
        assert_eq!(schema.type_id(), TypeId::of::<Marker>());
        assert_eq!(schema.fields()[0].name(), "secret");
        assert!(matches!(
            schema.fields()[0].kind(),
            FieldKind::Leaf { shape: Shape::Text, .. }
        ));
    }
}
