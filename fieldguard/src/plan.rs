//! Field-plan compilation.
//!
//! A [`TypePlans`] bundle is compiled once per record type from its
//! [`Schema`]: nested records are flattened into index paths, directive
//! parameters are resolved into typed capability identifiers, and the result
//! is frozen. Nothing is introspected at call time.

use std::{any::TypeId, fmt};

use crate::{
    boundary::Action,
    capability::{EncryptAlgo, HashAlgo, MaskType},
    error::{CapabilityKind, CompileError},
    schema::{FieldKind, Schema, Shape},
};

/// A resolved directive parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Parameter {
    /// Used by both `store.encrypt` and `load.decrypt`.
    Encryptor(EncryptAlgo),
    Hasher(HashAlgo),
    Masker(MaskType),
    /// Redaction replacement text.
    Literal(String),
}

impl Parameter {
    fn resolve(action: Action, raw: &str) -> Option<Self> {
        match action {
            Action::Encrypt | Action::Decrypt => raw.parse().ok().map(Self::Encryptor),
            Action::Hash => raw.parse().ok().map(Self::Hasher),
            Action::Mask => raw.parse().ok().map(Self::Masker),
            Action::Redact => Some(Self::Literal(raw.to_string())),
        }
    }

    /// The registry the parameter is looked up in. Literals need none.
    #[must_use]
    pub fn capability_kind(&self) -> Option<CapabilityKind> {
        match self {
            Self::Encryptor(_) => Some(CapabilityKind::Encryptor),
            Self::Hasher(_) => Some(CapabilityKind::Hasher),
            Self::Masker(_) => Some(CapabilityKind::Masker),
            Self::Literal(_) => None,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encryptor(algo) => algo.fmt(f),
            Self::Hasher(algo) => algo.fmt(f),
            Self::Masker(format) => format.fmt(f),
            Self::Literal(text) => f.write_str(text),
        }
    }
}

/// How to reach and transform one field for one action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldPlan {
    path: Vec<usize>,
    optional_steps: Vec<usize>,
    name: String,
    parameter: Parameter,
    shape: Shape,
}

impl FieldPlan {
    /// Declaration indices from the root record down to the field.
    #[must_use]
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Positions in [`Self::path`] that cross an `Option`. An absent value at
    /// any of them skips the field.
    #[must_use]
    pub fn optional_steps(&self) -> &[usize] {
        &self.optional_steps
    }

    /// Dotted field name, e.g. `profile.email`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parameter(&self) -> &Parameter {
        &self.parameter
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        self.shape
    }
}

/// The compiled plans of one record type, one list per action.
///
/// Immutable once built and shared by every processor of the type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypePlans {
    type_name: &'static str,
    hash: Vec<FieldPlan>,
    decrypt: Vec<FieldPlan>,
    encrypt: Vec<FieldPlan>,
    mask: Vec<FieldPlan>,
    redact: Vec<FieldPlan>,
}

/// Accumulated position while descending into nested records.
#[derive(Default)]
struct Cursor {
    path: Vec<usize>,
    optional_steps: Vec<usize>,
    names: Vec<&'static str>,
}

impl Cursor {
    fn dotted(&self, leaf: &str) -> String {
        let mut name = self.names.join(".");
        if !name.is_empty() {
            name.push('.');
        }
        name.push_str(leaf);
        name
    }
}

impl TypePlans {
    /// Compiles the plans for `schema`, recursing into nested records.
    ///
    /// Fields are planned in declaration order, depth first.
    pub fn compile(schema: &Schema) -> Result<Self, CompileError> {
        let mut plans = Self {
            type_name: schema.type_name(),
            hash: Vec::new(),
            decrypt: Vec::new(),
            encrypt: Vec::new(),
            mask: Vec::new(),
            redact: Vec::new(),
        };
        let mut stack = vec![schema.type_id()];
        plans.visit(schema, &mut Cursor::default(), &mut stack)?;
        Ok(plans)
    }

    fn visit(
        &mut self,
        schema: &Schema,
        cursor: &mut Cursor,
        stack: &mut Vec<TypeId>,
    ) -> Result<(), CompileError> {
        for field in schema.fields() {
            match field.kind() {
                FieldKind::Leaf { shape, directives } => {
                    let name = cursor.dotted(field.name());
                    for directive in directives {
                        let action = directive.action();
                        let parameter = Parameter::resolve(action, directive.parameter())
                            .ok_or_else(|| CompileError::InvalidParameter {
                                field: name.clone(),
                                action,
                                parameter: directive.parameter().to_string(),
                            })?;
                        let mut path = cursor.path.clone();
                        path.push(field.index());
                        self.list_mut(action).push(FieldPlan {
                            path,
                            optional_steps: cursor.optional_steps.clone(),
                            name: name.clone(),
                            parameter,
                            shape: *shape,
                        });
                    }
                }
                FieldKind::Nested {
                    optional,
                    schema: nested_schema,
                } => {
                    let nested = nested_schema();
                    if stack.contains(&nested.type_id()) {
                        return Err(CompileError::RecursiveType {
                            field: cursor.dotted(field.name()),
                            type_name: nested.type_name(),
                        });
                    }
                    if *optional {
                        cursor.optional_steps.push(cursor.path.len());
                    }
                    cursor.path.push(field.index());
                    cursor.names.push(field.name());
                    stack.push(nested.type_id());

                    let result = self.visit(&nested, cursor, stack);

                    stack.pop();
                    cursor.names.pop();
                    cursor.path.pop();
                    if *optional {
                        cursor.optional_steps.pop();
                    }
                    result?;
                }
            }
        }
        Ok(())
    }

    fn list_mut(&mut self, action: Action) -> &mut Vec<FieldPlan> {
        match action {
            Action::Hash => &mut self.hash,
            Action::Decrypt => &mut self.decrypt,
            Action::Encrypt => &mut self.encrypt,
            Action::Mask => &mut self.mask,
            Action::Redact => &mut self.redact,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The plans applied for `action`, in application order.
    #[must_use]
    pub fn for_action(&self, action: Action) -> &[FieldPlan] {
        match action {
            Action::Hash => &self.hash,
            Action::Decrypt => &self.decrypt,
            Action::Encrypt => &self.encrypt,
            Action::Mask => &self.mask,
            Action::Redact => &self.redact,
        }
    }

    /// Total number of field plans across all actions.
    #[must_use]
    pub fn len(&self) -> usize {
        Action::ALL.iter().map(|&action| self.for_action(action).len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
