//! Field resolution between a model contract and a caller schema.
//!
//! [`FieldResolver::resolve`] runs once per (model, caller schema) pair and
//! produces a [`FieldIndexMap`] from every active model field to a column
//! position of the caller's Arrow schema:
//!
//! 1. Index caller aliases by their lower-cased name.
//! 2. For each active field, in contract order, look up its lower-cased
//!    name and check the column's kind with
//!    [`is_compatible`](crate::kinds::is_compatible).
//! 3. Fail on the first problem; a partial map is never returned.
//!
//! Alias collisions (`"Age"` and `"age"` in one schema) are governed by
//! [`AliasCollision`].

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use arrow_schema::Schema;
use tracing::{debug, warn};

use crate::error::{ScoringError, ScoringResult};
use crate::kinds::{format_kind, is_compatible, parse_kind};
use crate::types::{FieldName, FieldSpec};

/// How to treat caller aliases that are equal ignoring case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AliasCollision {
    /// Reject the schema with [`ScoringError::DuplicateAlias`].
    #[default]
    FailFast,
    /// The later column shadows the earlier one.
    LastWins,
}

/// Resolved positions of the model's active fields in a caller schema.
///
/// Immutable once built. Lookups are by exact model field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldIndexMap {
    positions: HashMap<FieldName, usize>,
}

impl FieldIndexMap {
    /// Returns the caller position of `field`.
    #[must_use]
    pub fn get(&self, field: &FieldName) -> Option<usize> {
        self.positions.get(field).copied()
    }

    /// Number of resolved fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns `true` if no fields were resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Iterates over `(field, position)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, usize)> {
        self.positions.iter().map(|(name, pos)| (name, *pos))
    }
}

impl FromIterator<(FieldName, usize)> for FieldIndexMap {
    fn from_iter<I: IntoIterator<Item = (FieldName, usize)>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}

/// Stateless resolver, parameterized by the alias collision policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldResolver {
    collision: AliasCollision,
}

impl FieldResolver {
    /// Creates a resolver with the given collision policy.
    #[must_use]
    pub fn new(collision: AliasCollision) -> Self {
        Self { collision }
    }

    /// Resolves every active field against `schema`.
    ///
    /// # Errors
    ///
    /// - [`ScoringError::DuplicateAlias`] if two aliases collide under
    ///   [`AliasCollision::FailFast`]
    /// - [`ScoringError::UnsupportedKind`] if an active field's kind has no
    ///   external type, so no caller value could be prepared for it
    /// - [`ScoringError::UnresolvedField`] if an active field has no alias
    /// - [`ScoringError::UnsupportedExternalType`] if the matched column's
    ///   type has no model kind
    /// - [`ScoringError::IncompatibleFieldType`] if the matched column's
    ///   kind cannot feed the field
    pub fn resolve(
        &self,
        active_fields: &[FieldSpec],
        schema: &Schema,
    ) -> ScoringResult<FieldIndexMap> {
        let aliases = self.alias_index(schema)?;

        let mut positions = HashMap::with_capacity(active_fields.len());
        for spec in active_fields {
            format_kind(spec.kind)?;
            let Some(&index) = aliases.get(&spec.name.as_str().to_lowercase()) else {
                return Err(ScoringError::UnresolvedField(spec.name.clone()));
            };

            let column = schema.field(index);
            let actual = parse_kind(column.data_type())?;
            if !is_compatible(spec.kind, actual) {
                return Err(ScoringError::IncompatibleFieldType {
                    field: spec.name.clone(),
                    actual,
                    expected: spec.kind,
                });
            }

            debug!(
                field = %spec.name,
                column = %column.name(),
                index,
                "resolved active field"
            );
            positions.insert(spec.name.clone(), index);
        }

        Ok(FieldIndexMap { positions })
    }

    fn alias_index(&self, schema: &Schema) -> ScoringResult<HashMap<String, usize>> {
        let mut aliases: HashMap<String, usize> = HashMap::with_capacity(schema.fields().len());
        for (i, field) in schema.fields().iter().enumerate() {
            match aliases.entry(field.name().to_lowercase()) {
                Entry::Vacant(slot) => {
                    slot.insert(i);
                }
                Entry::Occupied(mut slot) => {
                    let first = schema.field(*slot.get()).name().clone();
                    match self.collision {
                        AliasCollision::FailFast => {
                            return Err(ScoringError::DuplicateAlias {
                                first,
                                second: field.name().clone(),
                            });
                        }
                        AliasCollision::LastWins => {
                            warn!(
                                shadowed = %first,
                                alias = %field.name(),
                                "caller alias shadows an earlier column"
                            );
                            slot.insert(i);
                        }
                    }
                }
            }
        }
        Ok(aliases)
    }
}
