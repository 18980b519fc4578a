// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Join of two structural types describing the same value.

use alloc::boxed::Box;
use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::cmp;

use crate::error::MergeError;
use crate::model::{Location, Type, TypeKind};
use crate::Rc;

/// Nesting bound used by [`merge`].
pub const MAX_MERGE_DEPTH: usize = 64;

/// Joins `left` and `right`.
///
/// `Unknown` is neutral, dictionaries union their fields, lists and
/// equal-length tuples merge element-wise, and scalars always merge. Any
/// other pairing is a [`MergeError::ShapeConflict`]. Neither input is
/// modified.
pub fn merge(left: &Type, right: &Type) -> Result<Type, MergeError> {
    merge_with_limit(left, right, MAX_MERGE_DEPTH)
}

/// Same as [`merge`] with an explicit nesting bound.
pub fn merge_with_limit(left: &Type, right: &Type, limit: usize) -> Result<Type, MergeError> {
    Merger { limit }.merge(left, right, 1)
}

/// Folds `types` into one, starting from `Unknown`.
pub fn merge_all<'a, I>(types: I, limit: usize) -> Result<Type, MergeError>
where
    I: IntoIterator<Item = &'a Type>,
{
    types
        .into_iter()
        .try_fold(Type::unknown(), |acc, ty| merge_with_limit(&acc, ty, limit))
}

struct Merger {
    limit: usize,
}

impl Merger {
    fn merge(&self, left: &Type, right: &Type, depth: usize) -> Result<Type, MergeError> {
        if depth > self.limit {
            return Err(MergeError::RecursionLimitExceeded { limit: self.limit });
        }

        use TypeKind::*;
        let kind = match (&left.kind, &right.kind) {
            (Unknown, _) => right.kind.clone(),
            (_, Unknown) => left.kind.clone(),
            (Scalar(a), Scalar(b)) => Scalar(a.join(*b)),
            (List(a), List(b)) => List(Box::new(self.merge(a, b, depth + 1)?)),
            (Tuple(a), Tuple(b)) => {
                if a.len() != b.len() {
                    return Err(MergeError::length(left, right));
                }
                let items = a
                    .iter()
                    .zip(b.iter())
                    .map(|(x, y)| self.merge(x, y, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                Tuple(items)
            }
            (Dictionary(a), Dictionary(b)) => {
                let mut fields = a.clone();
                for (name, ty) in b {
                    match fields.get_mut(name) {
                        Some(existing) => *existing = self.merge(existing, ty, depth + 1)?,
                        None => {
                            fields.insert(name.clone(), ty.clone());
                        }
                    }
                }
                Dictionary(fields)
            }
            (Scalar(_) | List(_) | Tuple(_) | Dictionary(_), _) => {
                return Err(MergeError::shape(left, right))
            }
        };

        Ok(Type {
            kind,
            label: merge_labels(&left.label, &right.label),
            locations: merge_locations(&left.locations, &right.locations),
        })
    }
}

// Smallest label wins so the result does not depend on argument order.
fn merge_labels(left: &Option<Rc<str>>, right: &Option<Rc<str>>) -> Option<Rc<str>> {
    match (left, right) {
        (Some(a), Some(b)) => Some(cmp::min(a, b).clone()),
        (a, b) => a.as_ref().or(b.as_ref()).cloned(),
    }
}

fn merge_locations(left: &BTreeSet<Location>, right: &BTreeSet<Location>) -> BTreeSet<Location> {
    if right.is_empty() {
        return left.clone();
    }
    left.union(right).cloned().collect()
}
