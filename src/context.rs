// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::model::Type;

/// Expected shape at the expression currently being visited.
///
/// Contexts are values: each visit receives its own copy, so sibling visits
/// never observe each other's predictions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Context {
    pub predicted_struct: Type,
}

impl Context {
    pub fn new(predicted_struct: Type) -> Self {
        Context { predicted_struct }
    }

    /// Nothing is expected yet.
    pub fn unknown() -> Self {
        Self::default()
    }
}
