// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use crate::model::{Location, Type};
use crate::source::Source;
use crate::Rc;

/// Reasons two shapes cannot be joined.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MergeError {
    /// Structurally incompatible variants, e.g. a dictionary and a scalar.
    #[error("shape conflict: {left} is incompatible with {right}{}", seen_at(.left, .right))]
    ShapeConflict { left: Box<Type>, right: Box<Type> },
    /// Tuples of different arity.
    #[error(
        "length conflict: {left} has {} elements but {right} has {}{}",
        arity(.left),
        arity(.right),
        seen_at(.left, .right)
    )]
    LengthConflict { left: Box<Type>, right: Box<Type> },
    #[error("structure nested deeper than the limit of {limit}")]
    RecursionLimitExceeded { limit: usize },
}

fn arity(ty: &Type) -> usize {
    ty.items().map_or(0, <[Type]>::len)
}

fn seen_at(left: &Type, right: &Type) -> String {
    let mut out = String::new();
    for (side, ty) in [("left", left), ("right", right)] {
        if ty.locations.is_empty() {
            continue;
        }
        let _ = write!(out, "; {side} seen at ");
        for (idx, location) in ty.locations.iter().enumerate() {
            if idx > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{location}");
        }
    }
    out
}

impl MergeError {
    pub(crate) fn shape(left: &Type, right: &Type) -> Self {
        MergeError::ShapeConflict {
            left: Box::new(left.clone()),
            right: Box::new(right.clone()),
        }
    }

    pub(crate) fn length(left: &Type, right: &Type) -> Self {
        MergeError::LengthConflict {
            left: Box::new(left.clone()),
            right: Box::new(right.clone()),
        }
    }

    /// Locations of both conflicting sides, left side first.
    pub fn locations(&self) -> Vec<&Location> {
        match self {
            MergeError::ShapeConflict { left, right }
            | MergeError::LengthConflict { left, right } => {
                left.locations.iter().chain(right.locations.iter()).collect()
            }
            MergeError::RecursionLimitExceeded { .. } => Vec::new(),
        }
    }
}

/// Errors raised while inferring the shape of a template's inputs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Merge(#[from] MergeError),

    /// A merge failed while binding one argument of a macro call.
    #[error("call to `{macro_name}`: argument `{param}`: {source}")]
    Argument {
        macro_name: Rc<str>,
        param: Rc<str>,
        source: MergeError,
    },

    #[error("macro `{name}` is not defined")]
    UnknownMacro { name: Rc<str> },

    #[error("macro `{name}` is already defined")]
    DuplicateMacro { name: Rc<str> },

    #[error("call to `{macro_name}`: keyword `{keyword}` passed more than once")]
    DuplicateKeyword {
        macro_name: Rc<str>,
        keyword: Rc<str>,
    },

    #[error("call to `{macro_name}`: missing required argument `{param}`")]
    MissingArgument {
        macro_name: Rc<str>,
        param: Rc<str>,
    },

    #[error("call to `{macro_name}`: takes {expected} positional arguments but {passed} were given")]
    TooManyPositional {
        macro_name: Rc<str>,
        expected: usize,
        passed: usize,
    },

    #[error("call to `{macro_name}`: unexpected keyword argument `{keyword}`")]
    UnexpectedKeyword {
        macro_name: Rc<str>,
        keyword: Rc<str>,
    },

    #[error("{location}: {message}")]
    UnsupportedExpression { location: Location, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// Wraps a merge failure with the parameter it happened on. Other errors
    /// pass through unchanged.
    pub(crate) fn for_argument(self, macro_name: &Rc<str>, param: &Rc<str>) -> Error {
        match self {
            Error::Merge(source) => Error::Argument {
                macro_name: macro_name.clone(),
                param: param.clone(),
                source,
            },
            other => other,
        }
    }

    /// The underlying merge failure, if any.
    pub fn merge_error(&self) -> Option<&MergeError> {
        match self {
            Error::Merge(e) | Error::Argument { source: e, .. } => Some(e),
            _ => None,
        }
    }

    pub fn locations(&self) -> Vec<&Location> {
        match self {
            Error::UnsupportedExpression { location, .. } => vec![location],
            _ => self
                .merge_error()
                .map(MergeError::locations)
                .unwrap_or_default(),
        }
    }

    /// Renders the error against `source`, pointing at the first location
    /// that belongs to it. Falls back to the plain message.
    pub fn render(&self, source: &Source) -> String {
        let msg = self.to_string();
        match self
            .locations()
            .into_iter()
            .find(|location| location.file == *source.file())
        {
            Some(location) => source.message(location.line, location.col, "error", &msg),
            None => msg,
        }
    }
}
