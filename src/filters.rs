// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! What each template filter requires of its input and what it yields.

use alloc::collections::BTreeMap;
use alloc::vec;

use lazy_static::lazy_static;

use crate::model::Type;

/// Shape constraints of a filter.
#[derive(Clone, Copy)]
pub(crate) enum FilterSignature {
    /// Fixed input and output shapes.
    Fixed {
        input: fn() -> Type,
        output: fn() -> Type,
    },
    /// Output has the same shape as the input, which is at least `input`.
    /// Arguments are unconstrained.
    Passthrough { input: fn() -> Type },
    /// `default`: output is either the input or the first argument, so both
    /// take the expected shape.
    Fallback,
    /// Input is a list, output is one of its elements.
    Element,
}

fn unknown() -> Type {
    Type::unknown()
}

fn scalar() -> Type {
    Type::scalar()
}

fn string() -> Type {
    Type::string()
}

fn number() -> Type {
    Type::number()
}

fn boolean() -> Type {
    Type::boolean()
}

fn dictionary() -> Type {
    Type::dictionary()
}

fn any_list() -> Type {
    Type::list(Type::unknown())
}

fn scalar_list() -> Type {
    Type::list(Type::scalar())
}

fn string_list() -> Type {
    Type::list(Type::string())
}

fn number_list() -> Type {
    Type::list(Type::number())
}

fn dict_items() -> Type {
    Type::list(Type::tuple(vec![Type::scalar(), Type::unknown()]))
}

lazy_static! {
    static ref FILTERS: BTreeMap<&'static str, FilterSignature> = {
        use FilterSignature::*;
        let mut m: BTreeMap<&'static str, FilterSignature> = BTreeMap::new();

        for name in [
            "capitalize", "center", "escape", "e", "forceescape", "indent", "lower",
            "replace", "striptags", "title", "trim", "truncate", "upper", "urlencode",
            "urlize", "wordwrap",
        ] {
            m.insert(name, Fixed { input: string, output: string });
        }
        m.insert("wordcount", Fixed { input: string, output: number });
        m.insert("format", Fixed { input: string, output: string });
        m.insert("string", Fixed { input: unknown, output: string });
        m.insert("tojson", Fixed { input: unknown, output: string });
        m.insert("pprint", Fixed { input: unknown, output: string });

        for name in ["abs", "round"] {
            m.insert(name, Fixed { input: number, output: number });
        }
        for name in ["int", "float", "filesizeformat"] {
            m.insert(name, Fixed { input: scalar, output: number });
        }
        for name in ["length", "count"] {
            m.insert(name, Fixed { input: unknown, output: number });
        }

        m.insert("join", Fixed { input: scalar_list, output: string });
        m.insert("sum", Fixed { input: number_list, output: number });
        m.insert("list", Fixed { input: unknown, output: any_list });
        m.insert("dictsort", Fixed { input: dictionary, output: dict_items });
        m.insert("items", Fixed { input: dictionary, output: dict_items });
        m.insert("lines", Fixed { input: string, output: string_list });
        m.insert("bool", Fixed { input: scalar, output: boolean });

        for name in ["default", "d"] {
            m.insert(name, Fallback);
        }
        for name in ["sort", "reverse", "unique"] {
            m.insert(name, Passthrough { input: any_list });
        }
        for name in ["first", "last", "random", "max", "min"] {
            m.insert(name, Element);
        }

        m
    };
}

pub(crate) fn lookup(name: &str) -> Option<FilterSignature> {
    FILTERS.get(name).copied()
}
