// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Template expressions as handed to [`crate::StructureVisitor`].
//!
//! There is no parser here; whoever walks the template builds these nodes.

use crate::source::Span;
use crate::*;

use core::{cmp, fmt, ops::Deref};

pub struct NodeRef<T> {
    r: Rc<T>,
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        Self { r: self.r.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.r.as_ref().fmt(f)
    }
}

impl<T> cmp::PartialEq for NodeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::as_ptr(&self.r).eq(&Rc::as_ptr(&other.r))
    }
}

impl<T> cmp::Eq for NodeRef<T> {}

impl<T> Deref for NodeRef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.r
    }
}

impl<T> AsRef<T> for NodeRef<T> {
    fn as_ref(&self) -> &T {
        self.deref()
    }
}

impl<T> NodeRef<T> {
    pub fn new(t: T) -> Self {
        Self { r: Rc::new(t) }
    }
}

pub type Ref<T> = NodeRef<T>;

pub type ExprRef = Ref<Expr>;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(Rc<str>),
    Number(f64),
    Bool(bool),
    None,
}

#[derive(Debug)]
pub enum Expr {
    /// A variable reference.
    Name { span: Span, name: Rc<str> },

    Literal { span: Span, value: Literal },

    /// `node.attr`
    Getattr {
        span: Span,
        node: ExprRef,
        attr: Rc<str>,
    },

    /// `node[index]`
    Getitem {
        span: Span,
        node: ExprRef,
        index: ExprRef,
    },

    List { span: Span, items: Vec<ExprRef> },

    Tuple { span: Span, items: Vec<ExprRef> },

    Dict {
        span: Span,
        pairs: Vec<(ExprRef, ExprRef)>,
    },

    /// `node | name(args...)`
    Filter {
        span: Span,
        node: ExprRef,
        name: Rc<str>,
        args: Vec<ExprRef>,
    },
}

impl Expr {
    pub const fn span(&self) -> &Span {
        match *self {
            Self::Name { ref span, .. }
            | Self::Literal { ref span, .. }
            | Self::Getattr { ref span, .. }
            | Self::Getitem { ref span, .. }
            | Self::List { ref span, .. }
            | Self::Tuple { ref span, .. }
            | Self::Dict { ref span, .. }
            | Self::Filter { ref span, .. } => span,
        }
    }

    pub fn name(span: Span, name: &str) -> ExprRef {
        Ref::new(Expr::Name {
            span,
            name: name.into(),
        })
    }

    pub fn literal(span: Span, value: Literal) -> ExprRef {
        Ref::new(Expr::Literal { span, value })
    }

    pub fn string(span: Span, value: &str) -> ExprRef {
        Self::literal(span, Literal::String(value.into()))
    }

    pub fn number(span: Span, value: f64) -> ExprRef {
        Self::literal(span, Literal::Number(value))
    }

    pub fn getattr(span: Span, node: ExprRef, attr: &str) -> ExprRef {
        Ref::new(Expr::Getattr {
            span,
            node,
            attr: attr.into(),
        })
    }

    pub fn getitem(span: Span, node: ExprRef, index: ExprRef) -> ExprRef {
        Ref::new(Expr::Getitem { span, node, index })
    }

    pub fn list(span: Span, items: Vec<ExprRef>) -> ExprRef {
        Ref::new(Expr::List { span, items })
    }

    pub fn tuple(span: Span, items: Vec<ExprRef>) -> ExprRef {
        Ref::new(Expr::Tuple { span, items })
    }

    pub fn dict(span: Span, pairs: Vec<(ExprRef, ExprRef)>) -> ExprRef {
        Ref::new(Expr::Dict { span, pairs })
    }

    pub fn filter(span: Span, node: ExprRef, name: &str, args: Vec<ExprRef>) -> ExprRef {
        Ref::new(Expr::Filter {
            span,
            node,
            name: name.into(),
            args,
        })
    }
}
