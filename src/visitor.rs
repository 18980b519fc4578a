// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use alloc::string::ToString;
use alloc::vec;
use alloc::vec::Vec;

use indexmap::IndexMap;

use crate::ast::{Expr, ExprRef, Literal};
use crate::config::{Config, IndexedShape};
use crate::context::Context;
use crate::error::{Error, MergeError, Result};
use crate::filters::{self, FilterSignature};
use crate::merge::merge_with_limit;
use crate::model::{Location, ScalarKind, Type, TypeKind};
use crate::source::Span;
use crate::Rc;

/// Outcome of visiting one expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Visited {
    /// Shape of the value the expression produces.
    pub rtype: Type,
    /// Dictionary from each referenced variable to the shape it must have.
    pub usage: Type,
}

impl Visited {
    fn new(rtype: Type, usage: Type) -> Self {
        Visited { rtype, usage }
    }
}

/// Types an expression under a predicted shape.
///
/// The macro binder only talks to expressions through this trait, so any
/// expression representation can be plugged in.
pub trait ExprVisitor {
    type Expr;

    fn visit(&self, expr: &Self::Expr, ctx: Context, config: &Config) -> Result<Visited>;
}

/// Visitor for [`crate::ast::Expr`] trees.
#[derive(Clone, Copy, Debug, Default)]
pub struct StructureVisitor;

impl ExprVisitor for StructureVisitor {
    type Expr = ExprRef;

    fn visit(&self, expr: &ExprRef, ctx: Context, config: &Config) -> Result<Visited> {
        Walk { config }.visit(expr, ctx, 1)
    }
}

fn unsupported(span: &Span, message: &str) -> Error {
    Error::UnsupportedExpression {
        location: span.location(),
        message: message.to_string(),
    }
}

fn literal_kind(value: &Literal) -> ScalarKind {
    match value {
        Literal::String(_) => ScalarKind::String,
        Literal::Number(_) => ScalarKind::Number,
        Literal::Bool(_) => ScalarKind::Boolean,
        Literal::None => ScalarKind::Null,
    }
}

fn integer_index(n: f64) -> Option<usize> {
    if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 {
        Some(n as usize)
    } else {
        None
    }
}

struct Walk<'a> {
    config: &'a Config,
}

impl Walk<'_> {
    fn merge(&self, left: &Type, right: &Type) -> Result<Type> {
        Ok(merge_with_limit(left, right, self.config.max_depth)?)
    }

    fn visit(&self, expr: &ExprRef, ctx: Context, depth: usize) -> Result<Visited> {
        if depth > self.config.max_depth {
            return Err(MergeError::RecursionLimitExceeded {
                limit: self.config.max_depth,
            }
            .into());
        }

        let location = expr.span().location();
        match expr.as_ref() {
            Expr::Name { name, .. } => {
                let rtype = ctx
                    .predicted_struct
                    .with_label(name.clone())
                    .with_location(location);
                Ok(Visited::new(rtype.clone(), Type::field(name.clone(), rtype)))
            }
            Expr::Literal { value, .. } => {
                let literal = Type::scalar_of(literal_kind(value)).with_location(location);
                let rtype = self.merge(&ctx.predicted_struct, &literal)?;
                Ok(Visited::new(rtype, Type::dictionary()))
            }
            Expr::Getattr { node, attr, .. } => {
                self.visit_field(node, attr.clone(), ctx, location, depth)
            }
            Expr::Getitem { node, index, .. } => match index.as_ref() {
                Expr::Literal {
                    value: Literal::String(key),
                    ..
                } => self.visit_field(node, key.clone(), ctx, location, depth),
                Expr::Literal {
                    value: Literal::Number(n),
                    span,
                } => {
                    let idx = integer_index(*n).ok_or_else(|| {
                        unsupported(span, "subscript must be a non-negative integer")
                    })?;
                    self.visit_index(node, idx, ctx, location, depth)
                }
                Expr::Literal { span, .. } => Err(unsupported(
                    span,
                    "subscript must be a string, an integer or a variable",
                )),
                _ => self.visit_dynamic_index(node, index, ctx, location, depth),
            },
            Expr::List { items, .. } => {
                let shape = Type::list(Type::unknown()).with_location(location);
                let predicted = self.merge(&ctx.predicted_struct, &shape)?;
                let element = predicted.item().cloned().unwrap_or_default();
                self.visit_homogeneous(items, predicted, element, depth)
            }
            Expr::Tuple { items, .. } => {
                // A tuple literal is accepted where a list is expected.
                if let TypeKind::List(element) = &ctx.predicted_struct.kind {
                    let element = (**element).clone();
                    return self.visit_homogeneous(items, ctx.predicted_struct, element, depth);
                }

                let shape = Type::tuple(vec![Type::unknown(); items.len()]).with_location(location);
                let predicted = self.merge(&ctx.predicted_struct, &shape)?;
                let expected = predicted.items().map(<[Type]>::to_vec).unwrap_or_default();

                let mut rtypes = Vec::with_capacity(items.len());
                let mut usage = Type::dictionary();
                for (item, expected) in items.iter().zip(expected) {
                    let visited = self.visit(item, Context::new(expected), depth + 1)?;
                    usage = self.merge(&usage, &visited.usage)?;
                    rtypes.push(visited.rtype);
                }
                let rtype = self.merge(&predicted, &Type::tuple(rtypes))?;
                Ok(Visited::new(rtype, usage))
            }
            Expr::Dict { pairs, .. } => {
                let shape = Type::dictionary().with_location(location);
                let predicted = self.merge(&ctx.predicted_struct, &shape)?;

                let mut fields = IndexMap::new();
                let mut usage = Type::dictionary();
                for (key, value) in pairs {
                    let Expr::Literal {
                        value: Literal::String(name),
                        ..
                    } = key.as_ref()
                    else {
                        return Err(unsupported(
                            key.span(),
                            "dictionary keys must be string literals",
                        ));
                    };
                    let expected = predicted.get(name).cloned().unwrap_or_default();
                    let visited = self.visit(value, Context::new(expected), depth + 1)?;
                    usage = self.merge(&usage, &visited.usage)?;
                    fields.insert(name.clone(), visited.rtype);
                }
                let rtype = self.merge(&predicted, &TypeKind::Dictionary(fields).into())?;
                Ok(Visited::new(rtype, usage))
            }
            Expr::Filter {
                node, name, args, ..
            } => self.visit_filter(node, name, args, ctx, location, depth),
        }
    }

    /// `node.name` and `node["name"]`.
    fn visit_field(
        &self,
        node: &ExprRef,
        name: Rc<str>,
        ctx: Context,
        location: Location,
        depth: usize,
    ) -> Result<Visited> {
        let field = ctx
            .predicted_struct
            .with_label(name.clone())
            .with_location(location);
        let container = Type::field(name.clone(), field.clone());
        let inner = self.visit(node, Context::new(container), depth + 1)?;
        let rtype = inner.rtype.get(&name).cloned().unwrap_or(field);
        Ok(Visited::new(rtype, inner.usage))
    }

    /// `node[0]`.
    fn visit_index(
        &self,
        node: &ExprRef,
        idx: usize,
        ctx: Context,
        location: Location,
        depth: usize,
    ) -> Result<Visited> {
        let element = ctx.predicted_struct.with_location(location.clone());
        match self.config.integer_index_type {
            IndexedShape::List => {
                let inner = self.visit(node, Context::new(Type::list(element.clone())), depth + 1)?;
                let rtype = inner.rtype.item().cloned().unwrap_or(element);
                Ok(Visited::new(rtype, inner.usage))
            }
            IndexedShape::Tuple => {
                if idx >= self.config.max_tuple_width {
                    return Err(Error::UnsupportedExpression {
                        location,
                        message: alloc::format!(
                            "tuple subscript {idx} exceeds the limit of {} elements",
                            self.config.max_tuple_width
                        ),
                    });
                }
                let mut items = vec![Type::unknown(); idx];
                items.push(element.clone());
                let inner = self.visit(node, Context::new(Type::tuple(items)), depth + 1)?;
                let rtype = inner
                    .rtype
                    .items()
                    .and_then(|items| items.get(idx))
                    .cloned()
                    .unwrap_or(element);
                Ok(Visited::new(rtype, inner.usage))
            }
            IndexedShape::Dictionary => {
                let ctx = Context::new(element);
                self.visit_field(node, idx.to_string().into(), ctx, location, depth)
            }
        }
    }

    /// `node[key]` where `key` is itself an expression.
    fn visit_dynamic_index(
        &self,
        node: &ExprRef,
        index: &ExprRef,
        ctx: Context,
        location: Location,
        depth: usize,
    ) -> Result<Visited> {
        let key = self.visit(index, Context::new(Type::scalar()), depth + 1)?;
        let element = ctx.predicted_struct.with_location(location.clone());

        let inner = match self.config.variable_index_type {
            IndexedShape::Dictionary => {
                // Field names are not known statically.
                let container = Type::dictionary().with_location(location);
                let inner = self.visit(node, Context::new(container), depth + 1)?;
                Visited::new(element, inner.usage)
            }
            IndexedShape::List | IndexedShape::Tuple => {
                let inner = self.visit(node, Context::new(Type::list(element.clone())), depth + 1)?;
                let rtype = inner.rtype.item().cloned().unwrap_or(element);
                Visited::new(rtype, inner.usage)
            }
        };

        let usage = self.merge(&inner.usage, &key.usage)?;
        Ok(Visited::new(inner.rtype, usage))
    }

    fn visit_homogeneous(
        &self,
        items: &[ExprRef],
        predicted: Type,
        element: Type,
        depth: usize,
    ) -> Result<Visited> {
        let mut item_type = element.clone();
        let mut usage = Type::dictionary();
        for item in items {
            let visited = self.visit(item, Context::new(element.clone()), depth + 1)?;
            item_type = self.merge(&item_type, &visited.rtype)?;
            usage = self.merge(&usage, &visited.usage)?;
        }
        let rtype = self.merge(&predicted, &Type::list(item_type))?;
        Ok(Visited::new(rtype, usage))
    }

    fn visit_filter(
        &self,
        node: &ExprRef,
        name: &str,
        args: &[ExprRef],
        ctx: Context,
        location: Location,
        depth: usize,
    ) -> Result<Visited> {
        let mut first_arg = Type::unknown();
        let (rtype, mut usage) = match filters::lookup(name) {
            Some(FilterSignature::Fixed { input, output }) => {
                let rtype = self.merge(&ctx.predicted_struct, &output().with_location(location))?;
                let inner = self.visit(node, Context::new(input()), depth + 1)?;
                (rtype, inner.usage)
            }
            Some(FilterSignature::Passthrough { input }) => {
                let expected = self.merge(&ctx.predicted_struct, &input())?;
                let inner = self.visit(node, Context::new(expected), depth + 1)?;
                (inner.rtype, inner.usage)
            }
            Some(FilterSignature::Fallback) => {
                let inner = self.visit(node, ctx.clone(), depth + 1)?;
                first_arg = ctx.predicted_struct;
                (inner.rtype, inner.usage)
            }
            Some(FilterSignature::Element) => {
                let element = ctx.predicted_struct.with_location(location);
                let inner = self.visit(node, Context::new(Type::list(element.clone())), depth + 1)?;
                let rtype = inner.rtype.item().cloned().unwrap_or(element);
                (rtype, inner.usage)
            }
            None => {
                let inner = self.visit(node, Context::unknown(), depth + 1)?;
                (ctx.predicted_struct, inner.usage)
            }
        };

        for (idx, arg) in args.iter().enumerate() {
            let expected = if idx == 0 {
                first_arg.clone()
            } else {
                Type::unknown()
            };
            let visited = self.visit(arg, Context::new(expected), depth + 1)?;
            usage = self.merge(&usage, &visited.usage)?;
        }

        Ok(Visited::new(rtype, usage))
    }
}
