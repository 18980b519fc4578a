// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Binding a macro call's arguments to the macro's parameters.
//!
//! Binding runs in a fixed order:
//!
//! 1. positional arguments to positional parameters, in order;
//! 2. surplus positional arguments to keyword parameters, in order;
//! 3. keyword arguments to positional parameters, by name;
//! 4. keyword arguments to keyword parameters, by name;
//!
//! then, for macros accepting arbitrary keywords, every keyword no parameter
//! claimed is captured with its own inferred shape. Each bound argument is
//! visited again with the merge of its inferred shape and the parameter's
//! declared shape, which pushes the declaration down onto the variables the
//! argument references.

use alloc::vec::Vec;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::config::Config;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::merge::merge_with_limit;
use crate::model::Type;
use crate::visitor::ExprVisitor;
use crate::Rc;

/// A declared macro parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Rc<str>,
    /// Shape the macro body requires of the parameter.
    pub expected: Type,
    pub has_default: bool,
}

impl Param {
    pub fn new(name: impl Into<Rc<str>>, expected: Type) -> Self {
        Param {
            name: name.into(),
            expected,
            has_default: false,
        }
    }

    pub fn with_default(name: impl Into<Rc<str>>, expected: Type) -> Self {
        Param {
            has_default: true,
            ..Self::new(name, expected)
        }
    }
}

/// Signature of a macro definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Macro {
    name: Rc<str>,
    positional: Vec<Param>,
    keyword: Vec<Param>,
    accepts_variadic_keywords: bool,
}

impl Macro {
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Macro {
            name: name.into(),
            positional: Vec::new(),
            keyword: Vec::new(),
            accepts_variadic_keywords: false,
        }
    }

    /// Appends a positional parameter.
    pub fn positional(mut self, name: impl Into<Rc<str>>, expected: Type) -> Self {
        self.positional.push(Param::new(name, expected));
        self
    }

    /// Appends a keyword parameter, which has a default value.
    pub fn keyword(mut self, name: impl Into<Rc<str>>, expected: Type) -> Self {
        self.keyword.push(Param::with_default(name, expected));
        self
    }

    /// Appends a keyword parameter with explicit default-ness.
    pub fn keyword_param(mut self, param: Param) -> Self {
        self.keyword.push(param);
        self
    }

    pub fn variadic_keywords(mut self) -> Self {
        self.accepts_variadic_keywords = true;
        self
    }

    pub fn name(&self) -> &Rc<str> {
        &self.name
    }

    pub fn positional_params(&self) -> &[Param] {
        &self.positional
    }

    pub fn keyword_params(&self) -> &[Param] {
        &self.keyword
    }

    pub fn accepts_variadic_keywords(&self) -> bool {
        self.accepts_variadic_keywords
    }
}

/// A keyword argument at a call site.
#[derive(Clone, Debug)]
pub struct Keyword<E> {
    pub name: Rc<str>,
    pub value: E,
}

impl<E> Keyword<E> {
    pub fn new(name: impl Into<Rc<str>>, value: E) -> Self {
        Keyword {
            name: name.into(),
            value,
        }
    }
}

/// What one call site contributes.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    /// Merged shapes of every variable referenced by the arguments.
    pub structure: Type,
    /// Keywords absorbed by the macro's variadic keyword capture.
    pub captured_keywords: Vec<Rc<str>>,
    /// Indexes of positional arguments no parameter accepted.
    pub unbound_positional: Vec<usize>,
    /// Keywords no parameter accepted, on a macro without variadic capture.
    pub unexpected_keywords: Vec<Rc<str>>,
    /// Declared parameters no argument was bound to.
    pub unfilled: Vec<Param>,
}

impl Binding {
    pub fn missing_required(&self) -> impl Iterator<Item = &Param> {
        self.unfilled.iter().filter(|param| !param.has_default)
    }

    /// Every argument found a parameter and every required parameter was given.
    pub fn is_exact(&self) -> bool {
        self.unbound_positional.is_empty()
            && self.unexpected_keywords.is_empty()
            && self.missing_required().next().is_none()
    }
}

struct Passed<'a, E> {
    expr: &'a E,
    inferred: Type,
    consumed: bool,
}

struct Slot {
    param: Param,
    consumed: bool,
}

#[derive(Clone, Copy, Debug)]
enum Target {
    Positional,
    Keyword,
}

/// One call site being bound. Built by [`MacroCall::new`], consumed by
/// [`MacroCall::bind`].
pub struct MacroCall<'a, V: ExprVisitor> {
    macro_name: Rc<str>,
    visitor: &'a V,
    config: &'a Config,
    passed_positional: Vec<Passed<'a, V::Expr>>,
    passed_keyword: IndexMap<Rc<str>, Passed<'a, V::Expr>>,
    expected_positional: Vec<Slot>,
    expected_keyword: Vec<Slot>,
    accepts_variadic_keywords: bool,
    structure: Type,
    binding: Binding,
}

impl<'a, V: ExprVisitor> MacroCall<'a, V> {
    /// Visits every argument with no prediction and records what it yields.
    pub fn new(
        macro_def: &Macro,
        args: &'a [V::Expr],
        kwargs: &'a [Keyword<V::Expr>],
        visitor: &'a V,
        config: &'a Config,
    ) -> Result<Self> {
        let macro_name = macro_def.name.clone();

        let mut passed_positional = Vec::with_capacity(args.len());
        for (idx, expr) in args.iter().enumerate() {
            let inferred = visitor
                .visit(expr, Context::unknown(), config)
                .map_err(|e| e.for_argument(&macro_name, &positional_label(idx)))?
                .rtype;
            passed_positional.push(Passed {
                expr,
                inferred,
                consumed: false,
            });
        }

        let mut passed_keyword: IndexMap<Rc<str>, Passed<'a, V::Expr>> =
            IndexMap::with_capacity(kwargs.len());
        for keyword in kwargs {
            if passed_keyword.contains_key(&keyword.name) {
                return Err(Error::DuplicateKeyword {
                    macro_name,
                    keyword: keyword.name.clone(),
                });
            }
            let inferred = visitor
                .visit(&keyword.value, Context::unknown(), config)
                .map_err(|e| e.for_argument(&macro_name, &keyword.name))?
                .rtype;
            passed_keyword.insert(
                keyword.name.clone(),
                Passed {
                    expr: &keyword.value,
                    inferred,
                    consumed: false,
                },
            );
        }

        let slots = |params: &[Param]| -> Vec<Slot> {
            params
                .iter()
                .map(|param| Slot {
                    param: param.clone(),
                    consumed: false,
                })
                .collect()
        };

        Ok(MacroCall {
            macro_name,
            visitor,
            config,
            passed_positional,
            passed_keyword,
            expected_positional: slots(&macro_def.positional),
            expected_keyword: slots(&macro_def.keyword),
            accepts_variadic_keywords: macro_def.accepts_variadic_keywords,
            structure: Type::dictionary(),
            binding: Binding {
                structure: Type::dictionary(),
                captured_keywords: Vec::new(),
                unbound_positional: Vec::new(),
                unexpected_keywords: Vec::new(),
                unfilled: Vec::new(),
            },
        })
    }

    /// Runs every binding phase. Any merge failure aborts the whole call.
    pub fn bind(mut self) -> Result<Binding> {
        let bound = self.bind_positional(Target::Positional)?;
        debug!(macro_name = %self.macro_name, bound, "positional arguments to positional parameters");

        let bound = self.bind_positional(Target::Keyword)?;
        debug!(macro_name = %self.macro_name, bound, "positional arguments to keyword parameters");

        let bound = self.bind_keywords(Target::Positional)?;
        debug!(macro_name = %self.macro_name, bound, "keyword arguments to positional parameters");

        let bound = self.bind_keywords(Target::Keyword)?;
        debug!(macro_name = %self.macro_name, bound, "keyword arguments to keyword parameters");

        if self.accepts_variadic_keywords {
            let captured = self.capture_keywords()?;
            debug!(macro_name = %self.macro_name, captured, "variadic keyword capture");
        }

        self.absorb_leftovers()?;
        Ok(self.finish())
    }

    fn slots(&self, target: Target) -> &[Slot] {
        match target {
            Target::Positional => &self.expected_positional,
            Target::Keyword => &self.expected_keyword,
        }
    }

    fn slots_mut(&mut self, target: Target) -> &mut Vec<Slot> {
        match target {
            Target::Positional => &mut self.expected_positional,
            Target::Keyword => &mut self.expected_keyword,
        }
    }

    /// Phases 1 and 2: remaining positional arguments against remaining
    /// parameters of `target`, pairwise in order.
    fn bind_positional(&mut self, target: Target) -> Result<usize> {
        let args: Vec<usize> = self
            .passed_positional
            .iter()
            .enumerate()
            .filter(|(_, arg)| !arg.consumed)
            .map(|(idx, _)| idx)
            .collect();
        let slots: Vec<usize> = self
            .slots(target)
            .iter()
            .enumerate()
            .filter(|(_, slot)| !slot.consumed)
            .map(|(idx, _)| idx)
            .collect();

        let mut bound = 0;
        for (&arg_idx, &slot_idx) in args.iter().zip(slots.iter()) {
            let param = self.slots(target)[slot_idx].param.clone();
            let arg = &self.passed_positional[arg_idx];
            trace!(macro_name = %self.macro_name, param = %param.name, position = arg_idx, ?target, "bind");

            let usage = self.revisit(arg.expr, &arg.inferred, Some(&param.expected), &param.name)?;
            self.absorb(&usage, &param.name)?;

            self.passed_positional[arg_idx].consumed = true;
            self.slots_mut(target)[slot_idx].consumed = true;
            bound += 1;
        }
        Ok(bound)
    }

    /// Phases 3 and 4: remaining keyword arguments against remaining
    /// parameters of `target` with the same name.
    fn bind_keywords(&mut self, target: Target) -> Result<usize> {
        let mut bound = 0;
        for kw_idx in 0..self.passed_keyword.len() {
            let Some((name, arg)) = self.passed_keyword.get_index(kw_idx) else {
                continue;
            };
            if arg.consumed {
                continue;
            }
            let Some(slot_idx) = self
                .slots(target)
                .iter()
                .position(|slot| !slot.consumed && slot.param.name == *name)
            else {
                continue;
            };

            let param = self.slots(target)[slot_idx].param.clone();
            trace!(macro_name = %self.macro_name, param = %param.name, ?target, "bind keyword");

            let usage = self.revisit(arg.expr, &arg.inferred, Some(&param.expected), &param.name)?;
            self.absorb(&usage, &param.name)?;

            if let Some((_, arg)) = self.passed_keyword.get_index_mut(kw_idx) {
                arg.consumed = true;
            }
            self.slots_mut(target)[slot_idx].consumed = true;
            bound += 1;
        }
        Ok(bound)
    }

    /// Keywords no parameter claimed feed the catch-all with their own shape.
    fn capture_keywords(&mut self) -> Result<usize> {
        let mut captured = Vec::new();
        for (name, arg) in self.passed_keyword.iter().filter(|(_, arg)| !arg.consumed) {
            trace!(macro_name = %self.macro_name, keyword = %name, "capture");
            let usage = self.revisit(arg.expr, &arg.inferred, None, name)?;
            captured.push((name.clone(), usage));
        }

        for (name, usage) in &captured {
            self.absorb(usage, name)?;
            if let Some(arg) = self.passed_keyword.get_mut(name) {
                arg.consumed = true;
            }
        }

        let count = captured.len();
        self.binding
            .captured_keywords
            .extend(captured.into_iter().map(|(name, _)| name));
        Ok(count)
    }

    /// Arguments nothing accepted still constrain the variables they use.
    fn absorb_leftovers(&mut self) -> Result<()> {
        let mut usages = Vec::new();
        let mut unbound_positional = Vec::new();
        let mut unexpected_keywords = Vec::new();

        for (idx, arg) in self.passed_positional.iter().enumerate() {
            if !arg.consumed {
                let label = positional_label(idx);
                let usage = self.revisit(arg.expr, &arg.inferred, None, &label)?;
                usages.push((label, usage));
                unbound_positional.push(idx);
            }
        }
        for (name, arg) in self.passed_keyword.iter() {
            if !arg.consumed {
                let usage = self.revisit(arg.expr, &arg.inferred, None, name)?;
                usages.push((name.clone(), usage));
                unexpected_keywords.push(name.clone());
            }
        }

        for (label, usage) in &usages {
            self.absorb(usage, label)?;
        }
        self.binding.unbound_positional = unbound_positional;
        self.binding.unexpected_keywords = unexpected_keywords;
        Ok(())
    }

    fn finish(self) -> Binding {
        let unfilled = self
            .expected_positional
            .into_iter()
            .chain(self.expected_keyword)
            .filter(|slot| !slot.consumed)
            .map(|slot| slot.param)
            .collect();
        Binding {
            structure: self.structure,
            unfilled,
            ..self.binding
        }
    }

    /// Visits `expr` again, predicting its inferred shape merged with what
    /// the parameter declares, and returns the usage it implies.
    fn revisit(
        &self,
        expr: &V::Expr,
        inferred: &Type,
        declared: Option<&Type>,
        param: &Rc<str>,
    ) -> Result<Type> {
        let predicted = match declared {
            Some(declared) => merge_with_limit(inferred, declared, self.config.max_depth)
                .map_err(|e| Error::from(e).for_argument(&self.macro_name, param))?,
            None => inferred.clone(),
        };
        let visited = self
            .visitor
            .visit(expr, Context::new(predicted), self.config)
            .map_err(|e| e.for_argument(&self.macro_name, param))?;
        Ok(visited.usage)
    }

    fn absorb(&mut self, usage: &Type, param: &Rc<str>) -> Result<()> {
        self.structure = merge_with_limit(&self.structure, usage, self.config.max_depth)
            .map_err(|e| Error::from(e).for_argument(&self.macro_name, param))?;
        Ok(())
    }
}

fn positional_label(idx: usize) -> Rc<str> {
    alloc::format!("#{}", idx + 1).into()
}
