// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use alloc::collections::BTreeMap;

use tracing::{debug, warn};

use crate::config::Config;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::macros::{Binding, Keyword, Macro, MacroCall};
use crate::merge::merge_with_limit;
use crate::model::Type;
use crate::visitor::ExprVisitor;
use crate::Rc;

/// Accumulates the input schema of one template.
///
/// The template walker feeds it macro definitions, expression usages and
/// macro calls in source order. Every contribution is merged into a single
/// dictionary; a contribution that conflicts leaves the schema untouched.
pub struct TemplateAnalyzer<V: ExprVisitor> {
    visitor: V,
    config: Config,
    macros: BTreeMap<Rc<str>, Macro>,
    schema: Type,
}

impl<V: ExprVisitor + core::fmt::Debug> core::fmt::Debug for TemplateAnalyzer<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TemplateAnalyzer")
            .field("visitor", &self.visitor)
            .field("config", &self.config)
            .field("macros", &self.macros.keys().collect::<alloc::vec::Vec<_>>())
            .field("schema", &self.schema)
            .finish()
    }
}

impl<V: ExprVisitor> TemplateAnalyzer<V> {
    pub fn new(visitor: V, config: Config) -> Self {
        TemplateAnalyzer {
            visitor,
            config,
            macros: BTreeMap::new(),
            schema: Type::dictionary(),
        }
    }

    pub fn define_macro(&mut self, macro_def: Macro) -> Result<()> {
        if self.macros.contains_key(macro_def.name()) {
            return Err(Error::DuplicateMacro {
                name: macro_def.name().clone(),
            });
        }
        debug!(
            name = %macro_def.name(),
            positional = macro_def.positional_params().len(),
            keyword = macro_def.keyword_params().len(),
            variadic = macro_def.accepts_variadic_keywords(),
            "macro defined"
        );
        self.macros.insert(macro_def.name().clone(), macro_def);
        Ok(())
    }

    pub fn macro_def(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name)
    }

    /// Visits `expr` with no prediction and merges what it requires of its
    /// variables into the schema. Returns the expression's own shape.
    pub fn record_expr(&mut self, expr: &V::Expr) -> Result<Type> {
        let visited = self.visitor.visit(expr, Context::unknown(), &self.config)?;
        self.record_usage(&visited.usage)?;
        Ok(visited.rtype)
    }

    /// Merges a usage computed elsewhere into the schema.
    pub fn record_usage(&mut self, usage: &Type) -> Result<()> {
        self.schema = merge_with_limit(&self.schema, usage, self.config.max_depth)?;
        Ok(())
    }

    /// Binds a call to macro `name` and merges its contribution into the
    /// schema. Returns the call's own contribution.
    pub fn call_macro(
        &mut self,
        name: &str,
        args: &[V::Expr],
        kwargs: &[Keyword<V::Expr>],
    ) -> Result<Type> {
        let macro_def = self
            .macros
            .get(name)
            .ok_or_else(|| Error::UnknownMacro { name: name.into() })?;

        let binding = MacroCall::new(macro_def, args, kwargs, &self.visitor, &self.config)?.bind()?;
        debug!(
            macro_name = %macro_def.name(),
            args = args.len(),
            kwargs = kwargs.len(),
            captured = binding.captured_keywords.len(),
            "macro call bound"
        );
        self.check_call(macro_def, args.len(), &binding)?;

        self.record_usage(&binding.structure)?;
        Ok(binding.structure)
    }

    fn check_call(&self, macro_def: &Macro, passed: usize, binding: &Binding) -> Result<()> {
        let macro_name = macro_def.name();

        if let Some(param) = binding.missing_required().next() {
            if self.config.strict_calls {
                return Err(Error::MissingArgument {
                    macro_name: macro_name.clone(),
                    param: param.name.clone(),
                });
            }
            warn!(macro_name = %macro_name, param = %param.name, "missing argument");
        }

        if !binding.unbound_positional.is_empty() {
            let expected = macro_def.positional_params().len() + macro_def.keyword_params().len();
            if self.config.strict_calls {
                return Err(Error::TooManyPositional {
                    macro_name: macro_name.clone(),
                    expected,
                    passed,
                });
            }
            warn!(macro_name = %macro_name, expected, passed, "too many positional arguments");
        }

        if let Some(keyword) = binding.unexpected_keywords.first() {
            if self.config.strict_calls {
                return Err(Error::UnexpectedKeyword {
                    macro_name: macro_name.clone(),
                    keyword: keyword.clone(),
                });
            }
            warn!(macro_name = %macro_name, keyword = %keyword, "unexpected keyword argument");
        }

        Ok(())
    }

    pub fn schema(&self) -> &Type {
        &self.schema
    }

    pub fn into_schema(self) -> Type {
        self.schema
    }
}
