// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

extern crate alloc;

mod analyzer;
mod config;
mod context;
mod error;
mod filters;
mod macros;
mod merge;
mod model;
mod visitor;

pub mod ast;
pub mod source;

#[cfg(feature = "arc")]
pub use alloc::sync::Arc as Rc;

#[cfg(not(feature = "arc"))]
pub use alloc::rc::Rc;

pub use analyzer::TemplateAnalyzer;
pub use config::{Config, IndexedShape};
pub use context::Context;
pub use error::{Error, MergeError, Result};
pub use macros::{Binding, Keyword, Macro, MacroCall, Param};
pub use merge::{merge, merge_all, merge_with_limit, MAX_MERGE_DEPTH};
pub use model::{Location, ScalarKind, Type, TypeKind};
pub use visitor::{ExprVisitor, StructureVisitor, Visited};
