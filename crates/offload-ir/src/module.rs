// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The partitioned module: a set of named functions plus module constants.
//!
//! # Type-State Pattern
//!
//! ```text
//! PartitionedModule<Loaded>     — parsed, not yet checked.
//!       │  .validate()
//!       ▼
//! PartitionedModule<Validated>  — every reference resolves, safe to query.
//! ```
//!
//! The resolver only accepts `PartitionedModule<Validated>`, so symbol
//! lookup never has to deal with dangling references.

use crate::{Expr, Function, IrError};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tensor_core::TensorLiteral;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: module has been loaded but not validated.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: module has been validated.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for module states.
pub trait ModuleState: fmt::Debug + Clone {}
impl ModuleState for Loaded {}
impl ModuleState for Validated {}

// ── PartitionedModule ──────────────────────────────────────────────

/// A module whose functions have been assigned to backends by an external
/// partitioner.
#[derive(Debug, Clone)]
pub struct PartitionedModule<S: ModuleState = Loaded> {
    /// Module name, informational.
    pub name: String,
    /// Functions in declaration order.
    pub functions: Vec<Function>,
    /// Module-level named constants.
    pub constants: BTreeMap<String, TensorLiteral>,
    _state: std::marker::PhantomData<S>,
}

// ── Loaded state ───────────────────────────────────────────────────

impl PartitionedModule<Loaded> {
    pub fn new(
        name: impl Into<String>,
        functions: Vec<Function>,
        constants: BTreeMap<String, TensorLiteral>,
    ) -> Self {
        Self {
            name: name.into(),
            functions,
            constants,
            _state: std::marker::PhantomData,
        }
    }

    /// Validates the module and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - At least one function; function names are unique.
    /// - Backend tags, when present, are non-empty.
    /// - Every constant literal matches its declared shape.
    /// - Every `Var` is bound by a parameter of its function, every
    ///   `Constant` and callee exists, and operator arities match.
    /// - Tuples appear only at the root of a body, and a function returning
    ///   a tuple is never called from another function.
    /// - The call graph is acyclic.
    pub fn validate(self) -> Result<PartitionedModule<Validated>, IrError> {
        if self.functions.is_empty() {
            return Err(IrError::InvalidModule("module contains no functions".into()));
        }

        let mut by_name: HashMap<&str, &Function> = HashMap::new();
        for f in &self.functions {
            if by_name.insert(f.name.as_str(), f).is_some() {
                return Err(IrError::InvalidModule(format!(
                    "duplicate function name '{}'",
                    f.name
                )));
            }
        }

        for (name, literal) in &self.constants {
            let expected = literal.shape.num_elements();
            if literal.values.len() != expected {
                return Err(IrError::InvalidConstant {
                    name: name.clone(),
                    detail: format!(
                        "shape {} needs {expected} values, got {}",
                        literal.shape,
                        literal.values.len()
                    ),
                });
            }
        }

        for f in &self.functions {
            Self::check_function(f, &by_name, &self.constants)?;
        }

        Self::check_acyclic(&self.functions, &by_name)?;

        tracing::debug!(
            "validated module '{}' ({} functions, {} constants)",
            self.name,
            self.functions.len(),
            self.constants.len()
        );

        Ok(PartitionedModule {
            name: self.name,
            functions: self.functions,
            constants: self.constants,
            _state: std::marker::PhantomData,
        })
    }

    fn check_function(
        f: &Function,
        by_name: &HashMap<&str, &Function>,
        constants: &BTreeMap<String, TensorLiteral>,
    ) -> Result<(), IrError> {
        let invalid = |detail: String| IrError::InvalidFunction {
            function: f.name.clone(),
            detail,
        };

        if let Some(tag) = &f.attrs.compiler {
            if tag.trim().is_empty() {
                return Err(invalid("backend tag is empty".into()));
            }
        }

        let mut params = HashSet::new();
        for p in &f.params {
            if !params.insert(p.name.as_str()) {
                return Err(invalid(format!("duplicate parameter '{}'", p.name)));
            }
        }

        if f.body.has_nested_tuple() {
            return Err(invalid("tuple is only allowed at the root of a body".into()));
        }

        let mut err = None;
        f.body.visit(&mut |e| {
            if err.is_some() {
                return;
            }
            err = match e {
                Expr::Var { name } if !params.contains(name.as_str()) => {
                    Some(format!("unbound variable '{name}'"))
                }
                Expr::Constant { name } if !constants.contains_key(name) => {
                    Some(format!("undefined constant '{name}'"))
                }
                Expr::Call { op, args } if args.len() != op.arity() => Some(format!(
                    "'{op}' takes {} argument(s), got {}",
                    op.arity(),
                    args.len()
                )),
                Expr::CallFunction { function, args } => match by_name.get(function.as_str()) {
                    None => Some(format!("call to undefined function '{function}'")),
                    Some(callee) if callee.params.len() != args.len() => Some(format!(
                        "'{function}' takes {} argument(s), got {}",
                        callee.params.len(),
                        args.len()
                    )),
                    Some(callee) if matches!(callee.body, Expr::Tuple { .. }) => Some(format!(
                        "'{function}' returns a tuple and cannot be called"
                    )),
                    Some(_) => None,
                },
                _ => None,
            };
        });

        match err {
            Some(detail) => Err(invalid(detail)),
            None => Ok(()),
        }
    }

    fn check_acyclic(
        functions: &[Function],
        by_name: &HashMap<&str, &Function>,
    ) -> Result<(), IrError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            name: &'a str,
            by_name: &HashMap<&'a str, &'a Function>,
            marks: &mut HashMap<&'a str, Mark>,
        ) -> Result<(), IrError> {
            match marks.get(name) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    return Err(IrError::InvalidModule(format!(
                        "call cycle through '{name}'"
                    )))
                }
                None => {}
            }
            marks.insert(name, Mark::Visiting);
            if let Some(f) = by_name.get(name) {
                for callee in f.body.callees() {
                    if let Some((key, _)) = by_name.get_key_value(callee.as_str()) {
                        visit(*key, by_name, marks)?;
                    }
                }
            }
            marks.insert(name, Mark::Done);
            Ok(())
        }

        let mut marks = HashMap::new();
        for f in functions {
            visit(f.name.as_str(), by_name, &mut marks)?;
        }
        Ok(())
    }
}

// ── Validated state ────────────────────────────────────────────────

impl PartitionedModule<Validated> {
    /// Looks up a function by name.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Returns an iterator over the functions carrying `tag`.
    pub fn tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Function> + 'a {
        self.functions.iter().filter(move |f| f.is_tagged(tag))
    }

    pub fn constant(&self, name: &str) -> Option<&TensorLiteral> {
        self.constants.get(name)
    }

    pub fn num_functions(&self) -> usize {
        self.functions.len()
    }

    /// Distinct backend tags in the module, sorted.
    pub fn backend_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self
            .functions
            .iter()
            .filter_map(|f| f.backend_tag())
            .collect();
        tags.sort_unstable();
        tags.dedup();
        tags
    }

    /// Returns a summary string describing the module.
    pub fn summary(&self) -> String {
        let tagged = self
            .functions
            .iter()
            .filter(|f| f.backend_tag().is_some())
            .count();
        format!(
            "Module '{}': {} functions ({} tagged: {:?}), {} constants",
            self.name,
            self.num_functions(),
            tagged,
            self.backend_tags(),
            self.constants.len(),
        )
    }
}
