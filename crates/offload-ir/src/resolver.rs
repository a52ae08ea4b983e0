// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Symbol resolution: locate the one function carrying a backend tag under a
//! given name and extract it as a standalone unit.
//!
//! Resolution is pure. The module is only read, and the same query always
//! yields the same [`SubgraphUnit`].

use crate::module::Validated;
use crate::{Expr, Function, Param, PartitionedModule, ResolveError};
use std::collections::{BTreeMap, HashMap};
use tensor_core::TensorLiteral;

/// A resolved subfunction, self-contained and ready to be compiled.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubgraphUnit {
    pub symbol: String,
    pub tag: String,
    /// Parameters that occur free in `body`, in declaration order.
    pub params: Vec<Param>,
    /// Body with every call into another function inlined.
    pub body: Expr,
    /// Only the module constants that `body` references.
    pub constants: BTreeMap<String, TensorLiteral>,
}

impl SubgraphUnit {
    pub fn num_inputs(&self) -> usize {
        self.params.len()
    }

    pub fn num_outputs(&self) -> usize {
        match &self.body {
            Expr::Tuple { fields } => fields.len(),
            _ => 1,
        }
    }

    pub fn input_names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }

    /// Returns a summary string describing the unit.
    pub fn summary(&self) -> String {
        format!(
            "Unit '{}' (tag '{}'): {} inputs {:?}, {} outputs, {} nodes, {} constants",
            self.symbol,
            self.tag,
            self.num_inputs(),
            self.input_names(),
            self.num_outputs(),
            self.body.node_count(),
            self.constants.len(),
        )
    }
}

/// Returns `true` for non-empty strings made of `[A-Za-z0-9_.-]` that do
/// not contain `..`.
pub fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && !s.contains("..")
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Names of all functions carrying `tag`, in declaration order.
pub fn candidates(module: &PartitionedModule<Validated>, tag: &str) -> Vec<String> {
    module.tagged(tag).map(|f| f.name.clone()).collect()
}

/// Resolves the function tagged `tag` and named `symbol`.
///
/// An empty `symbol` never picks a function on its own: it yields
/// [`ResolveError::AmbiguousSymbol`] when the tag is in use and
/// [`ResolveError::SymbolNotFound`] otherwise.
pub fn resolve(
    module: &PartitionedModule<Validated>,
    tag: &str,
    symbol: &str,
) -> Result<SubgraphUnit, ResolveError> {
    if !is_identifier(tag) {
        return Err(ResolveError::InvalidQuery(format!("bad backend tag '{tag}'")));
    }
    if symbol.is_empty() {
        return resolve_tag_only(module, tag);
    }
    if !is_identifier(symbol) {
        return Err(ResolveError::InvalidQuery(format!("bad symbol '{symbol}'")));
    }

    let matches: Vec<&Function> = module
        .tagged(tag)
        .filter(|f| f.name == symbol)
        .collect();

    let func = match matches.as_slice() {
        [] => {
            return Err(ResolveError::SymbolNotFound {
                tag: tag.to_string(),
                symbol: symbol.to_string(),
            })
        }
        [one] => *one,
        many => {
            return Err(ResolveError::AmbiguousSymbol {
                tag: tag.to_string(),
                candidates: many.iter().map(|f| f.name.clone()).collect(),
            })
        }
    };

    let body = inline(&func.body, module);
    let free = body.free_vars();
    let params: Vec<Param> = func
        .params
        .iter()
        .filter(|p| free.contains(&p.name))
        .cloned()
        .collect();
    if params.len() < func.params.len() {
        tracing::debug!(
            "'{}': dropping {} unused parameter(s)",
            symbol,
            func.params.len() - params.len()
        );
    }

    let constants = body
        .constants()
        .into_iter()
        .filter_map(|name| module.constant(&name).map(|lit| (name, lit.clone())))
        .collect();

    let unit = SubgraphUnit {
        symbol: symbol.to_string(),
        tag: tag.to_string(),
        params,
        body,
        constants,
    };
    tracing::debug!("resolved {}", unit.summary());
    Ok(unit)
}

/// The symbol-less query. Always an error.
pub fn resolve_tag_only(
    module: &PartitionedModule<Validated>,
    tag: &str,
) -> Result<SubgraphUnit, ResolveError> {
    let names = candidates(module, tag);
    if names.is_empty() {
        Err(ResolveError::SymbolNotFound {
            tag: tag.to_string(),
            symbol: String::new(),
        })
    } else {
        Err(ResolveError::AmbiguousSymbol {
            tag: tag.to_string(),
            candidates: names,
        })
    }
}

/// Replaces every `CallFunction` with the callee's body, arguments
/// substituted for parameters. The module is acyclic so this terminates.
fn inline(expr: &Expr, module: &PartitionedModule<Validated>) -> Expr {
    match expr {
        Expr::Var { .. } | Expr::Constant { .. } => expr.clone(),
        Expr::Call { op, args } => Expr::Call {
            op: *op,
            args: args.iter().map(|a| inline(a, module)).collect(),
        },
        Expr::Tuple { fields } => Expr::Tuple {
            fields: fields.iter().map(|f| inline(f, module)).collect(),
        },
        Expr::CallFunction { function, args } => {
            let args: Vec<Expr> = args.iter().map(|a| inline(a, module)).collect();
            match module.function(function) {
                Some(callee) => {
                    let bindings: HashMap<String, Expr> = callee
                        .params
                        .iter()
                        .map(|p| p.name.clone())
                        .zip(args)
                        .collect();
                    inline(&callee.body, module).substitute(&bindings)
                }
                // Unreachable for a validated module.
                None => Expr::CallFunction {
                    function: function.clone(),
                    args,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ModuleLoader, OpKind};
    use tensor_core::Shape;

    fn module() -> PartitionedModule<Validated> {
        ModuleLoader::from_json(
            r#"{
            "name": "net",
            "constants": {
                "one": { "shape": [], "values": [1.0] },
                "unused": { "shape": [2], "values": [0.0, 0.0] }
            },
            "functions": [
                {
                    "name": "main",
                    "params": [{ "name": "a", "shape": [4] }],
                    "body": { "kind": "call_function", "function": "add1",
                              "args": [{ "kind": "var", "name": "a" }] }
                },
                {
                    "name": "add1",
                    "params": [{ "name": "x", "shape": [4] }],
                    "body": { "kind": "call", "op": "add", "args": [
                        { "kind": "var", "name": "x" },
                        { "kind": "constant", "name": "one" }
                    ] },
                    "attrs": { "compiler": "remote" }
                },
                {
                    "name": "double",
                    "params": [{ "name": "p", "shape": [4] }],
                    "body": { "kind": "call", "op": "add", "args": [
                        { "kind": "var", "name": "p" },
                        { "kind": "var", "name": "p" }
                    ] }
                },
                {
                    "name": "fused",
                    "params": [
                        { "name": "u", "shape": [4] },
                        { "name": "v", "shape": [4] },
                        { "name": "w", "shape": [4] }
                    ],
                    "body": { "kind": "call", "op": "multiply", "args": [
                        { "kind": "call_function", "function": "double",
                          "args": [{ "kind": "var", "name": "w" }] },
                        { "kind": "var", "name": "u" }
                    ] },
                    "attrs": { "compiler": "remote" }
                },
                {
                    "name": "gpu_part",
                    "params": [{ "name": "x", "shape": [4] }],
                    "body": { "kind": "call", "op": "relu", "args": [{ "kind": "var", "name": "x" }] },
                    "attrs": { "compiler": "gpu" }
                }
            ]
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_unique_symbol() {
        let unit = resolve(&module(), "remote", "add1").unwrap();
        assert_eq!(unit.symbol, "add1");
        assert_eq!(unit.input_names(), unit.body.free_vars());
        assert_eq!(unit.input_names(), vec!["x".to_string()]);
        assert_eq!(unit.params[0].shape, Shape::vector(4));
        assert_eq!(unit.constants.keys().collect::<Vec<_>>(), vec!["one"]);
        assert_eq!(unit.num_outputs(), 1);
    }

    #[test]
    fn test_inlines_callees_and_drops_unused_params() {
        let unit = resolve(&module(), "remote", "fused").unwrap();
        assert!(unit.body.callees().is_empty());
        assert_eq!(unit.input_names(), vec!["u".to_string(), "w".to_string()]);
        assert_eq!(
            unit.body,
            Expr::call(
                OpKind::Multiply,
                vec![
                    Expr::call(OpKind::Add, vec![Expr::var("w"), Expr::var("w")]),
                    Expr::var("u"),
                ]
            )
        );
        assert!(unit.constants.is_empty());
    }

    #[test]
    fn test_symbol_not_found() {
        let err = resolve(&module(), "remote", "missing").unwrap_err();
        assert!(matches!(err, ResolveError::SymbolNotFound { .. }));
        // Untagged and wrongly tagged functions are not candidates.
        assert!(resolve(&module(), "remote", "main").is_err());
        assert!(resolve(&module(), "remote", "gpu_part").is_err());
        assert!(resolve(&module(), "npu", "add1").is_err());
    }

    #[test]
    fn test_omitted_symbol_rejected() {
        match resolve(&module(), "remote", "").unwrap_err() {
            ResolveError::AmbiguousSymbol { candidates, .. } => {
                assert_eq!(candidates, vec!["add1".to_string(), "fused".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            resolve(&module(), "npu", "").unwrap_err(),
            ResolveError::SymbolNotFound { .. }
        ));
    }

    #[test]
    fn test_invalid_query() {
        assert!(matches!(
            resolve(&module(), "", "add1").unwrap_err(),
            ResolveError::InvalidQuery(_)
        ));
        assert!(matches!(
            resolve(&module(), "remote", "../etc/passwd").unwrap_err(),
            ResolveError::InvalidQuery(_)
        ));
        assert!(is_identifier("add1.v2-x_y"));
        assert!(!is_identifier("a b"));
        assert!(!is_identifier("a/b"));
    }

    #[test]
    fn test_resolution_is_pure() {
        let m = module();
        let a = resolve(&m, "remote", "fused").unwrap();
        let b = resolve(&m, "remote", "fused").unwrap();
        assert_eq!(a, b);
        assert_eq!(candidates(&m, "remote"), vec!["add1", "fused"]);
    }
}
