// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Dataflow expressions.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// The primitive operators a function body may call.
///
/// Manifests may spell operators with the aliases [`OpKind::from_str_loose`]
/// accepts; serialisation always writes the canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum OpKind {
    Add,
    Subtract,
    Multiply,
    Divide,
    Maximum,
    Negate,
    Relu,
    /// 2-D matrix multiply.
    Matmul,
}

impl OpKind {
    /// Number of operands the operator takes.
    pub fn arity(self) -> usize {
        match self {
            Self::Negate | Self::Relu => 1,
            _ => 2,
        }
    }

    /// Returns the canonical snake_case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
            Self::Maximum => "maximum",
            Self::Negate => "negate",
            Self::Relu => "relu",
            Self::Matmul => "matmul",
        }
    }

    /// Parses an operator name, accepting common aliases (`"sub"`, `"mul"`,
    /// `"dense"`, ...).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "add" | "plus" => Some(Self::Add),
            "subtract" | "sub" | "minus" => Some(Self::Subtract),
            "multiply" | "mul" => Some(Self::Multiply),
            "divide" | "div" => Some(Self::Divide),
            "maximum" | "max" => Some(Self::Maximum),
            "negate" | "neg" | "negative" => Some(Self::Negate),
            "relu" => Some(Self::Relu),
            "matmul" | "dense" | "mm" => Some(Self::Matmul),
            _ => None,
        }
    }
}

impl TryFrom<String> for OpKind {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_str_loose(&s).ok_or_else(|| format!("unknown operator '{s}'"))
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An expression in a function body.
///
/// Serialised with an internal `kind` tag:
/// ```json
/// { "kind": "call", "op": "add", "args": [
///     { "kind": "var", "name": "x" },
///     { "kind": "constant", "name": "one" }
/// ] }
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    /// A reference to a parameter of the enclosing function.
    Var { name: String },
    /// A reference to a module-level constant.
    Constant { name: String },
    /// A primitive operator applied to arguments.
    Call { op: OpKind, args: Vec<Expr> },
    /// A call into another function of the same module.
    CallFunction { function: String, args: Vec<Expr> },
    /// Several outputs. Only valid at the root of a function body.
    Tuple { fields: Vec<Expr> },
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var { name: name.into() }
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Self::Constant { name: name.into() }
    }

    pub fn call(op: OpKind, args: Vec<Expr>) -> Self {
        Self::Call { op, args }
    }

    pub fn call_function(function: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::CallFunction {
            function: function.into(),
            args,
        }
    }

    pub fn tuple(fields: Vec<Expr>) -> Self {
        Self::Tuple { fields }
    }

    /// Direct sub-expressions.
    pub fn children(&self) -> &[Expr] {
        match self {
            Self::Var { .. } | Self::Constant { .. } => &[],
            Self::Call { args, .. } | Self::CallFunction { args, .. } => args,
            Self::Tuple { fields } => fields,
        }
    }

    /// Free variables in first-occurrence order, without duplicates.
    pub fn free_vars(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        self.visit(&mut |e| {
            if let Expr::Var { name } = e {
                if seen.insert(name.clone()) {
                    out.push(name.clone());
                }
            }
        });
        out
    }

    /// Names of all module constants referenced by this expression.
    pub fn constants(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.visit(&mut |e| {
            if let Expr::Constant { name } = e {
                out.insert(name.clone());
            }
        });
        out
    }

    /// Names of all functions called by this expression.
    pub fn callees(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.visit(&mut |e| {
            if let Expr::CallFunction { function, .. } = e {
                out.insert(function.clone());
            }
        });
        out
    }

    /// Returns `true` if a `Tuple` appears anywhere below the root.
    pub fn has_nested_tuple(&self) -> bool {
        let fields: &[Expr] = match self {
            Self::Tuple { fields } => fields,
            other => std::slice::from_ref(other),
        };
        let mut nested = false;
        for field in fields {
            if matches!(field, Expr::Tuple { .. }) {
                nested = true;
            }
            for child in field.children() {
                child.visit(&mut |e| {
                    if matches!(e, Expr::Tuple { .. }) {
                        nested = true;
                    }
                });
            }
        }
        nested
    }

    /// Replaces variables by the bound expressions. Unbound variables are kept.
    pub fn substitute(&self, bindings: &HashMap<String, Expr>) -> Expr {
        match self {
            Self::Var { name } => bindings.get(name).cloned().unwrap_or_else(|| self.clone()),
            Self::Constant { .. } => self.clone(),
            Self::Call { op, args } => Self::Call {
                op: *op,
                args: args.iter().map(|a| a.substitute(bindings)).collect(),
            },
            Self::CallFunction { function, args } => Self::CallFunction {
                function: function.clone(),
                args: args.iter().map(|a| a.substitute(bindings)).collect(),
            },
            Self::Tuple { fields } => Self::Tuple {
                fields: fields.iter().map(|f| f.substitute(bindings)).collect(),
            },
        }
    }

    /// Total number of expression nodes.
    pub fn node_count(&self) -> usize {
        let mut n = 0;
        self.visit(&mut |_| n += 1);
        n
    }

    /// Pre-order traversal.
    pub fn visit<F: FnMut(&Expr)>(&self, f: &mut F) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }
        match self {
            Self::Var { name } => write!(f, "%{name}"),
            Self::Constant { name } => write!(f, "@{name}"),
            Self::Call { op, args } => {
                write!(f, "{op}(")?;
                list(f, args)?;
                write!(f, ")")
            }
            Self::CallFunction { function, args } => {
                write!(f, "{function}(")?;
                list(f, args)?;
                write!(f, ")")
            }
            Self::Tuple { fields } => {
                write!(f, "(")?;
                list(f, fields)?;
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Expr {
        // subtract(multiply(%y, %y), add(%x, %x))
        Expr::call(
            OpKind::Subtract,
            vec![
                Expr::call(OpKind::Multiply, vec![Expr::var("y"), Expr::var("y")]),
                Expr::call(OpKind::Add, vec![Expr::var("x"), Expr::var("x")]),
            ],
        )
    }

    #[test]
    fn test_free_vars_order_and_dedup() {
        assert_eq!(sample().free_vars(), vec!["y".to_string(), "x".to_string()]);
    }

    #[test]
    fn test_constants_and_callees() {
        let e = Expr::call_function(
            "f",
            vec![Expr::call(OpKind::Add, vec![Expr::var("x"), Expr::constant("c")])],
        );
        assert!(e.constants().contains("c"));
        assert!(e.callees().contains("f"));
        assert_eq!(e.node_count(), 4);
    }

    #[test]
    fn test_substitute() {
        let body = Expr::call(OpKind::Add, vec![Expr::var("a"), Expr::var("b")]);
        let mut b = HashMap::new();
        b.insert("a".to_string(), Expr::var("x"));
        let out = body.substitute(&b);
        assert_eq!(out.free_vars(), vec!["x".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_nested_tuple_detection() {
        let root = Expr::tuple(vec![Expr::var("a"), Expr::var("b")]);
        assert!(!root.has_nested_tuple());
        let nested = Expr::call(OpKind::Relu, vec![Expr::tuple(vec![Expr::var("a")])]);
        assert!(nested.has_nested_tuple());
        let tuple_in_tuple = Expr::tuple(vec![Expr::tuple(vec![Expr::var("a")])]);
        assert!(tuple_in_tuple.has_nested_tuple());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            sample().to_string(),
            "subtract(multiply(%y, %y), add(%x, %x))"
        );
    }

    #[test]
    fn test_op_from_str_loose() {
        assert_eq!(OpKind::from_str_loose("sub"), Some(OpKind::Subtract));
        assert_eq!(OpKind::from_str_loose("DENSE"), Some(OpKind::Matmul));
        assert_eq!(OpKind::from_str_loose("conv2d"), None);
        assert_eq!(OpKind::Relu.arity(), 1);
        assert_eq!(OpKind::Matmul.arity(), 2);
    }

    #[test]
    fn test_serde_tagged() {
        let json = r#"{ "kind": "call", "op": "add", "args": [
            { "kind": "var", "name": "x" },
            { "kind": "constant", "name": "one" }
        ] }"#;
        let e: Expr = serde_json::from_str(json).unwrap();
        assert_eq!(
            e,
            Expr::call(OpKind::Add, vec![Expr::var("x"), Expr::constant("one")])
        );
    }
}
