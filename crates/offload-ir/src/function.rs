// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Functions and their attributes.

use crate::Expr;
use tensor_core::{DType, Shape};

/// A typed formal parameter.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Param {
    pub name: String,
    pub shape: Shape,
    #[serde(default = "default_dtype")]
    pub dtype: DType,
}

fn default_dtype() -> DType {
    DType::F32
}

impl Param {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            dtype: DType::F32,
        }
    }
}

/// Attributes attached to a function by the partitioner.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FunctionAttrs {
    /// Backend tag (e.g. `"remote"`). `None` for host functions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,
    /// Exported symbol name, if the partitioner assigned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_symbol: Option<String>,
}

/// A named function in a [`crate::PartitionedModule`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Expr,
    #[serde(default)]
    pub attrs: FunctionAttrs,
}

impl Function {
    /// Creates an untagged function.
    pub fn new(name: impl Into<String>, params: Vec<Param>, body: Expr) -> Self {
        Self {
            name: name.into(),
            params,
            body,
            attrs: FunctionAttrs::default(),
        }
    }

    /// Sets the backend tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.attrs.compiler = Some(tag.into());
        self
    }

    /// Returns the backend tag, if any.
    pub fn backend_tag(&self) -> Option<&str> {
        self.attrs.compiler.as_deref()
    }

    pub fn is_tagged(&self, tag: &str) -> bool {
        self.backend_tag() == Some(tag)
    }

    /// Looks up a parameter by name.
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Number of outputs produced by the body.
    pub fn num_outputs(&self) -> usize {
        match &self.body {
            Expr::Tuple { fields } => fields.len(),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OpKind;

    #[test]
    fn test_tagging() {
        let f = Function::new("f", vec![], Expr::var("x"));
        assert_eq!(f.backend_tag(), None);
        let f = f.with_tag("remote");
        assert!(f.is_tagged("remote"));
        assert!(!f.is_tagged("gpu"));
    }

    #[test]
    fn test_num_outputs() {
        let single = Function::new(
            "f",
            vec![Param::new("x", Shape::vector(4))],
            Expr::call(OpKind::Relu, vec![Expr::var("x")]),
        );
        assert_eq!(single.num_outputs(), 1);
        let multi = Function::new(
            "g",
            vec![],
            Expr::tuple(vec![Expr::var("a"), Expr::var("b")]),
        );
        assert_eq!(multi.num_outputs(), 2);
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{
            "name": "f",
            "params": [{ "name": "x", "shape": [3] }],
            "body": { "kind": "var", "name": "x" }
        }"#;
        let f: Function = serde_json::from_str(json).unwrap();
        assert_eq!(f.params[0].dtype, DType::F32);
        assert_eq!(f.attrs, FunctionAttrs::default());
    }
}
