//! Literal values appearing in the emitted WDL text.
//!
//! Literals show up in two places: default values of workflow-level inputs
//! and the right-hand side of branch conditions. The compiler never evaluates
//! them; it only renders them as WDL source.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Type;

/// A literal WDL value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Literal>),
}

impl Literal {
    /// Check whether this literal can initialize a declaration of type `ty`.
    pub fn coerces_to(&self, ty: &Type) -> bool {
        match self {
            Literal::Boolean(_) => Type::Boolean.coerces(ty),
            Literal::Int(_) => Type::Int.coerces(ty),
            Literal::Float(_) => Type::Float.coerces(ty),
            Literal::String(_) => Type::String.coerces(ty),
            Literal::Array(items) => match ty.item_type() {
                Some(item_ty) => items.iter().all(|item| item.coerces_to(item_ty)),
                None => false,
            },
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
            Literal::String(s) => write!(f, "\"{}\"", escape(s)),
            Literal::Array(items) => {
                let rendered: Vec<String> = items.iter().map(|item| item.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

/// Escape a string for inclusion in a double-quoted WDL string literal.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}
