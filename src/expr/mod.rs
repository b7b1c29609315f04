//! The expression language used inside `{{ ... }}` and by tags such as `if` and `for`.
//!
//! An expression is an operand (literal, variable path or parenthesised
//! expression) optionally followed by a filter pipeline, combined with
//! comparisons and `and` / `or` / `not`:
//!
//! ```text
//! name|lower == "florian" and not user.banned
//! date|date:"%d.%m.%Y"
//! ```

mod eval;
pub mod filters;
mod parser;

use crate::Result;
use crate::context::Context;
use crate::registry::Registry;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub arg: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Not(Box<Expr>),
    Binary(Op, Box<Expr>, Box<Expr>),
    Filtered(Box<Expr>, Vec<FilterCall>),
}

/// A compiled expression, ready to be evaluated against any number of contexts.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    /// Compiles `source`, checking every filter name against `registry`.
    pub fn compile(source: &str, registry: &Registry) -> Result<Self> {
        let root = parser::parse(source)?;
        parser::check_filters(&root, registry)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Appends `name` to the outermost filter pipeline, creating the pipeline if
    /// the expression has none.
    pub fn add_filter(&mut self, name: &str) {
        let call = FilterCall {
            name: name.to_string(),
            arg: None,
        };
        match &mut self.root {
            Expr::Filtered(_, filters) => filters.push(call),
            root => {
                let base = std::mem::replace(root, Expr::Literal(Value::Null));
                *root = Expr::Filtered(Box::new(base), vec![call]);
            }
        }
    }

    /// Names of the filters applied last, in pipeline order.
    pub fn filter_names(&self) -> Vec<&str> {
        match &self.root {
            Expr::Filtered(_, filters) => filters.iter().map(|f| f.name.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn evaluate(&self, ctx: &Context, registry: &Registry) -> Result<Value> {
        eval::eval(&self.root, ctx, registry)
    }

    /// Evaluates and formats the result for output.
    pub fn render(&self, ctx: &Context, registry: &Registry) -> Result<String> {
        Ok(self.evaluate(ctx, registry)?.to_string())
    }
}
