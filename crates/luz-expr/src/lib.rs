#![forbid(unsafe_code)]
#![deny(unreachable_patterns)]

//! The token expression language used inside `{{…}}` template tokens.
//!
//! A token body is either an expression or an assignment `NAME = expr`. Expressions combine
//! integers, `HH:MM` times of day and names from a [`NameTable`] with `+ - * /`, unary minus,
//! parentheses and the rounding functions `UP(..)` / `DOWN(..)`:
//!
//! ```
//! use luz_expr::{evaluate, NameTable, TimeOfDay, Value};
//!
//! let mut names = NameTable::new();
//! names.set("enter_time", TimeOfDay::new(19, 2).unwrap());
//! let v = evaluate("UP(enter_time - 10)", &mut names).unwrap();
//! assert_eq!(v.to_string(), "18:55");
//! ```
//!
//! Adding a number to a time shifts it by that many minutes, wrapping around midnight.
//! Names that are not bound read as `0` and are reported as [`Diagnostic::UndefinedName`].

pub mod ast;
pub mod error;
pub mod eval;
pub mod names;
pub mod parser;
pub mod value;

pub use ast::{ParseError, Span, Statement};
pub use error::{EvalError, ExprError};
pub use eval::{Diagnostic, Evaluator};
pub use names::{is_valid_name, NameTable};
pub use parser::parse_statement;
pub use value::{InvalidTime, TimeOfDay, Value};

/// Evaluate a single token body against `names`.
///
/// Diagnostics are logged and then dropped; use [`Evaluator`] to observe them.
pub fn evaluate(text: &str, names: &mut NameTable) -> Result<Value, ExprError> {
    Evaluator::new(names).evaluate(text)
}
