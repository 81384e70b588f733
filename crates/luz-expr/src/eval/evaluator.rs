use std::fmt;

use crate::ast::{BinaryOp, Expr, Rounding, Statement, UnaryOp};
use crate::error::{EvalError, ExprError};
use crate::names::NameTable;
use crate::parser::parse_statement;
use crate::value::{TimeOfDay, Value};

/// Non-fatal findings reported while evaluating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A name was looked up that the table does not bind; `0` was substituted.
    UndefinedName { name: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UndefinedName { name } => {
                write!(f, "undefined name `{name}` (substituted 0)")
            }
        }
    }
}

/// Evaluates token bodies against one name table.
///
/// An `Evaluator` is created per fill operation and borrows that operation's [`NameTable`], so
/// assignments made by one token are visible to every later token of the same fill and to
/// nothing else.
pub struct Evaluator<'a> {
    names: &'a mut NameTable,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Evaluator<'a> {
    pub fn new(names: &'a mut NameTable) -> Self {
        Self {
            names,
            diagnostics: Vec::new(),
        }
    }

    /// Parse and evaluate one token body.
    pub fn evaluate(&mut self, src: &str) -> Result<Value, ExprError> {
        let stmt = parse_statement(src)?;
        log::trace!("evaluating `{stmt}`");
        Ok(self.execute(&stmt)?)
    }

    pub fn execute(&mut self, stmt: &Statement) -> Result<Value, EvalError> {
        match stmt {
            Statement::Assign { name, value } => {
                let value = self.eval_expr(value)?;
                self.names.set(name.clone(), value.clone());
                Ok(value)
            }
            Statement::Expr(expr) => self.eval_expr(expr),
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Time(t) => Ok(Value::Time(*t)),
            Expr::Name(name) => Ok(self.lookup(name)),
            Expr::Unary(u) => {
                let v = self.eval_expr(&u.expr)?;
                match (u.op, v) {
                    (UnaryOp::Minus, Value::Number(n)) => n
                        .checked_neg()
                        .map(Value::Number)
                        .ok_or(EvalError::Overflow { op: "-" }),
                    (UnaryOp::Minus, other) => Err(EvalError::NegateTypeMismatch {
                        operand: other.type_name(),
                    }),
                }
            }
            Expr::Binary(b) => {
                let l = self.eval_expr(&b.left)?;
                let r = self.eval_expr(&b.right)?;
                apply_binary(b.op, l, r)
            }
            Expr::Round(r) => {
                let v = self.eval_expr(&r.arg)?;
                apply_rounding(r.func, v)
            }
        }
    }

    fn lookup(&mut self, name: &str) -> Value {
        if let Some(v) = self.names.get(name) {
            return v.clone();
        }
        log::warn!("undefined name `{name}` in template token; substituting 0");
        self.diagnostics.push(Diagnostic::UndefinedName {
            name: name.to_string(),
        });
        Value::Number(0)
    }
}

/// Operator dispatch on operand tags.
///
/// `+`/`-` between a number and a time shift the time by that many minutes whichever side the
/// number is on; for `-` the number is always the one negated.
pub fn apply_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    let mismatch = |lhs: &Value, rhs: &Value| EvalError::BinaryTypeMismatch {
        op,
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    };

    match (op, &lhs, &rhs) {
        (BinaryOp::Add, Value::Number(a), Value::Number(b)) => a
            .checked_add(*b)
            .map(Value::Number)
            .ok_or(EvalError::Overflow { op: "+" }),
        (BinaryOp::Sub, Value::Number(a), Value::Number(b)) => a
            .checked_sub(*b)
            .map(Value::Number)
            .ok_or(EvalError::Overflow { op: "-" }),
        (BinaryOp::Mul, Value::Number(a), Value::Number(b)) => a
            .checked_mul(*b)
            .map(Value::Number)
            .ok_or(EvalError::Overflow { op: "*" }),
        (BinaryOp::Div, Value::Number(_), Value::Number(0)) => Err(EvalError::DivisionByZero),
        // Truncates toward zero.
        (BinaryOp::Div, Value::Number(a), Value::Number(b)) => a
            .checked_div(*b)
            .map(Value::Number)
            .ok_or(EvalError::Overflow { op: "/" }),
        (BinaryOp::Add, Value::Time(t), Value::Number(m))
        | (BinaryOp::Add, Value::Number(m), Value::Time(t)) => {
            Ok(Value::Time(t.add_minutes(*m)))
        }
        (BinaryOp::Sub, Value::Time(t), Value::Number(m))
        | (BinaryOp::Sub, Value::Number(m), Value::Time(t)) => {
            Ok(Value::Time(t.add_minutes(m.wrapping_neg())))
        }
        _ => Err(mismatch(&lhs, &rhs)),
    }
}

pub fn apply_rounding(func: Rounding, value: Value) -> Result<Value, EvalError> {
    let time: TimeOfDay = value.as_time().ok_or(EvalError::RoundTypeMismatch {
        func,
        operand: value.type_name(),
    })?;
    Ok(Value::Time(match func {
        Rounding::Up => time.round_up_5(),
        Rounding::Down => time.round_down_5(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn t(h: u8, m: u8) -> Value {
        Value::Time(TimeOfDay::new(h, m).unwrap())
    }

    #[test]
    fn mixed_subtraction_negates_the_number_side() {
        assert_eq!(
            apply_binary(BinaryOp::Sub, t(19, 0), Value::Number(10)),
            Ok(t(18, 50))
        );
        assert_eq!(
            apply_binary(BinaryOp::Sub, Value::Number(10), t(19, 0)),
            Ok(t(18, 50))
        );
    }

    #[test]
    fn two_times_do_not_add() {
        assert_eq!(
            apply_binary(BinaryOp::Add, t(1, 0), t(2, 0)),
            Err(EvalError::BinaryTypeMismatch {
                op: BinaryOp::Add,
                lhs: "time",
                rhs: "time",
            })
        );
    }

    #[test]
    fn text_takes_part_in_no_arithmetic() {
        let err = apply_binary(BinaryOp::Add, Value::from("נח"), Value::Number(1)).unwrap_err();
        assert_eq!(err.to_string(), "cannot apply `+` to text and number");
    }

    #[test]
    fn division_by_zero_and_overflow_are_errors() {
        assert_eq!(
            apply_binary(BinaryOp::Div, Value::Number(1), Value::Number(0)),
            Err(EvalError::DivisionByZero)
        );
        assert_eq!(
            apply_binary(BinaryOp::Div, Value::Number(i64::MIN), Value::Number(-1)),
            Err(EvalError::Overflow { op: "/" })
        );
        assert_eq!(
            apply_binary(BinaryOp::Mul, Value::Number(i64::MAX), Value::Number(2)),
            Err(EvalError::Overflow { op: "*" })
        );
    }

    #[test]
    fn rounding_requires_a_time() {
        assert_eq!(
            apply_rounding(Rounding::Up, Value::Number(3)),
            Err(EvalError::RoundTypeMismatch {
                func: Rounding::Up,
                operand: "number",
            })
        );
    }

    #[test]
    fn undefined_names_are_reported_and_read_as_zero() {
        let mut names = NameTable::new();
        let mut eval = Evaluator::new(&mut names);
        assert_eq!(eval.evaluate("missing + 2"), Ok(Value::Number(2)));
        assert_eq!(
            eval.diagnostics(),
            &[Diagnostic::UndefinedName {
                name: "missing".to_string()
            }]
        );
        assert_eq!(eval.take_diagnostics().len(), 1);
        assert!(eval.diagnostics().is_empty());
    }
}
