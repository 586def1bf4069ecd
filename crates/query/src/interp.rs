//! Client-side expression interpreter.
//!
//! Evaluates a filter expression against a single row, mirroring the operator
//! semantics of the compiled SQL. The reactive layer uses this to decide
//! whether a mutated row belongs to a live page; it is not a general
//! evaluator, so parameters, functions, tuples and asterisks are unsupported.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use cambium_core::{DataType, Error, Result, Row, Value};
use core::cmp::Ordering;

/// Evaluates an expression against a row, yielding a scalar.
pub fn evaluate(expr: &Expr, row: &Row) -> Result<Value> {
    match expr {
        Expr::Column(name) => Ok(row.get(name).cloned().unwrap_or(Value::Null)),
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Binary { left, op, right } => {
            let l = evaluate(left, row)?;
            let r = evaluate(right, row)?;
            Ok(eval_binary(*op, &l, &r))
        }
        Expr::Unary { op, expr } => {
            let v = evaluate(expr, row)?;
            Ok(eval_unary(*op, &v))
        }
        Expr::Param(_) | Expr::Function { .. } | Expr::Tuple(_) | Expr::Asterisk => {
            Err(Error::interp_unsupported(expr.kind_name()))
        }
    }
}

/// Evaluates a predicate expression against a row.
///
/// `Boolean(true)` is a match; `Boolean(false)` and `Null` are not. Any other
/// result kind is a type mismatch: the expression was not a predicate.
pub fn matches(expr: &Expr, row: &Row) -> Result<bool> {
    match evaluate(expr, row)? {
        Value::Boolean(b) => Ok(b),
        Value::Null => Ok(false),
        other => Err(Error::type_mismatch(DataType::Boolean, other.data_type())),
    }
}

fn eval_binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    // Null propagation, with the usual three-valued AND/OR short circuits.
    if left.is_null() || right.is_null() {
        return match op {
            BinaryOp::And => {
                if left.as_bool() == Some(false) || right.as_bool() == Some(false) {
                    Value::Boolean(false)
                } else {
                    Value::Null
                }
            }
            BinaryOp::Or => {
                if left.as_bool() == Some(true) || right.as_bool() == Some(true) {
                    Value::Boolean(true)
                } else {
                    Value::Null
                }
            }
            _ => Value::Null,
        };
    }

    match op {
        BinaryOp::Eq => Value::Boolean(left == right),
        BinaryOp::Ne => Value::Boolean(left != right),
        BinaryOp::Lt => compare(left, right, Ordering::is_lt),
        BinaryOp::Le => compare(left, right, Ordering::is_le),
        BinaryOp::Gt => compare(left, right, Ordering::is_gt),
        BinaryOp::Ge => compare(left, right, Ordering::is_ge),
        BinaryOp::And => {
            let l = matches!(left, Value::Boolean(true));
            let r = matches!(right, Value::Boolean(true));
            Value::Boolean(l && r)
        }
        BinaryOp::Or => {
            let l = matches!(left, Value::Boolean(true));
            let r = matches!(right, Value::Boolean(true));
            Value::Boolean(l || r)
        }
        BinaryOp::Add => arithmetic(left, right, |a, b| a + b),
        BinaryOp::Sub => arithmetic(left, right, |a, b| a - b),
        BinaryOp::Mul => arithmetic(left, right, |a, b| a * b),
        BinaryOp::Div => match (left.as_numeric(), right.as_numeric()) {
            // Division is always floating, and x/0 is Null like the backend.
            (Some(_), Some(y)) if y == 0.0 => Value::Null,
            (Some(x), Some(y)) => Value::Float64(x / y),
            _ => Value::Null,
        },
        BinaryOp::Pow => match (left.as_numeric(), right.as_numeric()) {
            (Some(x), Some(y)) => Value::Float64(libm::pow(x, y)),
            _ => Value::Null,
        },
    }
}

fn compare(left: &Value, right: &Value, pred: fn(Ordering) -> bool) -> Value {
    match left.compare(right) {
        Some(ord) => Value::Boolean(pred(ord)),
        None => Value::Null,
    }
}

/// Numeric arithmetic through f64, preserving Int64 when both sides are integers.
fn arithmetic<F>(left: &Value, right: &Value, op: F) -> Value
where
    F: Fn(f64, f64) -> f64,
{
    let (l, r) = match (left.as_numeric(), right.as_numeric()) {
        (Some(l), Some(r)) => (l, r),
        _ => return Value::Null,
    };
    let result = op(l, r);
    match (left, right) {
        (Value::Int64(_), Value::Int64(_)) => Value::Int64(result as i64),
        _ => Value::Float64(result),
    }
}

fn eval_unary(op: UnaryOp, value: &Value) -> Value {
    match op {
        UnaryOp::Not => match value {
            Value::Boolean(b) => Value::Boolean(!b),
            _ => Value::Null,
        },
        UnaryOp::Neg => match value {
            Value::Int64(i) => Value::Int64(-i),
            Value::Float64(f) => Value::Float64(-f),
            _ => Value::Null,
        },
        UnaryOp::Plus => match value {
            Value::Int64(_) | Value::Float64(_) => value.clone(),
            _ => Value::Null,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FieldPath;
    use alloc::vec;

    fn row() -> Row {
        Row::from_pairs([
            ("id", Value::Int64(5)),
            ("name", Value::String("Eve".into())),
            ("age", Value::Int64(25)),
            ("score", Value::Float64(1.5)),
        ])
    }

    #[test]
    fn test_column_and_literal() {
        assert_eq!(
            evaluate(&Expr::column("age"), &row()).unwrap(),
            Value::Int64(25)
        );
        assert_eq!(
            evaluate(&Expr::literal(7i64), &row()).unwrap(),
            Value::Int64(7)
        );
        assert_eq!(
            evaluate(&Expr::column("missing"), &row()).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_comparisons() {
        let expr = Expr::eq(Expr::column("age"), Expr::literal(25i64));
        assert!(matches(&expr, &row()).unwrap());

        let expr = Expr::gt(Expr::column("age"), Expr::literal(30i64));
        assert!(!matches(&expr, &row()).unwrap());

        let expr = Expr::le(Expr::column("score"), Expr::literal(1.5f64));
        assert!(matches(&expr, &row()).unwrap());

        // Cross-kind numeric comparison goes through f64.
        let expr = Expr::lt(Expr::column("age"), Expr::literal(25.5f64));
        assert!(matches(&expr, &row()).unwrap());
    }

    #[test]
    fn test_strict_equality_on_strings() {
        let expr = Expr::eq(Expr::column("name"), Expr::literal("Eve"));
        assert!(matches(&expr, &row()).unwrap());

        let expr = Expr::eq(Expr::column("name"), Expr::literal(5i64));
        assert!(!matches(&expr, &row()).unwrap());
    }

    #[test]
    fn test_logical_ops() {
        let both = Expr::and(
            Expr::gt(Expr::column("age"), Expr::literal(18i64)),
            Expr::lt(Expr::column("age"), Expr::literal(65i64)),
        );
        assert!(matches(&both, &row()).unwrap());

        let either = Expr::or(
            Expr::eq(Expr::column("age"), Expr::literal(0i64)),
            Expr::eq(Expr::column("id"), Expr::literal(5i64)),
        );
        assert!(matches(&either, &row()).unwrap());

        let negated = Expr::not(Expr::eq(Expr::column("id"), Expr::literal(5i64)));
        assert!(!matches(&negated, &row()).unwrap());
    }

    #[test]
    fn test_null_propagation() {
        // missing column evaluates to Null; comparisons with Null are Null,
        // and a Null predicate does not match.
        let expr = Expr::eq(Expr::column("missing"), Expr::literal(1i64));
        assert!(!matches(&expr, &row()).unwrap());

        // false AND null = false
        let expr = Expr::and(
            Expr::eq(Expr::column("id"), Expr::literal(0i64)),
            Expr::eq(Expr::column("missing"), Expr::literal(1i64)),
        );
        assert_eq!(
            evaluate(&expr, &row()).unwrap(),
            Value::Boolean(false)
        );

        // true OR null = true
        let expr = Expr::or(
            Expr::eq(Expr::column("id"), Expr::literal(5i64)),
            Expr::eq(Expr::column("missing"), Expr::literal(1i64)),
        );
        assert_eq!(evaluate(&expr, &row()).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_arithmetic() {
        let expr = Expr::add(Expr::column("age"), Expr::literal(5i64));
        assert_eq!(evaluate(&expr, &row()).unwrap(), Value::Int64(30));

        let expr = Expr::mul(Expr::column("score"), Expr::literal(2i64));
        assert_eq!(evaluate(&expr, &row()).unwrap(), Value::Float64(3.0));

        // Division is always floating.
        let expr = Expr::div(Expr::literal(5i64), Expr::literal(2i64));
        assert_eq!(evaluate(&expr, &row()).unwrap(), Value::Float64(2.5));

        let expr = Expr::div(Expr::literal(5i64), Expr::literal(0i64));
        assert_eq!(evaluate(&expr, &row()).unwrap(), Value::Null);

        let expr = Expr::pow(Expr::literal(2i64), Expr::literal(10i64));
        assert_eq!(evaluate(&expr, &row()).unwrap(), Value::Float64(1024.0));
    }

    #[test]
    fn test_unary() {
        let expr = Expr::neg(Expr::column("age"));
        assert_eq!(evaluate(&expr, &row()).unwrap(), Value::Int64(-25));

        let expr = Expr::Unary {
            op: UnaryOp::Plus,
            expr: alloc::boxed::Box::new(Expr::column("score")),
        };
        assert_eq!(evaluate(&expr, &row()).unwrap(), Value::Float64(1.5));
    }

    #[test]
    fn test_unsupported_kinds() {
        let cases = [
            Expr::param(FieldPath::cursor("id")),
            Expr::function("abs", vec![Expr::column("id")]),
            Expr::tuple(vec![Expr::column("id")]),
            Expr::Asterisk,
        ];
        for expr in cases {
            match evaluate(&expr, &row()) {
                Err(Error::InterpUnsupported { .. }) => {}
                other => panic!("expected InterpUnsupported, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_non_predicate_result_is_mismatch() {
        let expr = Expr::add(Expr::column("age"), Expr::literal(1i64));
        assert!(matches!(
            matches(&expr, &row()),
            Err(Error::TypeMismatch { .. })
        ));
    }
}
