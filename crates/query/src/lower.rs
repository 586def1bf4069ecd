//! Lowering of row-value comparisons for backends without them.
//!
//! The planner emits seek predicates as row-value comparisons,
//! `(a, b) > (?, ?)`. Engines that lack row values need the equivalent
//! OR-of-AND expansion:
//!
//! ```text
//! (a, b) > (x, y)   =>   (a > x) OR ((a = x) AND (b > y))
//! ```
//!
//! generalized to k columns, with an all-equal disjunct appended for the
//! non-strict operators. The expansion preserves lexicographic semantics
//! exactly, so it is applied as a rewrite on the predicate expression before
//! compilation; nothing else about the statement changes.

use crate::ast::{BinaryOp, Expr};
use alloc::vec::Vec;
use cambium_core::{Error, Result};

/// Rewrites every tuple comparison in the expression into its scalar
/// expansion. Expressions without tuple comparisons come back unchanged.
///
/// Tuple comparisons must be between two tuples of equal, nonzero length;
/// anything else (a tuple compared to a scalar, mismatched arity) raises
/// `CompileUnsupported`.
pub fn expand_row_values(expr: &Expr) -> Result<Expr> {
    match expr {
        Expr::Binary { left, op, right } => {
            match (&**left, &**right) {
                (Expr::Tuple(ls), Expr::Tuple(rs)) if op.is_comparison() => {
                    if ls.len() != rs.len() || ls.is_empty() {
                        return Err(Error::compile_unsupported(
                            "row-value comparison with mismatched arity",
                        ));
                    }
                    expand_comparison(ls, rs, *op)
                }
                (Expr::Tuple(_), _) | (_, Expr::Tuple(_)) if op.is_comparison() => Err(
                    Error::compile_unsupported("row-value compared to a scalar"),
                ),
                _ => Ok(Expr::Binary {
                    left: alloc::boxed::Box::new(expand_row_values(left)?),
                    op: *op,
                    right: alloc::boxed::Box::new(expand_row_values(right)?),
                }),
            }
        }
        Expr::Unary { op, expr } => Ok(Expr::Unary {
            op: *op,
            expr: alloc::boxed::Box::new(expand_row_values(expr)?),
        }),
        Expr::Function { name, args } => Ok(Expr::Function {
            name: name.clone(),
            args: args
                .iter()
                .map(expand_row_values)
                .collect::<Result<Vec<_>>>()?,
        }),
        other => Ok(other.clone()),
    }
}

fn expand_comparison(ls: &[Expr], rs: &[Expr], op: BinaryOp) -> Result<Expr> {
    match op {
        BinaryOp::Eq => Ok(all_equal(ls, rs)),
        BinaryOp::Ne => Ok(Expr::not(all_equal(ls, rs))),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            let strict = match op {
                BinaryOp::Lt | BinaryOp::Le => BinaryOp::Lt,
                _ => BinaryOp::Gt,
            };
            let mut disjuncts: Vec<Expr> = Vec::with_capacity(ls.len() + 1);
            for i in 0..ls.len() {
                // Equal on the first i components, strictly ordered on the next.
                let strict_cmp = binary(ls[i].clone(), strict, rs[i].clone());
                let mut prefix: Option<Expr> = None;
                for j in 0..i {
                    let eq = binary(ls[j].clone(), BinaryOp::Eq, rs[j].clone());
                    prefix = Some(match prefix {
                        Some(p) => Expr::and(p, eq),
                        None => eq,
                    });
                }
                disjuncts.push(match prefix {
                    Some(p) => Expr::and(p, strict_cmp),
                    None => strict_cmp,
                });
            }
            if matches!(op, BinaryOp::Le | BinaryOp::Ge) {
                disjuncts.push(all_equal(ls, rs));
            }
            Ok(fold_or(disjuncts))
        }
        _ => Err(Error::compile_unsupported(
            "row-value operands on a non-comparison operator",
        )),
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        left: alloc::boxed::Box::new(left),
        op,
        right: alloc::boxed::Box::new(right),
    }
}

fn all_equal(ls: &[Expr], rs: &[Expr]) -> Expr {
    let mut terms = ls
        .iter()
        .zip(rs.iter())
        .map(|(l, r)| binary(l.clone(), BinaryOp::Eq, r.clone()));
    let first = terms.next().expect("tuple arity checked nonzero");
    terms.fold(first, Expr::and)
}

fn fold_or(mut disjuncts: Vec<Expr>) -> Expr {
    let first = disjuncts.remove(0);
    disjuncts.into_iter().fold(first, Expr::or)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FieldPath, Statement};
    use crate::compile::compile;
    use alloc::vec;

    fn tuple_pred(op: fn(Expr, Expr) -> Expr) -> Expr {
        op(
            Expr::tuple(vec![Expr::column("a"), Expr::column("b")]),
            Expr::tuple(vec![
                Expr::param(FieldPath::cursor("a")),
                Expr::param(FieldPath::cursor("b")),
            ]),
        )
    }

    fn render(expr: &Expr) -> alloc::string::String {
        let stmt = Statement::select("t", vec![Expr::Asterisk]).with_filter(expr.clone());
        let compiled = compile(&stmt).unwrap();
        compiled
            .sql()
            .strip_prefix("SELECT * FROM (t) WHERE ")
            .unwrap()
            .into()
    }

    #[test]
    fn test_gt_expansion_shape() {
        let expanded = expand_row_values(&tuple_pred(Expr::gt)).unwrap();
        assert_eq!(render(&expanded), "((a > ?) OR ((a = ?) AND (b > ?)))");
    }

    #[test]
    fn test_lt_expansion_shape() {
        let expanded = expand_row_values(&tuple_pred(Expr::lt)).unwrap();
        assert_eq!(render(&expanded), "((a < ?) OR ((a = ?) AND (b < ?)))");
    }

    #[test]
    fn test_le_appends_equality_disjunct() {
        let expanded = expand_row_values(&tuple_pred(Expr::le)).unwrap();
        assert_eq!(
            render(&expanded),
            "(((a < ?) OR ((a = ?) AND (b < ?))) OR ((a = ?) AND (b = ?)))"
        );
    }

    #[test]
    fn test_eq_and_ne() {
        let expanded = expand_row_values(&tuple_pred(Expr::eq)).unwrap();
        assert_eq!(render(&expanded), "((a = ?) AND (b = ?))");

        let expanded = expand_row_values(&tuple_pred(Expr::ne)).unwrap();
        assert_eq!(render(&expanded), "(NOT ((a = ?) AND (b = ?)))");
    }

    #[test]
    fn test_three_column_expansion() {
        let pred = Expr::gt(
            Expr::tuple(vec![
                Expr::column("a"),
                Expr::column("b"),
                Expr::column("c"),
            ]),
            Expr::tuple(vec![
                Expr::literal(1i64),
                Expr::literal(2i64),
                Expr::literal(3i64),
            ]),
        );
        let expanded = expand_row_values(&pred).unwrap();
        assert_eq!(
            render(&expanded),
            "(((a > ?) OR ((a = ?) AND (b > ?))) OR (((a = ?) AND (b = ?)) AND (c > ?)))"
        );
    }

    #[test]
    fn test_single_column_collapses_to_scalar() {
        let pred = Expr::gt(
            Expr::tuple(vec![Expr::column("a")]),
            Expr::tuple(vec![Expr::literal(5i64)]),
        );
        let expanded = expand_row_values(&pred).unwrap();
        assert_eq!(render(&expanded), "(a > ?)");
    }

    #[test]
    fn test_rewrites_inside_conjunctions() {
        let filter = Expr::and(
            Expr::eq(Expr::column("age"), Expr::literal(25i64)),
            tuple_pred(Expr::gt),
        );
        let expanded = expand_row_values(&filter).unwrap();
        assert_eq!(
            render(&expanded),
            "((age = ?) AND ((a > ?) OR ((a = ?) AND (b > ?))))"
        );
    }

    #[test]
    fn test_untouched_expressions_round_trip() {
        let plain = Expr::or(
            Expr::gt(Expr::column("x"), Expr::literal(1i64)),
            Expr::not(Expr::eq(Expr::column("y"), Expr::literal(2i64))),
        );
        assert_eq!(expand_row_values(&plain).unwrap(), plain);
    }

    #[test]
    fn test_mismatched_arity_rejected() {
        let pred = Expr::gt(
            Expr::tuple(vec![Expr::column("a"), Expr::column("b")]),
            Expr::tuple(vec![Expr::literal(1i64)]),
        );
        assert!(matches!(
            expand_row_values(&pred),
            Err(Error::CompileUnsupported { .. })
        ));
    }

    #[test]
    fn test_tuple_vs_scalar_rejected() {
        let pred = Expr::gt(
            Expr::tuple(vec![Expr::column("a")]),
            Expr::literal(1i64),
        );
        assert!(matches!(
            expand_row_values(&pred),
            Err(Error::CompileUnsupported { .. })
        ));
    }

    #[test]
    fn test_parameter_schedule_order_preserved() {
        // The expansion repeats cursor parameters; they must still bind in
        // left-to-right render order.
        let expanded = expand_row_values(&tuple_pred(Expr::gt)).unwrap();
        let stmt = Statement::select("t", vec![Expr::Asterisk]).with_filter(expanded);
        let compiled = compile(&stmt).unwrap();
        assert_eq!(compiled.params().len(), 3);
    }
}
