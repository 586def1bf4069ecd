//! Comparator utilities for cursor tuples and ordered rows.
//!
//! Seek pagination and page-delta folding both need a total lexicographic
//! order over the ordering-column values of a row. This module provides the
//! direction type and the tuple/row comparators implementing it.

use crate::row::Row;
use crate::value::Value;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;

/// Sort direction for an ordering column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Order {
    /// Ascending order (smallest first)
    Asc,
    /// Descending order (largest first)
    Desc,
}

impl Order {
    /// Applies this direction to a comparison result.
    #[inline]
    pub fn apply(&self, ord: Ordering) -> Ordering {
        match self {
            Order::Asc => ord,
            Order::Desc => ord.reverse(),
        }
    }

    /// Returns the opposite direction.
    #[inline]
    pub fn invert(&self) -> Order {
        match self {
            Order::Asc => Order::Desc,
            Order::Desc => Order::Asc,
        }
    }
}

/// Compares two value tuples lexicographically with per-component directions.
///
/// Components beyond the `orders` slice fall back to ascending. Incomparable
/// component pairs (mixed non-numeric kinds) are treated as equal and the
/// comparison moves to the next component; a cursor tuple drawn from a typed
/// column never hits that case. On a shared prefix the shorter tuple orders
/// first.
pub fn tuple_compare(a: &[Value], b: &[Value], orders: &[Order]) -> Ordering {
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let order = orders.get(i).copied().unwrap_or(Order::Asc);
        let ord = x.compare(y).unwrap_or(Ordering::Equal);
        let ord = order.apply(ord);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

/// Compares rows by a fixed list of (column, direction) pairs.
///
/// Missing columns compare as Null, which sorts first ascending.
#[derive(Clone, Debug)]
pub struct RowComparator {
    columns: Vec<(String, Order)>,
}

impl RowComparator {
    /// Creates a comparator over the given ordering columns.
    pub fn new(columns: Vec<(String, Order)>) -> Self {
        Self { columns }
    }

    /// Returns the ordering columns.
    #[inline]
    pub fn columns(&self) -> &[(String, Order)] {
        &self.columns
    }

    /// Compares two rows under this ordering.
    pub fn compare(&self, a: &Row, b: &Row) -> Ordering {
        for (name, order) in &self.columns {
            let x = a.get(name).unwrap_or(&Value::Null);
            let y = b.get(name).unwrap_or(&Value::Null);
            let ord = order.apply(x.compare(y).unwrap_or(Ordering::Equal));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Returns true if `a` orders strictly before `b`.
    #[inline]
    pub fn is_before(&self, a: &Row, b: &Row) -> bool {
        self.compare(a, b) == Ordering::Less
    }
}
