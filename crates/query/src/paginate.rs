//! Seek-pagination planner.
//!
//! Given an ordering and an optional filter, the planner produces the bundle
//! of seven compiled queries that drive cursor pagination: first/last page
//! loads, next/prev seeks relative to a cursor, and the three counts. Seek
//! predicates are row-value tuple comparisons against late-bound cursor
//! parameters, so one bundle serves every page of the same shape.
//!
//! Two assertions gate planning: the ordering must cover every primary-key
//! column (tie-breaks make the order total) and all directions must agree
//! (a single row-value predicate is only correct under a uniform direction).

use crate::ast::{Expr, FieldPath, Scalar, Statement};
use crate::compile::{compile, CompiledSql};
use crate::lower::expand_row_values;
use alloc::string::String;
use alloc::vec::Vec;
use cambium_core::schema::TableSchema;
use cambium_core::{Error, Order, Result, Row};

/// A page request: how many rows, from which side, relative to which cursor.
#[derive(Clone, Debug)]
pub enum PageRequest {
    /// Load the first `first` rows after the optional cursor.
    Forward { after: Option<Row>, first: u64 },
    /// Load the last `last` rows before the optional cursor.
    Backward { before: Option<Row>, last: u64 },
}

impl PageRequest {
    /// Returns the page size.
    #[inline]
    pub fn limit(&self) -> u64 {
        match self {
            PageRequest::Forward { first, .. } => *first,
            PageRequest::Backward { last, .. } => *last,
        }
    }

    /// Returns the cursor, if one was supplied.
    pub fn cursor(&self) -> Option<&Row> {
        match self {
            PageRequest::Forward { after, .. } => after.as_ref(),
            PageRequest::Backward { before, .. } => before.as_ref(),
        }
    }

    /// Returns true for forward requests.
    #[inline]
    pub fn is_forward(&self) -> bool {
        matches!(self, PageRequest::Forward { .. })
    }
}

/// A full page query: the request plus the ordering and filter it runs under.
#[derive(Clone, Debug)]
pub struct PageQuery {
    pub request: PageRequest,
    pub order_by: Vec<(String, Order)>,
    pub filter: Option<Expr>,
}

impl PageQuery {
    /// Creates a forward page query.
    pub fn forward(
        first: u64,
        after: Option<Row>,
        order_by: Vec<(String, Order)>,
    ) -> Self {
        Self {
            request: PageRequest::Forward { after, first },
            order_by,
            filter: None,
        }
    }

    /// Creates a backward page query.
    pub fn backward(
        last: u64,
        before: Option<Row>,
        order_by: Vec<(String, Order)>,
    ) -> Self {
        Self {
            request: PageRequest::Backward { before, last },
            order_by,
            filter: None,
        }
    }

    /// Sets the filter.
    pub fn with_filter(mut self, filter: Expr) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// One page of results.
///
/// `rows` are cursor records (the ordering-column values of each row) in
/// order-by direction, never reversed regardless of fetch direction.
/// `row_count` is the filtered total; the before/after counts complete the
/// accounting identity `item_before_count + rows.len() + item_after_count ==
/// row_count` for a contiguous page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    pub rows: Vec<Row>,
    pub row_count: u64,
    pub start_cursor: Option<Row>,
    pub end_cursor: Option<Row>,
    pub item_before_count: u64,
    pub item_after_count: u64,
}

impl Page {
    /// Restates the boundary cursors from the current rows.
    ///
    /// Live pages fold deltas into `rows` only; consumers that need fresh
    /// cursors after a delta call this, and refresh the counts against
    /// storage themselves.
    pub fn restate_cursors(&mut self) {
        self.start_cursor = self.rows.first().cloned();
        self.end_cursor = self.rows.last().cloned();
    }
}

/// Whether the backend evaluates row-value comparisons natively.
///
/// Engines without them get the seek predicates lowered to the equivalent
/// OR-of-AND scalar expansion; the emitted pages are identical.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RowValues {
    #[default]
    Native,
    Expanded,
}

/// The seven compiled queries backing one pagination shape.
#[derive(Clone, Debug)]
pub struct PageQueries {
    /// First `limit` rows in order-by direction.
    pub load_first: CompiledSql,
    /// Last `limit` rows; results come back inverted and must be reversed.
    pub load_last: CompiledSql,
    /// `limit` rows after the bound cursor.
    pub load_next: CompiledSql,
    /// `limit` rows before the bound cursor; results must be reversed.
    pub load_prev: CompiledSql,
    /// Filtered total.
    pub count_total: CompiledSql,
    /// Rows after the bound cursor.
    pub count_after: CompiledSql,
    /// Rows before the bound cursor.
    pub count_before: CompiledSql,
    order_columns: Vec<String>,
}

impl PageQueries {
    /// Plans the bundle for a schema, ordering and optional filter, emitting
    /// native row-value predicates.
    ///
    /// Errors with `PaginationMisordered` when the ordering misses a
    /// primary-key column or mixes directions, and with `SchemaViolation`
    /// when an ordering column is not declared.
    pub fn plan(
        schema: &TableSchema,
        order_by: &[(String, Order)],
        filter: Option<&Expr>,
    ) -> Result<PageQueries> {
        Self::plan_with(schema, order_by, filter, RowValues::Native)
    }

    /// Plans the bundle for a backend with the given row-value support.
    pub fn plan_with(
        schema: &TableSchema,
        order_by: &[(String, Order)],
        filter: Option<&Expr>,
        row_values: RowValues,
    ) -> Result<PageQueries> {
        let direction = validate_order(schema, order_by)?;

        let table = schema.name();
        let order_columns: Vec<String> =
            order_by.iter().map(|(c, _)| c.clone()).collect();
        let columns: Vec<Expr> = order_columns
            .iter()
            .map(|c| Expr::column(c.clone()))
            .collect();
        let inverted: Vec<(String, Order)> = order_by
            .iter()
            .map(|(c, o)| (c.clone(), o.invert()))
            .collect();

        // "After" means later in order-by direction, so the row-value
        // comparison flips with the direction.
        let mut after_pred = cursor_predicate(&order_columns, direction, false);
        let mut before_pred = cursor_predicate(&order_columns, direction, true);
        if row_values == RowValues::Expanded {
            after_pred = expand_row_values(&after_pred)?;
            before_pred = expand_row_values(&before_pred)?;
        }

        let select = |filter: Option<Expr>, order: &[(String, Order)]| -> Result<CompiledSql> {
            let mut stmt = Statement::select(table, columns.clone())
                .with_order_by(order.to_vec())
                .with_limit(Scalar::Param(FieldPath::limit()));
            if let Some(f) = filter {
                stmt = stmt.with_filter(f);
            }
            compile(&stmt)
        };
        let count = |filter: Option<Expr>| -> Result<CompiledSql> {
            compile(&Statement::count(table, filter))
        };

        Ok(PageQueries {
            load_first: select(filter.cloned(), order_by)?,
            load_last: select(filter.cloned(), &inverted)?,
            load_next: select(Some(and_filter(filter, after_pred.clone())), order_by)?,
            load_prev: select(Some(and_filter(filter, before_pred.clone())), &inverted)?,
            count_total: count(filter.cloned())?,
            count_after: count(Some(and_filter(filter, after_pred)))?,
            count_before: count(Some(and_filter(filter, before_pred)))?,
            order_columns,
        })
    }

    /// Returns the ordering columns, i.e. the cursor columns.
    #[inline]
    pub fn order_columns(&self) -> &[String] {
        &self.order_columns
    }
}

/// Validates the ordering against the schema and returns its uniform direction.
pub fn validate_order(
    schema: &TableSchema,
    order_by: &[(String, Order)],
) -> Result<Order> {
    if order_by.is_empty() {
        return Err(Error::pagination_misordered("order by must not be empty"));
    }
    for (col, _) in order_by {
        if schema.column(col).is_none() {
            return Err(Error::schema_violation(alloc::format!(
                "no such column: {}",
                col
            )));
        }
    }

    let direction = order_by[0].1;
    if order_by.iter().any(|(_, o)| *o != direction) {
        return Err(Error::pagination_misordered(
            "directions must agree: all order-by entries must share one direction",
        ));
    }

    for pk in schema.primary_key() {
        if !order_by.iter().any(|(c, _)| c == pk) {
            return Err(Error::pagination_misordered(alloc::format!(
                "primary key must be ordered: missing column {}",
                pk
            )));
        }
    }

    Ok(direction)
}

/// Builds `(c1, …, ck) OP (?, …, ?)` with one cursor parameter per component.
fn cursor_predicate(order_columns: &[String], direction: Order, before: bool) -> Expr {
    let lhs = Expr::tuple(
        order_columns
            .iter()
            .map(|c| Expr::column(c.clone()))
            .collect(),
    );
    let rhs = Expr::tuple(
        order_columns
            .iter()
            .map(|c| Expr::param(FieldPath::cursor(c.clone())))
            .collect(),
    );
    // Ascending: after = '>', before = '<'. Descending flips both.
    let greater = matches!(direction, Order::Asc) != before;
    if greater {
        Expr::gt(lhs, rhs)
    } else {
        Expr::lt(lhs, rhs)
    }
}

fn and_filter(filter: Option<&Expr>, predicate: Expr) -> Expr {
    match filter {
        Some(f) => Expr::and(f.clone(), predicate),
        None => predicate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;
    use cambium_core::schema::SchemaBuilder;
    use cambium_core::DataType;

    fn users() -> TableSchema {
        SchemaBuilder::new("users")
            .unwrap()
            .column("id", DataType::Int64)
            .unwrap()
            .column("name", DataType::String)
            .unwrap()
            .column("age", DataType::Int64)
            .unwrap()
            .primary_key(&["id"])
            .build()
            .unwrap()
    }

    fn asc_by_id() -> Vec<(String, Order)> {
        vec![("id".to_string(), Order::Asc)]
    }

    #[test]
    fn test_plan_shapes() {
        let schema = users();
        let queries = PageQueries::plan(&schema, &asc_by_id(), None).unwrap();

        assert_eq!(
            queries.load_first.sql(),
            "SELECT id FROM (users) ORDER BY id ASC LIMIT ?"
        );
        assert_eq!(
            queries.load_last.sql(),
            "SELECT id FROM (users) ORDER BY id DESC LIMIT ?"
        );
        assert_eq!(
            queries.load_next.sql(),
            "SELECT id FROM (users) WHERE ((id) > (?)) ORDER BY id ASC LIMIT ?"
        );
        assert_eq!(
            queries.load_prev.sql(),
            "SELECT id FROM (users) WHERE ((id) < (?)) ORDER BY id DESC LIMIT ?"
        );
        assert_eq!(queries.count_total.sql(), "SELECT COUNT(*) FROM (users)");
        assert_eq!(
            queries.count_after.sql(),
            "SELECT COUNT(*) FROM (users) WHERE ((id) > (?))"
        );
        assert_eq!(
            queries.count_before.sql(),
            "SELECT COUNT(*) FROM (users) WHERE ((id) < (?))"
        );
    }

    #[test]
    fn test_plan_with_filter() {
        let schema = users();
        let filter = Expr::eq(Expr::column("age"), Expr::literal(25i64));
        let queries = PageQueries::plan(&schema, &asc_by_id(), Some(&filter)).unwrap();

        assert_eq!(
            queries.load_first.sql(),
            "SELECT id FROM (users) WHERE (age = ?) ORDER BY id ASC LIMIT ?"
        );
        assert_eq!(
            queries.load_next.sql(),
            "SELECT id FROM (users) WHERE ((age = ?) AND ((id) > (?))) ORDER BY id ASC LIMIT ?"
        );
        assert_eq!(
            queries.count_total.sql(),
            "SELECT COUNT(*) FROM (users) WHERE (age = ?)"
        );
    }

    #[test]
    fn test_plan_composite_cursor() {
        let schema = SchemaBuilder::new("composite")
            .unwrap()
            .column("id", DataType::Int64)
            .unwrap()
            .column("sub_id", DataType::Int64)
            .unwrap()
            .primary_key(&["id", "sub_id"])
            .build()
            .unwrap();

        let order = vec![
            ("id".to_string(), Order::Asc),
            ("sub_id".to_string(), Order::Asc),
        ];
        let queries = PageQueries::plan(&schema, &order, None).unwrap();
        assert_eq!(
            queries.load_next.sql(),
            "SELECT id, sub_id FROM (composite) WHERE ((id, sub_id) > (?, ?)) ORDER BY id ASC, sub_id ASC LIMIT ?"
        );
    }

    #[test]
    fn test_expanded_plan_lowers_cursor_predicates() {
        let schema = SchemaBuilder::new("composite")
            .unwrap()
            .column("id", DataType::Int64)
            .unwrap()
            .column("sub_id", DataType::Int64)
            .unwrap()
            .primary_key(&["id", "sub_id"])
            .build()
            .unwrap();

        let order = vec![
            ("id".to_string(), Order::Asc),
            ("sub_id".to_string(), Order::Asc),
        ];
        let queries =
            PageQueries::plan_with(&schema, &order, None, RowValues::Expanded).unwrap();
        assert_eq!(
            queries.load_next.sql(),
            "SELECT id, sub_id FROM (composite) WHERE ((id > ?) OR ((id = ?) AND (sub_id > ?))) ORDER BY id ASC, sub_id ASC LIMIT ?"
        );
        assert_eq!(
            queries.count_before.sql(),
            "SELECT COUNT(*) FROM (composite) WHERE ((id < ?) OR ((id = ?) AND (sub_id < ?)))"
        );
        // Unfiltered loads are untouched by the lowering.
        assert_eq!(
            queries.load_first.sql(),
            "SELECT id, sub_id FROM (composite) ORDER BY id ASC, sub_id ASC LIMIT ?"
        );
    }

    #[test]
    fn test_plan_descending_flips_seek() {
        let schema = users();
        let order = vec![("id".to_string(), Order::Desc)];
        let queries = PageQueries::plan(&schema, &order, None).unwrap();

        // After a cursor in a descending scan means smaller tuples.
        assert_eq!(
            queries.load_next.sql(),
            "SELECT id FROM (users) WHERE ((id) < (?)) ORDER BY id DESC LIMIT ?"
        );
        assert_eq!(
            queries.load_prev.sql(),
            "SELECT id FROM (users) WHERE ((id) > (?)) ORDER BY id ASC LIMIT ?"
        );
        assert_eq!(
            queries.count_after.sql(),
            "SELECT COUNT(*) FROM (users) WHERE ((id) < (?))"
        );
    }

    #[test]
    fn test_mixed_directions_rejected() {
        let schema = users();
        let order = vec![
            ("id".to_string(), Order::Asc),
            ("name".to_string(), Order::Desc),
        ];
        match PageQueries::plan(&schema, &order, None) {
            Err(Error::PaginationMisordered { .. }) => {}
            other => panic!("expected PaginationMisordered, got {:?}", other),
        }
    }

    #[test]
    fn test_primary_key_must_be_ordered() {
        let schema = users();
        let order = vec![("age".to_string(), Order::Asc)];
        match PageQueries::plan(&schema, &order, None) {
            Err(Error::PaginationMisordered { .. }) => {}
            other => panic!("expected PaginationMisordered, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_order_column() {
        let schema = users();
        let order = vec![("missing".to_string(), Order::Asc)];
        assert!(matches!(
            PageQueries::plan(&schema, &order, None),
            Err(Error::SchemaViolation { .. })
        ));
    }

    #[test]
    fn test_empty_order_rejected() {
        let schema = users();
        assert!(PageQueries::plan(&schema, &[], None).is_err());
    }

    #[test]
    fn test_restate_cursors() {
        let mut page = Page {
            rows: vec![
                Row::from_pairs([("id", 4i64)]),
                Row::from_pairs([("id", 7i64)]),
            ],
            ..Page::default()
        };
        page.restate_cursors();
        assert_eq!(page.start_cursor, Some(Row::from_pairs([("id", 4i64)])));
        assert_eq!(page.end_cursor, Some(Row::from_pairs([("id", 7i64)])));

        page.rows.clear();
        page.restate_cursors();
        assert!(page.start_cursor.is_none());
        assert!(page.end_cursor.is_none());
    }

    #[test]
    fn test_page_request_accessors() {
        let req = PageRequest::Forward {
            after: Some(Row::from_pairs([("id", 3i64)])),
            first: 4,
        };
        assert_eq!(req.limit(), 4);
        assert!(req.is_forward());
        assert!(req.cursor().is_some());

        let req = PageRequest::Backward {
            before: None,
            last: 3,
        };
        assert_eq!(req.limit(), 3);
        assert!(!req.is_forward());
        assert!(req.cursor().is_none());
    }
}
