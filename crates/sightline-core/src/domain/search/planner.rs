//! Query planning
//!
//! Builds the SQL to execute for one request and decides whether the
//! encrypted fallback path is required. On the plain path the plan carries a
//! sorted, paginated select plus a companion count statement; on the
//! encrypted path it carries a single bare candidate select (no filter, no
//! ordering, no pagination) because filtering and sorting happen after
//! decryption.

use crate::domain::search::request::SearchRequest;
use crate::domain::view::{SortOrder, ViewColumn, ViewSource};
use crate::error::{Error, Result};
use crate::infrastructure::executor::SqlParam;

/// Which strategy the plan commits the engine to
#[derive(Debug, Clone)]
pub enum PlanPath {
    /// Filtering, ordering, pagination and counting all happen in SQL;
    /// the companion statement produces the total match count.
    Sql { count_sql: String },
    /// Bare candidate select; filtering, sorting, pagination and counting
    /// run in memory after decryption.
    Fallback,
}

/// The executable output of planning one request against one view
#[derive(Debug, Clone)]
pub struct QueryPlan<R> {
    /// Statement producing the result rows
    pub select_sql: String,
    /// Positional parameters shared by every statement in the plan
    pub params: Vec<SqlParam>,
    /// Strategy for the stages after the fetch
    pub path: PlanPath,
    /// Resolved sort column, used by SQL or by the in-memory comparator
    pub sort_column: ViewColumn<R>,
    /// Direction the resolved column is sorted in
    pub sort_order: SortOrder,
}

impl<R> QueryPlan<R> {
    /// Whether filtering, sorting and pagination are deferred to memory
    pub fn is_fallback(&self) -> bool {
        matches!(self.path, PlanPath::Fallback)
    }
}

/// Plan `request` against `source`
///
/// Fails with [`Error::InvalidSortField`] when the requested sort field does
/// not resolve against the view's columns, and propagates
/// [`Error::UnknownBound`] from the source's bound builder.
pub fn plan<S: ViewSource>(source: &S, request: &SearchRequest) -> Result<QueryPlan<S::Record>> {
    let encrypted_path = source.has_encrypted_filterable();

    let mut clause = format!("FROM {} WHERE ({})", source.view(), source.fixed_filter());
    let mut params = Vec::new();

    // The database cannot match plaintext filter text against ciphertext
    // columns, so the filter clause is withheld whenever any filterable
    // column is encrypted.
    if !encrypted_path && request.has_filter() {
        let filter = request.filter.as_deref().unwrap_or_default();
        let filter_sql = source.filter_clause(filter, &mut params);
        clause.push_str(&format!(" AND ({})", filter_sql));
    }

    for (name, value) in &request.bounds {
        let bound_sql = source.bound_clause(name, value, &mut params)?;
        clause.push_str(&format!(" AND ({})", bound_sql));
    }

    let (sort_column, sort_order) = resolve_sort(source, request)?;

    let (select_sql, path) = if encrypted_path {
        (format!("SELECT * {}", clause), PlanPath::Fallback)
    } else {
        let select = format!(
            "SELECT * {} ORDER BY {} {} LIMIT {} OFFSET {}",
            clause,
            sort_column.column,
            sort_order.as_str(),
            request.page_size,
            request.page_offset,
        );
        let count_sql = format!("SELECT count(*) {}", clause);
        (select, PlanPath::Sql { count_sql })
    };

    Ok(QueryPlan {
        select_sql,
        params,
        path,
        sort_column,
        sort_order,
    })
}

fn resolve_sort<S: ViewSource>(
    source: &S,
    request: &SearchRequest,
) -> Result<(ViewColumn<S::Record>, SortOrder)> {
    match request.sort_field.as_deref() {
        Some(name) => {
            let column = source
                .column_named(name)
                .ok_or_else(|| Error::InvalidSortField(name.to_string()))?;
            Ok((*column, request.sort_order))
        }
        None => {
            let spec = source.default_sort();
            let column = source
                .column_named(spec.field)
                .ok_or_else(|| Error::InvalidSortField(spec.field.to_string()))?;
            Ok((*column, spec.order))
        }
    }
}
