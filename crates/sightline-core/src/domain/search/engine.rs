//! Search engine
//!
//! Executes one search request end to end: plan the SQL, fetch the rows,
//! populate typed records through a bounded worker pool, and return one page
//! plus the total match count. The plain path lets the database filter,
//! sort, and paginate; the encrypted path fetches the full bounded
//! candidate set and performs those stages in memory after decryption.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::config::SearchConfig;
use crate::domain::search::order::{page_slice, sort_records};
use crate::domain::search::planner::{self, PlanPath};
use crate::domain::search::populate::populate_and_filter;
use crate::domain::search::request::{SearchRequest, SearchResults};
use crate::domain::view::{ViewColumn, ViewRecord, ViewSource};
use crate::error::{Error, Result};
use crate::infrastructure::crypto::FieldCipher;
use crate::infrastructure::executor::{ColumnSpec, QueryExecutor, RawRow};

/// View-backed search engine
///
/// Cheap to clone; shares the executor and cipher behind [`Arc`]s.
#[derive(Clone)]
pub struct SearchEngine {
    executor: Arc<dyn QueryExecutor>,
    cipher: Arc<dyn FieldCipher>,
    config: SearchConfig,
}

impl SearchEngine {
    /// Create an engine with default tuning
    pub fn new(executor: Arc<dyn QueryExecutor>, cipher: Arc<dyn FieldCipher>) -> Self {
        Self {
            executor,
            cipher,
            config: SearchConfig::default(),
        }
    }

    /// Replace the engine's tuning parameters
    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Execute `request` against `source` and return one page of results
    pub async fn search<S: ViewSource>(
        &self,
        source: &S,
        request: &SearchRequest,
    ) -> Result<SearchResults<S::Record>> {
        let started = Instant::now();
        let plan = planner::plan(source, request)?;
        let specs: Vec<ColumnSpec> = source
            .columns()
            .iter()
            .map(|c| ColumnSpec::new(c.column, c.kind))
            .collect();

        tracing::debug!(
            view = source.view(),
            fallback = plan.is_fallback(),
            sql = %plan.select_sql,
            "executing search query"
        );

        let rows = self
            .executor
            .fetch_rows(&plan.select_sql, &plan.params, &specs)
            .await?;
        let fetched = rows.len();
        let columns = Arc::new(source.columns().to_vec());

        let results = match &plan.path {
            PlanPath::Fallback => {
                let filter: Option<Arc<str>> = if request.has_filter() {
                    request.filter.as_deref().map(Arc::from)
                } else {
                    None
                };
                let candidates = self.populate_rows(rows, columns, filter).await?;
                let mut merged = dedupe_by_uuid(candidates);
                sort_records(&mut merged, &plan.sort_column, plan.sort_order)?;
                let total = merged.len() as i64;
                let page = page_slice(merged, request.page_offset, request.page_size);
                SearchResults::new(page, total)
            }
            PlanPath::Sql { count_sql } => {
                let records = self.populate_rows(rows, columns, None).await?;
                let total = self.executor.fetch_count(count_sql, &plan.params).await?;
                SearchResults::new(records, total)
            }
        };

        tracing::info!(
            view = source.view(),
            fetched,
            returned = results.results.len(),
            total = results.total_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search complete"
        );
        Ok(results)
    }

    /// Populate all fetched rows, keeping those that match `filter`
    ///
    /// Small batches run inline. Larger batches fan out across spawned
    /// tasks gated by a semaphore sized to the row count (capped by
    /// configuration), and the whole join is bounded by the configured
    /// timeout. Results come back in row-fetch order either way.
    async fn populate_rows<R: ViewRecord>(
        &self,
        rows: Vec<RawRow>,
        columns: Arc<Vec<ViewColumn<R>>>,
        filter: Option<Arc<str>>,
    ) -> Result<Vec<R>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        if rows.len() <= self.config.parallel_threshold {
            let mut records = Vec::with_capacity(rows.len());
            for row in &rows {
                let populated =
                    populate_and_filter(row, &columns, self.cipher.as_ref(), filter.as_deref())?;
                if let Some(record) = populated {
                    records.push(record);
                }
            }
            return Ok(records);
        }

        let workers = self.config.max_workers.min(rows.len()).max(1);
        let gate = Arc::new(Semaphore::new(workers));
        let mut handles = Vec::with_capacity(rows.len());
        for row in rows {
            let gate = Arc::clone(&gate);
            let columns = Arc::clone(&columns);
            let cipher = Arc::clone(&self.cipher);
            let filter = filter.clone();
            handles.push(tokio::spawn(async move {
                let _permit = match gate.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return Err(Error::Execution("population pool closed".to_string())),
                };
                populate_and_filter(&row, &columns, cipher.as_ref(), filter.as_deref())
            }));
        }

        let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        let joined = match timeout(self.config.join_timeout(), join_all(handles)).await {
            Ok(joined) => joined,
            Err(_) => {
                for handle in abort_handles {
                    handle.abort();
                }
                tracing::warn!(
                    timeout_secs = self.config.join_timeout_secs,
                    "row population timed out"
                );
                return Err(Error::Timeout(self.config.join_timeout_secs));
            }
        };

        let mut records = Vec::with_capacity(joined.len());
        for outcome in joined {
            let populated = outcome
                .map_err(|e| Error::Execution(format!("population worker failed: {e}")))??;
            if let Some(record) = populated {
                records.push(record);
            }
        }
        Ok(records)
    }
}

/// Drop duplicate records, keeping the first occurrence of each uuid
fn dedupe_by_uuid<R: ViewRecord>(records: Vec<R>) -> Vec<R> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut merged = Vec::with_capacity(records.len());
    for record in records {
        if seen.insert(record.uuid().to_string()) {
            merged.push(record);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::view::{FieldValue, SortOrder, SortSpec, ValueKind};
    use crate::infrastructure::crypto::CipherError;
    use crate::infrastructure::executor::SqlParam;
    use async_trait::async_trait;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Person {
        uuid: String,
        name: Option<String>,
        ssn: Option<String>,
    }

    impl ViewRecord for Person {
        fn uuid(&self) -> &str {
            &self.uuid
        }
    }

    struct PersonView {
        columns: Vec<ViewColumn<Person>>,
    }

    impl PersonView {
        fn new(encrypted: bool) -> Self {
            let ssn = ViewColumn::new(
                "ssn",
                "ssn",
                ValueKind::Text,
                |r: &Person| r.ssn.clone().into(),
                |r, v| r.ssn = v.into_text(),
            );
            let ssn = if encrypted { ssn.encrypted().filterable() } else { ssn };
            Self {
                columns: vec![
                    ViewColumn::new(
                        "uuid",
                        "uuid",
                        ValueKind::Text,
                        |r: &Person| FieldValue::Text(r.uuid.clone()),
                        |r, v| r.uuid = v.into_text().unwrap_or_default(),
                    ),
                    ViewColumn::new(
                        "name",
                        "name",
                        ValueKind::Text,
                        |r: &Person| r.name.clone().into(),
                        |r, v| r.name = v.into_text(),
                    )
                    .filterable(),
                    ssn,
                ],
            }
        }
    }

    impl ViewSource for PersonView {
        type Record = Person;

        fn view(&self) -> &str {
            "person_search_view"
        }

        fn fixed_filter(&self) -> &str {
            "deleted = 0"
        }

        fn columns(&self) -> &[ViewColumn<Person>] {
            &self.columns
        }

        fn filter_clause(&self, filter: &str, params: &mut Vec<SqlParam>) -> String {
            params.push(SqlParam::Text(format!("%{}%", filter.to_lowercase())));
            "lower(name) LIKE ?".to_string()
        }

        fn bound_clause(
            &self,
            name: &str,
            value: &str,
            params: &mut Vec<SqlParam>,
        ) -> Result<String> {
            match name {
                "city" => {
                    params.push(SqlParam::Text(value.to_string()));
                    Ok("city = ?".to_string())
                }
                _ => Err(Error::UnknownBound(name.to_string())),
            }
        }

        fn default_sort(&self) -> SortSpec {
            SortSpec::new("name", SortOrder::Asc)
        }
    }

    struct TagCipher;

    impl FieldCipher for TagCipher {
        fn encrypt(&self, plaintext: &str) -> std::result::Result<String, CipherError> {
            Ok(format!("enc:{plaintext}"))
        }

        fn decrypt(&self, ciphertext: &str) -> std::result::Result<String, CipherError> {
            match ciphertext.strip_prefix("enc:") {
                Some(rest) => Ok(rest.to_string()),
                None => Err(CipherError::MalformedCiphertext(ciphertext.to_string())),
            }
        }
    }

    struct MockExecutor {
        rows: Vec<RawRow>,
        count: i64,
        fail: bool,
    }

    impl MockExecutor {
        fn returning(rows: Vec<RawRow>, count: i64) -> Self {
            Self {
                rows,
                count,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                rows: Vec::new(),
                count: 0,
                fail: true,
            }
        }
    }

    #[async_trait]
    impl QueryExecutor for MockExecutor {
        async fn fetch_rows(
            &self,
            _sql: &str,
            _params: &[SqlParam],
            _columns: &[ColumnSpec],
        ) -> Result<Vec<RawRow>> {
            if self.fail {
                return Err(Error::Execution("connection refused".to_string()));
            }
            Ok(self.rows.clone())
        }

        async fn fetch_count(&self, _sql: &str, _params: &[SqlParam]) -> Result<i64> {
            Ok(self.count)
        }
    }

    fn raw(uuid: &str, name: &str, ssn: &str) -> RawRow {
        RawRow::new()
            .with("uuid", FieldValue::Text(uuid.to_string()))
            .with("name", FieldValue::Text(name.to_string()))
            .with("ssn", FieldValue::Text(format!("enc:{ssn}")))
    }

    fn engine(executor: MockExecutor) -> SearchEngine {
        SearchEngine::new(Arc::new(executor), Arc::new(TagCipher))
    }

    fn names(results: &SearchResults<Person>) -> Vec<&str> {
        results
            .results
            .iter()
            .filter_map(|p| p.name.as_deref())
            .collect()
    }

    #[tokio::test]
    async fn test_plain_path_keeps_fetch_order_and_database_count() {
        let rows = vec![raw("u1", "carol", "1"), raw("u2", "alice", "2")];
        let engine = engine(MockExecutor::returning(rows, 42));
        let source = PersonView::new(false);

        let results = engine
            .search(&source, &SearchRequest::new().with_filter("nothing-matches-this"))
            .await
            .expect("search");

        // On the plain path filtering happened in SQL; rows come back as
        // fetched and the total comes from the count statement.
        assert_eq!(names(&results), vec!["carol", "alice"]);
        assert_eq!(results.total_count, 42);
    }

    #[tokio::test]
    async fn test_encrypted_path_filters_sorts_and_counts_in_memory() {
        let rows = vec![
            raw("u1", "carol", "111-22-3333"),
            raw("u2", "alice", "999-88-7777"),
            raw("u3", "bob", "111-55-6666"),
        ];
        let engine = engine(MockExecutor::returning(rows, 0));
        let source = PersonView::new(true);

        let results = engine
            .search(&source, &SearchRequest::new().with_filter("111"))
            .await
            .expect("search");

        // Only the two rows whose decrypted ssn contains "111" survive,
        // sorted by the default name ascending.
        assert_eq!(names(&results), vec!["bob", "carol"]);
        assert_eq!(results.total_count, 2);
    }

    #[tokio::test]
    async fn test_encrypted_path_dedupes_by_uuid_keeping_first() {
        let rows = vec![
            raw("u1", "carol", "1"),
            raw("u1", "carol-duplicate", "1"),
            raw("u2", "alice", "2"),
        ];
        let engine = engine(MockExecutor::returning(rows, 0));
        let source = PersonView::new(true);

        let results = engine
            .search(&source, &SearchRequest::new())
            .await
            .expect("search");

        assert_eq!(results.total_count, 2);
        assert_eq!(names(&results), vec!["alice", "carol"]);
    }

    #[tokio::test]
    async fn test_encrypted_total_counts_all_matches_not_the_page() {
        let rows = vec![
            raw("u1", "carol", "1"),
            raw("u2", "alice", "2"),
            raw("u3", "bob", "3"),
        ];
        let engine = engine(MockExecutor::returning(rows, 0));
        let source = PersonView::new(true);

        let request = SearchRequest::new().with_page(1, 1);
        let results = engine.search(&source, &request).await.expect("search");

        assert_eq!(results.total_count, 3);
        assert_eq!(names(&results), vec!["bob"]);
    }

    #[tokio::test]
    async fn test_empty_fetch_is_an_empty_page() {
        let engine = engine(MockExecutor::returning(Vec::new(), 0));
        let source = PersonView::new(true);
        let results = engine
            .search(&source, &SearchRequest::new())
            .await
            .expect("search");
        assert!(results.is_empty());
        assert_eq!(results.total_count, 0);
    }

    #[tokio::test]
    async fn test_parallel_and_sequential_population_agree() {
        let rows: Vec<RawRow> = (0..20)
            .map(|i| raw(&format!("u{i:02}"), &format!("name{i:02}"), &i.to_string()))
            .collect();
        let source = PersonView::new(true);
        let request = SearchRequest::new().with_page(0, 50);

        let sequential = engine(MockExecutor::returning(rows.clone(), 0))
            .with_config(SearchConfig::default().parallel_threshold(100))
            .search(&source, &request)
            .await
            .expect("sequential");
        let parallel = engine(MockExecutor::returning(rows, 0))
            .with_config(SearchConfig::default().parallel_threshold(0))
            .search(&source, &request)
            .await
            .expect("parallel");

        assert_eq!(sequential.results, parallel.results);
        assert_eq!(sequential.total_count, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_join_timeout_times_out() {
        let rows = vec![raw("u1", "carol", "1"), raw("u2", "alice", "2")];
        let engine = engine(MockExecutor::returning(rows, 0)).with_config(
            SearchConfig::default()
                .parallel_threshold(0)
                .join_timeout_secs(0),
        );
        let source = PersonView::new(true);

        let err = engine
            .search(&source, &SearchRequest::new())
            .await
            .expect_err("must time out");
        assert!(matches!(err, Error::Timeout(0)));
    }

    #[tokio::test]
    async fn test_decrypt_failure_in_a_worker_fails_the_search() {
        let rows = vec![
            raw("u1", "carol", "1"),
            RawRow::new()
                .with("uuid", FieldValue::Text("u2".to_string()))
                .with("name", FieldValue::Text("alice".to_string()))
                .with("ssn", FieldValue::Text("not-ciphertext".to_string())),
        ];
        let engine = engine(MockExecutor::returning(rows, 0))
            .with_config(SearchConfig::default().parallel_threshold(0));
        let source = PersonView::new(true);

        let err = engine
            .search(&source, &SearchRequest::new())
            .await
            .expect_err("must fail");
        assert!(matches!(err, Error::Decrypt { .. }));
    }

    #[tokio::test]
    async fn test_executor_failure_propagates() {
        let engine = engine(MockExecutor::failing());
        let source = PersonView::new(false);
        let err = engine
            .search(&source, &SearchRequest::new())
            .await
            .expect_err("must fail");
        assert!(matches!(err, Error::Execution(_)));
    }

    #[tokio::test]
    async fn test_invalid_sort_field_fails_before_any_query() {
        let engine = engine(MockExecutor::failing());
        let source = PersonView::new(false);
        let request = SearchRequest::new().with_sort("no_such_field", SortOrder::Asc);
        let err = engine.search(&source, &request).await.expect_err("must fail");
        assert!(matches!(err, Error::InvalidSortField(_)));
    }
}
