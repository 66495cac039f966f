//! Database service for accounting-service.
//!
//! Every record operation is confined to one (company, vault) scope. Writes
//! lock the vault row first so concurrent uploads and clears of the same
//! vault are applied one after another.

use crate::bind_filter;
use crate::ingest::resolver::PreparedRow;
use crate::ingest::{prepare, resolve, IdentityPolicy, IngestOptions, NormalizedRow, PreparedBatch, ResolutionPlan, VaultSnapshot};
use crate::models::{Company, PeriodType, Record, Scope, UploadBatch, Vault};
use crate::query::{DistinctField, Page, PageRequest, RecordFilter, SortOrder, FILTER_SQL};
use crate::reporting::aggregation::{CategoryFlowTotal, MonthFlowTotal};
use crate::reporting::Summary;
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const VAULT_COLUMNS: &str = "vault_id, company_id, name, period_type, created_utc";

const UPLOAD_COLUMNS: &str = "batch_id, company_id, vault_id, filename, period_label, rows_inserted, duplicates_skipped, rows_replaced, created_utc";

const RECORD_COLUMNS: &str = "record_id, seq, company_id, vault_id, record_date, account, category, subcategory, project, project_code, counterparty, description, document_type, document_number, flow_type, amount, verified, comments, source_file, fingerprint, period_label, running_balance, created_utc";

/// Whole-vault ledger with the running balance in chronological order,
/// computed before any display filter is applied.
const LEDGER_CTE: &str = r#"
    WITH ledger AS (
        SELECT records.*,
               SUM(CASE WHEN flow_type = 'income' THEN amount ELSE -amount END)
                   OVER (ORDER BY record_date, seq ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW)
                   AS running_balance
        FROM records
        WHERE company_id = $1 AND vault_id = $2
    )
"#;

/// One text column of the batch, in row order, for an `UNNEST` bind.
fn text_column<'a>(rows: &'a [PreparedRow], field: fn(&PreparedRow) -> &str) -> Vec<&'a str> {
    rows.iter().map(field).collect()
}

fn saturating_i32(value: u64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "accounting-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // =========================================================================
    // Company Operations
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn create_company(
        &self,
        name: &str,
        legal_name: &str,
        tax_id: &str,
        business_line: &str,
    ) -> Result<Company, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_company"])
            .start_timer();

        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (company_id, name, legal_name, tax_id, business_line)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING company_id, name, legal_name, tax_id, business_line, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(legal_name)
        .bind(tax_id)
        .bind(business_line)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create company: {}", e)))?;

        timer.observe_duration();
        info!(company_id = %company.company_id, "Company created");

        Ok(company)
    }

    #[instrument(skip(self))]
    pub async fn list_companies(&self) -> Result<Vec<Company>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_companies"])
            .start_timer();

        let companies = sqlx::query_as::<_, Company>(
            r#"
            SELECT company_id, name, legal_name, tax_id, business_line, created_utc
            FROM companies
            ORDER BY name, created_utc
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list companies: {}", e)))?;

        timer.observe_duration();
        Ok(companies)
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn get_company(&self, company_id: Uuid) -> Result<Company, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_company"])
            .start_timer();

        let company = sqlx::query_as::<_, Company>(
            r#"
            SELECT company_id, name, legal_name, tax_id, business_line, created_utc
            FROM companies
            WHERE company_id = $1
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get company: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company {} not found", company_id)))?;

        timer.observe_duration();
        Ok(company)
    }

    // =========================================================================
    // Vault Operations
    // =========================================================================

    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn create_vault(
        &self,
        company_id: Uuid,
        name: &str,
        period_type: PeriodType,
    ) -> Result<Vault, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_vault"])
            .start_timer();

        let sql = format!(
            r#"
            INSERT INTO vaults (vault_id, company_id, name, period_type)
            SELECT $1, $2, $3, $4
            WHERE EXISTS (SELECT 1 FROM companies WHERE company_id = $2)
            RETURNING {VAULT_COLUMNS}
            "#
        );
        let vault = sqlx::query_as::<_, Vault>(&sql)
            .bind(Uuid::new_v4())
            .bind(company_id)
            .bind(name)
            .bind(period_type.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create vault: {}", e)))?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company {} not found", company_id)))?;

        timer.observe_duration();
        info!(vault_id = %vault.vault_id, period_type = %vault.period_type, "Vault created");

        Ok(vault)
    }

    #[instrument(skip(self), fields(company_id = %company_id))]
    pub async fn list_vaults(&self, company_id: Uuid) -> Result<Vec<Vault>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_vaults"])
            .start_timer();

        let sql = format!(
            "SELECT {VAULT_COLUMNS} FROM vaults WHERE company_id = $1 ORDER BY name, created_utc"
        );
        let vaults = sqlx::query_as::<_, Vault>(&sql)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list vaults: {}", e)))?;

        timer.observe_duration();
        Ok(vaults)
    }

    #[instrument(skip(self), fields(scope = %scope))]
    pub async fn get_vault(&self, scope: Scope) -> Result<Vault, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_vault"])
            .start_timer();

        let sql = format!("SELECT {VAULT_COLUMNS} FROM vaults WHERE company_id = $1 AND vault_id = $2");
        let vault = sqlx::query_as::<_, Vault>(&sql)
            .bind(scope.company_id)
            .bind(scope.vault_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get vault: {}", e)))?
            .ok_or_else(|| vault_not_found(scope))?;

        timer.observe_duration();
        Ok(vault)
    }

    /// Delete a vault together with its records and upload history.
    #[instrument(skip(self), fields(scope = %scope))]
    pub async fn delete_vault(&self, scope: Scope) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_vault"])
            .start_timer();

        let result = sqlx::query("DELETE FROM vaults WHERE company_id = $1 AND vault_id = $2")
            .bind(scope.company_id)
            .bind(scope.vault_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete vault: {}", e)))?;

        timer.observe_duration();

        if result.rows_affected() == 0 {
            return Err(vault_not_found(scope));
        }
        info!("Vault deleted");
        Ok(())
    }

    /// Lock the vault row for the rest of `tx`.
    async fn lock_vault(tx: &mut Transaction<'_, Postgres>, scope: Scope) -> Result<Vault, AppError> {
        let sql = format!(
            "SELECT {VAULT_COLUMNS} FROM vaults WHERE company_id = $1 AND vault_id = $2 FOR UPDATE"
        );
        sqlx::query_as::<_, Vault>(&sql)
            .bind(scope.company_id)
            .bind(scope.vault_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to lock vault: {}", e)))?
            .ok_or_else(|| vault_not_found(scope))
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    /// Resolve and commit a normalized batch in one transaction. A conflict
    /// or any failure leaves the vault untouched.
    #[instrument(skip(self, rows, policy), fields(scope = %scope, filename = %filename, rows = rows.len()))]
    pub async fn ingest_batch(
        &self,
        scope: Scope,
        filename: &str,
        rows: Vec<NormalizedRow>,
        options: IngestOptions,
        policy: &IdentityPolicy,
    ) -> Result<UploadBatch, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["ingest_batch"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let vault = Self::lock_vault(&mut tx, scope).await?;
        let batch = prepare(rows, vault.period_type(), policy);
        let snapshot = Self::load_snapshot(&mut tx, scope, &batch).await?;
        let plan = resolve(batch, &snapshot, options)?;
        let upload = Self::write_batch(&mut tx, scope, &plan, filename).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();
        info!(
            batch_id = %upload.batch_id,
            period_label = %upload.period_label,
            rows_inserted = upload.rows_inserted,
            duplicates_skipped = upload.duplicates_skipped,
            rows_replaced = upload.rows_replaced,
            "Batch ingested"
        );

        Ok(upload)
    }

    /// Apply an already resolved plan: delete the listed periods, insert the
    /// rows and record history, all or nothing.
    #[instrument(skip(self, plan), fields(scope = %scope, rows = plan.rows_to_insert.len()))]
    pub async fn commit_batch(
        &self,
        scope: Scope,
        plan: &ResolutionPlan,
        filename: &str,
    ) -> Result<UploadBatch, AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        Self::lock_vault(&mut tx, scope).await?;
        let upload = Self::write_batch(&mut tx, scope, plan, filename).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        Ok(upload)
    }

    async fn load_snapshot(
        tx: &mut Transaction<'_, Postgres>,
        scope: Scope,
        batch: &PreparedBatch,
    ) -> Result<VaultSnapshot, AppError> {
        let period_counts = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT period_label, COUNT(*)
            FROM records
            WHERE company_id = $1 AND vault_id = $2 AND period_label = ANY($3)
            GROUP BY period_label
            "#,
        )
        .bind(scope.company_id)
        .bind(scope.vault_id)
        .bind(batch.period_labels())
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to count periods: {}", e)))?;

        let existing = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT fingerprint, period_label
            FROM records
            WHERE company_id = $1 AND vault_id = $2 AND fingerprint = ANY($3)
            "#,
        )
        .bind(scope.company_id)
        .bind(scope.vault_id)
        .bind(batch.fingerprints())
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to load fingerprints: {}", e)))?;

        Ok(VaultSnapshot {
            period_counts: period_counts
                .into_iter()
                .map(|(label, count)| (label, count.max(0) as u64))
                .collect(),
            existing_fingerprints: existing.into_iter().collect(),
        })
    }

    async fn write_batch(
        tx: &mut Transaction<'_, Postgres>,
        scope: Scope,
        plan: &ResolutionPlan,
        filename: &str,
    ) -> Result<UploadBatch, AppError> {
        let mut rows_replaced = 0;
        if !plan.periods_to_delete.is_empty() {
            rows_replaced = sqlx::query(
                r#"
                DELETE FROM records
                WHERE company_id = $1 AND vault_id = $2 AND period_label = ANY($3)
                "#,
            )
            .bind(scope.company_id)
            .bind(scope.vault_id)
            .bind(&plan.periods_to_delete)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to replace periods: {}", e)))?
            .rows_affected();
        }

        if !plan.rows_to_insert.is_empty() {
            let rows = &plan.rows_to_insert;
            // One statement for the whole batch; ORDINALITY keeps seq in file order.
            sqlx::query(
                r#"
                INSERT INTO records (record_id, company_id, vault_id, record_date, account, category, subcategory,
                    project, project_code, counterparty, description, document_type, document_number,
                    flow_type, amount, verified, comments, source_file, fingerprint, period_label)
                SELECT t.record_id, $1, $2, t.record_date, t.account, t.category, t.subcategory,
                    t.project, t.project_code, t.counterparty, t.description, t.document_type, t.document_number,
                    t.flow_type, t.amount, t.verified, t.comments, $3, t.fingerprint, t.period_label
                FROM UNNEST(
                    $4::uuid[], $5::date[], $6::text[], $7::text[], $8::text[], $9::text[], $10::text[],
                    $11::text[], $12::text[], $13::text[], $14::text[], $15::text[], $16::numeric[],
                    $17::bool[], $18::text[], $19::text[], $20::text[]
                ) WITH ORDINALITY AS t(record_id, record_date, account, category, subcategory, project,
                    project_code, counterparty, description, document_type, document_number, flow_type,
                    amount, verified, comments, fingerprint, period_label, ord)
                ORDER BY t.ord
                "#,
            )
            .bind(scope.company_id)
            .bind(scope.vault_id)
            .bind(filename)
            .bind(rows.iter().map(|_| Uuid::new_v4()).collect::<Vec<_>>())
            .bind(rows.iter().map(|p| p.row.date).collect::<Vec<_>>())
            .bind(text_column(rows, |p| p.row.account.as_str()))
            .bind(text_column(rows, |p| p.row.category.as_str()))
            .bind(text_column(rows, |p| p.row.subcategory.as_str()))
            .bind(text_column(rows, |p| p.row.project.as_str()))
            .bind(text_column(rows, |p| p.row.project_code.as_str()))
            .bind(text_column(rows, |p| p.row.counterparty.as_str()))
            .bind(text_column(rows, |p| p.row.description.as_str()))
            .bind(text_column(rows, |p| p.row.document_type.as_str()))
            .bind(text_column(rows, |p| p.row.document_number.as_str()))
            .bind(text_column(rows, |p| p.row.flow_type.as_str()))
            .bind(rows.iter().map(|p| p.row.amount).collect::<Vec<_>>())
            .bind(rows.iter().map(|p| p.row.verified).collect::<Vec<_>>())
            .bind(text_column(rows, |p| p.row.comments.as_str()))
            .bind(text_column(rows, |p| p.fingerprint.as_str()))
            .bind(text_column(rows, |p| p.period_label.as_str()))
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to insert {} row(s): {}",
                    rows.len(),
                    e
                ))
            })?;
        }

        let sql = format!(
            r#"
            INSERT INTO upload_batches (batch_id, company_id, vault_id, filename, period_label,
                rows_inserted, duplicates_skipped, rows_replaced)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {UPLOAD_COLUMNS}
            "#
        );
        sqlx::query_as::<_, UploadBatch>(&sql)
            .bind(Uuid::new_v4())
            .bind(scope.company_id)
            .bind(scope.vault_id)
            .bind(filename)
            .bind(&plan.period_label)
            .bind(saturating_i32(plan.rows_inserted()))
            .bind(saturating_i32(plan.duplicates_skipped))
            .bind(saturating_i32(rows_replaced))
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to record upload: {}", e)))
    }

    #[instrument(skip(self), fields(scope = %scope))]
    pub async fn upload_history(&self, scope: Scope) -> Result<Vec<UploadBatch>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upload_history"])
            .start_timer();

        let sql = format!(
            r#"
            SELECT {UPLOAD_COLUMNS}
            FROM upload_batches
            WHERE company_id = $1 AND vault_id = $2
            ORDER BY created_utc DESC
            "#
        );
        let batches = sqlx::query_as::<_, UploadBatch>(&sql)
            .bind(scope.company_id)
            .bind(scope.vault_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list uploads: {}", e)))?;

        timer.observe_duration();
        Ok(batches)
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Delete every record of the scope matching `filter`.
    #[instrument(skip(self, filter), fields(scope = %scope))]
    pub async fn delete_by_filter(&self, scope: Scope, filter: &RecordFilter) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_by_filter"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        Self::lock_vault(&mut tx, scope).await?;

        let sql = format!(
            "DELETE FROM records WHERE company_id = $1 AND vault_id = $2 {FILTER_SQL}"
        );
        let deleted = bind_filter!(sqlx::query(&sql), scope, filter)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete records: {}", e)))?
            .rows_affected();

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();
        info!(deleted_rows = deleted, "Records deleted");

        Ok(deleted)
    }

    /// Distinct non-empty values of `field`, sorted.
    #[instrument(skip(self), fields(scope = %scope, field = field.as_str()))]
    pub async fn list_distinct(&self, scope: Scope, field: DistinctField) -> Result<Vec<String>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_distinct"])
            .start_timer();

        let sql = format!(
            r#"
            SELECT DISTINCT {column} AS value
            FROM records
            WHERE company_id = $1 AND vault_id = $2 AND {column} <> ''
            ORDER BY value
            "#,
            column = field.column()
        );
        let values = sqlx::query_scalar::<_, String>(&sql)
            .bind(scope.company_id)
            .bind(scope.vault_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list values: {}", e)))?;

        timer.observe_duration();
        Ok(values)
    }

    /// One page of matching records plus the total match count, read from
    /// the same snapshot.
    #[instrument(skip(self, filter), fields(scope = %scope, page = page.page, page_size = page.page_size))]
    pub async fn query_records(
        &self,
        scope: Scope,
        filter: &RecordFilter,
        sort: SortOrder,
        page: PageRequest,
    ) -> Result<Page<Record>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["query_records"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to set isolation: {}", e)))?;

        let count_sql = format!(
            "SELECT COUNT(*) FROM records WHERE company_id = $1 AND vault_id = $2 {FILTER_SQL}"
        );
        let total = bind_filter!(sqlx::query_scalar::<_, i64>(&count_sql), scope, filter)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to count records: {}", e)))?;

        let sql = format!(
            r#"
            {LEDGER_CTE}
            SELECT {RECORD_COLUMNS}
            FROM ledger
            WHERE company_id = $1 AND vault_id = $2 {FILTER_SQL}
            ORDER BY {order}
            LIMIT $16 OFFSET $17
            "#,
            order = sort.order_by()
        );
        let items = bind_filter!(sqlx::query_as::<_, Record>(&sql), scope, filter)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to query records: {}", e)))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();
        Ok(Page::new(items, page, total.max(0) as u64))
    }

    /// Matching records without paging. `limit = None` returns all of them.
    #[instrument(skip(self, filter), fields(scope = %scope, limit = ?limit))]
    pub async fn list_records(
        &self,
        scope: Scope,
        filter: &RecordFilter,
        sort: SortOrder,
        limit: Option<i64>,
    ) -> Result<Vec<Record>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_records"])
            .start_timer();

        let sql = format!(
            r#"
            {LEDGER_CTE}
            SELECT {RECORD_COLUMNS}
            FROM ledger
            WHERE company_id = $1 AND vault_id = $2 {FILTER_SQL}
            ORDER BY {order}
            LIMIT $16
            "#,
            order = sort.order_by()
        );
        let records = bind_filter!(sqlx::query_as::<_, Record>(&sql), scope, filter)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list records: {}", e)))?;

        timer.observe_duration();
        Ok(records)
    }

    /// Category, flow and month breakdowns of the matching records.
    #[instrument(skip(self, filter), fields(scope = %scope))]
    pub async fn summarize(&self, scope: Scope, filter: &RecordFilter) -> Result<Summary, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["summarize"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to set isolation: {}", e)))?;

        let category_sql = format!(
            r#"
            SELECT category, flow_type, SUM(amount) AS total
            FROM records
            WHERE company_id = $1 AND vault_id = $2 {FILTER_SQL}
            GROUP BY category, flow_type
            "#
        );
        let categories = bind_filter!(sqlx::query_as::<_, CategoryFlowTotal>(&category_sql), scope, filter)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to group by category: {}", e)))?;

        let month_sql = format!(
            r#"
            SELECT to_char(record_date, 'YYYY-MM') AS month, flow_type,
                   SUM(amount) AS total, COUNT(*) AS records
            FROM records
            WHERE company_id = $1 AND vault_id = $2 {FILTER_SQL}
            GROUP BY 1, 2
            "#
        );
        let months = bind_filter!(sqlx::query_as::<_, MonthFlowTotal>(&month_sql), scope, filter)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to group by month: {}", e)))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();
        Ok(Summary::build(categories, months))
    }
}

fn vault_not_found(scope: Scope) -> AppError {
    AppError::NotFound(anyhow::anyhow!(
        "Vault {} not found for company {}",
        scope.vault_id,
        scope.company_id
    ))
}
