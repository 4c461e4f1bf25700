//! PostgreSQL backend.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use invtrack_core::models::config::DatabaseConfig;
use invtrack_core::{
    Contract, DismissedExpectedInvoice, ExpectedInvoice, Invoice, InvoicePatch, InvoiceStatus,
    NewExpectedInvoice,
};
use rust_decimal::Decimal;
use sqlx::FromRow;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::InvoiceStore;
use crate::error::map_db_error;
use crate::{Result, StoreError};

/// Parse an enum column, rejecting values no variant accepts.
fn parse_column<T: FromStr>(column: &'static str, value: String) -> Result<T> {
    match value.parse() {
        Ok(parsed) => Ok(parsed),
        Err(_) => {
            warn!(column, value = %value, "Unrecognized value in database row");
            Err(StoreError::InvalidColumn { column, value })
        }
    }
}

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: Uuid,
    invoice_number: String,
    client: String,
    invoice_type: String,
    frequency: String,
    amount_due: Decimal,
    currency: String,
    invoice_date: NaiveDate,
    due_date: NaiveDate,
    customer_contract: String,
    oracle_contract: String,
    po_number: String,
    status: String,
    payment_date: Option<NaiveDate>,
    pdf_path: Option<String>,
    pdf_original_name: Option<String>,
    services: String,
}

impl InvoiceRow {
    fn into_invoice(self) -> Result<Invoice> {
        Ok(Invoice {
            id: self.id,
            invoice_number: self.invoice_number,
            client: self.client,
            invoice_type: parse_column("invoice_type", self.invoice_type)?,
            frequency: parse_column("frequency", self.frequency)?,
            amount_due: self.amount_due,
            currency: parse_column("currency", self.currency)?,
            invoice_date: self.invoice_date,
            due_date: self.due_date,
            customer_contract: self.customer_contract,
            oracle_contract: self.oracle_contract,
            po_number: self.po_number,
            status: parse_column("status", self.status)?,
            payment_date: self.payment_date,
            pdf_path: self.pdf_path,
            pdf_original_name: self.pdf_original_name,
            services: self.services,
        })
    }
}

#[derive(Debug, FromRow)]
struct ContractRow {
    id: Uuid,
    name: String,
    value: Decimal,
    currency: String,
}

impl ContractRow {
    fn into_contract(self) -> Result<Contract> {
        Ok(Contract {
            id: self.id,
            name: self.name,
            value: self.value,
            currency: parse_column("currency", self.currency)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct ExpectedRow {
    id: Uuid,
    client: String,
    customer_contract: String,
    invoice_type: String,
    expected_amount: Decimal,
    currency: String,
    expected_date: NaiveDate,
    frequency: String,
    last_invoice_number: String,
    last_invoice_date: NaiveDate,
    acknowledged: bool,
    acknowledged_date: Option<NaiveDate>,
}

impl ExpectedRow {
    fn into_expected(self) -> Result<ExpectedInvoice> {
        Ok(ExpectedInvoice {
            id: self.id,
            client: self.client,
            customer_contract: self.customer_contract,
            invoice_type: parse_column("invoice_type", self.invoice_type)?,
            expected_amount: self.expected_amount,
            currency: parse_column("currency", self.currency)?,
            expected_date: self.expected_date,
            frequency: parse_column("frequency", self.frequency)?,
            last_invoice_number: self.last_invoice_number,
            last_invoice_date: self.last_invoice_date,
            acknowledged: self.acknowledged,
            acknowledged_date: self.acknowledged_date,
        })
    }
}

#[derive(Debug, FromRow)]
struct DismissedRow {
    client: String,
    customer_contract: String,
    invoice_type: String,
    expected_date: NaiveDate,
    dismissed_date: NaiveDate,
}

impl DismissedRow {
    fn into_dismissed(self) -> Result<DismissedExpectedInvoice> {
        Ok(DismissedExpectedInvoice {
            client: self.client,
            customer_contract: self.customer_contract,
            invoice_type: parse_column("invoice_type", self.invoice_type)?,
            expected_date: self.expected_date,
            dismissed_date: self.dismissed_date,
        })
    }
}

/// Backend over a bounded PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a pool using the database section of the configuration.
    ///
    /// Every session gets the configured `statement_timeout`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = PgConnectOptions::from_str(&config.url)
            .map_err(map_db_error)?
            .options([("statement_timeout", format!("{}s", config.statement_timeout_secs))]);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(map_db_error)?;

        info!(max_connections = config.max_connections, "Connected to database");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl InvoiceStore for PgStore {
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO invoices (
                id, invoice_number, client, invoice_type, frequency, amount_due, currency,
                invoice_date, due_date, customer_contract, oracle_contract, po_number,
                status, payment_date, pdf_path, pdf_original_name, services
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17
            )"#,
        )
        .bind(invoice.id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.client)
        .bind(invoice.invoice_type.as_str())
        .bind(invoice.frequency.as_str())
        .bind(invoice.amount_due)
        .bind(invoice.currency.as_str())
        .bind(invoice.invoice_date)
        .bind(invoice.due_date)
        .bind(&invoice.customer_contract)
        .bind(&invoice.oracle_contract)
        .bind(&invoice.po_number)
        .bind(invoice.status.as_str())
        .bind(invoice.payment_date)
        .bind(&invoice.pdf_path)
        .bind(&invoice.pdf_original_name)
        .bind(&invoice.services)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>> {
        let row: Option<InvoiceRow> = sqlx::query_as("SELECT * FROM invoices WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        row.map(InvoiceRow::into_invoice).transpose()
    }

    async fn find_by_number(&self, invoice_number: &str) -> Result<Vec<Invoice>> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(
            "SELECT * FROM invoices WHERE norm_key(invoice_number) = norm_key($1) ORDER BY created_at",
        )
        .bind(invoice_number)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(InvoiceRow::into_invoice).collect()
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(
            "SELECT * FROM invoices ORDER BY invoice_date DESC, invoice_number DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(InvoiceRow::into_invoice).collect()
    }

    async fn update_invoice(&self, id: Uuid, patch: &InvoicePatch) -> Result<Invoice> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let row: Option<InvoiceRow> =
            sqlx::query_as("SELECT * FROM invoices WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_db_error)?;
        let mut invoice = row
            .ok_or(StoreError::NotFound { entity: "invoice", id })?
            .into_invoice()?;

        patch.apply(&mut invoice);

        sqlx::query(
            r#"UPDATE invoices SET
                invoice_number = $2, client = $3, invoice_type = $4, frequency = $5,
                amount_due = $6, currency = $7, invoice_date = $8, due_date = $9,
                customer_contract = $10, oracle_contract = $11, po_number = $12,
                status = $13, payment_date = $14
            WHERE id = $1"#,
        )
        .bind(id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.client)
        .bind(invoice.invoice_type.as_str())
        .bind(invoice.frequency.as_str())
        .bind(invoice.amount_due)
        .bind(invoice.currency.as_str())
        .bind(invoice.invoice_date)
        .bind(invoice.due_date)
        .bind(&invoice.customer_contract)
        .bind(&invoice.oracle_contract)
        .bind(&invoice.po_number)
        .bind(invoice.status.as_str())
        .bind(invoice.payment_date)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(invoice)
    }

    async fn delete_invoice(&self, id: Uuid) -> Result<Invoice> {
        let row: Option<InvoiceRow> = sqlx::query_as("DELETE FROM invoices WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        row.ok_or(StoreError::NotFound { entity: "invoice", id })?
            .into_invoice()
    }

    async fn mark_paid(&self, invoice_number: &str, payment_date: NaiveDate) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE invoices SET status = $3, payment_date = $2 WHERE norm_key(invoice_number) = norm_key($1)",
        )
        .bind(invoice_number)
        .bind(payment_date)
        .bind(InvoiceStatus::Paid.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }

    async fn upsert_contract(&self, contract: &Contract) -> Result<Contract> {
        let row: ContractRow = sqlx::query_as(
            r#"INSERT INTO contracts (id, name, value, currency)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ((norm_key(name))) DO UPDATE
                SET name = EXCLUDED.name, value = EXCLUDED.value, currency = EXCLUDED.currency
            RETURNING *"#,
        )
        .bind(contract.id)
        .bind(&contract.name)
        .bind(contract.value)
        .bind(contract.currency.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.into_contract()
    }

    async fn list_contracts(&self) -> Result<Vec<Contract>> {
        let rows: Vec<ContractRow> = sqlx::query_as("SELECT * FROM contracts ORDER BY norm_key(name)")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        rows.into_iter().map(ContractRow::into_contract).collect()
    }

    async fn delete_contract(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contracts WHERE norm_key(name) = norm_key($1)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_expected(&self) -> Result<Vec<ExpectedInvoice>> {
        let rows: Vec<ExpectedRow> =
            sqlx::query_as("SELECT * FROM expected_invoices ORDER BY expected_date, client")
                .fetch_all(&self.pool)
                .await
                .map_err(map_db_error)?;

        rows.into_iter().map(ExpectedRow::into_expected).collect()
    }

    async fn insert_expected_if_absent(
        &self,
        expected: &NewExpectedInvoice,
        window_days: i64,
    ) -> Result<bool> {
        let window = i32::try_from(window_days).unwrap_or(i32::MAX);
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Serializes concurrent sweeps on the same group until commit.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext(norm_key($1) || '|' || norm_key($2)))")
            .bind(&expected.client)
            .bind(&expected.customer_contract)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        let result = sqlx::query(
            r#"INSERT INTO expected_invoices (
                id, client, customer_contract, invoice_type, expected_amount, currency,
                expected_date, frequency, last_invoice_number, last_invoice_date
            )
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10
            WHERE NOT EXISTS (
                SELECT 1 FROM expected_invoices e
                WHERE norm_key(e.client) = norm_key($2)
                  AND norm_key(e.customer_contract) = norm_key($3)
                  AND abs(e.expected_date - $7::date) <= $11
            )
            AND NOT EXISTS (
                SELECT 1 FROM dismissed_expected_invoices d
                WHERE norm_key(d.client) = norm_key($2)
                  AND norm_key(d.customer_contract) = norm_key($3)
                  AND d.invoice_type = $4
                  AND d.expected_date = $7::date
            )"#,
        )
        .bind(Uuid::new_v4())
        .bind(&expected.client)
        .bind(&expected.customer_contract)
        .bind(expected.invoice_type.as_str())
        .bind(expected.expected_amount)
        .bind(expected.currency.as_str())
        .bind(expected.expected_date)
        .bind(expected.frequency.as_str())
        .bind(&expected.last_invoice_number)
        .bind(expected.last_invoice_date)
        .bind(window)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;
        tx.commit().await.map_err(map_db_error)?;

        let inserted = result.rows_affected() > 0;
        debug!(client = %expected.client, date = %expected.expected_date, inserted, "Forecast insert");
        Ok(inserted)
    }

    async fn delete_satisfied_expected(&self, invoice: &Invoice, tolerance_days: i64) -> Result<u64> {
        let tolerance = i32::try_from(tolerance_days).unwrap_or(i32::MAX);
        let result = sqlx::query(
            r#"DELETE FROM expected_invoices
            WHERE norm_key(client) = norm_key($1)
              AND norm_key(customer_contract) = norm_key($2)
              AND invoice_type = $3
              AND frequency = $4
              AND abs(expected_date - $5::date) <= $6"#,
        )
        .bind(&invoice.client)
        .bind(&invoice.customer_contract)
        .bind(invoice.invoice_type.as_str())
        .bind(invoice.frequency.as_str())
        .bind(invoice.invoice_date)
        .bind(tolerance)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }

    async fn dismiss_expected(&self, id: Uuid, today: NaiveDate) -> Result<DismissedExpectedInvoice> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let row: Option<ExpectedRow> =
            sqlx::query_as("DELETE FROM expected_invoices WHERE id = $1 RETURNING *")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_db_error)?;
        let expected = row
            .ok_or(StoreError::NotFound { entity: "expected invoice", id })?
            .into_expected()?;

        let tombstone = DismissedExpectedInvoice::from_expected(&expected, today);
        sqlx::query(
            r#"INSERT INTO dismissed_expected_invoices (
                client, customer_contract, invoice_type, expected_date, dismissed_date
            ) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING"#,
        )
        .bind(&tombstone.client)
        .bind(&tombstone.customer_contract)
        .bind(tombstone.invoice_type.as_str())
        .bind(tombstone.expected_date)
        .bind(tombstone.dismissed_date)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(tombstone)
    }

    async fn acknowledge_expected(&self, id: Uuid, today: NaiveDate) -> Result<ExpectedInvoice> {
        let row: Option<ExpectedRow> = sqlx::query_as(
            r#"UPDATE expected_invoices SET acknowledged = TRUE, acknowledged_date = $2
            WHERE id = $1 RETURNING *"#,
        )
        .bind(id)
        .bind(today)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.ok_or(StoreError::NotFound { entity: "expected invoice", id })?
            .into_expected()
    }

    async fn cleanup_acknowledged(&self, before: NaiveDate) -> Result<u64> {
        let removed: i64 = sqlx::query_scalar(
            r#"WITH removed AS (
                DELETE FROM expected_invoices
                WHERE acknowledged AND acknowledged_date < $1
                RETURNING client, customer_contract, invoice_type, expected_date, acknowledged_date
            ), tombstones AS (
                INSERT INTO dismissed_expected_invoices (
                    client, customer_contract, invoice_type, expected_date, dismissed_date
                )
                SELECT client, customer_contract, invoice_type, expected_date,
                       COALESCE(acknowledged_date, $1)
                FROM removed
                ON CONFLICT DO NOTHING
            )
            SELECT count(*) FROM removed"#,
        )
        .bind(before)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(u64::try_from(removed).unwrap_or(0))
    }

    async fn list_dismissed(&self) -> Result<Vec<DismissedExpectedInvoice>> {
        let rows: Vec<DismissedRow> = sqlx::query_as(
            "SELECT * FROM dismissed_expected_invoices ORDER BY dismissed_date DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        rows.into_iter().map(DismissedRow::into_dismissed).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invtrack_core::{Currency, Frequency};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_column_accepts_stored_forms() {
        let status: InvoiceStatus = parse_column("status", "Paid".to_string()).unwrap();
        assert_eq!(status, InvoiceStatus::Paid);
        let legacy: InvoiceStatus = parse_column("status", "paid".to_string()).unwrap();
        assert_eq!(legacy, InvoiceStatus::Paid);
        let frequency: Frequency = parse_column("frequency", "tri-annual".to_string()).unwrap();
        assert_eq!(frequency, Frequency::TriAnnual);
    }

    #[test]
    fn test_parse_column_rejects_unknown_values() {
        let err = parse_column::<Currency>("currency", "XYZ".to_string()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidColumn { column: "currency", ref value } if value == "XYZ"
        ));
    }

    #[test]
    fn test_row_with_unknown_enum_is_an_error() {
        let row = ExpectedRow {
            id: Uuid::new_v4(),
            client: "Contoso".to_string(),
            customer_contract: String::new(),
            invoice_type: "Consulting".to_string(),
            expected_amount: Decimal::new(100, 0),
            currency: "USD".to_string(),
            expected_date: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap(),
            frequency: "monthly".to_string(),
            last_invoice_number: "1".to_string(),
            last_invoice_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            acknowledged: false,
            acknowledged_date: None,
        };
        assert!(matches!(
            row.into_expected(),
            Err(StoreError::InvalidColumn { column: "invoice_type", .. })
        ));
    }
}
