use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{EventId, PaymentId};
use domain::{Currency, Payment, Status};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{PaymentEvent, PaymentStore, Result, RetryPolicy, Sequence, StoreError};

/// PostgreSQL-backed payment store.
///
/// Every write opens one transaction covering the event append and the
/// read-model change; the whole transaction is retried on transient
/// failures per [`RetryPolicy`].
#[derive(Clone)]
pub struct PostgresPaymentStore {
    pool: PgPool,
    retry: RetryPolicy,
}

impl PostgresPaymentStore {
    /// Creates a new PostgreSQL payment store with the default retry policy.
    pub fn new(pool: PgPool) -> Self {
        Self::with_retry(pool, RetryPolicy::default())
    }

    /// Creates a store with an explicit retry policy.
    pub fn with_retry(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_payment(row: PgRow) -> Result<Payment> {
        let currency: String = row.try_get("currency")?;
        let status: String = row.try_get("status")?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            idempotency_key: row.try_get("idempotency_key")?,
            user_id: row.try_get("user_id")?,
            amount_cents: domain::Money::from_cents(row.try_get::<i64, _>("amount_cents")?),
            currency: Currency::parse(&currency)
                .map_err(|_| StoreError::Decode(format!("unknown currency: {currency}")))?,
            status: parse_status(&status)?,
            gateway_ref: row.try_get("gateway_ref")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }

    fn row_to_event(row: PgRow) -> Result<PaymentEvent> {
        Ok(PaymentEvent {
            id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            payment_id: PaymentId::from_uuid(row.try_get::<Uuid, _>("payment_id")?),
            sequence: Sequence::new(row.try_get("sequence")?),
            event_type: row.try_get("event_type")?,
            payload: row.try_get("payload")?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    async fn insert_event(
        tx: &mut Transaction<'_, Postgres>,
        event: &PaymentEvent,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payment_events (id, payment_id, sequence, event_type, payload, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.payment_id.as_uuid())
        .bind(event.sequence.as_i64())
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(event.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn try_save(&self, payment: &Payment) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        Self::insert_event(&mut tx, &PaymentEvent::created(payment)).await?;

        sqlx::query(
            r#"
            INSERT INTO payments
                (id, idempotency_key, user_id, amount_cents, currency, status, gateway_ref, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(&payment.idempotency_key)
        .bind(&payment.user_id)
        .bind(payment.amount_cents.cents())
        .bind(payment.currency.as_str())
        .bind(payment.status.as_str())
        .bind(payment.gateway_ref.as_deref())
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("payments_idempotency_key_key")
            {
                return StoreError::Conflict(payment.idempotency_key.clone());
            }
            StoreError::Database(e)
        })?;

        tx.commit().await?;
        Ok(())
    }

    async fn try_update_status(
        &self,
        payment_id: PaymentId,
        from: Status,
        to: Status,
        gateway_ref: Option<&str>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Lock the row so the status check and the update below are one unit.
        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM payments WHERE id = $1 FOR UPDATE")
                .bind(payment_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;

        let current = parse_status(&current.ok_or(StoreError::NotFound(payment_id))?)?;
        if current != from {
            return Err(StoreError::StatusConflict {
                payment_id,
                expected: from,
                actual: current,
            });
        }

        let next_sequence: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(sequence), 0) + 1
            FROM payment_events
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id.as_uuid())
        .fetch_one(&mut *tx)
        .await?;

        let event =
            PaymentEvent::status_changed(payment_id, Sequence::new(next_sequence), to, gateway_ref);
        Self::insert_event(&mut tx, &event).await?;

        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $1, gateway_ref = $2, updated_at = $3
            WHERE id = $4 AND status = $5
            "#,
        )
        .bind(to.as_str())
        .bind(gateway_ref)
        .bind(event.created_at)
        .bind(payment_id.as_uuid())
        .bind(from.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::StatusConflict {
                payment_id,
                expected: from,
                actual: current,
            });
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for PostgresPaymentStore {
    async fn save(&self, payment: &Payment) -> Result<()> {
        self.retry.run(|| self.try_save(payment)).await
    }

    async fn update_status(
        &self,
        payment_id: PaymentId,
        from: Status,
        to: Status,
        gateway_ref: Option<&str>,
    ) -> Result<()> {
        self.retry
            .run(|| self.try_update_status(payment_id, from, to, gateway_ref))
            .await
    }

    async fn get_by_id(&self, payment_id: PaymentId) -> Result<Payment> {
        let row = self
            .retry
            .run(|| async {
                sqlx::query(
                    r#"
                    SELECT id, idempotency_key, user_id, amount_cents, currency, status,
                           gateway_ref, created_at, updated_at
                    FROM payments
                    WHERE id = $1
                    "#,
                )
                .bind(payment_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::from)
            })
            .await?;

        match row {
            Some(row) => Self::row_to_payment(row),
            None => Err(StoreError::NotFound(payment_id)),
        }
    }

    async fn get_by_idempotency_key(&self, idempotency_key: &str) -> Result<Option<Payment>> {
        let row = self
            .retry
            .run(|| async {
                sqlx::query(
                    r#"
                    SELECT id, idempotency_key, user_id, amount_cents, currency, status,
                           gateway_ref, created_at, updated_at
                    FROM payments
                    WHERE idempotency_key = $1
                    "#,
                )
                .bind(idempotency_key)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::from)
            })
            .await?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn get_events_by_payment_id(&self, payment_id: PaymentId) -> Result<Vec<PaymentEvent>> {
        let rows = self
            .retry
            .run(|| async {
                sqlx::query(
                    r#"
                    SELECT id, payment_id, sequence, event_type, payload, created_at
                    FROM payment_events
                    WHERE payment_id = $1
                    ORDER BY sequence ASC
                    "#,
                )
                .bind(payment_id.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(StoreError::from)
            })
            .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }
}

fn parse_status(status: &str) -> Result<Status> {
    match status {
        "PENDING" => Ok(Status::Pending),
        "RESERVED" => Ok(Status::Reserved),
        "COMPLETED" => Ok(Status::Completed),
        "FAILED" => Ok(Status::Failed),
        other => Err(StoreError::Decode(format!("unknown status: {other}"))),
    }
}
