use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    ColorId, OrderId, OrderQuery, OrderRecord, ProductId, ProductRecord, Result, Revision, SizeId,
    StockChange, StoreError, Transaction, UserId, VariantKey, VariantRecord, VariantStock,
    store::{CatalogReader, OrderRepository, StockLedger, TransactionalStore},
};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_order(row: PgRow) -> Result<OrderRecord> {
        Ok(OrderRecord {
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            status: row.try_get("status")?,
            revision: Revision::new(row.try_get("revision")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            document: row.try_get("document")?,
        })
    }

    fn stock_from_db(key: &VariantKey, stock: i64) -> Result<u32> {
        u32::try_from(stock).map_err(|_| {
            StoreError::Unavailable(format!("stock value {stock} out of range for {key}"))
        })
    }

    /// Locks a variant row inside `tx` and returns its stock.
    async fn lock_variant(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        key: &VariantKey,
    ) -> Result<Option<i64>> {
        let stock: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT stock FROM product_variants
            WHERE product_id = $1 AND size_id = $2 AND color_id = $3
            FOR UPDATE
            "#,
        )
        .bind(key.product_id.as_str())
        .bind(key.size_id.as_str())
        .bind(key.color_id.as_str())
        .fetch_optional(&mut **tx)
        .await?;
        Ok(stock)
    }
}

#[async_trait]
impl StockLedger for PostgresStore {
    async fn variant_stock(&self, key: &VariantKey) -> Result<Option<VariantStock>> {
        let stock: Option<i64> = sqlx::query_scalar(
            "SELECT stock FROM product_variants WHERE product_id = $1 AND size_id = $2 AND color_id = $3",
        )
        .bind(key.product_id.as_str())
        .bind(key.size_id.as_str())
        .bind(key.color_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        stock
            .map(|s| {
                Ok(VariantStock {
                    key: key.clone(),
                    stock: Self::stock_from_db(key, s)?,
                })
            })
            .transpose()
    }

    async fn try_decrement(&self, key: &VariantKey, quantity: u32) -> Result<StockChange> {
        // The condition and the write are one statement; Postgres re-evaluates
        // the WHERE clause after acquiring the row lock.
        let after: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE product_variants
            SET stock = stock - $4
            WHERE product_id = $1 AND size_id = $2 AND color_id = $3 AND stock >= $4
            RETURNING stock
            "#,
        )
        .bind(key.product_id.as_str())
        .bind(key.size_id.as_str())
        .bind(key.color_id.as_str())
        .bind(i64::from(quantity))
        .fetch_optional(&self.pool)
        .await?;

        match after {
            Some(after) => {
                let after = Self::stock_from_db(key, after)?;
                Ok(StockChange {
                    key: key.clone(),
                    before: after + quantity,
                    after,
                })
            }
            None => match self.variant_stock(key).await? {
                Some(current) => Err(StoreError::ConditionFailed {
                    key: key.clone(),
                    requested: quantity,
                    available: current.stock,
                }),
                None => Err(StoreError::VariantNotFound(key.clone())),
            },
        }
    }

    async fn increment(&self, key: &VariantKey, quantity: u32) -> Result<StockChange> {
        // The range guard keeps every written value representable, so nothing
        // after the write can fail.
        let after: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE product_variants
            SET stock = stock + $4
            WHERE product_id = $1 AND size_id = $2 AND color_id = $3
              AND stock + $4 <= $5
            RETURNING stock
            "#,
        )
        .bind(key.product_id.as_str())
        .bind(key.size_id.as_str())
        .bind(key.color_id.as_str())
        .bind(i64::from(quantity))
        .bind(i64::from(u32::MAX))
        .fetch_optional(&self.pool)
        .await?;

        match after {
            Some(after) => {
                let after = u32::try_from(after).unwrap_or(u32::MAX);
                Ok(StockChange {
                    key: key.clone(),
                    before: after.saturating_sub(quantity),
                    after,
                })
            }
            None => match self.variant_stock(key).await? {
                Some(current) => Err(StoreError::Unavailable(format!(
                    "stock overflow for {key}: {} + {quantity}",
                    current.stock
                ))),
                None => Err(StoreError::VariantNotFound(key.clone())),
            },
        }
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn insert_order(&self, record: OrderRecord) -> Result<Revision> {
        let order_id = record.order_id;
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, revision, created_at, updated_at, document)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(record.user_id.as_uuid())
        .bind(&record.status)
        .bind(Revision::first().as_i64())
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(&record.document)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::DuplicateOrder(order_id);
            }
            StoreError::Database(e)
        })?;

        Ok(Revision::first())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, status, revision, created_at, updated_at, document
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<Vec<OrderRecord>> {
        let mut sql = String::from(
            "SELECT id, user_id, status, revision, created_at, updated_at, document FROM orders WHERE 1=1",
        );
        let mut param_count = 0;

        // Build dynamic query
        if query.user_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND user_id = ${param_count}"));
        }
        if query.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(user_id) = query.user_id {
            sqlx_query = sqlx_query.bind(user_id.as_uuid());
        }
        if let Some(status) = query.status {
            sqlx_query = sqlx_query.bind(status);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_order).collect()
    }
}

#[async_trait]
impl CatalogReader for PostgresStore {
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<ProductRecord>> {
        let row = sqlx::query("SELECT id, name, base_price_cents, discount FROM products WHERE id = $1")
            .bind(product_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let variant_rows = sqlx::query(
            r#"
            SELECT size_id, color_id, stock
            FROM product_variants
            WHERE product_id = $1
            ORDER BY size_id, color_id
            "#,
        )
        .bind(product_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut variants = Vec::with_capacity(variant_rows.len());
        for variant in variant_rows {
            let size_id = SizeId::new(variant.try_get::<String, _>("size_id")?);
            let color_id = ColorId::new(variant.try_get::<String, _>("color_id")?);
            let key = VariantKey {
                product_id: product_id.clone(),
                size_id: size_id.clone(),
                color_id: color_id.clone(),
            };
            variants.push(VariantRecord {
                stock: Self::stock_from_db(&key, variant.try_get("stock")?)?,
                size_id,
                color_id,
            });
        }

        Ok(Some(ProductRecord {
            product_id: ProductId::new(row.try_get::<String, _>("id")?),
            name: row.try_get("name")?,
            base_price_cents: row.try_get("base_price_cents")?,
            discount: row.try_get("discount")?,
            variants,
        }))
    }

    async fn size_name(&self, size_id: &SizeId) -> Result<Option<String>> {
        let name = sqlx::query_scalar("SELECT name FROM sizes WHERE id = $1")
            .bind(size_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }

    async fn color_name(&self, color_id: &ColorId) -> Result<Option<String>> {
        let name = sqlx::query_scalar("SELECT name FROM colors WHERE id = $1")
            .bind(color_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }
}

#[async_trait]
impl TransactionalStore for PostgresStore {
    async fn commit(&self, tx: Transaction) -> Result<Revision> {
        let (mut adjustments, order) = tx.into_parts();

        // Dropping `db_tx` without commit rolls back, so every early return
        // below releases the row locks with nothing written.
        let mut db_tx = self.pool.begin().await?;

        if let Some(ref write) = order {
            let order_id = write.record.order_id;
            let current: Option<i64> =
                sqlx::query_scalar("SELECT revision FROM orders WHERE id = $1 FOR UPDATE")
                    .bind(order_id.as_uuid())
                    .fetch_optional(&mut *db_tx)
                    .await?;
            let actual = current.map(Revision::new).unwrap_or(Revision::initial());
            if actual != write.expected {
                return Err(StoreError::RevisionConflict {
                    order_id,
                    expected: write.expected,
                    actual,
                });
            }
        }

        // Lock variants in a stable order so overlapping scopes cannot deadlock
        adjustments.sort_by(|a, b| a.key.cmp(&b.key));

        for adjustment in &adjustments {
            let current = Self::lock_variant(&mut db_tx, &adjustment.key)
                .await?
                .ok_or_else(|| StoreError::VariantNotFound(adjustment.key.clone()))?;
            let next = current + adjustment.delta;
            if next < 0 {
                return Err(StoreError::ConditionFailed {
                    key: adjustment.key.clone(),
                    requested: adjustment.magnitude(),
                    available: Self::stock_from_db(&adjustment.key, current)?,
                });
            }
            if next > i64::from(u32::MAX) {
                return Err(StoreError::Unavailable(format!(
                    "stock overflow for {}",
                    adjustment.key
                )));
            }

            sqlx::query(
                r#"
                UPDATE product_variants
                SET stock = $4
                WHERE product_id = $1 AND size_id = $2 AND color_id = $3
                "#,
            )
            .bind(adjustment.key.product_id.as_str())
            .bind(adjustment.key.size_id.as_str())
            .bind(adjustment.key.color_id.as_str())
            .bind(next)
            .execute(&mut *db_tx)
            .await?;
        }

        let revision = match order {
            Some(write) if write.expected == Revision::initial() => {
                let record = write.record;
                sqlx::query(
                    r#"
                    INSERT INTO orders (id, user_id, status, revision, created_at, updated_at, document)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(record.order_id.as_uuid())
                .bind(record.user_id.as_uuid())
                .bind(&record.status)
                .bind(Revision::first().as_i64())
                .bind(record.created_at)
                .bind(record.updated_at)
                .bind(&record.document)
                .execute(&mut *db_tx)
                .await?;
                Revision::first()
            }
            Some(write) => {
                let record = write.record;
                let revision = write.expected.next();
                sqlx::query(
                    r#"
                    UPDATE orders
                    SET status = $2, revision = $3, updated_at = $4, document = $5
                    WHERE id = $1
                    "#,
                )
                .bind(record.order_id.as_uuid())
                .bind(&record.status)
                .bind(revision.as_i64())
                .bind(record.updated_at)
                .bind(&record.document)
                .execute(&mut *db_tx)
                .await?;
                revision
            }
            None => Revision::initial(),
        };

        db_tx.commit().await?;
        tracing::debug!(
            adjustments = adjustments.len(),
            %revision,
            "transaction scope committed"
        );
        Ok(revision)
    }
}
