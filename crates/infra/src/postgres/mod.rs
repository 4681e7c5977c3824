//! Postgres-backed catalog store.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError::Backend` with the operation name
//! attached. Single-row writes check the affected-row count and report a
//! mismatch as `StoreError::RowCount`.
//!
//! ## Stock writes
//!
//! Order decrements are relative (`stock = stock - q`) and carry
//! `AND stock >= q`, so a row that a concurrent order already drained below
//! the requested quantity is not matched and the write affects zero rows.
//! The `stock >= 0` check constraint backs this up at the schema level.

pub mod catalog_sql;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use bazaar_core::{BankAccountId, ProductId, UserId};
use bazaar_parties::{BankAccount, UserProfile};
use bazaar_products::{CatalogQuery, Condition, Product, ProductTag};
use bazaar_sales::Order;

use crate::store::{CatalogStore, CatalogTx, StoreError};

/// Idempotent schema bootstrap.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id          UUID PRIMARY KEY,
    username    TEXT NOT NULL,
    name        TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS products (
    id              UUID PRIMARY KEY,
    user_id         UUID NOT NULL,
    name            TEXT NOT NULL,
    price           BIGINT NOT NULL CHECK (price >= 0),
    image_url       TEXT NOT NULL,
    stock           BIGINT NOT NULL CHECK (stock >= 0),
    condition       TEXT NOT NULL,
    is_purchasable  BOOLEAN NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    deleted_at      TIMESTAMPTZ NULL
);
CREATE INDEX IF NOT EXISTS products_user_id_idx ON products (user_id) WHERE deleted_at IS NULL;

CREATE TABLE IF NOT EXISTS product_tags (
    id          BIGSERIAL PRIMARY KEY,
    product_id  UUID NOT NULL,
    tag         TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS product_tags_product_id_idx ON product_tags (product_id);
CREATE INDEX IF NOT EXISTS product_tags_tag_idx ON product_tags (tag);

CREATE TABLE IF NOT EXISTS bank_accounts (
    id                   UUID PRIMARY KEY,
    user_id              UUID NOT NULL,
    bank_name            TEXT NOT NULL,
    bank_account_name    TEXT NOT NULL,
    bank_account_number  TEXT NOT NULL,
    created_at           TIMESTAMPTZ NOT NULL,
    updated_at           TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    deleted_at           TIMESTAMPTZ NULL
);

CREATE TABLE IF NOT EXISTS orders (
    id                       UUID PRIMARY KEY,
    user_id                  UUID NOT NULL,
    product_id               UUID NOT NULL,
    bank_account_id          UUID NOT NULL,
    payment_proof_image_url  TEXT NOT NULL,
    quantity                 BIGINT NOT NULL CHECK (quantity > 0),
    created_at               TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS orders_product_id_idx ON orders (product_id);
"#;

/// Postgres-backed `CatalogStore`.
///
/// Uses the SQLx connection pool, which is `Send + Sync` and cheap to clone.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Connect, then create any missing tables.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self), err)]
    async fn begin(&self) -> Result<Box<dyn CatalogTx>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresCatalogTx { tx }))
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, name, price, image_url, stock, condition, is_purchasable, created_at
            FROM products
            WHERE id = $1 AND deleted_at IS NULL
            LIMIT 1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("product_by_id", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn tags_for(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Vec<ProductTag>>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, tag
            FROM product_tags
            WHERE product_id = ANY($1)
            ORDER BY product_id ASC, tag ASC, id ASC
            "#,
        )
        .bind(uuids(ids))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("tags_for", e))?;

        let mut grouped: HashMap<ProductId, Vec<ProductTag>> = HashMap::new();
        for row in &rows {
            let tag = tag_from_row(row)?;
            grouped.entry(tag.product_id).or_default().push(tag);
        }
        Ok(grouped)
    }

    #[instrument(skip(self, query), fields(limit = query.limit, offset = query.offset), err)]
    async fn list_products(&self, query: &CatalogQuery) -> Result<(Vec<Product>, i64), StoreError> {
        let total: i64 = catalog_sql::count_query(query)
            .build_query_scalar::<i64>()
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_products", e))?;

        let rows = catalog_sql::page_query(query)
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        let products = rows.iter().map(product_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok((products, total))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn purchase_counts(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, i64>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query(
            r#"
            SELECT product_id, SUM(quantity)::BIGINT AS total
            FROM orders
            WHERE product_id = ANY($1)
            GROUP BY product_id
            "#,
        )
        .bind(uuids(ids))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("purchase_counts", e))?;

        let mut counts = HashMap::with_capacity(rows.len());
        for row in &rows {
            let product_id: Uuid = row.try_get("product_id").map_err(|e| decode_error("purchase_counts", e))?;
            let total: i64 = row.try_get("total").map_err(|e| decode_error("purchase_counts", e))?;
            counts.insert(ProductId::from_uuid(product_id), total);
        }
        Ok(counts)
    }

    #[instrument(skip(self), fields(seller = %seller), err)]
    async fn units_sold_by(&self, seller: UserId) -> Result<i64, StoreError> {
        sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(o.quantity), 0)::BIGINT
            FROM orders o
            INNER JOIN products p ON p.id = o.product_id
            WHERE p.user_id = $1
            "#,
        )
        .bind(seller.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("units_sold_by", e))
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn update_stock(&self, id: ProductId, stock: i64) -> Result<(), StoreError> {
        let affected = sqlx::query("UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id.as_uuid())
            .bind(stock)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_stock", e))?
            .rows_affected();
        StoreError::expect_one("update_stock", affected)
    }

    #[instrument(skip(self, profile), fields(user_id = %profile.user_id), err)]
    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id)
            DO UPDATE SET
                username = EXCLUDED.username,
                name = EXCLUDED.name,
                updated_at = NOW()
            "#,
        )
        .bind(profile.user_id.as_uuid())
        .bind(&profile.username)
        .bind(&profile.display_name)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_profile", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn profile_by_id(&self, id: UserId) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query("SELECT id, username, name FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("profile_by_id", e))?;

        row.map(|row| {
            Ok(UserProfile {
                user_id: UserId::from_uuid(row.try_get("id").map_err(|e| decode_error("profile_by_id", e))?),
                username: row.try_get("username").map_err(|e| decode_error("profile_by_id", e))?,
                display_name: row.try_get("name").map_err(|e| decode_error("profile_by_id", e))?,
            })
        })
        .transpose()
    }

    #[instrument(skip(self), fields(bank_account_id = %id), err)]
    async fn bank_account_by_id(&self, id: BankAccountId) -> Result<Option<BankAccount>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, bank_name, bank_account_name, bank_account_number, created_at
            FROM bank_accounts
            WHERE id = $1 AND deleted_at IS NULL
            LIMIT 1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("bank_account_by_id", e))?;

        row.as_ref().map(bank_account_from_row).transpose()
    }

    #[instrument(skip(self), fields(owner = %owner), err)]
    async fn bank_accounts_of(&self, owner: UserId) -> Result<Vec<BankAccount>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, bank_name, bank_account_name, bank_account_number, created_at
            FROM bank_accounts
            WHERE user_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("bank_accounts_of", e))?;

        rows.iter().map(bank_account_from_row).collect()
    }

    #[instrument(skip(self, account), fields(bank_account_id = %account.id), err)]
    async fn insert_bank_account(&self, account: &BankAccount) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO bank_accounts (id, user_id, bank_name, bank_account_name, bank_account_number, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(account.owner_id.as_uuid())
        .bind(&account.bank_name)
        .bind(&account.account_name)
        .bind(&account.account_number)
        .bind(account.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_bank_account", e))?;
        Ok(())
    }

    #[instrument(skip(self, account), fields(bank_account_id = %account.id), err)]
    async fn update_bank_account(&self, account: &BankAccount) -> Result<(), StoreError> {
        let affected = sqlx::query(
            r#"
            UPDATE bank_accounts
            SET
                bank_name = $2,
                bank_account_name = $3,
                bank_account_number = $4,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.bank_name)
        .bind(&account.account_name)
        .bind(&account.account_number)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_bank_account", e))?
        .rows_affected();
        StoreError::expect_one("update_bank_account", affected)
    }

    #[instrument(skip(self), fields(bank_account_id = %id), err)]
    async fn soft_delete_bank_account(&self, id: BankAccountId) -> Result<(), StoreError> {
        let affected = sqlx::query(
            r#"
            UPDATE bank_accounts
            SET updated_at = NOW(), deleted_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("soft_delete_bank_account", e))?
        .rows_affected();
        StoreError::expect_one("soft_delete_bank_account", affected)
    }
}

/// A live Postgres transaction. Dropping it without commit rolls back.
pub struct PostgresCatalogTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CatalogTx for PostgresCatalogTx {
    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, user_id, name, price, image_url, stock, condition, is_purchasable, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.owner_id.as_uuid())
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.image_url)
        .bind(product.stock)
        .bind(product.condition.as_str())
        .bind(product.is_purchasable)
        .bind(product.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    #[instrument(skip(self, tags), fields(product_id = %product_id, count = tags.len()), err)]
    async fn insert_tags(&mut self, product_id: ProductId, tags: &[String]) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO product_tags (product_id, tag)
            SELECT $1, t.tag FROM UNNEST($2::TEXT[]) AS t(tag)
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(tags)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_tags", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn tags_of(&mut self, product_id: ProductId) -> Result<Vec<ProductTag>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, tag
            FROM product_tags
            WHERE product_id = $1
            ORDER BY tag ASC, id ASC
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("tags_of", e))?;

        rows.iter().map(tag_from_row).collect()
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn delete_tags(&mut self, ids: &[i64]) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM product_tags WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_tags", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn delete_tags_of(&mut self, product_id: ProductId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM product_tags WHERE product_id = $1")
            .bind(product_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_tags_of", e))?;
        Ok(())
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn update_product(&mut self, product: &Product) -> Result<(), StoreError> {
        let affected = sqlx::query(
            r#"
            UPDATE products
            SET
                name = $2,
                price = $3,
                image_url = $4,
                condition = $5,
                is_purchasable = $6,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.image_url)
        .bind(product.condition.as_str())
        .bind(product.is_purchasable)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?
        .rows_affected();
        StoreError::expect_one("update_product", affected)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn soft_delete_product(&mut self, id: ProductId) -> Result<(), StoreError> {
        let affected = sqlx::query(
            r#"
            UPDATE products
            SET updated_at = NOW(), deleted_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id.as_uuid())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("soft_delete_product", e))?
        .rows_affected();
        StoreError::expect_one("soft_delete_product", affected)
    }

    #[instrument(skip(self, order), fields(order_id = %order.id, product_id = %order.product_id), err)]
    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, product_id, bank_account_id, payment_proof_image_url, quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.buyer_id.as_uuid())
        .bind(order.product_id.as_uuid())
        .bind(order.bank_account_id.as_uuid())
        .bind(&order.payment_proof_image_url)
        .bind(order.quantity)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn decrement_stock(&mut self, id: ProductId, quantity: i64) -> Result<i64, StoreError> {
        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL AND stock >= $2
            RETURNING stock
            "#,
        )
        .bind(id.as_uuid())
        .bind(quantity)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("decrement_stock", e))?;
        remaining.ok_or(StoreError::RowCount {
            operation: "decrement_stock",
            affected: 0,
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))
    }
}

fn uuids(ids: &[ProductId]) -> Vec<Uuid> {
    ids.iter().map(|id| *id.as_uuid()).collect()
}

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    let decode = |e| decode_error("product_row", e);
    let condition: String = row.try_get("condition").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id").map_err(decode)?),
        owner_id: UserId::from_uuid(row.try_get("user_id").map_err(decode)?),
        name: row.try_get("name").map_err(decode)?,
        price: row.try_get("price").map_err(decode)?,
        image_url: row.try_get("image_url").map_err(decode)?,
        stock: row.try_get("stock").map_err(decode)?,
        condition: condition
            .parse::<Condition>()
            .map_err(|e| StoreError::backend("product_row", e.to_string()))?,
        is_purchasable: row.try_get("is_purchasable").map_err(decode)?,
        created_at,
    })
}

fn tag_from_row(row: &PgRow) -> Result<ProductTag, StoreError> {
    let decode = |e| decode_error("tag_row", e);
    Ok(ProductTag {
        id: row.try_get("id").map_err(decode)?,
        product_id: ProductId::from_uuid(row.try_get("product_id").map_err(decode)?),
        tag: row.try_get("tag").map_err(decode)?,
    })
}

fn bank_account_from_row(row: &PgRow) -> Result<BankAccount, StoreError> {
    let decode = |e| decode_error("bank_account_row", e);
    Ok(BankAccount {
        id: BankAccountId::from_uuid(row.try_get("id").map_err(decode)?),
        owner_id: UserId::from_uuid(row.try_get("user_id").map_err(decode)?),
        bank_name: row.try_get("bank_name").map_err(decode)?,
        account_name: row.try_get("bank_account_name").map_err(decode)?,
        account_number: row.try_get("bank_account_number").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
    })
}

fn decode_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    StoreError::backend(operation, format!("failed to decode row: {err}"))
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
            StoreError::backend(operation, format!("database error [{code}]: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => StoreError::backend(operation, "connection pool closed"),
        sqlx::Error::PoolTimedOut => StoreError::backend(operation, "timed out acquiring a connection"),
        other => StoreError::backend(operation, format!("sqlx error: {other}")),
    }
}
