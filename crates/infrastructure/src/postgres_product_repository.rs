//! PostgreSQL-backed product and membership repository.

use async_trait::async_trait;
use bugzot_application::{
    Committed, ProductChanges, ProductFilter, ProductMember, ProductRepository,
};
use bugzot_core::{AppError, AppResult};
use bugzot_domain::{NewAuditEntry, Product, ProductId, ProductMembership, Role, UserId};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::postgres_support::{
    append_audit_entry, begin_serializable, commit, map_sqlx_error, retry_serializable,
};

/// PostgreSQL implementation of the product repository port.
#[derive(Clone)]
pub struct PostgresProductRepository {
    pool: PgPool,
}

impl PostgresProductRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    is_active: bool,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            is_active: row.is_active,
            is_deleted: row.is_deleted,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

mod membership;

#[async_trait]
impl ProductRepository for PostgresProductRepository {
    async fn find_product(&self, product_id: ProductId) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, description, is_active, is_deleted, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_sqlx_error(error, "find product"))?;

        Ok(row.map(Product::from))
    }

    async fn list_products(&self, filter: &ProductFilter) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, description, is_active, is_deleted, created_at, updated_at
            FROM products
            WHERE NOT is_deleted
              AND ($1::TEXT IS NULL OR strpos(lower(name), lower($1)) > 0)
              AND ($2::BOOLEAN IS NULL OR is_active = $2)
            ORDER BY name ASC
            "#,
        )
        .bind(filter.search.as_deref())
        .bind(filter.is_active)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_sqlx_error(error, "list products"))?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn create_product(
        &self,
        product: Product,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Product>> {
        retry_serializable("create product", || {
            self.attempt_create_product(product.clone(), audit.clone())
        })
        .await
    }

    async fn update_product(
        &self,
        product_id: ProductId,
        changes: ProductChanges,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Product>> {
        retry_serializable("update product", || {
            self.attempt_update_product(product_id, changes.clone(), audit.clone())
        })
        .await
    }

    async fn soft_delete_product(
        &self,
        product_id: ProductId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Product>> {
        retry_serializable("soft delete product", || {
            self.attempt_soft_delete_product(product_id, audit.clone())
        })
        .await
    }

    async fn list_members(&self, product_id: ProductId) -> AppResult<Vec<ProductMember>> {
        self.list_members_impl(product_id).await
    }

    async fn set_member(
        &self,
        product_id: ProductId,
        user_id: UserId,
        role_override: Option<Role>,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<ProductMembership>> {
        self.set_member_impl(product_id, user_id, role_override, audit)
            .await
    }

    async fn remove_member(
        &self,
        product_id: ProductId,
        user_id: UserId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<()>> {
        self.remove_member_impl(product_id, user_id, audit).await
    }
}

impl PostgresProductRepository {
    async fn attempt_create_product(
        &self,
        product: Product,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Product>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (id, name, description, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, name, description, is_active, is_deleted, created_at, updated_at
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.is_active)
        .bind(product.created_at)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| match map_sqlx_error(error, "create product") {
            AppError::Conflict(_) => {
                AppError::Conflict(format!("product name '{}' is already taken", product.name))
            }
            other => other,
        })?;

        let sequence = append_audit_entry(&mut transaction, &audit).await?;
        commit(transaction, "commit product creation").await?;

        Ok(Committed::new(Product::from(row), sequence))
    }

    async fn attempt_update_product(
        &self,
        product_id: ProductId,
        changes: ProductChanges,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Product>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        let clears_or_sets_description = changes.description.is_some();
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                is_active = COALESCE($5, is_active),
                updated_at = now()
            WHERE id = $1 AND NOT is_deleted
            RETURNING id, name, description, is_active, is_deleted, created_at, updated_at
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(changes.name)
        .bind(clears_or_sets_description)
        .bind(changes.description.flatten())
        .bind(changes.is_active)
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "update product"))?
        .ok_or_else(|| product_not_found(product_id))?;

        let sequence = append_audit_entry(&mut transaction, &audit).await?;
        commit(transaction, "commit product update").await?;

        Ok(Committed::new(Product::from(row), sequence))
    }

    async fn attempt_soft_delete_product(
        &self,
        product_id: ProductId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Product>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        let locked = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM products
            WHERE id = $1 AND NOT is_deleted
            FOR UPDATE
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "lock product"))?;
        if locked.is_none() {
            return Err(product_not_found(product_id));
        }

        let open_bugs = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM bugs
            WHERE product_id = $1 AND status <> 'closed'
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "count open bugs"))?;
        if open_bugs > 0 {
            return Err(AppError::Conflict(format!(
                "product '{product_id}' still has {open_bugs} bug(s) that are not closed"
            )));
        }

        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            UPDATE products
            SET is_deleted = TRUE, is_active = FALSE, updated_at = now()
            WHERE id = $1
            RETURNING id, name, description, is_active, is_deleted, created_at, updated_at
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "delete product"))?;

        let sequence = append_audit_entry(&mut transaction, &audit).await?;
        commit(transaction, "commit product deletion").await?;

        Ok(Committed::new(Product::from(row), sequence))
    }
}

fn product_not_found(product_id: ProductId) -> AppError {
    AppError::NotFound(format!("product '{product_id}' not found"))
}

#[cfg(test)]
mod tests;
