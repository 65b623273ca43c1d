use super::*;

#[derive(Debug, FromRow)]
struct MemberRow {
    user_id: Uuid,
    email: String,
    display_name: String,
    role: String,
    role_override: Option<String>,
}

impl TryFrom<MemberRow> for ProductMember {
    type Error = AppError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: UserId::from_uuid(row.user_id),
            email: row.email,
            display_name: row.display_name,
            role: row.role.parse()?,
            role_override: row.role_override.as_deref().map(str::parse).transpose()?,
        })
    }
}

impl PostgresProductRepository {
    pub(super) async fn list_members_impl(
        &self,
        product_id: ProductId,
    ) -> AppResult<Vec<ProductMember>> {
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT u.id AS user_id, u.email, u.display_name, u.role, m.role_override
            FROM product_memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.product_id = $1
            ORDER BY u.email ASC
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_sqlx_error(error, "list product members"))?;

        rows.into_iter().map(ProductMember::try_from).collect()
    }

    pub(super) async fn set_member_impl(
        &self,
        product_id: ProductId,
        user_id: UserId,
        role_override: Option<Role>,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<ProductMembership>> {
        retry_serializable("set member", || {
            self.attempt_set_member(product_id, user_id, role_override, audit.clone())
        })
        .await
    }

    async fn attempt_set_member(
        &self,
        product_id: ProductId,
        user_id: UserId,
        role_override: Option<Role>,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<ProductMembership>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        sqlx::query(
            r#"
            INSERT INTO product_memberships (product_id, user_id, role_override)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, user_id)
            DO UPDATE SET role_override = EXCLUDED.role_override
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(role_override.map(|role| role.as_str()))
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "set product member"))?;

        let sequence = append_audit_entry(&mut transaction, &audit).await?;
        commit(transaction, "commit product member").await?;

        Ok(Committed::new(
            ProductMembership {
                product_id,
                role_override,
            },
            sequence,
        ))
    }

    pub(super) async fn remove_member_impl(
        &self,
        product_id: ProductId,
        user_id: UserId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<()>> {
        retry_serializable("remove member", || {
            self.attempt_remove_member(product_id, user_id, audit.clone())
        })
        .await
    }

    async fn attempt_remove_member(
        &self,
        product_id: ProductId,
        user_id: UserId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<()>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        let removed = sqlx::query(
            r#"
            DELETE FROM product_memberships
            WHERE product_id = $1 AND user_id = $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(user_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "remove product member"))?;

        if removed.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "user '{user_id}' is not a member of product '{product_id}'"
            )));
        }

        let sequence = append_audit_entry(&mut transaction, &audit).await?;
        commit(transaction, "commit product member removal").await?;

        Ok(Committed::new((), sequence))
    }
}
