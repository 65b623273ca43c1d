use super::lookup::fetch_credentials;
use super::*;

impl PostgresUserRepository {
    pub(super) async fn create_user_impl(
        &self,
        record: NewUserRecord,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        retry_serializable("create user", || {
            self.attempt_create_user(record.clone(), audit.clone())
        })
        .await
    }

    async fn attempt_create_user(
        &self,
        record: NewUserRecord,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, email, display_name, password_hash, role)
            VALUES ($1, LOWER($2), $3, $4, $5)
            RETURNING id, email, display_name, password_hash, role, status,
                      failed_login_count, last_login_at, created_at, updated_at
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.email.as_str())
        .bind(&record.display_name)
        .bind(&record.password_hash)
        .bind(record.role.as_str())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| match map_sqlx_error(error, "create user") {
            AppError::Conflict(_) => AppError::Conflict("email already registered".to_owned()),
            other => other,
        })?;

        let sequence = append_audit_entry(&mut transaction, &audit).await?;
        commit(transaction, "commit user creation").await?;

        let credentials = row.into_credentials(Vec::new())?;
        Ok(Committed::new(credentials.user, sequence))
    }

    pub(super) async fn record_login_failure_impl(
        &self,
        user_id: UserId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<i32>> {
        retry_serializable("record login failure", || {
            self.attempt_record_login_failure(user_id, audit.clone())
        })
        .await
    }

    async fn attempt_record_login_failure(
        &self,
        user_id: UserId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<i32>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        let failed_login_count = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE users
            SET failed_login_count = failed_login_count + 1, updated_at = now()
            WHERE id = $1
            RETURNING failed_login_count
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "record failed login"))?
        .ok_or_else(|| user_not_found(user_id))?;

        let sequence = append_audit_entry(&mut transaction, &audit).await?;
        commit(transaction, "commit failed login").await?;

        Ok(Committed::new(failed_login_count, sequence))
    }

    pub(super) async fn record_login_success_impl(
        &self,
        user_id: UserId,
        logged_in_at: DateTime<Utc>,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        retry_serializable("record login success", || {
            self.attempt_record_login_success(user_id, logged_in_at, audit.clone())
        })
        .await
    }

    async fn attempt_record_login_success(
        &self,
        user_id: UserId,
        logged_in_at: DateTime<Utc>,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET failed_login_count = 0, last_login_at = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(logged_in_at)
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "record successful login"))?;

        self.finish_update(transaction, user_id, updated.rows_affected(), audit)
            .await
    }

    pub(super) async fn update_profile_impl(
        &self,
        user_id: UserId,
        changes: UserProfileChanges,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        retry_serializable("update profile", || {
            self.attempt_update_profile(user_id, changes.clone(), audit.clone())
        })
        .await
    }

    async fn attempt_update_profile(
        &self,
        user_id: UserId,
        changes: UserProfileChanges,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET email = COALESCE(LOWER($2), email),
                display_name = COALESCE($3, display_name),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(changes.email.as_ref().map(EmailAddress::as_str))
        .bind(changes.display_name.as_deref())
        .execute(&mut *transaction)
        .await
        .map_err(|error| match map_sqlx_error(error, "update user profile") {
            AppError::Conflict(_) => AppError::Conflict("email already registered".to_owned()),
            other => other,
        })?;

        self.finish_update(transaction, user_id, updated.rows_affected(), audit)
            .await
    }

    pub(super) async fn set_role_impl(
        &self,
        user_id: UserId,
        role: Role,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        retry_serializable("set role", || self.attempt_set_role(user_id, role, audit.clone())).await
    }

    async fn attempt_set_role(
        &self,
        user_id: UserId,
        role: Role,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET role = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role.as_str())
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "set user role"))?;

        self.finish_update(transaction, user_id, updated.rows_affected(), audit)
            .await
    }

    pub(super) async fn disable_user_impl(
        &self,
        user_id: UserId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        retry_serializable("disable user", || {
            self.attempt_disable_user(user_id, audit.clone())
        })
        .await
    }

    async fn attempt_disable_user(
        &self,
        user_id: UserId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        let mut transaction = begin_serializable(&self.pool).await?;

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET status = 'disabled', updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_sqlx_error(error, "disable user"))?;

        self.finish_update(transaction, user_id, updated.rows_affected(), audit)
            .await
    }

    async fn finish_update(
        &self,
        mut transaction: sqlx::Transaction<'static, sqlx::Postgres>,
        user_id: UserId,
        rows_affected: u64,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<User>> {
        if rows_affected == 0 {
            return Err(user_not_found(user_id));
        }

        let credentials = fetch_credentials(&mut transaction, user_id)
            .await?
            .ok_or_else(|| user_not_found(user_id))?;
        let sequence = append_audit_entry(&mut transaction, &audit).await?;
        commit(transaction, "commit user update").await?;

        Ok(Committed::new(credentials.user, sequence))
    }
}

fn user_not_found(user_id: UserId) -> AppError {
    AppError::NotFound(format!("user '{user_id}' not found"))
}
