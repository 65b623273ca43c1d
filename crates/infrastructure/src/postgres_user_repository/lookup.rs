use super::*;

// Binds: $1 search text, $2 status.
const USER_FILTER: &str = "($1::TEXT IS NULL \
     OR strpos(lower(email), lower($1)) > 0 \
     OR strpos(lower(display_name), lower($1)) > 0) \
     AND ($2::TEXT IS NULL OR status = $2)";

impl PostgresUserRepository {
    pub(super) async fn find_user_impl(&self, user_id: UserId) -> AppResult<Option<User>> {
        let mut connection = self
            .pool
            .acquire()
            .await
            .map_err(|error| map_sqlx_error(error, "acquire connection"))?;

        let credentials = fetch_credentials(&mut connection, user_id).await?;
        Ok(credentials.map(|credentials| credentials.user))
    }

    pub(super) async fn find_credentials_by_email_impl(
        &self,
        email: &EmailAddress,
    ) -> AppResult<Option<UserCredentials>> {
        let mut connection = self
            .pool
            .acquire()
            .await
            .map_err(|error| map_sqlx_error(error, "acquire connection"))?;

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, display_name, password_hash, role, status,
                   failed_login_count, last_login_at, created_at, updated_at
            FROM users
            WHERE LOWER(email) = LOWER($1)
            LIMIT 1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&mut *connection)
        .await
        .map_err(|error| map_sqlx_error(error, "find user by email"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let memberships = fetch_memberships(&mut connection, UserId::from_uuid(row.id)).await?;
        row.into_credentials(memberships).map(Some)
    }

    pub(super) async fn list_users_impl(&self, query: &UserListQuery) -> AppResult<Page<User>> {
        let search = query.search.as_deref();
        let status = query.status.map(|status| status.as_str());

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM users WHERE {USER_FILTER}"
        ))
        .bind(search)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_sqlx_error(error, "count users"))?;

        let column = match query.sort_by {
            UserSortField::Email => "email",
            UserSortField::DisplayName => "display_name",
            UserSortField::CreatedAt => "created_at",
        };
        let direction = match query.sort_dir {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT id, email, display_name, password_hash, role, status,
                   failed_login_count, last_login_at, created_at, updated_at
            FROM users
            WHERE {USER_FILTER}
            ORDER BY {column} {direction}, id {direction}
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(search)
        .bind(status)
        .bind(page_bound(query.limit))
        .bind(page_bound(query.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_sqlx_error(error, "list users"))?;

        let user_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let membership_rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT m.user_id, m.product_id, m.role_override
            FROM product_memberships m
            JOIN products p ON p.id = m.product_id
            WHERE m.user_id = ANY($1) AND NOT p.is_deleted
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(&user_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_sqlx_error(error, "list user memberships"))?;

        let mut memberships: HashMap<Uuid, Vec<ProductMembership>> = HashMap::new();
        for row in membership_rows {
            let user_id = row.user_id;
            memberships
                .entry(user_id)
                .or_default()
                .push(ProductMembership::try_from(row)?);
        }

        let items = rows
            .into_iter()
            .map(|row| {
                let user_memberships = memberships.remove(&row.id).unwrap_or_default();
                row.into_credentials(user_memberships)
                    .map(|credentials| credentials.user)
            })
            .collect::<AppResult<Vec<User>>>()?;

        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }
}

/// Loads a user with memberships on the given connection.
pub(super) async fn fetch_credentials(
    connection: &mut PgConnection,
    user_id: UserId,
) -> AppResult<Option<UserCredentials>> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, email, display_name, password_hash, role, status,
               failed_login_count, last_login_at, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id.as_uuid())
    .fetch_optional(&mut *connection)
    .await
    .map_err(|error| map_sqlx_error(error, "find user by id"))?;

    let Some(row) = row else {
        return Ok(None);
    };

    let memberships = fetch_memberships(connection, user_id).await?;
    row.into_credentials(memberships).map(Some)
}

async fn fetch_memberships(
    connection: &mut PgConnection,
    user_id: UserId,
) -> AppResult<Vec<ProductMembership>> {
    let rows = sqlx::query_as::<_, MembershipRow>(
        r#"
        SELECT m.user_id, m.product_id, m.role_override
        FROM product_memberships m
        JOIN products p ON p.id = m.product_id
        WHERE m.user_id = $1 AND NOT p.is_deleted
        ORDER BY m.created_at ASC
        "#,
    )
    .bind(user_id.as_uuid())
    .fetch_all(&mut *connection)
    .await
    .map_err(|error| map_sqlx_error(error, "load product memberships"))?;

    rows.into_iter().map(ProductMembership::try_from).collect()
}
