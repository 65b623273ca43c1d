use async_trait::async_trait;
use bugzot_core::AppResult;
use bugzot_domain::{NewAuditEntry, Product, ProductId, ProductMembership, Role, UserId};

use super::{Committed, contains_ignoring_case};

/// A product member as listed to administrators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductMember {
    /// Member user id.
    pub user_id: UserId,
    /// Member email.
    pub email: String,
    /// Member display name.
    pub display_name: String,
    /// Global role.
    pub role: Role,
    /// Product-specific override.
    pub role_override: Option<Role>,
}

/// Partial product update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    /// New unique name.
    pub name: Option<String>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// New active flag.
    pub is_active: Option<bool>,
}

/// Search and status filters for the product catalogue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
    /// Only products with this active flag.
    pub is_active: Option<bool>,
}

impl ProductFilter {
    /// Returns whether a live product passes the filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let active_matches = self
            .is_active
            .is_none_or(|is_active| product.is_active == is_active);
        let search_matches = self
            .search
            .as_deref()
            .is_none_or(|needle| contains_ignoring_case(&product.name, needle));
        active_matches && search_matches
    }
}

/// Product and membership storage.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Finds a product, soft-deleted ones included.
    async fn find_product(&self, product_id: ProductId) -> AppResult<Option<Product>>;

    /// Lists products that are not soft-deleted and pass the filter, ordered by name.
    async fn list_products(&self, filter: &ProductFilter) -> AppResult<Vec<Product>>;

    /// Inserts a product. A duplicate name is `AppError::Conflict`.
    async fn create_product(
        &self,
        product: Product,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Product>>;

    /// Applies a partial update.
    async fn update_product(
        &self,
        product_id: ProductId,
        changes: ProductChanges,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Product>>;

    /// Soft-deletes a product.
    ///
    /// Fails with `AppError::Conflict` while any bug of the product is not
    /// closed; the check runs inside the deleting transaction.
    async fn soft_delete_product(
        &self,
        product_id: ProductId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Product>>;

    /// Lists members of a product.
    async fn list_members(&self, product_id: ProductId) -> AppResult<Vec<ProductMember>>;

    /// Adds a member or replaces the role override of an existing member.
    async fn set_member(
        &self,
        product_id: ProductId,
        user_id: UserId,
        role_override: Option<Role>,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<ProductMembership>>;

    /// Removes a member. Missing memberships are `AppError::NotFound`.
    async fn remove_member(
        &self,
        product_id: ProductId,
        user_id: UserId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<()>>;
}
