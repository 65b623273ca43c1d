use std::sync::Arc;

use bugzot_core::{AppError, AppResult};
use bugzot_domain::{
    Action, Actor, AuditAction, NewAuditEntry, NewProduct, Product, ProductId, ProductMembership,
    ResourceKind, ResourceTarget, Role, UserId,
};
use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::{
    AuthorizationService, IdentityService, Page, ProductChanges, ProductFilter, ProductMember,
    ProductRepository, SortDirection, UserRepository,
};

/// Largest product catalogue page.
pub const PRODUCT_PAGE_MAX: usize = 100;

/// Filters, name order and paging for the product catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductListQuery {
    /// Search and active-flag filters.
    pub filter: ProductFilter,
    /// Name order.
    pub sort_dir: SortDirection,
    /// Page size.
    pub limit: usize,
    /// Rows to skip.
    pub offset: usize,
}

impl Default for ProductListQuery {
    fn default() -> Self {
        Self {
            filter: ProductFilter::default(),
            sort_dir: SortDirection::Asc,
            limit: PRODUCT_PAGE_MAX,
            offset: 0,
        }
    }
}

/// Application service for products and their membership lists.
#[derive(Clone)]
pub struct ProductService {
    product_repository: Arc<dyn ProductRepository>,
    user_repository: Arc<dyn UserRepository>,
    authorization_service: AuthorizationService,
    identity_service: IdentityService,
}

impl ProductService {
    /// Creates a new product service.
    #[must_use]
    pub fn new(
        product_repository: Arc<dyn ProductRepository>,
        user_repository: Arc<dyn UserRepository>,
        authorization_service: AuthorizationService,
        identity_service: IdentityService,
    ) -> Self {
        Self {
            product_repository,
            user_repository,
            authorization_service,
            identity_service,
        }
    }

    /// Creates a product. Administrators only.
    pub async fn create_product(&self, actor: &Actor, input: NewProduct) -> AppResult<Product> {
        let decision = self
            .authorization_service
            .require(actor, Action::Create, &ResourceTarget::product_collection())
            .await?;

        let now = Utc::now();
        let product = Product {
            id: ProductId::new(),
            name: input.name().to_owned(),
            description: input.description().map(ToOwned::to_owned),
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        let audit = NewAuditEntry::mutation(
            actor.user_id(),
            AuditAction::ProductCreated,
            ResourceKind::Product,
            product.id.as_uuid(),
            decision,
        )
        .with_detail(json!({ "name": product.name }));

        let committed = self
            .product_repository
            .create_product(product, audit)
            .await?;

        info!(
            actor_id = %actor.user_id(),
            product_id = %committed.value.id,
            audit_sequence = committed.audit_sequence,
            "product created"
        );

        Ok(committed.value)
    }

    /// Lists one page of the products the actor may read.
    ///
    /// One collection read is audited; products are then filtered by the
    /// per-product policy, so `total` counts only readable products.
    pub async fn list_products(
        &self,
        actor: &Actor,
        query: ProductListQuery,
    ) -> AppResult<Page<Product>> {
        self.authorization_service
            .require_read(actor, &ResourceTarget::product_collection())
            .await?;

        let filter = ProductFilter {
            search: query
                .filter
                .search
                .map(|search| search.trim().to_owned())
                .filter(|search| !search.is_empty()),
            is_active: query.filter.is_active,
        };
        let mut readable: Vec<Product> = self
            .product_repository
            .list_products(&filter)
            .await?
            .into_iter()
            .filter(|product| {
                self.authorization_service
                    .decide(actor, Action::Read, &ResourceTarget::product(product.id))
                    .is_allowed()
            })
            .collect();
        if query.sort_dir == SortDirection::Desc {
            readable.reverse();
        }

        Ok(Page::window(
            readable,
            query.offset,
            query.limit.clamp(1, PRODUCT_PAGE_MAX),
        ))
    }

    /// Returns one live product.
    pub async fn get_product(&self, actor: &Actor, product_id: ProductId) -> AppResult<Product> {
        let product = self.load_live_product(product_id).await?;
        self.authorization_service
            .require_read(actor, &ResourceTarget::product(product_id))
            .await?;

        Ok(product)
    }

    /// Applies a partial update. Administrators only.
    pub async fn update_product(
        &self,
        actor: &Actor,
        product_id: ProductId,
        changes: ProductChanges,
    ) -> AppResult<Product> {
        self.load_live_product(product_id).await?;
        let decision = self
            .authorization_service
            .require(actor, Action::Update, &ResourceTarget::product(product_id))
            .await?;

        let changes = normalize_changes(changes)?;
        let audit = NewAuditEntry::mutation(
            actor.user_id(),
            AuditAction::ProductUpdated,
            ResourceKind::Product,
            product_id.as_uuid(),
            decision,
        )
        .with_detail(json!({ "fields": changed_fields(&changes) }));

        let committed = self
            .product_repository
            .update_product(product_id, changes, audit)
            .await?;

        info!(
            actor_id = %actor.user_id(),
            product_id = %product_id,
            audit_sequence = committed.audit_sequence,
            "product updated"
        );

        Ok(committed.value)
    }

    /// Soft-deletes a product that has no open bugs. Administrators only.
    pub async fn delete_product(&self, actor: &Actor, product_id: ProductId) -> AppResult<()> {
        self.load_live_product(product_id).await?;
        let decision = self
            .authorization_service
            .require(actor, Action::Delete, &ResourceTarget::product(product_id))
            .await?;

        let audit = NewAuditEntry::mutation(
            actor.user_id(),
            AuditAction::ProductDeleted,
            ResourceKind::Product,
            product_id.as_uuid(),
            decision,
        );
        let committed = self
            .product_repository
            .soft_delete_product(product_id, audit)
            .await?;

        info!(
            actor_id = %actor.user_id(),
            product_id = %product_id,
            audit_sequence = committed.audit_sequence,
            "product deleted"
        );

        Ok(())
    }

    /// Lists the members of a product. Readable by anyone who can read the product.
    pub async fn list_members(
        &self,
        actor: &Actor,
        product_id: ProductId,
    ) -> AppResult<Vec<ProductMember>> {
        self.load_live_product(product_id).await?;
        self.authorization_service
            .require_read(actor, &ResourceTarget::product(product_id))
            .await?;

        self.product_repository.list_members(product_id).await
    }

    /// Adds a member or changes the member's role override.
    pub async fn set_member(
        &self,
        actor: &Actor,
        product_id: ProductId,
        user_id: UserId,
        role_override: Option<Role>,
    ) -> AppResult<ProductMembership> {
        self.load_live_product(product_id).await?;
        let decision = self
            .authorization_service
            .require(actor, Action::ManageMembers, &ResourceTarget::product(product_id))
            .await?;

        if self.user_repository.find_user(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("user '{user_id}' not found")));
        }

        let audit = NewAuditEntry::mutation(
            actor.user_id(),
            AuditAction::ProductMemberSet,
            ResourceKind::Product,
            product_id.as_uuid(),
            decision,
        )
        .with_detail(json!({
            "user_id": user_id,
            "role_override": role_override.map(|role| role.as_str()),
        }));

        let committed = self
            .product_repository
            .set_member(product_id, user_id, role_override, audit)
            .await?;
        self.identity_service.invalidate_actor(user_id).await;

        info!(
            actor_id = %actor.user_id(),
            product_id = %product_id,
            user_id = %user_id,
            audit_sequence = committed.audit_sequence,
            "product member set"
        );

        Ok(committed.value)
    }

    /// Removes a member from a product.
    pub async fn remove_member(
        &self,
        actor: &Actor,
        product_id: ProductId,
        user_id: UserId,
    ) -> AppResult<()> {
        self.load_live_product(product_id).await?;
        let decision = self
            .authorization_service
            .require(actor, Action::ManageMembers, &ResourceTarget::product(product_id))
            .await?;

        let audit = NewAuditEntry::mutation(
            actor.user_id(),
            AuditAction::ProductMemberRemoved,
            ResourceKind::Product,
            product_id.as_uuid(),
            decision,
        )
        .with_detail(json!({ "user_id": user_id }));

        let committed = self
            .product_repository
            .remove_member(product_id, user_id, audit)
            .await?;
        self.identity_service.invalidate_actor(user_id).await;

        info!(
            actor_id = %actor.user_id(),
            product_id = %product_id,
            user_id = %user_id,
            audit_sequence = committed.audit_sequence,
            "product member removed"
        );

        Ok(())
    }

    async fn load_live_product(&self, product_id: ProductId) -> AppResult<Product> {
        self.product_repository
            .find_product(product_id)
            .await?
            .filter(|product| !product.is_deleted)
            .ok_or_else(|| AppError::NotFound(format!("product '{product_id}' not found")))
    }
}

fn normalize_changes(changes: ProductChanges) -> AppResult<ProductChanges> {
    if changes == ProductChanges::default() {
        return Err(AppError::Validation(
            "product update must change at least one field".to_owned(),
        ));
    }

    let name = changes
        .name
        .map(|name| NewProduct::new(name, None).map(|validated| validated.name().to_owned()))
        .transpose()?;
    let description = changes.description.map(|description| {
        description
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    });

    Ok(ProductChanges {
        name,
        description,
        is_active: changes.is_active,
    })
}

fn changed_fields(changes: &ProductChanges) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if changes.name.is_some() {
        fields.push("name");
    }
    if changes.description.is_some() {
        fields.push("description");
    }
    if changes.is_active.is_some() {
        fields.push("is_active");
    }
    fields
}
