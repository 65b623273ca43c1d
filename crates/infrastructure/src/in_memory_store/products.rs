use async_trait::async_trait;
use bugzot_application::{
    Committed, ProductChanges, ProductFilter, ProductMember, ProductRepository,
};

use super::*;

impl StoreState {
    fn live_product(&self, product_id: ProductId) -> AppResult<&Product> {
        self.products
            .get(&product_id)
            .filter(|product| !product.is_deleted)
            .ok_or_else(|| AppError::NotFound(format!("product '{product_id}' not found")))
    }

    fn ensure_name_available(&self, name: &str, except: Option<ProductId>) -> AppResult<()> {
        let taken = self.products.values().any(|product| {
            !product.is_deleted
                && Some(product.id) != except
                && product.name.to_lowercase() == name.to_lowercase()
        });
        if taken {
            return Err(AppError::Conflict(format!(
                "product name '{name}' is already taken"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn find_product(&self, product_id: ProductId) -> AppResult<Option<Product>> {
        Ok(self.state.read().await.products.get(&product_id).cloned())
    }

    async fn list_products(&self, filter: &ProductFilter) -> AppResult<Vec<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|product| !product.is_deleted && filter.matches(product))
            .cloned()
            .collect();
        products.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(products)
    }

    async fn create_product(
        &self,
        product: Product,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Product>> {
        let mut state = self.state.write().await;
        state.ensure_name_available(&product.name, None)?;

        let sequence = state.append_audit(self.audit_offline(), audit)?;
        state.products.insert(product.id, product.clone());
        Ok(Committed::new(product, sequence))
    }

    async fn update_product(
        &self,
        product_id: ProductId,
        changes: ProductChanges,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Product>> {
        let mut state = self.state.write().await;
        let mut product = state.live_product(product_id)?.clone();
        if let Some(name) = changes.name {
            state.ensure_name_available(&name, Some(product_id))?;
            product.name = name;
        }
        if let Some(description) = changes.description {
            product.description = description;
        }
        if let Some(is_active) = changes.is_active {
            product.is_active = is_active;
        }
        product.updated_at = Utc::now();

        let sequence = state.append_audit(self.audit_offline(), audit)?;
        state.products.insert(product_id, product.clone());
        Ok(Committed::new(product, sequence))
    }

    async fn soft_delete_product(
        &self,
        product_id: ProductId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<Product>> {
        let mut state = self.state.write().await;
        let mut product = state.live_product(product_id)?.clone();

        let open_bugs = state
            .bugs
            .values()
            .filter(|bug| bug.product_id == product_id && bug.status.is_open_work())
            .count();
        if open_bugs > 0 {
            return Err(AppError::Conflict(format!(
                "product '{product_id}' still has {open_bugs} bug(s) that are not closed"
            )));
        }

        product.is_deleted = true;
        product.is_active = false;
        product.updated_at = Utc::now();

        let sequence = state.append_audit(self.audit_offline(), audit)?;
        state.products.insert(product_id, product.clone());
        Ok(Committed::new(product, sequence))
    }

    async fn list_members(&self, product_id: ProductId) -> AppResult<Vec<ProductMember>> {
        let state = self.state.read().await;
        let mut members: Vec<ProductMember> = state
            .memberships
            .iter()
            .filter(|record| record.product_id == product_id)
            .filter_map(|record| {
                state.users.get(&record.user_id).map(|stored| ProductMember {
                    user_id: stored.user.id,
                    email: stored.user.email.as_str().to_owned(),
                    display_name: stored.user.display_name.clone(),
                    role: stored.user.role,
                    role_override: record.role_override,
                })
            })
            .collect();
        members.sort_by(|left, right| left.email.cmp(&right.email));
        Ok(members)
    }

    async fn set_member(
        &self,
        product_id: ProductId,
        user_id: UserId,
        role_override: Option<Role>,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<ProductMembership>> {
        let mut state = self.state.write().await;
        if !state.products.contains_key(&product_id) || !state.users.contains_key(&user_id) {
            return Err(AppError::NotFound(
                "set product member: referenced record does not exist".to_owned(),
            ));
        }

        let sequence = state.append_audit(self.audit_offline(), audit)?;
        let existing = state
            .memberships
            .iter()
            .position(|record| record.product_id == product_id && record.user_id == user_id);
        match existing {
            Some(position) => state.memberships[position].role_override = role_override,
            None => state.memberships.push(MembershipRecord {
                product_id,
                user_id,
                role_override,
            }),
        }

        Ok(Committed::new(
            ProductMembership {
                product_id,
                role_override,
            },
            sequence,
        ))
    }

    async fn remove_member(
        &self,
        product_id: ProductId,
        user_id: UserId,
        audit: NewAuditEntry,
    ) -> AppResult<Committed<()>> {
        let mut state = self.state.write().await;
        let position = state
            .memberships
            .iter()
            .position(|record| record.product_id == product_id && record.user_id == user_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "user '{user_id}' is not a member of product '{product_id}'"
                ))
            })?;

        let sequence = state.append_audit(self.audit_offline(), audit)?;
        state.memberships.remove(position);
        Ok(Committed::new((), sequence))
    }
}
