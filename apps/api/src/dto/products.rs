use bugzot_application::{Page, ProductMember};
use bugzot_domain::{Product, ProductMembership};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::double_option;

/// One page of the product catalogue.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/product-page-response.ts"
)]
pub struct ProductPageResponse {
    pub data: Vec<ProductResponse>,
    #[ts(type = "number")]
    pub total: u64,
    #[ts(type = "number")]
    pub limit: usize,
    #[ts(type = "number")]
    pub offset: usize,
}

impl ProductPageResponse {
    pub fn new(page: Page<Product>, limit: usize, offset: usize) -> Self {
        Self {
            data: page.items.into_iter().map(ProductResponse::from).collect(),
            total: page.total,
            limit,
            offset,
        }
    }
}

/// Incoming payload for product creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-product-request.ts"
)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Partial product update; `description: null` clears the description.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/update-product-request.ts"
)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[ts(type = "string | null | undefined")]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// API representation of a product.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/product-response.ts"
)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Product> for ProductResponse {
    fn from(value: Product) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            description: value.description,
            is_active: value.is_active,
            created_at: value.created_at.to_rfc3339(),
            updated_at: value.updated_at.to_rfc3339(),
        }
    }
}

/// Incoming payload for adding or changing a membership.
#[derive(Debug, Default, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/set-member-request.ts"
)]
pub struct SetMemberRequest {
    pub role_override: Option<String>,
}

/// A product membership as seen from the user.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/membership-response.ts"
)]
pub struct MembershipResponse {
    pub product_id: String,
    pub role_override: Option<String>,
}

impl From<ProductMembership> for MembershipResponse {
    fn from(value: ProductMembership) -> Self {
        Self {
            product_id: value.product_id.to_string(),
            role_override: value.role_override.map(|role| role.as_str().to_owned()),
        }
    }
}

/// A product membership as seen from the product.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/member-response.ts"
)]
pub struct MemberResponse {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub role_override: Option<String>,
}

impl From<ProductMember> for MemberResponse {
    fn from(value: ProductMember) -> Self {
        Self {
            user_id: value.user_id.to_string(),
            email: value.email,
            display_name: value.display_name,
            role: value.role.as_str().to_owned(),
            role_override: value.role_override.map(|role| role.as_str().to_owned()),
        }
    }
}
