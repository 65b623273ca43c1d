use bugzot_application::{
    PRODUCT_PAGE_MAX, ProductChanges, ProductFilter, ProductListQuery, SortDirection,
};
use bugzot_domain::{NewProduct, ProductId, Role, UserId};

use super::*;
use crate::dto::{
    CreateProductRequest, MemberResponse, MembershipResponse, ProductPageResponse,
    ProductResponse, SetMemberRequest, UpdateProductRequest,
};

#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub sort_dir: Option<String>,
}

pub async fn list_products_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListProductsQuery>,
) -> ApiResult<Json<ProductPageResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, PRODUCT_PAGE_MAX);
    let offset = query.offset.unwrap_or(0);
    let list_query = ProductListQuery {
        filter: ProductFilter {
            search: query.search,
            is_active: query.is_active,
        },
        sort_dir: query
            .sort_dir
            .as_deref()
            .map(str::parse::<SortDirection>)
            .transpose()?
            .unwrap_or(SortDirection::Asc),
        limit,
        offset,
    };

    let page = state.product_service.list_products(&actor, list_query).await?;

    Ok(Json(ProductPageResponse::new(page, limit, offset)))
}

pub async fn create_product_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<ProductResponse>)> {
    let input = NewProduct::new(payload.name, payload.description)?;
    let product = state.product_service.create_product(&actor, input).await?;

    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

pub async fn get_product_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<ProductResponse>> {
    let product = state
        .product_service
        .get_product(&actor, product_id.parse::<ProductId>()?)
        .await?;

    Ok(Json(ProductResponse::from(product)))
}

pub async fn update_product_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(product_id): Path<String>,
    Json(payload): Json<UpdateProductRequest>,
) -> ApiResult<Json<ProductResponse>> {
    let product = state
        .product_service
        .update_product(
            &actor,
            product_id.parse::<ProductId>()?,
            ProductChanges {
                name: payload.name,
                description: payload.description,
                is_active: payload.is_active,
            },
        )
        .await?;

    Ok(Json(ProductResponse::from(product)))
}

pub async fn delete_product_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(product_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .product_service
        .delete_product(&actor, product_id.parse::<ProductId>()?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_members_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(product_id): Path<String>,
) -> ApiResult<Json<Vec<MemberResponse>>> {
    let members = state
        .product_service
        .list_members(&actor, product_id.parse::<ProductId>()?)
        .await?
        .into_iter()
        .map(MemberResponse::from)
        .collect();

    Ok(Json(members))
}

pub async fn set_member_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((product_id, user_id)): Path<(String, String)>,
    Json(payload): Json<SetMemberRequest>,
) -> ApiResult<Json<MembershipResponse>> {
    let role_override = payload
        .role_override
        .as_deref()
        .map(str::parse::<Role>)
        .transpose()?;

    let membership = state
        .product_service
        .set_member(
            &actor,
            product_id.parse::<ProductId>()?,
            user_id.parse::<UserId>()?,
            role_override,
        )
        .await?;

    Ok(Json(MembershipResponse::from(membership)))
}

pub async fn remove_member_handler(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((product_id, user_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .product_service
        .remove_member(
            &actor,
            product_id.parse::<ProductId>()?,
            user_id.parse::<UserId>()?,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
