use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::error::ApiError;
use crate::extract::{IdPath, JsonBody};
use crate::model::{
    CreatedBody, DataBody, Facility, FacilityFilters, FacilityPayload, FilterQuery, OkBody,
};
use crate::policy::{
    authorize_create, authorize_delete, authorize_update, permit, scoped_filters, Principal,
};
use crate::validate::facility_violations;
use crate::{store, FACILITY_TAG, PUBLIC_TAG};

/// Anonymous, unfiltered directory listing
pub fn public_router() -> OpenApiRouter<crate::State> {
    OpenApiRouter::new().routes(routes!(list_public))
}

pub fn admin_router() -> OpenApiRouter<crate::State> {
    OpenApiRouter::new()
        .routes(routes!(list_scoped, create_facility))
        .routes(routes!(update_facility, delete_facility))
}

/// List facilities
#[utoipa::path(
    get,
    path = "/infrastructure",
    responses((status = OK, body = DataBody<Facility>)),
    tag = PUBLIC_TAG,
    params(FilterQuery)
)]
async fn list_public(
    State(crate::State { pool, .. }): State<crate::State>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<DataBody<Facility>>, ApiError> {
    let mut conn = pool.get().await.map_err(|_| ApiError::DBConnection)?;
    let data = store::list_facilities(&mut conn, &FacilityFilters::from(query)).await?;
    Ok(Json(DataBody { data }))
}

/// List facilities visible to the admin
///
/// Scope and department filters are replaced by the admin's own for
/// general and department admins.
#[utoipa::path(
    get,
    path = "/infrastructure",
    responses((status = OK, body = DataBody<Facility>)),
    tag = FACILITY_TAG,
    params(FilterQuery),
    security(("admin_jwt" = []))
)]
async fn list_scoped(
    principal: Principal,
    State(crate::State { pool, enforcer, .. }): State<crate::State>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<DataBody<Facility>>, ApiError> {
    permit(&enforcer, &principal, "facility", "read")?;
    let filters = scoped_filters(&principal, FacilityFilters::from(query));
    let mut conn = pool.get().await.map_err(|_| ApiError::DBConnection)?;
    let data = store::list_facilities(&mut conn, &filters).await?;
    Ok(Json(DataBody { data }))
}

/// Create facility
#[utoipa::path(
    post,
    path = "/infrastructure",
    request_body = FacilityPayload,
    responses(
        (status = CREATED, body = CreatedBody),
        (status = BAD_REQUEST, description = "Validation failed"),
        (status = FORBIDDEN, description = "Outside the admin's scope")
    ),
    tag = FACILITY_TAG,
    security(("admin_jwt" = []))
)]
async fn create_facility(
    principal: Principal,
    State(crate::State { pool, enforcer, .. }): State<crate::State>,
    JsonBody(payload): JsonBody<FacilityPayload>,
) -> Result<(StatusCode, Json<CreatedBody>), ApiError> {
    permit(&enforcer, &principal, "facility", "create")?;
    let violations = facility_violations(&payload);
    if !violations.is_empty() {
        return Err(ApiError::Validation(violations));
    }
    let changes = payload.into_changes();
    authorize_create(&principal, &changes)?;

    let mut conn = pool.get().await.map_err(|_| ApiError::DBConnection)?;
    let id = store::insert_facility(&mut conn, &changes).await?;
    tracing::info!(
        "admin {} created facility {} ({})",
        principal.admin_id(),
        id,
        changes.name
    );
    Ok((StatusCode::CREATED, Json(CreatedBody { id })))
}

/// Replace facility
#[utoipa::path(
    put,
    path = "/infrastructure/{id}",
    request_body = FacilityPayload,
    responses(
        (status = OK, body = OkBody),
        (status = BAD_REQUEST, description = "Validation failed"),
        (status = NOT_FOUND, description = "No such facility"),
        (status = FORBIDDEN, description = "Outside the admin's scope")
    ),
    tag = FACILITY_TAG,
    params(("id" = i32, Path, description = "Facility database id")),
    security(("admin_jwt" = []))
)]
async fn update_facility(
    principal: Principal,
    State(crate::State { pool, enforcer, .. }): State<crate::State>,
    IdPath(id): IdPath<i32>,
    JsonBody(payload): JsonBody<FacilityPayload>,
) -> Result<Json<OkBody>, ApiError> {
    permit(&enforcer, &principal, "facility", "update")?;
    let violations = facility_violations(&payload);
    if !violations.is_empty() {
        return Err(ApiError::Validation(violations));
    }
    let changes = payload.into_changes();

    let mut conn = pool.get().await.map_err(|_| ApiError::DBConnection)?;
    let existing = store::find_facility(&mut conn, id).await?;
    authorize_update(&principal, existing.as_ref(), &changes)?;

    if store::update_facility(&mut conn, id, &changes).await? == 0 {
        return Err(ApiError::NotFound);
    }
    tracing::info!("admin {} updated facility {}", principal.admin_id(), id);
    Ok(Json(OkBody { ok: true }))
}

/// Delete facility
#[utoipa::path(
    delete,
    path = "/infrastructure/{id}",
    responses(
        (status = OK, body = OkBody),
        (status = NOT_FOUND, description = "No such facility"),
        (status = FORBIDDEN, description = "Outside the admin's scope")
    ),
    tag = FACILITY_TAG,
    params(("id" = i32, Path, description = "Facility database id")),
    security(("admin_jwt" = []))
)]
async fn delete_facility(
    principal: Principal,
    State(crate::State { pool, enforcer, .. }): State<crate::State>,
    IdPath(id): IdPath<i32>,
) -> Result<Json<OkBody>, ApiError> {
    permit(&enforcer, &principal, "facility", "delete")?;
    let mut conn = pool.get().await.map_err(|_| ApiError::DBConnection)?;
    let existing = store::find_facility(&mut conn, id).await?;
    authorize_delete(&principal, existing.as_ref())?;

    if store::delete_facility(&mut conn, id).await? == 0 {
        return Err(ApiError::NotFound);
    }
    tracing::info!("admin {} deleted facility {}", principal.admin_id(), id);
    Ok(Json(OkBody { ok: true }))
}
