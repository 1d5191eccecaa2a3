use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::auth::{authenticate, hash_password};
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::model::{
    AdminSummary, CreatedBody, Credentials, DataBody, NewAdmin, NewAdminRow, OkBody,
};
use crate::policy::{permit, Principal, PrincipalError, Role};
use crate::scope::{parse_scope, Scope};
use crate::validate::ValidatedForm;
use crate::{store, ADMIN_TAG};

pub fn auth_router() -> OpenApiRouter<crate::State> {
    OpenApiRouter::new()
        .routes(routes!(login))
        .routes(routes!(logout))
        .routes(routes!(me))
}

/// Only super admins manage admin accounts.
pub fn admin_router() -> OpenApiRouter<crate::State> {
    OpenApiRouter::new().routes(routes!(list_admins, create_admin))
}

/// Get bearer token
#[utoipa::path(
    post,
    path = "/login",
    request_body = Credentials,
    responses(
        (status = OK, body = AuthBody),
        (status = BAD_REQUEST, description = "Email and password required"),
        (status = UNAUTHORIZED, description = "Invalid credentials")
    ),
    tag = ADMIN_TAG
)]
async fn login(
    State(crate::State {
        pool,
        keys,
        token_ttl_hours,
        ..
    }): State<crate::State>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> Result<Json<AuthBody>, ApiError> {
    let (Some(email), Some(password)) = (
        credentials.email.filter(|v| !v.is_empty()),
        credentials.password.filter(|v| !v.is_empty()),
    ) else {
        return Err(ApiError::MissingCredentials);
    };

    let mut conn = pool.get().await.map_err(|_| ApiError::DBConnection)?;
    let admin = store::find_admin_by_email(&mut conn, &email).await?;
    let admin = authenticate(admin, &password).ok_or(ApiError::WrongCredentials)?;

    let access_token = keys.issue(&admin, token_ttl_hours)?;
    tracing::info!("admin {} logged in", admin.id);

    Ok(Json(AuthBody {
        access_token,
        token_type: "Bearer".to_string(),
        admin: admin.into(),
    }))
}

/// End the session
///
/// Tokens are stateless, so the client discards its own copy.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = OK, body = OkBody)),
    tag = ADMIN_TAG,
    security(("admin_jwt" = []))
)]
async fn logout(principal: Principal) -> Json<OkBody> {
    tracing::info!("admin {} logged out", principal.admin_id());
    Json(OkBody { ok: true })
}

/// Current admin
#[utoipa::path(
    get,
    path = "/me",
    responses((status = OK, body = AdminSummary)),
    tag = ADMIN_TAG,
    security(("admin_jwt" = []))
)]
async fn me(
    principal: Principal,
    State(crate::State { pool, .. }): State<crate::State>,
) -> Result<Json<AdminSummary>, ApiError> {
    let mut conn = pool.get().await.map_err(|_| ApiError::DBConnection)?;
    let admin = store::find_admin(&mut conn, principal.admin_id())
        .await?
        .ok_or(ApiError::Unauthorized)?;
    Ok(Json(admin.into()))
}

/// List admins
#[utoipa::path(
    get,
    path = "/admins",
    responses((status = OK, body = DataBody<AdminSummary>)),
    tag = ADMIN_TAG,
    security(("admin_jwt" = []))
)]
async fn list_admins(
    principal: Principal,
    State(crate::State { pool, enforcer, .. }): State<crate::State>,
) -> Result<Json<DataBody<AdminSummary>>, ApiError> {
    permit(&enforcer, &principal, "admin", "read")?;
    let mut conn = pool.get().await.map_err(|_| ApiError::DBConnection)?;
    let data = store::list_admins(&mut conn).await?;
    Ok(Json(DataBody { data }))
}

/// Create admin
#[utoipa::path(
    post,
    path = "/admins",
    request_body = NewAdmin,
    responses(
        (status = CREATED, body = CreatedBody),
        (status = BAD_REQUEST, description = "Missing or inconsistent fields"),
        (status = CONFLICT, description = "Email already registered")
    ),
    tag = ADMIN_TAG,
    security(("admin_jwt" = []))
)]
async fn create_admin(
    principal: Principal,
    State(crate::State { pool, enforcer, .. }): State<crate::State>,
    JsonBody(ValidatedForm(admin)): JsonBody<ValidatedForm<NewAdmin>>,
) -> Result<(StatusCode, Json<CreatedBody>), ApiError> {
    permit(&enforcer, &principal, "admin", "create")?;
    let candidate = check_new_admin(admin)?;

    let mut conn = pool.get().await.map_err(|_| ApiError::DBConnection)?;
    if let (Role::Dept, Some(department_id)) = (candidate.role, &candidate.department) {
        let offered = store::find_department(&mut conn, department_id)
            .await?
            .is_some_and(|department| {
                candidate
                    .scope
                    .parse::<Scope>()
                    .is_ok_and(|scope| department.offers(scope))
            });
        if !offered {
            return Err(ApiError::BadRequest(
                "Department does not offer the requested scope",
            ));
        }
    }
    if store::find_admin_by_email(&mut conn, &candidate.email)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict);
    }

    let row = NewAdminRow {
        password_hash: hash_password(&candidate.password)?,
        email: candidate.email,
        role: candidate.role.as_str().to_owned(),
        scope: candidate.scope,
        department: candidate.department,
        created_at: Utc::now().naive_utc(),
    };
    let id = store::insert_admin(&mut conn, &row)
        .await
        .map_err(duplicate_email)?;
    tracing::info!(
        "admin {} created {} admin {}",
        principal.admin_id(),
        row.role,
        id
    );
    Ok((StatusCode::CREATED, Json(CreatedBody { id })))
}

/// A concurrent create can pass the lookup above and still lose on the
/// unique email index.
fn duplicate_email(error: DieselError) -> ApiError {
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => ApiError::Conflict,
        other => ApiError::Database(other),
    }
}

#[derive(Debug, PartialEq)]
struct AdminCandidate {
    email: String,
    password: String,
    role: Role,
    scope: String,
    department: Option<String>,
}

/// Field rules for a new admin that need no database access.
fn check_new_admin(admin: NewAdmin) -> Result<AdminCandidate, ApiError> {
    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
    let (Some(email), Some(password), Some(role), Some(scope)) = (
        non_empty(admin.email),
        non_empty(admin.password),
        non_empty(admin.role),
        non_empty(admin.scope),
    ) else {
        return Err(ApiError::BadRequest("Missing required fields"));
    };
    let scope = parse_scope(Some(scope.as_str())).ok_or(ApiError::BadRequest("Invalid scope"))?;
    let role: Role = role
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid role"))?;
    let department = non_empty(admin.department);

    // Same invariants the principal is later rebuilt under.
    Principal::new(0, role, Some(scope), department.as_deref()).map_err(|e| match e {
        PrincipalError::GeneralScope => {
            ApiError::BadRequest("General admin must use GENERAL scope")
        }
        PrincipalError::DeptScope => {
            ApiError::BadRequest("Department admin must use UG/PG with department")
        }
        PrincipalError::UnknownRole(_) => ApiError::BadRequest("Invalid role"),
    })?;

    Ok(AdminCandidate {
        email,
        password,
        role,
        scope: scope.as_str().to_owned(),
        department: department.filter(|_| role == Role::Dept),
    })
}

#[derive(Debug, ToSchema, Serialize)]
struct AuthBody {
    access_token: String,
    token_type: String,
    admin: AdminSummary,
}
