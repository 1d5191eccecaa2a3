use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::error::ApiError;
use crate::model::{DataBody, Department};
use crate::{store, PUBLIC_TAG};

/// Categories a GENERAL facility may be filed under.
pub const CATEGORIES: [&str; 5] = [
    "Academic",
    "Sports & Fitness",
    "Student Facilities",
    "Administrative",
    "Campus Services",
];

/// `(id, code, name, has_ug, has_pg)`; the code prefixes generated facility names.
pub const DEPARTMENTS: [(&str, &str, &str, bool, bool); 11] = [
    ("D01", "CS", "Computer Science & Engineering", true, true),
    ("D02", "IS", "Information Science & Engineering", true, true),
    ("D03", "EC", "Electronics & Communication Engineering", true, true),
    ("D04", "EE", "Electrical & Electronics Engineering", true, true),
    ("D05", "ME", "Mechanical Engineering", true, true),
    ("D06", "CE", "Civil Engineering", true, true),
    ("D07", "CH", "Chemical Engineering", true, true),
    ("D08", "BT", "Biotechnology", true, true),
    ("D09", "AE", "Aerospace Engineering", true, false),
    ("D10", "IEM", "Industrial Engineering & Management", true, false),
    ("D11", "MCA", "MCA Department", false, true),
];

pub fn departments() -> Vec<Department> {
    DEPARTMENTS
        .iter()
        .map(|&(id, _, name, has_ug, has_pg)| Department {
            department_id: id.to_owned(),
            name: name.to_owned(),
            has_ug,
            has_pg,
        })
        .collect()
}

/// Category a shared facility is filed under, derived from its type label.
pub fn category_for_type(kind: &str) -> &'static str {
    let kind = kind.to_lowercase();
    let any = |needles: &[&str]| needles.iter().any(|n| kind.contains(n));
    if any(&[
        "library",
        "hostel",
        "canteen",
        "food",
        "medical",
        "student activity",
        "counseling",
    ]) {
        "Student Facilities"
    } else if any(&["ground", "sports", "court", "gym", "stadium", "track"]) {
        "Sports & Fitness"
    } else if any(&["office", "meeting", "board"]) {
        "Administrative"
    } else if any(&["power", "transport", "security", "stores", "maintenance"]) {
        "Campus Services"
    } else {
        "Academic"
    }
}

pub fn router() -> OpenApiRouter<crate::State> {
    OpenApiRouter::new()
        .routes(routes!(health))
        .routes(routes!(list_departments))
        .routes(routes!(list_categories))
}

/// Liveness check
#[utoipa::path(get, path = "/health", responses((status = OK, body = Value)), tag = PUBLIC_TAG)]
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// List departments
#[utoipa::path(
    get,
    path = "/departments",
    responses((status = OK, body = DataBody<Department>)),
    tag = PUBLIC_TAG
)]
async fn list_departments(
    State(crate::State { pool, .. }): State<crate::State>,
) -> Result<Json<DataBody<Department>>, ApiError> {
    let mut conn = pool.get().await.map_err(|_| ApiError::DBConnection)?;
    let data = store::list_departments(&mut conn).await?;
    Ok(Json(DataBody { data }))
}

#[derive(Debug, ToSchema, Serialize)]
struct CategoriesBody {
    data: Vec<String>,
}

/// List facility categories
#[utoipa::path(
    get,
    path = "/categories",
    responses((status = OK, body = CategoriesBody)),
    tag = PUBLIC_TAG
)]
async fn list_categories() -> Json<CategoriesBody> {
    Json(CategoriesBody {
        data: CATEGORIES.iter().map(|c| c.to_string()).collect(),
    })
}
