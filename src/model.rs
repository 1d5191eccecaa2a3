use crate::schema::{admins, departments, infrastructure};
use crate::scope::{normalize_scope, Scope};
use chrono::NaiveDateTime;
use diesel::{pg::Pg, AsChangeset, Insertable, Queryable, Selectable};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

pub const BOOKABLE_STATUSES: [&str; 4] = ["AVAILABLE", "RESERVED", "IN_USE", "CLOSED"];
pub const NON_BOOKABLE_STATUSES: [&str; 2] = ["OPEN", "CLOSED"];
/// Statuses in which a bookable facility carries `used_by` and a time window.
pub const ACTIVE_USE_STATUSES: [&str; 2] = ["RESERVED", "IN_USE"];

#[derive(ToSchema, Serialize, Selectable, Queryable, Debug, Clone, PartialEq)]
#[diesel(table_name = infrastructure)]
#[diesel(check_for_backend(Pg))]
pub struct Facility {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub scope: String,
    pub department: Option<String>,
    pub category: Option<String>,
    pub bookable: bool,
    pub status: String,
    pub used_by: Option<String>,
    pub from_time: Option<String>,
    pub to_time: Option<String>,
    pub open_time: Option<String>,
    pub close_time: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Facility body as sent by admin clients.
///
/// Every field is optional and loosely typed so that malformed input reaches
/// the validator and is reported as a violation instead of a parse error.
#[derive(ToSchema, Deserialize, Debug, Default, Clone)]
pub struct FacilityPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub scope: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    /// Any truthy JSON value counts as `true`.
    #[serde(default)]
    #[schema(value_type = Option<bool>)]
    pub bookable: Value,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub used_by: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub from_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub to_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub open_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub close_time: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

/// Boolean coercion for the `bookable` flag: `null`, `false`, `0` and `""`
/// are false, everything else is true.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// `Some` only for non-empty strings.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl FacilityPayload {
    pub fn is_bookable(&self) -> bool {
        truthy(&self.bookable)
    }

    pub fn normalized_scope(&self) -> Option<String> {
        normalize_scope(self.scope.as_deref())
    }

    /// Builds the stored shape of a validated payload.
    ///
    /// Only the field group selected by `bookable` (and scope) survives; the
    /// other group is written as NULL.
    pub fn into_changes(self) -> FacilityChanges {
        let scope = self.normalized_scope().unwrap_or_default();
        let departmental = scope
            .parse::<Scope>()
            .map(|s| s.is_departmental())
            .unwrap_or(false);
        let bookable = self.is_bookable();
        let status = self.status.clone().unwrap_or_default();
        let in_use = bookable && ACTIVE_USE_STATUSES.contains(&status.as_str());
        let keep = |value: &Option<String>, when: bool| {
            if when {
                present(value).map(str::to_owned)
            } else {
                None
            }
        };

        FacilityChanges {
            name: self.name.clone().unwrap_or_default().trim().to_owned(),
            kind: keep(&self.kind, true),
            department: keep(&self.department, departmental),
            category: keep(&self.category, scope == Scope::General.as_str()),
            scope,
            bookable,
            status,
            used_by: keep(&self.used_by, in_use),
            from_time: keep(&self.from_time, in_use),
            to_time: keep(&self.to_time, in_use),
            open_time: keep(&self.open_time, !bookable),
            close_time: keep(&self.close_time, !bookable),
        }
    }
}

/// Every mutable column of a facility. Updates replace all of them.
#[derive(Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = infrastructure)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(Pg))]
pub struct FacilityChanges {
    pub name: String,
    pub kind: Option<String>,
    pub scope: String,
    pub department: Option<String>,
    pub category: Option<String>,
    pub bookable: bool,
    pub status: String,
    pub used_by: Option<String>,
    pub from_time: Option<String>,
    pub to_time: Option<String>,
    pub open_time: Option<String>,
    pub close_time: Option<String>,
}

/// Conjunction of equality constraints over the facility table.
#[derive(ToSchema, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct FacilityFilters {
    pub scope: Option<String>,
    pub category: Option<String>,
    pub department: Option<String>,
    pub status: Option<String>,
    pub bookable: Option<bool>,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct FilterQuery {
    /// GENERAL, UG or PG (case-insensitive)
    pub scope: Option<String>,
    pub category: Option<String>,
    /// Department id, e.g. D01
    pub department: Option<String>,
    pub status: Option<String>,
    /// `true` selects bookable facilities, any other value non-bookable ones
    pub bookable: Option<String>,
}

impl From<FilterQuery> for FacilityFilters {
    fn from(query: FilterQuery) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        Self {
            scope: normalize_scope(query.scope.as_deref()),
            category: non_empty(query.category),
            department: non_empty(query.department),
            status: non_empty(query.status),
            bookable: query.bookable.map(|b| b == "true"),
        }
    }
}

#[derive(Selectable, Queryable, Debug, Clone)]
#[diesel(table_name = admins)]
#[diesel(check_for_backend(Pg))]
pub struct Admin {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub scope: String,
    pub department: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Admin as exposed over the API, without the password hash.
#[derive(ToSchema, Serialize, Selectable, Queryable, Debug, Clone)]
#[diesel(table_name = admins)]
#[diesel(check_for_backend(Pg))]
pub struct AdminSummary {
    pub id: i32,
    pub email: String,
    pub role: String,
    pub scope: String,
    pub department: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<Admin> for AdminSummary {
    fn from(admin: Admin) -> Self {
        Self {
            id: admin.id,
            email: admin.email,
            role: admin.role,
            scope: admin.scope,
            department: admin.department,
            created_at: admin.created_at,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = admins)]
#[diesel(check_for_backend(Pg))]
pub struct NewAdminRow {
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub scope: String,
    pub department: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Deserialize, ToSchema, Debug, Default, Validate)]
pub struct NewAdmin {
    #[serde(default)]
    #[validate(email(message = "Invalid email"))]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Selectable, Queryable, Insertable, Debug, Clone)]
#[diesel(table_name = departments)]
#[diesel(check_for_backend(Pg))]
pub struct Department {
    pub department_id: String,
    pub name: String,
    pub has_ug: bool,
    pub has_pg: bool,
}

impl Department {
    pub fn offers(&self, scope: Scope) -> bool {
        match scope {
            Scope::Ug => self.has_ug,
            Scope::Pg => self.has_pg,
            Scope::General => false,
        }
    }
}

#[derive(ToSchema, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct DataBody<T> {
    pub data: Vec<T>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct CreatedBody {
    pub id: i32,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct OkBody {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> FacilityPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn truthiness_follows_loose_boolean_rules() {
        assert!(!truthy(&json!(null)));
        assert!(!truthy(&json!(false)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(truthy(&json!(true)));
        assert!(truthy(&json!(1)));
        assert!(truthy(&json!("false")));
        assert!(truthy(&json!([])));
        assert!(truthy(&json!({})));
    }

    #[test]
    fn malformed_fields_deserialize_without_error() {
        let p = payload(json!({ "name": 42, "scope": ["UG"], "bookable": "yes" }));
        assert_eq!(p.name.as_deref(), Some("42"));
        assert_eq!(p.scope, None);
        assert!(p.is_bookable());
    }

    #[test]
    fn changes_keep_only_bookable_group() {
        let changes = payload(json!({
            "name": " CS-LAB-01 ",
            "type": "Lab",
            "scope": "ug",
            "department": "D01",
            "category": "Academic",
            "bookable": 1,
            "status": "IN_USE",
            "used_by": "Batch A",
            "from_time": "10:00",
            "to_time": "12:00",
            "open_time": "09:00",
            "close_time": "17:00"
        }))
        .into_changes();

        assert_eq!(changes.name, "CS-LAB-01");
        assert_eq!(changes.scope, "UG");
        assert_eq!(changes.department.as_deref(), Some("D01"));
        assert_eq!(changes.category, None);
        assert!(changes.bookable);
        assert_eq!(changes.used_by.as_deref(), Some("Batch A"));
        assert_eq!(changes.open_time, None);
        assert_eq!(changes.close_time, None);
    }

    #[test]
    fn changes_drop_usage_outside_active_statuses() {
        let changes = payload(json!({
            "name": "Main Auditorium",
            "scope": "GENERAL",
            "category": "Academic",
            "department": "D01",
            "bookable": true,
            "status": "AVAILABLE",
            "used_by": "Stale",
            "from_time": ""
        }))
        .into_changes();

        assert_eq!(changes.department, None);
        assert_eq!(changes.category.as_deref(), Some("Academic"));
        assert_eq!(changes.used_by, None);
        assert_eq!(changes.from_time, None);
    }

    #[test]
    fn changes_keep_hours_for_fixed_facilities() {
        let changes = payload(json!({
            "name": "Central Library",
            "scope": "GENERAL",
            "category": "Student Facilities",
            "bookable": false,
            "status": "OPEN",
            "used_by": "ignored",
            "open_time": "08:00",
            "close_time": "22:00"
        }))
        .into_changes();

        assert_eq!(changes.used_by, None);
        assert_eq!(changes.open_time.as_deref(), Some("08:00"));
        assert_eq!(changes.close_time.as_deref(), Some("22:00"));
    }

    #[test]
    fn filter_query_parsing() {
        let filters = FacilityFilters::from(FilterQuery {
            scope: Some("pg".into()),
            category: Some(String::new()),
            department: Some("D03".into()),
            status: None,
            bookable: Some("yes".into()),
        });
        assert_eq!(
            filters,
            FacilityFilters {
                scope: Some("PG".into()),
                category: None,
                department: Some("D03".into()),
                status: None,
                bookable: Some(false),
            }
        );

        let filters = FacilityFilters::from(FilterQuery {
            bookable: Some("true".into()),
            ..Default::default()
        });
        assert_eq!(filters.bookable, Some(true));
        assert_eq!(filters.scope, None);
    }

    #[test]
    fn department_offers_scopes_by_flag() {
        let mca = Department {
            department_id: "D11".into(),
            name: "MCA Department".into(),
            has_ug: false,
            has_pg: true,
        };
        assert!(mca.offers(Scope::Pg));
        assert!(!mca.offers(Scope::Ug));
        assert!(!mca.offers(Scope::General));
    }
}
