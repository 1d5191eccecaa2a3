//! Queries over the facility, admin and department tables.

use chrono::Utc;
use diesel::dsl::insert_into;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, QueryResult, SelectableHelper};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::model::{
    Admin, AdminSummary, Department, Facility, FacilityChanges, FacilityFilters, NewAdminRow,
};
use crate::schema::{admins, departments, infrastructure};

/// Facilities matching every given filter, newest first.
pub async fn list_facilities(
    conn: &mut AsyncPgConnection,
    filters: &FacilityFilters,
) -> QueryResult<Vec<Facility>> {
    let mut query = infrastructure::table
        .select(Facility::as_select())
        .into_boxed();
    if let Some(scope) = &filters.scope {
        query = query.filter(infrastructure::scope.eq(scope.clone()));
    }
    if let Some(category) = &filters.category {
        query = query.filter(infrastructure::category.eq(category.clone()));
    }
    if let Some(department) = &filters.department {
        query = query.filter(infrastructure::department.eq(department.clone()));
    }
    if let Some(bookable) = filters.bookable {
        query = query.filter(infrastructure::bookable.eq(bookable));
    }
    if let Some(status) = &filters.status {
        query = query.filter(infrastructure::status.eq(status.clone()));
    }
    query
        .order(infrastructure::id.desc())
        .load::<Facility>(conn)
        .await
}

pub async fn find_facility(
    conn: &mut AsyncPgConnection,
    id: i32,
) -> QueryResult<Option<Facility>> {
    infrastructure::table
        .find(id)
        .select(Facility::as_select())
        .first::<Facility>(conn)
        .await
        .optional()
}

pub async fn insert_facility(
    conn: &mut AsyncPgConnection,
    changes: &FacilityChanges,
) -> QueryResult<i32> {
    let now = Utc::now().naive_utc();
    insert_into(infrastructure::table)
        .values((
            changes,
            infrastructure::created_at.eq(now),
            infrastructure::updated_at.eq(now),
        ))
        .returning(infrastructure::id)
        .get_result::<i32>(conn)
        .await
}

/// Replaces every mutable column; returns the number of rows touched.
pub async fn update_facility(
    conn: &mut AsyncPgConnection,
    id: i32,
    changes: &FacilityChanges,
) -> QueryResult<usize> {
    diesel::update(infrastructure::table.find(id))
        .set((changes, infrastructure::updated_at.eq(Utc::now().naive_utc())))
        .execute(conn)
        .await
}

pub async fn delete_facility(conn: &mut AsyncPgConnection, id: i32) -> QueryResult<usize> {
    diesel::delete(infrastructure::table.find(id))
        .execute(conn)
        .await
}

pub async fn find_admin(conn: &mut AsyncPgConnection, id: i32) -> QueryResult<Option<Admin>> {
    admins::table
        .find(id)
        .select(Admin::as_select())
        .first::<Admin>(conn)
        .await
        .optional()
}

pub async fn find_admin_by_email(
    conn: &mut AsyncPgConnection,
    email: &str,
) -> QueryResult<Option<Admin>> {
    admins::table
        .filter(admins::email.eq(email))
        .select(Admin::as_select())
        .first::<Admin>(conn)
        .await
        .optional()
}

pub async fn list_admins(conn: &mut AsyncPgConnection) -> QueryResult<Vec<AdminSummary>> {
    admins::table
        .select(AdminSummary::as_select())
        .order(admins::id.asc())
        .load::<AdminSummary>(conn)
        .await
}

pub async fn insert_admin(conn: &mut AsyncPgConnection, admin: &NewAdminRow) -> QueryResult<i32> {
    insert_into(admins::table)
        .values(admin)
        .returning(admins::id)
        .get_result::<i32>(conn)
        .await
}

pub async fn list_departments(conn: &mut AsyncPgConnection) -> QueryResult<Vec<Department>> {
    departments::table
        .select(Department::as_select())
        .order(departments::department_id.asc())
        .load::<Department>(conn)
        .await
}

pub async fn find_department(
    conn: &mut AsyncPgConnection,
    id: &str,
) -> QueryResult<Option<Department>> {
    departments::table
        .find(id)
        .select(Department::as_select())
        .first::<Department>(conn)
        .await
        .optional()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::model::FacilityPayload;
    use crate::validate::facility_violations;

    const CREATE_TABLES: &str =
        include_str!("../migrations/2024-11-20-000000_create_tables/up.sql");

    #[test]
    fn free_text_columns_have_no_length_cap() {
        assert!(!CREATE_TABLES.to_uppercase().contains("VARCHAR"));
        assert!(CREATE_TABLES.contains("name TEXT NOT NULL"));
        assert!(CREATE_TABLES.contains("department TEXT,"));
    }

    #[test]
    fn long_valid_values_survive_canonicalization() {
        let name = "Lab ".repeat(80);
        let payload: FacilityPayload = serde_json::from_value(json!({
            "name": name.clone(),
            "scope": "UG",
            "department": "Computer Science Dept",
            "bookable": true,
            "status": "AVAILABLE"
        }))
        .unwrap();
        assert!(facility_violations(&payload).is_empty());
        let changes = payload.into_changes();
        assert_eq!(changes.name, name.trim());
        assert!(changes.name.len() > 255);
        assert_eq!(changes.department.as_deref(), Some("Computer Science Dept"));
    }
}
