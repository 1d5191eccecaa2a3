//! Bootstrap data loaded once at startup, before the server accepts requests.

use chrono::Utc;
use diesel::dsl::insert_into;
use diesel::{
    Connection, ExpressionMethods, OptionalExtension, PgConnection, QueryDsl, RunQueryDsl,
};
use serde_json::Value;

use crate::auth::hash_password;
use crate::model::{FacilityChanges, FacilityPayload, NewAdminRow};
use crate::reference::{category_for_type, departments, DEPARTMENTS};
use crate::schema::{admins, departments as departments_table, infrastructure, meta};
use crate::scope::Scope;
use crate::validate::facility_violations;

type SeedResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync + 'static>>;

/// Bumped whenever the reference data below changes; a mismatch reloads it.
pub const SEED_VERSION: &str = "campus_v2";

/// Creates the initial super admin when no admin exists yet.
pub fn seed_admin(conn: &mut PgConnection, email: &str, password: &str) -> SeedResult<bool> {
    let count: i64 = admins::table.count().get_result(conn)?;
    if count > 0 {
        return Ok(false);
    }
    let row = NewAdminRow {
        email: email.to_owned(),
        password_hash: hash_password(password)?,
        role: "super".to_owned(),
        scope: Scope::General.as_str().to_owned(),
        department: None,
        created_at: Utc::now().naive_utc(),
    };
    insert_into(admins::table).values(&row).execute(conn)?;
    Ok(true)
}

/// Replaces departments and facilities with the reference set unless the
/// stored seed version is current. Returns the number of facilities loaded.
pub fn seed_reference_data(conn: &mut PgConnection) -> SeedResult<usize> {
    let stored = meta::table
        .find("seed_version")
        .select(meta::value)
        .first::<String>(conn)
        .optional()?;
    if stored.as_deref() == Some(SEED_VERSION) {
        return Ok(0);
    }

    let items = facility_seed()?;
    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::delete(infrastructure::table).execute(conn)?;
        diesel::delete(departments_table::table).execute(conn)?;
        insert_into(departments_table::table)
            .values(&departments())
            .execute(conn)?;

        let now = Utc::now().naive_utc();
        for item in &items {
            insert_into(infrastructure::table)
                .values((
                    item,
                    infrastructure::created_at.eq(now),
                    infrastructure::updated_at.eq(now),
                ))
                .execute(conn)?;
        }

        insert_into(meta::table)
            .values((meta::key.eq("seed_version"), meta::value.eq(SEED_VERSION)))
            .on_conflict(meta::key)
            .do_update()
            .set(meta::value.eq(SEED_VERSION))
            .execute(conn)?;
        Ok(())
    })?;
    Ok(items.len())
}

/// A seeded facility. Facilities with opening hours are fixed-hours, the
/// rest are bookable.
fn item(name: String, kind: &str, status: &str, hours: Option<(&str, &str)>) -> FacilityPayload {
    let usage = match status {
        "IN_USE" => Some(("Scheduled Use", "10:00", "12:00")),
        "RESERVED" => Some(("Reserved", "14:00", "16:00")),
        _ => None,
    };
    FacilityPayload {
        name: Some(name),
        kind: Some(kind.to_owned()),
        bookable: Value::Bool(hours.is_none()),
        status: Some(status.to_owned()),
        used_by: usage.map(|u| u.0.to_owned()),
        from_time: usage.map(|u| u.1.to_owned()),
        to_time: usage.map(|u| u.2.to_owned()),
        open_time: hours.map(|h| h.0.to_owned()),
        close_time: hours.map(|h| h.1.to_owned()),
        ..Default::default()
    }
}

fn departmental(scope: Scope, department: &str, payload: FacilityPayload) -> FacilityPayload {
    FacilityPayload {
        scope: Some(scope.as_str().to_owned()),
        department: Some(department.to_owned()),
        ..payload
    }
}

fn shared(payload: FacilityPayload) -> FacilityPayload {
    let category = category_for_type(payload.kind.as_deref().unwrap_or_default());
    FacilityPayload {
        scope: Some(Scope::General.as_str().to_owned()),
        category: Some(category.to_owned()),
        ..payload
    }
}

const CLASS_HOURS: Option<(&str, &str)> = Some(("09:00", "17:00"));
const FACULTY_HOURS: Option<(&str, &str)> = Some(("09:00", "18:00"));
const ALL_DAY: Option<(&str, &str)> = Some(("00:00", "23:59"));

/// Departments whose UG facilities are listed individually instead of generated.
const DETAILED_UG: [&str; 2] = ["D01", "D03"];

fn detailed_ug() -> Vec<FacilityPayload> {
    let cs = [
        ("CS-CR-101", "Classroom", "OPEN", CLASS_HOURS),
        ("CS-CR-102", "Classroom", "OPEN", CLASS_HOURS),
        ("CS-LAB-01 Programming Lab", "Lab", "IN_USE", None),
        ("CS-LAB-02 Data Structures Lab", "Lab", "AVAILABLE", None),
        ("CS-LAB-03 DB & Web Lab", "Lab", "RESERVED", None),
        ("CS-LAB-04 AI ML Lab", "Lab", "AVAILABLE", None),
        ("CS-LAB-05 Project Lab", "Lab", "AVAILABLE", None),
        ("CS-SH-01 Seminar Hall", "Seminar Hall", "AVAILABLE", None),
        ("CS-FACULTY-ROOM", "Faculty Room", "OPEN", FACULTY_HOURS),
        ("CS-HOD", "HOD Cabin", "OPEN", Some(("10:00", "17:00"))),
    ];
    let ec = [
        ("EC-LAB-01 Basic Electronics Lab", "Lab", "IN_USE", None),
        ("EC-LAB-02 Analog Digital Lab", "Lab", "AVAILABLE", None),
        ("EC-LAB-03 Microprocessor Lab", "Lab", "RESERVED", None),
        ("EC-LAB-04 Communication Lab", "Lab", "AVAILABLE", None),
        ("EC-LAB-05 VLSI Lab", "Lab", "AVAILABLE", None),
        ("EC-SH-01 Seminar Hall", "Seminar Hall", "AVAILABLE", None),
        ("EC-FACULTY-ROOM", "Faculty Room", "OPEN", FACULTY_HOURS),
    ];
    let listed = |department: &str, rows: &[(&str, &str, &str, Option<(&str, &str)>)]| {
        rows.iter()
            .map(|&(name, kind, status, hours)| {
                departmental(Scope::Ug, department, item(name.to_owned(), kind, status, hours))
            })
            .collect::<Vec<_>>()
    };
    let mut items = listed("D01", &cs);
    items.extend(listed("D03", &ec));
    items
}

fn generated() -> Vec<FacilityPayload> {
    let mut items = Vec::new();
    for &(id, code, _, has_ug, _) in &DEPARTMENTS {
        if !has_ug || DETAILED_UG.contains(&id) {
            continue;
        }
        let rows = [
            ("UG-CR-101", "Classroom", "OPEN", CLASS_HOURS),
            ("UG-LAB-01", "Lab", "AVAILABLE", None),
            ("UG-LAB-02", "Lab", "IN_USE", None),
            ("UG-SEMINAR-HALL", "Seminar Hall", "AVAILABLE", None),
            ("UG-FACULTY-ROOM", "Faculty Room", "OPEN", FACULTY_HOURS),
        ];
        for (suffix, kind, status, hours) in rows {
            let name = format!("{code}-{suffix}");
            items.push(departmental(Scope::Ug, id, item(name, kind, status, hours)));
        }
    }
    for &(id, code, _, _, has_pg) in &DEPARTMENTS {
        if !has_pg {
            continue;
        }
        let rows = [
            ("PG-CR-501", "Classroom", "OPEN", CLASS_HOURS),
            ("PG-LAB-01", "Lab", "AVAILABLE", None),
            ("PG-RES-LAB", "Research Lab", "RESERVED", None),
            ("PG-SEMINAR-HALL", "Seminar Hall", "AVAILABLE", None),
        ];
        for (suffix, kind, status, hours) in rows {
            let name = format!("{code}-{suffix}");
            items.push(departmental(Scope::Pg, id, item(name, kind, status, hours)));
        }
    }
    items
}

fn campus_wide() -> Vec<FacilityPayload> {
    let office = Some(("10:00", "16:00"));
    let rows = [
        ("Main Auditorium", "Auditorium", "RESERVED", None),
        ("Mini Auditorium", "Auditorium", "AVAILABLE", None),
        ("Central Seminar Hall 1", "Seminar Hall", "IN_USE", None),
        ("Central Seminar Hall 2", "Seminar Hall", "AVAILABLE", None),
        ("Examination Hall", "Exam Hall", "CLOSED", None),
        ("Placement Conference Hall", "Conference Hall", "RESERVED", None),
        ("Central Library", "Library", "OPEN", Some(("08:00", "22:00"))),
        ("Digital Library", "Library", "OPEN", Some(("09:00", "20:00"))),
        ("Cricket Ground", "Ground", "IN_USE", None),
        ("Football Ground", "Ground", "AVAILABLE", None),
        ("Athletics Track", "Track", "AVAILABLE", None),
        ("Indoor Stadium", "Sports Hall", "RESERVED", None),
        ("Basketball Court", "Court", "AVAILABLE", None),
        ("Volleyball Court", "Court", "IN_USE", None),
        ("Gym", "Gym", "OPEN", Some(("06:00", "21:00"))),
        ("Boys Hostel", "Hostel", "OPEN", ALL_DAY),
        ("Girls Hostel", "Hostel", "OPEN", ALL_DAY),
        ("Food Court", "Food Court", "OPEN", Some(("08:00", "21:00"))),
        ("Canteen", "Canteen", "OPEN", FACULTY_HOURS),
        ("Medical Room", "Medical", "OPEN", Some(("10:00", "17:00"))),
        ("Counseling Room", "Counseling", "OPEN", office),
        ("Student Activity Center", "Student Activity Center", "OPEN", Some(("09:00", "20:00"))),
        ("Admin Block", "Office", "OPEN", CLASS_HOURS),
        ("Principal Office", "Office", "OPEN", office),
        ("Accounts Office", "Office", "OPEN", office),
        ("Admission Office", "Office", "OPEN", CLASS_HOURS),
        ("Registrar Office", "Office", "OPEN", office),
        ("Board Room", "Meeting Room", "CLOSED", None),
        ("Power House", "Utility", "OPEN", FACULTY_HOURS),
        ("Transport Office", "Transport", "OPEN", CLASS_HOURS),
        ("Security Control Room", "Security", "OPEN", ALL_DAY),
        ("Central Stores", "Stores", "OPEN", CLASS_HOURS),
    ];
    rows.into_iter()
        .map(|(name, kind, status, hours)| shared(item(name.to_owned(), kind, status, hours)))
        .collect()
}

/// The full facility reference set, validated like any admin write.
fn facility_seed() -> SeedResult<Vec<FacilityChanges>> {
    let mut payloads = detailed_ug();
    payloads.extend(generated());
    payloads.extend(campus_wide());

    payloads
        .into_iter()
        .map(|payload| {
            let violations = facility_violations(&payload);
            if violations.is_empty() {
                Ok(payload.into_changes())
            } else {
                let name = payload.name.unwrap_or_default();
                Err(format!("invalid seed facility {name}: {}", violations.join(", ")).into())
            }
        })
        .collect()
}
