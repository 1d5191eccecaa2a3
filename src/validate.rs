use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use validator::Validate;

use crate::model::{
    present, FacilityPayload, ACTIVE_USE_STATUSES, BOOKABLE_STATUSES, NON_BOOKABLE_STATUSES,
};
use crate::scope::Scope;

/// Request body that has passed its `validator` rules during deserialization.
#[derive(Debug)]
pub struct ValidatedForm<T>(pub T);

impl<'de, T> Deserialize<'de> for ValidatedForm<T>
where
    T: DeserializeOwned + Validate,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = T::deserialize(deserializer)?;
        value.validate().map_err(de::Error::custom)?;
        Ok(ValidatedForm(value))
    }
}

/// Checks a facility payload and returns every violated rule, in rule order.
///
/// An empty result means the payload is valid. Exactly one of the bookable or
/// fixed-hours rule sets is applied, chosen by the coerced `bookable` flag.
pub fn facility_violations(payload: &FacilityPayload) -> Vec<String> {
    let mut errors = Vec::new();
    let scope = payload.normalized_scope();
    let status = payload.status.as_deref().unwrap_or_default();

    if payload
        .name
        .as_deref()
        .map_or(true, |name| name.trim().chars().count() < 2)
    {
        errors.push("Name is required".to_owned());
    }

    match scope.as_deref().map(str::parse::<Scope>) {
        Some(Ok(Scope::General)) => {
            if present(&payload.category).is_none() {
                errors.push("Category is required for GENERAL scope".to_owned());
            }
        }
        Some(Ok(Scope::Ug | Scope::Pg)) => {
            if present(&payload.department).is_none() {
                errors.push("Department is required for UG/PG scope".to_owned());
            }
        }
        _ => errors.push("Scope must be GENERAL, UG, or PG".to_owned()),
    }

    if payload.is_bookable() {
        if !BOOKABLE_STATUSES.contains(&status) {
            errors.push("Invalid status for bookable infrastructure".to_owned());
        }
        if ACTIVE_USE_STATUSES.contains(&status) {
            if present(&payload.used_by).is_none() {
                errors.push("Used by is required when RESERVED or IN_USE".to_owned());
            }
            if present(&payload.from_time).is_none() || present(&payload.to_time).is_none() {
                errors.push("From/To time required when RESERVED or IN_USE".to_owned());
            }
        }
    } else {
        if !NON_BOOKABLE_STATUSES.contains(&status) {
            errors.push("Invalid status for non-bookable infrastructure".to_owned());
        }
        if present(&payload.open_time).is_none() || present(&payload.close_time).is_none() {
            errors.push("Open/Close time required for non-bookable infrastructure".to_owned());
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewAdmin;
    use proptest::option;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn payload(value: Value) -> FacilityPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn lowercase_departmental_scope_without_department() {
        let errors = facility_violations(&payload(json!({
            "name": "X",
            "scope": "ug",
            "department": null
        })));
        assert!(errors.contains(&"Department is required for UG/PG scope".to_owned()));
        // "X" is also too short and the fixed-hours fields are missing.
        assert_eq!(errors[0], "Name is required");
    }

    #[test]
    fn available_bookable_needs_no_usage() {
        let errors = facility_violations(&payload(json!({
            "name": "Lab A",
            "scope": "GENERAL",
            "category": "Academic",
            "bookable": true,
            "status": "AVAILABLE"
        })));
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn collects_every_violation_in_order() {
        let errors = facility_violations(&payload(json!({
            "scope": "campus",
            "bookable": true,
            "status": "OPEN"
        })));
        assert_eq!(
            errors,
            vec![
                "Name is required",
                "Scope must be GENERAL, UG, or PG",
                "Invalid status for bookable infrastructure",
            ]
        );
    }

    #[test]
    fn active_use_reports_two_groups() {
        let errors = facility_violations(&payload(json!({
            "name": "Seminar Hall",
            "scope": "PG",
            "department": "D01",
            "bookable": true,
            "status": "RESERVED",
            "from_time": "14:00"
        })));
        assert_eq!(
            errors,
            vec![
                "Used by is required when RESERVED or IN_USE",
                "From/To time required when RESERVED or IN_USE",
            ]
        );
    }

    #[test]
    fn regimes_do_not_mix() {
        // OPEN with hours is fine only when not bookable.
        let fixed = json!({
            "name": "Gym",
            "scope": "GENERAL",
            "category": "Sports & Fitness",
            "status": "OPEN",
            "open_time": "06:00",
            "close_time": "21:00"
        });
        assert!(facility_violations(&payload(fixed.clone())).is_empty());

        let mut bookable = fixed;
        bookable["bookable"] = json!(true);
        assert_eq!(
            facility_violations(&payload(bookable)),
            vec!["Invalid status for bookable infrastructure"]
        );
    }

    #[test]
    fn missing_category_for_general() {
        let errors = facility_violations(&payload(json!({
            "name": "Canteen",
            "scope": "general",
            "category": "",
            "status": "OPEN",
            "open_time": "09:00",
            "close_time": "18:00"
        })));
        assert_eq!(errors, vec!["Category is required for GENERAL scope"]);
    }

    #[test]
    fn whitespace_name_is_rejected() {
        let errors = facility_violations(&payload(json!({
            "name": "  a  ",
            "scope": "GENERAL",
            "category": "Academic",
            "bookable": true,
            "status": "CLOSED"
        })));
        assert_eq!(errors, vec!["Name is required"]);
    }

    #[test]
    fn validated_form_rejects_bad_email() {
        let ok: Result<ValidatedForm<NewAdmin>, _> =
            serde_json::from_value(json!({ "email": "dept@college.local" }));
        assert!(ok.is_ok());

        let err: Result<ValidatedForm<NewAdmin>, _> =
            serde_json::from_value(json!({ "email": "not-an-email" }));
        assert!(err.is_err());
    }

    fn time() -> impl Strategy<Value = Option<String>> {
        option::of(prop_oneof![Just(String::new()), "[0-2][0-9]:[0-5][0-9]"])
    }

    fn any_status() -> impl Strategy<Value = Option<String>> {
        option::of(prop_oneof![
            Just("AVAILABLE".to_owned()),
            Just("RESERVED".to_owned()),
            Just("IN_USE".to_owned()),
            Just("CLOSED".to_owned()),
            Just("OPEN".to_owned()),
            "[A-Z_]{0,8}",
        ])
    }

    fn base() -> FacilityPayload {
        FacilityPayload {
            name: Some("Central Library".into()),
            scope: Some("GENERAL".into()),
            category: Some("Student Facilities".into()),
            ..Default::default()
        }
    }

    proptest! {
        #[test]
        fn fixed_hours_valid_iff_status_and_hours(
            status in any_status(),
            open_time in time(),
            close_time in time(),
            used_by in option::of("[a-z ]{0,6}"),
        ) {
            let p = FacilityPayload {
                bookable: json!(false),
                status: status.clone(),
                open_time: open_time.clone(),
                close_time: close_time.clone(),
                used_by,
                ..base()
            };
            let status_ok = matches!(status.as_deref(), Some("OPEN" | "CLOSED"));
            let hours_ok = open_time.is_some_and(|t| !t.is_empty())
                && close_time.is_some_and(|t| !t.is_empty());
            prop_assert_eq!(facility_violations(&p).is_empty(), status_ok && hours_ok);
        }

        #[test]
        fn active_bookable_without_user_always_fails(
            in_use in any::<bool>(),
            from_time in time(),
            to_time in time(),
            used_by in prop_oneof![Just(None), Just(Some(String::new()))],
        ) {
            let p = FacilityPayload {
                bookable: json!(true),
                status: Some(if in_use { "IN_USE" } else { "RESERVED" }.to_owned()),
                used_by,
                from_time,
                to_time,
                ..base()
            };
            let errors = facility_violations(&p);
            prop_assert!(errors.contains(&"Used by is required when RESERVED or IN_USE".to_owned()));
        }
    }
}
