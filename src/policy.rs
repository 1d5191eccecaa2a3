//! Who may see and change which facility records.
//!
//! Coarse role permissions (which role may touch which resource at all) live
//! in the casbin policy; this module decides record-level access from the
//! principal's scope and department.

use std::fmt;
use std::str::FromStr;

use casbin::{CoreApi, Enforcer};

use crate::error::ApiError;
use crate::model::{Admin, Facility, FacilityChanges, FacilityFilters};
use crate::scope::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Super,
    General,
    Dept,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Super => "super",
            Role::General => "general",
            Role::Dept => "dept",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super" => Ok(Role::Super),
            "general" => Ok(Role::General),
            "dept" => Ok(Role::Dept),
            other => Err(PrincipalError::UnknownRole(other.to_owned())),
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PrincipalError {
    #[error("unknown role `{0}`")]
    UnknownRole(String),
    #[error("general admin must use GENERAL scope")]
    GeneralScope,
    #[error("department admin must use UG/PG with department")]
    DeptScope,
}

/// An authenticated admin, as used for every authorization decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Super {
        admin_id: i32,
    },
    General {
        admin_id: i32,
    },
    Dept {
        admin_id: i32,
        scope: Scope,
        department: String,
    },
}

impl Principal {
    /// Builds a principal, enforcing the role/scope/department invariants.
    pub fn new(
        admin_id: i32,
        role: Role,
        scope: Option<Scope>,
        department: Option<&str>,
    ) -> Result<Self, PrincipalError> {
        match role {
            Role::Super => Ok(Principal::Super { admin_id }),
            Role::General if scope == Some(Scope::General) => Ok(Principal::General { admin_id }),
            Role::General => Err(PrincipalError::GeneralScope),
            Role::Dept => match (scope, department.filter(|d| !d.is_empty())) {
                (Some(scope @ (Scope::Ug | Scope::Pg)), Some(department)) => Ok(Principal::Dept {
                    admin_id,
                    scope,
                    department: department.to_owned(),
                }),
                _ => Err(PrincipalError::DeptScope),
            },
        }
    }

    pub fn admin_id(&self) -> i32 {
        match self {
            Principal::Super { admin_id }
            | Principal::General { admin_id }
            | Principal::Dept { admin_id, .. } => *admin_id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Principal::Super { .. } => Role::Super,
            Principal::General { .. } => Role::General,
            Principal::Dept { .. } => Role::Dept,
        }
    }
}

impl TryFrom<&Admin> for Principal {
    type Error = PrincipalError;

    fn try_from(admin: &Admin) -> Result<Self, Self::Error> {
        Principal::new(
            admin.id,
            admin.role.parse()?,
            admin.scope.parse().ok(),
            admin.department.as_deref(),
        )
    }
}

/// Anything carrying the scope and department that access is decided on.
pub trait Scoped {
    fn scope(&self) -> Option<&str>;
    fn department(&self) -> Option<&str>;
}

impl Scoped for Facility {
    fn scope(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }
}

impl Scoped for FacilityChanges {
    fn scope(&self) -> Option<&str> {
        Some(&self.scope)
    }

    fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }
}

pub fn can_access(principal: &Principal, record: &impl Scoped) -> bool {
    match principal {
        Principal::Super { .. } => true,
        Principal::General { .. } => record.scope() == Some(Scope::General.as_str()),
        Principal::Dept {
            scope, department, ..
        } => {
            record.scope() == Some(scope.as_str())
                && record.department() == Some(department.as_str())
        }
    }
}

/// Narrows list filters to what the principal may see. Caller-supplied scope
/// and department are overridden, never rejected.
pub fn scoped_filters(principal: &Principal, filters: FacilityFilters) -> FacilityFilters {
    match principal {
        Principal::Super { .. } => filters,
        Principal::General { .. } => FacilityFilters {
            scope: Some(Scope::General.as_str().to_owned()),
            ..filters
        },
        Principal::Dept {
            scope, department, ..
        } => FacilityFilters {
            scope: Some(scope.as_str().to_owned()),
            department: Some(department.clone()),
            ..filters
        },
    }
}

pub fn authorize_create(principal: &Principal, proposed: &impl Scoped) -> Result<(), ApiError> {
    if can_access(principal, proposed) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Existence is checked before access, so a missing record is reported as
/// such whatever the caller's rights.
pub fn authorize_update(
    principal: &Principal,
    existing: Option<&Facility>,
    proposed: &impl Scoped,
) -> Result<(), ApiError> {
    let existing = existing.ok_or(ApiError::NotFound)?;
    if can_access(principal, existing) && can_access(principal, proposed) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

pub fn authorize_delete(principal: &Principal, existing: Option<&Facility>) -> Result<(), ApiError> {
    let existing = existing.ok_or(ApiError::NotFound)?;
    if can_access(principal, existing) {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// Role-level check against the casbin policy.
pub fn permit(
    enforcer: &Enforcer,
    principal: &Principal,
    resource: &str,
    action: &str,
) -> Result<(), ApiError> {
    if enforcer
        .enforce((principal.role().as_str(), resource, action))
        .unwrap_or_default()
    {
        Ok(())
    } else {
        tracing::debug!(
            "permit: {} may not {} {}",
            principal.role(),
            action,
            resource
        );
        Err(ApiError::Forbidden)
    }
}
