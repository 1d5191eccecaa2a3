use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Visibility tier of a facility or an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Scope {
    General,
    Ug,
    Pg,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::General => "GENERAL",
            Scope::Ug => "UG",
            Scope::Pg => "PG",
        }
    }

    /// UG and PG facilities belong to a department.
    pub fn is_departmental(&self) -> bool {
        matches!(self, Scope::Ug | Scope::Pg)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownScope;

impl FromStr for Scope {
    type Err = UnknownScope;

    /// Accepts already normalized tokens only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GENERAL" => Ok(Scope::General),
            "UG" => Ok(Scope::Ug),
            "PG" => Ok(Scope::Pg),
            _ => Err(UnknownScope),
        }
    }
}

/// Upper-cases a scope token. Empty or absent input yields `None`.
///
/// Membership in GENERAL/UG/PG is not checked here.
pub fn normalize_scope(token: Option<&str>) -> Option<String> {
    match token {
        Some(t) if !t.is_empty() => Some(t.to_uppercase()),
        _ => None,
    }
}

/// Normalizes and parses in one step; `None` for absent or unknown tokens.
pub fn parse_scope(token: Option<&str>) -> Option<Scope> {
    normalize_scope(token).and_then(|s| s.parse().ok())
}
