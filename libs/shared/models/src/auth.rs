use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Medecin,
    Secretaire,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Medecin, Role::Secretaire];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Medecin => "Medecin",
            Role::Secretaire => "Secretaire",
        }
    }
}

/// Employees and cabinet settings.
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];
/// Revenue, statistics and their exports.
pub const REPORT_VIEWERS: &[Role] = &[Role::Admin, Role::Medecin];

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown role: {}", s))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionHeader {
    pub alg: String,
    pub typ: String,
}

/// Payload of the signed session cookie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: i64,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// The signed-in employee, inserted into request extensions by the session middleware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}

impl From<&SessionClaims> for CurrentUser {
    fn from(claims: &SessionClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email.clone(),
            full_name: claims.full_name.clone(),
            role: claims.role,
        }
    }
}
