use core::str::FromStr;

use serde::{Deserialize, Serialize};

use vaptrack_core::DomainError;

/// Role identifier used for RBAC.
///
/// This is a closed enumeration: endpoint guards match on it exhaustively
/// instead of comparing ad-hoc strings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Tester,
    Manager,
    Client,
    Superadmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Tester => "tester",
            Role::Manager => "manager",
            Role::Client => "client",
            Role::Superadmin => "superadmin",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tester" => Ok(Role::Tester),
            "manager" => Ok(Role::Manager),
            "client" => Ok(Role::Client),
            "superadmin" => Ok(Role::Superadmin),
            other => Err(DomainError::validation(format!("unknown role: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for role in [Role::Tester, Role::Manager, Role::Client, Role::Superadmin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Tester).unwrap(), "\"tester\"");
    }

    #[test]
    fn rejects_unknown_role() {
        assert!("root".parse::<Role>().is_err());
    }
}
