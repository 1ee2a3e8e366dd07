//! Supply-chain participants and their capabilities.
//!
//! A participant's role is fixed at registration. Verification is granted
//! once by the ledger owner and never withdrawn.

use crate::error::LedgerError;
use crate::host::{LogicalTime, Principal};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Supply-chain role of a registered identity.
///
/// Numeric codes follow registration order: 1 manufacturer, 2 logistics,
/// 3 retailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Manufacturer,
    Logistics,
    Retailer,
}

impl TryFrom<u8> for Role {
    type Error = LedgerError;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        match code {
            1 => Ok(Role::Manufacturer),
            2 => Ok(Role::Logistics),
            3 => Ok(Role::Retailer),
            other => Err(LedgerError::InvalidRole(other.to_string())),
        }
    }
}

impl FromStr for Role {
    type Err = LedgerError;

    /// Accepts either the numeric code or the role name, case-insensitively.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<u8>() {
            return Role::try_from(code);
        }
        match trimmed.to_lowercase().as_str() {
            "manufacturer" => Ok(Role::Manufacturer),
            "logistics" => Ok(Role::Logistics),
            "retailer" => Ok(Role::Retailer),
            _ => Err(LedgerError::InvalidRole(trimmed.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Manufacturer => "manufacturer",
            Role::Logistics => "logistics",
            Role::Retailer => "retailer",
        };
        f.write_str(name)
    }
}

/// A registered identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub identity: Principal,
    pub role: Role,
    pub name: String,
    pub verified: bool,
    pub registered_at: LogicalTime,
}

impl Participant {
    /// Creates an unverified participant record.
    pub fn new(identity: Principal, role: Role, name: String, registered_at: LogicalTime) -> Self {
        Participant {
            identity,
            role,
            name,
            verified: false,
            registered_at,
        }
    }

    /// Marks the participant as verified. Idempotent.
    pub fn verify(&mut self) {
        self.verified = true;
    }

    /// `true` if this participant may act in `role`.
    pub fn can_act_as(&self, role: Role) -> bool {
        self.verified && self.role == role
    }
}

/// `true` if `participant` exists, is verified, and holds `role`.
pub fn is_verified_as(participant: Option<&Participant>, role: Role) -> bool {
    participant.map(|p| p.can_act_as(role)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn participant(role: Role) -> Participant {
        Participant::new(Principal::from("p1"), role, "Acme".to_string(), 7)
    }

    #[test]
    fn test_new_participant_is_unverified() {
        let p = participant(Role::Manufacturer);
        assert!(!p.verified);
        assert_eq!(p.registered_at, 7);
        assert!(!p.can_act_as(Role::Manufacturer));
    }

    #[test]
    fn test_verified_participant_acts_only_in_own_role() {
        let mut p = participant(Role::Logistics);
        p.verify();

        assert!(p.can_act_as(Role::Logistics));
        assert!(!p.can_act_as(Role::Manufacturer));
        assert!(!p.can_act_as(Role::Retailer));
    }

    #[test]
    fn test_is_verified_as_handles_missing_participant() {
        assert!(!is_verified_as(None, Role::Retailer));

        let mut p = participant(Role::Retailer);
        assert!(!is_verified_as(Some(&p), Role::Retailer));
        p.verify();
        assert!(is_verified_as(Some(&p), Role::Retailer));
    }

    #[test]
    fn test_role_codes() {
        assert_eq!(Role::try_from(1).unwrap(), Role::Manufacturer);
        assert_eq!(Role::try_from(2).unwrap(), Role::Logistics);
        assert_eq!(Role::try_from(3).unwrap(), Role::Retailer);
        assert!(matches!(Role::try_from(0), Err(LedgerError::InvalidRole(_))));
        assert!(matches!(Role::try_from(4), Err(LedgerError::InvalidRole(_))));
    }

    #[test]
    fn test_role_from_str_accepts_names_and_codes() {
        assert_eq!(" Retailer ".parse::<Role>().unwrap(), Role::Retailer);
        assert_eq!("2".parse::<Role>().unwrap(), Role::Logistics);
        assert!("consumer".parse::<Role>().is_err());
    }
}
