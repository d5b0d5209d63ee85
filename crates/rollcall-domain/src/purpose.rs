//! Credential purposes and the redemption rules each one selects.
//!
//! The two purposes deliberately carry different trust models. Attendance
//! secrets are displayed publicly (scanned from a screen), so they carry a
//! wide random component. Login codes are six digits and rely instead on a
//! short TTL, a bounded number of verification attempts, and delivery over a
//! channel only the account owner reads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::user::UserRole;

/// Verification attempts a login code tolerates before it can no longer be consumed.
pub const MAX_LOGIN_ATTEMPTS: i32 = 5;

/// Live login codes allowed per subject at any one time.
pub const MAX_ACTIVE_LOGIN_CODES: u64 = 5;

/// Number of digits in a login code.
pub const LOGIN_CODE_DIGITS: usize = 6;

/// Prefix carried by every attendance secret.
pub const ATTENDANCE_PREFIX: &str = "ATTENDANCE_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Attendance,
    Login,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown purpose: {0}")]
pub struct UnknownPurpose(pub String);

impl Purpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Attendance => "attendance",
            Self::Login => "login",
        }
    }

    /// Whether a subject holding `role` may issue credentials of this purpose.
    ///
    /// Login issuance is gated on the target existing in the directory, not on role.
    pub fn may_issue(self, role: UserRole) -> bool {
        match self {
            Self::Attendance => role == UserRole::Teacher,
            Self::Login => true,
        }
    }

    /// Whether a redeemer holding `role` may redeem credentials of this purpose.
    pub fn may_redeem(self, role: UserRole) -> bool {
        match self {
            Self::Attendance => role == UserRole::Student,
            Self::Login => true,
        }
    }

    /// Inclusive TTL bounds in minutes.
    pub fn ttl_bounds_minutes(self) -> (u32, u32) {
        match self {
            Self::Attendance => (1, 60),
            Self::Login => (10, 10),
        }
    }

    /// TTL applied when the caller does not ask for one.
    pub fn default_ttl_minutes(self) -> u32 {
        10
    }

    pub fn accepts_ttl(self, minutes: u32) -> bool {
        let (min, max) = self.ttl_bounds_minutes();
        (min..=max).contains(&minutes)
    }

    /// Attendance is deduplicated per redeemer per calendar day; login per credential.
    pub fn is_daily(self) -> bool {
        matches!(self, Self::Attendance)
    }

    pub fn outcome(self) -> Outcome {
        match self {
            Self::Attendance => Outcome::Present,
            Self::Login => Outcome::SignedIn,
        }
    }

    /// Cheap structural check run before any store lookup.
    pub fn is_well_formed(self, secret: &str) -> bool {
        match self {
            Self::Attendance => secret.starts_with(ATTENDANCE_PREFIX),
            Self::Login => {
                secret.len() == LOGIN_CODE_DIGITS && secret.bytes().all(|b| b.is_ascii_digit())
            }
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Purpose {
    type Err = UnknownPurpose;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attendance" => Ok(Self::Attendance),
            "login" => Ok(Self::Login),
            other => Err(UnknownPurpose(other.to_owned())),
        }
    }
}

/// Effect recorded by a successful redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Present,
    SignedIn,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown outcome: {0}")]
pub struct UnknownOutcome(pub String);

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::SignedIn => "signed_in",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = UnknownOutcome;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(Self::Present),
            "signed_in" => Ok(Self::SignedIn),
            other => Err(UnknownOutcome(other.to_owned())),
        }
    }
}
