//! Lifetime and visibility settings attached to a shared secret
//!
//! These travel to the storage service alongside the ciphertext; the service
//! is what actually enforces them.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("unknown expiry '{0}', expected one of 5m, 30m, 1h, 1d, 7d, 14d, 30d")]
    UnknownExpiry(String),
    #[error("invalid view limit '{0}', expected a positive number or -1 for unlimited")]
    InvalidViewLimit(String),
    #[error("unknown access type '{0}', expected anyone or organization")]
    UnknownAccessType(String),
}

/// How long a shared secret stays available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExpiresIn {
    FiveMinutes,
    ThirtyMinutes,
    #[default]
    OneHour,
    OneDay,
    SevenDays,
    FourteenDays,
    ThirtyDays,
}

impl ExpiresIn {
    pub const ALL: [ExpiresIn; 7] = [
        ExpiresIn::FiveMinutes,
        ExpiresIn::ThirtyMinutes,
        ExpiresIn::OneHour,
        ExpiresIn::OneDay,
        ExpiresIn::SevenDays,
        ExpiresIn::FourteenDays,
        ExpiresIn::ThirtyDays,
    ];

    pub fn duration(&self) -> Duration {
        match self {
            ExpiresIn::FiveMinutes => Duration::minutes(5),
            ExpiresIn::ThirtyMinutes => Duration::minutes(30),
            ExpiresIn::OneHour => Duration::hours(1),
            ExpiresIn::OneDay => Duration::days(1),
            ExpiresIn::SevenDays => Duration::days(7),
            ExpiresIn::FourteenDays => Duration::days(14),
            ExpiresIn::ThirtyDays => Duration::days(30),
        }
    }

    pub fn expires_at(&self, now: OffsetDateTime) -> OffsetDateTime {
        now + self.duration()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiresIn::FiveMinutes => "5m",
            ExpiresIn::ThirtyMinutes => "30m",
            ExpiresIn::OneHour => "1h",
            ExpiresIn::OneDay => "1d",
            ExpiresIn::SevenDays => "7d",
            ExpiresIn::FourteenDays => "14d",
            ExpiresIn::ThirtyDays => "30d",
        }
    }
}

impl fmt::Display for ExpiresIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpiresIn {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ExpiresIn::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| PolicyError::UnknownExpiry(s.to_string()))
    }
}

impl TryFrom<String> for ExpiresIn {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExpiresIn> for String {
    fn from(value: ExpiresIn) -> Self {
        value.as_str().to_string()
    }
}

/// How many times a shared secret may be viewed
///
/// On the wire `-1` (or an absent field) means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ViewLimit {
    #[default]
    Unlimited,
    Limited(NonZeroU32),
}

impl ViewLimit {
    /// A limit of `views`; zero is treated as unlimited
    pub fn limited(views: u32) -> Self {
        NonZeroU32::new(views)
            .map(ViewLimit::Limited)
            .unwrap_or(ViewLimit::Unlimited)
    }

    /// Value for the `expiresAfterViews` field of a create request
    pub fn expires_after_views(&self) -> Option<u32> {
        match self {
            ViewLimit::Unlimited => None,
            ViewLimit::Limited(n) => Some(n.get()),
        }
    }

    /// Interpret an `expiresAfterViews` value handed back by the service
    pub fn from_wire(value: Option<i64>) -> Result<Self, PolicyError> {
        match value {
            None | Some(-1) => Ok(ViewLimit::Unlimited),
            Some(n) => u32::try_from(n)
                .ok()
                .and_then(NonZeroU32::new)
                .map(ViewLimit::Limited)
                .ok_or_else(|| PolicyError::InvalidViewLimit(n.to_string())),
        }
    }

    pub fn as_wire(&self) -> i64 {
        match self {
            ViewLimit::Unlimited => -1,
            ViewLimit::Limited(n) => i64::from(n.get()),
        }
    }
}

impl fmt::Display for ViewLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewLimit::Unlimited => f.write_str("unlimited"),
            ViewLimit::Limited(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for ViewLimit {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unlimited") {
            return Ok(ViewLimit::Unlimited);
        }
        let n: i64 = s
            .parse()
            .map_err(|_| PolicyError::InvalidViewLimit(s.to_string()))?;
        ViewLimit::from_wire(Some(n))
    }
}

impl TryFrom<i64> for ViewLimit {
    type Error = PolicyError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        ViewLimit::from_wire(Some(value))
    }
}

impl From<ViewLimit> for i64 {
    fn from(value: ViewLimit) -> Self {
        value.as_wire()
    }
}

/// Who may open a link once they hold it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Anyone,
    #[default]
    Organization,
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessType::Anyone => f.write_str("anyone"),
            AccessType::Organization => f.write_str("organization"),
        }
    }
}

impl FromStr for AccessType {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anyone" => Ok(AccessType::Anyone),
            "organization" | "org" => Ok(AccessType::Organization),
            other => Err(PolicyError::UnknownAccessType(other.to_string())),
        }
    }
}
