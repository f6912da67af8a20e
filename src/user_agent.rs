//! User-Agent parsing.
//!
//! Extracts the operating system and browser family from a client's
//! User-Agent string using a fixed, ordered list of known tokens. The first
//! token in list order that occurs in the string wins; no match yields
//! `Unknown`. Parsing never fails.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Operating system family, in token-matching order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(from = "String", into = "String")]
pub enum OperatingSystem {
    Windows,
    #[strum(serialize = "Mac OS X")]
    MacOsX,
    Linux,
    Android,
    #[strum(serialize = "iOS")]
    Ios,
    Unknown,
}

/// Browser family, in token-matching order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(from = "String", into = "String")]
pub enum BrowserFamily {
    Chrome,
    Firefox,
    Safari,
    Edge,
    Opera,
    Unknown,
}

impl From<String> for OperatingSystem {
    fn from(value: String) -> Self {
        OperatingSystem::from_str(&value).unwrap_or(OperatingSystem::Unknown)
    }
}

impl From<OperatingSystem> for String {
    fn from(value: OperatingSystem) -> Self {
        value.to_string()
    }
}

impl From<String> for BrowserFamily {
    fn from(value: String) -> Self {
        BrowserFamily::from_str(&value).unwrap_or(BrowserFamily::Unknown)
    }
}

impl From<BrowserFamily> for String {
    fn from(value: BrowserFamily) -> Self {
        value.to_string()
    }
}

/// Operating system and browser parsed from one User-Agent string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientFingerprint {
    pub operating_system: OperatingSystem,
    pub browser_family: BrowserFamily,
}

/// Returns the first variant (in declaration order) whose token occurs in
/// `user_agent`, skipping the `unknown` sentinel.
fn first_token_match<T>(user_agent: &str, unknown: T) -> T
where
    T: IntoEnumIterator + AsRef<str> + PartialEq + Copy,
{
    T::iter()
        .filter(|candidate| *candidate != unknown)
        .find(|candidate| user_agent.contains(candidate.as_ref()))
        .unwrap_or(unknown)
}

/// Parses the operating system and browser family from a User-Agent string.
pub fn parse_user_agent(user_agent: &str) -> ClientFingerprint {
    ClientFingerprint {
        operating_system: first_token_match(user_agent, OperatingSystem::Unknown),
        browser_family: first_token_match(user_agent, BrowserFamily::Unknown),
    }
}
