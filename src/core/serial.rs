use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::Serialize;

use crate::prelude::*;

/// Pack serial number, validated at the boundary.
///
/// Serial numbers end up in journal and report file names, so only letters,
/// digits, and `~-_.` are accepted.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SerialNumber(String);

impl SerialNumber {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SerialNumber {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, formatter)
    }
}

impl FromStr for SerialNumber {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        ensure!(!raw.is_empty(), "serial number must not be empty");
        ensure!(
            raw.chars().all(|char| char.is_ascii_alphanumeric() || "~-_.".contains(char)),
            "serial number `{raw}` may only contain letters, digits, and `~-_.`",
        );
        Ok(Self(raw.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_safe_characters() {
        assert!("PACK-01.A~x_2".parse::<SerialNumber>().is_ok());
    }

    #[test]
    fn test_rejects_empty() {
        assert!("".parse::<SerialNumber>().is_err());
    }

    #[test]
    fn test_rejects_unsafe_characters() {
        assert!("PACK 01".parse::<SerialNumber>().is_err());
        assert!("PACK/01".parse::<SerialNumber>().is_err());
    }
}
