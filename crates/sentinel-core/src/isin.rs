//! ISIN: the planner's primary key for securities.

use std::fmt;

use crate::error::{Error, Result};

/// An International Securities Identification Number, or a synthetic
/// `CASH:<currency>` identifier for a cash position.
///
/// Always exactly 12 bytes once constructed; validation happens at the
/// boundary (`Isin::new`), never deep inside the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Isin(String);

impl Isin {
    /// Validate and wrap a raw ISIN string.
    ///
    /// Real ISINs are exactly 12 characters; synthetic cash ISINs
    /// (`CASH:EUR`, `CASH:USD`, ...) are exempt from the length check.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(Error::InvalidIsin("empty ISIN".into()));
        }
        if !raw.starts_with("CASH:") && raw.len() != 12 {
            return Err(Error::InvalidIsin(format!(
                "'{raw}' is {} bytes, expected 12",
                raw.len()
            )));
        }
        Ok(Self(raw))
    }

    /// Build the synthetic ISIN for a cash balance in the given currency.
    pub fn cash(currency: &str) -> Self {
        Self(format!("CASH:{currency}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_cash(&self) -> bool {
        self.0.starts_with("CASH:")
    }
}

impl fmt::Display for Isin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Isin {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
