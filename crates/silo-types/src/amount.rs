use crate::error::{Result, SiloError};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const SILO_DECIMALS: u32 = 18;
pub const ATTO_PER_SILO: u128 = 1_000_000_000_000_000_000; // 10^18

/// Token amount in atto denomination (10^-18 SILO).
///
/// The node wire format carries amounts as decimal strings of attos, which
/// is how they serialize here. Parsing is strict: digits only, no sign, no
/// separators; anything else is peer-supplied garbage and is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TokenAmount(u128);

impl TokenAmount {
    pub const ZERO: Self = Self(0);

    pub fn from_attos(attos: u128) -> Self {
        Self(attos)
    }

    pub fn from_whole(silo: u64) -> Self {
        Self(silo as u128 * ATTO_PER_SILO)
    }

    pub fn to_attos(&self) -> u128 {
        self.0
    }

    /// Parse a wire amount: a plain decimal string of attos.
    pub fn parse_attos(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(SiloError::InvalidAmount("empty amount".to_string()));
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SiloError::InvalidAmount(format!(
                "not an unsigned decimal: {:?}",
                s
            )));
        }
        s.parse::<u128>()
            .map(Self)
            .map_err(|_| SiloError::InvalidAmount(format!("out of range: {:?}", s)))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Scale by an epoch count or similar unitless factor.
    pub fn checked_mul(&self, factor: u64) -> Option<Self> {
        self.0.checked_mul(factor as u128).map(Self)
    }

    pub fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(&self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl From<TokenAmount> for String {
    fn from(amount: TokenAmount) -> Self {
        amount.0.to_string()
    }
}

impl TryFrom<String> for TokenAmount {
    type Error = SiloError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse_attos(&s)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / ATTO_PER_SILO;
        let frac = self.0 % ATTO_PER_SILO;
        if frac == 0 {
            write!(f, "{} SILO", whole)
        } else {
            let digits = format!("{:018}", frac);
            write!(f, "{}.{} SILO", whole, digits.trim_end_matches('0'))
        }
    }
}
