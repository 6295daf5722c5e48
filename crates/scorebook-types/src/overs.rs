use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Legal deliveries in one over.
pub const BALLS_PER_OVER: u32 = 6;

/// An exact over count, stored as the number of legal balls bowled.
///
/// Cricket notation writes `18.4` for eighteen complete overs plus four
/// balls, which is `18 + 4/6` overs, not `18.4`. Keeping the ball count as an
/// integer means sums and differences of overs never accumulate rounding
/// error; fractional overs are derived only when a rate is computed.
///
/// Serialized as the notation string (`"18.4"`). Deserializes from either a
/// string or a JSON number in the same notation.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Overs {
    balls: u32,
}

impl Overs {
    pub const ZERO: Self = Self { balls: 0 };

    /// Build from complete overs plus additional balls (`0..=5`).
    pub fn new(overs: u32, balls: u32) -> Result<Self, TypeError> {
        if balls >= BALLS_PER_OVER {
            return Err(TypeError::InvalidOvers(format!("{overs}.{balls}")));
        }
        overs
            .checked_mul(BALLS_PER_OVER)
            .and_then(|b| b.checked_add(balls))
            .map(Self::from_balls)
            .ok_or_else(|| TypeError::InvalidOvers(format!("{overs}.{balls}")))
    }

    pub const fn from_balls(balls: u32) -> Self {
        Self { balls }
    }

    pub const fn balls(&self) -> u32 {
        self.balls
    }

    pub const fn is_zero(&self) -> bool {
        self.balls == 0
    }

    /// Complete overs.
    pub const fn whole_overs(&self) -> u32 {
        self.balls / BALLS_PER_OVER
    }

    /// Balls of the current, incomplete over.
    pub const fn remainder_balls(&self) -> u32 {
        self.balls % BALLS_PER_OVER
    }

    /// Overs as a true fraction (`18.4` → `18.666…`).
    pub fn as_fraction(&self) -> f64 {
        f64::from(self.balls) / f64::from(BALLS_PER_OVER)
    }

    /// Parse a JSON-number rendition of the notation (`18.4`).
    pub fn from_notation_number(value: f64) -> Result<Self, TypeError> {
        if !value.is_finite() || value < 0.0 {
            return Err(TypeError::InvalidOvers(value.to_string()));
        }
        value.to_string().parse()
    }
}

impl fmt::Debug for Overs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Overs({self})")
    }
}

impl fmt::Display for Overs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.whole_overs(), self.remainder_balls())
    }
}

impl FromStr for Overs {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeError::InvalidOvers(s.to_string());
        let trimmed = s.trim();
        let (whole, part) = match trimmed.split_once('.') {
            Some((whole, part)) => (whole, part),
            None => (trimmed, "0"),
        };
        if whole.is_empty() || part.len() != 1 {
            return Err(invalid());
        }
        let overs: u32 = whole.parse().map_err(|_| invalid())?;
        let balls: u32 = part.parse().map_err(|_| invalid())?;
        Self::new(overs, balls).map_err(|_| invalid())
    }
}

impl Serialize for Overs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Overs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Notation {
            Number(f64),
            Text(String),
        }

        match Notation::deserialize(deserializer)? {
            Notation::Number(n) => Overs::from_notation_number(n),
            Notation::Text(s) => s.parse(),
        }
        .map_err(serde::de::Error::custom)
    }
}
