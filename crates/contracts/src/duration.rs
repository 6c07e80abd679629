//! Duration grammar shared by the `delay` directive and the config files
//!
//! `<digits><unit>` where unit is `ms`, `s`, `m` or `h`. The `delay`
//! directive only accepts the single-letter units.

use std::time::Duration;

use crate::ContractError;

/// Time unit suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    /// Single-letter units (`s`, `m`, `h`)
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            's' => Some(Self::Seconds),
            'm' => Some(Self::Minutes),
            'h' => Some(Self::Hours),
            _ => None,
        }
    }

    /// Any unit suffix, including `ms`
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "ms" => Some(Self::Milliseconds),
            _ => {
                let mut chars = suffix.chars();
                match (chars.next(), chars.next()) {
                    (Some(letter), None) => Self::from_letter(letter),
                    _ => None,
                }
            }
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
            Self::Minutes => "m",
            Self::Hours => "h",
        }
    }

    /// Plural English name, used in acknowledgement text
    pub fn name(self) -> &'static str {
        match self {
            Self::Milliseconds => "milliseconds",
            Self::Seconds => "seconds",
            Self::Minutes => "minutes",
            Self::Hours => "hours",
        }
    }

    fn millis(self) -> u64 {
        match self {
            Self::Milliseconds => 1,
            Self::Seconds => 1_000,
            Self::Minutes => 60_000,
            Self::Hours => 3_600_000,
        }
    }

    /// `amount` of this unit, `None` on overflow
    pub fn duration(self, amount: u64) -> Option<Duration> {
        amount.checked_mul(self.millis()).map(Duration::from_millis)
    }
}

/// Parse `"250ms"`, `"2s"`, `"30m"`, `"1h"`
pub fn parse_duration(text: &str) -> Result<Duration, ContractError> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| ContractError::config_parse(format!("duration '{text}' has no unit")))?;
    let (digits, suffix) = text.split_at(split);
    if digits.is_empty() {
        return Err(ContractError::config_parse(format!(
            "duration '{text}' has no magnitude"
        )));
    }
    let amount: u64 = digits
        .parse()
        .map_err(|e| ContractError::config_parse(format!("duration '{text}': {e}")))?;
    let unit = TimeUnit::from_suffix(suffix).ok_or_else(|| {
        ContractError::config_parse(format!("duration '{text}' has unknown unit '{suffix}'"))
    })?;
    unit.duration(amount)
        .ok_or_else(|| ContractError::config_parse(format!("duration '{text}' overflows")))
}

/// Inverse of [`parse_duration`], using the largest exact unit
pub fn format_duration(duration: Duration) -> String {
    let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    if millis > 0 {
        for unit in [TimeUnit::Hours, TimeUnit::Minutes, TimeUnit::Seconds] {
            if millis % unit.millis() == 0 {
                return format!("{}{}", millis / unit.millis(), unit.suffix());
            }
        }
    }
    format!("{millis}ms")
}

/// `#[serde(with = "contracts::humane")]` for `Duration` fields
pub mod humane {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_duration(&text).map_err(D::Error::custom)
    }

    /// Same grammar for `Option<Duration>` fields
    pub mod option {
        use std::time::Duration;

        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            duration: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match duration {
                Some(d) => serializer.serialize_some(&super::super::format_duration(*d)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|text| super::super::parse_duration(&text).map_err(D::Error::custom))
                .transpose()
        }
    }
}
