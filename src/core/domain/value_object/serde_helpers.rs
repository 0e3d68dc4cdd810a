//! Serde helpers for the remote's loosely typed JSON.
//!
//! Depending on the endpoint and the version of the remote, numeric and
//! boolean fields may arrive as JSON numbers or as strings (`"512"`, `"1"`).

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    Float(f64),
    Text(String),
}

fn parse_u64<E: serde::de::Error>(value: NumberOrString) -> Result<u64, E> {
    match value {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Float(f) if f >= 0.0 && f.fract() == 0.0 => Ok(f as u64),
        NumberOrString::Float(f) => Err(E::custom(format!("expected an integer, got {}", f))),
        NumberOrString::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| E::custom(format!("expected an integer, got '{}'", s))),
    }
}

/// Optional `u64` given as a number or a numeric string.
pub mod lenient_u64 {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<NumberOrString>::deserialize(deserializer)?
            .map(parse_u64)
            .transpose()
    }
}

/// Optional `u32` given as a number or a numeric string.
pub mod lenient_u32 {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<NumberOrString>::deserialize(deserializer)? {
            Some(value) => {
                let n = parse_u64(value)?;
                u32::try_from(n)
                    .map(Some)
                    .map_err(|_| serde::de::Error::custom(format!("{} does not fit in u32", n)))
            }
            None => Ok(None),
        }
    }

    /// Same as [`deserialize`] for fields that must be present.
    pub fn required<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize(deserializer)?.ok_or_else(|| serde::de::Error::custom("expected an integer"))
    }
}

/// Optional flag given as `0`/`1`, `"0"`/`"1"` or a JSON boolean.
pub mod lenient_bool {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(u64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Flag>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Flag::Bool(b)) => Ok(Some(b)),
            Some(Flag::Number(n)) => Ok(Some(n != 0)),
            Some(Flag::Text(s)) => match s.trim() {
                "1" | "true" | "yes" | "on" => Ok(Some(true)),
                "0" | "false" | "no" | "off" | "" => Ok(Some(false)),
                other => Err(serde::de::Error::custom(format!(
                    "expected a boolean flag, got '{}'",
                    other
                ))),
            },
        }
    }
}
