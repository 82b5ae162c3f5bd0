// Display decoders for raw telemetry fields.

use serde_json::Value;
use strum::{Display, EnumString, IntoStaticStr};

/// Which link a record arrived over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub enum UploadChannel {
    #[strum(serialize = "4G")]
    Cellular,
    #[strum(serialize = "Beidou")]
    Beidou,
    #[strum(serialize = "Iridium")]
    Iridium,
    #[strum(serialize = "unknown")]
    Unknown,
}

impl UploadChannel {
    /// Decode the wire code (`1`, `2`, `4`), given as a number or string.
    pub fn from_code(raw: &Value) -> Self {
        let code = match raw {
            Value::String(s) => s.trim().parse::<u64>().ok(),
            other => other.as_u64(),
        };
        match code {
            Some(1) => Self::Cellular,
            Some(2) => Self::Beidou,
            Some(4) => Self::Iridium,
            _ => Self::Unknown,
        }
    }

    /// Channel number used by the device-data page listing.
    pub fn code(self) -> Option<u8> {
        match self {
            Self::Cellular => Some(1),
            Self::Beidou => Some(2),
            Self::Iridium => Some(4),
            Self::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Longitude {
    #[strum(serialize = "E")]
    East,
    #[strum(serialize = "W")]
    West,
}

impl Longitude {
    pub fn from_code(raw: i64) -> Self {
        if raw == 0 { Self::East } else { Self::West }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Latitude {
    #[strum(serialize = "N")]
    North,
    #[strum(serialize = "S")]
    South,
}

impl Latitude {
    pub fn from_code(raw: i64) -> Self {
        if raw == 0 { Self::North } else { Self::South }
    }
}

/// Enclosure leak sensor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LeakStatus {
    #[strum(serialize = "no water")]
    Dry,
    #[strum(serialize = "water ingress")]
    Flooded,
    #[strum(serialize = "open circuit")]
    OpenCircuit,
    #[strum(serialize = "short circuit")]
    ShortCircuit,
    #[strum(serialize = "unknown")]
    Unknown,
}

impl LeakStatus {
    pub fn from_code(raw: i64) -> Self {
        match raw {
            0 => Self::Dry,
            1 => Self::Flooded,
            2 => Self::OpenCircuit,
            3 => Self::ShortCircuit,
            _ => Self::Unknown,
        }
    }
}

/// Battery millivolts to volts.
pub fn battery_volts(millivolts: f64) -> f64 {
    millivolts / 1000.0
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        other => other.as_i64(),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        other => other.as_f64(),
    }
}

/// Human-readable rendering of well-known coded fields, or `None` to show
/// the raw value.
pub fn humanize(field: &str, value: &Value) -> Option<String> {
    match field {
        "uploadChannel" => Some(UploadChannel::from_code(value).to_string()),
        "lonHem" | "longitudeHemisphere" => as_i64(value).map(|v| Longitude::from_code(v).to_string()),
        "latHem" | "latitudeHemisphere" => as_i64(value).map(|v| Latitude::from_code(v).to_string()),
        "ubatt" => as_f64(value).map(|mv| format!("{:.3} V", battery_volts(mv))),
        "leak" | "leakStatus" => as_i64(value).map(|v| LeakStatus::from_code(v).to_string()),
        _ => None,
    }
}
