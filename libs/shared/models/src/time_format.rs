//! `HH:MM` wire format for time-of-day fields.
//!
//! Postgres `time` columns come back as `HH:MM:SS`, clients send `HH:MM`.
//! Both are accepted; output is always `HH:MM`.

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serializer};

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S%.f"))
        .ok()
}

pub fn format_time(time: &NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_time(time))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_time(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time {:?}, expected HH:MM", raw)))
}

pub mod option {
    use super::*;

    pub fn serialize<S>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(t) => serializer.serialize_str(&format_time(t)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse_time(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid time {:?}, expected HH:MM", raw))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Slot {
        #[serde(with = "crate::time_format")]
        at: NaiveTime,
        #[serde(with = "crate::time_format::option", default)]
        until: Option<NaiveTime>,
    }

    #[test]
    fn test_accepts_store_seconds_and_emits_minutes() {
        let slot: Slot = serde_json::from_str(r#"{"at":"10:30:00","until":null}"#).unwrap();
        assert_eq!(slot.at, NaiveTime::from_hms_opt(10, 30, 0).unwrap());
        assert!(slot.until.is_none());

        let out = serde_json::to_value(&slot).unwrap();
        assert_eq!(out["at"], "10:30");
    }

    #[test]
    fn test_rejects_twelve_hour_clock() {
        assert!(serde_json::from_str::<Slot>(r#"{"at":"10:30 PM"}"#).is_err());
        assert!(parse_time("25:00").is_none());
    }
}
