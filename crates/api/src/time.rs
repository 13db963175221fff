//! Timestamp (de)serialization for the wire.
//!
//! Instants are exchanged as ISO-8601 strings with millisecond precision and
//! the literal `+09:00` suffix, independent of the viewing client's locale.
//! Parsing accepts any valid ISO-8601 offset and normalizes to UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

use timegrid_core::timeline::CANONICAL_TZ;

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

pub fn to_wire(dt: DateTime<Utc>) -> String {
    dt.with_timezone(&CANONICAL_TZ).format(FORMAT).to_string()
}

pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&to_wire(*dt))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Wrap {
        #[serde(with = "super")]
        at: DateTime<Utc>,
    }

    #[test]
    fn serializes_with_canonical_offset_and_millis() {
        let wrap = Wrap {
            at: Utc.with_ymd_and_hms(2026, 8, 7, 0, 15, 0).unwrap(),
        };
        let json = serde_json::to_string(&wrap).unwrap();
        assert_eq!(json, r#"{"at":"2026-08-07T09:15:00.000+09:00"}"#);
    }

    #[test]
    fn parses_any_iso_offset() {
        for raw in [
            r#"{"at":"2026-08-07T09:15:00.000+09:00"}"#,
            r#"{"at":"2026-08-07T00:15:00Z"}"#,
            r#"{"at":"2026-08-07T00:15:00.000+00:00"}"#,
            r#"{"at":"2026-08-06T19:15:00-05:00"}"#,
        ] {
            let wrap: Wrap = serde_json::from_str(raw).unwrap();
            assert_eq!(
                wrap.at,
                Utc.with_ymd_and_hms(2026, 8, 7, 0, 15, 0).unwrap(),
                "{raw}"
            );
        }
    }

    #[test]
    fn round_trips_milliseconds() {
        let at = Utc.with_ymd_and_hms(2026, 8, 7, 3, 4, 5).unwrap()
            + chrono::Duration::milliseconds(250);
        let json = serde_json::to_string(&Wrap { at }).unwrap();
        assert!(json.contains("12:04:05.250+09:00"));
        let back: Wrap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.at, at);
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Wrap>(r#"{"at":"yesterday"}"#).is_err());
    }
}
