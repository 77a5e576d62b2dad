// src/ingest/providers/mod.rs
pub mod jma;
pub mod p2p;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Feeds without an explicit offset report Japan Standard Time.
const JST_OFFSET_SECS: i32 = 9 * 3600;

const NAIVE_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// RFC 3339 first, then the offset-less layouts as JST.
pub(crate) fn parse_feed_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let jst = FixedOffset::east_opt(JST_OFFSET_SECS)?;
    NAIVE_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(raw, fmt)
            .ok()
            .and_then(|n| jst.from_local_datetime(&n).single())
            .map(|dt| dt.with_timezone(&Utc))
    })
}

/// Numbers arrive either as JSON numbers or numeric strings.
pub(crate) fn lenient_f64(v: Option<&Value>) -> Option<f64> {
    let n = match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_rfc3339_and_jst_layouts() {
        let a = parse_feed_time("2024-01-01T16:10:00+09:00").unwrap();
        let b = parse_feed_time("2024/01/01 16:10:00.000").unwrap();
        let c = parse_feed_time("2024/01/01 16:10:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.to_rfc3339(), "2024-01-01T07:10:00+00:00");
        assert!(parse_feed_time("yesterday").is_none());
    }

    #[test]
    fn lenient_numbers() {
        assert_eq!(lenient_f64(Some(&json!(4.5))), Some(4.5));
        assert_eq!(lenient_f64(Some(&json!(" 10 "))), Some(10.0));
        assert_eq!(lenient_f64(Some(&json!("deep"))), None);
        assert_eq!(lenient_f64(Some(&json!(null))), None);
        assert_eq!(lenient_f64(None), None);
    }
}
