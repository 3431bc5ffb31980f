//! Decoding of the two date encodings found in the Things database.
//!
//! Timestamps (`creationDate`, `userModificationDate`, `completionDate`) are
//! Unix-epoch seconds stored as reals. Calendar dates (`startDate`,
//! `deadline`) are packed into one integer:
//!
//! ```text
//! bits 16..27  year
//! bits 12..16  month
//! bits  7..12  day
//! ```
//!
//! Nothing here fails: blank, `NULL`, zero and unparseable inputs all decode
//! to `None`, which callers treat exactly like an unset date.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

const YEAR_MASK: u32 = 0x07FF_0000;
const MONTH_MASK: u32 = 0x0000_F000;
const DAY_MASK: u32 = 0x0000_0F80;

const YEAR_SHIFT: u32 = 16;
const MONTH_SHIFT: u32 = 12;
const DAY_SHIFT: u32 = 7;

/// Largest year the packed layout can hold.
pub const MAX_PACKED_YEAR: i32 = (YEAR_MASK >> YEAR_SHIFT) as i32;

fn present(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(raw)
    }
}

/// Decode an epoch-seconds timestamp.
#[must_use]
pub fn decode_epoch(raw: &str) -> Option<DateTime<Utc>> {
    let seconds: f64 = present(raw)?.parse().ok()?;
    if !seconds.is_finite() || seconds <= 0.0 || seconds > i64::MAX as f64 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (whole, nanos) = (seconds.trunc() as i64, (seconds.fract() * 1e9) as u32);
    DateTime::from_timestamp(whole, nanos)
}

/// Decode a packed calendar date.
#[must_use]
pub fn decode_packed(raw: &str) -> Option<NaiveDate> {
    let value: u32 = present(raw)?.parse().ok()?;
    if value == 0 {
        return None;
    }
    let year = (value & YEAR_MASK) >> YEAR_SHIFT;
    let month = (value & MONTH_MASK) >> MONTH_SHIFT;
    let day = (value & DAY_MASK) >> DAY_SHIFT;
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

/// Pack a calendar date, or `None` if its year does not fit the layout.
#[must_use]
pub fn encode_packed(date: NaiveDate) -> Option<u32> {
    if !(1..=MAX_PACKED_YEAR).contains(&date.year()) {
        return None;
    }
    let year = u32::try_from(date.year()).ok()?;
    Some((year << YEAR_SHIFT) | (date.month() << MONTH_SHIFT) | (date.day() << DAY_SHIFT))
}

/// Format a calendar date the way the summary exports it.
#[must_use]
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Format a timestamp the way the summary exports it.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Parse a caller-supplied `YYYY-MM-DD` date.
#[must_use]
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_known_packed_date() {
        let raw = ((2024u32 << 16) | (3 << 12) | (15 << 7)).to_string();
        assert_eq!(raw, "132659072");
        assert_eq!(decode_packed(&raw), NaiveDate::from_ymd_opt(2024, 3, 15));
    }

    #[test]
    fn test_reserved_bits_are_ignored() {
        let value = (2023u32 << 16) | (12 << 12) | (31 << 7) | 0x7F;
        assert_eq!(decode_packed(&value.to_string()), NaiveDate::from_ymd_opt(2023, 12, 31));
    }

    #[test]
    fn test_invalid_calendar_date_is_absent() {
        let feb_30 = (2024u32 << 16) | (2 << 12) | (30 << 7);
        assert_eq!(decode_packed(&feb_30.to_string()), None);
    }

    #[test]
    fn test_blank_inputs_are_absent() {
        for raw in ["", "  ", "NULL", "null", "0", "abc", "-5", "1.5e"] {
            assert_eq!(decode_packed(raw), None, "packed {raw:?}");
            assert_eq!(decode_epoch(raw), None, "epoch {raw:?}");
        }
        assert_eq!(decode_epoch("NaN"), None);
        assert_eq!(decode_epoch("inf"), None);
    }

    #[test]
    fn test_decode_epoch_with_fraction() {
        let ts = decode_epoch("1710504000.25").unwrap();
        assert_eq!(format_timestamp(ts), "2024-03-15T12:00:00Z");
        assert_eq!(ts.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_encode_rejects_unrepresentable_years() {
        assert_eq!(encode_packed(NaiveDate::from_ymd_opt(2048, 1, 1).unwrap()), None);
        assert!(encode_packed(NaiveDate::from_ymd_opt(2047, 1, 1).unwrap()).is_some());
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_iso_date(" 2024-03-15 "), NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(parse_iso_date("15/03/2024"), None);
        assert_eq!(format_date(parse_iso_date("2024-01-02").unwrap()), "2024-01-02");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn packed_dates_round_trip(year in 1i32..=MAX_PACKED_YEAR, month in 1u32..=12, day in 1u32..=28) {
            let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
            let packed = encode_packed(date).unwrap();
            prop_assert_eq!(decode_packed(&packed.to_string()), Some(date));
        }

        #[test]
        fn decoders_never_panic(raw in ".{0,24}") {
            let _ = decode_packed(&raw);
            let _ = decode_epoch(&raw);
        }
    }
}
