//! Localized date formatting.

use chrono::{DateTime, FixedOffset, Locale, NaiveDate, NaiveDateTime};
use std::fmt::Write;

use crate::I18nError;

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse an RFC 3339 timestamp, a naive `YYYY-MM-DD HH:MM[:SS]` date-time
/// (taken as UTC) or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_datetime(value: &str) -> Option<DateTime<FixedOffset>> {
	let value = value.trim();
	if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
		return Some(datetime);
	}

	for format in NAIVE_FORMATS {
		if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
			return Some(naive.and_utc().fixed_offset());
		}
	}

	NaiveDate::parse_from_str(value, "%Y-%m-%d")
		.ok()
		.and_then(|date| date.and_hms_opt(0, 0, 0))
		.map(|naive| naive.and_utc().fixed_offset())
}

/// Format `datetime` with a strftime `layout`, naming months and weekdays in
/// `locale`. Unknown locales fall back to POSIX names.
///
/// # Examples
///
/// ```
/// use bow_i18n::{format_datetime, parse_datetime};
///
/// let date = parse_datetime("2024-03-05").unwrap();
/// assert_eq!(format_datetime(&date, "%A %d %B %Y", "fr_FR").unwrap(), "mardi 05 mars 2024");
/// assert_eq!(format_datetime(&date, "%b %d", "en_US").unwrap(), "Mar 05");
/// ```
pub fn format_datetime(
	datetime: &DateTime<FixedOffset>,
	layout: &str,
	locale: &str,
) -> Result<String, I18nError> {
	let locale = Locale::try_from(locale).unwrap_or(Locale::POSIX);

	let mut out = String::new();
	write!(out, "{}", datetime.format_localized(layout, locale))
		.map_err(|_| I18nError::InvalidFormat(layout.to_string()))?;
	Ok(out)
}

/// Parse `value` with [`parse_datetime`] and format it.
pub fn format_value(value: &str, layout: &str, locale: &str) -> Result<String, I18nError> {
	let datetime = parse_datetime(value).ok_or_else(|| I18nError::InvalidDate(value.to_string()))?;
	format_datetime(&datetime, layout, locale)
}
