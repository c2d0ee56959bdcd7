use std::path::PathBuf;

/// Errors raised while loading translations or formatting dates.
#[derive(Debug, thiserror::Error)]
pub enum I18nError {
	#[error("locale {0} is not valid")]
	InvalidLocale(String),

	#[error("failed to read translations from {path}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse translations in {path}")]
	Csv {
		path: PathBuf,
		#[source]
		source: csv::Error,
	},

	#[error("{path}:{line}: expected 2 fields, found {fields}")]
	MalformedRecord { path: PathBuf, line: u64, fields: usize },

	#[error("invalid translation pattern {phrase:?}")]
	Pattern {
		phrase: String,
		#[source]
		source: regex::Error,
	},

	#[error("invalid date format {0:?}")]
	InvalidFormat(String),

	#[error("invalid date value {0:?}")]
	InvalidDate(String),
}
