//! Translator over every loaded locale.

use bow_http::Request;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{I18nError, TranslationIndex, parse_accept_language};

pub const DEFAULT_LOCALE: &str = "en_US";
pub const LANG_COOKIE: &str = "lang";
pub const TRANSLATIONS_DIR: &str = "translations";

static LOCALE_RE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^[a-z]{2}_[A-Z]{2}$").expect("locale pattern is valid"));

/// Returns true for `language_REGION` tags such as `fr_FR`.
pub fn is_valid_locale(locale: &str) -> bool {
	LOCALE_RE.is_match(locale)
}

/// Language part of a locale: `fr_FR` → `fr`.
pub fn lang_from_locale(locale: &str) -> &str {
	locale.split('_').next().unwrap_or(locale)
}

/// Translations for every known locale.
///
/// The default locale is always known, with or without a translation file,
/// and translating into it returns messages unchanged.
#[derive(Debug, Clone)]
pub struct Translator {
	locales: BTreeMap<String, TranslationIndex>,
}

impl Default for Translator {
	fn default() -> Self {
		let mut locales = BTreeMap::new();
		locales.insert(DEFAULT_LOCALE.to_string(), TranslationIndex::new(DEFAULT_LOCALE));
		Self { locales }
	}
}

impl Translator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Load `<root>/translations/*.csv`, one file per locale.
	///
	/// A missing translations directory yields a translator that only knows
	/// the default locale.
	///
	/// # Errors
	///
	/// Fails on a file name that is not a valid locale, on unreadable files
	/// and on rows that do not have exactly two fields.
	pub fn load(root: impl AsRef<Path>) -> Result<Self, I18nError> {
		let dir = root.as_ref().join(TRANSLATIONS_DIR);
		let mut translator = Self::default();
		if !dir.is_dir() {
			tracing::debug!(dir = %dir.display(), "no translations directory");
			return Ok(translator);
		}

		let read_err = |source| I18nError::Read {
			path: dir.clone(),
			source,
		};
		let mut paths: Vec<PathBuf> = fs::read_dir(&dir)
			.map_err(read_err)?
			.filter_map(|entry| entry.ok().map(|entry| entry.path()))
			.filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "csv"))
			.collect();
		paths.sort();

		for path in paths {
			let locale = path
				.file_stem()
				.and_then(|stem| stem.to_str())
				.unwrap_or_default()
				.to_string();
			if !is_valid_locale(&locale) {
				return Err(I18nError::InvalidLocale(locale));
			}

			let index = read_index(&path, &locale)?;
			tracing::info!(locale = %locale, entries = index.len(), "loaded translations");
			translator.insert(index);
		}

		Ok(translator)
	}

	/// Add or replace the translations of one locale.
	pub fn insert(&mut self, index: TranslationIndex) {
		self.locales.insert(index.locale().to_string(), index);
	}

	/// Known locales in alphabetical order.
	pub fn locales(&self) -> impl Iterator<Item = &str> {
		self.locales.keys().map(String::as_str)
	}

	pub fn has_locale(&self, locale: &str) -> bool {
		self.locales.contains_key(locale)
	}

	/// Translate `message` into `locale`.
	///
	/// Falls back to `message` itself for the default locale, unknown
	/// locales and phrases without a translation.
	pub fn translate(&self, message: &str, locale: &str) -> String {
		if locale == DEFAULT_LOCALE {
			return message.to_string();
		}

		self.locales
			.get(locale)
			.and_then(|index| index.lookup(message))
			.unwrap_or_else(|| message.to_string())
	}

	/// First known locale of `lang`, alphabetically.
	pub fn locale_from_lang(&self, lang: &str) -> Option<&str> {
		self.locales().find(|locale| lang_from_locale(locale) == lang)
	}

	/// Locale for `request`.
	///
	/// Tried in order: the `lang` cookie, then each `Accept-Language` entry by
	/// weight. Each candidate matches a known locale exactly or, failing
	/// that, by language. Falls back to [`DEFAULT_LOCALE`].
	pub fn req_locale(&self, request: &Request) -> String {
		if let Some(cookie) = request.cookie(LANG_COOKIE)
			&& let Some(locale) = self.resolve(&cookie)
		{
			return locale.to_string();
		}

		if let Some(header) = request.header("accept-language") {
			for tag in parse_accept_language(header) {
				if let Some(locale) = self.resolve(&tag) {
					return locale.to_string();
				}
			}
		}

		DEFAULT_LOCALE.to_string()
	}

	fn resolve(&self, tag: &str) -> Option<&str> {
		let tag = tag.trim().replace('-', "_");
		if let Some((locale, _)) = self.locales.get_key_value(tag.as_str()) {
			return Some(locale.as_str());
		}
		self.locale_from_lang(lang_from_locale(&tag))
	}
}

fn read_index(path: &Path, locale: &str) -> Result<TranslationIndex, I18nError> {
	let csv_err = |source| I18nError::Csv {
		path: path.to_path_buf(),
		source,
	};
	let mut reader = csv::ReaderBuilder::new()
		.has_headers(false)
		.flexible(true)
		.from_path(path)
		.map_err(csv_err)?;

	let mut index = TranslationIndex::new(locale);
	for record in reader.records() {
		let record = record.map_err(csv_err)?;
		if record.len() != 2 {
			return Err(I18nError::MalformedRecord {
				path: path.to_path_buf(),
				line: record.position().map(|p| p.line()).unwrap_or_default(),
				fields: record.len(),
			});
		}
		index.add(&record[0], &record[1])?;
	}

	Ok(index)
}
