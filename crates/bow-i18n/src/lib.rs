//! Internationalization for bow.
//!
//! Translations are read from `<root>/translations/<locale>.csv`, two columns
//! per row: source phrase and translation. A `%` in the source phrase is a
//! placeholder matching any text, which the translation can reuse in order:
//!
//! ```
//! use bow_i18n::TranslationIndex;
//!
//! let mut index = TranslationIndex::new("fr_FR");
//! index.add("Hello %", "Bonjour %").unwrap();
//!
//! assert_eq!(index.lookup("Hello World").as_deref(), Some("Bonjour World"));
//! assert_eq!(index.lookup("Goodbye"), None);
//! ```

pub mod accept_language;
pub mod catalog;
pub mod datetime;
pub mod error;
pub mod translator;

pub use accept_language::parse_accept_language;
pub use catalog::TranslationIndex;
pub use datetime::{format_datetime, format_value, parse_datetime};
pub use error::I18nError;
pub use translator::{
	DEFAULT_LOCALE, LANG_COOKIE, TRANSLATIONS_DIR, Translator, is_valid_locale, lang_from_locale,
};
