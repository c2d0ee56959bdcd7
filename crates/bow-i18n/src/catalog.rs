//! Per-locale translation index.

use regex::Regex;
use std::collections::HashMap;

use crate::I18nError;

/// Placeholder token in source phrases and translations. `%%` is a literal `%`.
pub const PLACEHOLDER: char = '%';

#[derive(Debug, Clone)]
struct PatternEntry {
	regex: Regex,
	replacement: String,
}

/// Translations of one locale.
///
/// Phrases without placeholders are looked up exactly. Phrases with
/// placeholders become patterns that may match anywhere in a message, tried in
/// the order they were added; the first matching pattern rewrites every
/// occurrence.
#[derive(Debug, Clone)]
pub struct TranslationIndex {
	locale: String,
	exact: HashMap<String, String>,
	patterns: Vec<PatternEntry>,
}

impl TranslationIndex {
	pub fn new(locale: impl Into<String>) -> Self {
		Self {
			locale: locale.into(),
			exact: HashMap::new(),
			patterns: Vec::new(),
		}
	}

	pub fn locale(&self) -> &str {
		&self.locale
	}

	/// Add a translation.
	///
	/// # Errors
	///
	/// Returns [`I18nError::Pattern`] when the phrase cannot be compiled into
	/// a pattern.
	pub fn add(&mut self, phrase: &str, translation: &str) -> Result<(), I18nError> {
		let source = split_placeholders(phrase);
		let target = split_placeholders(translation);

		if !source.iter().any(|piece| matches!(piece, Piece::Placeholder)) {
			self.exact.insert(join_text(&source), join_text(&target));
			return Ok(());
		}

		let mut pattern = String::new();
		for piece in &source {
			match piece {
				Piece::Text(text) => pattern.push_str(&regex::escape(text)),
				Piece::Placeholder => pattern.push_str("(.+)"),
			}
		}

		let mut replacement = String::new();
		let mut group = 0;
		for piece in &target {
			match piece {
				Piece::Text(text) => replacement.push_str(&text.replace('$', "$$")),
				Piece::Placeholder => {
					group += 1;
					replacement.push_str(&format!("${{{group}}}"));
				}
			}
		}

		let regex = Regex::new(&pattern).map_err(|source| I18nError::Pattern {
			phrase: phrase.to_string(),
			source,
		})?;
		self.patterns.push(PatternEntry { regex, replacement });
		Ok(())
	}

	/// Translation of `message`, if any entry matches.
	pub fn lookup(&self, message: &str) -> Option<String> {
		if let Some(translation) = self.exact.get(message) {
			return Some(translation.clone());
		}

		self.patterns
			.iter()
			.find(|entry| entry.regex.is_match(message))
			.map(|entry| {
				entry
					.regex
					.replace_all(message, entry.replacement.as_str())
					.into_owned()
			})
	}

	pub fn len(&self) -> usize {
		self.exact.len() + self.patterns.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[derive(Debug, PartialEq)]
enum Piece {
	Text(String),
	Placeholder,
}

fn split_placeholders(input: &str) -> Vec<Piece> {
	let mut pieces = Vec::new();
	let mut text = String::new();
	let mut chars = input.chars().peekable();

	while let Some(c) = chars.next() {
		if c != PLACEHOLDER {
			text.push(c);
		} else if chars.peek() == Some(&PLACEHOLDER) {
			chars.next();
			text.push(PLACEHOLDER);
		} else {
			if !text.is_empty() {
				pieces.push(Piece::Text(std::mem::take(&mut text)));
			}
			pieces.push(Piece::Placeholder);
		}
	}
	if !text.is_empty() {
		pieces.push(Piece::Text(text));
	}

	pieces
}

/// Text of a phrase without placeholders, with `%%` collapsed.
fn join_text(pieces: &[Piece]) -> String {
	pieces
		.iter()
		.map(|piece| match piece {
			Piece::Text(text) => text.as_str(),
			Piece::Placeholder => "",
		})
		.collect()
}
