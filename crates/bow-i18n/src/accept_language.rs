//! `Accept-Language` header parsing.

/// Language tags of an `Accept-Language` header, highest weight first.
///
/// Entries weighted `q=0` are dropped and entries with equal weight keep
/// their order. A malformed weight invalidates the whole header.
///
/// # Examples
///
/// ```
/// use bow_i18n::parse_accept_language;
///
/// assert_eq!(
///     parse_accept_language("en;q=0.5, fr-FR, de;q=0"),
///     vec!["fr-FR", "en"]
/// );
/// ```
pub fn parse_accept_language(header: &str) -> Vec<String> {
	let mut entries: Vec<(&str, f32)> = Vec::new();

	for entry in header.split(',') {
		let mut params = entry.split(';');
		let tag = params.next().unwrap_or_default().trim();
		let mut weight = 1.0_f32;

		for param in params {
			if let Some(value) = param.trim().strip_prefix("q=") {
				match value.trim().parse::<f32>() {
					Ok(w) => weight = w,
					Err(_) => return Vec::new(),
				}
			}
		}

		if tag.is_empty() || tag == "*" || weight <= 0.0 {
			continue;
		}
		entries.push((tag, weight));
	}

	entries.sort_by(|a, b| b.1.total_cmp(&a.1));
	entries.into_iter().map(|(tag, _)| tag.to_string()).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("fr", vec!["fr"])]
	#[case("en;q=0.9, fr", vec!["fr", "en"])]
	#[case("da, en-GB;q=0.8, en;q=0.7", vec!["da", "en-GB", "en"])]
	#[case("de;q=0.5, it;q=0.5, es", vec!["es", "de", "it"])]
	#[case("fr;q=0, *;q=0.1", vec![])]
	#[case("fr;q=abc, en", vec![])]
	#[case("", vec![])]
	fn test_parse(#[case] header: &str, #[case] expected: Vec<&str>) {
		assert_eq!(parse_accept_language(header), expected);
	}
}
