use bow_http::Request;
use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

pub const MSG_BLANK: &str = "This field cannot be blank";
pub const MSG_INVALID: &str = "This field is invalid";
pub const MSG_INVALID_EMAIL: &str = "This field is not a valid email";
pub const MSG_INVALID_DATE: &str = "This field is not a valid date";
pub const MSG_INVALID_TIME: &str = "This field is not a valid time";
pub const MSG_INVALID_INTEGER: &str = "This field is not a valid integer";

static EMAIL_RE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Submitted form values and the validation errors found so far.
///
/// Every validator except [`Form::required`] ignores empty values, so
/// optional fields only need the checks for their format.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Form {
	#[serde(serialize_with = "first_values")]
	values: HashMap<String, Vec<String>>,
	errors: BTreeMap<String, Vec<String>>,
}

fn first_values<S: Serializer>(
	values: &HashMap<String, Vec<String>>,
	serializer: S,
) -> Result<S::Ok, S::Error> {
	let firsts: BTreeMap<&str, &str> = values
		.iter()
		.filter_map(|(key, vals)| vals.first().map(|v| (key.as_str(), v.as_str())))
		.collect();
	firsts.serialize(serializer)
}

impl Form {
	pub fn new(values: HashMap<String, Vec<String>>) -> Self {
		Self {
			values,
			errors: BTreeMap::new(),
		}
	}

	/// Form over the url-encoded body and query string of the request.
	pub fn from_request(request: &Request) -> Self {
		Self::new(request.form())
	}

	pub fn from_pairs<I, K, V>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let mut values: HashMap<String, Vec<String>> = HashMap::new();
		for (key, value) in pairs {
			values.entry(key.into()).or_default().push(value.into());
		}
		Self::new(values)
	}

	/// First value of the field, or an empty string.
	pub fn get(&self, field: &str) -> &str {
		self.values
			.get(field)
			.and_then(|vals| vals.first())
			.map(String::as_str)
			.unwrap_or("")
	}

	pub fn get_all(&self, field: &str) -> &[String] {
		self.values.get(field).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn values(&self) -> &HashMap<String, Vec<String>> {
		&self.values
	}

	/// First error message of the field
	pub fn error(&self, field: &str) -> Option<&str> {
		self.errors
			.get(field)
			.and_then(|msgs| msgs.first())
			.map(String::as_str)
	}

	pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
		&self.errors
	}

	pub fn is_valid(&self) -> bool {
		self.errors.is_empty()
	}

	/// Add an error for a field
	pub fn custom_error(&mut self, field: &str, msg: impl Into<String>) -> &mut Self {
		self.errors
			.entry(field.to_string())
			.or_default()
			.push(msg.into());
		self
	}

	/// Run `check` on the non-empty value of each field.
	fn check_each(&mut self, fields: &[&str], msg: &str, check: impl Fn(&str) -> bool) -> &mut Self {
		for field in fields {
			let value = self.get(field);
			if !value.is_empty() && !check(value) {
				self.custom_error(field, msg);
			}
		}
		self
	}

	/// Fields must be present and not blank
	pub fn required(&mut self, fields: &[&str]) -> &mut Self {
		for field in fields {
			if self.get(field).trim().is_empty() {
				self.custom_error(field, MSG_BLANK);
			}
		}
		self
	}

	/// At least `min` characters
	pub fn min_length(&mut self, field: &str, min: usize) -> &mut Self {
		let msg = format!("This field is too short (minimum is {min} characters)");
		self.check_each(&[field], &msg, |value| value.chars().count() >= min)
	}

	/// At most `max` characters
	pub fn max_length(&mut self, field: &str, max: usize) -> &mut Self {
		let msg = format!("This field is too long (maximum is {max} characters)");
		self.check_each(&[field], &msg, |value| value.chars().count() <= max)
	}

	pub fn permitted_values(&mut self, field: &str, permitted: &[&str]) -> &mut Self {
		self.check_each(&[field], MSG_INVALID, |value| permitted.contains(&value))
	}

	pub fn matches_pattern(&mut self, field: &str, pattern: &Regex) -> &mut Self {
		self.check_each(&[field], MSG_INVALID, |value| pattern.is_match(value))
	}

	pub fn is_email(&mut self, fields: &[&str]) -> &mut Self {
		self.check_each(fields, MSG_INVALID_EMAIL, |value| EMAIL_RE.is_match(value))
	}

	/// `YYYY-MM-DD`
	pub fn is_date(&mut self, fields: &[&str]) -> &mut Self {
		self.check_each(fields, MSG_INVALID_DATE, |value| {
			value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
		})
	}

	/// `HH:MM`, 24-hour clock
	pub fn is_time(&mut self, fields: &[&str]) -> &mut Self {
		self.check_each(fields, MSG_INVALID_TIME, |value| {
			value.len() == 5 && NaiveTime::parse_from_str(value, "%H:%M").is_ok()
		})
	}

	pub fn is_integer(&mut self, fields: &[&str]) -> &mut Self {
		self.check_each(fields, MSG_INVALID_INTEGER, |value| value.parse::<i64>().is_ok())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bow_http::Method;
	use rstest::rstest;

	#[rstest]
	#[case("", Some(MSG_BLANK))]
	#[case("   ", Some(MSG_BLANK))]
	#[case("x", None)]
	fn test_required(#[case] value: &str, #[case] expected: Option<&str>) {
		let mut form = Form::from_pairs([("name", value)]);
		form.required(&["name"]);
		assert_eq!(form.error("name"), expected);
	}

	#[rstest]
	fn test_required_missing_field() {
		let mut form = Form::default();
		form.required(&["name"]);
		assert_eq!(form.error("name"), Some(MSG_BLANK));
	}

	#[rstest]
	#[case("héllo", 5, None)]
	#[case("héll", 5, Some("This field is too short (minimum is 5 characters)"))]
	#[case("", 5, None)]
	fn test_min_length_counts_characters(
		#[case] value: &str,
		#[case] min: usize,
		#[case] expected: Option<&str>,
	) {
		let mut form = Form::from_pairs([("title", value)]);
		form.min_length("title", min);
		assert_eq!(form.error("title"), expected);
	}

	#[rstest]
	fn test_max_length() {
		let mut form = Form::from_pairs([("title", "ééé")]);
		form.max_length("title", 3);
		assert!(form.is_valid());
		form.max_length("title", 2);
		assert_eq!(
			form.error("title"),
			Some("This field is too long (maximum is 2 characters)")
		);
	}

	#[rstest]
	#[case("draft", true)]
	#[case("deleted", false)]
	fn test_permitted_values(#[case] value: &str, #[case] valid: bool) {
		let mut form = Form::from_pairs([("status", value)]);
		form.permitted_values("status", &["draft", "published"]);
		assert_eq!(form.is_valid(), valid);
	}

	#[rstest]
	fn test_matches_pattern() {
		let slug = Regex::new(r"^[a-z0-9-]+$").unwrap();
		let mut form = Form::from_pairs([("slug", "Not A Slug")]);
		form.matches_pattern("slug", &slug);
		assert_eq!(form.error("slug"), Some(MSG_INVALID));
	}

	#[rstest]
	#[case("ada@example.com", true)]
	#[case("ada@example", false)]
	#[case("ada example.com", false)]
	fn test_is_email(#[case] value: &str, #[case] valid: bool) {
		let mut form = Form::from_pairs([("email", value)]);
		form.is_email(&["email"]);
		assert_eq!(form.is_valid(), valid);
	}

	#[rstest]
	#[case("2024-02-29", true)]
	#[case("2023-02-29", false)]
	#[case("2024-2-9", false)]
	#[case("29/02/2024", false)]
	fn test_is_date(#[case] value: &str, #[case] valid: bool) {
		let mut form = Form::from_pairs([("day", value)]);
		form.is_date(&["day"]);
		assert_eq!(form.is_valid(), valid);
	}

	#[rstest]
	#[case("09:30", true)]
	#[case("23:59", true)]
	#[case("24:00", false)]
	#[case("9:30", false)]
	fn test_is_time(#[case] value: &str, #[case] valid: bool) {
		let mut form = Form::from_pairs([("at", value)]);
		form.is_time(&["at"]);
		assert_eq!(form.is_valid(), valid);
	}

	#[rstest]
	#[case("42", true)]
	#[case("-7", true)]
	#[case("4.2", false)]
	#[case("four", false)]
	fn test_is_integer(#[case] value: &str, #[case] valid: bool) {
		let mut form = Form::from_pairs([("n", value)]);
		form.is_integer(&["n"]);
		assert_eq!(form.is_valid(), valid);
	}

	#[rstest]
	fn test_errors_accumulate_per_field() {
		let mut form = Form::from_pairs([("code", "ab")]);
		form.min_length("code", 3).is_integer(&["code"]);

		assert_eq!(form.errors()["code"].len(), 2);
		assert_eq!(
			form.error("code"),
			Some("This field is too short (minimum is 3 characters)")
		);
	}

	#[rstest]
	fn test_from_request_reads_body() {
		let request = Request::builder()
			.method(Method::POST)
			.uri("/signup")
			.header("content-type", "application/x-www-form-urlencoded")
			.body("email=ada%40example.com&tags=a&tags=b")
			.build()
			.unwrap();

		let form = Form::from_request(&request);
		assert_eq!(form.get("email"), "ada@example.com");
		assert_eq!(form.get_all("tags"), ["a", "b"]);
		assert_eq!(form.get("missing"), "");
	}

	#[rstest]
	fn test_serializes_first_values_and_errors() {
		let mut form = Form::from_pairs([("title", ""), ("tag", "a"), ("tag", "b")]);
		form.required(&["title"]);

		let json = serde_json::to_value(&form).unwrap();
		assert_eq!(
			json,
			serde_json::json!({
				"values": { "title": "", "tag": "a" },
				"errors": { "title": [MSG_BLANK] }
			})
		);
	}
}
