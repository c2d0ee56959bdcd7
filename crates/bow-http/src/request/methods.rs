use std::collections::HashMap;

use super::Request;

impl Request {
	/// Returns true if the request was made over HTTPS.
	///
	/// Either the connection itself was TLS, or the request carries an
	/// `X-Forwarded-Proto: https` header set by a reverse proxy.
	pub fn is_secure(&self) -> bool {
		if self.is_secure {
			return true;
		}

		self.header("x-forwarded-proto")
			.is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
	}

	/// Returns the scheme of the request (http or https)
	pub fn scheme(&self) -> &str {
		if self.is_secure() { "https" } else { "http" }
	}

	/// Host the request was addressed to, from the `Host` header or the URI.
	pub fn host(&self) -> Option<&str> {
		self.header(hyper::header::HOST.as_str())
			.or_else(|| self.uri.authority().map(|a| a.as_str()))
	}

	/// Value of the named cookie.
	///
	/// Surrounding double quotes are stripped, as browsers may send them.
	pub fn cookie(&self, name: &str) -> Option<String> {
		self.headers
			.get_all(hyper::header::COOKIE)
			.iter()
			.filter_map(|value| value.to_str().ok())
			.flat_map(|header| header.split(';'))
			.filter_map(|pair| pair.trim().split_once('='))
			.find(|(key, _)| key.trim() == name)
			.map(|(_, value)| value.trim().trim_matches('"').to_string())
	}

	/// Returns true when the body is url-encoded form data.
	pub fn has_form_body(&self) -> bool {
		self.header(hyper::header::CONTENT_TYPE.as_str())
			.and_then(|ct| ct.split(';').next())
			.is_some_and(|mime| {
				mime.trim()
					.eq_ignore_ascii_case("application/x-www-form-urlencoded")
			})
	}

	/// Form values from the url-encoded body followed by the query string.
	///
	/// Body values come first for each key, so [`Request::form_value`] prefers
	/// them over query parameters of the same name. Malformed input yields no
	/// values rather than an error.
	pub fn form(&self) -> HashMap<String, Vec<String>> {
		let mut values: HashMap<String, Vec<String>> = HashMap::new();

		if self.has_form_body()
			&& let Ok(pairs) = serde_urlencoded::from_bytes::<Vec<(String, String)>>(self.body())
		{
			for (key, value) in pairs {
				values.entry(key).or_default().push(value);
			}
		}

		if let Some(query) = self.query()
			&& let Ok(pairs) = serde_urlencoded::from_str::<Vec<(String, String)>>(query)
		{
			for (key, value) in pairs {
				values.entry(key).or_default().push(value);
			}
		}

		values
	}

	/// First form value for `name`.
	pub fn form_value(&self, name: &str) -> Option<String> {
		self.form()
			.remove(name)
			.and_then(|values| values.into_iter().next())
	}
}
