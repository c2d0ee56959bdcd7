use crate::hashed::{content_hash, parse_name};
use async_trait::async_trait;
use bow_http::{Handler, Method, Request, Response, Result, StatusCode, header};
use percent_encoding::percent_decode_str;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Directory below the application root served by [`FileServer`]
pub const STATIC_DIR: &str = "static";

/// Cache policy for responses whose name carries the current content hash
pub const CACHE_CONTROL_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Serves files below `<root>/static` by plain or hashed name.
///
/// The percent-decoded request path is taken relative to the root, so `/static/app-<hash>.css`
/// serves `<root>/static/app.css`. A hash equal to the current content hash
/// makes the response cacheable forever with an `ETag`; a stale or missing
/// hash still serves the file, without those headers.
#[derive(Debug, Clone)]
pub struct FileServer {
	root: PathBuf,
	dir: String,
}

impl FileServer {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			dir: STATIC_DIR.to_string(),
		}
	}

	/// Serve another directory below the root instead of `static`
	pub fn with_dir(mut self, dir: &str) -> Self {
		self.dir = dir.trim_matches('/').to_string();
		self
	}

	/// Relative path of a decoded request path, if it stays inside the
	/// served directory.
	fn resolve(&self, name: &str) -> Option<PathBuf> {
		if name.contains('\0') {
			return None;
		}
		let path = Path::new(name);
		let mut components = path.components();

		match components.next() {
			Some(Component::Normal(first)) if first == self.dir.as_str() => {}
			_ => return None,
		}
		if !components.all(|c| matches!(c, Component::Normal(_))) {
			return None;
		}

		Some(self.root.join(path))
	}
}

fn not_found() -> Response {
	Response::text_error(StatusCode::NOT_FOUND, "Not Found")
}

#[async_trait]
impl Handler for FileServer {
	async fn handle(&self, request: Request) -> Result<Response> {
		if request.method != Method::GET && request.method != Method::HEAD {
			return Ok(Response::text_error(
				StatusCode::METHOD_NOT_ALLOWED,
				"Method Not Allowed",
			)
			.with_header(header::ALLOW.as_str(), "GET, HEAD"));
		}

		let Ok(decoded) = percent_decode_str(request.path()).decode_utf8() else {
			return Ok(not_found());
		};
		let (name, hash) = parse_name(decoded.trim_start_matches('/'));
		let Some(path) = self.resolve(&name) else {
			return Ok(not_found());
		};

		let content = match tokio::fs::read(&path).await {
			Ok(content) => content,
			Err(err) if err.kind() == ErrorKind::NotFound => return Ok(not_found()),
			Err(_) if path.is_dir() => {
				return Ok(Response::text_error(StatusCode::FORBIDDEN, "Forbidden"));
			}
			Err(err) => return Err(err.into()),
		};

		let content_type = mime_guess::from_path(&path)
			.first_or_octet_stream()
			.to_string();
		let mut response = Response::ok().with_content_type(&content_type);

		if let Some(hash) = hash
			&& hash.eq_ignore_ascii_case(&content_hash(&content))
		{
			let etag = format!("\"{}\"", hash);
			response = response
				.with_header(header::CACHE_CONTROL.as_str(), CACHE_CONTROL_IMMUTABLE)
				.with_header(header::ETAG.as_str(), &etag);

			if request.header(header::IF_NONE_MATCH.as_str()) == Some(etag.as_str()) {
				response.status = StatusCode::NOT_MODIFIED;
				return Ok(response);
			}
		}

		if request.method == Method::HEAD {
			return Ok(response.with_header(
				header::CONTENT_LENGTH.as_str(),
				&content.len().to_string(),
			));
		}

		Ok(response.with_body(content))
	}
}
