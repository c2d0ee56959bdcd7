//! Stream fragments for partial page updates.
//!
//! A fragment wraps a rendered partial in a `<turbo-stream>` envelope that
//! tells the client which element to change and how.

use std::fmt;
use std::str::FromStr;

use bow_http::{Request, Response, header};
use serde::Serialize;
use tera::{Context, Tera};

use crate::{ViewError, Views};

pub const STREAM_CONTENT_TYPE: &str = "text/vnd.turbo-stream.html";

const ENVELOPE: &str = "<turbo-stream action=\"{{ action }}\" target=\"{{ target }}\">
  <template>
    {{ content | safe }}
  </template>
</turbo-stream>";

/// What the client does with a fragment's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamAction {
	Append,
	Prepend,
	Replace,
	Update,
	Remove,
	Before,
	After,
}

impl StreamAction {
	pub const ALL: [StreamAction; 7] = [
		StreamAction::Append,
		StreamAction::Prepend,
		StreamAction::Replace,
		StreamAction::Update,
		StreamAction::Remove,
		StreamAction::Before,
		StreamAction::After,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			StreamAction::Append => "append",
			StreamAction::Prepend => "prepend",
			StreamAction::Replace => "replace",
			StreamAction::Update => "update",
			StreamAction::Remove => "remove",
			StreamAction::Before => "before",
			StreamAction::After => "after",
		}
	}
}

impl fmt::Display for StreamAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stream action: {0}")]
pub struct ParseStreamActionError(String);

impl FromStr for StreamAction {
	type Err = ParseStreamActionError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		StreamAction::ALL
			.into_iter()
			.find(|action| action.as_str() == s)
			.ok_or_else(|| ParseStreamActionError(s.to_string()))
	}
}

/// Whether the client listed the stream content type in its `Accept` header.
pub fn accepts_stream(request: &Request) -> bool {
	request
		.headers
		.get_all(header::ACCEPT)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.any(|value| value.contains(STREAM_CONTENT_TYPE))
}

impl Views {
	/// Render a partial as a stream fragment, turning failures into a server
	/// error response.
	pub fn render_stream<T>(
		&self,
		request: &Request,
		action: StreamAction,
		target: &str,
		name: &str,
		data: &T,
	) -> Response
	where
		T: Serialize + ?Sized,
	{
		self.try_render_stream(request, action, target, name, data)
			.unwrap_or_else(|error| self.server_error(&error))
	}

	/// Render a partial as a stream fragment.
	///
	/// [`StreamAction::Remove`] carries no content, so the partial is not
	/// looked up at all.
	pub fn try_render_stream<T>(
		&self,
		request: &Request,
		action: StreamAction,
		target: &str,
		name: &str,
		data: &T,
	) -> Result<Response, ViewError>
	where
		T: Serialize + ?Sized,
	{
		let content = match action {
			StreamAction::Remove => String::new(),
			_ => self.render_partial(request, name, data)?,
		};

		let mut context = Context::new();
		context.insert("action", action.as_str());
		context.insert("target", target);
		context.insert("content", &content);

		let body = Tera::one_off(ENVELOPE, &context, true).map_err(|source| ViewError::Execution {
			name: format!("stream:{name}"),
			source,
		})?;

		Ok(Response::ok()
			.with_content_type(STREAM_CONTENT_TYPE)
			.with_body(body))
	}
}
