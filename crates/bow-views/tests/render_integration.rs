//! Rendering tests against a template tree on disk.

use bow_http::{Request, StatusCode};
use bow_views::tera;
use bow_views::{
	FunctionCatalog, STREAM_CONTENT_TYPE, StreamAction, Value, ViewError, Views, with_layout,
};
use rstest::{fixture, rstest};
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ============================================================================
// Fixtures
// ============================================================================

fn write(root: &Path, path: &str, body: &str) {
	let path = root.join(path);
	fs::create_dir_all(path.parent().unwrap()).unwrap();
	fs::write(path, body).unwrap();
}

fn echo_catalog() -> FunctionCatalog {
	let mut catalog = FunctionCatalog::new();
	catalog.register("site", |_: &HashMap<String, Value>| -> tera::Result<Value> {
		Ok(Value::from("bow"))
	});
	catalog.register_request("echo", |request: &Request| {
		let token = request.header("x-token").unwrap_or_default().to_string();
		move |_: &HashMap<String, Value>| -> tera::Result<Value> { Ok(Value::from(token.clone())) }
	});
	catalog
}

/// Application root with layouts, pages and partials.
#[fixture]
fn app_root() -> TempDir {
	let dir = TempDir::new().unwrap();
	let root = dir.path();

	write(
		root,
		"views/layouts/base.html",
		"<main data-layout=\"{{ layout }}\">{% block content %}{% endblock content %}</main>",
	);
	write(
		root,
		"views/layouts/admin.html",
		"<admin>{% block content %}{% endblock content %}</admin>",
	);
	write(root, "views/home.html", "{% block content %}Hello {{ name }}{% endblock content %}");
	write(root, "views/echo.html", "{% block content %}{{ echo() }}{% endblock content %}");
	write(root, "views/site.html", "{% block content %}{{ site() }}{% endblock content %}");
	write(
		root,
		"views/users/index.html",
		"{% block content %}<ul>{% for user in users %}{{ partial(name=\"users/row\", data=user) }}{% endfor %}</ul>{% endblock content %}",
	);
	write(root, "views/users/_row.html", "<li>{{ name }}</li>");
	write(root, "views/broken.html", "{% block content %}{{ missing_helper() }}{% endblock content %}");

	dir
}

#[fixture]
fn views(app_root: TempDir) -> (TempDir, Views) {
	let views = Views::load(app_root.path(), echo_catalog(), false).unwrap();
	(app_root, views)
}

fn request() -> Request {
	Request::builder().uri("/").build().unwrap()
}

// ============================================================================
// Pages and layouts
// ============================================================================

#[rstest]
fn test_page_renders_in_default_layout(views: (TempDir, Views)) {
	let (_dir, views) = views;

	let response = views.render(&request(), StatusCode::CREATED, "home", &json!({ "name": "Ada" }));

	assert_eq!(response.status, StatusCode::CREATED);
	assert_eq!(response.header("content-type"), Some("text/html"));
	assert_eq!(response.body_str(), "<main data-layout=\"base\">Hello Ada</main>");
}

#[rstest]
fn test_page_renders_in_selected_layout(views: (TempDir, Views)) {
	let (_dir, views) = views;
	let request = with_layout(request(), "admin");

	let response = views.render(&request, StatusCode::OK, "home", &json!({ "name": "Ada" }));

	assert_eq!(response.body_str(), "<admin>Hello Ada</admin>");
}

#[rstest]
fn test_unknown_layout_is_server_error(views: (TempDir, Views)) {
	let (_dir, views) = views;
	let request = with_layout(request(), "print");

	let error = views
		.try_render(&request, StatusCode::OK, "home", &json!({}))
		.unwrap_err();

	assert!(matches!(error, ViewError::LayoutNotFound { ref layout, .. } if layout == "print"));
}

#[rstest]
fn test_unknown_page_never_writes_body(views: (TempDir, Views)) {
	let (_dir, views) = views;

	let error = views
		.try_render(&request(), StatusCode::OK, "nope", &json!({}))
		.unwrap_err();
	assert!(matches!(error, ViewError::PageNotFound(ref name) if name == "nope"));

	let response = views.render(&request(), StatusCode::OK, "nope", &json!({}));
	assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(response.body_str(), "Internal Server Error\n");
}

#[rstest]
fn test_execution_error_is_server_error(views: (TempDir, Views)) {
	let (_dir, views) = views;

	let error = views
		.try_render(&request(), StatusCode::OK, "broken", &json!({}))
		.unwrap_err();
	assert!(matches!(error, ViewError::Execution { ref name, .. } if name == "broken"));

	let response = views.render(&request(), StatusCode::OK, "broken", &json!({}));
	assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
	assert!(!response.body_str().contains("<main"));
}

// ============================================================================
// Partials
// ============================================================================

#[rstest]
fn test_partial_renders_standalone(views: (TempDir, Views)) {
	let (_dir, views) = views;
	let request = with_layout(request(), "admin");

	let response = views.render(&request, StatusCode::ACCEPTED, "users/row", &json!({ "name": "x" }));

	assert_eq!(response.status, StatusCode::ACCEPTED);
	assert_eq!(response.body_str(), "<li>x</li>");
}

#[rstest]
fn test_partial_helper_escapes_once(views: (TempDir, Views)) {
	let (_dir, views) = views;
	let data = json!({ "users": [{ "name": "a" }, { "name": "<b>" }] });

	let body = views.render_to_string(&request(), "users/index", &data).unwrap();

	assert_eq!(
		body,
		"<main data-layout=\"base\"><ul><li>a</li><li>&lt;b&gt;</li></ul></main>"
	);
}

// ============================================================================
// Helpers
// ============================================================================

#[rstest]
fn test_static_helper(views: (TempDir, Views)) {
	let (_dir, views) = views;

	let body = views.render_to_string(&request(), "site", &json!({})).unwrap();

	assert_eq!(body, "<main data-layout=\"base\">bow</main>");
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_renders_never_share_helpers(views: (TempDir, Views)) {
	let (_dir, views) = views;

	let tasks: Vec<_> = (0..64)
		.map(|i| {
			let views = views.clone();
			tokio::spawn(async move {
				let token = format!("token-{i}");
				let request = Request::builder()
					.uri("/echo")
					.header("x-token", &token)
					.build()
					.unwrap();
				let response = views.render(&request, StatusCode::OK, "echo", &json!({}));
				(token, response.body_str().into_owned())
			})
		})
		.collect();

	for task in tasks {
		let (token, body) = task.await.unwrap();
		assert_eq!(body, format!("<main data-layout=\"base\">{token}</main>"));
	}
}

// ============================================================================
// Stream fragments
// ============================================================================

#[rstest]
fn test_stream_remove_skips_partial_lookup(views: (TempDir, Views)) {
	let (_dir, views) = views;

	let response = views
		.try_render_stream(&request(), StreamAction::Remove, "row-1", "does/not/exist", &json!({}))
		.unwrap();

	assert_eq!(response.header("content-type"), Some(STREAM_CONTENT_TYPE));
	assert_eq!(
		response.body_str(),
		"<turbo-stream action=\"remove\" target=\"row-1\">\n  <template>\n    \n  </template>\n</turbo-stream>"
	);
}

#[rstest]
fn test_stream_wraps_partial(views: (TempDir, Views)) {
	let (_dir, views) = views;

	let response = views.render_stream(
		&request(),
		StreamAction::Append,
		"users",
		"users/row",
		&json!({ "name": "Ada" }),
	);

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(
		response.body_str(),
		"<turbo-stream action=\"append\" target=\"users\">\n  <template>\n    <li>Ada</li>\n  </template>\n</turbo-stream>"
	);
}

#[rstest]
fn test_stream_unknown_partial(views: (TempDir, Views)) {
	let (_dir, views) = views;

	let error = views
		.try_render_stream(&request(), StreamAction::Update, "users", "users/nope", &json!({}))
		.unwrap_err();

	assert!(matches!(error, ViewError::PartialNotFound(_)));
}
