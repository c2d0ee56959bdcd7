//! End-to-end tests of a `Core` built over an application tree on disk.

#![cfg(feature = "database")]

use bow::http::{
	Handler, Method, MiddlewareChain, Request, Response, Router, StatusCode, handler_fn, header,
};
use bow::{ConfigError, Core, CoreConfig, CoreError};
use rstest::{fixture, rstest};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing::Dispatch;

const SESSION_KEY: &[u8; 32] = b"0123456789abcdef0123456789abcdef";

// ============================================================================
// Fixtures
// ============================================================================

fn write(root: &Path, path: &str, body: &str) {
	let path = root.join(path);
	fs::create_dir_all(path.parent().unwrap()).unwrap();
	fs::write(path, body).unwrap();
}

#[fixture]
fn app_root() -> TempDir {
	let dir = TempDir::new().unwrap();
	let root = dir.path();

	write(
		root,
		"views/layouts/base.html",
		"<main>{% block content %}{% endblock content %}</main>",
	);
	write(
		root,
		"views/home.html",
		"{% block content %}{{ translate(msg=\"Hello\") }}|{{ lang() }}|{{ flash() }}|{{ csrf() }}{% endblock content %}",
	);
	write(root, "translations/fr_FR.csv", "Hello,Bonjour\n");
	write(
		root,
		"migrations/001_notes.sql",
		"CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL);",
	);
	write(root, "static/app.css", "body { color: black; }");

	dir
}

fn config(root: &Path) -> CoreConfig {
	CoreConfig::new(root)
		.with_session(SESSION_KEY)
		.with_translator("auto")
		.with_database(":memory:")
}

/// Router of a small application, wrapped in the standard chain.
fn app(core: &Core) -> MiddlewareChain {
	let views = core.views().clone();
	let home = handler_fn(move |req: Request| {
		let views = views.clone();
		async move { Ok(views.render(&req, StatusCode::OK, "home", &())) }
	});

	let flashing = core.clone();
	let flash = handler_fn(move |req: Request| {
		let core = flashing.clone();
		async move {
			core.flash(&req, "Saved")?;
			Ok(Response::new(StatusCode::SEE_OTHER).with_header("location", "/"))
		}
	});

	let delete = handler_fn(|req: Request| async move {
		let id = req.path_param("id").unwrap_or_default();
		Ok(Response::ok().with_body(format!("deleted {id}")))
	});

	let dynamic = core.dyn_chain();
	let router = Router::new()
		.mount("/static/", Arc::new(core.file_server()))
		.route(Method::GET, "/", Arc::new(dynamic.then(Arc::new(home))))
		.route(Method::GET, "/flash", Arc::new(dynamic.then(Arc::new(flash))))
		.route(Method::DELETE, "/notes/{id}", Arc::new(dynamic.then(Arc::new(delete))))
		.function(Method::GET, "/panic", |req: Request| async move {
			if req.path() == "/panic" {
				panic!("handler exploded");
			}
			Ok(Response::ok())
		});

	core.std_chain().then(Arc::new(router))
}

fn get(uri: &str, cookies: &[&str]) -> Request {
	let mut builder = Request::builder().uri(uri);
	if !cookies.is_empty() {
		builder = builder.header("cookie", &cookies.join("; "));
	}
	builder.build().unwrap()
}

/// `name=value` pair of the named Set-Cookie header.
fn cookie(response: &Response, name: &str) -> Option<String> {
	let prefix = format!("{name}=");
	response
		.headers
		.get_all(header::SET_COOKIE)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.find(|value| value.starts_with(&prefix))
		.and_then(|value| value.split(';').next())
		.map(str::to_string)
}

/// Fields of the rendered home page: greeting, lang, flash, csrf token.
fn home_fields(response: &Response) -> Vec<String> {
	let body = response.body_str();
	body.trim_start_matches("<main>")
		.trim_end_matches("</main>")
		.split('|')
		.map(str::to_string)
		.collect()
}

// ============================================================================
// Startup
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_new_sets_up_configured_subsystems(app_root: TempDir) {
	let core = Core::new(config(app_root.path())).await.unwrap();

	assert!(core.sessions().is_some());
	assert!(core.translator().unwrap().has_locale("fr_FR"));
	assert_eq!(core.views().registry().page_names().collect::<Vec<_>>(), vec!["home"]);

	let db = core.db().unwrap();
	let notes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes")
		.fetch_one(db.pool())
		.await
		.unwrap();
	assert_eq!(notes, 0);

	core.close().await;
}

#[rstest]
#[tokio::test]
async fn test_new_without_options(app_root: TempDir) {
	let core = Core::new(CoreConfig::new(app_root.path())).await.unwrap();

	assert!(core.sessions().is_none());
	assert!(core.translator().is_none());
	assert!(core.db().is_none());
}

#[rstest]
#[tokio::test]
async fn test_new_rejects_short_session_key(app_root: TempDir) {
	let config = CoreConfig::new(app_root.path()).with_session(b"too short");
	let error = Core::new(config).await.unwrap_err();

	assert!(matches!(
		error,
		CoreError::Config(ConfigError::SessionKeyLength(9))
	));
}

#[rstest]
#[tokio::test]
async fn test_new_requires_views_dir() {
	let dir = TempDir::new().unwrap();
	let error = Core::new(CoreConfig::new(dir.path())).await.unwrap_err();

	assert!(matches!(error, CoreError::Views(_)));
}

#[rstest]
#[tokio::test]
async fn test_new_rejects_bad_translation_file(app_root: TempDir) {
	write(app_root.path(), "translations/english.csv", "Hello,Hello\n");
	let error = Core::new(config(app_root.path())).await.unwrap_err();

	assert!(matches!(error, CoreError::Translations(_)));
}

#[rstest]
#[tokio::test]
async fn test_new_fails_on_broken_migration(app_root: TempDir) {
	write(app_root.path(), "migrations/002_broken.sql", "CREATE TABL oops;");
	let error = Core::new(config(app_root.path())).await.unwrap_err();

	assert!(matches!(
		error,
		CoreError::Database(bow::db::DbError::Migration { ref name, .. })
			if name.ends_with("002_broken.sql")
	));
}

#[rstest]
#[tokio::test]
async fn test_new_from_toml_file(app_root: TempDir) {
	write(
		app_root.path(),
		"bow.toml",
		"root = \".\"\nsession_key = \"0123456789abcdef0123456789abcdef\"\ntranslator_locale = \"fr_FR\"\n",
	);
	let config = CoreConfig::from_toml_file(app_root.path().join("bow.toml")).unwrap();
	let core = Core::new(config).await.unwrap();

	let response = app(&core).handle(get("/", &[])).await.unwrap();
	let fields = home_fields(&response);
	assert_eq!(fields[0], "Bonjour");
	assert_eq!(fields[1], "fr");
}

// ============================================================================
// Standard chain
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_secure_headers_include_extra_csp(app_root: TempDir) {
	let config = config(app_root.path()).with_csp([("img-src", "'self' data:")]);
	let core = Core::new(config).await.unwrap();

	let response = app(&core).handle(get("/", &[])).await.unwrap();

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(
		response.header("content-security-policy"),
		Some("default-src 'self'; img-src 'self' data:")
	);
	assert_eq!(response.header("x-frame-options"), Some("deny"));
	assert_eq!(response.header("x-content-type-options"), Some("nosniff"));
	assert_eq!(response.header("referrer-policy"), Some("origin-when-cross-origin"));
}

#[rstest]
#[tokio::test]
async fn test_panics_become_server_errors(app_root: TempDir) {
	let core = Core::new(config(app_root.path())).await.unwrap();

	let response = app(&core).handle(get("/panic", &[])).await.unwrap();

	assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(response.header("connection"), Some("close"));
	assert_eq!(response.body_str(), "Internal Server Error\n");
}

#[rstest]
#[tokio::test]
async fn test_unknown_route_is_not_found(app_root: TempDir) {
	let core = Core::new(config(app_root.path())).await.unwrap();

	let response = app(&core).handle(get("/nowhere", &[])).await.unwrap();

	assert_eq!(response.status, StatusCode::NOT_FOUND);
	assert_eq!(response.body_str(), "Not Found\n");
}

#[rstest]
#[tokio::test]
async fn test_logger_receives_startup_and_request_events(app_root: TempDir) {
	let captured = Captured::default();
	let subscriber = tracing_subscriber::fmt()
		.with_writer(captured.clone())
		.with_ansi(false)
		.finish();

	let config = config(app_root.path()).with_logger(Dispatch::new(subscriber));
	let core = Core::new(config).await.unwrap();
	app(&core).handle(get("/", &[])).await.unwrap();

	let output = captured.output();
	assert!(output.contains("views loaded"), "{output}");
	assert!(output.contains("method=GET"), "{output}");
	assert!(output.contains("status=200"), "{output}");
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
	fn output(&self) -> String {
		String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
	}
}

impl std::io::Write for Captured {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		self.0.lock().unwrap().extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())
	}
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Captured {
	type Writer = Captured;

	fn make_writer(&'a self) -> Self::Writer {
		self.clone()
	}
}

// ============================================================================
// Dynamic chain
// ============================================================================

#[rstest]
#[case(&["accept-language: fr-FR"], "Bonjour", "fr")]
#[case(&[], "Hello", "en")]
#[tokio::test]
async fn test_home_is_localized(
	app_root: TempDir,
	#[case] headers: &[&str],
	#[case] greeting: &str,
	#[case] lang: &str,
) {
	let core = Core::new(config(app_root.path())).await.unwrap();

	let mut builder = Request::builder().uri("/");
	for line in headers {
		let (name, value) = line.split_once(": ").unwrap();
		builder = builder.header(name, value);
	}
	let response = app(&core).handle(builder.build().unwrap()).await.unwrap();
	let fields = home_fields(&response);

	assert_eq!(fields[0], greeting);
	assert_eq!(fields[1], lang);
	assert_eq!(fields[3].len(), 64);
	assert!(cookie(&response, "csrf_token").is_some());
	assert!(
		response
			.headers
			.get_all(header::VARY)
			.iter()
			.any(|v| v == "Cookie")
	);
}

#[rstest]
#[tokio::test]
async fn test_flash_is_shown_once(app_root: TempDir) {
	let core = Core::new(config(app_root.path())).await.unwrap();
	let app = app(&core);

	let response = app.handle(get("/flash", &[])).await.unwrap();
	assert_eq!(response.status, StatusCode::SEE_OTHER);
	let session = cookie(&response, "session").unwrap();

	let response = app.handle(get("/", &[session.as_str()])).await.unwrap();
	assert_eq!(home_fields(&response)[2], "Saved");
	let session = cookie(&response, "session").unwrap();

	let response = app.handle(get("/", &[session.as_str()])).await.unwrap();
	assert_eq!(home_fields(&response)[2], "");
}

#[rstest]
#[tokio::test]
async fn test_flash_requires_sessions(app_root: TempDir) {
	let core = Core::new(CoreConfig::new(app_root.path())).await.unwrap();
	let request = get("/", &[]);

	let error = core.flash(&request, "Saved").unwrap_err();
	assert!(matches!(error, bow::http::Error::Session(_)));
}

#[rstest]
#[tokio::test]
async fn test_unsafe_method_requires_csrf_token(app_root: TempDir) {
	let core = Core::new(config(app_root.path())).await.unwrap();

	let request = Request::builder()
		.method(Method::DELETE)
		.uri("/notes/4")
		.build()
		.unwrap();
	let response = app(&core).handle(request).await.unwrap();

	assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[rstest]
#[tokio::test]
async fn test_method_override_with_csrf_token(app_root: TempDir) {
	let core = Core::new(config(app_root.path())).await.unwrap();
	let app = app(&core);

	let page = app.handle(get("/", &[])).await.unwrap();
	let csrf_cookie = cookie(&page, "csrf_token").unwrap();
	let token = home_fields(&page)[3].clone();

	let request = Request::builder()
		.method(Method::POST)
		.uri("/notes/4")
		.header("cookie", &csrf_cookie)
		.header("content-type", "application/x-www-form-urlencoded")
		.body(format!("_method=DELETE&csrf_token={token}"))
		.build()
		.unwrap();
	let response = app.handle(request).await.unwrap();

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(response.body_str(), "deleted 4");
}

// ============================================================================
// Static files
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_hashed_static_file_is_immutable(app_root: TempDir) {
	let core = Core::new(config(app_root.path())).await.unwrap();
	let hashed = core.files().hash_name("static/app.css");

	let response = app(&core).handle(get(&format!("/{hashed}"), &[])).await.unwrap();

	assert_eq!(response.status, StatusCode::OK);
	assert_eq!(response.body_str(), "body { color: black; }");
	assert_eq!(
		response.header("cache-control"),
		Some(bow::files::CACHE_CONTROL_IMMUTABLE)
	);
}
