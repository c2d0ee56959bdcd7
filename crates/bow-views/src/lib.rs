//! Server-rendered views.
//!
//! Templates live under `<root>/views` and are classified once at startup:
//!
//! - files whose name starts with `_` are **partials**, compiled standalone;
//! - files below `views/layouts/` are **layouts**;
//! - everything else is a **page**, compiled together with every layout so
//!   the layout can be chosen per request.
//!
//! Rendering clones the compiled page, binds the request-scoped helpers of the
//! [`FunctionCatalog`] to the current request and executes the selected layout
//! into a buffer. Nothing reaches the response unless execution succeeded.
//!
//! ```rust,no_run
//! use bow_http::{Request, StatusCode};
//! use bow_views::{FunctionCatalog, Views};
//! use serde_json::json;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let views = Views::load("./app", FunctionCatalog::new(), false)?;
//! let request = Request::builder().uri("/").build()?;
//! let response = views.render(&request, StatusCode::OK, "home", &json!({ "name": "Ada" }));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod functions;
pub mod layout;
pub mod registry;
pub mod renderer;
pub mod stream;

pub use error::ViewError;
pub use functions::{FunctionCatalog, Helper, optional_arg, required_arg};
pub use layout::{ApplyLayout, DEFAULT_LAYOUT, RenderContext, with_layout};
pub use registry::{CompiledTemplate, TemplateKind, TemplateSource, ViewRegistry};
pub use renderer::{HTML_CONTENT_TYPE, Views, diagnostic_trace};
pub use stream::{ParseStreamActionError, STREAM_CONTENT_TYPE, StreamAction, accepts_stream};

pub use tera;
pub use tera::{Function, Value};
