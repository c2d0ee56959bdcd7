use std::path::PathBuf;

/// Errors raised while loading or rendering views.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
	#[error("failed to walk views directory: {0}")]
	Walk(#[from] walkdir::Error),

	#[error("failed to read template {path}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse template {name}")]
	Parse {
		name: String,
		#[source]
		source: tera::Error,
	},

	#[error("page {0} not found")]
	PageNotFound(String),

	#[error("partial {0} not found")]
	PartialNotFound(String),

	#[error("layout {layout} not found for page {page}")]
	LayoutNotFound { layout: String, page: String },

	#[error("failed to execute template {name}")]
	Execution {
		name: String,
		#[source]
		source: tera::Error,
	},

	#[error("invalid template data: {0}")]
	Data(String),
}

impl ViewError {
	/// Returns true for lookups of pages, partials or layouts that do not exist.
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			ViewError::PageNotFound(_)
				| ViewError::PartialNotFound(_)
				| ViewError::LayoutNotFound { .. }
		)
	}
}
