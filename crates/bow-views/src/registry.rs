//! Template discovery and compilation.

use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path};

use tera::Tera;
use walkdir::WalkDir;

use crate::ViewError;
use crate::functions::{FunctionCatalog, placeholder};

pub const VIEWS_DIR: &str = "views";
pub const LAYOUTS_DIR: &str = "layouts";
pub const PARTIAL_PREFIX: char = '_';
pub const TEMPLATE_EXTENSION: &str = "html";

/// Name of the built-in helper that renders a partial from inside a template.
pub const PARTIAL_FUNCTION: &str = "partial";

/// Page source compiled on its own so syntax errors surface even without layouts.
/// Names starting with `_` always classify as partials, so this never collides.
const PAGE_ENTRY: &str = "__page__";

/// Kind of a template, decided once from its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
	Page,
	Layout,
	Partial,
}

/// A discovered template file, before compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
	pub kind: TemplateKind,
	pub name: String,
	pub source: String,
}

impl TemplateSource {
	/// Classify `path` (relative to the application root) and pair it with its source.
	pub fn from_path(path: &Path, source: impl Into<String>) -> Option<Self> {
		let (kind, name) = classify(path)?;
		Some(Self {
			kind,
			name,
			source: source.into(),
		})
	}
}

/// Classify a template path relative to the application root.
///
/// Returns `None` for files outside `views/` or without the `.html`
/// extension.
///
/// # Examples
///
/// ```
/// use bow_views::TemplateKind;
/// use bow_views::registry::classify;
/// use std::path::Path;
///
/// assert_eq!(
///     classify(Path::new("views/layouts/base.html")),
///     Some((TemplateKind::Layout, "base".to_string()))
/// );
/// assert_eq!(
///     classify(Path::new("views/users/_row.html")),
///     Some((TemplateKind::Partial, "users/row".to_string()))
/// );
/// ```
pub fn classify(path: &Path) -> Option<(TemplateKind, String)> {
	let mut segments = Vec::new();
	for component in path.components() {
		match component {
			Component::Normal(segment) => segments.push(segment.to_str()?),
			Component::CurDir => {}
			_ => return None,
		}
	}

	let (file, dirs) = segments.split_last()?;
	let (root, dirs) = dirs.split_first()?;
	if *root != VIEWS_DIR {
		return None;
	}

	let stem = file.strip_suffix(TEMPLATE_EXTENSION)?.strip_suffix('.')?;

	let (kind, stem, dirs) = if let Some(stem) = stem.strip_prefix(PARTIAL_PREFIX) {
		(TemplateKind::Partial, stem, dirs)
	} else if let Some((first, rest)) = dirs.split_first()
		&& *first == LAYOUTS_DIR
	{
		(TemplateKind::Layout, stem, rest)
	} else {
		(TemplateKind::Page, stem, dirs)
	};

	if stem.is_empty() {
		return None;
	}

	let mut name = dirs.join("/");
	if !name.is_empty() {
		name.push('/');
	}
	name.push_str(stem);

	Some((kind, name))
}

/// A compiled page or partial together with the layouts its tree contains.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
	kind: TemplateKind,
	name: String,
	tera: Tera,
	layouts: BTreeSet<String>,
}

impl CompiledTemplate {
	pub fn kind(&self) -> TemplateKind {
		self.kind
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn has_layout(&self, layout: &str) -> bool {
		self.layouts.contains(layout)
	}

	pub fn layouts(&self) -> impl Iterator<Item = &str> {
		self.layouts.iter().map(String::as_str)
	}

	/// Compiled template tree. Renders must clone it before binding helpers.
	pub(crate) fn tera(&self) -> &Tera {
		&self.tera
	}
}

/// Every page and partial of an application, compiled once at startup.
#[derive(Debug, Default)]
pub struct ViewRegistry {
	pages: HashMap<String, CompiledTemplate>,
	partials: HashMap<String, CompiledTemplate>,
	layouts: BTreeSet<String>,
}

impl ViewRegistry {
	/// Discover and compile the templates under `<root>/views`.
	pub fn load(root: &Path, catalog: &FunctionCatalog) -> Result<Self, ViewError> {
		Self::compile(discover(root)?, catalog)
	}

	/// Compile already discovered templates.
	///
	/// # Errors
	///
	/// Returns [`ViewError::Parse`] naming the first template whose source
	/// does not parse. Layouts are reported as `layouts/<name>`.
	pub fn compile(sources: Vec<TemplateSource>, catalog: &FunctionCatalog) -> Result<Self, ViewError> {
		let mut layouts = Vec::new();
		let mut pages = Vec::new();
		let mut partials = Vec::new();

		for source in sources {
			match source.kind {
				TemplateKind::Layout => layouts.push(source),
				TemplateKind::Page => pages.push(source),
				TemplateKind::Partial => partials.push(source),
			}
		}

		for layout in &layouts {
			new_tree(catalog)
				.add_raw_template(&layout_key(&layout.name), &layout.source)
				.map_err(|source| ViewError::Parse {
					name: layout_key(&layout.name),
					source,
				})?;
		}

		let layout_names: BTreeSet<String> = layouts.iter().map(|l| l.name.clone()).collect();
		let mut registry = ViewRegistry {
			layouts: layout_names.clone(),
			..Default::default()
		};

		for page in pages {
			let mut templates: Vec<(String, String)> = layouts
				.iter()
				.map(|layout| (layout_key(&layout.name), layout.source.clone()))
				.collect();
			templates.push((PAGE_ENTRY.to_string(), page.source.clone()));
			templates.extend(layouts.iter().map(|layout| {
				(
					layout.name.clone(),
					format!("{{% extends \"{}\" %}}{}", layout_key(&layout.name), page.source),
				)
			}));

			let mut tera = new_tree(catalog);
			tera.add_raw_templates(templates)
				.map_err(|source| ViewError::Parse {
					name: page.name.clone(),
					source,
				})?;

			tracing::debug!(page = %page.name, "compiled page");
			registry.pages.insert(
				page.name.clone(),
				CompiledTemplate {
					kind: TemplateKind::Page,
					name: page.name,
					tera,
					layouts: layout_names.clone(),
				},
			);
		}

		for partial in partials {
			let mut tera = new_tree(catalog);
			tera.add_raw_template(&partial.name, &partial.source)
				.map_err(|source| ViewError::Parse {
					name: partial.name.clone(),
					source,
				})?;

			tracing::debug!(partial = %partial.name, "compiled partial");
			registry.partials.insert(
				partial.name.clone(),
				CompiledTemplate {
					kind: TemplateKind::Partial,
					name: partial.name,
					tera,
					layouts: BTreeSet::new(),
				},
			);
		}

		Ok(registry)
	}

	pub fn page(&self, name: &str) -> Option<&CompiledTemplate> {
		self.pages.get(name)
	}

	pub fn partial(&self, name: &str) -> Option<&CompiledTemplate> {
		self.partials.get(name)
	}

	pub fn page_names(&self) -> impl Iterator<Item = &str> {
		self.pages.keys().map(String::as_str)
	}

	pub fn partial_names(&self) -> impl Iterator<Item = &str> {
		self.partials.keys().map(String::as_str)
	}

	pub fn layout_names(&self) -> impl Iterator<Item = &str> {
		self.layouts.iter().map(String::as_str)
	}
}

/// Walk `<root>/views` and read every template, in file-name order.
pub fn discover(root: &Path) -> Result<Vec<TemplateSource>, ViewError> {
	let mut sources = Vec::new();

	for entry in WalkDir::new(root.join(VIEWS_DIR)).sort_by_file_name() {
		let entry = entry?;
		if !entry.file_type().is_file() {
			continue;
		}

		let Ok(relative) = entry.path().strip_prefix(root) else {
			continue;
		};
		let Some((kind, name)) = classify(relative) else {
			continue;
		};

		let source = std::fs::read_to_string(entry.path()).map_err(|source| ViewError::Read {
			path: entry.path().to_path_buf(),
			source,
		})?;
		sources.push(TemplateSource { kind, name, source });
	}

	tracing::info!(count = sources.len(), root = %root.display(), "discovered templates");
	Ok(sources)
}

fn layout_key(name: &str) -> String {
	format!("{LAYOUTS_DIR}/{name}")
}

fn new_tree(catalog: &FunctionCatalog) -> Tera {
	let mut tera = Tera::default();
	// Minted names carry no extension, so escape every template.
	tera.autoescape_on(vec![""]);
	tera.register_function(PARTIAL_FUNCTION, placeholder);
	catalog.attach(&mut tera);
	tera
}
