use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const HASH_LENGTH: usize = 64;

/// Insert `hash` before the first dot of the file name.
///
/// # Examples
///
/// ```
/// use bow_static::format_name;
///
/// assert_eq!(format_name("static/app.min.js", "abc"), "static/app-abc.min.js");
/// assert_eq!(format_name("LICENSE", "abc"), "LICENSE-abc");
/// ```
pub fn format_name(name: &str, hash: &str) -> String {
	let (dir, base) = split_dir(name);
	match base.find('.') {
		Some(dot) => format!("{dir}{}-{hash}{}", &base[..dot], &base[dot..]),
		None => format!("{dir}{base}-{hash}"),
	}
}

/// Split a hashed name into the original name and its hash.
///
/// Names without a 64-character hex hash come back unchanged with `None`.
///
/// # Examples
///
/// ```
/// use bow_static::parse_name;
///
/// let hash = "a".repeat(64);
/// assert_eq!(
///     parse_name(&format!("static/app-{hash}.css")),
///     ("static/app.css".to_string(), Some(hash))
/// );
/// assert_eq!(parse_name("static/app.css"), ("static/app.css".to_string(), None));
/// ```
pub fn parse_name(name: &str) -> (String, Option<String>) {
	let (dir, base) = split_dir(name);
	let (pre, ext) = match base.find('.') {
		Some(dot) => base.split_at(dot),
		None => (base, ""),
	};

	if pre.len() <= HASH_LENGTH || !pre.is_char_boundary(pre.len() - HASH_LENGTH - 1) {
		return (name.to_string(), None);
	}

	let (stem, suffix) = pre.split_at(pre.len() - HASH_LENGTH - 1);
	let Some(hash) = suffix.strip_prefix('-') else {
		return (name.to_string(), None);
	};
	if !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
		return (name.to_string(), None);
	}

	(format!("{dir}{stem}{ext}"), Some(hash.to_string()))
}

fn split_dir(name: &str) -> (&str, &str) {
	match name.rfind('/') {
		Some(slash) => name.split_at(slash + 1),
		None => ("", name),
	}
}

pub(crate) fn content_hash(content: &[u8]) -> String {
	hex::encode(Sha256::digest(content))
}

/// Hashed names of files below an application root, computed once per file.
#[derive(Debug)]
pub struct HashedFiles {
	root: PathBuf,
	hashes: RwLock<HashMap<String, String>>,
}

impl HashedFiles {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			hashes: RwLock::new(HashMap::new()),
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// SHA-256 of the file `name` (relative to the root), cached.
	pub fn hash(&self, name: &str) -> Option<String> {
		if let Some(hash) = self.hashes.read().get(name) {
			return Some(hash.clone());
		}

		let content = match std::fs::read(self.root.join(name)) {
			Ok(content) => content,
			Err(err) => {
				tracing::warn!(name, error = %err, "cannot hash static file");
				return None;
			}
		};

		let hash = content_hash(&content);
		self.hashes.write().insert(name.to_string(), hash.clone());
		Some(hash)
	}

	/// `name` with its content hash, or `name` itself when the file cannot be read.
	pub fn hash_name(&self, name: &str) -> String {
		let name = name.trim_start_matches('/');
		match self.hash(name) {
			Some(hash) => format_name(name, &hash),
			None => name.to_string(),
		}
	}
}
