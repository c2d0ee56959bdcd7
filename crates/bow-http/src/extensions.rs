//! Type-keyed storage attached to a request.
//!
//! Middleware uses it to hand values (CSRF token, session handle, layout
//! override) to handlers further down the chain.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Type-safe extension storage.
///
/// Clones share the same underlying map, so a value inserted through one
/// clone of a request is visible through every other clone.
#[derive(Clone, Default)]
pub struct Extensions {
	map: Arc<Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>>,
}

impl Extensions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert a value, replacing any previous value of the same type.
	///
	/// # Examples
	///
	/// ```
	/// use bow_http::Extensions;
	///
	/// let extensions = Extensions::new();
	/// extensions.insert(42u32);
	/// assert_eq!(extensions.get::<u32>(), Some(42));
	/// ```
	pub fn insert<T: Send + Sync + 'static>(&self, value: T) {
		let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
		map.insert(TypeId::of::<T>(), Box::new(value));
	}

	/// Get a cloned value.
	pub fn get<T>(&self) -> Option<T>
	where
		T: Clone + Send + Sync + 'static,
	{
		let map = self.map.lock().unwrap_or_else(|e| e.into_inner());
		map.get(&TypeId::of::<T>())
			.and_then(|boxed| boxed.downcast_ref::<T>())
			.cloned()
	}

	pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
		let map = self.map.lock().unwrap_or_else(|e| e.into_inner());
		map.contains_key(&TypeId::of::<T>())
	}

	/// Remove a value and return it.
	pub fn remove<T>(&self) -> Option<T>
	where
		T: Send + Sync + 'static,
	{
		let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
		let boxed = map.remove(&TypeId::of::<T>())?;
		match boxed.downcast::<T>() {
			Ok(val) => Some(*val),
			Err(boxed) => {
				map.insert(TypeId::of::<T>(), boxed);
				None
			}
		}
	}
}

impl std::fmt::Debug for Extensions {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let len = self.map.lock().map(|m| m.len()).unwrap_or_default();
		f.debug_struct("Extensions").field("len", &len).finish()
	}
}
