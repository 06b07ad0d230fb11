//! Namespaced JSON key-value store over `localStorage`.
//!
//! Storage is best-effort: every failure is logged and swallowed so a full
//! quota or a private-mode browser only degrades the feature using it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use log::{error, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StorageError;

/// Raw string storage.
pub trait StorageBackend {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
	fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
	fn remove(&self, key: &str) -> Result<(), StorageError>;
	fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// `window.localStorage`.
pub struct BrowserStorage {
	storage: web_sys::Storage,
}

impl BrowserStorage {
	pub fn open() -> Result<Self, StorageError> {
		let storage = web_sys::window()
			.ok_or(StorageError::Unavailable)?
			.local_storage()
			.map_err(|err| StorageError::Backend(format!("{err:?}")))?
			.ok_or(StorageError::Unavailable)?;
		Ok(Self { storage })
	}
}

fn backend_err(err: wasm_bindgen::JsValue) -> StorageError {
	StorageError::Backend(format!("{err:?}"))
}

impl StorageBackend for BrowserStorage {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		self.storage.get_item(key).map_err(backend_err)
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
		self.storage.set_item(key, value).map_err(backend_err)
	}

	fn remove(&self, key: &str) -> Result<(), StorageError> {
		self.storage.remove_item(key).map_err(backend_err)
	}

	fn keys(&self) -> Result<Vec<String>, StorageError> {
		let len = self.storage.length().map_err(backend_err)?;
		let mut keys = Vec::with_capacity(len as usize);
		for i in 0..len {
			if let Some(key) = self.storage.key(i).map_err(backend_err)? {
				keys.push(key);
			}
		}
		Ok(keys)
	}
}

/// In-process storage, used when `localStorage` is missing and in tests.
#[derive(Clone, Default)]
pub struct MemoryStorage {
	items: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}
}

impl StorageBackend for MemoryStorage {
	fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
		Ok(self.items.borrow().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
		self.items.borrow_mut().insert(key.into(), value.into());
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StorageError> {
		self.items.borrow_mut().remove(key);
		Ok(())
	}

	fn keys(&self) -> Result<Vec<String>, StorageError> {
		Ok(self.items.borrow().keys().cloned().collect())
	}
}

/// Typed access to one namespace of a [`StorageBackend`].
#[derive(Clone)]
pub struct StorageManager {
	backend: Rc<dyn StorageBackend>,
	namespace: String,
}

impl StorageManager {
	pub fn new(backend: Rc<dyn StorageBackend>, namespace: impl Into<String>) -> Self {
		Self {
			backend,
			namespace: namespace.into(),
		}
	}

	/// `localStorage` when the browser allows it, memory otherwise.
	pub fn browser(namespace: impl Into<String>) -> Self {
		let backend: Rc<dyn StorageBackend> = match BrowserStorage::open() {
			Ok(storage) => Rc::new(storage),
			Err(err) => {
				warn!("{err}, falling back to in-memory storage");
				Rc::new(MemoryStorage::new())
			}
		};
		Self::new(backend, namespace)
	}

	fn full_key(&self, key: &str) -> String {
		format!("{}{}", self.namespace, key)
	}

	pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
		match self.backend.get(&self.full_key(key))? {
			Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
			None => Ok(None),
		}
	}

	pub fn try_set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
		let raw = serde_json::to_string(value)?;
		self.backend.set(&self.full_key(key), &raw)
	}

	/// Missing, unreadable and corrupt entries all read as `None`.
	pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
		self.try_get(key).unwrap_or_else(|err| {
			error!("failed to read `{key}` from storage: {err}");
			None
		})
	}

	/// Returns whether the value was written.
	pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
		match self.try_set(key, value) {
			Ok(()) => true,
			Err(err) => {
				error!("failed to write `{key}` to storage: {err}");
				false
			}
		}
	}

	pub fn remove(&self, key: &str) {
		if let Err(err) = self.backend.remove(&self.full_key(key)) {
			error!("failed to remove `{key}` from storage: {err}");
		}
	}

	/// Removes every key in this namespace and nothing else.
	pub fn clear(&self) {
		let keys = match self.backend.keys() {
			Ok(keys) => keys,
			Err(err) => {
				error!("failed to list storage keys: {err}");
				return;
			}
		};
		for key in keys.iter().filter(|k| k.starts_with(&self.namespace)) {
			if let Err(err) = self.backend.remove(key) {
				error!("failed to remove `{key}` from storage: {err}");
			}
		}
	}

	pub fn contains(&self, key: &str) -> bool {
		matches!(self.backend.get(&self.full_key(key)), Ok(Some(_)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn manager(backend: &MemoryStorage) -> StorageManager {
		StorageManager::new(Rc::new(backend.clone()), "kms_")
	}

	#[test]
	fn values_are_json_under_namespaced_keys() {
		let backend = MemoryStorage::new();
		let storage = manager(&backend);
		assert!(storage.set("has_seen_welcome", &true));
		assert_eq!(
			backend.get("kms_has_seen_welcome").unwrap().as_deref(),
			Some("true")
		);
		assert_eq!(storage.get::<bool>("has_seen_welcome"), Some(true));
	}

	#[test]
	fn corrupt_entries_read_as_none() {
		let backend = MemoryStorage::new();
		backend.set("kms_search_history", "{not json").unwrap();
		let storage = manager(&backend);
		assert_eq!(storage.get::<Vec<String>>("search_history"), None);
		assert!(storage.try_get::<Vec<String>>("search_history").is_err());
	}

	#[test]
	fn clear_only_touches_own_namespace() {
		let backend = MemoryStorage::new();
		backend.set("other_app", "1").unwrap();
		let storage = manager(&backend);
		storage.set("a", &1);
		storage.set("b", &2);
		storage.clear();
		assert_eq!(backend.keys().unwrap(), vec!["other_app".to_string()]);
	}

	#[test]
	fn remove_and_contains() {
		let storage = manager(&MemoryStorage::new());
		storage.set("draft_x", &"v");
		assert!(storage.contains("draft_x"));
		storage.remove("draft_x");
		assert!(!storage.contains("draft_x"));
	}
}
