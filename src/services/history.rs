use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::storage::StorageManager;

const HISTORY_KEY: &str = "search_history";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
	pub query: String,
	pub timestamp: DateTime<Utc>,
}

/// Most-recent-first list of past queries, deduplicated by exact text.
#[derive(Clone)]
pub struct SearchHistory {
	storage: StorageManager,
	cap: usize,
}

impl SearchHistory {
	pub fn new(storage: StorageManager, cap: usize) -> Self {
		Self { storage, cap }
	}

	pub fn entries(&self) -> Vec<HistoryEntry> {
		self.storage.get(HISTORY_KEY).unwrap_or_default()
	}

	pub fn add(&self, query: &str) -> Vec<HistoryEntry> {
		self.add_at(query, Utc::now())
	}

	/// Records `query` as of `at`, moving an existing copy to the front.
	pub fn add_at(&self, query: &str, at: DateTime<Utc>) -> Vec<HistoryEntry> {
		let mut entries = self.entries();
		if query.trim().is_empty() {
			return entries;
		}
		entries.retain(|e| e.query != query);
		entries.insert(
			0,
			HistoryEntry {
				query: query.to_string(),
				timestamp: at,
			},
		);
		entries.truncate(self.cap);
		self.storage.set(HISTORY_KEY, &entries);
		entries
	}

	pub fn clear(&self) {
		self.storage.remove(HISTORY_KEY);
	}
}
