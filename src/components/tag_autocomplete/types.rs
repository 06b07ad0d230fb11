use serde::{Deserialize, Serialize};

use super::categories::{FALLBACK_COLOR, OTHER_CATEGORY};

/// A tag as returned by `/api/tags/search`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tag {
	pub name: String,
	#[serde(default)]
	pub category: String,
	#[serde(default)]
	pub color: Option<String>,
}

impl Tag {
	pub fn badge_color(&self) -> &str {
		self.color
			.as_deref()
			.filter(|c| !c.is_empty())
			.unwrap_or(FALLBACK_COLOR)
	}

	pub fn badge_label(&self) -> &str {
		if self.category.is_empty() {
			OTHER_CATEGORY
		} else {
			&self.category
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_fields_fall_back_for_display() {
		let tag: Tag = serde_json::from_str(r#"{"name": "頸部", "id": 7}"#).unwrap();
		assert_eq!(tag.badge_label(), "其他");
		assert_eq!(tag.badge_color(), "#6c757d");
	}
}
