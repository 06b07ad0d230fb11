//! Category colors and manual tag entry.

use super::types::Tag;

pub const OTHER_CATEGORY: &str = "其他";
pub const FALLBACK_COLOR: &str = "#6c757d";

/// Symptom, cause, method, location, field, other.
pub const CATEGORY_COLORS: &[(&str, &str)] = &[
	("症狀", "#dc3545"),
	("病因", "#fd7e14"),
	("手法", "#007bff"),
	("位置", "#28a745"),
	("領域", "#6610f2"),
	(OTHER_CATEGORY, FALLBACK_COLOR),
];

pub fn category_color(category: &str) -> &'static str {
	CATEGORY_COLORS
		.iter()
		.find(|(name, _)| *name == category)
		.map(|(_, color)| *color)
		.unwrap_or(FALLBACK_COLOR)
}

/// Turns typed text into a tag.
///
/// An explicitly selected category wins; otherwise `category:name` is
/// split on the first colon; otherwise the tag lands in the other category.
pub fn manual_tag(text: &str, selected_category: Option<&str>) -> Option<Tag> {
	let text = text.trim();
	if text.is_empty() {
		return None;
	}
	let selected = selected_category.map(str::trim).filter(|c| !c.is_empty());
	let (category, name) = match (selected, text.split_once(':')) {
		(Some(category), _) => (category, text),
		(None, Some((category, name))) if !category.trim().is_empty() && !name.trim().is_empty() => {
			(category.trim(), name.trim())
		}
		_ => (OTHER_CATEGORY, text),
	};
	Some(Tag {
		name: name.to_string(),
		category: category.to_string(),
		color: Some(category_color(category).to_string()),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn selected_category_takes_precedence() {
		let tag = manual_tag("病因:肩頸", Some("手法")).unwrap();
		assert_eq!(tag.category, "手法");
		assert_eq!(tag.name, "病因:肩頸");
		assert_eq!(tag.color.as_deref(), Some("#007bff"));
	}

	#[test]
	fn colon_prefix_sets_category() {
		let tag = manual_tag(" 症狀: 頭痛 ", None).unwrap();
		assert_eq!((tag.category.as_str(), tag.name.as_str()), ("症狀", "頭痛"));
		assert_eq!(tag.color.as_deref(), Some("#dc3545"));
	}

	#[test]
	fn unknown_category_is_gray() {
		let tag = manual_tag("posture:slouch", None).unwrap();
		assert_eq!(tag.category, "posture");
		assert_eq!(tag.color.as_deref(), Some(FALLBACK_COLOR));
	}

	#[test]
	fn plain_text_defaults_to_other() {
		let tag = manual_tag("stretching", Some("  ")).unwrap();
		assert_eq!(tag.category, OTHER_CATEGORY);
		assert_eq!(tag.color.as_deref(), Some(FALLBACK_COLOR));
		assert!(manual_tag(":", None).unwrap().category == OTHER_CATEGORY);
		assert!(manual_tag("   ", None).is_none());
	}
}
