use std::fmt;

use serde::Serialize;

use crate::{Error, Result};

pub const ITEM_ID_LEN: usize = 32;

/// Joplin item identifier: 32 lowercase hexadecimal characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);
impl ItemId {
	/// Trims and lowercases `raw`, then checks the length and alphabet.
	pub fn parse(field: &'static str, raw: &str) -> Result<Self> {
		let trimmed = raw.trim();

		if trimmed.is_empty() {
			return Err(Error::validation(field, "must be non-empty."));
		}
		if trimmed.len() != ITEM_ID_LEN || !trimmed.chars().all(|ch| ch.is_ascii_hexdigit()) {
			return Err(Error::validation(field, "must be a 32-character hexadecimal string."));
		}

		Ok(Self(trimmed.to_ascii_lowercase()))
	}

	/// Empty or missing parents denote the root.
	pub fn parse_optional(field: &'static str, raw: Option<&str>) -> Result<Option<Self>> {
		match raw.map(str::trim) {
			None | Some("") => Ok(None),
			Some(value) => Self::parse(field, value).map(Some),
		}
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ItemId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl AsRef<str> for ItemId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

#[cfg(test)]
mod tests {
	use crate::ItemId;

	#[test]
	fn mixed_case_ids_are_lowercased() {
		let id = ItemId::parse("note_id", " ABCDEF0123456789abcdef0123456789 ").expect("valid id");

		assert_eq!(id.as_str(), "abcdef0123456789abcdef0123456789");
	}

	#[test]
	fn rejects_wrong_length_and_alphabet() {
		assert!(ItemId::parse("note_id", "abc").is_err());
		assert!(ItemId::parse("note_id", "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz").is_err());
		assert!(ItemId::parse("note_id", "").is_err());
	}

	#[test]
	fn empty_optional_parent_is_root() {
		assert_eq!(ItemId::parse_optional("parent_id", Some("")).expect("root"), None);
		assert_eq!(ItemId::parse_optional("parent_id", None).expect("root"), None);
	}
}
