//! Prefix registration and matching.

use crate::error::RenameError;
use crate::naming::Category;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Prefixes recognised in every run, in the order they are tested.
pub const BUILTIN_PREFIXES: [(&str, Category); 6] = [
	("id-", Category::PlainId),
	("class-", Category::Class),
	// Polymer element families
	("iron-", Category::LongId),
	("paper-", Category::LongId),
	("neon-", Category::LongId),
	("platinum-", Category::LongId),
];

/// Bytes that end a token.
pub const DELIMITERS: [u8; 7] = [b'"', b'\'', b'>', b' ', b')', b'{', b':'];

pub fn is_delimiter(byte: u8) -> bool {
	DELIMITERS.contains(&byte)
}

/// A custom prefix as written by the caller: either a bare string or an
/// object with a `prefix` and an optional `type` (`id`, `long-id`, `class`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefixSpec {
	Bare(String),
	Tagged {
		prefix: String,
		#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
		kind: Option<String>,
	},
}

impl PrefixSpec {
	pub fn prefix(&self) -> &str {
		match self {
			Self::Bare(prefix) => prefix,
			Self::Tagged { prefix, .. } => prefix,
		}
	}

	/// Category for this prefix. Missing or unknown types fall back to plain ids.
	pub fn category(&self) -> Category {
		let Self::Tagged {
			kind: Some(kind), ..
		} = self
		else {
			return Category::PlainId;
		};
		Category::from_type_name(kind).unwrap_or_else(|| {
			tracing::warn!(
				prefix = self.prefix(),
				kind = kind.as_str(),
				"Unknown prefix type, treating as id"
			);
			Category::PlainId
		})
	}
}

/// Parses `PREFIX` or `PREFIX:TYPE`, as accepted on the command line.
///
/// Like the JSON form, an unknown `TYPE` is kept and falls back to plain ids
/// with a warning.
impl FromStr for PrefixSpec {
	type Err = RenameError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let spec = match s.rsplit_once(':') {
			Some((prefix, kind)) if !kind.is_empty() => {
				if Category::from_type_name(kind).is_none() {
					tracing::warn!(prefix, kind, "Unknown prefix type, treating as id");
				}
				Self::Tagged {
					prefix: prefix.to_string(),
					kind: Some(kind.to_string()),
				}
			}
			_ => Self::Bare(s.to_string()),
		};
		if spec.prefix().is_empty() {
			return Err(RenameError::EmptyPrefix);
		}
		Ok(spec)
	}
}

/// A prefix bound to the category whose generator it draws from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixRule {
	pub prefix: String,
	pub category: Category,
}

/// Ordered set of prefix rules: built-ins first, then custom registrations.
#[derive(Debug, Clone)]
pub struct PrefixRules {
	rules: Vec<PrefixRule>,
	/// Lookup of which bytes can start any prefix.
	first_bytes: [bool; 256],
}

impl Default for PrefixRules {
	fn default() -> Self {
		Self::from_rules(Vec::new())
	}
}

impl PrefixRules {
	/// Build the rule set from custom registrations.
	pub fn new(custom: &[PrefixSpec]) -> Result<Self, RenameError> {
		let mut extra = Vec::with_capacity(custom.len());
		for spec in custom {
			if spec.prefix().is_empty() {
				return Err(RenameError::EmptyPrefix);
			}
			extra.push(PrefixRule {
				prefix: spec.prefix().to_string(),
				category: spec.category(),
			});
		}
		Ok(Self::from_rules(extra))
	}

	fn from_rules(custom: Vec<PrefixRule>) -> Self {
		let mut rules: Vec<PrefixRule> = BUILTIN_PREFIXES
			.iter()
			.map(|&(prefix, category)| PrefixRule {
				prefix: prefix.to_string(),
				category,
			})
			.collect();
		rules.extend(custom);

		let mut first_bytes = [false; 256];
		for rule in &rules {
			first_bytes[rule.prefix.as_bytes()[0] as usize] = true;
		}

		Self { rules, first_bytes }
	}

	pub fn rules(&self) -> &[PrefixRule] {
		&self.rules
	}

	/// Find the first rule whose prefix starts at `bytes[0]`.
	pub fn match_at(&self, bytes: &[u8]) -> Option<&PrefixRule> {
		let first = *bytes.first()?;
		if !self.first_bytes[first as usize] {
			return None;
		}
		self.rules
			.iter()
			.find(|rule| bytes.starts_with(rule.prefix.as_bytes()))
	}
}
