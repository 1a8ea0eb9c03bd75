//! Token rewriting over raw text.
//!
//! Text is scanned once, left to right. Wherever a configured prefix starts, a
//! token recorded earlier in the run is replaced by its short name; otherwise
//! the token running up to the next delimiter gets a fresh name and is
//! recorded. The table outlives a single text so names agree across files.

use crate::error::RenameError;
use crate::naming::NameGenerators;
use crate::prefix::{is_delimiter, PrefixRules, PrefixSpec};
use serde::Serialize;
use std::collections::HashMap;

/// A token and the short name it was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mapping {
	pub token: String,
	pub name: String,
}

/// Append-only record of assignments. The first assignment of a token wins.
#[derive(Debug, Default, Clone)]
pub struct MappingTable {
	entries: Vec<Mapping>,
	index: HashMap<String, usize>,
}

impl MappingTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, token: &str) -> Option<&str> {
		self.index
			.get(token)
			.map(|&idx| self.entries[idx].name.as_str())
	}

	/// Record `token -> name` unless the token is already known.
	/// Returns the name the token maps to afterwards.
	pub fn insert(&mut self, token: &str, name: String) -> &str {
		let idx = match self.index.get(token) {
			Some(&idx) => idx,
			None => {
				let idx = self.entries.len();
				self.entries.push(Mapping {
					token: token.to_string(),
					name,
				});
				self.index.insert(token.to_string(), idx);
				idx
			}
		};
		&self.entries[idx].name
	}

	/// Entries in assignment order.
	pub fn entries(&self) -> &[Mapping] {
		&self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Run-scoped renaming state: prefix rules, the three name generators and the
/// mapping table. Create one per build; dropping it is the only reset.
#[derive(Debug, Clone)]
pub struct Rewriter {
	rules: PrefixRules,
	generators: NameGenerators,
	table: MappingTable,
}

impl Default for Rewriter {
	fn default() -> Self {
		Self {
			rules: PrefixRules::default(),
			generators: NameGenerators::new(),
			table: MappingTable::new(),
		}
	}
}

impl Rewriter {
	/// Create a rewriter recognising the built-in prefixes plus `custom`.
	pub fn new(custom: &[PrefixSpec]) -> Result<Self, RenameError> {
		Ok(Self {
			rules: PrefixRules::new(custom)?,
			..Self::default()
		})
	}

	pub fn table(&self) -> &MappingTable {
		&self.table
	}

	#[cfg(test)]
	pub(crate) fn generators_mut(&mut self) -> &mut NameGenerators {
		&mut self.generators
	}

	/// Rewrite every prefixed token in `text`.
	///
	/// At each prefix, the longest token recorded earlier in the run that starts
	/// there is given its recorded name back, as long as it is not followed by a
	/// hyphen or a word character. Only when no recorded token fits does the
	/// token run up to the next delimiter and get the next name from its
	/// category's generator. So `id-foo` is found again in `#id-foo,` or
	/// `#id-foo.class-x`, and never rewrites the front of `id-foo-bar` or
	/// `id-foobar`.
	///
	/// A prefix with no recorded token and no delimiter before the end of the
	/// text is not a token; scanning carries on past it.
	pub fn rewrite(&mut self, text: &str) -> Result<String, RenameError> {
		let bytes = text.as_bytes();
		let mut out = String::with_capacity(text.len());
		let mut copied = 0;
		let mut pos = 0;

		while pos < bytes.len() {
			let Some(rule) = self.rules.match_at(&bytes[pos..]) else {
				pos += 1;
				continue;
			};

			let body = pos + rule.prefix.len();
			let category = rule.category;
			let delimiter = bytes[body..]
				.iter()
				.position(|&b| is_delimiter(b))
				.map(|len| body + len);

			let end = match self.recorded_end(text, pos, body, delimiter.unwrap_or(bytes.len())) {
				Some(end) => end,
				None => {
					let Some(end) = delimiter else {
						pos += 1;
						continue;
					};
					let token = &text[pos..end];
					let name = self.generators.next(category)?;
					tracing::trace!(token, name = name.as_str(), %category, "Assigned name");
					self.table.insert(token, name);
					end
				}
			};

			out.push_str(&text[copied..pos]);
			out.push_str(self.table.get(&text[pos..end]).unwrap_or(&text[pos..end]));
			copied = end;
			pos = end;
		}

		out.push_str(&text[copied..]);
		Ok(out)
	}

	/// End of the longest recorded token starting at `pos` and ending no later
	/// than `limit`. Recorded tokens never contain a delimiter, so nothing past
	/// the first delimiter needs checking.
	fn recorded_end(&self, text: &str, pos: usize, body: usize, limit: usize) -> Option<usize> {
		if self.table.is_empty() {
			return None;
		}
		let bytes = text.as_bytes();
		(body..=limit).rev().find(|&end| {
			ends_token(bytes.get(end).copied())
				&& text.is_char_boundary(end)
				&& self.table.get(&text[pos..end]).is_some()
		})
	}
}

/// Whether a recorded token may end right before `next`.
fn ends_token(next: Option<u8>) -> bool {
	match next {
		None => true,
		Some(b) => b != b'-' && b != b'_' && !b.is_ascii_alphanumeric(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn test_header_example() {
		let mut rw = Rewriter::default();
		let out = rw
			.rewrite(r##"<div id="id-header" class="class-main"><a href="#id-header">"##)
			.unwrap();
		assert_eq!(out, r##"<div id="a" class="a"><a href="#a">"##);
	}

	#[test]
	fn test_names_stable_across_texts() {
		let mut rw = Rewriter::default();
		let first = rw.rewrite(r#"<p id="id-foo"></p><p id="id-bar"></p>"#).unwrap();
		assert_eq!(first, r#"<p id="a"></p><p id="b"></p>"#);

		let second = rw.rewrite("#id-bar { color: red }\n#id-foo{}").unwrap();
		assert_eq!(second, "#b { color: red }\n#a{}");
		assert_eq!(rw.table().len(), 2);
	}

	#[test]
	fn test_longer_tokens_are_not_clipped() {
		let mut rw = Rewriter::default();
		let out = rw
			.rewrite(r#"<i id="id-foo"></i><i id="id-foo-bar"></i><i id="id-foobar"></i>"#)
			.unwrap();
		assert_eq!(out, r#"<i id="a"></i><i id="b"></i><i id="c"></i>"#);

		// A known token followed by a hyphen still starts a new, longer token
		let out = rw.rewrite(r#"'id-foo-baz' 'id-foo'"#).unwrap();
		assert_eq!(out, "'d' 'a'");
	}

	#[test]
	fn test_rewritten_output_is_stable() {
		let mut rw = Rewriter::default();
		let once = rw
			.rewrite(r#"<paper-button class="class-x" id="id-y">go</paper-button>"#)
			.unwrap();
		assert_eq!(once, r#"<a-a class="a" id="a">go</a-a>"#);

		let twice = rw.rewrite(&once).unwrap();
		assert_eq!(twice, once);
		assert_eq!(rw.table().len(), 3);
	}

	#[test]
	fn test_recorded_tokens_found_before_any_punctuation() {
		let mut rw = Rewriter::default();
		rw.rewrite(r#"<div id="id-foo" class="class-x">"#).unwrap();

		let css = rw.rewrite("#id-foo,#id-bar{}\n#id-foo.class-x{}\n").unwrap();
		assert_eq!(css, "#a,#b{}\n#a.a{}\n");

		let js = rw.rewrite("x = 'id-foo';\ny = id-foo\nz = id-foo;").unwrap();
		assert_eq!(js, "x = 'a';\ny = a\nz = a;");

		assert_eq!(
			rw.table().entries().iter().map(|m| m.token.as_str()).collect::<Vec<_>>(),
			vec!["id-foo", "class-x", "id-bar"]
		);
	}

	#[test]
	fn test_tokens_from_same_text_found_before_punctuation() {
		let mut rw = Rewriter::default();
		let out = rw
			.rewrite("<i id=\"id-foo\" class=\"class-y\"></i><style>#id-foo.class-y, #id-foo;\n#id-foo\n</style>")
			.unwrap();
		assert_eq!(
			out,
			"<i id=\"a\" class=\"a\"></i><style>#a.a, #a;\n#a\n</style>"
		);
	}

	#[test]
	fn test_recorded_token_not_matched_inside_longer_word() {
		let mut rw = Rewriter::default();
		rw.rewrite("'id-foo'").unwrap();

		// Word characters and hyphens after a recorded token make it a different token
		let out = rw.rewrite("'id-foobar' 'id-foo_x' 'id-foo-y' id-foo.").unwrap();
		assert_eq!(out, "'b' 'c' 'd' a.");
	}

	#[test]
	fn test_colon_ends_token() {
		let mut rw = Rewriter::default();
		let out = rw.rewrite(".class-link:hover { }").unwrap();
		assert_eq!(out, ".a:hover { }");
	}

	#[test]
	fn test_unterminated_token_left_alone() {
		let mut rw = Rewriter::default();
		let out = rw.rewrite("<b id=\"id-a\">id-trailing").unwrap();
		assert_eq!(out, "<b id=\"a\">id-trailing");
		assert_eq!(rw.table().len(), 1);

		assert_eq!(rw.rewrite("id-").unwrap(), "id-");
		assert_eq!(rw.rewrite("").unwrap(), "");
	}

	#[test]
	fn test_custom_prefix_uses_its_category() {
		let specs = vec![PrefixSpec::Tagged {
			prefix: "data-".to_string(),
			kind: Some("class".to_string()),
		}];
		let mut rw = Rewriter::new(&specs).unwrap();
		let out = rw
			.rewrite(r#"<div id="id-one" class="class-one data-widget">"#)
			.unwrap();
		// class-one takes "a" and data-widget continues the class sequence
		assert_eq!(out, r#"<div id="a" class="a b">"#);
	}

	#[test]
	fn test_multibyte_text_is_preserved() {
		let mut rw = Rewriter::default();
		let out = rw.rewrite("<h1 id=\"id-titel\">Grüße ✓</h1>").unwrap();
		assert_eq!(out, "<h1 id=\"a\">Grüße ✓</h1>");
	}

	#[test]
	fn test_table_first_assignment_wins() {
		let mut table = MappingTable::new();
		assert_eq!(table.insert("id-x", "a".to_string()), "a");
		assert_eq!(table.insert("id-x", "z".to_string()), "a");
		assert_eq!(table.get("id-x"), Some("a"));
		assert_eq!(
			table.entries(),
			&[Mapping {
				token: "id-x".to_string(),
				name: "a".to_string(),
			}]
		);
	}
}
