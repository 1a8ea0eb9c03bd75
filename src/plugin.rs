//! Pipeline stage wrapping the rewriter.
//!
//! The stage receives file units one at a time, filters them by extension and
//! hands eligible buffers to the run-wide [`Rewriter`]. Files always come back
//! to the caller; failures are emitted as [`PluginError`] events instead.

use crate::error::RenameError;
use crate::prefix::PrefixSpec;
use crate::rewriter::{MappingTable, Rewriter};
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const PLUGIN_NAME: &str = "html-rename";

/// Extensions that are always eligible for rewriting.
pub const DEFAULT_EXTENSIONS: [&str; 3] = ["html", "css", "js"];

/// Contents of a file unit.
pub enum Contents {
	/// No contents (e.g. a directory entry).
	Null,
	/// Fully materialised bytes.
	Buffer(Vec<u8>),
	/// A data flow that has not been read into memory.
	Stream(Box<dyn Read + Send>),
}

impl fmt::Debug for Contents {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Null => f.write_str("Null"),
			Self::Buffer(bytes) => write!(f, "Buffer({} bytes)", bytes.len()),
			Self::Stream(_) => f.write_str("Stream"),
		}
	}
}

/// A file travelling through the pipeline.
#[derive(Debug)]
pub struct FileUnit {
	/// Paths this file has had, oldest first.
	pub history: Vec<PathBuf>,
	pub contents: Contents,
}

impl FileUnit {
	pub fn from_buffer(path: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
		Self {
			history: vec![path.into()],
			contents: Contents::Buffer(contents),
		}
	}

	pub fn from_stream(path: impl Into<PathBuf>, reader: Box<dyn Read + Send>) -> Self {
		Self {
			history: vec![path.into()],
			contents: Contents::Stream(reader),
		}
	}

	/// Current path of the file.
	pub fn path(&self) -> Option<&Path> {
		self.history.last().map(PathBuf::as_path)
	}

	pub fn is_null(&self) -> bool {
		matches!(self.contents, Contents::Null)
	}

	pub fn is_buffer(&self) -> bool {
		matches!(self.contents, Contents::Buffer(_))
	}

	pub fn is_stream(&self) -> bool {
		matches!(self.contents, Contents::Stream(_))
	}

	pub fn buffer(&self) -> Option<&[u8]> {
		match &self.contents {
			Contents::Buffer(bytes) => Some(bytes),
			_ => None,
		}
	}
}

/// Error event emitted by the stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginError {
	pub plugin: &'static str,
	pub message: String,
	pub path: Option<PathBuf>,
	pub source: RenameError,
}

impl fmt::Display for PluginError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}] {}", self.plugin, self.message)?;
		if let Some(path) = &self.path {
			write!(f, " ({})", path.display())?;
		}
		Ok(())
	}
}

impl std::error::Error for PluginError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		Some(&self.source)
	}
}

/// Setup options for the stage.
#[derive(Debug, Clone, Default)]
pub struct Options {
	/// Custom prefixes, tested after the built-in ones.
	pub prefixes: Vec<PrefixSpec>,
	/// Extensions eligible in addition to html, css and js.
	pub extensions: Vec<String>,
}

/// The renaming pipeline stage. One instance covers one build.
#[derive(Debug)]
pub struct HtmlRename {
	rewriter: Rewriter,
	extension_filter: Regex,
	errors: Vec<PluginError>,
}

impl HtmlRename {
	/// Set up a stage. Prefixes and extensions are fixed from here on.
	pub fn new(options: Options) -> Result<Self, RenameError> {
		Ok(Self {
			rewriter: Rewriter::new(&options.prefixes)?,
			extension_filter: extension_filter(&options.extensions)?,
			errors: Vec::new(),
		})
	}

	/// Whether any path in the file's history carries an eligible extension.
	pub fn accepts(&self, file: &FileUnit) -> bool {
		file.history.iter().any(|path| self.accepts_path(path))
	}

	pub fn accepts_path(&self, path: &Path) -> bool {
		self.extension_filter.is_match(&path.to_string_lossy())
	}

	/// Transform one file. The file is always returned; problems are recorded
	/// as error events and leave the contents untouched.
	pub fn transform(&mut self, mut file: FileUnit) -> FileUnit {
		if !self.accepts(&file) {
			tracing::debug!(path = ?file.path(), "Skipping file with unlisted extension");
			return file;
		}

		match &file.contents {
			Contents::Null => file,
			Contents::Stream(_) => {
				self.emit(&file, RenameError::StreamsNotSupported);
				file
			}
			Contents::Buffer(bytes) => {
				let Ok(text) = std::str::from_utf8(bytes) else {
					tracing::warn!(path = ?file.path(), "File is not valid UTF-8, leaving it unchanged");
					return file;
				};
				match self.rewriter.rewrite(text) {
					Ok(rewritten) => {
						tracing::debug!(
							path = ?file.path(),
							before = text.len(),
							after = rewritten.len(),
							"Rewrote file"
						);
						file.contents = Contents::Buffer(rewritten.into_bytes());
					}
					Err(err) => self.emit(&file, err),
				}
				file
			}
		}
	}

	fn emit(&mut self, file: &FileUnit, err: RenameError) {
		let event = PluginError {
			plugin: PLUGIN_NAME,
			message: err.to_string(),
			path: file.path().map(Path::to_path_buf),
			source: err,
		};
		tracing::error!("{}", event);
		self.errors.push(event);
	}

	/// Take the error events emitted so far.
	pub fn take_errors(&mut self) -> Vec<PluginError> {
		std::mem::take(&mut self.errors)
	}

	pub fn mappings(&self) -> &MappingTable {
		self.rewriter.table()
	}
}

/// Case-insensitive `\.(html|css|js|...)` over default and extra extensions.
fn extension_filter(extra: &[String]) -> Result<Regex, RenameError> {
	let alternatives: Vec<String> = DEFAULT_EXTENSIONS
		.iter()
		.map(|ext| ext.to_string())
		.chain(
			extra
				.iter()
				.map(|ext| ext.trim().trim_start_matches('.'))
				.filter(|ext| !ext.is_empty())
				.map(regex::escape),
		)
		.collect();
	let pattern = format!(r"\.({})", alternatives.join("|"));
	RegexBuilder::new(&pattern)
		.case_insensitive(true)
		.build()
		.map_err(|err| RenameError::InvalidExtensions(err.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::naming::{Category, Counter, NameGenerator};
	use pretty_assertions::assert_eq;
	use std::io::Cursor;

	fn stage() -> HtmlRename {
		HtmlRename::new(Options::default()).unwrap()
	}

	fn text(file: &FileUnit) -> &str {
		std::str::from_utf8(file.buffer().unwrap()).unwrap()
	}

	#[test]
	fn test_transform_html() {
		let mut stage = stage();
		let file = FileUnit::from_buffer(
			"index.html",
			br#"<div id="id-header" class="class-main"></div>"#.to_vec(),
		);
		let file = stage.transform(file);
		assert_eq!(text(&file), r#"<div id="a" class="a"></div>"#);
		assert!(stage.take_errors().is_empty());
	}

	#[test]
	fn test_unlisted_extension_passes_through() {
		let mut stage = stage();
		let original = b"see id-header here\n".to_vec();
		let file = stage.transform(FileUnit::from_buffer("notes.txt", original.clone()));
		assert_eq!(file.buffer().unwrap(), original.as_slice());
		assert!(stage.mappings().is_empty());
	}

	#[test]
	fn test_extra_extensions_and_case() {
		let stage = HtmlRename::new(Options {
			prefixes: Vec::new(),
			extensions: vec!["txt".to_string(), ".vue".to_string()],
		})
		.unwrap();

		assert!(stage.accepts(&FileUnit::from_buffer("notes.TXT", Vec::new())));
		assert!(stage.accepts(&FileUnit::from_buffer("App.vue", Vec::new())));
		assert!(stage.accepts(&FileUnit::from_buffer("STYLE.CSS", Vec::new())));
		assert!(!stage.accepts(&FileUnit::from_buffer("image.png", Vec::new())));
	}

	#[test]
	fn test_history_is_searched() {
		let stage = stage();
		let mut file = FileUnit::from_buffer("page.html", Vec::new());
		file.history.push(PathBuf::from("page.tmp"));
		assert!(stage.accepts(&file));
	}

	#[test]
	fn test_stream_emits_error() {
		let mut stage = stage();
		let file = FileUnit::from_stream("app.js", Box::new(Cursor::new(b"id-x ".to_vec())));
		let file = stage.transform(file);

		assert!(file.is_stream());
		let errors = stage.take_errors();
		assert_eq!(errors.len(), 1);
		assert_eq!(errors[0].plugin, PLUGIN_NAME);
		assert_eq!(errors[0].message, "Streams not supported!");
		assert_eq!(errors[0].source, RenameError::StreamsNotSupported);

		// The stage keeps working after an error
		let file = stage.transform(FileUnit::from_buffer("app.js", b"'id-x'".to_vec()));
		assert_eq!(text(&file), "'a'");
	}

	#[test]
	fn test_exhausted_names_emit_error_and_keep_file() {
		let mut stage = stage();
		stage.rewriter.generators_mut().replace(NameGenerator::with_counter(
			Category::Class,
			Counter::new([26; 5]),
		));

		let original = b".class-x{} #id-y{}".to_vec();
		let file = stage.transform(FileUnit::from_buffer("style.css", original.clone()));
		assert_eq!(file.buffer().unwrap(), original.as_slice());

		let errors = stage.take_errors();
		assert_eq!(errors.len(), 1);
		assert_eq!(errors[0].plugin, PLUGIN_NAME);
		assert_eq!(errors[0].message, "Name space exhausted for class names");
		assert_eq!(errors[0].path, Some(PathBuf::from("style.css")));
		assert_eq!(
			errors[0].source,
			RenameError::CapacityExceeded {
				category: Category::Class
			}
		);

		// Other categories still have names left
		let file = stage.transform(FileUnit::from_buffer("app.js", b"'id-y'".to_vec()));
		assert_eq!(text(&file), "'a'");
	}

	#[test]
	fn test_file_left_whole_when_names_run_out_midway() {
		let mut stage = stage();
		stage.rewriter.generators_mut().replace(NameGenerator::with_counter(
			Category::Class,
			Counter::new([26, 26, 26, 26, 25]),
		));

		// The last class name fits, the one after it does not
		let original = b"<p class=\"class-a\"><b class=\"class-b\">".to_vec();
		let file = stage.transform(FileUnit::from_buffer("index.html", original.clone()));
		assert_eq!(file.buffer().unwrap(), original.as_slice());
		assert_eq!(stage.take_errors().len(), 1);
		assert_eq!(stage.mappings().get("class-a"), Some("zzzzz"));
	}

	#[test]
	fn test_null_and_invalid_utf8_pass_through() {
		let mut stage = stage();
		let file = stage.transform(FileUnit {
			history: vec![PathBuf::from("empty.html")],
			contents: Contents::Null,
		});
		assert!(file.is_null());

		let bytes = vec![b'"', b'i', b'd', b'-', 0xff, b'"'];
		let file = stage.transform(FileUnit::from_buffer("bad.js", bytes.clone()));
		assert_eq!(file.buffer().unwrap(), bytes.as_slice());
		assert!(stage.take_errors().is_empty());
	}

	#[test]
	fn test_mapping_shared_between_files() {
		let mut stage = stage();
		stage.transform(FileUnit::from_buffer(
			"index.html",
			br#"<nav class="class-nav"></nav>"#.to_vec(),
		));
		let css = stage.transform(FileUnit::from_buffer(
			"style.css",
			b".class-other{} .class-nav{}".to_vec(),
		));
		assert_eq!(text(&css), ".b{} .a{}");
	}
}
