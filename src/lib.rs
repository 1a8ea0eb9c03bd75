//! HTML/CSS/JS Id and Class Renaming Library
//!
//! Shortens prefixed ids and classes (`id-header`, `class-main`,
//! `paper-button`, ...) to generated names, keeping one mapping for a whole
//! build so references stay consistent across files.

pub mod error;
pub mod naming;
pub mod plugin;
pub mod prefix;
pub mod rename_config;
pub mod rewriter;

use anyhow::{Context, Result};
use flate2::read::GzEncoder;
use flate2::Compression;
use rayon::prelude::*;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

pub use error::RenameError;
pub use naming::Category;
pub use plugin::{FileUnit, HtmlRename, Options, PluginError};
pub use prefix::PrefixSpec;
pub use rewriter::{Mapping, MappingTable, Rewriter};

/// Directories never descended into.
const SKIPPED_DIRS: [&str; 2] = ["node_modules", ".git"];

/// Configuration for a renaming run
#[derive(Debug, Clone, Default)]
pub struct Config {
	/// Directory whose files are rewritten
	pub root_dir: PathBuf,
	/// Custom prefixes, tested after the built-in ones
	pub prefixes: Vec<PrefixSpec>,
	/// Extensions eligible in addition to html, css and js
	pub extensions: Vec<String>,
	/// Whether to actually write files
	pub dry_run: bool,
	/// Whether to print verbose output
	pub verbose: bool,
	/// Whether to compute gzipped sizes
	pub compute_gzip: bool,
	/// Where to write the token → name mapping as JSON
	pub mapping_out: Option<PathBuf>,
}

/// Statistics about a renaming run
#[derive(Debug, Default)]
pub struct Stats {
	pub files_seen: usize,
	pub files_rewritten: usize,
	pub tokens_renamed: usize,
	pub errors: usize,
	pub raw_before: u64,
	pub raw_after: u64,
	pub gzipped_before: u64,
	pub gzipped_after: u64,
}

impl Stats {
	pub fn raw_savings(&self) -> i64 {
		self.raw_before as i64 - self.raw_after as i64
	}

	pub fn gzipped_savings(&self) -> i64 {
		self.gzipped_before as i64 - self.gzipped_after as i64
	}

	pub fn raw_savings_percent(&self) -> f64 {
		if self.raw_before == 0 {
			0.0
		} else {
			(self.raw_savings() as f64 / self.raw_before as f64) * 100.0
		}
	}

	pub fn gzipped_savings_percent(&self) -> f64 {
		if self.gzipped_before == 0 {
			0.0
		} else {
			(self.gzipped_savings() as f64 / self.gzipped_before as f64) * 100.0
		}
	}
}

/// Timing stats for profiling
#[derive(Debug, Default)]
pub struct TimingStats {
	pub file_read: Duration,
	pub rewrite: Duration,
	pub gzip: Duration,
	pub file_write: Duration,
}

/// A file loaded for a run, with its original bytes kept for comparison
struct LoadedFile {
	path: PathBuf,
	original: Vec<u8>,
	rewritten: Option<Vec<u8>>,
}

impl LoadedFile {
	fn output(&self) -> &[u8] {
		self.rewritten.as_deref().unwrap_or(&self.original)
	}

	fn changed(&self) -> bool {
		self.rewritten
			.as_deref()
			.is_some_and(|bytes| bytes != self.original.as_slice())
	}
}

/// Main renaming engine: feeds every eligible file under the root directory through
/// one [`HtmlRename`] stage, in sorted path order.
pub struct Renamer {
	config: Config,
	stage: HtmlRename,
	files: Vec<LoadedFile>,
	/// Error events emitted by the stage
	pub errors: Vec<PluginError>,
	/// Timing stats
	pub timing: TimingStats,
}

impl Renamer {
	pub fn new(config: Config) -> Result<Self> {
		let stage = HtmlRename::new(Options {
			prefixes: config.prefixes.clone(),
			extensions: config.extensions.clone(),
		})
		.context("Invalid rename options")?;

		Ok(Self {
			config,
			stage,
			files: Vec::new(),
			errors: Vec::new(),
			timing: TimingStats::default(),
		})
	}

	/// Mapping assigned so far
	pub fn mappings(&self) -> &MappingTable {
		self.stage.mappings()
	}

	/// Run the full renaming process
	pub fn run(&mut self) -> Result<Stats> {
		let mut stats = Stats::default();

		self.load_files()?;
		stats.files_seen = self.files.len();

		let (raw, gzipped) = self.calculate_size(|file| file.original.as_slice());
		stats.raw_before = raw;
		stats.gzipped_before = gzipped;

		if self.config.verbose {
			println!("Id and Class Renaming");
			println!("=====================");
			println!("\nFiles: {}", stats.files_seen);
			println!("\nStarting size:");
			println!("  Raw:     {}", format_bytes(raw));
			if self.config.compute_gzip {
				println!("  Gzipped: {}", format_bytes(gzipped));
			}
		}

		self.rewrite_all();

		stats.files_rewritten = self.files.iter().filter(|f| f.changed()).count();
		stats.tokens_renamed = self.stage.mappings().len();
		stats.errors = self.errors.len();

		let (raw, gzipped) = self.calculate_size(LoadedFile::output);
		stats.raw_after = raw;
		stats.gzipped_after = gzipped;

		if !self.config.dry_run {
			self.write_all_files()?;
		}

		if let Some(path) = self.config.mapping_out.clone() {
			self.write_mapping(&path)?;
		}

		if self.config.verbose {
			println!("\n=====================");
			println!("Tokens renamed:  {}", stats.tokens_renamed);
			println!("Files rewritten: {}", stats.files_rewritten);
			if stats.errors > 0 {
				println!("Errors:          {}", stats.errors);
			}
			println!("\nRaw size:");
			println!("  Before:  {}", format_bytes(stats.raw_before));
			println!("  After:   {}", format_bytes(stats.raw_after));
			println!(
				"  Savings: {} ({:.1}%)",
				format_bytes_signed(stats.raw_savings()),
				stats.raw_savings_percent()
			);
			if self.config.compute_gzip {
				println!("\nGzipped size:");
				println!("  Before:  {}", format_bytes(stats.gzipped_before));
				println!("  After:   {}", format_bytes(stats.gzipped_after));
				println!(
					"  Savings: {} ({:.1}%)",
					format_bytes_signed(stats.gzipped_savings()),
					stats.gzipped_savings_percent()
				);
			}
		}

		Ok(stats)
	}

	/// Collect every file under the root and read them
	fn load_files(&mut self) -> Result<()> {
		self.files.clear();

		// Collect paths first (sequential - fast)
		let mut paths: Vec<PathBuf> = WalkDir::new(&self.config.root_dir)
			.into_iter()
			.filter_entry(|entry| {
				entry.depth() == 0
					|| !entry
						.file_name()
						.to_str()
						.is_some_and(|name| SKIPPED_DIRS.contains(&name))
			})
			.filter_map(|entry| entry.ok())
			.filter(|entry| entry.file_type().is_file())
			.map(|entry| entry.into_path())
			.collect();

		// Only eligible files are read, rewritten and counted
		paths.retain(|path| {
			let eligible = self.stage.accepts_path(path);
			if !eligible {
				tracing::debug!(path = %path.display(), "Skipping file with unlisted extension");
			}
			eligible
		});

		// Sorted order is the delivery order, which decides first assignments
		paths.sort();

		// Parallel read
		let results: Vec<_> = paths
			.into_par_iter()
			.map(|path| {
				let t_read = Instant::now();
				let content = fs::read(&path);
				(path, content, t_read.elapsed())
			})
			.collect();

		for (path, content, read_time) in results {
			let original =
				content.with_context(|| format!("Failed to read {}", path.display()))?;
			self.timing.file_read += read_time;
			self.files.push(LoadedFile {
				path,
				original,
				rewritten: None,
			});
		}

		tracing::debug!(files = self.files.len(), root = %self.config.root_dir.display(), "Loaded files");
		Ok(())
	}

	/// Push every file through the stage, strictly in order
	fn rewrite_all(&mut self) {
		let t = Instant::now();

		for file in &mut self.files {
			let unit = FileUnit::from_buffer(file.path.clone(), file.original.clone());
			let unit = self.stage.transform(unit);
			if let Some(bytes) = unit.buffer() {
				if bytes != file.original.as_slice() {
					file.rewritten = Some(bytes.to_vec());
				}
			}
		}

		self.errors.extend(self.stage.take_errors());
		self.timing.rewrite += t.elapsed();
	}

	/// Calculate total size (raw and gzipped) of the selected contents
	fn calculate_size<F>(&mut self, select: F) -> (u64, u64)
	where
		F: Fn(&LoadedFile) -> &[u8] + Sync,
	{
		let compute_gzip = self.config.compute_gzip;

		let results: Vec<_> = self
			.files
			.par_iter()
			.map(|file| {
				let bytes = select(file);
				if compute_gzip {
					let t_gz = Instant::now();
					(bytes.len() as u64, gzip_size(bytes), t_gz.elapsed())
				} else {
					(bytes.len() as u64, 0, Duration::ZERO)
				}
			})
			.collect();

		let (mut raw, mut gzipped) = (0u64, 0u64);
		for (r, g, gz_time) in results {
			raw += r;
			gzipped += g;
			self.timing.gzip += gz_time;
		}

		(raw, gzipped)
	}

	/// Write changed files back to disk
	fn write_all_files(&mut self) -> Result<()> {
		let results: Vec<_> = self
			.files
			.par_iter()
			.filter(|file| file.changed())
			.map(|file| {
				let t_write = Instant::now();
				let result = fs::write(&file.path, file.output())
					.with_context(|| format!("Failed to write {}", file.path.display()));
				(result, t_write.elapsed())
			})
			.collect();

		for (result, write_time) in results {
			result?;
			self.timing.file_write += write_time;
		}

		Ok(())
	}

	/// Write the mapping table as a JSON array in assignment order
	fn write_mapping(&self, path: &Path) -> Result<()> {
		let json = serde_json::to_string_pretty(self.stage.mappings().entries())?;
		fs::write(path, json + "\n")
			.with_context(|| format!("Failed to write mapping to {}", path.display()))?;
		Ok(())
	}
}

/// Gzipped size of `bytes`
pub fn gzip_size(bytes: &[u8]) -> u64 {
	let mut encoder = GzEncoder::new(bytes, Compression::default());
	let mut compressed = Vec::new();
	let _ = encoder.read_to_end(&mut compressed);
	compressed.len() as u64
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
	if bytes >= 1024 * 1024 {
		format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
	} else {
		format!("{} KB", (bytes as f64 / 1024.0).round() as u64)
	}
}

/// Format bytes with sign (for savings that can be negative)
pub fn format_bytes_signed(bytes: i64) -> String {
	let abs = bytes.unsigned_abs();
	let formatted = format_bytes(abs);
	if bytes < 0 {
		format!("-{}", formatted)
	} else {
		formatted
	}
}
