//! Id and Class Renaming CLI
//!
//! Shortens prefixed ids and classes across the HTML, CSS and JS files of a
//! build directory.

use anyhow::{bail, Result};
use clap::Parser;
use html_rename::rename_config::find_rename_config;
use html_rename::{Config, PrefixSpec, Renamer};
use std::env;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "html-rename")]
#[command(author = "Fellow <engineering@fellow.app>")]
#[command(version)]
#[command(about = "Shorten prefixed ids and classes across HTML, CSS and JS files", long_about = None)]
struct Args {
	/// Directory to rewrite (optional if the rename config has rootDir)
	#[arg(value_name = "DIR")]
	dir: Option<PathBuf>,

	/// Custom prefix, optionally tagged with a type: PREFIX[:id|long-id|class]
	#[arg(short, long = "prefix", value_name = "PREFIX")]
	prefixes: Vec<PrefixSpec>,

	/// Additional file extension to rewrite (html, css and js are always included)
	#[arg(short, long = "ext", value_name = "EXT")]
	extensions: Vec<String>,

	/// Show what would change without writing files
	#[arg(short = 'n', long)]
	dry_run: bool,

	/// Print detailed progress and statistics
	#[arg(short, long)]
	verbose: bool,

	/// Write the token to name mapping as JSON
	#[arg(short, long, value_name = "FILE")]
	mapping: Option<PathBuf>,

	/// Show gzipped size savings in output
	#[arg(long)]
	show_gzip: bool,

	/// Show timing breakdown
	#[arg(long)]
	show_timing: bool,

	/// Ignore html-rename.json and package.json settings
	#[arg(long)]
	no_config: bool,
}

fn main() -> Result<()> {
	let args = Args::parse();

	// Prefer RUST_LOG, fall back to the verbosity flag
	let default_level = if args.verbose { "debug" } else { "warn" };
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
		)
		.with_writer(std::io::stderr)
		.init();

	let file_config = if args.no_config {
		None
	} else {
		find_rename_config(&env::current_dir()?)?
	};
	if let Some(ref config) = file_config {
		tracing::info!(path = %config.config_path.display(), "Using rename config");
	}

	// Determine the directory to rewrite
	let root_dir = if let Some(dir) = args.dir.clone() {
		dir
	} else if let Some(ref config) = file_config {
		config.root_dir.clone().ok_or_else(|| {
			anyhow::anyhow!(
				"No DIR specified and rename config ({}) has no rootDir.\n\
				 Either specify a directory: html-rename ./dist\n\
				 Or add rootDir to your rename config.",
				config.config_path.display()
			)
		})?
	} else {
		bail!(
			"No DIR specified and no rename config found.\n\
			 Usage: html-rename <DIR>\n\
			 Example: html-rename ./dist"
		);
	};

	if !root_dir.is_dir() {
		bail!("Directory does not exist: {}", root_dir.display());
	}

	// Config file values first, command line values appended
	let (mut prefixes, mut extensions) = file_config
		.map(|config| (config.prefixes, config.extensions))
		.unwrap_or_default();
	prefixes.extend(args.prefixes);
	extensions.extend(args.extensions);

	let compute_gzip = args.verbose || args.show_gzip;

	let config = Config {
		root_dir,
		prefixes,
		extensions,
		dry_run: args.dry_run,
		verbose: args.verbose,
		compute_gzip,
		mapping_out: args.mapping,
	};

	let start_time = Instant::now();
	let mut renamer = Renamer::new(config)?;
	let stats = renamer.run()?;
	let total_time = start_time.elapsed();

	for error in &renamer.errors {
		eprintln!("{}", error);
	}

	let time_str = format!("{:.2}s", total_time.as_secs_f64());

	if !args.verbose {
		if args.show_gzip {
			println!(
				"Renamed {} tokens in {} files, saved {} raw ({:.1}%), {} gzipped ({:.1}%) in {}",
				stats.tokens_renamed,
				stats.files_rewritten,
				html_rename::format_bytes_signed(stats.raw_savings()),
				stats.raw_savings_percent(),
				html_rename::format_bytes_signed(stats.gzipped_savings()),
				stats.gzipped_savings_percent(),
				time_str
			);
		} else {
			println!(
				"Renamed {} tokens in {} files, saved {} raw ({:.1}%) in {}",
				stats.tokens_renamed,
				stats.files_rewritten,
				html_rename::format_bytes_signed(stats.raw_savings()),
				stats.raw_savings_percent(),
				time_str
			);
		}
	} else {
		println!("\nTotal time: {}", time_str);
	}

	if args.show_timing {
		let t = &renamer.timing;
		let total_io = t.file_read.as_secs_f64() + t.file_write.as_secs_f64();
		let mut total_cpu = t.rewrite.as_secs_f64();
		if compute_gzip {
			total_cpu += t.gzip.as_secs_f64();
		}

		eprintln!("\n=== Timing breakdown ===");
		eprintln!("I/O:");
		eprintln!("  file_read:   {:>7.1}ms", t.file_read.as_secs_f64() * 1000.0);
		eprintln!("  file_write:  {:>7.1}ms", t.file_write.as_secs_f64() * 1000.0);
		eprintln!("  --- total I/O: {:>7.1}ms", total_io * 1000.0);
		eprintln!("CPU:");
		eprintln!("  rewrite:     {:>7.1}ms", t.rewrite.as_secs_f64() * 1000.0);
		if compute_gzip {
			eprintln!("  gzip:        {:>7.1}ms", t.gzip.as_secs_f64() * 1000.0);
		}
		eprintln!("  --- total CPU: {:>7.1}ms", total_cpu * 1000.0);
	}

	if stats.errors > 0 {
		bail!("{} file(s) could not be rewritten", stats.errors);
	}

	Ok(())
}
