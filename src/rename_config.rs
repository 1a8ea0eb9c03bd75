//! Rename configuration detection and loading.
//!
//! Finds `html-rename.json` or a `package.json` with an `htmlRename` key.

use crate::prefix::PrefixSpec;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "html-rename.json";
pub const PACKAGE_JSON_KEY: &str = "htmlRename";

/// Settings read from a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameConfig {
	/// Directory to process, resolved against the config file's directory
	#[serde(default)]
	pub root_dir: Option<PathBuf>,
	/// Custom prefixes, bare strings or `{ "prefix": ..., "type": ... }`
	#[serde(default)]
	pub prefixes: Vec<PrefixSpec>,
	/// Additional eligible file extensions
	#[serde(default)]
	pub extensions: Vec<String>,
	/// Path to the config file that was found
	#[serde(skip)]
	pub config_path: PathBuf,
}

/// Find rename config by searching upward from a starting directory.
///
/// Searches for:
/// 1. `html-rename.json` in the directory or any parent
/// 2. `package.json` with an `"htmlRename"` key in the directory or any parent
///
/// Returns `Ok(None)` if no config is found.
pub fn find_rename_config(start_dir: &Path) -> Result<Option<RenameConfig>> {
	for dir in start_dir.ancestors() {
		let config_path = dir.join(CONFIG_FILE_NAME);
		if config_path.exists() {
			let json = read_json(&config_path)?;
			return parse_config(json, dir, config_path).map(Some);
		}

		let package_json_path = dir.join("package.json");
		if package_json_path.exists() {
			// Unreadable package.json files belong to other tools; keep looking
			let Ok(mut json) = read_json(&package_json_path) else {
				continue;
			};
			if let Some(section) = json.get_mut(PACKAGE_JSON_KEY) {
				let section = section.take();
				return parse_config(section, dir, package_json_path).map(Some);
			}
		}
	}

	Ok(None)
}

fn read_json(path: &Path) -> Result<Value> {
	let content =
		fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
	serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn parse_config(json: Value, dir: &Path, config_path: PathBuf) -> Result<RenameConfig> {
	let mut config: RenameConfig = serde_json::from_value(json)
		.with_context(|| format!("Invalid rename config in {}", config_path.display()))?;

	if config.prefixes.iter().any(|p| p.prefix().is_empty()) {
		bail!(
			"Invalid rename config in {}: prefixes must not be empty strings",
			config_path.display()
		);
	}

	config.root_dir = config.root_dir.map(|root| dir.join(root));
	config.config_path = config_path;
	Ok(config)
}
