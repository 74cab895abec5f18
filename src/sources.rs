//! SDL Sources
//!
//! Loads one SDL document per protocol from a directory, or from the
//! protocol schemas compiled into the binary. The protocol id is the file
//! stem (`schemas/uniswap.graphql` -> `uniswap`).

use include_dir::{include_dir, Dir};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::SourceConfig;
use crate::error::Result;

/// Protocol schemas shipped with the crate
static BUNDLED_SCHEMAS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/schemas");

/// One protocol's SDL text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSource {
    pub protocol_id: String,
    pub sdl: String,
    /// Where the text came from (relative for bundled sources)
    pub path: PathBuf,
}

impl SchemaSource {
    pub fn new(protocol_id: impl Into<String>, sdl: impl Into<String>) -> Self {
        Self {
            protocol_id: protocol_id.into(),
            sdl: sdl.into(),
            path: PathBuf::new(),
        }
    }
}

/// Load every matching file under `dir`, sorted by path
pub fn load_from_directory(dir: &Path, config: &SourceConfig) -> Result<Vec<SchemaSource>> {
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| has_extension(p, &config.extension))
        .collect();
    paths.sort();

    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(protocol_id) = protocol_id(&path) else {
            continue;
        };
        let sdl = fs::read_to_string(&path)?;
        sources.push(SchemaSource { protocol_id, sdl, path });
    }

    tracing::debug!(dir = %dir.display(), count = sources.len(), "loaded schema sources");
    Ok(sources)
}

/// The schemas compiled into the binary, sorted by path
pub fn bundled_sources() -> Vec<SchemaSource> {
    let mut files = Vec::new();
    collect_embedded_files(&BUNDLED_SCHEMAS, &mut files);
    files.sort_by(|a, b| a.0.cmp(b.0));

    files
        .into_iter()
        .filter_map(|(path, sdl)| {
            Some(SchemaSource {
                protocol_id: protocol_id(path)?,
                sdl: sdl.to_string(),
                path: path.to_path_buf(),
            })
        })
        .collect()
}

/// A single bundled schema by protocol id
pub fn bundled_source(protocol_id: &str) -> Option<SchemaSource> {
    bundled_sources().into_iter().find(|s| s.protocol_id == protocol_id)
}

/// Recursively collect SDL files from embedded directory
fn collect_embedded_files<'a>(dir: &'a Dir<'static>, files: &mut Vec<(&'a Path, &'a str)>) {
    for file in dir.files() {
        let path = file.path();
        if has_extension(path, "graphql") {
            if let Some(content) = file.contents_utf8() {
                files.push((path, content));
            }
        }
    }

    for subdir in dir.dirs() {
        collect_embedded_files(subdir, files);
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().map(|e| e == extension).unwrap_or(false)
}

fn protocol_id(path: &Path) -> Option<String> {
    path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
}
