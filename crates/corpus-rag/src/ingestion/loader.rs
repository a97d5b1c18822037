//! Corpus directory loader

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::parser::FileParser;
use crate::types::{LoaderKind, RawDocument};

/// Walks a corpus directory and extracts one [`RawDocument`] per supported file
pub struct DocumentLoader {
    /// Number of files read concurrently
    parallelism: usize,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

impl DocumentLoader {
    /// Create a loader; `None` uses the CPU count
    pub fn new(parallelism: Option<usize>) -> Self {
        Self {
            parallelism: parallelism.unwrap_or_else(num_cpus::get).max(1),
        }
    }

    /// Load every recognised file under `root`.
    ///
    /// A missing root yields the single fallback document. Unreadable or
    /// undecodable files are logged and skipped.
    pub fn load(&self, root: &Path) -> Vec<RawDocument> {
        if !root.is_dir() {
            tracing::warn!("{} missing - using fallback docs", root.display());
            return vec![RawDocument::fallback()];
        }

        let files = Self::collect_files(root);
        tracing::debug!("Found {} candidate files under {}", files.len(), root.display());

        let load_all = || -> Vec<RawDocument> {
            files
                .par_iter()
                .filter_map(|(path, kind)| Self::load_file(root, path, *kind))
                .collect()
        };

        let mut docs = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallelism)
            .build()
        {
            Ok(pool) => pool.install(load_all),
            Err(e) => {
                tracing::warn!("Failed to build loader thread pool: {}, using global pool", e);
                load_all()
            }
        };

        docs.sort_by(|a, b| a.source().cmp(b.source()));
        tracing::info!("Loaded {} raw docs from {}", docs.len(), root.display());
        docs
    }

    /// Regular files under `root` with a supported extension
    fn collect_files(root: &Path) -> Vec<(PathBuf, LoaderKind)> {
        WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let kind = LoaderKind::for_path(entry.path());
                if kind.is_supported() {
                    Some((entry.into_path(), kind))
                } else {
                    tracing::debug!("Skipping unsupported file {}", entry.path().display());
                    None
                }
            })
            .collect()
    }

    fn load_file(root: &Path, path: &Path, kind: LoaderKind) -> Option<RawDocument> {
        let source = source_label(root, path);

        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                return None;
            }
        };

        match FileParser::parse(&source, kind, &data) {
            Ok(Some(content)) => Some(RawDocument::new(content, source)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        }
    }
}

/// Path relative to the corpus root with `/` separators
fn source_label(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) => relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}
