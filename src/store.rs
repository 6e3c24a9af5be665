// src/store.rs
//! Tracked-product persistence: one JSON record per line, read in full at
//! startup and rewritten in full after each cycle.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::product::TrackedProduct;

#[derive(Debug, Clone)]
pub struct ProductStore {
    path: PathBuf,
}

impl ProductStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file → empty list. Unreadable lines are skipped with a warning.
    /// A legacy JSON array file is accepted as well.
    pub fn load(&self) -> Result<Vec<TrackedProduct>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "product store not found; starting empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading products from {}", self.path.display()))
            }
        };

        if content.trim_start().starts_with('[') {
            return self.load_legacy_array(&content);
        }

        let mut out = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<TrackedProduct>(line) {
                Ok(p) => out.push(p),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    line = lineno + 1,
                    error = %e,
                    "skipping unreadable product record"
                ),
            }
        }
        Ok(out)
    }

    /// Whole-file JSON array from older versions. The array itself must parse;
    /// individual records that don't are skipped like bad JSONL lines.
    fn load_legacy_array(&self, content: &str) -> Result<Vec<TrackedProduct>> {
        let raw: Vec<serde_json::Value> = serde_json::from_str(content)
            .with_context(|| format!("parsing legacy product list {}", self.path.display()))?;
        let mut out = Vec::with_capacity(raw.len());
        for (idx, value) in raw.into_iter().enumerate() {
            match serde_json::from_value::<TrackedProduct>(value) {
                Ok(p) => out.push(p),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    index = idx,
                    error = %e,
                    "skipping unreadable legacy product record"
                ),
            }
        }
        tracing::info!(path = %self.path.display(), count = out.len(), "loaded legacy product list");
        Ok(out)
    }

    pub fn save(&self, products: &[TrackedProduct]) -> Result<()> {
        let mut buf = Vec::new();
        for p in products {
            serde_json::to_writer(&mut buf, p).context("serialize product")?;
            buf.push(b'\n');
        }
        write_atomic(&self.path, &buf)?;
        tracing::info!(path = %self.path.display(), count = products.len(), "products saved");
        Ok(())
    }
}

/// Write to a sibling temp file, then rename over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let mut f = fs::File::create(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(bytes)
            .with_context(|| format!("writing {}", tmp.display()))?;
        f.sync_all().ok();
    }
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
