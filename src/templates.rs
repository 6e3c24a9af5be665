//! # Post Templates
//!
//! Named text patterns used by the renderer, plus the selector that picks one
//! from a product's change events.
//!
//! - Stored as a pretty JSON object `name → template`.
//! - Seeded with the built-in `default` and `flash_sale` when the file is absent.
//! - `default` always resolves; unknown names fall back to it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::change_detector::{ChangeEvent, Direction};
use crate::store::write_atomic;

pub const DEFAULT_TEMPLATE: &str = "default";
pub const FLASH_SALE_TEMPLATE: &str = "flash_sale";

/// Drops of at least this many percent escalate to the flash-sale template.
pub const FLASH_SALE_THRESHOLD_PCT: f64 = 10.0;

/// Text patterns. Placeholders: `{diff}`, `{percent}`, `{old}`, `{new}`,
/// `{price}`. Missing fields deserialize as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostTemplate {
    pub title: String,
    pub price_up: String,
    pub price_down: String,
    pub availability_change: String,
    pub current_price: String,
    pub footer: String,
}

impl PostTemplate {
    pub fn builtin_default() -> Self {
        Self {
            title: "【Amazon価格・在庫変動】".into(),
            price_up: "⬆️ {diff}円上昇 ({percent}%)".into(),
            price_down: "⬇️ {diff}円下落 ({percent}%)".into(),
            availability_change: "在庫状況: {old} → {new}".into(),
            current_price: "現在価格: {price}円".into(),
            footer: String::new(),
        }
    }

    pub fn builtin_flash_sale() -> Self {
        Self {
            title: "🔥【緊急値下げ速報】🔥".into(),
            price_up: "値上げ: +{diff}円 (+{percent}%)".into(),
            price_down: "【値下げ】{diff}円引き ({percent}%オフ)".into(),
            availability_change: "在庫状況変更: {old} → {new}".into(),
            current_price: "✅ 特価: {price}円".into(),
            footer: "#お買い得 #タイムセール".into(),
        }
    }
}

fn builtins() -> BTreeMap<String, PostTemplate> {
    let mut m = BTreeMap::new();
    m.insert(DEFAULT_TEMPLATE.to_string(), PostTemplate::builtin_default());
    m.insert(FLASH_SALE_TEMPLATE.to_string(), PostTemplate::builtin_flash_sale());
    m
}

/// Pick a template name for one product's events (detection order).
pub fn select_template(events: &[ChangeEvent]) -> &'static str {
    let flash = events.iter().any(|ev| {
        matches!(
            ev,
            ChangeEvent::PriceChanged { direction: Direction::Down, delta_percent, .. }
                if delta_percent.abs() >= FLASH_SALE_THRESHOLD_PCT
        )
    });
    if flash {
        FLASH_SALE_TEMPLATE
    } else {
        DEFAULT_TEMPLATE
    }
}

#[derive(Debug, Clone)]
pub struct TemplateStore {
    path: Option<PathBuf>,
    templates: BTreeMap<String, PostTemplate>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl TemplateStore {
    /// Built-ins only, never persisted.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            templates: builtins(),
        }
    }

    /// Read `path`, or seed it with the built-ins when it does not exist.
    pub fn load_or_seed(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            tracing::info!(path = %path.display(), "template file not found; seeding built-ins");
            let store = Self {
                path: Some(path),
                templates: builtins(),
            };
            store.save()?;
            return Ok(store);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading templates from {}", path.display()))?;
        let mut templates: BTreeMap<String, PostTemplate> = serde_json::from_str(&content)
            .with_context(|| format!("parsing templates in {}", path.display()))?;

        if !templates.contains_key(DEFAULT_TEMPLATE) {
            tracing::warn!(path = %path.display(), "template file lacks `default`; using built-in");
            templates.insert(DEFAULT_TEMPLATE.to_string(), PostTemplate::builtin_default());
        }

        Ok(Self {
            path: Some(path),
            templates,
        })
    }

    pub fn get(&self, name: &str) -> Option<&PostTemplate> {
        self.templates.get(name)
    }

    /// Falls back to `default` for unregistered names.
    pub fn resolve(&self, name: &str) -> &PostTemplate {
        match self.templates.get(name) {
            Some(t) => t,
            None => {
                tracing::debug!(template = name, "template not registered; using default");
                &self.templates[DEFAULT_TEMPLATE]
            }
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Insert or replace `name` and persist.
    pub fn add_template(&mut self, name: &str, template: PostTemplate) -> Result<()> {
        let name = name.trim();
        anyhow::ensure!(!name.is_empty(), "template name must not be empty");
        self.templates.insert(name.to_string(), template);
        self.save()?;
        tracing::info!(template = name, "template added");
        Ok(())
    }

    /// Read a single template from a JSON file and register it.
    pub fn add_template_from_file(&mut self, name: &str, file: &Path) -> Result<()> {
        let content = fs::read_to_string(file)
            .with_context(|| format!("reading template file {}", file.display()))?;
        let template: PostTemplate = serde_json::from_str(&content)
            .with_context(|| format!("parsing template file {}", file.display()))?;
        self.add_template(name, template)
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(&self.templates).context("serialize templates")?;
        write_atomic(path, &json)?;
        tracing::debug!(path = %path.display(), "templates saved");
        Ok(())
    }
}
