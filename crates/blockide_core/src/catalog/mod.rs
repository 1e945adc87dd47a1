//! Block palette composition.
//!
//! # Responsibility
//! - Apply an explicit override table to the block engine's base catalog.
//! - Carry the static base url the engine needs, taken from configuration.
//!
//! # Invariants
//! - Composition never mutates the base catalog; it returns a new one.
//! - Overrides apply in table order.

use crate::config::ShellConfig;
use log::warn;
use serde::{Deserialize, Serialize};

pub const ARDUINO_CATEGORY: &str = "arduino";
pub const ARDUINO_OPEN_BLOCK: &str = "arduino_open";

/// One palette category and its block names in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCategory {
    pub category: String,
    pub blocks: Vec<String>,
}

impl BlockCategory {
    pub fn new<I, B>(category: impl Into<String>, blocks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<String>,
    {
        Self {
            category: category.into(),
            blocks: blocks.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BlockOverride {
    RemoveBlock { category: String, block: String },
    AppendBlock { category: String, block: String },
    HideCategory { category: String },
}

/// Desktop build overrides: the offline shell cannot open the Arduino helper.
pub fn default_overrides() -> Vec<BlockOverride> {
    vec![BlockOverride::RemoveBlock {
        category: ARDUINO_CATEGORY.to_string(),
        block: ARDUINO_OPEN_BLOCK.to_string(),
    }]
}

/// Returns `base` with `overrides` applied.
///
/// Overrides naming an unknown category or block are skipped with a warning.
pub fn compose_catalog(base: &[BlockCategory], overrides: &[BlockOverride]) -> Vec<BlockCategory> {
    let mut catalog = base.to_vec();
    for rule in overrides {
        match rule {
            BlockOverride::RemoveBlock { category, block } => {
                match find_category(&mut catalog, category) {
                    Some(entry) => {
                        let before = entry.blocks.len();
                        entry.blocks.retain(|name| name != block);
                        if entry.blocks.len() == before {
                            warn!(
                                "event=catalog_override module=catalog status=skipped reason=unknown_block category={} block={}",
                                category, block
                            );
                        }
                    }
                    None => warn_unknown_category(category),
                }
            }
            BlockOverride::AppendBlock { category, block } => {
                match find_category(&mut catalog, category) {
                    Some(entry) => {
                        if !entry.blocks.iter().any(|name| name == block) {
                            entry.blocks.push(block.clone());
                        }
                    }
                    None => warn_unknown_category(category),
                }
            }
            BlockOverride::HideCategory { category } => {
                catalog.retain(|entry| &entry.category != category);
            }
        }
    }
    catalog
}

fn find_category<'a>(
    catalog: &'a mut [BlockCategory],
    category: &str,
) -> Option<&'a mut BlockCategory> {
    catalog.iter_mut().find(|entry| entry.category == category)
}

fn warn_unknown_category(category: &str) {
    warn!(
        "event=catalog_override module=catalog status=skipped reason=unknown_category category={}",
        category
    );
}

/// Values handed to the block engine at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogContext {
    pub base_url: Option<String>,
    pub overrides: Vec<BlockOverride>,
}

impl CatalogContext {
    pub fn from_config(config: &ShellConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            overrides: default_overrides(),
        }
    }

    pub fn compose(&self, base: &[BlockCategory]) -> Vec<BlockCategory> {
        compose_catalog(base, &self.overrides)
    }
}
