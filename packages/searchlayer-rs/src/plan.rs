//! The placement plan written by `searchlayer compose`.
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use searchlayer_core::{OverlayConfig, PagePlan, RunReport};
use serde::Serialize;
use tokio::fs;

/// Every page of one output document, in order, with the configuration and report of the
/// run that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct PlacementPlan {
    pub version: String,
    pub generated_at: String,
    pub config: OverlayConfig,
    pub pages: Vec<PagePlan>,
    pub report: RunReport,
}

impl PlacementPlan {
    pub fn new(config: OverlayConfig, pages: Vec<PagePlan>, report: RunReport) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now().to_rfc3339(),
            config,
            pages,
            report,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub async fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)
            .await
            .with_context(|| format!("failed to write plan to {}", path.display()))
    }
}
