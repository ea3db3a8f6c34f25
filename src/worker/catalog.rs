use super::ContentSource;
use crate::content::types::{ContentResponse, ContentType, ContentUnit};

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

/// Answers from a fixed list of units held in memory.
pub struct CatalogSource {
    units: Vec<ContentUnit>,
}

impl CatalogSource {
    /// Keeps the units of `content_type`; units without a type are assumed to be of it.
    pub fn from_units(content_type: ContentType, units: Vec<ContentUnit>) -> Self {
        let units = units
            .into_iter()
            .filter_map(|mut unit| {
                if unit.content_type.is_empty() {
                    unit.content_type = content_type.as_str().to_string();
                }
                (unit.content_type == content_type.as_str()).then_some(unit)
            })
            .collect();

        Self { units }
    }

    /// Loads a JSON array of units.
    pub async fn load(path: impl AsRef<Path>, content_type: ContentType) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading catalog {}", path.display()))?;
        let units: Vec<ContentUnit> = serde_json::from_slice(&raw)
            .with_context(|| format!("parsing catalog {}", path.display()))?;

        let source = Self::from_units(content_type, units);
        tracing::info!("Loaded {} {} units from {}", source.len(), content_type, path.display());
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }
}

#[async_trait]
impl ContentSource for CatalogSource {
    /// Case-insensitive title substring match, in catalog order.
    async fn find_by_name(&self, name: &str) -> Result<ContentResponse> {
        let needle = name.to_lowercase();
        Ok(self
            .units
            .iter()
            .filter(|unit| unit.title.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}
