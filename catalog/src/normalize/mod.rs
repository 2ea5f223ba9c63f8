//! Normalization stage (C6): embedding-NN normalization of color/unit
//! against the C3 reference collections.

use crate::ai::{EmbeddingSource, SharedAiClient};
use crate::errors::Result;
use crate::reference::ReferenceCollections;

#[derive(Debug, Clone, Default)]
pub struct NormalizedField {
    pub canonical_name: Option<String>,
    pub raw_value: String,
    pub normalization_failed: bool,
}

pub struct NormalizationStage {
    ai: SharedAiClient,
    color_threshold: f32,
    unit_threshold: f32,
}

impl NormalizationStage {
    pub fn new(ai: SharedAiClient, color_threshold: f32, unit_threshold: f32) -> Self {
        Self {
            ai,
            color_threshold,
            unit_threshold,
        }
    }

    async fn normalize_against(&self, raw: &str, threshold: f32, collection: &crate::reference::ReferenceCollection) -> Result<NormalizedField> {
        let embedding = self.ai.embed(raw).await?;
        if matches!(embedding.source, EmbeddingSource::Fallback) {
            return Ok(NormalizedField {
                canonical_name: None,
                raw_value: raw.to_string(),
                normalization_failed: true,
            });
        }

        match collection.nearest(&embedding.vector).await? {
            Some((entry, score)) if score >= threshold => Ok(NormalizedField {
                canonical_name: Some(entry.name),
                raw_value: raw.to_string(),
                normalization_failed: false,
            }),
            _ => Ok(NormalizedField {
                canonical_name: None,
                raw_value: raw.to_string(),
                normalization_failed: true,
            }),
        }
    }

    pub async fn normalize_color(&self, raw: Option<&str>, refs: &ReferenceCollections) -> Result<Option<NormalizedField>> {
        match raw {
            Some(raw) if !raw.trim().is_empty() => Ok(Some(self.normalize_against(raw, self.color_threshold, &refs.colors).await?)),
            _ => Ok(None),
        }
    }

    pub async fn normalize_unit(&self, raw: Option<&str>, refs: &ReferenceCollections) -> Result<Option<NormalizedField>> {
        match raw {
            Some(raw) if !raw.trim().is_empty() => Ok(Some(self.normalize_against(raw, self.unit_threshold, &refs.units).await?)),
            _ => Ok(None),
        }
    }
}
