//! SKU assignment stage (C7): combined-embedding search against the
//! materials reference, with confident/weak/self-seeding policy.

use uuid::Uuid;

use crate::ai::{EmbeddingSource, SharedAiClient};
use crate::errors::{Error, Result};
use crate::reference::{ReferenceCollections, ReferenceEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkuConfidence {
    Confident,
    Low,
    Unassigned,
}

#[derive(Debug, Clone)]
pub struct SkuAssignment {
    pub sku: Option<String>,
    pub confidence: SkuConfidence,
    pub self_seeded: bool,
}

pub struct SkuAssignmentStage {
    ai: SharedAiClient,
    confident_threshold: f32,
    weak_threshold: f32,
    candidates: usize,
}

impl SkuAssignmentStage {
    pub fn new(ai: SharedAiClient, confident_threshold: f32, weak_threshold: f32, candidates: usize) -> Self {
        Self {
            ai,
            confident_threshold,
            weak_threshold,
            candidates,
        }
    }

    /// Builds the combined embedding from `{name} {parsed_unit} {color}`,
    /// each part stripped and lower-cased, missing parts omitted cleanly.
    pub fn combined_text(name: &str, parsed_unit: Option<&str>, color: Option<&str>) -> String {
        [Some(name), parsed_unit, color]
            .into_iter()
            .flatten()
            .map(|part| part.trim().to_lowercase())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Assigns a SKU, writing a self-seeded reference entry when no
    /// candidate clears even the weak threshold. Returns the assignment
    /// plus the combined embedding, which the caller persists on the
    /// enriched Material.
    pub async fn assign(
        &self,
        material_name: &str,
        use_category: &str,
        unit: &str,
        parsed_unit: Option<&str>,
        color: Option<&str>,
        refs: &ReferenceCollections,
    ) -> Result<(SkuAssignment, Vec<f32>)> {
        let combined = Self::combined_text(material_name, parsed_unit, color);
        let embedding = self.ai.embed(&combined).await?;

        if self.ai.strict() && matches!(embedding.source, EmbeddingSource::Fallback) {
            return Err(Error::Unavailable {
                resource: "ai".to_string(),
                message: "embedding fell back to a deterministic hash while ai.strict is enabled".to_string(),
            });
        }

        let candidates = refs.materials.nearest_k(&embedding.vector, self.candidates).await?;
        let top = candidates.first();

        let assignment = match top {
            Some((entry, score)) if *score >= self.confident_threshold => SkuAssignment {
                sku: Some(sku_from_entry(entry)),
                confidence: SkuConfidence::Confident,
                self_seeded: false,
            },
            Some((entry, score)) if *score >= self.weak_threshold => SkuAssignment {
                sku: Some(sku_from_entry(entry)),
                confidence: SkuConfidence::Low,
                self_seeded: false,
            },
            _ => {
                let seed_name = format!("{material_name}|{unit}");
                refs.materials.add(seed_name, Vec::new()).await.ok();
                SkuAssignment {
                    sku: None,
                    confidence: SkuConfidence::Unassigned,
                    self_seeded: true,
                }
            }
        };

        let _ = use_category;
        Ok((assignment, embedding.vector))
    }
}

/// Derives a short SKU code from the reference entry's id rather than its
/// name: names are free text up to 200 chars (including the `|unit` suffix
/// a self-seeded entry carries), while a SKU is bounded to 3-50 chars by
/// both the domain invariant and the `materials.sku` column.
fn sku_from_entry(entry: &ReferenceEntry) -> String {
    let compact = entry.id.simple().to_string();
    format!("SKU-{}", &compact[..12]).to_uppercase()
}

pub fn new_material_id() -> Uuid {
    Uuid::new_v4()
}
