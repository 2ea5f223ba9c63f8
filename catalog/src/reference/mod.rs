//! Reference collections (C3): colors, units, materials as
//! nearest-neighbor targets for normalization (C6) and SKU assignment (C7).

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::ai::SharedAiClient;
use crate::errors::{Error, Result};
use crate::store::{VectorFilter, VectorPoint, VectorStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub id: Uuid,
    pub name: String,
    pub aliases: Vec<String>,
}

/// Which of the three reference collections this handle targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Color,
    Unit,
    Material,
}

impl ReferenceKind {
    pub fn collection_name(self) -> &'static str {
        match self {
            ReferenceKind::Color => "reference_colors",
            ReferenceKind::Unit => "reference_units",
            ReferenceKind::Material => "reference_materials",
        }
    }
}

/// Writes take a per-collection mutex to serialize the canonical-name
/// uniqueness pre-check against concurrent inserts (§5); reads go
/// straight through the vector store, which is treated as read-mostly.
pub struct ReferenceCollection {
    kind: ReferenceKind,
    store: Arc<dyn VectorStore>,
    ai: SharedAiClient,
    write_lock: Mutex<()>,
}

impl ReferenceCollection {
    pub fn new(kind: ReferenceKind, store: Arc<dyn VectorStore>, ai: SharedAiClient) -> Self {
        Self {
            kind,
            store,
            ai,
            write_lock: Mutex::new(()),
        }
    }

    fn embedding_text(name: &str, aliases: &[String]) -> String {
        if aliases.is_empty() {
            name.to_string()
        } else {
            format!("{name} {}", aliases.join(" "))
        }
    }

    pub async fn add(&self, name: String, aliases: Vec<String>) -> Result<ReferenceEntry> {
        let _guard = self.write_lock.lock().await;

        if self.find_by_name(&name).await?.is_some() {
            return Err(Error::Conflict {
                message: format!("reference entry {name:?} already exists in {}", self.kind.collection_name()),
            });
        }

        let embedding = self.ai.embed(&Self::embedding_text(&name, &aliases)).await?;
        let id = Uuid::new_v4();
        let payload = serde_json::json!({ "name": name, "aliases": aliases });

        self.store
            .upsert(
                self.kind.collection_name(),
                vec![VectorPoint {
                    id,
                    vector: embedding.vector,
                    payload,
                }],
            )
            .await?;

        Ok(ReferenceEntry { id, name, aliases })
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.delete(self.kind.collection_name(), id).await?;
        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ReferenceEntry>> {
        let mut filter = VectorFilter::default();
        filter.equals.insert("name".to_string(), serde_json::Value::String(name.to_string()));
        // A zero vector is fine here: the filter does the matching, the
        // score is not consulted.
        let zero = vec![0.0f32; 1];
        let hits = self.store.search(self.kind.collection_name(), &zero, 1, Some(&filter)).await?;
        Ok(hits.into_iter().next().map(|hit| entry_from_payload(hit.id, &hit.payload)))
    }

    /// Finds the closest reference entry to `query_vector`, ties broken by
    /// lexicographic `name` for determinism (§4.6). Returns `None` if the
    /// collection is empty.
    pub async fn nearest(&self, query_vector: &[f32]) -> Result<Option<(ReferenceEntry, f32)>> {
        Ok(self.nearest_k(query_vector, 3).await?.into_iter().next())
    }

    /// Top-k nearest entries, ties broken by lexicographic `name` for
    /// determinism (SKU assignment, §4.7).
    pub async fn nearest_k(&self, query_vector: &[f32], k: usize) -> Result<Vec<(ReferenceEntry, f32)>> {
        let mut hits = self
            .store
            .search(self.kind.collection_name(), query_vector, k, None)
            .await?
            .into_iter()
            .map(|hit| (entry_from_payload(hit.id, &hit.payload), hit.normalized_score()))
            .collect::<Vec<_>>();

        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.name.cmp(&b.0.name)));
        Ok(hits)
    }
}

fn entry_from_payload(id: Uuid, payload: &serde_json::Value) -> ReferenceEntry {
    let name = payload.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let aliases = payload
        .get("aliases")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    ReferenceEntry { id, name, aliases }
}

/// The three collections bundled together, pre-populated at init.
pub struct ReferenceCollections {
    pub colors: ReferenceCollection,
    pub units: ReferenceCollection,
    pub materials: ReferenceCollection,
}

impl ReferenceCollections {
    pub fn new(store: Arc<dyn VectorStore>, ai: SharedAiClient) -> Self {
        Self {
            colors: ReferenceCollection::new(ReferenceKind::Color, store.clone(), ai.clone()),
            units: ReferenceCollection::new(ReferenceKind::Unit, store.clone(), ai.clone()),
            materials: ReferenceCollection::new(ReferenceKind::Material, store, ai),
        }
    }

    /// Seeds a default set of canonical colors/units if the collections
    /// are empty. Safe to call on every startup: `add` rejects duplicate
    /// names.
    pub async fn seed_defaults(&self) -> Result<()> {
        const DEFAULT_COLORS: &[&str] = &["белый", "чёрный", "красный", "серый", "жёлтый", "зелёный", "синий", "коричневый"];
        const DEFAULT_UNITS: &[(&str, &[&str])] = &[
            ("кг", &["килограмм", "kg"]),
            ("т", &["тонна", "тонн"]),
            ("шт", &["штука", "штук", "pcs"]),
            ("м", &["метр", "метров"]),
            ("м2", &["кв.м", "квадратный метр"]),
            ("м3", &["куб.м", "кубический метр"]),
            ("л", &["литр", "литров"]),
            ("упак", &["упаковка", "упаковок"]),
        ];

        for color in DEFAULT_COLORS {
            if self.colors.find_by_name(color).await?.is_none() {
                self.colors.add(color.to_string(), Vec::new()).await?;
            }
        }
        for (unit, aliases) in DEFAULT_UNITS {
            if self.units.find_by_name(unit).await?.is_none() {
                self.units.add(unit.to_string(), aliases.iter().map(|s| s.to_string()).collect()).await?;
            }
        }
        Ok(())
    }
}
