//! Fuzzy strategy: Levenshtein and sequence-matcher ratios blended per
//! field with fixed weights (§4.9).

use strsim::{jaro_winkler, normalized_levenshtein};

use crate::db::Material;

const FIELD_WEIGHTS: [(&str, f64); 4] = [("name", 0.4), ("description", 0.3), ("use_category", 0.2), ("sku", 0.1)];

fn field_ratio(query: &str, field: Option<&str>) -> f64 {
    match field {
        Some(value) if !value.is_empty() => {
            let levenshtein = normalized_levenshtein(query, value);
            let sequence = jaro_winkler(query, value);
            (levenshtein + sequence) / 2.0
        }
        _ => 0.0,
    }
}

/// Blended fuzzy score for one material against the query text, in [0, 1].
pub fn score(query: &str, material: &Material) -> f32 {
    let query = &query.to_lowercase();
    let fields: [(&str, Option<String>); 4] = [
        ("name", Some(material.name.to_lowercase())),
        ("description", material.description.as_ref().map(|s| s.to_lowercase())),
        ("use_category", Some(material.use_category.to_lowercase())),
        ("sku", material.sku.as_ref().map(|s| s.to_lowercase())),
    ];

    let mut total = 0.0;
    for ((name, value), (_, weight)) in fields.iter().zip(FIELD_WEIGHTS.iter()) {
        total += field_ratio(query, value.as_deref()) * weight;
        let _ = name;
    }
    total as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample(name: &str) -> Material {
        Material {
            id: Uuid::new_v4(),
            name: name.to_string(),
            use_category: "цемент".to_string(),
            unit: "кг".to_string(),
            sku: Some("SKU-1".to_string()),
            description: None,
            embedding: vec![0.0; 4],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn exact_match_scores_high() {
        let material = sample("саморез 4x50");
        assert!(score("саморез 4x50", &material) > 0.9);
    }

    #[test]
    fn unrelated_text_scores_low() {
        let material = sample("саморез 4x50");
        assert!(score("кирпич облицовочный", &material) < 0.5);
    }
}
