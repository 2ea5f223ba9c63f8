//! Post-retrieval highlighting: wraps query-term matches in `name`/
//! `description` with `<mark>...</mark>` tags (§4.9). Performed only on
//! the final page, never during retrieval.

use regex::{escape, Regex};

use super::query::Highlight;
use crate::db::Material;

pub fn highlight_material(query: &str, material: &Material) -> Vec<Highlight> {
    let mut highlights = Vec::new();
    let Some(pattern) = build_pattern(query) else {
        return highlights;
    };

    if let Some(marked) = mark(&pattern, &material.name) {
        highlights.push(Highlight {
            field: "name".to_string(),
            original: material.name.clone(),
            marked,
        });
    }
    if let Some(description) = &material.description {
        if let Some(marked) = mark(&pattern, description) {
            highlights.push(Highlight {
                field: "description".to_string(),
                original: description.clone(),
                marked,
            });
        }
    }
    highlights
}

fn build_pattern(query: &str) -> Option<Regex> {
    let terms: Vec<String> = query.split_whitespace().filter(|t| !t.is_empty()).map(escape).collect();
    if terms.is_empty() {
        return None;
    }
    Regex::new(&format!("(?i)({})", terms.join("|"))).ok()
}

fn mark(pattern: &Regex, text: &str) -> Option<String> {
    if !pattern.is_match(text) {
        return None;
    }
    Some(pattern.replace_all(text, "<mark>$1</mark>").into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn marks_matching_terms() {
        let material = Material {
            id: Uuid::new_v4(),
            name: "Цемент портландский М500".to_string(),
            use_category: "вяжущие".to_string(),
            unit: "кг".to_string(),
            sku: None,
            description: None,
            embedding: vec![0.0; 4],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let highlights = highlight_material("цемент М500", &material);
        assert_eq!(highlights.len(), 1);
        assert!(highlights[0].marked.contains("<mark>"));
    }
}
