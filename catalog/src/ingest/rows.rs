//! Tabular row schemas (§6/§9): two legal shapes, auto-detected by
//! column presence, each modeled as a tagged variant with a strict
//! schema. Unknown columns are dropped with a warning, not an error.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyRow {
    pub name: String,
    pub use_category: Option<String>,
    pub unit: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtendedRow {
    pub name: String,
    pub sku: Option<String>,
    pub use_category: Option<String>,
    pub unit_price: Option<Decimal>,
    pub unit_price_currency: Option<String>,
    pub unit_calc_price: Option<Decimal>,
    pub buy_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub calc_unit: String,
    pub count: Option<Decimal>,
    pub date_price_change: Option<String>,
}

#[derive(Debug, Clone)]
pub enum RowSchema {
    Legacy(LegacyRow),
    Extended(ExtendedRow),
}

#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    pub row_index: usize,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedRow {
    pub name: String,
    pub unit: String,
    pub use_category: String,
    pub sku: Option<String>,
    pub unit_price: Option<Decimal>,
    pub unit_price_currency: String,
}

impl RowSchema {
    pub fn normalize(&self) -> Result<NormalizedRow, FieldError> {
        match self {
            RowSchema::Legacy(row) => normalize_legacy(row),
            RowSchema::Extended(row) => normalize_extended(row),
        }
    }

    /// Auto-detects legacy vs extended by the presence of `calc_unit`,
    /// the one column legacy rows never carry.
    pub fn from_value(value: serde_json::Value) -> Result<Self, FieldError> {
        if value.get("calc_unit").is_some() {
            serde_json::from_value::<ExtendedRow>(value)
                .map(RowSchema::Extended)
                .map_err(|err| FieldError::new("row", err.to_string()))
        } else {
            serde_json::from_value::<LegacyRow>(value)
                .map(RowSchema::Legacy)
                .map_err(|err| FieldError::new("row", err.to_string()))
        }
    }
}

fn normalize_legacy(row: &LegacyRow) -> Result<NormalizedRow, FieldError> {
    let name = row.name.trim().to_string();
    if name.len() < 2 || name.len() > 200 {
        return Err(FieldError::new("name", "name must be between 2 and 200 characters"));
    }

    let unit = row
        .unit
        .clone()
        .filter(|u| !u.trim().is_empty())
        .or_else(|| crate::parser::guess_unit_from_name(&name))
        .ok_or_else(|| FieldError::new("unit", "unit is missing and could not be inferred"))?;

    let use_category = row.use_category.clone().unwrap_or_else(|| infer_category(&name));

    let price = row
        .price
        .as_deref()
        .map(|raw| parse_decimal_comma_or_dot(raw))
        .transpose()
        .map_err(|message| FieldError::new("price", message))?;

    Ok(NormalizedRow {
        name,
        unit,
        use_category,
        sku: None,
        unit_price: price,
        unit_price_currency: "RUB".to_string(),
    })
}

fn normalize_extended(row: &ExtendedRow) -> Result<NormalizedRow, FieldError> {
    let name = row.name.trim().to_string();
    if name.len() < 2 || name.len() > 200 {
        return Err(FieldError::new("name", "name must be between 2 and 200 characters"));
    }

    let calc_unit = row.calc_unit.trim();
    if calc_unit.is_empty() {
        return Err(FieldError::new("calc_unit", "calc_unit is required"));
    }

    if let Some(raw_date) = &row.date_price_change {
        parse_flexible_date(raw_date).map_err(|message| FieldError::new("date_price_change", message))?;
    }

    let use_category = row.use_category.clone().unwrap_or_else(|| infer_category(&name));

    Ok(NormalizedRow {
        name,
        unit: calc_unit.to_string(),
        use_category,
        sku: row.sku.clone(),
        unit_price: row.unit_price,
        unit_price_currency: row.unit_price_currency.clone().unwrap_or_else(|| "RUB".to_string()),
    })
}

fn parse_decimal_comma_or_dot(raw: &str) -> Result<Decimal, String> {
    let normalized = raw.trim().replace(',', ".");
    Decimal::from_str(&normalized).map_err(|_| format!("{raw:?} is not a valid decimal"))
}

fn parse_flexible_date(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_hms_opt(0, 0, 0).unwrap().and_utc())
        .map_err(|_| format!("{raw:?} is not ISO-8601 or YYYY-MM-DD"))
}

/// Russian-language keyword lexicon for inferring `use_category` when a
/// row omits it (§9 "Dynamic typing / duck-typed records").
const CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("цемент", "вяжущие"),
    ("кирпич", "стеновые материалы"),
    ("саморез", "крепёж"),
    ("гвозд", "крепёж"),
    ("краск", "лакокрасочные материалы"),
    ("утеплит", "теплоизоляция"),
    ("труб", "трубы и фитинги"),
    ("кабел", "электрика"),
    ("плитк", "отделочные материалы"),
    ("гипсокартон", "отделочные материалы"),
];

fn infer_category(name: &str) -> String {
    let lower = name.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, category)| category.to_string())
        .unwrap_or_else(|| "прочее".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_row_infers_category_and_unit() {
        let row = LegacyRow {
            name: "Цемент портландский М500 50кг".to_string(),
            use_category: None,
            unit: None,
            price: Some("350,50".to_string()),
            description: None,
        };
        let normalized = RowSchema::Legacy(row).normalize().unwrap();
        assert_eq!(normalized.use_category, "вяжущие");
        assert_eq!(normalized.unit, "кг");
        assert_eq!(normalized.unit_price.unwrap().to_string(), "350.50");
    }

    #[test]
    fn extended_row_requires_calc_unit() {
        let row = ExtendedRow {
            name: "Кирпич облицовочный".to_string(),
            sku: None,
            use_category: None,
            unit_price: None,
            unit_price_currency: None,
            unit_calc_price: None,
            buy_price: None,
            sale_price: None,
            calc_unit: "".to_string(),
            count: None,
            date_price_change: None,
        };
        assert!(RowSchema::Extended(row).normalize().is_err());
    }

    #[test]
    fn rejects_short_name() {
        let row = LegacyRow {
            name: "x".to_string(),
            use_category: None,
            unit: Some("шт".to_string()),
            price: None,
            description: None,
        };
        assert!(RowSchema::Legacy(row).normalize().is_err());
    }
}
