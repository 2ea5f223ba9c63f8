//! Parser stage (C5): free-text -> {color, parsed_unit, unit_coefficient}
//! via a single AI prompt. Does not embed; embeddings happen after
//! normalization so they reflect the canonical form.

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema};
use async_openai::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::config::AiConfig;
use crate::errors::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedFields {
    pub color: Option<String>,
    pub parsed_unit: Option<String>,
    pub unit_coefficient: Option<f64>,
    pub confidence: f32,
    pub low_confidence: bool,
}

pub struct ParserStage {
    client: Client<OpenAIConfig>,
    model: String,
    call_timeout: Duration,
}

const SYSTEM_PROMPT: &str = "You extract structured attributes from a construction-materials supplier row. \
Given the product name and optional unit, return JSON with `color` (a single color word or null), \
`parsed_unit` (the normalized unit token or null), `unit_coefficient` (a numeric multiplier, default 1), \
and `confidence` (0 to 1). If the name has no discernible color or unit, return null for that field and \
lower the confidence accordingly. Never invent values not implied by the input.";

impl ParserStage {
    pub fn new(config: &AiConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);
        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }
        Self {
            client: Client::with_config(openai_config),
            model: config.chat_model.clone(),
            call_timeout: Duration::from_secs(30),
        }
    }

    pub async fn parse(&self, name: &str, unit: Option<&str>) -> Result<ParsedFields> {
        let user_content = match unit {
            Some(unit) => format!("name: {name}\nunit: {unit}"),
            None => format!("name: {name}"),
        };

        let schema = json!({
            "type": "object",
            "properties": {
                "color": {"type": ["string", "null"]},
                "parsed_unit": {"type": ["string", "null"]},
                "unit_coefficient": {"type": ["number", "null"]},
                "confidence": {"type": "number"}
            },
            "required": ["confidence"]
        });

        let build_request = || {
            Ok::<_, async_openai::error::OpenAIError>(
                CreateChatCompletionRequestArgs::default()
                    .model(&self.model)
                    .messages(vec![
                        ChatCompletionRequestSystemMessageArgs::default().content(SYSTEM_PROMPT).build()?.into(),
                        ChatCompletionRequestUserMessageArgs::default().content(user_content).build()?.into(),
                    ])
                    .response_format(ResponseFormat::JsonSchema {
                        json_schema: ResponseFormatJsonSchema {
                            description: None,
                            name: "parsed_fields".to_string(),
                            schema: Some(schema),
                            strict: Some(true),
                        },
                    })
                    .build()?,
            )
        };
        let request = match build_request() {
            Ok(request) => request,
            Err(_) => return Ok(low_confidence_passthrough(name, unit)),
        };

        let outcome = tokio::time::timeout(self.call_timeout, self.client.chat().create(request)).await;

        let parsed = match outcome {
            Ok(Ok(response)) => response
                .choices
                .first()
                .and_then(|choice| choice.message.content.as_deref())
                .and_then(|content| serde_json::from_str::<ParsedFields>(content).ok()),
            _ => None,
        };

        Ok(parsed.unwrap_or_else(|| low_confidence_passthrough(name, unit)))
    }
}

/// Non-parseable or unreachable-provider inputs still pass through
/// downstream with originals preserved, flagged `low_confidence`.
fn low_confidence_passthrough(name: &str, unit: Option<&str>) -> ParsedFields {
    ParsedFields {
        color: None,
        parsed_unit: unit.map(str::to_string).or_else(|| guess_unit_from_name(name)),
        unit_coefficient: Some(1.0),
        confidence: 0.0,
        low_confidence: true,
    }
}

/// Cheap fallback keyword scan, reused by the ingestion front door (C10)
/// for rows missing `unit` entirely.
pub fn guess_unit_from_name(name: &str) -> Option<String> {
    let lower = name.to_lowercase();
    const KEYWORDS: &[(&str, &str)] = &[
        ("кг", "кг"),
        ("тонн", "т"),
        ("шт", "шт"),
        ("м2", "м2"),
        ("кв.м", "м2"),
        ("м3", "м3"),
        ("куб.м", "м3"),
        ("литр", "л"),
        ("упак", "упак"),
    ];
    KEYWORDS.iter().find(|(needle, _)| lower.contains(needle)).map(|(_, unit)| unit.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_unit_from_keyword() {
        assert_eq!(guess_unit_from_name("Цемент 50 кг мешок"), Some("кг".to_string()));
        assert_eq!(guess_unit_from_name("Кирпич поддон 1 шт"), Some("шт".to_string()));
        assert_eq!(guess_unit_from_name("Неизвестный товар"), None);
    }
}
