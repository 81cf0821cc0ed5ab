//! Caption generation: prompt building, the model call, and response repair.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::catalog::{Catalog, Template};
use crate::constants::{MAX_TOPIC_CHARS, MAX_WORDS_PER_SLOT, SLOT_COUNT};
use crate::error::MemeError;
use crate::gemini::TextModel;

#[allow(clippy::unwrap_used)] // literal pattern
static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^```(?:json)?\s*").unwrap());

#[allow(clippy::unwrap_used)] // literal pattern
static TRAILING_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```\s*$").unwrap());

/// The generator's answer: which template to use and what goes in each slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationResult {
    /// The chosen template.
    pub template: Template,
    /// Slot texts; slots the template doesn't have are empty and ignored.
    pub texts: [String; SLOT_COUNT],
    /// One sentence on why the joke works, may be empty.
    pub explanation: String,
}

/// Trims a topic and checks it is one we can send.
pub fn validate_topic(topic: &str) -> Result<&str, MemeError> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(MemeError::EmptyTopic);
    }
    let actual = topic.chars().count();
    if actual > MAX_TOPIC_CHARS {
        return Err(MemeError::TopicTooLong {
            max: MAX_TOPIC_CHARS,
            actual,
        });
    }
    Ok(topic)
}

/// Builds the prompt listing every template by index.
pub fn build_prompt(topic: &str, catalog: &Catalog) -> String {
    let template_list = catalog
        .list_templates()
        .iter()
        .enumerate()
        .map(|(index, template)| {
            let plural = if template.slot_count > 1 { "es" } else { "" };
            format!(
                "{index}: \"{}\" ({} text box{plural})",
                template.name, template.slot_count
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let last_index = catalog.len().saturating_sub(1);

    format!(
        r#"You are a meme expert. Generate a hilarious, clever meme about: "{topic}"

Available meme templates (pick the BEST one for this topic):
{template_list}

Rules:
- Pick the template that fits the topic most naturally and funnily
- Write genuinely funny, witty text - not generic
- Keep each text box SHORT (max {MAX_WORDS_PER_SLOT} words per box)
- text0 = top text, text1 = bottom text, text2/text3 = additional boxes if template has them
- Only include text boxes the template actually has, leave the rest as empty strings
- Make it relatable and shareable

Respond ONLY with valid JSON, no markdown, no explanation:
{{
  "templateIndex": <number 0-{last_index}>,
  "text0": "<top text or first box>",
  "text1": "<bottom text or second box>",
  "text2": "<third box if needed, else empty string>",
  "text3": "<fourth box if needed, else empty string>",
  "explanation": "<one sentence: why this template + text combo is funny>"
}}"#
    )
}

/// Removes code fences models like to wrap JSON in.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let start = LEADING_FENCE
        .find(trimmed)
        .map(|found| found.end())
        .unwrap_or(0);
    let rest = &trimmed[start..];
    let end = TRAILING_FENCE
        .find(rest)
        .map(|found| found.start())
        .unwrap_or(rest.len());
    rest[..end].trim()
}

/// Repairs and parses a raw model reply into a [`GenerationResult`].
///
/// Only fences are repaired. Anything that isn't a JSON object after that is
/// a [`MemeError::MalformedResponse`]; bad field values get safe defaults.
pub fn parse_response(raw: &str, catalog: &Catalog) -> Result<GenerationResult, MemeError> {
    let cleaned = strip_code_fences(raw);
    let value: Value = serde_json::from_str(cleaned)
        .map_err(|err| MemeError::MalformedResponse(format!("{err}: {cleaned}")))?;
    let Value::Object(fields) = value else {
        return Err(MemeError::MalformedResponse(format!(
            "expected a JSON object, got: {cleaned}"
        )));
    };

    let index = fields.get("templateIndex").and_then(template_index);
    let template = catalog.resolve_or_first(index);
    let in_range = index
        .and_then(|index| usize::try_from(index).ok())
        .is_some_and(|index| index < catalog.len());
    if !in_range {
        debug!(
            "Model picked template index {:?}, falling back to {}",
            fields.get("templateIndex"),
            template.name
        );
    }

    let texts = std::array::from_fn(|slot| string_field(&fields, &format!("text{slot}")));

    Ok(GenerationResult {
        template: template.clone(),
        texts,
        explanation: string_field(&fields, "explanation"),
    })
}

/// Reads an index the model may have written as `3`, `3.0` or `"3"`.
fn template_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|index| index.is_finite() && index.fract() == 0.0)
                .map(|index| index as i64)
        }),
        Value::String(text) => text.parse::<i64>().ok(),
        _ => None,
    }
}

fn string_field(fields: &Map<String, Value>, name: &str) -> String {
    fields
        .get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Picks a template and writes its captions through a [`TextModel`].
#[derive(Debug)]
pub struct CaptionGenerator<M> {
    model: M,
    catalog: Catalog,
}

impl<M: TextModel> CaptionGenerator<M> {
    /// New generator over `catalog`.
    pub fn new(model: M, catalog: Catalog) -> Self {
        Self { model, catalog }
    }

    /// The catalog templates are chosen from.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Generate a template choice and captions for `topic`. The model is
    /// called exactly once, and not at all if the topic is invalid.
    pub async fn generate(&self, topic: &str) -> Result<GenerationResult, MemeError> {
        let topic = validate_topic(topic)?;
        let prompt = build_prompt(topic, &self.catalog);
        debug!("Caption prompt:\n{}", prompt);

        let raw = self.model.generate_text(&prompt).await?;
        debug!("Raw model reply: {}", raw);

        let result = parse_response(&raw, &self.catalog)?;
        info!(
            "Picked template \"{}\" for topic \"{}\"",
            result.template.name, topic
        );
        Ok(result)
    }
}
