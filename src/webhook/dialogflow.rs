// Dialogflow ES v2 webhook request/response shapes.
//
// Only the fields the bot reads or writes are modelled; everything else in
// the request is ignored. Dialogflow sends `null` for empty parameter maps
// every now and then, so those fields deserialize `null` as empty.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const UNKNOWN_INTENT: &str = "UnknownIntent";

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    #[serde(default)]
    pub response_id: Option<String>,
    /// `projects/<project>/agent/sessions/<id>`
    pub session: String,
    pub query_result: QueryResult,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub output_contexts: Vec<Context>,
    #[serde(default)]
    pub intent: Option<Intent>,
    #[serde(default)]
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    #[serde(default)]
    pub display_name: Option<String>,
}

impl WebhookRequest {
    /// The intent's display name, or `UnknownIntent` when Dialogflow sent none.
    pub fn intent_name(&self) -> &str {
        self.query_result
            .intent
            .as_ref()
            .and_then(|intent| intent.display_name.as_deref())
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_INTENT)
    }

    pub fn language_code(&self) -> &str {
        self.query_result.language_code.as_deref().unwrap_or("en")
    }
}

/// An input or output context. Output contexts with a lifespan of 0 close the
/// context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifespan_count: Option<u32>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Map::is_empty"
    )]
    pub parameters: Map<String, Value>,
}

impl Context {
    /// The last path segment of the context name, e.g. `booking_info`.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub fulfillment_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fulfillment_messages: Vec<FulfillmentMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_contexts: Vec<Context>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followup_event_input: Option<EventInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentMessage {
    pub text: TextMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMessage {
    pub text: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    pub name: String,
    pub language_code: String,
}

impl WebhookResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            fulfillment_text: text.into(),
            ..Self::default()
        }
    }

    /// One chat bubble per line. `fulfillmentText` carries all lines joined.
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        Self {
            fulfillment_text: lines.join("\n"),
            fulfillment_messages: lines
                .into_iter()
                .map(|line| FulfillmentMessage {
                    text: TextMessage { text: vec![line] },
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_contexts(mut self, contexts: Vec<Context>) -> Self {
        self.output_contexts = contexts;
        self
    }

    pub fn with_event(mut self, name: &str, language_code: &str) -> Self {
        self.followup_event_input = Some(EventInput {
            name: name.to_string(),
            language_code: language_code.to_string(),
        });
        self
    }
}
