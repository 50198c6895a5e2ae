//! Dialogflow fulfillment payload types.
//!
//! Typed request/response bodies for the conversational entry point. The
//! platform sends every declared parameter on every turn, with `""` standing
//! in for an unfilled slot, so parameter fields are defaulted strings and the
//! accessors translate emptiness into `None`.

use serde::de::{Deserializer, Error as DeError};
use serde::{Deserialize, Serialize};

/// Inbound fulfillment request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    /// Session path, used to scope output contexts.
    #[serde(default)]
    pub session: String,
    pub query_result: QueryResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub intent: IntentRef,
    #[serde(default)]
    pub parameters: IntentParameters,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRef {
    #[serde(default)]
    pub display_name: String,
}

/// The enumerated parameter bag the dialog platform resolves for us.
#[derive(Debug, Default, Deserialize)]
pub struct IntentParameters {
    #[serde(default, rename = "EqptName")]
    pub eqpt_name: String,
    #[serde(default, rename = "EqptLocation")]
    pub eqpt_location: String,
    #[serde(default, rename = "EqptParam")]
    pub eqpt_param: String,
    #[serde(default, rename = "EqptCommand")]
    pub eqpt_command: String,
    #[serde(default, rename = "SchStartTime")]
    pub sch_start_time: String,
    #[serde(default, rename = "SchStopTime")]
    pub sch_stop_time: String,
    #[serde(default, rename = "SchFreq")]
    pub sch_freq: String,
    #[serde(default, rename = "SetTemp", deserialize_with = "object_or_none")]
    pub set_temp: Option<SetTemp>,
}

/// Temperature amount slot. The platform fills this as an object with a
/// numeric `amount`; an unfilled slot arrives as `""`.
#[derive(Debug, Deserialize)]
pub struct SetTemp {
    pub amount: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

fn object_or_none<'de, D>(deserializer: D) -> Result<Option<SetTemp>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Object(_) => SetTemp::deserialize(value)
            .map(Some)
            .map_err(DeError::custom),
        _ => Ok(None),
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

impl IntentParameters {
    /// Equipment name, uppercased; `None` when the slot is unfilled.
    pub fn name(&self) -> Option<String> {
        non_empty(&self.eqpt_name).map(|s| s.to_uppercase())
    }

    /// Equipment location, uppercased; `None` when the slot is unfilled.
    pub fn location(&self) -> Option<String> {
        non_empty(&self.eqpt_location).map(|s| s.to_uppercase())
    }

    pub fn command(&self) -> Option<&str> {
        non_empty(&self.eqpt_command)
    }

    pub fn param(&self) -> &str {
        self.eqpt_param.trim()
    }

    pub fn start_time(&self) -> Option<&str> {
        non_empty(&self.sch_start_time)
    }

    pub fn stop_time(&self) -> Option<&str> {
        non_empty(&self.sch_stop_time)
    }

    pub fn frequency(&self) -> Option<&str> {
        non_empty(&self.sch_freq)
    }

    pub fn set_temperature(&self) -> Option<f64> {
        self.set_temp.as_ref().map(|t| t.amount)
    }
}

/// Outbound fulfillment response.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub fulfillment_messages: Vec<FulfillmentMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub output_contexts: Vec<OutputContext>,
}

impl WebhookResponse {
    /// Response carrying no reply at all (unrecognized intent).
    pub fn empty() -> Self {
        Self::default()
    }
}

/// One fulfillment message, externally tagged the way the platform expects:
/// `{"text": {...}}`, `{"image": {...}}`, `{"card": {...}}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentMessage {
    Text(TextMessage),
    Image(ImageMessage),
    Card(CardMessage),
}

impl FulfillmentMessage {
    pub fn text(line: impl Into<String>) -> Self {
        Self::Text(TextMessage {
            text: vec![line.into()],
        })
    }

    pub fn image(uri: impl Into<String>) -> Self {
        Self::Image(ImageMessage {
            image_uri: uri.into(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct TextMessage {
    pub text: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMessage {
    pub image_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMessage {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub image_uri: String,
    pub buttons: Vec<CardButton>,
}

#[derive(Debug, Serialize)]
pub struct CardButton {
    pub text: String,
    pub postback: String,
}

/// Output context attached to a reply, scoped to the request session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputContext {
    pub name: String,
    pub lifespan_count: i32,
    pub parameters: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_REQUEST: &str = r#"{
        "responseId": "abc-123",
        "session": "projects/fms-agent/agent/sessions/s-1",
        "queryResult": {
            "queryText": "status of FCU_L1_01",
            "intent": {
                "name": "projects/fms-agent/agent/intents/i-1",
                "displayName": "EquipmentStatusCheck"
            },
            "parameters": {
                "EqptName": "fcu_l1_01",
                "EqptLocation": "",
                "EqptParam": "temperature",
                "EqptCommand": "",
                "SchStartTime": "",
                "SchStopTime": "",
                "SchFreq": "",
                "SetTemp": ""
            }
        }
    }"#;

    #[test]
    fn test_deserialize_request_with_empty_slots() {
        let request: WebhookRequest = serde_json::from_str(SAMPLE_REQUEST).unwrap();
        assert_eq!(request.query_result.intent.display_name, "EquipmentStatusCheck");

        let params = &request.query_result.parameters;
        assert_eq!(params.name().as_deref(), Some("FCU_L1_01"));
        assert_eq!(params.location(), None);
        assert_eq!(params.param(), "temperature");
        assert_eq!(params.command(), None);
        assert_eq!(params.set_temperature(), None);
    }

    #[test]
    fn test_deserialize_set_temp_object() {
        let json = r#"{"EqptLocation": "let's eat", "SetTemp": {"amount": 23, "unit": "C"}}"#;
        let params: IntentParameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.set_temperature(), Some(23.0));
        assert_eq!(params.location().as_deref(), Some("LET'S EAT"));
    }

    #[test]
    fn test_missing_parameters_default_to_unfilled() {
        let request: WebhookRequest = serde_json::from_str(
            r#"{"queryResult": {"intent": {"displayName": "Bogus"}}}"#,
        )
        .unwrap();
        let params = &request.query_result.parameters;
        assert_eq!(params.name(), None);
        assert_eq!(params.location(), None);
    }

    #[test]
    fn test_fulfillment_message_wire_shape() {
        let text = serde_json::to_value(FulfillmentMessage::text("hello")).unwrap();
        assert_eq!(text["text"]["text"][0], "hello");

        let image = serde_json::to_value(FulfillmentMessage::image("https://x/err.png")).unwrap();
        assert_eq!(image["image"]["imageUri"], "https://x/err.png");
    }

    #[test]
    fn test_empty_response_omits_contexts() {
        let json = serde_json::to_value(WebhookResponse::empty()).unwrap();
        assert!(json.get("outputContexts").is_none());
        assert_eq!(json["fulfillmentMessages"].as_array().unwrap().len(), 0);
    }
}
