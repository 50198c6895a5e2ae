//! Fulfillment reply formatting.
//!
//! Pure translation of an [`IntentOutcome`] into the ordered reply fragments
//! handed back to the dialog platform. No I/O happens here; the webhook
//! handler serializes the result into the HTTP response.

use serde_json::json;

use crate::intents::{IntentOutcome, Reading};
use crate::webhook::{
    CardButton, CardMessage, FulfillmentMessage, OutputContext, WebhookResponse,
};

const FM_IMAGE_URL: &str =
    "https://marshallpropertyconstruction.co.uk/wp-content/uploads/2017/01/35048060-d9b5f732-fb93-11e7-81bd-5a50890b3112.jpg";
const FM_PAGE_URL: &str = "https://fms-ws.herokuapp.com/";
const ERROR_IMAGE_URL: &str = "https://braziliex.com/img/erro1.png";

/// One ordered piece of a conversational reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyFragment {
    Text(String),
    Image(String),
    Card {
        title: String,
        text: String,
        image_uri: String,
        button_text: String,
        button_url: String,
    },
}

/// Build the ordered reply fragments for an outcome. Negative outcomes lead
/// with the error illustration; the welcome outcome carries the menu card.
pub fn fragments(outcome: &IntentOutcome) -> Vec<ReplyFragment> {
    match outcome {
        IntentOutcome::Welcome => welcome_fragments(),
        IntentOutcome::Report { line, .. } => vec![ReplyFragment::Text(line.clone())],
        IntentOutcome::Reply(lines) => lines
            .iter()
            .map(|line| ReplyFragment::Text(line.clone()))
            .collect(),
        IntentOutcome::NotFound(message) | IntentOutcome::Invalid(message) => vec![
            ReplyFragment::Image(ERROR_IMAGE_URL.to_string()),
            ReplyFragment::Text(message.clone()),
        ],
    }
}

fn welcome_fragments() -> Vec<ReplyFragment> {
    vec![
        ReplyFragment::Text("Welcome to the Facility Management System!".to_string()),
        ReplyFragment::Card {
            title: "Facility Management Chat".to_string(),
            text: "Your wish is my command!".to_string(),
            image_uri: FM_IMAGE_URL.to_string(),
            button_text: "Facility Management Page".to_string(),
            button_url: FM_PAGE_URL.to_string(),
        },
        ReplyFragment::Text(
            "I have all information regarding the equipment in this building! \
             What would you like to know?"
                .to_string(),
        ),
        ReplyFragment::Text("1. Equipment Status e.g. status of FCUs at La Cala?".to_string()),
        ReplyFragment::Text("2. Command Equipment e.g. Start FCU_L1_01".to_string()),
        ReplyFragment::Text(
            "3. Schedule Equipment e.g. Set FCUs at Let's Eat to start from 8:30a.m. to 10p.m. daily"
                .to_string(),
        ),
        ReplyFragment::Text("4. System Health Check e.g. Any alarms at Let's Eat?".to_string()),
        ReplyFragment::Text(
            "5. Adjust Temperature e.g. Adjust the thermostat at Let's Eat to 23C".to_string(),
        ),
    ]
}

/// Serialize an outcome into the platform response, attaching the follow-up
/// reading context for by-name status reports.
pub fn into_response(outcome: &IntentOutcome, session: &str) -> WebhookResponse {
    let fulfillment_messages = fragments(outcome)
        .into_iter()
        .map(to_message)
        .collect();

    let output_contexts = match outcome {
        IntentOutcome::Report { reading, .. } if !reading.kind.is_empty() => {
            vec![reading_context(session, reading)]
        }
        _ => Vec::new(),
    };

    WebhookResponse {
        fulfillment_messages,
        output_contexts,
    }
}

fn to_message(fragment: ReplyFragment) -> FulfillmentMessage {
    match fragment {
        ReplyFragment::Text(line) => FulfillmentMessage::text(line),
        ReplyFragment::Image(uri) => FulfillmentMessage::image(uri),
        ReplyFragment::Card {
            title,
            text,
            image_uri,
            button_text,
            button_url,
        } => FulfillmentMessage::Card(CardMessage {
            title,
            subtitle: Some(text),
            image_uri,
            buttons: vec![CardButton {
                text: button_text,
                postback: button_url,
            }],
        }),
    }
}

fn reading_context(session: &str, reading: &Reading) -> OutputContext {
    OutputContext {
        name: format!("{}/contexts/{}", session, reading.kind),
        lifespan_count: 1,
        parameters: json!({
            "Value": reading.value,
            "Unit": reading.unit,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_leads_with_error_image() {
        let outcome = IntentOutcome::NotFound("Equipment FCU_X not found".to_string());
        let fragments = fragments(&outcome);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0], ReplyFragment::Image(ERROR_IMAGE_URL.to_string()));
        assert_eq!(
            fragments[1],
            ReplyFragment::Text("Equipment FCU_X not found".to_string())
        );
    }

    #[test]
    fn test_reply_lines_become_text_fragments_in_order() {
        let outcome = IntentOutcome::Reply(vec![
            "FCU_L1_01's status is Running".to_string(),
            "FCU_L1_02's status is Stopped".to_string(),
        ]);
        let fragments = fragments(&outcome);
        assert_eq!(
            fragments,
            vec![
                ReplyFragment::Text("FCU_L1_01's status is Running".to_string()),
                ReplyFragment::Text("FCU_L1_02's status is Stopped".to_string()),
            ]
        );
    }

    #[test]
    fn test_welcome_includes_menu_and_card() {
        let fragments = fragments(&IntentOutcome::Welcome);
        assert_eq!(fragments.len(), 8);
        assert!(matches!(fragments[1], ReplyFragment::Card { .. }));
        assert!(matches!(
            &fragments[0],
            ReplyFragment::Text(line) if line.starts_with("Welcome")
        ));
    }

    #[test]
    fn test_report_attaches_reading_context() {
        let outcome = IntentOutcome::Report {
            line: "FCU_L1_01's temperature is 22°C".to_string(),
            reading: Reading {
                kind: "temperature".to_string(),
                value: "22".to_string(),
                unit: "°C",
            },
        };

        let response = into_response(&outcome, "projects/p/agent/sessions/s-1");
        assert_eq!(response.fulfillment_messages.len(), 1);
        assert_eq!(response.output_contexts.len(), 1);

        let context = &response.output_contexts[0];
        assert_eq!(
            context.name,
            "projects/p/agent/sessions/s-1/contexts/temperature"
        );
        assert_eq!(context.lifespan_count, 1);
        assert_eq!(context.parameters["Value"], "22");
        assert_eq!(context.parameters["Unit"], "°C");
    }

    #[test]
    fn test_invalid_outcome_has_no_context() {
        let outcome = IntentOutcome::Invalid("Please specify an equipment name or location".into());
        let response = into_response(&outcome, "projects/p/agent/sessions/s-1");
        assert!(response.output_contexts.is_empty());
        assert_eq!(response.fulfillment_messages.len(), 2);
    }
}
