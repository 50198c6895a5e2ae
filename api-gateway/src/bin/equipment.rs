//! Equipment API Lambda - Equipment CRUD and the conversational entry point.
//!
//! Endpoints:
//! - GET /equipment - List all equipment
//! - POST /equipment - Dialogflow fulfillment webhook (conversational entry)
//! - DELETE /equipment - Remove all equipment
//! - GET/PUT/DELETE /equipment/{id} - Fetch, merge fields into, or remove one unit
//! - GET/POST/DELETE /equipment/{id}/schedule - Fetch, append to, or clear the schedule
//! - GET/PUT/DELETE /equipment/{id}/schedule/{sid} - Fetch, patch, or remove one entry
//!
//! PUT on the collection and schedule list, and POST on a document or entry,
//! are intentionally disabled and answer 403 with a fixed plain-text body.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use shared::http::{
    cors_json_response, json_response, not_found_response, text_response, MessageBody,
};
use shared::models::{DeleteResult, EquipmentPatch, NewScheduleEntry, ScheduleEntryPatch};
use shared::parse_body;
use shared::store::ScheduleEntryResult;
use shared::webhook::{WebhookRequest, WebhookResponse};
use shared::{db, intents, reply, secrets, Config, EquipmentStore};

/// Application state
struct AppState {
    store: EquipmentStore,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env().map_err(|e| format!("Configuration error: {}", e))?;

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&aws_config);

        let credentials =
            secrets::get_database_credentials(&secrets_client, &config.db_secret_arn).await?;
        let pool = db::create_pool(&config, &credentials).await?;

        Ok(Self {
            store: EquipmentStore::new(pool),
        })
    }
}

/// The addressable resources under /equipment.
#[derive(Debug, PartialEq, Eq)]
enum Route {
    Collection,
    Document(Uuid),
    Schedule(Uuid),
    Entry(Uuid, Uuid),
}

#[derive(Debug, PartialEq, Eq)]
enum RouteError {
    Unknown,
    InvalidId(String),
}

/// Parse a request path (stage prefix already stripped) into a route.
fn parse_route(path: &str) -> Result<Route, RouteError> {
    let rest = path.strip_prefix("/equipment").ok_or(RouteError::Unknown)?;
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        [] => Ok(Route::Collection),
        [id] => Ok(Route::Document(parse_id(id)?)),
        [id, "schedule"] => Ok(Route::Schedule(parse_id(id)?)),
        [id, "schedule", entry_id] => Ok(Route::Entry(parse_id(id)?, parse_id(entry_id)?)),
        _ => Err(RouteError::Unknown),
    }
}

fn parse_id(segment: &str) -> Result<Uuid, RouteError> {
    Uuid::parse_str(segment).map_err(|_| RouteError::InvalidId(segment.to_string()))
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str().to_string();
    let raw_path = event.uri().path();
    // Strip /api stage prefix if present (API Gateway REST API includes stage in path)
    let path = raw_path.strip_prefix("/api").unwrap_or(raw_path);

    info!("Equipment request: {} {}", method, path);

    let route = match parse_route(path) {
        Ok(route) => route,
        Err(RouteError::InvalidId(segment)) => {
            return json_response(400, &MessageBody::new(format!("Invalid id {}", segment)));
        }
        Err(RouteError::Unknown) => {
            return json_response(404, &MessageBody::new("Not found"));
        }
    };

    match route {
        Route::Collection => collection(&state, &method, &event).await,
        Route::Document(id) => document(&state, &method, id, &event).await,
        Route::Schedule(id) => schedule(&state, &method, id, &event).await,
        Route::Entry(id, entry_id) => entry(&state, &method, id, entry_id, &event).await,
    }
}

async fn collection(
    state: &AppState,
    method: &str,
    event: &Request,
) -> Result<Response<Body>, Error> {
    match method {
        "GET" => {
            let equipment = state.store.list_all().await?;
            cors_json_response(200, &equipment)
        }

        // Conversational entry point: the dialog platform POSTs its
        // fulfillment request to the collection route.
        "POST" => {
            let request: WebhookRequest = parse_body!(event.body());
            let intent_name = &request.query_result.intent.display_name;

            let response = match intents::dispatch(
                &state.store,
                intent_name,
                &request.query_result.parameters,
            )
            .await?
            {
                Some(outcome) => reply::into_response(&outcome, &request.session),
                None => WebhookResponse::empty(),
            };

            json_response(200, &response)
        }

        "PUT" => text_response(403, "PUT operation not supported on /equipment"),

        "DELETE" => {
            let deleted = state.store.delete_all().await?;
            cors_json_response(200, &DeleteResult { deleted })
        }

        _ => json_response(405, &MessageBody::new("Method not allowed")),
    }
}

async fn document(
    state: &AppState,
    method: &str,
    id: Uuid,
    event: &Request,
) -> Result<Response<Body>, Error> {
    match method {
        "GET" => match state.store.fetch(id).await? {
            Some(equipment) => cors_json_response(200, &equipment),
            None => not_found_response(format!("Equipment {} not found", id)),
        },

        "POST" => text_response(
            403,
            &format!("POST operation not supported on /equipment/{}", id),
        ),

        "PUT" => {
            let patch: EquipmentPatch = parse_body!(event.body());
            match state.store.update_fields(id, &patch).await? {
                Some(equipment) => json_response(200, &equipment),
                None => not_found_response(format!("Equipment {} not found", id)),
            }
        }

        "DELETE" => {
            let deleted = state.store.delete(id).await?;
            if deleted > 0 {
                cors_json_response(200, &DeleteResult { deleted })
            } else {
                not_found_response(format!("Equipment {} not found", id))
            }
        }

        _ => json_response(405, &MessageBody::new("Method not allowed")),
    }
}

async fn schedule(
    state: &AppState,
    method: &str,
    id: Uuid,
    event: &Request,
) -> Result<Response<Body>, Error> {
    match method {
        "GET" => match state.store.fetch(id).await? {
            Some(equipment) => cors_json_response(200, &equipment.schedule),
            None => not_found_response(format!("Equipment {} not found", id)),
        },

        "POST" => {
            let entry: NewScheduleEntry = parse_body!(event.body());
            match state.store.append_schedule_entry(id, &entry).await? {
                Some(equipment) => json_response(200, &equipment),
                None => not_found_response(format!("Equipment {} not found", id)),
            }
        }

        "PUT" => text_response(
            403,
            &format!("PUT operation not supported on /equipment/{}/schedule", id),
        ),

        "DELETE" => match state.store.clear_schedule(id).await? {
            Some(equipment) => cors_json_response(200, &equipment),
            None => not_found_response(format!("Equipment {} not found", id)),
        },

        _ => json_response(405, &MessageBody::new("Method not allowed")),
    }
}

async fn entry(
    state: &AppState,
    method: &str,
    id: Uuid,
    entry_id: Uuid,
    event: &Request,
) -> Result<Response<Body>, Error> {
    match method {
        "GET" => match state.store.fetch_schedule_entry(id, entry_id).await? {
            ScheduleEntryResult::Found(entry) => cors_json_response(200, &entry),
            ScheduleEntryResult::EquipmentNotFound => {
                not_found_response(format!("Equipment {} not found", id))
            }
            ScheduleEntryResult::EntryNotFound => {
                not_found_response(format!("Schedule {} not found", entry_id))
            }
        },

        "POST" => text_response(
            403,
            &format!(
                "POST operation not supported on /equipment/{}/schedule/{}",
                id, entry_id
            ),
        ),

        "PUT" => {
            let patch: ScheduleEntryPatch = parse_body!(event.body());
            match state.store.patch_schedule_entry(id, entry_id, &patch).await? {
                ScheduleEntryResult::Found(equipment) => json_response(200, &equipment),
                ScheduleEntryResult::EquipmentNotFound => {
                    not_found_response(format!("Equipment {} not found", id))
                }
                ScheduleEntryResult::EntryNotFound => {
                    not_found_response(format!("Schedule {} not found", entry_id))
                }
            }
        }

        "DELETE" => match state.store.delete_schedule_entry(id, entry_id).await? {
            ScheduleEntryResult::Found(equipment) => cors_json_response(200, &equipment),
            ScheduleEntryResult::EquipmentNotFound => {
                not_found_response(format!("Equipment {} not found", id))
            }
            ScheduleEntryResult::EntryNotFound => {
                not_found_response(format!("Schedule {} not found", entry_id))
            }
        },

        _ => json_response(405, &MessageBody::new("Method not allowed")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "7b1c9a52-0000-4000-8000-000000000001";
    const SID: &str = "7b1c9a52-0000-4000-8000-000000000002";

    #[test]
    fn test_parse_route_collection() {
        assert_eq!(parse_route("/equipment"), Ok(Route::Collection));
        assert_eq!(parse_route("/equipment/"), Ok(Route::Collection));
    }

    #[test]
    fn test_parse_route_document_and_schedule() {
        let id = Uuid::parse_str(ID).unwrap();
        let sid = Uuid::parse_str(SID).unwrap();

        assert_eq!(
            parse_route(&format!("/equipment/{}", ID)),
            Ok(Route::Document(id))
        );
        assert_eq!(
            parse_route(&format!("/equipment/{}/schedule", ID)),
            Ok(Route::Schedule(id))
        );
        assert_eq!(
            parse_route(&format!("/equipment/{}/schedule/{}", ID, SID)),
            Ok(Route::Entry(id, sid))
        );
    }

    #[test]
    fn test_parse_route_rejects_bad_ids_and_paths() {
        assert_eq!(
            parse_route("/equipment/not-a-uuid"),
            Err(RouteError::InvalidId("not-a-uuid".to_string()))
        );
        assert_eq!(parse_route("/reminders"), Err(RouteError::Unknown));
        assert_eq!(
            parse_route(&format!("/equipment/{}/maintenance", ID)),
            Err(RouteError::Unknown)
        );
        assert_eq!(
            parse_route(&format!("/equipment/{}/schedule/{}/extra", ID, SID)),
            Err(RouteError::Unknown)
        );
    }
}
