use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppState;
use super::error::{ApiError, json_error, parse_json};

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok", "service": "lead-proxy"}))
}

/// `POST /lead` - forward a lead to the CRM and mirror its answer.
pub async fn forward_lead(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let lead: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(lead) => lead,
        Err(e) => {
            tracing::warn!("Rejected lead with invalid JSON: {}", e);
            return json_error(StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    let payload = match serde_json::to_vec(&lead) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Could not re-serialize lead: {}", e);
            return json_error(StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    let upstream = state
        .http
        .post(&state.crm_endpoint)
        .header("X-API-Key", state.crm_api_key.as_str())
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(payload)
        .send()
        .await;

    let resp = match upstream {
        Ok(resp) => resp,
        Err(e) => {
            tracing::error!("Failed to forward lead to CRM: {}", e);
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to forward to CRM");
        }
    };

    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));

    match resp.bytes().await {
        Ok(body) => {
            tracing::info!("Lead forwarded, CRM answered {}", status);
            (status, [(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to read CRM response: {}", e);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to forward to CRM")
        }
    }
}

#[derive(Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatReply {
    pub reply: String,
}

/// `POST /api/chat` - answer one chat widget message.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let request = parse_json(payload)?;
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("Message is required"));
    }

    Ok(Json(ChatReply {
        reply: state.chat.respond(&request.message).to_string(),
    }))
}
