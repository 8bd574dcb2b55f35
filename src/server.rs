//! HTTP routes for the chat and guided flows

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info, warn};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::client::CompassClient;
use crate::error::Error;
use crate::providers::GenerationBackend;
use crate::request::{ChatRequestBody, ErrorPayload, GuidedRequestBody};
use crate::FailureKind;

/// Shared handler state
pub type AppState<B> = Arc<CompassClient<B>>;

/// Build the router around one client
pub fn router<B>(client: AppState<B>) -> Router
where
  B: GenerationBackend + 'static
{   Router::new()
      .route("/", get(root))
      .route("/health", get(health::<B>))
      .route("/api/chat", post(chat::<B>))
      .route("/api/guided", post(guided::<B>))
      .layer(TraceLayer::new_for_http())
      .with_state(client)
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: &crate::config::CompassConfig)
  -> Result<(), Error>
{   let client = Arc::new(CompassClient::from_config(config));
    let app = router(client);

    let addr = format!(
      "{}:{}",
      config.service.host, config.service.port
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Mission Compass running on http://{}", addr);

    axum::serve(listener, app)
      .with_graceful_shutdown(shutdown_signal())
      .await?;
    info!("Mission Compass stopped");
    Ok(())
}

async fn shutdown_signal()
{   if let Err(e) = tokio::signal::ctrl_c().await
    {   error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn root() -> impl IntoResponse
{   (
      StatusCode::METHOD_NOT_ALLOWED
    , "POST only. Use /api/chat or /api/guided"
    )
}

async fn health<B>(State(client): State<AppState<B>>)
  -> impl IntoResponse
where
  B: GenerationBackend + 'static
{   Json(json!({
      "status": "ok",
      "candidates": client.candidates(),
    }))
}

async fn chat<B>(
  State(client): State<AppState<B>>
, body: Result<Json<ChatRequestBody>, JsonRejection>
) -> Result<Response, Error>
where
  B: GenerationBackend + 'static
{   let Json(body) = body
      .map_err(|e| Error::InvalidRequest(e.body_text()))?;
    let reply = client.chat(&body.message).await?;
    Ok(Json(reply).into_response())
}

async fn guided<B>(
  State(client): State<AppState<B>>
, body: Result<Json<GuidedRequestBody>, JsonRejection>
) -> Result<Response, Error>
where
  B: GenerationBackend + 'static
{   let Json(body) = body
      .map_err(|e| Error::InvalidRequest(e.body_text()))?;
    let reply = client.guided(&body).await?;
    Ok(Json(reply).into_response())
}

/// Status code and user-facing message for a failed dispatch
pub fn failure_status(kind: FailureKind) -> (StatusCode, &'static str)
{   match kind
    {   FailureKind::Blocked => (
          StatusCode::UNPROCESSABLE_ENTITY
        , "The reply was filtered by the content policy. \
           Please rephrase your message and try again."
        )
      , FailureKind::AuthOrConfig | FailureKind::NoCandidates => (
          StatusCode::INTERNAL_SERVER_ERROR
        , "The generation service is not configured correctly. \
           Please contact the operator."
        )
      , FailureKind::Transient => (
          StatusCode::GATEWAY_TIMEOUT
        , "The generation service did not respond in time. \
           Please try again shortly."
        )
      , FailureKind::RetryableUnavailable | FailureKind::Unknown => (
          StatusCode::BAD_GATEWAY
        , "The generation service is temporarily unavailable. \
           Please try again shortly."
        )
    }
}

impl IntoResponse for Error
{   fn into_response(self) -> Response
    {   let (status, payload) = match self
        {   Error::InvalidRequest(msg) | Error::ParseError(msg) => {
              warn!("Rejected request: {}", msg);
              ( StatusCode::BAD_REQUEST
              , ErrorPayload
                {   error_message: msg
                  , kind: "invalid_request".to_string()
                  , tried_models: vec![]
                }
              )
            }
          , Error::Generation(failure) => {
              let (status, message) = failure_status(failure.kind);
              warn!(
                "Generation failed ({}): {} after {:?}",
                failure.kind, failure.message, failure.models_tried
              );
              ( status
              , ErrorPayload
                {   error_message: message.to_string()
                  , kind: failure.kind.to_string()
                  , tried_models: failure.models_tried
                }
              )
            }
          , other => {
              error!("Internal error: {}", other);
              ( StatusCode::INTERNAL_SERVER_ERROR
              , ErrorPayload
                {   error_message: "internal error".to_string()
                  , kind: "internal".to_string()
                  , tried_models: vec![]
                }
              )
            }
        };
        (status, Json(payload)).into_response()
    }
}
