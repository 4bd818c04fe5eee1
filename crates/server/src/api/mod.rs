//! # Ideaforge API
//!
//! HTTP surface over the [`Coordinator`]: submit an idea, inspect a
//! workflow, list agents and follow swarm events over SSE.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json,
    },
    routing::{get, post},
    Router,
};
use futures::stream::{Stream, StreamExt};
use ideaforge_core::swarm::{new_workflow_id, Coordinator, CoordinatorError, SwarmEvent};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, convert::Infallible, sync::Arc};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use utoipa::{OpenApi, ToSchema};

/// Application state
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub event_tx: broadcast::Sender<SwarmEvent>,
}

impl AppState {
    /// Wire `coordinator` to a fresh event channel
    pub fn new(coordinator: Coordinator) -> SharedState {
        let (event_tx, _) = broadcast::channel::<SwarmEvent>(256);
        let coordinator = coordinator.with_event_channel(event_tx.clone());
        Arc::new(Self {
            coordinator: Arc::new(coordinator),
            event_tx,
        })
    }
}

pub type SharedState = Arc<AppState>;

// === API Types ===

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessIdeaRequest {
    #[serde(default)]
    pub idea: String,
    /// Generated when absent
    #[serde(default)]
    pub workflow_id: Option<String>,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct ProcessIdeaResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Transcript lines in dispatch order
    pub workflow: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WorkflowSnapshot {
    pub workflow_id: String,
    pub stage: Option<String>,
    #[schema(value_type = Object)]
    pub context: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AgentsResponse {
    pub agents: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusMessage {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

// === OpenAPI Definition ===

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ideaforge API",
        version = "0.1.0",
        description = "Turns a product idea into design, marketing and sales material"
    ),
    paths(root, health, process_idea, get_workflow, list_agents),
    components(schemas(
        ProcessIdeaRequest,
        ProcessIdeaResponse,
        WorkflowSnapshot,
        AgentsResponse,
        StatusMessage,
        HealthResponse
    )),
    tags(
        (name = "workflows", description = "Idea pipeline runs"),
        (name = "swarm", description = "Agents and events"),
        (name = "meta", description = "Liveness")
    )
)]
pub struct ApiDoc;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api", get(root))
        .route("/health", get(health))
        .route("/api/process-idea", post(process_idea))
        .route("/api/v1/workflows/:id", get(get_workflow))
        .route("/api/v1/agents", get(list_agents))
        .route("/api/v1/events", get(events))
        .route("/api/v1/openapi.json", get(serve_openapi))
        .with_state(state)
}

// === API Handlers ===

#[utoipa::path(
    get,
    path = "/api",
    tag = "meta",
    responses((status = 200, description = "Backend is up", body = StatusMessage))
)]
async fn root() -> Json<StatusMessage> {
    Json(StatusMessage {
        message: "Ideaforge backend is running".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "meta",
    responses((status = 200, description = "Health check", body = HealthResponse))
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Run the full pipeline for one idea
#[utoipa::path(
    post,
    path = "/api/process-idea",
    tag = "workflows",
    request_body = ProcessIdeaRequest,
    responses(
        (status = 200, description = "Pipeline finished", body = ProcessIdeaResponse),
        (status = 400, description = "Empty idea", body = ProcessIdeaResponse),
        (status = 500, description = "Pipeline could not run", body = ProcessIdeaResponse)
    )
)]
async fn process_idea(
    State(state): State<SharedState>,
    Json(req): Json<ProcessIdeaRequest>,
) -> (StatusCode, Json<ProcessIdeaResponse>) {
    let workflow_id = req
        .workflow_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(new_workflow_id);

    match state.coordinator.run(&req.idea, &workflow_id).await {
        Ok(report) => (
            StatusCode::OK,
            Json(ProcessIdeaResponse {
                workflow_id: Some(report.workflow_id.clone()),
                stage: report.final_stage.map(|s| s.to_string()),
                workflow: report.transcript_lines(),
                error: None,
            }),
        ),
        Err(CoordinatorError::EmptyIdea) => (
            StatusCode::BAD_REQUEST,
            Json(ProcessIdeaResponse {
                error: Some(CoordinatorError::EmptyIdea.to_string()),
                ..Default::default()
            }),
        ),
        Err(e) => {
            tracing::error!(workflow_id = %workflow_id, "Failed to process idea: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ProcessIdeaResponse {
                    workflow_id: Some(workflow_id),
                    error: Some(e.to_string()),
                    ..Default::default()
                }),
            )
        }
    }
}

/// Context snapshot of one workflow
#[utoipa::path(
    get,
    path = "/api/v1/workflows/{id}",
    tag = "workflows",
    params(("id" = String, Path, description = "Workflow id")),
    responses(
        (status = 200, description = "Workflow context", body = WorkflowSnapshot),
        (status = 404, description = "Unknown workflow")
    )
)]
async fn get_workflow(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowSnapshot>, StatusCode> {
    let store = state.coordinator.context();
    if !store.contains(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(WorkflowSnapshot {
        stage: store.stage(&id).map(|s| s.to_string()),
        context: store.get_context(&id),
        workflow_id: id,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/agents",
    tag = "swarm",
    responses((status = 200, description = "Registered agents", body = AgentsResponse))
)]
async fn list_agents(State(state): State<SharedState>) -> Json<AgentsResponse> {
    Json(AgentsResponse {
        agents: state.coordinator.bus().agent_names(),
    })
}

/// SSE stream of swarm events
async fn events(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.event_tx.subscribe()).map(|item| {
        let event = match item {
            Ok(event) => {
                let json = serde_json::to_string(&event).unwrap_or_default();
                Event::default().event("swarm").data(json)
            }
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                Event::default().comment(format!("lagged {}", skipped))
            }
        };
        Ok(event)
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn serve_openapi() -> impl IntoResponse {
    let spec = ApiDoc::openapi().to_json().unwrap_or_default();
    ([(header::CONTENT_TYPE, "application/json")], spec)
}
