//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for transcript chunking, snippet search,
//! narrative reordering, and highlight creation.

use crate::chunking::Chunk;
use crate::cli::Output;
use crate::config::Settings;
use crate::error::KlippError;
use crate::pipeline::HighlightPipeline;
use crate::splicing::Snippet;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::{Component, PathBuf};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
struct AppState {
    pipeline: HighlightPipeline,
    output_dir: PathBuf,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let output_dir = settings.output_dir();
    let pipeline = HighlightPipeline::new(settings)?;

    let state = Arc::new(AppState {
        pipeline,
        output_dir,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/transcript-chunks", post(transcript_chunks))
        .route("/api/search-snippets", post(search_snippets))
        .route("/api/refine-snippets", post(refine_snippets))
        .route("/api/create-video", post(create_video))
        .route("/api/download-video/{*file}", get(download_video))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Klipp API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Chunks", "POST /api/transcript-chunks");
    Output::kv("Search", "POST /api/search-snippets");
    Output::kv("Refine", "POST /api/refine-snippets");
    Output::kv("Create", "POST /api/create-video");
    Output::kv("Download", "GET  /api/download-video/:file");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptChunksRequest {
    /// YouTube URL or video ID
    youtube_url: String,
    /// Approximate word budget per chunk
    #[serde(default = "default_max_chunk_size")]
    max_chunk_size: usize,
}

fn default_max_chunk_size() -> usize {
    200
}

#[derive(Serialize)]
struct TranscriptChunksResponse {
    chunks: Vec<Chunk>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippetsRequest {
    chunks: Vec<Chunk>,
    query: String,
    #[serde(default = "default_top_k")]
    top_k: usize,
}

fn default_top_k() -> usize {
    5
}

#[derive(Serialize)]
struct SearchSnippetsResponse {
    results: Vec<crate::ranking::ScoredChunk>,
}

#[derive(Deserialize)]
struct RefineSnippetsRequest {
    snippets: Vec<Snippet>,
    query: String,
}

#[derive(Serialize)]
struct RefineSnippetsResponse {
    order: Vec<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateVideoRequest {
    youtube_url: String,
    snippets: Vec<Snippet>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateVideoResponse {
    video_path: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Map a pipeline error to an HTTP status and message.
fn error_response(e: &KlippError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match e {
        KlippError::InvalidInput(_) | KlippError::NoValidSubclips => StatusCode::BAD_REQUEST,
        KlippError::TranscriptsDisabled(_)
        | KlippError::TranscriptNotFound(_)
        | KlippError::VideoUnavailable(_) => StatusCode::NOT_FOUND,
        KlippError::OpenAI(_) | KlippError::Embedding(_) | KlippError::Http(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn transcript_chunks(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TranscriptChunksRequest>,
) -> impl IntoResponse {
    if req.youtube_url.trim().is_empty() {
        return error_response(&KlippError::InvalidInput(
            "No YouTube URL provided".to_string(),
        ))
        .into_response();
    }

    match state
        .pipeline
        .transcript_chunks(&req.youtube_url, req.max_chunk_size)
        .await
    {
        Ok(chunks) => Json(TranscriptChunksResponse { chunks }).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

async fn search_snippets(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchSnippetsRequest>,
) -> impl IntoResponse {
    match state
        .pipeline
        .search_snippets(&req.chunks, &req.query, req.top_k)
        .await
    {
        Ok(results) => Json(SearchSnippetsResponse { results }).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

async fn refine_snippets(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefineSnippetsRequest>,
) -> impl IntoResponse {
    let texts: Vec<String> = req.snippets.iter().map(|s| s.text.clone()).collect();

    // Reordering never fails; a misbehaving oracle degrades to input order.
    let order = state.pipeline.refine_order(&texts, &req.query).await;
    Json(RefineSnippetsResponse { order }).into_response()
}

async fn create_video(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateVideoRequest>,
) -> impl IntoResponse {
    if req.youtube_url.trim().is_empty() {
        return error_response(&KlippError::InvalidInput(
            "No YouTube URL provided".to_string(),
        ))
        .into_response();
    }

    match state
        .pipeline
        .create_video(&req.youtube_url, &req.snippets)
        .await
    {
        Ok(path) => Json(CreateVideoResponse {
            video_path: path.display().to_string(),
        })
        .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

async fn download_video(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(file): axum::extract::Path<String>,
) -> impl IntoResponse {
    let full_path = match resolve_artifact_path(&state.output_dir, &file) {
        Some(path) => path,
        None => {
            return error_response(&KlippError::InvalidInput(
                "Path outside output directory".to_string(),
            ))
            .into_response();
        }
    };

    match tokio::fs::read(&full_path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "video/mp4".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(_) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "File not found".to_string(),
            }),
        )
            .into_response(),
    }
}

/// Resolve a requested artifact path, rejecting anything that would escape
/// the output root.
fn resolve_artifact_path(output_dir: &std::path::Path, file: &str) -> Option<PathBuf> {
    let requested = PathBuf::from(file);

    if requested.is_absolute() {
        return None;
    }
    if requested
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return None;
    }

    Some(output_dir.join(requested))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_resolve_artifact_path_plain_file() {
        let root = Path::new("/videos");
        assert_eq!(
            resolve_artifact_path(root, "highlight_abc.mp4"),
            Some(PathBuf::from("/videos/highlight_abc.mp4"))
        );
    }

    #[test]
    fn test_resolve_artifact_path_rejects_escape() {
        let root = Path::new("/videos");
        assert_eq!(resolve_artifact_path(root, "../etc/passwd"), None);
        assert_eq!(resolve_artifact_path(root, "a/../../etc/passwd"), None);
        assert_eq!(resolve_artifact_path(root, "/etc/passwd"), None);
    }

    #[test]
    fn test_error_response_status_mapping() {
        let (status, _) = error_response(&KlippError::InvalidInput("x".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_response(&KlippError::NoValidSubclips);
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_response(&KlippError::TranscriptNotFound("x".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = error_response(&KlippError::OpenAI("x".into()));
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, _) = error_response(&KlippError::ToolFailed("x".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
