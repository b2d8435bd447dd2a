//! HTTP adapter: a local URL API over the library service.
//!
//! Responses are JSON status envelopes; the requested content is also
//! copied to the system clipboard, best-effort, so shortcut automations
//! can paste it directly.

use crate::api::{Error, LibraryService};
use crate::cli::OutputFormat;
use crate::commands::{format_prompts, prompt_json};
use crate::core::boolean;
use crate::core::clipboard;
use crate::core::models::Template;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use clap::ValueEnum;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Run the server until ctrl-c.
pub async fn serve(svc: Arc<LibraryService>, port: u16) -> crate::api::Result<()> {
    let app = router(svc);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("URL server starting on http://{}", addr);
    info!("try: http://{}/pocket-prompt/search?q=ai", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", err);
    }
}

/// Build the application router.
pub fn router(svc: Arc<LibraryService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/pocket-prompt/list", get(list))
        .route("/pocket-prompt/search", get(search))
        .route("/pocket-prompt/boolean", get(boolean_search))
        .route("/pocket-prompt/saved-search/{name}", get(saved_search))
        .route("/pocket-prompt/saved-searches/list", get(saved_searches))
        .route("/pocket-prompt/get/{id}", get(get_prompt))
        .route("/pocket-prompt/render/{id}", get(render))
        .route("/pocket-prompt/tags", get(tags))
        .route("/pocket-prompt/tag/{name}", get(tag))
        .route("/pocket-prompt/templates", get(templates))
        .route("/pocket-prompt/template/{id}", get(template))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(svc)
}

/// Engine errors mapped onto HTTP statuses.
struct AppError(Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError(err)
    }
}

impl From<String> for AppError {
    fn from(message: String) -> Self {
        AppError(Error::Validation(message))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Parse(_) | Error::ExprParse { .. } | Error::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "success": false, "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

type HandlerResult = Result<Json<Value>, AppError>;

/// Copy the content to the clipboard and return the status envelope.
fn respond(content: String, message: String) -> Json<Value> {
    let clipboard_status = match clipboard::copy(&content) {
        Ok(()) => "Content copied to clipboard",
        Err(err) => {
            warn!("failed to copy to clipboard: {}", err);
            "Clipboard unavailable"
        }
    };
    Json(json!({
        "success": true,
        "message": message,
        "clipboard": clipboard_status,
        "length": content.len(),
    }))
}

fn parse_format(params: &HashMap<String, String>) -> OutputFormat {
    params
        .get("format")
        .and_then(|f| OutputFormat::from_str(f, true).ok())
        .unwrap_or_default()
}

fn apply_limit<T>(items: Vec<T>, params: &HashMap<String, String>) -> Vec<T> {
    match params.get("limit").and_then(|l| l.parse::<usize>().ok()) {
        Some(limit) if limit > 0 && limit < items.len() => items.into_iter().take(limit).collect(),
        _ => items,
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "pocket-prompt" }))
}

async fn list(
    State(svc): State<Arc<LibraryService>>,
    Query(params): Query<HashMap<String, String>>,
) -> HandlerResult {
    let prompts = match params.get("tag") {
        Some(tag) => svc.filter_by_tag(tag)?,
        None => svc.list_prompts()?,
    };
    let prompts = apply_limit(prompts, &params);
    let content = format_prompts(&prompts, parse_format(&params))?;
    Ok(respond(content, format!("Listed {} prompts", prompts.len())))
}

async fn search(
    State(svc): State<Arc<LibraryService>>,
    Query(params): Query<HashMap<String, String>>,
) -> HandlerResult {
    let query = params
        .get("q")
        .ok_or_else(|| Error::Validation("search requires a query parameter 'q'".to_string()))?;

    let mut prompts = svc.search_prompts(query)?;
    if let Some(tag) = params.get("tag") {
        prompts.retain(|p| p.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)));
    }
    let prompts = apply_limit(prompts, &params);
    let content = format_prompts(&prompts, parse_format(&params))?;
    Ok(respond(
        content,
        format!("Found {} prompts for '{}'", prompts.len(), query),
    ))
}

async fn boolean_search(
    State(svc): State<Arc<LibraryService>>,
    Query(params): Query<HashMap<String, String>>,
) -> HandlerResult {
    let raw = params
        .get("expr")
        .ok_or_else(|| Error::Validation("boolean search requires an 'expr' parameter".to_string()))?;
    let expr = boolean::parse(raw).map_err(Error::from)?;

    let prompts = svc.search_boolean(&expr)?;
    let content = format_prompts(&prompts, parse_format(&params))?;
    Ok(respond(
        content,
        format!("Boolean search found {} prompts", prompts.len()),
    ))
}

async fn saved_search(
    State(svc): State<Arc<LibraryService>>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> HandlerResult {
    let prompts = svc.execute_saved_search(&name)?;
    let content = format_prompts(&prompts, parse_format(&params))?;
    Ok(respond(
        content,
        format!("Saved search '{}' found {} prompts", name, prompts.len()),
    ))
}

async fn saved_searches(State(svc): State<Arc<LibraryService>>) -> HandlerResult {
    let searches = svc.list_saved_searches()?;
    let content = searches
        .iter()
        .map(|s| format!("{}: {}", s.name, s.expression))
        .collect::<Vec<_>>()
        .join("\n");
    Ok(respond(
        content,
        format!("Listed {} saved searches", searches.len()),
    ))
}

async fn get_prompt(
    State(svc): State<Arc<LibraryService>>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> HandlerResult {
    let prompt = svc.get_prompt(&id)?;
    let content = match params.get("format").map(String::as_str) {
        Some("json") => serde_json::to_string_pretty(&prompt_json(&prompt)).map_err(Error::from)?,
        _ => format!(
            "ID: {}\nTitle: {}\nVersion: {}\nDescription: {}\nTags: {}\n\nContent:\n{}",
            prompt.id,
            prompt.title,
            prompt.version,
            prompt.description,
            prompt.tags.join(", "),
            prompt.content
        ),
    };
    Ok(respond(content, format!("Retrieved prompt: {}", id)))
}

async fn render(
    State(svc): State<Arc<LibraryService>>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> HandlerResult {
    let bindings: HashMap<String, Value> = params
        .iter()
        .filter(|(key, _)| key.as_str() != "format")
        .map(|(key, value)| (key.clone(), coerce_query_value(value)))
        .collect();

    let content = match params.get("format").map(String::as_str) {
        Some("json") => svc.render_json(&id, &bindings)?,
        _ => svc.render_text(&id, &bindings)?,
    };
    Ok(respond(content, format!("Rendered prompt: {}", id)))
}

/// Query parameters arrive as strings; numbers and booleans are detected
/// eagerly so typed variables bind naturally.
fn coerce_query_value(value: &str) -> Value {
    if value == "true" || value == "false" {
        return Value::Bool(value == "true");
    }
    if let Ok(n) = value.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Some(n) = value.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(value.to_string())
}

async fn tags(State(svc): State<Arc<LibraryService>>) -> HandlerResult {
    let tags = svc.get_all_tags()?;
    let content = tags.join("\n");
    Ok(respond(content, format!("Listed {} tags", tags.len())))
}

async fn tag(
    State(svc): State<Arc<LibraryService>>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> HandlerResult {
    let prompts = svc.filter_by_tag(&name)?;
    let content = format_prompts(&prompts, parse_format(&params))?;
    Ok(respond(
        content,
        format!("Tag '{}' has {} prompts", name, prompts.len()),
    ))
}

async fn templates(
    State(svc): State<Arc<LibraryService>>,
    Query(params): Query<HashMap<String, String>>,
) -> HandlerResult {
    let templates = svc.list_templates()?;
    let content = match params.get("format").map(String::as_str) {
        Some("json") => {
            let values: Vec<Value> = templates.iter().map(template_json).collect();
            serde_json::to_string_pretty(&values).map_err(Error::from)?
        }
        Some("ids") => templates
            .iter()
            .map(|t| t.id.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => templates
            .iter()
            .map(|t| {
                if t.description.is_empty() {
                    format!("{} - {}", t.id, t.name)
                } else {
                    format!("{} - {}\n  {}", t.id, t.name, t.description)
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n"),
    };
    Ok(respond(
        content,
        format!("Listed {} templates", templates.len()),
    ))
}

async fn template(
    State(svc): State<Arc<LibraryService>>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> HandlerResult {
    let template = svc.get_template(&id)?;
    let content = match params.get("format").map(String::as_str) {
        Some("json") => serde_json::to_string_pretty(&template_json(&template)).map_err(Error::from)?,
        _ => {
            let mut text = format!(
                "ID: {}\nName: {}\nVersion: {}\nDescription: {}\n\nContent:\n{}",
                template.id, template.name, template.version, template.description, template.content
            );
            if !template.slots.is_empty() {
                text.push_str("\n\nSlots:\n");
                for slot in &template.slots {
                    text.push_str(&format!("  {}", slot.name));
                    if slot.required {
                        text.push_str(" [required]");
                    }
                    if let Some(default) = &slot.default {
                        text.push_str(&format!(" [default: {}]", default));
                    }
                    if !slot.description.is_empty() {
                        text.push_str(&format!(" - {}", slot.description));
                    }
                    text.push('\n');
                }
            }
            text
        }
    };
    Ok(respond(content, format!("Retrieved template: {}", id)))
}

fn template_json(template: &Template) -> Value {
    json!({
        "id": template.id,
        "version": template.version,
        "name": template.name,
        "description": template.description,
        "slots": template.slots,
        "created_at": template.created_at,
        "updated_at": template.updated_at,
        "content": template.content,
        "file_path": template.file_path,
    })
}
