//! Web interface and JSON API.
//!
//! Every request gets its own driver and its own chart directory, so
//! concurrent users never share conversation state. Only the newest
//! `server.chart_history` request directories are kept.

use crate::agent::{Driver, Message, ToolDescriptor};
use crate::assistant::{build_driver, tool_descriptors};
use crate::charts::ChartStore;
use crate::cli::{preflight, Output};
use crate::config::Settings;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

/// Shared application state.
struct AppState {
    settings: Settings,
    tools: Vec<ToolDescriptor>,
    charts: ChartStore,
}

/// Run the web server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    if let Err(e) = preflight::check_api_key() {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let charts_dir = settings.web_charts_dir();
    std::fs::create_dir_all(&charts_dir)?;

    let state = Arc::new(AppState {
        tools: tool_descriptors(&settings)?,
        charts: ChartStore::new(&charts_dir),
        settings,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(index).post(ask_form))
        .route("/health", get(health))
        .route("/tools", get(tools))
        .route("/ask", post(ask))
        .nest_service("/charts", ServeDir::new(&charts_dir))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("f1ai Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Web form", "GET  /");
    Output::kv("Ask", "POST /ask");
    Output::kv("Tools", "GET  /tools");
    Output::kv("Health", "GET  /health");
    Output::kv("Charts", "GET  /charts/...");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    include_messages: bool,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
    charts: Vec<String>,
    tool_calls: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    messages: Option<Vec<Message>>,
}

#[derive(Deserialize)]
struct AskForm {
    question: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Outcome of one question, whatever the surface.
struct Answered {
    answer: Result<String, String>,
    charts: Vec<String>,
    tool_calls: usize,
    messages: Vec<Message>,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn tools(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tools: Vec<serde_json::Value> = state.tools.iter().map(|t| t.to_json()).collect();
    Json(tools)
}

async fn index() -> impl IntoResponse {
    Html(render_page(None, None))
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> impl IntoResponse {
    let answered = answer(&state, &req.question, req.model.as_deref()).await;

    match answered.answer {
        Ok(answer) => Json(AskResponse {
            answer,
            charts: answered.charts,
            tool_calls: answered.tool_calls,
            messages: req.include_messages.then_some(answered.messages),
        })
        .into_response(),
        Err(e) => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: e })).into_response()
        }
    }
}

async fn ask_form(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AskForm>,
) -> impl IntoResponse {
    let answered = answer(&state, &form.question, None).await;
    let status = if answered.answer.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Html(render_page(Some(&form.question), Some(&answered))))
}

async fn answer(state: &AppState, question: &str, model: Option<&str>) -> Answered {
    let chart_root = start_request(&state.charts, state.settings.server.chart_history);
    info!(chart_root = %chart_root.display(), "Question received");

    let mut driver = match build_driver(&state.settings, model, &chart_root) {
        Ok(driver) => driver,
        Err(e) => {
            error!("Failed to build driver: {}", e);
            return Answered {
                answer: Err(e.to_string()),
                charts: Vec::new(),
                tool_calls: 0,
                messages: Vec::new(),
            };
        }
    };

    let answer = driver.ask(question).await.map_err(|e| {
        error!("Failed to answer: {}", e);
        e.to_string()
    });

    Answered {
        answer,
        charts: chart_urls(&driver, state.charts.root()),
        tool_calls: driver.tool_calls(),
        messages: driver.messages().to_vec(),
    }
}

/// Prune old request directories, leaving room for one more, and name the
/// new request's chart root.
fn start_request(charts: &ChartStore, history: usize) -> PathBuf {
    match charts.prune(history.saturating_sub(1)) {
        Ok(0) => {}
        Ok(removed) => info!(removed, "Pruned old chart directories"),
        Err(e) => warn!("Failed to prune chart directories: {}", e),
    }
    charts.session_dir()
}

fn chart_urls(driver: &Driver, charts_dir: &Path) -> Vec<String> {
    driver
        .charts()
        .unwrap_or_default()
        .iter()
        .filter_map(|path| chart_url(path, charts_dir))
        .collect()
}

/// URL under `/charts` for a chart file below the charts directory.
fn chart_url(path: &Path, charts_dir: &Path) -> Option<String> {
    let relative = path.strip_prefix(charts_dir).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    Some(format!("/charts/{}", parts.join("/")))
}

// === Page ===

fn render_page(question: Option<&str>, answered: Option<&Answered>) -> String {
    let mut body = String::new();

    if let Some(answered) = answered {
        match &answered.answer {
            Ok(answer) => body.push_str(&format!(
                "<section class=\"answer\"><p>{}</p></section>\n",
                escape_html(answer)
            )),
            Err(e) => body.push_str(&format!(
                "<section class=\"error\"><p>{}</p></section>\n",
                escape_html(e)
            )),
        }

        for url in &answered.charts {
            body.push_str(&format!("<img src=\"{}\" alt=\"chart\">\n", escape_html(url)));
        }

        if !answered.messages.is_empty() {
            body.push_str("<details><summary>Message history</summary>\n");
            for message in &answered.messages {
                let mut head = message.role.to_string();
                if let Some(name) = &message.tool_name {
                    head.push_str(&format!(" ({})", name));
                }
                body.push_str(&format!("<h4>{}</h4>\n", escape_html(&head)));
                if !message.content.is_empty() {
                    body.push_str(&format!("<pre>{}</pre>\n", escape_html(&message.content)));
                }
                if let Some(call) = &message.tool_call {
                    let call = escape_html(&call.to_string());
                    body.push_str(&format!("<pre>calls {}</pre>\n", call));
                }
            }
            body.push_str("</details>\n");
        }
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>f1ai</title>
<style>
body {{ font-family: sans-serif; max-width: 820px; margin: 2rem auto; padding: 0 1rem; }}
input[type=text] {{ width: 75%; padding: .4rem; }}
.error {{ color: #b00020; }}
pre {{ background: #f4f4f4; padding: .5rem; white-space: pre-wrap; }}
img {{ max-width: 100%; margin: 1rem 0; }}
</style>
</head>
<body>
<h1>Formula 1 statistics</h1>
<form method="post" action="/">
<input type="text" name="question" value="{}" placeholder="Who won the 2021 Abu Dhabi Grand Prix?" required>
<button type="submit">Ask</button>
</form>
{}</body>
</html>
"#,
        escape_html(question.unwrap_or("")),
        body
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>\"Checo\" & 'Max'</b>"),
            "&lt;b&gt;&quot;Checo&quot; &amp; &#39;Max&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_chart_url() {
        let root = Path::new("/data/charts");
        let path = root.join("req-1").join("inv-2").join("chart-1.svg");
        assert_eq!(
            chart_url(&path, root).as_deref(),
            Some("/charts/req-1/inv-2/chart-1.svg")
        );
        assert_eq!(chart_url(Path::new("/elsewhere/chart-1.svg"), root), None);
    }

    #[test]
    fn test_requests_keep_bounded_chart_history() {
        let tmp = tempfile::tempdir().unwrap();
        let charts = ChartStore::new(tmp.path());

        let mut roots = Vec::new();
        for _ in 0..6 {
            let root = start_request(&charts, 3);
            std::fs::create_dir_all(root.join("inv")).unwrap();
            roots.push(root);
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let kept: Vec<_> = roots.iter().filter(|root| root.exists()).collect();
        assert_eq!(kept.len(), 3);
        assert!(roots[3..].iter().all(|root| root.exists()));
    }

    #[test]
    fn test_render_page() {
        let answered = Answered {
            answer: Ok("Pérez finished <second>.".to_string()),
            charts: vec!["/charts/a/b/chart-1.svg".to_string()],
            tool_calls: 1,
            messages: vec![Message::user("Who finished second?")],
        };
        let page = render_page(Some("Who finished second?"), Some(&answered));
        assert!(page.contains("Pérez finished &lt;second&gt;."));
        assert!(page.contains("<img src=\"/charts/a/b/chart-1.svg\""));
        assert!(page.contains("Message history"));
        assert!(page.contains("value=\"Who finished second?\""));

        let empty = render_page(None, None);
        assert!(!empty.contains("<section"));
    }
}
