// SPDX-License-Identifier: MIT

//! HTTP surface for the graph editor

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::codegen;
use crate::config::Settings;
use crate::error::{ProjectError, SigcodeError};
use crate::project::{Format, Project, ProjectLoader, Template, TemplateSet};

static EMPTY_TEMPLATES: Lazy<Value> = Lazy::new(|| json!({ "templates": [] }));

/// Shared, read-only server state
pub struct AppState {
    pub settings: Settings,
    pub templates: TemplateSet,
    /// Template file as loaded, served back to the editor unchanged
    pub templates_document: Value,
}

impl AppState {
    pub fn new(settings: Settings, templates: TemplateSet, templates_document: Value) -> Self {
        Self {
            settings,
            templates,
            templates_document,
        }
    }

    /// Load the template file named in `settings`; a missing file means no templates
    pub fn load(settings: Settings) -> Result<Self, SigcodeError> {
        let document = match &settings.templates_path {
            Some(path) if path.exists() => ProjectLoader::new().load_value(path)?,
            Some(path) => {
                log::warn!("Templates not found: {}", path.display());
                EMPTY_TEMPLATES.clone()
            }
            None => EMPTY_TEMPLATES.clone(),
        };
        let templates: TemplateSet = serde_json::from_value(document.clone())?;
        log::info!("Loaded {} formula templates", templates.len());
        Ok(Self::new(settings, templates, document))
    }
}

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn api_error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message.into() })))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/formula-templates", get(formula_templates))
        .route("/api/generate", post(generate_code))
        .route("/api/project/{filename}/code", get(project_code))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(state: AppState) -> Result<(), SigcodeError> {
    let addr = SocketAddr::from(([127, 0, 0, 1], state.settings.port));
    let app = router(Arc::new(state));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn formula_templates(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.templates_document.clone())
}

#[derive(Deserialize)]
struct GenerateRequest {
    #[serde(flatten)]
    project: Project,
    /// Overrides the server's templates for this request
    #[serde(default)]
    templates: Option<Vec<Template>>,
}

async fn generate_code(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> Json<Value> {
    let custom = request.templates.map(TemplateSet::new);
    let templates = custom.as_ref().unwrap_or(&state.templates);
    let code =
        codegen::generate_with_options(&request.project, templates, &state.settings.compiler);
    Json(json!({ "code": code }))
}

/// Path of a stored project; anything that could leave the project folder is refused
fn project_path(state: &AppState, filename: &str) -> Result<PathBuf, SigcodeError> {
    let dir = state
        .settings
        .project_dir
        .as_ref()
        .ok_or_else(|| SigcodeError::config("Project folder not configured"))?;
    let plain = !filename.is_empty()
        && !filename.contains(&['/', '\\'][..])
        && !filename.contains("..");
    if !plain {
        return Err(ProjectError::InvalidFilename(filename.to_string()).into());
    }
    Ok(dir.join(filename))
}

async fn project_code(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> ApiResult {
    let path = match project_path(&state, &filename) {
        Ok(path) => path,
        Err(SigcodeError::Config(message)) => {
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, message))
        }
        Err(e) => return Err(api_error(StatusCode::BAD_REQUEST, e.to_string())),
    };
    let format =
        Format::from_path(&path).map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let content = fs::read_to_string(&path)
        .await
        .map_err(|_| api_error(StatusCode::NOT_FOUND, format!("Project not found: {}", filename)))?;

    let parsed = match format {
        Format::Json => ProjectLoader::parse_json(&content),
        Format::Yaml => ProjectLoader::parse_yaml(&content),
    };
    let project = parsed.map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    log::info!("Generating code for {}", filename);
    let code = codegen::generate_with_options(&project, &state.templates, &state.settings.compiler);
    Ok(Json(json!({ "filename": filename, "code": code })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(project_dir: Option<PathBuf>, templates: Value) -> Arc<AppState> {
        let settings = Settings {
            project_dir,
            ..Settings::default()
        };
        let set: TemplateSet = serde_json::from_value(templates.clone()).unwrap();
        Arc::new(AppState::new(settings, set, templates))
    }

    fn h_templates() -> Value {
        json!({"templates": [
            {"name": "h", "args": {"p": {"min": 0, "max": 20}}, "body": "p*2"}
        ]})
    }

    fn formula_project(expression: &str) -> Value {
        json!({
            "elements": {
                "formula-1": {"type": "formula", "props": {"expression": expression}},
                "output-1": {"type": "output", "props": {}}
            },
            "connections": [
                {"fromElement": "formula-1", "fromPort": "out-0",
                 "toElement": "output-1", "toPort": "in-0"}
            ]
        })
    }

    #[tokio::test]
    async fn test_health_check() {
        let Json(body) = health_check().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_formula_templates_served_verbatim() {
        let state = state_with(None, h_templates());
        let Json(body) = formula_templates(State(state)).await;
        assert_eq!(body, h_templates());
    }

    #[tokio::test]
    async fn test_generate_uses_server_templates() {
        let state = state_with(None, h_templates());
        let request: GenerateRequest = serde_json::from_value(formula_project("h(10)")).unwrap();
        let Json(body) = generate_code(State(state), Json(request)).await;
        assert_eq!(body["code"], "WHEN((10 >= 0) AND (10 <= 20), 10*2, 0)");
    }

    #[tokio::test]
    async fn test_generate_with_request_templates() {
        let state = state_with(None, h_templates());
        let mut payload = formula_project("h(10)");
        payload["templates"] = json!([{"name": "h", "args": ["p"], "body": "p+1"}]);
        let request: GenerateRequest = serde_json::from_value(payload).unwrap();
        let Json(body) = generate_code(State(state), Json(request)).await;
        assert_eq!(body["code"], "10+1");
    }

    #[tokio::test]
    async fn test_project_code_rejects_traversal() {
        let state = state_with(Some(std::env::temp_dir()), h_templates());
        for name in ["", "../secret.json", "a/b.json", "..", "x\\y.json"] {
            let result = project_code(State(state.clone()), Path(name.to_string())).await;
            let (status, _) = result.unwrap_err();
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", name);
        }
    }

    #[tokio::test]
    async fn test_project_code_without_folder() {
        let state = state_with(None, h_templates());
        let (status, _) = project_code(State(state), Path("p.json".to_string()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_project_code_compiles_stored_project() {
        let dir = std::env::temp_dir().join(format!("sigcode-server-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("speed.json"), formula_project("h(5)").to_string()).unwrap();

        let state = state_with(Some(dir.clone()), h_templates());
        let Json(body) = project_code(State(state.clone()), Path("speed.json".to_string()))
            .await
            .unwrap();
        assert_eq!(body["code"], "WHEN((5 >= 0) AND (5 <= 20), 5*2, 0)");

        let (status, _) = project_code(State(state), Path("absent.json".to_string()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
