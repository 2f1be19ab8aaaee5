//! Route handlers.
//!
//! Every image request follows the same shape: validate, take the per-key
//! mutex, run the cache policy, then serve bytes with `X-Og-Cache` /
//! `X-Og-Code` telling the caller which rule fired.

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::extract::{Path as PathParam, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use ogserver_client::render::{ShotOptions, render};
use ogserver_core::cache::{REGEN_PARAM, encode_query, request_cache_key};
use ogserver_core::urlkey::ValidatedUrl;

use crate::error::{ApiError, ApiResult};
use crate::policy::{self, CacheCode, Decision};
use crate::state::AppState;
use crate::templates::{self, TemplateServer};

/// Where `/` and `/help` point.
const DOCS_URL: &str = "https://github.com/stormlightlabs/ogserver";

/// `GET /help` (and `/`): redirect to the project documentation.
pub async fn help() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, DOCS_URL)]).into_response()
}

/// `GET /capture` and its `/get` alias.
pub async fn capture(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Response> {
    shot(state, None, params).await
}

/// `GET /template/{template}`.
pub async fn template(
    State(state): State<AppState>,
    PathParam(template): PathParam<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<Response> {
    shot(state, Some(template), params).await
}

async fn shot(state: AppState, template: Option<String>, params: Vec<(String, String)>) -> ApiResult<Response> {
    if let Some(name) = &template
        && !templates::is_valid(&state.config.template_dir(), name)
    {
        return Err(ApiError::InvalidTemplate);
    }

    let url = ValidatedUrl::parse(param(&params, "url").unwrap_or_default(), &state.allowed_domains)?;
    let key = url.key().to_string();
    let request_key = request_cache_key(template.as_deref(), &params);

    // serialize concurrent identical requests; contenders observe the
    // artifact this holder produces and serve it as a hit
    let _guard = state.keylocks.acquire(&key).await;

    let regen_valid =
        !state.config.regen_key.is_empty() && param(&params, REGEN_PARAM) == Some(state.config.regen_key.as_str());

    let stored = match state.store.get(&key).await {
        Ok(row) => row,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "artifact lookup failed, treating as miss");
            None
        }
    };

    let decision = match policy::before_probe(regen_valid, stored.as_ref(), &request_key) {
        Some(decision) => decision,
        None => {
            let outcome = state.probe.check(url.target()).await;
            policy::after_probe(stored.as_ref(), &request_key, &outcome)
        }
    };

    match decision {
        Decision::OriginUnreachable => Err(ApiError::OriginUnreachable),
        Decision::ServeStored { file, code } => {
            serve_file(&state.config.image_dir().join(file), code).await
        }
        Decision::Render(code) => {
            let path = regenerate(&state, template.as_deref(), &url, &params).await?;
            let file = path
                .file_name()
                .and_then(|f| f.to_str())
                .ok_or_else(|| ApiError::Internal(format!("artifact path has no file name: {}", path.display())))?;
            state.store.put(&key, file, &request_key).await?;
            serve_file(&path, code).await
        }
    }
}

/// Run the renderer for a capture or template request.
async fn regenerate(
    state: &AppState,
    template: Option<&str>,
    url: &ValidatedUrl,
    params: &[(String, String)],
) -> ApiResult<PathBuf> {
    let shot = ShotOptions::from_query(params, &state.image_options);
    let image_dir = state.config.image_dir();

    match template {
        None => {
            // the marker lets origins recognize (and e.g. simplify) the page
            // being captured
            let target = format!("{}?og-image-request=true", url.target());
            Ok(render(&state.pool, &image_dir, &target, &shot).await?)
        }
        Some(name) => {
            let (server, base) = TemplateServer::spawn(state.config.template_dir().join(name))
                .await
                .map_err(|e| ApiError::Internal(format!("template server: {e}")))?;

            // the template reads its inputs from location.search
            let target = format!("{}/?{}", base, encode_query(params.iter().map(|(k, v)| (k.as_str(), v.as_str()))));
            let result = render(&state.pool, &image_dir, &target, &shot).await;
            server.close().await;
            Ok(result?)
        }
    }
}

async fn serve_file(path: &Path, code: CacheCode) -> ApiResult<Response> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to read artifact {}: {e}", path.display())))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(path))
        .header("x-og-cache", code.cache())
        .header("x-og-code", code.code())
        .body(Body::from(bytes))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        _ => "image/jpeg",
    }
}

fn param<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
}
