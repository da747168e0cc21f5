use axum::{Json, extract::{Path, State}, http::{HeaderMap, StatusCode}, response::{IntoResponse, Response}};
use std::sync::Arc;
use parking_lot::RwLock;
use serde_json::json;
use uuid::Uuid;
use chrono::Utc;

use crate::{cache::ResultCache, gemini::{ChunkSource, HttpChunkSource}, models::{NameRequest, NamingRecord}, naming::{NameStylist, NamingError}};

pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

pub struct AppState<S = HttpChunkSource> {
    pub cache: Arc<RwLock<ResultCache>>,
    pub stylist: Arc<NameStylist<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self { cache: self.cache.clone(), stylist: self.stylist.clone() }
    }
}

fn error_response(status: StatusCode, message: &str, retryable: bool) -> Response {
    (status, Json(json!({ "error": message, "retryable": retryable }))).into_response()
}

fn naming_error_response(err: &NamingError) -> Response {
    if err.is_configuration() {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "naming service is not configured for this tier", false);
    }
    error_response(StatusCode::BAD_GATEWAY, &err.to_string(), err.is_retryable())
}

fn request_id(headers: &HeaderMap, body: &NameRequest) -> String {
    headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or(body.request_id.as_deref())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

pub async fn create_naming<S: ChunkSource + 'static>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(body): Json<NameRequest>,
) -> Response {
    let options = match body.to_options() {
        Ok(options) => options,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string(), false),
    };
    let request_id = request_id(&headers, &body);

    let cached = state.cache.read().get_fresh(&request_id, Utc::now()).cloned();
    if let Some(record) = cached {
        if record.options != options {
            tracing::warn!("⚠️ Request id {} reused with different options", request_id);
            return error_response(StatusCode::CONFLICT, "request id was already used with different options", false);
        }
        tracing::info!("♻️ Replaying cached result for request {}", request_id);
        return Json(record).into_response();
    }

    tracing::info!("🚀 Naming request {} for: {}", request_id, options.original_name());
    let result = match state.stylist.generate_styled_name(&options).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("❌ Naming request {} failed: {}", request_id, e);
            return naming_error_response(&e);
        }
    };

    let record = NamingRecord {
        request_id: request_id.clone(),
        variant: result.variant,
        result: result.into_value(),
        options,
        created_at: Utc::now(),
    };

    let mut cache = state.cache.write();
    cache.insert(record.clone(), Utc::now());
    tracing::info!("✅ Stored result for request {} ({} cached)", request_id, cache.len());
    Json(record).into_response()
}

pub async fn get_naming<S: ChunkSource + 'static>(Path(request_id): Path<String>, State(state): State<AppState<S>>) -> Response {
    let cached = state.cache.read().get_fresh(&request_id, Utc::now()).cloned();
    if let Some(r) = cached { Json(r).into_response() } else { StatusCode::NOT_FOUND.into_response() }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_router;
    use crate::gemini::tests::{serve, slow_upstream, ScriptedSource, SECRET};
    use crate::gemini::{Credentials, GeminiClient};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    const ANSWER: &str = "Here you go:\n{\"korean_name_suggestion\":{\"full_name\":\"김서화\"},\"social_share_content\":{}}\nEnjoy!";

    fn state(source: Arc<ScriptedSource>, credentials: Credentials) -> AppState<Arc<ScriptedSource>> {
        AppState {
            cache: Arc::new(RwLock::new(ResultCache::new(std::time::Duration::from_secs(600)))),
            stylist: Arc::new(NameStylist::new(GeminiClient::new(source, credentials, "gemini-test"))),
        }
    }

    fn keys() -> Credentials {
        Credentials { free: Some("free-key".into()), premium: None }
    }

    fn post(body: Value, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::post("/api/naming").header("content-type", "application/json");
        if let Some(key) = key {
            builder = builder.header(IDEMPOTENCY_HEADER, key);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn body(tier: &str) -> Value {
        json!({"original_name": "Sophia Loren", "gender": "feminine", "script_style": "sino_korean", "tier": tier})
    }

    async fn read_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn generates_and_replays_by_idempotency_key() {
        let source = Arc::new(ScriptedSource::with_chunks(&[ANSWER]));
        let app = build_router(state(source.clone(), keys()));

        let first = app.clone().oneshot(post(body("free"), Some("req-42"))).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let first = read_json(first).await;
        assert_eq!(first["request_id"], json!("req-42"));
        assert_eq!(first["result"]["korean_name_suggestion"]["full_name"], json!("김서화"));
        assert_eq!(first["result"]["original_name"], json!("Sophia Loren"));
        assert_eq!(first["variant"], json!("free_simple"));
        assert_eq!(first["options"]["detail"], json!("simple"));
        assert_eq!(first["options"]["original_name"], json!("Sophia Loren"));

        let replay = app.clone().oneshot(post(body("free"), Some("req-42"))).await.unwrap();
        assert_eq!(read_json(replay).await, first);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let fetched = app.oneshot(Request::get("/api/naming/req-42").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(fetched.status(), StatusCode::OK);
        assert_eq!(read_json(fetched).await, first);
    }

    #[tokio::test]
    async fn reused_key_with_different_options_conflicts() {
        let source = Arc::new(ScriptedSource::with_chunks(&[ANSWER]));
        let app = build_router(state(source.clone(), keys()));

        let first = app.clone().oneshot(post(body("free"), Some("req-9"))).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let mut detailed = body("free");
        detailed["detail"] = json!("detailed");
        let second = app.clone().oneshot(post(detailed, Some("req-9"))).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(read_json(second).await["retryable"], json!(false));

        let mut renamed = body("free");
        renamed["original_name"] = json!("Leo");
        let third = app.oneshot(post(renamed, Some("req-9"))).await.unwrap();
        assert_eq!(third.status(), StatusCode::CONFLICT);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn upstream_timeout_does_not_leak_the_key() {
        let base_url = serve(slow_upstream()).await;
        let source = HttpChunkSource::new(&base_url, std::time::Duration::from_millis(300)).unwrap();
        let credentials = Credentials { free: Some(SECRET.into()), premium: None };
        let state = AppState {
            cache: Arc::new(RwLock::new(ResultCache::new(std::time::Duration::from_secs(600)))),
            stylist: Arc::new(NameStylist::new(GeminiClient::new(source, credentials, "gemini-test"))),
        };
        let response = build_router(state).oneshot(post(body("free"), None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(!text.contains(SECRET), "{text}");
        assert_eq!(serde_json::from_str::<Value>(&text).unwrap()["retryable"], json!(true));
    }

    #[tokio::test]
    async fn body_request_id_is_used_without_header() {
        let source = Arc::new(ScriptedSource::with_chunks(&[ANSWER]));
        let app = build_router(state(source, keys()));
        let mut request = body("free");
        request["request_id"] = json!("from-body");
        let response = app.oneshot(post(request, None)).await.unwrap();
        assert_eq!(read_json(response).await["request_id"], json!("from-body"));
    }

    #[tokio::test]
    async fn empty_name_is_a_bad_request() {
        let source = Arc::new(ScriptedSource::with_chunks(&[ANSWER]));
        let app = build_router(state(source.clone(), keys()));
        let mut request = body("free");
        request["original_name"] = json!("  ");
        let response = app.oneshot(post(request, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_premium_key_is_service_unavailable() {
        let source = Arc::new(ScriptedSource::with_chunks(&[ANSWER]));
        let app = build_router(state(source, keys()));
        let response = app.oneshot(post(body("premium"), None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(read_json(response).await["retryable"], json!(false));
    }

    #[tokio::test]
    async fn unusable_output_is_a_retryable_bad_gateway() {
        let source = Arc::new(ScriptedSource::with_chunks(&["I cannot help with that."]));
        let app = build_router(state(source, keys()));
        let response = app.clone().oneshot(post(body("free"), Some("req-7"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(read_json(response).await["retryable"], json!(true));

        let fetched = app.oneshot(Request::get("/api/naming/req-7").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(fetched.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let source = Arc::new(ScriptedSource::default());
        let app = build_router(state(source, keys()));
        let response = app.oneshot(Request::get("/api/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(read_json(response).await, json!({"status": "ok"}));
    }
}
