use std::{net::IpAddr, str::FromStr, sync::Arc, time::Duration};

use admin::setup_admin_router;
use axum::{
    extract::MatchedPath,
    http::Request,
    response::{Redirect, Response},
    routing::get,
    Router,
};
use cloudldb_config::ServerConfig;
use cloudldb_core::Runtime;
use invoke::setup_invoke_router;
use tower_http::{classify::ServerErrorsFailureClass, trace::TraceLayer};
use tracing::{info_span, Span};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa_scalar::{Scalar, Servable};

mod admin;
mod invoke;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

const CLOUDLDB_VERSION: &str = env!("CARGO_PKG_VERSION");

fn set_api_docs_info(mut openapi: utoipa::openapi::OpenApi) -> utoipa::openapi::OpenApi {
    openapi.info.title = "cloudldb invocation API".to_string();
    openapi.info.version = CLOUDLDB_VERSION.to_string();
    openapi.info.description =
        Some("Table compaction and point lookup handlers backed by external executables".to_string());

    openapi
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;
    setup_tracing(&config.log_level);

    let router = build_router(Arc::new(Runtime::new()));

    let addr = std::net::SocketAddr::new(
        IpAddr::from_str(&config.host)
            .map_err(|e| anyhow::anyhow!("Failed to parse IP address from config: {}", e))?,
        config.port,
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to address {}: {}", addr, e))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .await
        .map_err(|e| anyhow::anyhow!("Server failed: {}", e))?;

    Ok(())
}

fn build_router(runtime: Arc<Runtime>) -> Router {
    let (invoke_router, mut api_docs) = setup_invoke_router();
    let (admin_router, api_docs_admin) = setup_admin_router();
    api_docs.merge(api_docs_admin);
    let api_docs = set_api_docs_info(api_docs);

    let router = invoke_router
        .merge(admin_router)
        .with_state(runtime)
        .merge(Scalar::with_url("/scalar/", api_docs))
        .route("/scalar", get(|| async { Redirect::to("/scalar/") }));

    with_trace_layer(router)
}

fn setup_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "{}={level},cloudldb_core={level},cloudldb_object_storage={level},tower_http=debug,axum::rejection=trace",
                    env!("CARGO_CRATE_NAME"),
                    level = log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn with_trace_layer(router: Router) -> Router {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let matched_path = request
                    .extensions()
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str);

                info_span!("http_request", method = ?request.method(), matched_path)
            })
            .on_request(|_request: &Request<_>, _span: &Span| {
                tracing::info!("Request Received.");
            })
            .on_response(|response: &Response, latency: Duration, _span: &Span| {
                tracing::info!(status = %response.status(), "Response Completed. Duration: {:?}", latency);
            })
            .on_failure(
                |error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                    tracing::error!(%error, "Request failed");
                },
            ),
    )
}

#[cfg(all(test, unix))]
mod tests {
    use std::{os::unix::fs::PermissionsExt, path::Path};

    use axum::{
        body::Body,
        http::{header, StatusCode},
    };
    use cloudldb_config::InvocationConfig;
    use cloudldb_object_storage::{ObjectTableStore, TableStore};
    use http_body_util::BodyExt;
    use object_store::{memory::InMemory, ObjectStore, PutPayload};
    use tower::ServiceExt;

    use super::*;

    fn config(scratch: &Path, reader: &Path) -> InvocationConfig {
        InvocationConfig {
            region: "us-east-1".to_string(),
            bucket: "tables".to_string(),
            merger_bin: scratch.join("standalone_merger"),
            table_reader_bin: reader.to_path_buf(),
            scratch_dir: Some(scratch.to_path_buf()),
            local_store_dir: None,
            report_timings: false,
        }
    }

    async fn runtime(config: InvocationConfig) -> Arc<Runtime> {
        let bucket = Arc::new(InMemory::new());
        bucket
            .put(
                &object_store::path::Path::from("000005.ldb"),
                PutPayload::from_static(b"five"),
            )
            .await
            .unwrap();
        let store: Arc<dyn TableStore> = Arc::new(ObjectTableStore::new(bucket));

        Arc::new(
            Runtime::with_store_factory(move |_| Ok(store.clone()))
                .with_config_loader(move || Ok(config.clone())),
        )
    }

    async fn post(router: Router, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_version() {
        let scratch = tempfile::tempdir().unwrap();
        let router = build_router(runtime(config(scratch.path(), scratch.path())).await);

        let response = router
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], CLOUDLDB_VERSION);
    }

    #[tokio::test]
    async fn lookup_miss_is_a_successful_response() {
        let scratch = tempfile::tempdir().unwrap();
        let bin = tempfile::tempdir().unwrap();
        let reader = bin.path().join("table_reader");
        std::fs::write(&reader, "#!/bin/sh\necho 'not found'\nexit 1\n").unwrap();
        std::fs::set_permissions(&reader, std::fs::Permissions::from_mode(0o755)).unwrap();

        let router = build_router(runtime(config(scratch.path(), &reader)).await);
        let (status, body) = post(router, "/api/invoke/get", r#"{"number":5,"user_key":"k"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"status": 1, "value": "not found"}));
    }

    #[tokio::test]
    async fn unparseable_compaction_payload_is_a_bad_request() {
        let scratch = tempfile::tempdir().unwrap();
        let router = build_router(runtime(config(scratch.path(), scratch.path())).await);

        let (status, body) = post(router, "/api/invoke/compact", r#"{"data":"not json"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.as_str().unwrap().starts_with("Invalid invocation event"));
    }

    #[tokio::test]
    async fn missing_table_is_a_server_error() {
        let scratch = tempfile::tempdir().unwrap();
        let router = build_router(runtime(config(scratch.path(), scratch.path())).await);

        let (status, _) = post(router, "/api/invoke/get", r#"{"number":6,"user_key":"k"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
