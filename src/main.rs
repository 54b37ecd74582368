// 服务入口：加载配置，挂载上传页面与 API 路由。
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::middleware::{from_fn, Next};
use axum::response::Response;
use axum::Router;
use futures::FutureExt;
use std::any::Any as StdAny;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use susar_splitter::config::{load_config, Config};
use susar_splitter::shutdown::shutdown_signal;
use susar_splitter::state::AppState;
use susar_splitter::{build_router, error_response, i18n};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config();
    init_tracing(&config);
    i18n::configure_i18n(
        Some(config.i18n.default_language.clone()),
        Some(config.i18n.supported_languages.clone()),
    );
    let state = Arc::new(AppState::new(config.clone()));

    let app = build_router(state);
    let app = mount_static_file(app, "web/index.html", "/");

    let cors = build_cors(&config);
    let app = app
        .layer(from_fn(language_guard))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(panic_guard));

    let addr = bind_address(&config);
    let listener = tokio::net::TcpListener::bind(addr.as_str()).await?;
    info!(
        "SUSAR 拆分服务已启动: http://{addr} (上传上限 {} 字节)",
        config.server.max_upload_bytes
    );

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(err) = server.await {
        warn!("服务退出异常: {err}");
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let default_level = config.observability.log_level.trim();
    let default_level = if default_level.is_empty() {
        "info".to_string()
    } else {
        default_level.to_lowercase()
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn bind_address(config: &Config) -> String {
    // 环境变量优先，兼容 PaaS 注入的 PORT。
    let host = std::env::var("SUSAR_HOST")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| config.server.host.clone());
    let port = ["SUSAR_PORT", "PORT"]
        .iter()
        .find_map(|key| {
            std::env::var(key)
                .ok()
                .and_then(|value| value.trim().parse::<u16>().ok())
        })
        .unwrap_or(config.server.port);
    format!("{host}:{port}")
}

fn mount_static_file<S>(app: Router<S>, file: &str, route: &str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let path = PathBuf::from(file);
    if path.exists() {
        app.route_service(route, ServeFile::new(path))
    } else {
        warn!("上传页面不存在，跳过挂载: {file}");
        app
    }
}

fn build_cors(config: &Config) -> CorsLayer {
    // 读取配置并转换为 tower-http 的 CORS 规则。
    let mut cors = CorsLayer::new();

    match config.cors.allow_origins.as_deref() {
        Some(origins) if origins.iter().any(|value| value == "*") => {
            cors = cors.allow_origin(Any);
        }
        Some(origins) => {
            let values = origins
                .iter()
                .filter_map(|value| value.parse().ok())
                .collect::<Vec<_>>();
            if !values.is_empty() {
                cors = cors.allow_origin(AllowOrigin::list(values));
            }
        }
        None => {
            cors = cors.allow_origin(Any);
        }
    }

    match config.cors.allow_methods.as_deref() {
        Some(methods) if methods.iter().any(|value| value == "*") => {
            cors = cors.allow_methods(Any);
        }
        Some(methods) => {
            let values = methods
                .iter()
                .filter_map(|value| value.parse().ok())
                .collect::<Vec<_>>();
            if !values.is_empty() {
                cors = cors.allow_methods(AllowMethods::list(values));
            }
        }
        None => {
            cors = cors.allow_methods(Any);
        }
    }

    match config.cors.allow_headers.as_deref() {
        Some(headers) if headers.iter().any(|value| value == "*") => {
            cors = cors.allow_headers(Any);
        }
        Some(headers) => {
            let values = headers
                .iter()
                .filter_map(|value| value.parse().ok())
                .collect::<Vec<_>>();
            if !values.is_empty() {
                cors = cors.allow_headers(AllowHeaders::list(values));
            }
        }
        None => {
            cors = cors.allow_headers(Any);
        }
    }

    // 通配来源不能与携带凭证同时启用。
    if config.cors.allow_credentials.unwrap_or(false)
        && !config
            .cors
            .allow_origins
            .as_deref()
            .is_some_and(|origins| origins.iter().any(|value| value == "*"))
    {
        cors = cors.allow_credentials(true);
    }

    cors
}

async fn language_guard(request: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let language = resolve_language_from_request(&request);
    let mut response =
        i18n::with_language(language.clone(), async move { next.run(request).await }).await;
    if !response.headers().contains_key("content-language") {
        if let Ok(value) = language.parse() {
            response.headers_mut().insert("content-language", value);
        }
    }
    Ok(response)
}

async fn panic_guard(request: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let language = resolve_language_from_request(&request);
    let result = AssertUnwindSafe(next.run(request)).catch_unwind().await;
    match result {
        Ok(response) => Ok(response),
        Err(panic) => {
            let detail = panic_message(panic.as_ref());
            error!("panic while handling {method} {path}: {detail}");
            let message = i18n::with_language(language, async { i18n::t("error.internal") }).await;
            Ok(error_response(StatusCode::INTERNAL_SERVER_ERROR, message))
        }
    }
}

fn panic_message(panic: &(dyn StdAny + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        return message.to_string();
    }
    if let Some(message) = panic.downcast_ref::<String>() {
        return message.clone();
    }
    "unknown panic".to_string()
}

fn resolve_language_from_request(request: &Request<Body>) -> String {
    let headers = request.headers();
    let mut candidates: Vec<String> = Vec::new();
    for name in ["x-susar-language", "accept-language"] {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            candidates.push(value.to_string());
        }
    }
    if let Some(query) = request.uri().query() {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if (key == "lang" || key == "language") && !value.trim().is_empty() {
                candidates.push(value.to_string());
            }
        }
    }
    i18n::resolve_language(candidates.iter().map(|value| value.as_str()))
}
