use axum::{Router, routing::get};
use tower_http::compression::CompressionLayer;
use tv_image_proxy::config::AppConfig;
use tv_image_proxy::cors::build_cors_layer;
use tv_image_proxy::features::health::health_check;
use tv_image_proxy::features::proxy::create_proxy_router;
use tv_image_proxy::http::image_client;
use tv_image_proxy::state::AppState;
use tv_image_proxy::{ShutdownManager, request_id::request_id_middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn compression_predicate() -> impl tower_http::compression::predicate::Predicate {
    use tower_http::compression::predicate::{NotForContentType, Predicate, SizeAbove};

    // 本服务的主要响应就是图片字节流：图片本身已压缩，再压缩只浪费 CPU，
    // 且流式转发遇到压缩层可能被引入缓冲。仅对 JSON/文本（错误体、
    // OpenAPI 文档）保留压缩，并保留默认最小阈值避免得不偿失。
    SizeAbove::default()
        .and(NotForContentType::IMAGES)
        .and(NotForContentType::const_new("application/octet-stream"))
        .and(NotForContentType::const_new("video/"))
        .and(NotForContentType::const_new("audio/"))
}

#[cfg(test)]
mod compression_predicate_tests {
    use super::compression_predicate;
    use axum::body::Body;
    use axum::http::{Response as HttpResponse, header};
    use tower_http::compression::predicate::Predicate;

    fn should_compress_for(ct: &str) -> bool {
        // 命中 SizeAbove（默认 32B），避免因为 body 太小导致测试不稳定。
        let body_bytes = vec![b'x'; 2048];
        let resp = HttpResponse::builder()
            .header(header::CONTENT_TYPE, ct)
            .body(Body::from(body_bytes))
            .unwrap();
        compression_predicate().should_compress(&resp)
    }

    #[test]
    fn compression_predicate_disables_relayed_image_types() {
        assert!(!should_compress_for("image/png"));
        assert!(!should_compress_for("image/jpeg"));
        assert!(!should_compress_for("image/webp"));
        assert!(!should_compress_for("application/octet-stream"));
    }

    #[test]
    fn compression_predicate_allows_json_errors() {
        assert!(should_compress_for("application/json"));
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        tv_image_proxy::features::proxy::handler::proxy_image,
        tv_image_proxy::features::health::handler::health_check,
    ),
    components(schemas(
        tv_image_proxy::error::AppError,
        tv_image_proxy::error::ErrorBody,
        tv_image_proxy::features::health::handler::HealthResponse,
    )),
    tags(
        (name = "Proxy", description = "Image proxy APIs"),
        (name = "Health", description = "Health APIs"),
    ),
    info(
        title = "TV Image Proxy API",
        version = "0.1.0",
        description = "Image relay service for TV/web clients (Axum)"
    )
)]
pub struct ApiDoc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tv_image_proxy=info,tower_http=info".into()),
        )
        .init();

    // 创建优雅退出管理器
    let shutdown_manager = ShutdownManager::new();

    // Load config
    if let Err(e) = AppConfig::init_global() {
        tracing::error!("Config init failed: {}", e);
        std::process::exit(1);
    }
    let config = AppConfig::global();

    // 启动信号处理器
    if let Err(e) = shutdown_manager.start_signal_handler() {
        tracing::error!("信号处理器启动失败: {}", e);
        std::process::exit(1);
    }

    // 出站 HTTP Client（全局连接池）
    let client = match image_client() {
        Ok(c) => c.clone(),
        Err(e) => {
            tracing::error!("HTTP client init failed: {}", e);
            std::process::exit(1);
        }
    };

    let app_state = AppState::new(client, config.proxy.clone());

    // Routes
    let api_router = Router::<AppState>::new().merge(create_proxy_router());

    let mut app = Router::<AppState>::new()
        .route("/health", get(health_check))
        .nest(&config.api.prefix, api_router)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    // 全局 request_id 中间件
    app = app.layer(axum::middleware::from_fn(request_id_middleware));

    // 按配置启用 CORS
    if let Some(cors) = build_cors_layer(&config.cors) {
        app = app.layer(cors);
    }

    // 响应压缩：仅压缩 JSON/文本，图片流不压缩
    app = app.layer(CompressionLayer::new().compress_when(compression_predicate()));

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!(
        "Image proxy: http://{}{}/image-proxy?url=...",
        addr,
        config.api.prefix
    );

    // 启动服务器并等待优雅退出信号
    let shutdown_timeout = config.shutdown.timeout_duration();
    let shutdown_signal = async move {
        let reason = shutdown_manager.wait_for_shutdown().await;
        tracing::info!("接收到退出信号: {:?}，开始优雅退出...", reason);

        // 留出在途代理请求收尾的时间窗口（上限为配置的超时）
        match tokio::time::timeout(shutdown_timeout, async {
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        })
        .await
        {
            Ok(_) => tracing::info!("优雅退出完成"),
            Err(_) => tracing::warn!("优雅退出超时，强制退出"),
        }
    };

    let graceful = axum::serve(listener, app).with_graceful_shutdown(async {
        shutdown_signal.await;
        tracing::info!("开始优雅关闭HTTP服务器...");
    });

    if let Err(e) = graceful.await {
        tracing::error!("服务器运行错误: {}", e);
        std::process::exit(1);
    }

    tracing::info!("服务器已优雅关闭");
}
