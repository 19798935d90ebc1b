use axum::http::{HeaderValue, Method, header};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::config::CorsConfig;

/// 根据配置构建 CORS 中间件
///
/// 图片代理常被网页端 `<img>`/`fetch` 跨域使用，默认关闭，按部署开启。
pub fn build_cors_layer(cors: &CorsConfig) -> Option<CorsLayer> {
    if !cors.enabled {
        return None;
    }

    let origins = ListedValues::parse(&cors.allowed_origins, |v| {
        HeaderValue::from_str(v)
            .map_err(|_| tracing::warn!("CORS allowed_origins 含无效值: {}", v))
            .ok()
    });
    if !origins.any && origins.items.is_empty() {
        tracing::warn!("CORS 已启用但 allowed_origins 为空，已跳过启用");
        return None;
    }

    let methods = ListedValues::parse(&cors.allowed_methods, |v| {
        Method::from_bytes(v.to_ascii_uppercase().as_bytes())
            .map_err(|_| tracing::warn!("CORS allowed_methods 含无效值: {}", v))
            .ok()
    });
    let headers = ListedValues::parse(&cors.allowed_headers, |v| {
        header::HeaderName::from_bytes(v.to_ascii_lowercase().as_bytes())
            .map_err(|_| tracing::warn!("CORS allowed_headers 含无效值: {}", v))
            .ok()
    });

    if cors.allow_credentials && (origins.any || methods.any || headers.any) {
        tracing::error!("CORS 配置无效：allow_credentials=true 不能与 \"*\" 同时使用，已跳过启用");
        return None;
    }

    let mut layer = CorsLayer::new();

    layer = if origins.any {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins.items)
    };

    if methods.any {
        layer = layer.allow_methods(Any);
    } else if !methods.items.is_empty() {
        layer = layer.allow_methods(methods.items);
    }

    if headers.any {
        layer = layer.allow_headers(Any);
    } else if !headers.items.is_empty() {
        layer = layer.allow_headers(headers.items);
    }

    if cors.allow_credentials {
        layer = layer.allow_credentials(true);
    }

    if let Some(secs) = cors.max_age_secs
        && secs > 0
    {
        layer = layer.max_age(Duration::from_secs(secs));
    }

    Some(layer)
}

/// 解析后的配置项列表："*" 折叠为 any，空白与无效项丢弃。
struct ListedValues<T> {
    any: bool,
    items: Vec<T>,
}

impl<T> ListedValues<T> {
    fn parse(values: &[String], convert: impl Fn(&str) -> Option<T>) -> Self {
        let mut any = false;
        let mut items = Vec::new();
        for raw in values {
            let value = raw.trim();
            if value.is_empty() {
                continue;
            }
            if value == "*" {
                any = true;
                continue;
            }
            if let Some(v) = convert(value) {
                items.push(v);
            }
        }
        Self { any, items }
    }
}
