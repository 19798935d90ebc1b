use axum::{
    Router,
    body::Body,
    extract::{Query, State},
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::Response,
    routing::get,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::state::AppState;

use super::referer::referer_for;

/// 图片代理查询参数
#[derive(Debug, Default, Deserialize)]
pub struct ImageProxyQuery {
    /// 目标图片的绝对 URL
    #[serde(default)]
    url: Option<String>,
}

#[utoipa::path(
    get,
    path = "/image-proxy",
    summary = "图片代理",
    description = "代理抓取第三方图源并流式转发，解决 HTTPS 页面引用 HTTP 图片与防盗链问题。\
                   OrionTV 兼容接口：错误响应固定为 `{\"error\": string}`。",
    params(
        ("url" = String, Query, description = "目标图片的绝对 URL（必填）")
    ),
    responses(
        (status = 200, description = "图片字节流，Content-Type 透传自上游"),
        (status = 400, description = "缺少 url 参数", body = crate::error::ErrorBody),
        (status = 500, description = "上游无响应体或其他抓取失败", body = crate::error::ErrorBody),
        (status = 504, description = "抓取超时（10 秒）", body = crate::error::ErrorBody)
    ),
    tag = "Proxy"
)]
pub async fn proxy_image(
    State(state): State<AppState>,
    Query(q): Query<ImageProxyQuery>,
) -> Result<Response, AppError> {
    // 空字符串视同缺失，不发起网络请求
    let target = q
        .url
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(AppError::MissingUrl)?;

    let referer = referer_for(target, &state.proxy.douban_referer);
    debug!(url = target, referer = referer.as_deref(), "代理抓取图片");

    let mut request = state
        .image_client
        .get(target)
        .header(header::USER_AGENT, &state.proxy.user_agent);
    if let Some(value) = &referer {
        request = request.header(header::REFERER, value);
    }

    // 硬超时：到期丢弃 send future，在途请求随之取消（等价于 AbortController）。
    // 每个请求独享自己的超时，不跨请求共享任何可变状态。
    let response = match tokio::time::timeout(state.proxy.timeout_duration(), request.send()).await
    {
        Ok(Ok(resp)) => resp,
        Ok(Err(err)) => {
            warn!(url = target, error = %err, "图片抓取失败");
            return Err(err.into());
        }
        Err(_elapsed) => {
            warn!(
                url = target,
                timeout_ms = state.proxy.timeout_ms,
                "图片抓取超时，已取消在途请求"
            );
            return Err(AppError::Timeout);
        }
    };

    // 状态码检查先于响应体检查：非 2xx 一律透传上游状态，不重试不兜底
    let status = response.status();
    if !status.is_success() {
        warn!(url = target, status = status.as_u16(), "上游返回非 2xx");
        return Err(AppError::upstream(status));
    }

    // 2xx 但明确声明空响应体，视为代理侧失败
    if response.content_length() == Some(0) {
        return Err(AppError::EmptyBody);
    }

    Ok(relay_response(response, state.proxy.cache_max_age_secs))
}

/// 把上游响应包装为出站响应：透传 Content-Type，叠加长缓存头，流式转发 body。
fn relay_response(upstream: reqwest::Response, cache_max_age_secs: u64) -> Response {
    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();

    // body 不落内存：直接把上游字节流接到出站响应，大图也不会放大内存占用
    let mut res = Response::new(Body::from_stream(upstream.bytes_stream()));
    *res.status_mut() = StatusCode::OK;

    let headers = res.headers_mut();
    if let Some(ct) = content_type {
        headers.insert(header::CONTENT_TYPE, ct);
    }
    let (shared, cdn) = cache_control_values(cache_max_age_secs);
    headers.insert(header::CACHE_CONTROL, shared);
    headers.insert(HeaderName::from_static("cdn-cache-control"), cdn.clone());
    headers.insert(HeaderName::from_static("vercel-cdn-cache-control"), cdn);
    // 提示边缘缓存按完整 query 区分缓存键（不同 url= 指向不同图片）
    headers.insert(
        HeaderName::from_static("netlify-vary"),
        HeaderValue::from_static("query"),
    );

    res
}

/// 生成浏览器/共享缓存与 CDN 专用的 Cache-Control 值。
fn cache_control_values(max_age_secs: u64) -> (HeaderValue, HeaderValue) {
    let shared = HeaderValue::from_str(&format!(
        "public, max-age={max_age_secs}, s-maxage={max_age_secs}"
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("public, max-age=15720000, s-maxage=15720000"));
    let cdn = HeaderValue::from_str(&format!("public, s-maxage={max_age_secs}"))
        .unwrap_or_else(|_| HeaderValue::from_static("public, s-maxage=15720000"));
    (shared, cdn)
}

pub fn create_proxy_router() -> Router<AppState> {
    Router::new().route("/image-proxy", get(proxy_image))
}

#[cfg(test)]
mod tests {
    use super::cache_control_values;

    #[test]
    fn cache_control_values_render_both_variants() {
        let (shared, cdn) = cache_control_values(15_720_000);
        assert_eq!(
            shared.to_str().unwrap(),
            "public, max-age=15720000, s-maxage=15720000"
        );
        assert_eq!(cdn.to_str().unwrap(), "public, s-maxage=15720000");
    }
}
