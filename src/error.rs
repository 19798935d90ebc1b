use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 应用统一错误类型
///
/// 兼容接口约定：所有错误响应的 body 固定为 `{"error": "<message>"}`，
/// 状态码按变体映射。调用方（OrionTV 等客户端）依赖这一稳定形态，
/// 请勿在 body 中追加字段。
#[derive(Error, Debug, utoipa::ToSchema)]
pub enum AppError {
    /// 缺少 url 参数（不发起任何出站请求）
    #[error("Missing image URL")]
    MissingUrl,

    /// 上游返回非 2xx，原样透传上游状态码与状态文本
    #[error("{reason}")]
    Upstream {
        /// 上游状态码
        #[schema(value_type = u16)]
        status: StatusCode,
        /// 上游状态文本
        reason: String,
    },

    /// 上游 2xx 但没有响应体
    #[error("Image response has no body")]
    EmptyBody,

    /// 出站请求超时（硬超时到期，在途请求已被取消）
    #[error("Image fetch timeout")]
    Timeout,

    /// 其他出站请求失败（连接错误、DNS 失败等）
    #[error("Error fetching image")]
    Fetch,
}

/// 错误响应 body（`{"error": string}`）
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// 人类可读的错误描述
    #[schema(example = "Missing image URL")]
    pub error: String,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingUrl => StatusCode::BAD_REQUEST,
            AppError::Upstream { status, .. } => *status,
            AppError::EmptyBody => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::Fetch => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 由上游状态码构造透传错误（状态文本缺失时退化为数字码）
    pub fn upstream(status: StatusCode) -> Self {
        let reason = status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| status.as_u16().to_string());
        AppError::Upstream { status, reason }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
        };
        let mut res = Json(body).into_response();
        *res.status_mut() = status;
        res
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest 自身报告的超时（connect/read 阶段）与硬超时同样按 504 处理
        if err.is_timeout() {
            AppError::Timeout
        } else {
            AppError::Fetch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;
    use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};
    use std::time::Duration;

    async fn status_and_error(err: AppError) -> (StatusCode, String) {
        let res = err.into_response();
        let status = res.status();
        let body = to_bytes(res.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        (status, json["error"].as_str().unwrap_or_default().to_string())
    }

    #[tokio::test]
    async fn missing_url_maps_to_400_with_fixed_message() {
        let (status, error) = status_and_error(AppError::MissingUrl).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error, "Missing image URL");
    }

    #[tokio::test]
    async fn upstream_error_relays_status_and_reason() {
        let (status, error) = status_and_error(AppError::upstream(StatusCode::NOT_FOUND)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error, "Not Found");
    }

    #[tokio::test]
    async fn timeout_maps_to_504() {
        let (status, error) = status_and_error(AppError::Timeout).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(error, "Image fetch timeout");
    }

    #[tokio::test]
    async fn error_body_has_single_error_key() {
        let res = AppError::EmptyBody.into_response();
        let body = to_bytes(res.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        let obj = json.as_object().expect("object body");
        assert_eq!(obj.len(), 1, "body must only carry the error field");
    }

    async fn start_hanging_http_server() -> std::net::SocketAddr {
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind tcp listener");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            loop {
                let (socket, _) = match listener.accept().await {
                    Ok(v) => v,
                    Err(_) => break,
                };
                tokio::spawn(async move {
                    // 不返回任何 HTTP 响应，触发客户端 read timeout。
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    drop(socket);
                });
            }
        });

        addr
    }

    #[tokio::test]
    async fn reqwest_timeout_converts_to_timeout_variant() {
        let addr = start_hanging_http_server().await;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("build reqwest client");

        let err = client
            .get(format!("http://{addr}/"))
            .send()
            .await
            .expect_err("expected timeout");
        assert!(err.is_timeout(), "expected reqwest timeout, got: {err}");

        let app: AppError = err.into();
        assert!(
            matches!(app, AppError::Timeout),
            "expected AppError::Timeout, got: {app:?}"
        );
    }
}
