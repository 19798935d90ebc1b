use reqwest::Client;

use crate::config::ProxyConfig;

/// 聚合的应用共享状态
///
/// 出站 Client 与代理配置通过 State 注入而非直接取全局单例，
/// 方便集成测试把 handler 指向本地 stub 上游并缩短超时。
#[derive(Clone)]
pub struct AppState {
    /// 图片出站请求 Client（内部为 Arc，Clone 代价低）
    pub image_client: Client,
    /// 图片代理配置快照
    pub proxy: ProxyConfig,
}

impl AppState {
    pub fn new(image_client: Client, proxy: ProxyConfig) -> Self {
        Self {
            image_client,
            proxy,
        }
    }
}
