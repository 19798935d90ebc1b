use once_cell::sync::OnceCell;
use reqwest::Client;
use std::time::Duration;

/// 全局复用的 HTTP Client（统一连接池/Keep-Alive），避免每次请求重复创建。
///
/// 说明：
/// - 不在 client 层设置整体 timeout：图片代理的 10 秒硬超时是按请求施加的
///   （`tokio::time::timeout` 包裹 send），超时时直接丢弃 future 取消在途请求，
///   这样 504（超时）与 500（其他网络错误）两条路径才能区分开。
/// - 仅限制 connect 超时，避免黑洞地址长时间占用连接池。
/// - `Client` 本身是线程安全的，适合全局复用。
static IMAGE_CLIENT: OnceCell<Client> = OnceCell::new();

/// 图片出站请求专用 Client。
pub fn image_client() -> Result<&'static Client, reqwest::Error> {
    IMAGE_CLIENT.get_or_try_init(|| {
        Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
    })
}
