pub mod handler;
pub mod referer;

pub use handler::{ImageProxyQuery, create_proxy_router};
pub use referer::{is_douban_host, referer_for};
