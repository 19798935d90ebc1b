/// 图片代理（核心功能）
pub mod proxy;

/// 健康检查
pub mod health;
