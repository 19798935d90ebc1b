use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 日志格式
    pub format: String,
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API 路由前缀
    pub prefix: String,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default = "CorsConfig::default_enabled")]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// 允许的方法列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_methods: Vec<String>,
    /// 允许的请求头列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    /// 是否允许携带凭证（Cookie/Authorization）
    #[serde(default = "CorsConfig::default_allow_credentials")]
    pub allow_credentials: bool,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl CorsConfig {
    fn default_enabled() -> bool {
        false
    }

    fn default_allow_credentials() -> bool {
        false
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            allowed_origins: Vec::new(),
            allowed_methods: Vec::new(),
            allowed_headers: Vec::new(),
            allow_credentials: Self::default_allow_credentials(),
            max_age_secs: None,
        }
    }
}

/// 图片代理配置
///
/// 默认值即兼容接口约定的固定常量，一般不需要修改；
/// 暴露为配置项主要便于测试和特殊部署（如缩短超时）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// 出站请求硬超时（毫秒），到期取消在途请求
    #[serde(default = "ProxyConfig::default_timeout_ms")]
    pub timeout_ms: u64,
    /// 出站请求固定 User-Agent（桌面浏览器 UA，降低被防盗链拦截的概率）
    #[serde(default = "ProxyConfig::default_user_agent")]
    pub user_agent: String,
    /// 响应缓存时长（秒），写入 Cache-Control/CDN 缓存头
    #[serde(default = "ProxyConfig::default_cache_max_age")]
    pub cache_max_age_secs: u64,
    /// 豆瓣域名命中时使用的固定 Referer
    #[serde(default = "ProxyConfig::default_douban_referer")]
    pub douban_referer: String,
}

impl ProxyConfig {
    fn default_timeout_ms() -> u64 {
        10_000
    }
    fn default_user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36"
            .to_string()
    }
    fn default_cache_max_age() -> u64 {
        // 约半年
        15_720_000
    }
    fn default_douban_referer() -> String {
        "https://movie.douban.com/".to_string()
    }

    /// 获取出站请求超时时长
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            timeout_ms: Self::default_timeout_ms(),
            user_agent: Self::default_user_agent(),
            cache_max_age_secs: Self::default_cache_max_age(),
            douban_referer: Self::default_douban_referer(),
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "AppConfig::default_server")]
    pub server: ServerConfig,
    #[serde(default = "AppConfig::default_logging")]
    pub logging: LoggingConfig,
    #[serde(default = "AppConfig::default_api")]
    pub api: ApiConfig,
    /// CORS 配置
    #[serde(default)]
    pub cors: CorsConfig,
    /// 图片代理配置
    #[serde(default)]
    pub proxy: ProxyConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 从配置文件加载配置，支持环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        tracing::info!("正在从 {:?} 加载配置文件", config_path);

        let builder = ConfigBuilder::builder()
            // 配置文件可缺省：所有字段都有默认值
            .add_source(File::with_name(config_path.to_str().unwrap()).required(false))
            // 支持环境变量覆盖，例如：APP_SERVER_PORT
            .add_source(
                Environment::with_prefix("APP")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        builder.try_deserialize()
    }

    /// 获取全局配置单例
    pub fn global() -> &'static AppConfig {
        CONFIG.get().expect("配置未初始化，请先调用 init_global()")
    }

    /// 初始化全局配置
    pub fn init_global() -> Result<(), ConfigError> {
        let config = Self::load()?;
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))?;
        Ok(())
    }

    /// 获取配置文件路径
    fn get_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn default_server() -> ServerConfig {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3210,
        }
    }

    fn default_logging() -> LoggingConfig {
        LoggingConfig {
            level: "info".to_string(),
            format: "full".to_string(),
        }
    }

    fn default_api() -> ApiConfig {
        ApiConfig {
            prefix: "/api".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: Self::default_server(),
            logging: Self::default_logging(),
            api: Self::default_api(),
            cors: CorsConfig::default(),
            proxy: ProxyConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ProxyConfig;

    #[test]
    fn proxy_defaults_match_wire_contract() {
        let p = ProxyConfig::default();
        assert_eq!(p.timeout_ms, 10_000);
        assert_eq!(p.cache_max_age_secs, 15_720_000);
        assert_eq!(p.douban_referer, "https://movie.douban.com/");
        assert!(p.user_agent.starts_with("Mozilla/5.0"));
    }
}
