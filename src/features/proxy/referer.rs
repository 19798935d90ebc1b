//! 出站 Referer 合成策略。
//!
//! 不少图源站点做了防盗链：Referer 不匹配预期站点就返回 403。
//! 这里按目标域名合成一个"像是从源站自己页面发起"的 Referer：
//! - 豆瓣图床必须带豆瓣站点的 Referer，否则直接拒绝；
//! - 其他站点带目标自身的 `scheme://host/`，可绕过最常见的同站校验；
//! - 目标解析失败时宁可不带 Referer，也不让请求整体失败。

use reqwest::Url;

/// 目标 URL 命中豆瓣图床/主站域名（子串匹配，覆盖各级子域）。
pub fn is_douban_host(target: &str) -> bool {
    target.contains("doubanio.com") || target.contains("douban.com")
}

/// 为目标 URL 合成 Referer。
///
/// 返回 `None` 表示应省略 Referer 头（目标无法解析为带 host 的绝对 URL）。
pub fn referer_for(target: &str, douban_referer: &str) -> Option<String> {
    if is_douban_host(target) {
        return Some(douban_referer.to_string());
    }

    let url = Url::parse(target).ok()?;
    let host = url.host_str()?;
    // 非默认端口保留在 host 部分，与浏览器 URL.host 行为一致
    match url.port() {
        Some(port) => Some(format!("{}://{}:{}/", url.scheme(), host, port)),
        None => Some(format!("{}://{}/", url.scheme(), host)),
    }
}

#[cfg(test)]
mod tests {
    use super::{is_douban_host, referer_for};

    const DOUBAN: &str = "https://movie.douban.com/";

    #[test]
    fn douban_hosts_get_fixed_referer() {
        assert!(is_douban_host("https://img1.doubanio.com/view/photo/p123.jpg"));
        assert!(is_douban_host("http://www.douban.com/some/path"));
        assert_eq!(
            referer_for("https://img9.doubanio.com/view/photo/s_ratio_poster/p1.webp", DOUBAN),
            Some(DOUBAN.to_string())
        );
        // 路径/子域不影响结果
        assert_eq!(
            referer_for("https://anything.douban.com/x/y?z=1", DOUBAN),
            Some(DOUBAN.to_string())
        );
    }

    #[test]
    fn other_hosts_get_self_referer() {
        assert_eq!(
            referer_for("https://cdn.example.com/poster/1.png", DOUBAN),
            Some("https://cdn.example.com/".to_string())
        );
        assert_eq!(
            referer_for("http://img.host.net/a/b/c.jpg?w=300", DOUBAN),
            Some("http://img.host.net/".to_string())
        );
    }

    #[test]
    fn non_default_port_is_preserved() {
        assert_eq!(
            referer_for("http://127.0.0.1:8080/img.png", DOUBAN),
            Some("http://127.0.0.1:8080/".to_string())
        );
    }

    #[test]
    fn unparseable_targets_omit_referer() {
        assert_eq!(referer_for("not a url", DOUBAN), None);
        // 相对路径不是绝对 URL
        assert_eq!(referer_for("/relative/path.png", DOUBAN), None);
        // 可解析但没有 host（如 data: URL）同样省略
        assert_eq!(referer_for("data:image/png;base64,AAAA", DOUBAN), None);
    }
}
