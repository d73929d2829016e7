//! 辅助工具

use std::sync::LazyLock;

use regex::Regex;
use reqwest::{blocking::Client, header::HeaderMap};

/// 从请求头快速创建 Client
pub fn new_client_with_headers(headers: HeaderMap) -> reqwest::Result<Client> {
    Client::builder().default_headers(headers).build()
}

/// 补全接口地址末尾的 `/`
pub fn normalize_base_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// 将 `data-*` 属性名 (不含前缀) 转为驼峰形式: `reverb-search-price-max` -> `reverbSearchPriceMax`
pub fn camel_case(name: &str) -> String {
    static DASH_ALPHA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-([a-z])").unwrap());

    DASH_ALPHA
        .replace_all(name, |caps: &regex::Captures| caps[1].to_ascii_uppercase())
        .into_owned()
}

/// 将驼峰形式转为下划线形式: `PriceMax` -> `price_max`
pub fn snake_case(name: &str) -> String {
    static LOWER_UPPER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").unwrap());

    LOWER_UPPER.replace_all(name, "${1}_${2}").to_lowercase()
}
