//! 接口配置与查询参数

use derive_builder::Builder;
use indexmap::IndexMap;

/// 默认接口地址
pub const DEFAULT_BASE_URL: &str = "https://reverb.com/api/";

/// 查询参数, 保持插入顺序
pub type QueryOptions = IndexMap<String, String>;

/// 接口配置
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(setter(into))]
pub struct ApiOptions {
    /// 设置后以 X-Auth-Token 请求头发送
    #[builder(default, setter(into, strip_option))]
    pub api_token: Option<String>,
    #[builder(default = "DEFAULT_BASE_URL.to_string()")]
    pub base_url: String,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[test]
#[cfg(test)]
fn test_api_options_builder() {
    let options = ApiOptionsBuilder::default().build().unwrap();
    assert_eq!(options, ApiOptions::default());

    let options = ApiOptionsBuilder::default()
        .api_token("token")
        .base_url("http://localhost/api")
        .build()
        .unwrap();
    assert_eq!(options.api_token.as_deref(), Some("token"));
    assert_eq!(options.base_url, "http://localhost/api");
}
