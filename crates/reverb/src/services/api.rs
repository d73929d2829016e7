//! reverb REST 接口客户端

use log::{debug, error};
use reqwest::{
    blocking::Client,
    header::{HeaderMap, HeaderValue},
};
use serde_json::Value;

use crate::{
    error::*,
    models::{ApiOptions, QueryOptions},
    traits::api::ListingsApi,
    utils::*,
};

/// 认证令牌请求头
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// 阻塞式 REST 接口客户端
///
/// 不重试, 不缓存.
#[derive(Debug, Clone)]
pub struct ReverbApi {
    client: Client,
    base_url: String,
}

impl ReverbApi {
    pub fn new(options: &ApiOptions) -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &options.api_token {
            headers.insert(
                AUTH_TOKEN_HEADER,
                HeaderValue::from_str(token).map_err(ApiErrorKind::from)?,
            );
        }

        Ok(Self {
            client: new_client_with_headers(headers).map_err(ApiErrorKind::from)?,
            base_url: normalize_base_url(&options.base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `<base_url><path>?<options>`
    fn get(&self, path: &str, options: &QueryOptions) -> ApiResult<Value> {
        let url = format!("{}{path}", self.base_url);
        debug!("GET {url} {options:?}");

        self.fetch(&url, options).map_err(|e| {
            error!("request {url} failed: {e}");
            ApiError { url, error: e }
        })
    }

    fn fetch(&self, url: &str, options: &QueryOptions) -> std::result::Result<Value, ApiErrorKind> {
        let response = self.client.get(url).query(options).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiErrorKind::Status(status));
        }

        Ok(serde_json::from_slice(&response.bytes()?)?)
    }
}

impl ListingsApi for ReverbApi {
    fn search_listings(&self, options: &QueryOptions) -> ApiResult<Value> {
        // 调用方的 condition 优先
        let mut query = QueryOptions::from([("condition".to_string(), "all".to_string())]);
        query.extend(options.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.get("listings", &query)
    }

    fn search_affiliate(&self, options: &QueryOptions) -> ApiResult<Value> {
        let mut query = options.clone();
        query.insert("sort".to_string(), "random".to_string());
        self.get("collections/affiliate-product-pool", &query)
    }

    fn handpicked(&self, name: &str, options: &QueryOptions) -> ApiResult<Value> {
        self.get(&format!("handpicked/{name}"), options)
    }

    fn collection(&self, name: &str, options: &QueryOptions) -> ApiResult<Value> {
        self.get(&format!("collections/{name}"), options)
    }

    fn search_priceguide(&self, options: &QueryOptions) -> ApiResult<Value> {
        self.get("priceguide", options)
    }

    fn listings_related_to_article(&self, slug: &str, options: &QueryOptions) -> ApiResult<Value> {
        self.get(&format!("articles/{slug}/related-listings"), options)
    }
}
