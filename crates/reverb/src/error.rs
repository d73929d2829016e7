//! reverb 错误处理

use thiserror::Error;

use crate::models::EmbedKind;

/// reverb 标准返回类型
pub type Result<T> = std::result::Result<T, Error>;

/// 接口请求返回类型
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// reverb 标准错误类型
#[derive(Debug, Error)]
pub enum Error {
    #[error("template failed: {0}")]
    Template(#[from] reverb_template::Error),

    #[error("api request failed: {0}")]
    Api(#[from] ApiError),

    #[error("html rewriting failed: {0}")]
    Rewrite(#[from] lol_html::errors::RewritingError),

    #[error("invalid selector: {0}")]
    Selector(String),

    #[error("missing attribute: data-{0}")]
    MissingArgument(&'static str),
}

/// 接口请求错误
#[derive(Debug, Error)]
#[error("api error: url: {}, error: {}", self.url, self.error)]
pub struct ApiError {
    pub url: String,
    pub error: ApiErrorKind,
}

impl From<ApiErrorKind> for ApiError {
    /// 创建不包含 url 的接口请求错误
    fn from(value: ApiErrorKind) -> Self {
        Self {
            url: String::default(),
            error: value,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiErrorKind {
    #[error("reqwest failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("unexpected status: {0}")]
    Status(reqwest::StatusCode),

    #[error("serde_json failed: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

/// 单个嵌入容器的错误
///
/// 失败的容器保持原样, 不影响其余容器.
#[derive(Debug, Error)]
#[error("embed error: {} #{}: {}", self.kind, self.index, self.error)]
pub struct EmbedError {
    pub kind: EmbedKind,
    /// 同类容器中的序号
    pub index: usize,
    pub error: Error,
}
