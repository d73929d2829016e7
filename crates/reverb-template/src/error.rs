use thiserror::Error;

/// 模板编译 / 渲染返回类型
pub type Result<T> = std::result::Result<T, Error>;

/// 模板编译 / 渲染错误
#[derive(Debug, Error)]
pub enum Error {
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("reference error: {0} is not defined")]
    Reference(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("range error: {0}")]
    Range(String),
}

impl Error {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }
}
