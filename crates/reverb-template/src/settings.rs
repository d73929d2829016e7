//! 模板编译配置

use regex::Regex;

use crate::error::*;

/// 默认求值定界符 `<% ... %>`
pub const DEFAULT_EVALUATE: &str = r"<%([\s\S]+?)%>";

/// 默认插值定界符 `<%= ... %>`
pub const DEFAULT_INTERPOLATE: &str = r"<%=([\s\S]+?)%>";

/// 模板编译配置
///
/// 作为 compile 的参数显式传入, 不同配置的编译互不干扰.
/// 定界符正则的第一个捕获组为片段代码.
#[derive(Debug, Clone)]
pub struct TemplateSettings {
    pub evaluate: Regex,
    pub interpolate: Regex,
    /// 数据上下文绑定的变量名
    ///
    /// 未设置时, 上下文的键直接作为标识符可见.
    pub variable: Option<String>,
}

impl TemplateSettings {
    /// 从定界符正则创建配置
    pub fn new(evaluate: &str, interpolate: &str) -> Result<Self> {
        Ok(Self {
            evaluate: Regex::new(evaluate)?,
            interpolate: Regex::new(interpolate)?,
            variable: None,
        })
    }

    /// 设置上下文变量名
    pub fn variable(mut self, name: impl Into<String>) -> Self {
        self.variable = Some(name.into());
        self
    }

    /// 生成函数的参数名
    pub fn parameter(&self) -> &str {
        self.variable.as_deref().unwrap_or("obj")
    }
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            evaluate: Regex::new(DEFAULT_EVALUATE).unwrap(),
            interpolate: Regex::new(DEFAULT_INTERPOLATE).unwrap(),
            variable: None,
        }
    }
}
