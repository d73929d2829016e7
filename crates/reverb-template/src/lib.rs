//! 微模板
//!
//! 将 `<%= ... %>` 插值与 `<% ... %>` 求值片段组成的模板编译为 Template,
//! 再以 JSON 数据上下文渲染为字符串.
//!
//! 片段代码为 JavaScript 的一个子集, 编译时解析为语法树, 渲染时解释执行.

mod ast;
mod builtins;
mod error;
mod escape;
mod interpreter;
mod lexer;
mod parser;
mod scope;
mod segment;
mod settings;
mod source;
mod template;
mod value;

pub use error::*;
pub use escape::{escape, unescape};
pub use settings::{DEFAULT_EVALUATE, DEFAULT_INTERPOLATE, TemplateSettings};
pub use template::Template;

/// 编译模板
pub fn compile(template: &str, settings: &TemplateSettings) -> Result<Template> {
    Template::new(template, settings)
}

/// 编译并渲染一次
pub fn render(
    template: &str,
    data: &serde_json::Value,
    settings: &TemplateSettings,
) -> Result<String> {
    compile(template, settings)?.render(data)
}
