//! 命令行参数

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use reverb::models::DEFAULT_BASE_URL;

#[derive(Debug, Parser)]
#[command(name = "reverb-cli", version, about = "reverb 商品列表模板与嵌入工具")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// 以 JSON 数据渲染模板
    Render(RenderArgs),
    /// 输出模板生成的函数源码
    Source(SourceArgs),
    /// 向 HTML 页面嵌入商品列表
    Embed(EmbedArgs),
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// 模板文件
    pub template: PathBuf,
    /// JSON 数据文件, 缺省为空对象
    #[arg(short, long)]
    pub data: Option<PathBuf>,
    /// 数据上下文绑定的变量名
    #[arg(short, long)]
    pub variable: Option<String>,
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// 模板文件
    pub template: PathBuf,
    #[arg(short, long)]
    pub variable: Option<String>,
}

#[derive(Debug, Args)]
pub struct EmbedArgs {
    /// HTML 页面
    pub page: PathBuf,
    /// 输出文件, 缺省输出到标准输出
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[arg(long, env = "REVERB_API_URL", default_value = DEFAULT_BASE_URL)]
    pub api_url: String,
    #[arg(long, env = "REVERB_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,
}
