//! reverb 命令行终端

mod cli;
mod utils;

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use reverb::{models::ApiOptionsBuilder, services::EmbeddedListings};
use reverb_template::{Template, TemplateSettings};
use serde_json::Value;

use crate::{cli::*, utils::*};

/// 进度指示刷新间隔
const SPINNER_TICK: Duration = Duration::from_millis(100);

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// 读取并编译模板文件
fn compile(path: &Path, variable: Option<String>) -> Result<Template> {
    let settings = match variable {
        Some(name) => TemplateSettings::default().variable(name),
        None => TemplateSettings::default(),
    };

    reverb_template::compile(&read(path)?, &settings)
        .with_context(|| format!("failed to compile {}", path.display()))
}

fn render(args: RenderArgs) -> Result<()> {
    let template = compile(&args.template, args.variable)?;
    let data = match &args.data {
        Some(path) => serde_json::from_str(&read(path)?)
            .with_context(|| format!("invalid json in {}", path.display()))?,
        None => Value::Null,
    };

    print!("{}", template.render(&data)?);
    flush! {};
    Ok(())
}

fn source(args: SourceArgs) -> Result<()> {
    println!("{}", compile(&args.template, args.variable)?.source());
    Ok(())
}

fn embed(args: EmbedArgs) -> Result<()> {
    let page = read(&args.page)?;

    let mut options = ApiOptionsBuilder::default();
    options.base_url(args.api_url);
    if let Some(token) = args.api_token {
        options.api_token(token);
    }
    let embedder = EmbeddedListings::from_options(&options.build()?)?;

    // 请求期间展示进度指示
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message("embedding...");
    pb.enable_steady_tick(SPINNER_TICK);

    let result = embedder.init(&page);
    pb.finish_and_clear();
    let (page, errors) = result?;

    match &args.output {
        Some(path) => {
            fs::write(path, page)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("written to {}", path.display());
        }
        None => print!("{page}"),
    }

    eprintln!("embedding completed, result: ");
    try_show_errors(&errors);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match Cli::parse().command {
        Commands::Render(args) => render(args),
        Commands::Source(args) => source(args),
        Commands::Embed(args) => embed(args),
    }
}
