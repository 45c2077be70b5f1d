//! Clipsense CLI
//!
//! 监控系统剪贴板，调用 Gemini 做分类与摘要，结果以桌面通知呈现

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use clipsense::{app, config, AppConfig, ModelPriorityList};

#[derive(Parser)]
#[command(name = "clipsense")]
#[command(about = "Clipsense - clipboard watcher with AI classification")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// 启动剪贴板监控流水线（默认命令）
    Run {
        /// 使用控制台控制面而非系统托盘
        #[arg(long)]
        console: bool,
    },
    /// 对指定文本做一次性分类（诊断用）
    Analyze {
        /// 待分类文本
        text: String,
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 显示解析后的模型优先级列表
    Models,
}

fn main() -> Result<()> {
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug clipsense run
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("clipsense=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run { console: false }) {
        Commands::Run { console } => {
            let config = AppConfig::auto_load()?;
            app::run(config, console)?;
        }
        Commands::Analyze { text, json } => {
            let config = AppConfig::auto_load()?;
            let result = app::analyze_once(&config, &text)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("[{}] {}", result.classification, result.summary);
                println!("model: {}", result.model);
            }
        }
        Commands::Models => {
            let models = ModelPriorityList::new(config::load_model_override().as_deref());
            for model in models.iter() {
                println!("{}", model);
            }
        }
    }

    Ok(())
}
