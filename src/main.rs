//! 命令行入口
//!
//! 对保存下来的聊天页面快照运行完整的翻译管道，或做一次临时翻译。

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::task::LocalSet;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chat_translator::content::{notice_channel, Notice, Session};
use chat_translator::env::core::{LogLevel, NoColor};
use chat_translator::env::{generate_env_docs, EnvVar};
use chat_translator::page::LivePage;
use chat_translator::platform::{Platform, PlatformProfile};
use chat_translator::runtime::{BackgroundWorker, MyMemoryProvider, RuntimeChannel, SettingsStore};
use chat_translator::translation::config::{load_config, ConfigManager};
use chat_translator::translation::{TranslationClient, TranslationService, TranslatorConfig};

/// Chat Translator CLI
#[derive(Parser)]
#[command(name = "chat-translator")]
#[command(about = "Live translation overlays and outbound translation for web chat pages")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Write an example configuration file and exit
    #[arg(long, value_name = "PATH")]
    generate_config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate incoming messages of a saved chat page and print the annotated HTML
    Page {
        /// Saved HTML file
        file: PathBuf,

        /// Address the page was saved from, used to detect the platform
        #[arg(long)]
        url: String,

        /// Source language
        #[arg(long)]
        from: Option<String>,

        /// Target language
        #[arg(long)]
        to: Option<String>,

        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Translate a single text
    Text {
        text: String,

        #[arg(long)]
        from: Option<String>,

        #[arg(long)]
        to: Option<String>,
    },

    /// Show the detected platform and its locators for a page address
    Platform { url: String },

    /// List the environment variables that override the configuration
    Env,
}

fn init_tracing() {
    let level = LogLevel::get().unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    let ansi = !NoColor::get().unwrap_or(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(ansi),
        )
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = LocalSet::new().run_until(run(cli)).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = cli.generate_config.as_deref() {
        ConfigManager::generate_example_config(path)?;
        println!("Example configuration written to {}", path);
        return Ok(());
    }

    let Some(command) = cli.command else {
        println!("Nothing to do. Run with --help for usage.");
        return Ok(());
    };

    match command {
        Commands::Platform { url } => {
            let url = url::Url::parse(&url)?;
            let platform = Platform::detect(&url);
            let profile = PlatformProfile::for_platform(platform)?;
            println!("platform: {}", platform);
            println!("message list: {}", profile.message_list);
            println!("message item: {}", profile.message_item);
            println!("message text: {}", profile.message_text);
            println!("compose input: {}", profile.compose_input);
            println!("send control: {}", profile.send_control);
        }
        Commands::Env => print!("{}", generate_env_docs()),
        Commands::Text { text, from, to } => {
            let config = resolve_config(cli.config.as_deref(), from, to);
            let service = connect(&config)?;
            let (source, target) = config.defaults.language_pair();
            let result = service.translate(&text, &source, &target).await?;
            println!("{}", result.translated_text);
            tracing::info!(
                "{} -> {} (confidence {:.2})",
                result.detected_language,
                target,
                result.confidence
            );
        }
        Commands::Page {
            file,
            url,
            from,
            to,
            output,
        } => {
            let config = resolve_config(cli.config.as_deref(), from, to);
            let html = fs::read_to_string(&file)?;
            let page =
                LivePage::from_html(&html, &url).map_err(|e| e.with_context(file.display()))?;

            let service = connect(&config)?;
            let (notices, mut notice_rx) = notice_channel();
            let session = Session::new(page.clone(), service, &config, notices)?;
            session.initialize().await;

            while session.processor().pending() > 0 {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            session.shutdown();

            while let Ok(notice) = notice_rx.try_recv() {
                if let Notice::Message { level, message, .. } = notice {
                    eprintln!("[{:?}] {}", level, message);
                }
            }

            let annotated = page.to_html()?;
            match output {
                Some(path) => fs::write(path, annotated)?,
                None => println!("{}", annotated),
            }
        }
    }

    Ok(())
}

fn resolve_config(path: Option<&str>, from: Option<String>, to: Option<String>) -> TranslatorConfig {
    let mut config = load_config(path);
    if let Some(from) = from {
        config.defaults.source_language = from;
    }
    if let Some(to) = to {
        config.defaults.target_language = to;
    }
    config
}

// 启动后台工作者并建立页面一侧的翻译服务
fn connect(config: &TranslatorConfig) -> Result<TranslationService, Box<dyn std::error::Error>> {
    let provider = Arc::new(MyMemoryProvider::new(&config.service_endpoint)?);
    let store = SettingsStore::new(config.defaults.clone());
    let (channel, port) = RuntimeChannel::connect(config.request_timeout());
    let _worker = BackgroundWorker::new(provider, store).spawn(port);

    Ok(TranslationService::new(
        TranslationClient::new(channel),
        config.cache_capacity,
    ))
}
