use anyhow::{Context, Result};
use chatwidget::chat_api::{ChatClient, ChatConfig, ChatError};
use chatwidget::gui::{run_gui, GuiOptions};
use chatwidget::widget::{WidgetSlots, APOLOGY_TEXT, DEFAULT_GREETING, NETWORK_ERROR_TEXT};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Base URL of the chat backend
    #[arg(long, env = "CHATWIDGET_BASE_URL", default_value = "http://127.0.0.1:5000")]
    base_url: String,

    /// HTTP timeout in seconds
    #[arg(long, env = "CHATWIDGET_TIMEOUT_SECONDS", default_value_t = 60)]
    timeout_seconds: u64,

    /// Query sent silently the first time the chat window opens
    #[arg(long, env = "CHATWIDGET_GREETING", default_value = DEFAULT_GREETING)]
    greeting: String,

    /// Show bot replies as raw markdown instead of rendering them
    #[arg(long, default_value_t = false)]
    raw_markdown: bool,

    /// Where "Save transcript" writes the HTML transcript
    #[arg(long, env = "CHATWIDGET_TRANSCRIPT")]
    transcript: Option<PathBuf>,

    /// Force CLI mode (the window opens otherwise)
    #[arg(long, default_value_t = false)]
    cli: bool,

    /// Query to send once in CLI mode
    prompt: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = ChatConfig {
        base_url: args.base_url,
        timeout_seconds: args.timeout_seconds,
        ..ChatConfig::default()
    };

    if args.cli || args.prompt.is_some() {
        let prompt = args.prompt.unwrap_or_default();
        run_cli(config, &prompt)
    } else {
        run_gui(
            config,
            GuiOptions {
                greeting: args.greeting,
                raw_markdown: args.raw_markdown,
                transcript_path: args.transcript,
                slots: WidgetSlots::default(),
            },
        )
    }
}

fn run_cli(config: ChatConfig, prompt: &str) -> Result<()> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        anyhow::bail!("CLI mode needs a non-empty prompt");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot create the async runtime")?;
    let client = ChatClient::new(config)?;

    match runtime.block_on(client.chat(prompt)) {
        Ok(reply) => {
            println!("{}", reply.renderable_markdown());
            let buttons = reply.quick_replies();
            if !buttons.is_empty() {
                let line: Vec<String> = buttons.iter().map(|b| format!("[{b}]")).collect();
                println!("\n{}", line.join(" "));
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("{}", user_message(&err));
            Err(err).context("chat request failed")
        }
    }
}

fn user_message(err: &ChatError) -> &'static str {
    if err.is_network() {
        NETWORK_ERROR_TEXT
    } else {
        APOLOGY_TEXT
    }
}
