//! `taxdesk`: ask the tax assistant a question, or follow an existing chat,
//! and watch the answer arrive in the terminal.
//!
//! The bearer token is read from the environment variable named by
//! `token_env_var` in the config file (`TAXDESK_TOKEN` by default).

mod app;
mod config;
mod logging;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use taxdesk_core::{ChatPhase, JobId};
use taxdesk_engine::AtomicFileWriter;
use taxdesk_logging::{desk_error, desk_info};

use crate::app::Request;
use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "taxdesk")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file (RON). Defaults to ./taxdesk.ron when present
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Base URL of the chat API, e.g. https://desk.example.com/api
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    /// Write the finished answer to <DIR>/<chat-id>.md
    #[arg(short, long, global = true, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Print the answer at once instead of typing it out
    #[arg(long, global = true)]
    no_animate: bool,

    /// Keep waiting this many more times when the answer takes too long
    #[arg(long, global = true, default_value_t = 0)]
    retries: u32,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a new question and wait for the answer
    Ask {
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Follow an existing chat until it has an answer
    Watch { chat_id: String },
}

impl Args {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(url) = &self.api_url {
            config.api_base_url = url.clone();
        }
        if let Some(dir) = &self.output {
            config.output_dir = Some(dir.clone());
        }
        if self.no_animate {
            config.animate = false;
        }
    }

    fn request(&self) -> anyhow::Result<Request> {
        Ok(match &self.command {
            Command::Ask { question } => Request::Ask(question.join(" ")),
            Command::Watch { chat_id } => Request::Watch(JobId::new(chat_id.as_str())?),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    logging::initialize(config.log_destination, args.debug);
    desk_info!("taxdesk {} starting", env!("CARGO_PKG_VERSION"));

    let request = args.request()?;
    let outcome = app::run(request, &config, args.retries).await?;

    if let Some(dir) = &config.output_dir {
        let writer = AtomicFileWriter::new(dir.clone());
        if let Some(path) = app::save_transcript(&outcome, &writer)? {
            eprintln!("Saved {}", path.display());
        }
    }

    Ok(match outcome.phase {
        ChatPhase::Done => ExitCode::SUCCESS,
        ChatPhase::TimedOut => ExitCode::from(2),
        other => {
            desk_error!("run ended as {:?}", other);
            ExitCode::FAILURE
        }
    })
}
