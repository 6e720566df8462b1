// ABOUTME: llm-ask - sends one prompt plus optional files to a chosen backend.
// ABOUTME: Echoes the effective configuration, then prints the answer.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use tracing::{debug, warn};

use llm_handler::attachment;
use llm_handler::prelude::*;

#[derive(Parser, Debug)]
#[command(
    name = "llm-ask",
    version,
    about = "Ask Ollama, OpenAI or Gemini one question",
    group(ArgGroup::new("prompt_source").required(true).args(["prompt", "prompt_file"]))
)]
struct Cli {
    /// Backend to use: ollama, openai or gemini
    #[arg(short, long, default_value = "ollama")]
    backend: String,

    /// Model to use (overrides the environment)
    #[arg(short, long)]
    model: Option<String>,

    /// Ollama server address
    #[arg(long)]
    host: Option<String>,

    /// Prompt text
    #[arg(short, long)]
    prompt: Option<String>,

    /// Read the prompt from a file
    #[arg(short = 'P', long)]
    prompt_file: Option<PathBuf>,

    /// File to attach; repeat for more
    #[arg(short = 'f', long = "file")]
    files: Vec<PathBuf>,

    /// Sampling temperature
    #[arg(short, long)]
    temperature: Option<f64>,

    /// Upper bound on generated tokens
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Stream from the backend; the answer is printed once complete
    #[arg(short, long)]
    stream: bool,

    /// Also write the answer to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn prompt_text(&self) -> Result<String> {
        match (&self.prompt, &self.prompt_file) {
            (Some(prompt), _) => Ok(prompt.clone()),
            (None, Some(path)) => {
                let bytes = attachment::read_bytes(path)
                    .with_context(|| format!("reading prompt file {}", path.display()))?;
                Ok(attachment::decode_text(bytes))
            }
            (None, None) => anyhow::bail!("either --prompt or --prompt-file is required"),
        }
    }

    fn answer_request(&self) -> Result<AnswerRequest> {
        let mut req = AnswerRequest::new(self.prompt_text()?)
            .attach_all(self.files.iter())
            .stream(self.stream);
        req.temperature = self.temperature;
        req.max_tokens = self.max_tokens;
        req.output = self.output.clone();
        Ok(req)
    }
}

/// A missing `.env` is normal; anything else is worth reporting.
fn dotenv_problem(result: dotenvy::Result<PathBuf>) -> Option<dotenvy::Error> {
    match result {
        Ok(_) => None,
        Err(err) if err.not_found() => None,
        Err(err) => Some(err),
    }
}

fn show(value: Option<impl std::fmt::Display>) -> String {
    value.map_or_else(|| "(default)".to_string(), |v| v.to_string())
}

/// Human-readable echo of what is about to be sent.
fn describe(handler: &LlmHandler, req: &AnswerRequest) -> String {
    let config = handler.config();
    let mut lines = vec![
        format!("Backend:     {}", config.kind),
        format!("Model:       {}", config.model),
    ];
    if let Some(host) = &config.host {
        lines.push(format!("Host:        {}", host));
    }
    if req.attachments.is_empty() {
        lines.push("Attachments: (none)".to_string());
    } else {
        let names: Vec<_> = req
            .attachments
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        lines.push(format!("Attachments: {}", names.join(", ")));
    }
    lines.push(format!("Temperature: {}", show(req.temperature)));
    lines.push(format!("Max tokens:  {}", show(req.max_tokens)));
    lines.push(format!("Stream:      {}", req.stream));
    if let Some(out) = &req.output {
        lines.push(format!("Output:      {}", out.display()));
    }
    lines.join("\n")
}

async fn run(cli: Cli) -> Result<()> {
    let handler = LlmHandler::new(&cli.backend, cli.model.as_deref(), cli.host.as_deref())?;
    let req = cli.answer_request()?;
    debug!(
        backend = %handler.kind(),
        model = handler.model(),
        attachments = req.attachments.len(),
        stream = req.stream,
        "Effective configuration"
    );

    println!("{}\n", describe(&handler, &req));

    let answer = handler.get_answer(&req).await?;
    println!("{}", answer);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present; its values win over the process environment.
    // Loaded before the subscriber so RUST_LOG can come from the file.
    let dotenv = dotenvy::dotenv_override();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    if let Some(err) = dotenv_problem(dotenv) {
        warn!(error = %err, "Ignoring unreadable .env file");
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
