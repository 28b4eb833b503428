use std::sync::Arc;

use eyre::Result;
use tracing_subscriber::EnvFilter;

use cadence_builder::{BuilderConfig, TemplateBuilder};
use cadence_client::HttpTemplateApi;

mod commands;
mod config;
mod terminal;

use config::LogFormat;

const DEFAULT_LOG_FILTER: &str = "info";

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let mut config = config::load_or_default()?;
    init_tracing(config.log_format);

    let api = HttpTemplateApi::new(
        &config.api_base_url,
        config.request_timeout(),
        config.api_token.clone(),
    )?;

    let lines = terminal::spawn_stdin();
    let builder = TemplateBuilder::new(
        Arc::new(api),
        Arc::new(terminal::TerminalConfirm::new(lines.clone())),
        BuilderConfig {
            request_timeout: config.request_timeout(),
            ..Default::default()
        },
    );
    let renderer = terminal::spawn_renderer(builder.subscribe());

    tracing::info!(api = %config.api_base_url, "cadence shell started");
    let frameworks = builder.load_frameworks().await;
    println!(
        "{} framework(s) available. Type 'help' for commands.",
        frameworks.len()
    );

    loop {
        terminal::show_prompt("> ");
        let Some(line) = terminal::next_line(&lines).await else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let command = match commands::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        match commands::execute(&builder, &mut config, command).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("error: {e}"),
        }
    }

    renderer.abort();
    Ok(())
}

fn init_tracing(format: LogFormat) {
    // Logs go to stderr; stdout belongs to the shell.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

/// `RUST_LOG` when it parses, otherwise [`DEFAULT_LOG_FILTER`].
fn log_filter(from_env: Option<String>) -> EnvFilter {
    from_env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}
