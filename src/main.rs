mod cli;

use chatdriver_lib::browser_ai::CdpClient;
use chatdriver_lib::config::{Config, SelectorsConfig};
use chatdriver_lib::conversation::{ask, RunDriver};
use chatdriver_lib::error::{AppError, Result};
use chatdriver_lib::models::{preview, RunReport, TurnStatus};
use chatdriver_lib::prompts::load_prompts;
use chatdriver_lib::storage::TurnStore;
use clap::Parser;
use cli::{AskArgs, Cli, Commands, RunArgs, SelectorsArgs};
use std::collections::BTreeMap;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; stdout is reserved for output meant for the caller.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info,chatdriver=debug,chatdriver_lib=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn execute(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    match cli.command {
        Commands::Selectors(args) => print_selectors(config, args),
        Commands::Run(args) => {
            check(&config)?;
            run_prompts(&config, args).await
        }
        Commands::Ask(args) => {
            check(&config)?;
            ask_from_stdin(config, args).await
        }
    }
}

fn check(config: &Config) -> Result<()> {
    if let Err(errors) = config.validate() {
        for error in &errors {
            tracing::error!("config: {}", error);
        }
        return Err(AppError::Configuration(errors.join("; ")));
    }
    Ok(())
}

async fn run_prompts(config: &Config, args: RunArgs) -> Result<ExitCode> {
    let mut prompts = match &args.prompts {
        Some(path) => load_prompts(path)?,
        None => Vec::new(),
    };
    prompts.extend(
        args.prompt
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
    );
    if prompts.is_empty() {
        return Err(AppError::InvalidInput(
            "no prompts: pass --prompts FILE or --prompt TEXT".into(),
        ));
    }

    let selectors = config.selectors.resolve()?;
    let store = TurnStore::new(&config.output.dir)?;
    let client = CdpClient::connect(&config.connection.debug_url, config.timing.reload_timeout()).await?;

    let mut driver = RunDriver::new(config, &selectors, &store);
    let report = driver.run(&client, &prompts).await;
    client.disconnect();

    print_report(&report, config.output.preview_chars);
    Ok(if report.is_done() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn ask_from_stdin(mut config: Config, args: AskArgs) -> Result<ExitCode> {
    let mut prompt = String::new();
    tokio::io::stdin().read_to_string(&mut prompt).await?;

    config.page.start_new_chat = args.new_chat || !args.keep_chat;
    let selectors = config.selectors.resolve()?;
    let client = CdpClient::connect(&config.connection.debug_url, config.timing.reload_timeout()).await?;

    let result = ask(&client, &config, &selectors, &prompt).await;
    client.disconnect();

    println!("{}", result?);
    Ok(ExitCode::SUCCESS)
}

fn print_selectors(mut config: Config, args: SelectorsArgs) -> Result<ExitCode> {
    if let Some(version) = args.version {
        config.selectors.version = version;
    }
    let set = config.selectors.resolve()?;

    let version = config.selectors.version.clone();
    let mut sets = BTreeMap::new();
    sets.insert(version.clone(), set);
    let mut document = BTreeMap::new();
    document.insert("selectors", SelectorsConfig { version, sets });

    let text = toml::to_string_pretty(&document)
        .map_err(|e| AppError::Configuration(format!("Failed to render selectors: {}", e)))?;
    print!("{}", text);
    Ok(ExitCode::SUCCESS)
}

fn print_report(report: &RunReport, preview_chars: usize) {
    for turn in &report.turns {
        let status = match &turn.status {
            TurnStatus::Pending => "pending".to_string(),
            TurnStatus::Completed => "ok".to_string(),
            TurnStatus::InputNotReady(detail) => format!("input not ready: {}", detail),
            TurnStatus::TimedOut => "timed out".to_string(),
            TurnStatus::Failed(detail) => format!("failed: {}", detail),
        };
        println!("Turn {} [{}]", turn.index, status);
        if let Some(response) = &turn.response {
            println!("{}", preview(response, preview_chars));
        }
        if let Some(path) = &turn.artifact_path {
            println!("Artifact: {}", path.display());
        }
        println!();
    }
    println!(
        "{} of {} turns completed, {}",
        report.completed_turns(),
        report.turns.len(),
        report.final_state
    );
}
