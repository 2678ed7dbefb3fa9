//! webfaction_facts module
//!
//! Gathers applications, databases, domains and websites of a WebFaction
//! account and prints them as host facts.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use eyre::WrapErr;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;
use webfaction_facts::{FactsBundle, FactsGatherer};
use webfaction_xmlrpc::XmlRpcClient;

mod args;
mod config;
mod output;

use args::ModuleArgs;
use config::Config;
use output::ModuleResponse;

/// Gather facts from a WebFaction account
#[derive(Parser, Debug)]
#[command(name = "webfaction_facts", version, about)]
struct Cli {
    /// File holding the module arguments
    args_file: PathBuf,

    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let response = run(&cli).await;
    match serde_json::to_string(&response) {
        Ok(document) => println!("{document}"),
        Err(e) => {
            println!(r#"{{"failed": true, "changed": false, "msg": "failed to encode response"}}"#);
            error!(error = %e, "failed to encode response");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::from(response.exit_code())
}

async fn run(cli: &Cli) -> ModuleResponse {
    // stdout carries the response, so the report hook only matters for panics
    let _ = color_eyre::install();

    let config = match Config::load_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return ModuleResponse::failure(&format!("{e:#}"), &[]),
    };

    init_tracing(&config.log.level);

    let args = match args::load(&cli.args_file) {
        Ok(args) => args,
        Err(e) => return ModuleResponse::failure(&e.to_string(), &[]),
    };
    if args.check_mode {
        debug!("check mode requested; gathering is read-only");
    }

    let password = args.credentials.login_password.expose();
    match gather(&config, &args).await {
        Ok(bundle) => ModuleResponse::facts(bundle),
        Err(e) => ModuleResponse::failure(&format!("{e:#}"), &[password]),
    }
}

async fn gather(config: &Config, args: &ModuleArgs) -> eyre::Result<FactsBundle> {
    let http = reqwest::Client::builder()
        .timeout(config.api.timeout())
        .user_agent(config.api.user_agent.as_str())
        .build()
        .wrap_err("failed to build HTTP client")?;
    let client = XmlRpcClient::with_client(&config.api.url, http)
        .wrap_err_with(|| format!("invalid API endpoint {}", config.api.url))?;

    let gatherer = FactsGatherer::new(Arc::new(client));
    let bundle = gatherer.gather(&args.credentials).await?;
    Ok(bundle)
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
