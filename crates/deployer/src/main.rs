//! IUDX Platform Deployer CLI.
//!
//! Checks node readiness, installs Rancher, deploys the IUDX components and
//! keeps an eye on the platform health endpoint.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use iudx_deployer::{logging, ui, Deployer, DeploymentConfig};

/// IUDX Platform - Rancher/Kubernetes deployment orchestrator.
#[derive(Parser)]
#[command(
    name = "iudx-deploy",
    version,
    about = "Deploy the IUDX platform onto a Rancher-managed Kubernetes cluster"
)]
#[command(propagate_version = true)]
struct Cli {
    /// Deployment configuration file.
    #[arg(short, long, global = true, env = "DEPLOY_CONFIG", default_value = "deploy.yaml")]
    config: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also append logs to this file.
    #[arg(long, global = true, env = "DEPLOY_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full deployment.
    ///
    /// Checks readiness, validates configuration, installs the platform and
    /// every component, starts health monitoring and reports final status.
    ///
    /// The health monitor keeps polling after the summary until Ctrl-C.
    Deploy {
        /// Exit right after the summary instead of monitoring.
        #[arg(long)]
        no_watch: bool,
    },

    /// Print the live status of the platform and every component.
    Status,

    /// Run the node readiness gate only.
    Check,

    /// Validate the configuration file only.
    Validate,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.verbose, cli.log_file.as_deref())?;

    let config = DeploymentConfig::from_file(&cli.config)?;

    let ok = match cli.command {
        Commands::Deploy { no_watch } => deploy(config, !no_watch).await?,
        Commands::Status => status(config).await,
        Commands::Check => check(config).await,
        Commands::Validate => validate(&config),
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn deploy(config: DeploymentConfig, watch: bool) -> Result<bool> {
    ui::print_banner();
    let mut deployer = Deployer::new(config);
    let ok = deployer.deploy().await;

    ui::print_section("Deployment Summary");
    ui::print_stage(deployer.stage());
    ui::print_component_results(deployer.results());
    if let Some(status) = deployer.status() {
        println!();
        ui::print_status(status);
    }
    println!();
    if ok {
        ui::print_success("IUDX deployment successful");
    } else {
        ui::print_error("IUDX deployment failed");
    }

    if watch {
        if let Some(monitor) = deployer.take_monitor() {
            ui::print_info("Monitoring health endpoint. Press Ctrl-C to stop.");
            tokio::signal::ctrl_c().await?;
            info!("Shutting down monitor");
            monitor.shutdown().await;
            return Ok(ok);
        }
        ui::print_warning("Monitoring was not started; nothing to watch");
    }

    deployer.shutdown().await;
    Ok(ok)
}

async fn status(config: DeploymentConfig) -> bool {
    let mut deployer = Deployer::new(config);
    if !deployer.validate_config() {
        ui::print_error("Configuration is invalid");
        return false;
    }
    let status = deployer.get_status().await;
    let verdict = iudx_deployer::strict_running_verdict(&status);

    ui::print_section("Component Status");
    ui::print_status(&status);
    println!();
    ui::print_check_result("All components Running", verdict, None);
    verdict
}

async fn check(config: DeploymentConfig) -> bool {
    let deployer = Deployer::new(config);
    let ready = deployer.check_readiness().await;
    ui::print_check_result("Node readiness", ready, None);
    ready
}

fn validate(config: &DeploymentConfig) -> bool {
    match config.validate() {
        Ok(()) => {
            ui::print_success("Configuration is valid");
            ui::print_kv("Components", &config.components().len().to_string());
            ui::print_kv("Monitoring", &config.monitoring().endpoint);
            true
        }
        Err(e) => {
            ui::print_error(&e.to_string());
            false
        }
    }
}
