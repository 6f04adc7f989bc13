//! vxcagent entry point.
//!
//! Offline tooling around the reconciler: computes circuit and
//! routing-policy plans from two documents and checks configuration files.
//! Nothing here talks to the provisioning service.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use vxc_types::AttachmentCategory;
use vxcagent::audit::{init_logging, init_logging_pretty};
use vxcagent::circuit::{reconcile, Circuit};
use vxcagent::config::{AgentConfig, LogFormat};
use vxcagent::policy::{plan_sync, validate_collection, RoutingPolicyList};
use vxcagent::{error_log, info_log};

/// Virtual circuit reconciler
#[derive(Parser, Debug)]
#[command(name = "vxcagent")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Agent configuration file (YAML)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the configuration
    #[arg(short = 'l', long, global = true)]
    log_level: Option<String>,

    /// Human-readable logs instead of JSON
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the reconciliation plan between two circuit documents
    Plan {
        /// Tracked circuit (YAML or JSON)
        #[arg(long)]
        previous: PathBuf,

        /// Desired circuit (YAML or JSON)
        #[arg(long)]
        desired: PathBuf,

        /// Attachment category of the A-End
        #[arg(long, default_value = "unknown")]
        a_category: AttachmentCategory,

        /// Attachment category of the B-End
        #[arg(long, default_value = "unknown")]
        b_category: AttachmentCategory,
    },

    /// Print the create/update/delete plan between two routing-policy list documents
    PolicyPlan {
        /// Tracked lists (YAML or JSON sequence)
        #[arg(long)]
        previous: PathBuf,

        /// Desired lists (YAML or JSON sequence)
        #[arg(long)]
        desired: PathBuf,
    },

    /// Validate the configuration file given with --config
    CheckConfig,
}

fn load_document<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn run(args: &Args, config: &AgentConfig) -> anyhow::Result<()> {
    match &args.command {
        Command::Plan {
            previous,
            desired,
            a_category,
            b_category,
        } => {
            let previous: Circuit = load_document(previous)?;
            let desired: Circuit = load_document(desired)?;
            let plan = reconcile(&previous, &desired, *a_category, *b_category)?;
            for notice in plan.notices() {
                info_log!("vxcagent", notice = %notice, "provider-managed value");
            }
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::PolicyPlan { previous, desired } => {
            let previous: Vec<RoutingPolicyList> = load_document(previous)?;
            let desired: Vec<RoutingPolicyList> = load_document(desired)?;
            validate_collection(&desired)?;
            let plan = plan_sync(&previous, &desired);
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::CheckConfig => {
            if args.config.is_none() {
                bail!("check-config needs --config <file>");
            }
            println!("{}", serde_yaml::to_string(config)?);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match AgentConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("vxcagent: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => AgentConfig::default(),
    };

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    if args.pretty || config.logging.format == LogFormat::Pretty {
        init_logging_pretty(&level);
    } else {
        init_logging(&level);
    }

    match run(&args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error_log!("vxcagent", error = %format!("{:#}", e), "command failed");
            eprintln!("vxcagent: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
