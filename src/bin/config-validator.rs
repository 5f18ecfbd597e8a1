//! # Changeflow Configuration Validator
//!
//! Command-line tool for validating engine configuration files across
//! environments. Catches configuration problems before the engine starts
//! consuming tenant queues.

use anyhow::{bail, Context, Result};
use changeflow_core::config::{ChangeflowConfig, ConfigManager};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate Changeflow engine configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment overlay to apply (development, test, production)
    #[arg(short, long, default_value = "development")]
    environment: String,

    /// Base configuration file (default: config/changeflow.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the whole configuration
    All,

    /// Validate one configuration section
    Component {
        /// Section name (engine, storage, queue, timeouts, backoff, meeting, tenants)
        name: String,
    },

    /// Print the effective configuration with credentials masked
    Show,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::All) | None => validate_all_config(&cli),
        Some(Commands::Component { name }) => validate_component(&cli, name),
        Some(Commands::Show) => show_config(&cli),
    };

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {:#}", e);
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn config_path(cli: &Cli) -> PathBuf {
    cli.config
        .clone()
        .or_else(|| std::env::var("CHANGEFLOW_CONFIG_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config/changeflow.toml"))
}

fn load(cli: &Cli) -> Result<std::sync::Arc<ConfigManager>> {
    let path = config_path(cli);
    ConfigManager::load_from_path_with_env(&path, &cli.environment)
        .with_context(|| format!("loading {} ({})", path.display(), cli.environment))
}

fn validate_all_config(cli: &Cli) -> Result<()> {
    println!("🔧 Validating Changeflow Configuration");
    println!("Environment: {}", cli.environment);
    println!("Config File: {}", config_path(cli).display());
    println!();

    let manager = load(cli)?;
    let config = manager.config();
    println!("✅ Configuration loaded and validated");

    validate_engine_config(config)?;
    validate_storage_config(config)?;
    validate_queue_config(config)?;
    validate_timeout_config(config)?;
    validate_backoff_config(config)?;
    validate_meeting_config(config)?;
    validate_tenants_config(config)?;

    println!("\n🎉 All configuration validation checks passed!");
    Ok(())
}

fn validate_component(cli: &Cli, component_name: &str) -> Result<()> {
    println!("🔧 Validating Component: {component_name}");
    let manager = load(cli)?;
    let config = manager.config();

    match component_name.to_lowercase().as_str() {
        "engine" => validate_engine_config(config)?,
        "storage" => validate_storage_config(config)?,
        "queue" | "queues" => validate_queue_config(config)?,
        "timeouts" => validate_timeout_config(config)?,
        "backoff" => validate_backoff_config(config)?,
        "meeting" | "meetings" => validate_meeting_config(config)?,
        "tenants" => validate_tenants_config(config)?,
        _ => bail!("Unknown component: {component_name}"),
    }

    println!("✅ Component '{component_name}' validation passed!");
    Ok(())
}

fn show_config(cli: &Cli) -> Result<()> {
    let manager = load(cli)?;
    let rendered = serde_json::to_string_pretty(&manager.debug_config())
        .context("rendering configuration")?;
    println!("{rendered}");
    Ok(())
}

fn validate_engine_config(config: &ChangeflowConfig) -> Result<()> {
    println!("⚙️  Validating Engine Configuration...");
    for identity in &config.engine.identities {
        println!("   ✅ Engine identity: {identity}");
    }
    println!("   ✅ System actor: {}", config.engine.system_actor);
    println!(
        "   ✅ Max concurrent reconciliations per tenant: {}",
        config.engine.max_concurrent_reconciliations
    );
    Ok(())
}

fn validate_storage_config(config: &ChangeflowConfig) -> Result<()> {
    println!("🗄️  Validating Storage Configuration...");
    println!("   ✅ Archive prefix: {}", config.storage.archive_prefix);
    println!("   ✅ Trigger prefix: {}", config.storage.trigger_prefix);
    println!(
        "   ✅ Conditional write attempts: {}",
        config.storage.max_conditional_write_attempts
    );
    Ok(())
}

fn validate_queue_config(config: &ChangeflowConfig) -> Result<()> {
    println!("📬 Validating Queue Configuration...");
    let queue = &config.queue;
    println!(
        "   ✅ Batch size {}, visibility {}s, poll every {}ms",
        queue.batch_size, queue.visibility_timeout_seconds, queue.poll_interval_ms
    );
    println!("   ✅ Max receive count: {}", queue.max_receive_count);
    if queue.dead_letter_fatal_immediately {
        println!("   ℹ️  Non-retryable failures are dead-lettered immediately");
    }

    let worst_case_ms = config.timeouts.store_ms * 4
        + config.timeouts.notifier_ms
        + config.timeouts.meeting_ms * 2;
    if worst_case_ms / 1000 >= queue.visibility_timeout_seconds {
        println!(
            "   ⚠️  Visibility timeout ({}s) is shorter than a worst-case reconciliation (~{}s)",
            queue.visibility_timeout_seconds,
            worst_case_ms / 1000
        );
    }
    Ok(())
}

fn validate_timeout_config(config: &ChangeflowConfig) -> Result<()> {
    println!("⏱️  Validating Timeout Configuration...");
    let timeouts = &config.timeouts;
    println!(
        "   ✅ store {}ms, queue {}ms, notifier {}ms, meeting {}ms, feedback {}ms",
        timeouts.store_ms,
        timeouts.queue_ms,
        timeouts.notifier_ms,
        timeouts.meeting_ms,
        timeouts.feedback_ms
    );
    Ok(())
}

fn validate_backoff_config(config: &ChangeflowConfig) -> Result<()> {
    println!("🔄 Validating Backoff Configuration...");
    let backoff = &config.backoff;
    println!(
        "   ✅ {}ms → {}ms (x{})",
        backoff.initial_delay_ms, backoff.max_delay_ms, backoff.multiplier
    );
    Ok(())
}

fn validate_meeting_config(config: &ChangeflowConfig) -> Result<()> {
    println!("📅 Validating Meeting Configuration...");
    println!(
        "   ✅ Default duration: {} minutes",
        config.meeting.default_duration_minutes
    );
    match &config.meeting.organizer {
        Some(organizer) => println!("   ✅ Organizer: {organizer}"),
        None => println!("   ℹ️  No organizer configured (calendar default)"),
    }
    println!(
        "   {} Feedback surveys {}",
        if config.feedback.enabled { "✅" } else { "ℹ️ " },
        if config.feedback.enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

fn validate_tenants_config(config: &ChangeflowConfig) -> Result<()> {
    println!("🏢 Validating Tenant Configuration...");
    if config.tenants.is_empty() {
        bail!("No tenants configured; the engine would have nothing to consume");
    }
    for tenant in &config.tenants {
        let prefix = if tenant.topic_prefix.is_empty() {
            "<none>"
        } else {
            tenant.topic_prefix.as_str()
        };
        println!(
            "   ✅ {} → queue {}, topic prefix {}",
            tenant.code, tenant.queue_name, prefix
        );
        if tenant.recipient_list_id.is_none() {
            println!("      ⚠️  No recipient list configured for {}", tenant.code);
        }
    }
    Ok(())
}
