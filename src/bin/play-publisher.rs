//! Play Publisher CLI
//!
//! Publishes an APK or App Bundle to Google Play from a CI pipeline

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use play_publisher::{
    ConfigLoadOptions, ConfigLoader, GoogleServiceAccountAuth, KeyFormat, NotesPolicy,
    PlayPublisher, PublishReport, RequestOverrides, TaskConfig, build_http_client,
};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Google Play publishing task for CI pipelines
#[derive(Parser)]
#[command(name = "play-publisher")]
#[command(version)]
#[command(about = "Google Play publishing task for CI pipelines", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload the artifact, assign tracks and commit the edit
    Publish {
        #[command(flatten)]
        task: TaskArgs,
    },

    /// Validate the task and check every referenced file (no network)
    Check {
        #[command(flatten)]
        task: TaskArgs,
    },
}

/// Task fields; each flag overrides the task file
#[derive(Args)]
struct TaskArgs {
    /// Working directory (defaults to current directory)
    #[arg(value_name = "WORKING_DIR")]
    working_dir: Option<PathBuf>,

    /// Task file (defaults to ./.play-publisher.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Application name sent as user agent
    #[arg(long)]
    application_name: Option<String>,

    /// Package name (e.g. com.example.app)
    #[arg(short, long)]
    package_name: Option<String>,

    /// Service account JSON key file
    #[arg(long)]
    json_key_path: Option<String>,

    /// Legacy P12 key file (implies --key-format p12)
    #[arg(long)]
    p12_key_path: Option<String>,

    /// Service account email, required with a P12 key
    #[arg(long)]
    service_account_email: Option<String>,

    /// Key container format
    #[arg(long, value_enum)]
    key_format: Option<KeyFormat>,

    /// Path to the .apk or .aab
    #[arg(short, long)]
    apk_path: Option<String>,

    /// ProGuard/R8 mapping file
    #[arg(long)]
    deobfuscation_file_path: Option<String>,

    /// Release notes as "locale::path" entries separated by commas
    #[arg(long)]
    recent_changes_listings: Option<String>,

    /// Track (none, internal, alpha, beta, production, rollout, custom)
    #[arg(short, long)]
    track: Option<String>,

    /// User fraction for the rollout track (0 <= fraction < 1)
    #[arg(long)]
    rollout_fraction: Option<String>,

    /// Track names for the custom track, separated by commas
    #[arg(long)]
    track_custom_names: Option<String>,

    /// Skip malformed release notes entries instead of failing
    #[arg(long)]
    lenient_notes: bool,

    /// Connect and request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl TaskArgs {
    fn into_load_options(self) -> ConfigLoadOptions {
        let overrides = RequestOverrides {
            application_name: self.application_name,
            package_name: self.package_name,
            json_key_path: self.json_key_path,
            json_key_content: None,
            p12_key_path: self.p12_key_path,
            service_account_email: self.service_account_email,
            key_format: self.key_format,
            apk_path: self.apk_path,
            deobfuscation_file_path: self.deobfuscation_file_path,
            recent_changes_listings: self.recent_changes_listings,
            track: self.track,
            rollout_fraction: self.rollout_fraction,
            track_custom_names: self.track_custom_names,
            notes_policy: self.lenient_notes.then_some(NotesPolicy::Lenient),
            request_timeout_secs: self.timeout_secs,
        };

        ConfigLoadOptions {
            working_dir: self.working_dir.unwrap_or_else(|| PathBuf::from(".")),
            config_path: self.config,
            env: std::env::vars().collect(),
            overrides,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match run().await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Publish { task } => publish_command(task).await,
        Commands::Check { task } => check_command(task).await,
    }
}

async fn load_publisher(task: TaskArgs) -> Result<(PlayPublisher, TaskConfig)> {
    let load_options = task.into_load_options();
    let working_dir = load_options.working_dir.clone();
    let config = ConfigLoader::load(load_options).await?;

    let options = config.options();
    let http = build_http_client(options.request_timeout)?;
    let auth = GoogleServiceAccountAuth::new(http, options.clone());

    Ok((
        PlayPublisher::new(Box::new(auth), working_dir, options),
        config,
    ))
}

async fn publish_command(task: TaskArgs) -> Result<i32> {
    println!("\n📦 play-publisher\n");

    let (publisher, config) = load_publisher(task).await?;
    let report = publisher.publish(&config.request).await;

    if report.success {
        println!("\n✅ Publishing completed successfully!");
        println!("  Package:      {}", report.package_name);
        if let Some(version_code) = report.version_code {
            println!("  Version code: {}", version_code);
        }
        if !report.tracks.is_empty() {
            println!("  Tracks:       {}", report.tracks.join(", "));
        }
        println!("  Duration:     {}ms", report.duration);
        Ok(0)
    } else {
        println!("\n❌ Publishing failed");
        print_failure(&report);
        Ok(1)
    }
}

async fn check_command(task: TaskArgs) -> Result<i32> {
    println!("\n🔍 Task Check\n");

    let (publisher, config) = load_publisher(task).await?;
    let report = publisher.check(&config.request).await;

    if report.success {
        println!("\n✅ Ready to publish");
        Ok(0)
    } else {
        println!("\n❌ Check failed");
        print_failure(&report);
        Ok(1)
    }
}

fn print_failure(report: &PublishReport) {
    if let Some(operation) = &report.failed_operation {
        eprintln!("  Failed during: {}", operation);
    }

    for error in &report.errors {
        eprintln!("  - {}", error);
    }

    if !report.suggested_actions.is_empty() {
        eprintln!("\n💡 Suggested actions:");
        for action in &report.suggested_actions {
            eprintln!("  - {}", action);
        }
    }

    if !report.history.is_empty() {
        eprintln!("\nEdit session:");
        for line in report.history.lines() {
            eprintln!("  {}", line);
        }
    }
}
