use std::path::PathBuf;

use amdbundle::{config::Config, orchestrator::BundleOrchestrator};
use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, info};

/// Bundle AMD modules and generate RequireJS path overrides
#[derive(Parser, Debug)]
#[command(name = "amdbundle", author, version, about)]
struct Cli {
    /// Web project root
    #[arg(long)]
    project: Option<PathBuf>,

    /// Output root for bundle files (defaults to the project)
    #[arg(long)]
    package: Option<PathBuf>,

    /// Script root that module ids are relative to (defaults to <project>/Scripts)
    #[arg(long)]
    entry_point: Option<PathBuf>,

    /// RequireJS declaration file, relative to the project; may be repeated
    #[arg(long = "require-config", value_name = "FILE")]
    require_configs: Vec<PathBuf>,

    /// Settings file to load on top of the user and project settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only write the override files, not the concatenated bundles
    #[arg(long)]
    no_emit: bool,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if let Some(project) = self.project {
            config.project_path = project;
        }
        if self.package.is_some() {
            config.package_path = self.package;
        }
        if self.entry_point.is_some() {
            config.entry_point = self.entry_point;
        }
        if !self.require_configs.is_empty() {
            config.require_configs = self.require_configs;
        }
        if self.no_emit {
            config.emit_bundles = false;
        }
    }
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::new();
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    } else {
        let level = match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        builder.filter_level(level);
    }
    builder.format_timestamp(None).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    let bundles = BundleOrchestrator::new(config).run()?;
    info!("Done: {} bundle(s)", bundles.len());

    Ok(())
}
