// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use xwalk_fetch::{
    logging, Arch, Channel, DependencyResolver, ErrorBuilder, Platform, ResolverConfig,
    ResolverError, LATEST,
};

/// Exit codes following sysexits.h conventions
mod exit_codes {
    /// Success - operation completed successfully
    pub const SUCCESS: i32 = 0;
    /// General error - unspecified error, or nothing found
    pub const ERROR: i32 = 1;
    /// Usage error - invalid channel name
    pub const USAGE: i32 = 64;
    /// Data error - malformed listing or unknown version
    pub const DATA_ERR: i32 = 65;
    /// Service unavailable - download server unreachable
    pub const SERVICE_UNAVAILABLE: i32 = 69;
    /// I/O error - destination not writable
    pub const IO_ERR: i32 = 74;
    /// Configuration error - unreadable config file
    pub const CONFIG: i32 = 78;
}

use exit_codes::*;

/// Progress bar helpers for downloads
mod progress {
    use indicatif::{ProgressBar, ProgressStyle};

    const STEPS: u64 = 1000;

    /// Create a download bar with consistent styling
    pub fn create(message: &str) -> ProgressBar {
        let bar = ProgressBar::new(STEPS);
        let style = ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {percent:>3}% ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.set_message(message.to_string());
        bar
    }

    /// Move the bar to a completion fraction in `[0, 1]`
    pub fn update(bar: &ProgressBar, fraction: f64) {
        bar.set_position((fraction * STEPS as f64).round() as u64);
    }
}

#[derive(Parser)]
#[command(name = "xwalk-fetch", version, about = "Resolve, download and cache Crosswalk runtime archives")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Target platform: android or windows
    #[arg(long, global = true, value_name = "PLATFORM")]
    platform: Option<Platform>,

    /// Target architecture: arm, x86, arm64, x86_64
    #[arg(long, global = true, value_name = "ARCH")]
    arch: Option<Arch>,

    /// Extra cache directory (overrides CROSSWALK_APP_TOOLS_CACHE_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Release listing root (defaults to the public download server)
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Verbose mode: log lookups and transfers to stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the versions published on a channel, oldest first
    ///
    /// Examples:
    ///   xwalk-fetch versions stable
    ///   xwalk-fetch versions canary --platform windows
    Versions {
        /// Channel: stable, beta or canary
        channel: String,
    },

    /// Download a runtime archive unless a copy already exists
    ///
    /// Examples:
    ///   xwalk-fetch download stable
    ///   xwalk-fetch download beta 15.44.384.9 --dir ./vendor
    Download {
        /// Channel: stable, beta or canary
        channel: String,
        /// Version to fetch, or "latest"
        #[arg(default_value = LATEST)]
        version: String,
        /// Destination directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Print the local archive for a version (working dir, then parent)
    ///
    /// Example:
    ///   xwalk-fetch locate 14.44.360.4
    Locate {
        version: String,
    },

    /// Print the first channel that publishes a version
    ///
    /// Example:
    ///   xwalk-fetch channel 15.44.384.9
    Channel {
        version: String,
    },
}

fn build_config(cli: &Cli) -> Result<ResolverConfig> {
    let mut config = ResolverConfig::load().context("Failed to load configuration")?;

    if let Some(platform) = cli.platform {
        config.platform = platform;
    }
    if let Some(arch) = cli.arch {
        config.arch = arch;
    }
    if let Some(dir) = &cli.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    if let Some(url) = &cli.base_url {
        config.base_url = Some(url.clone());
    }

    Ok(config)
}

fn run(cli: Cli) -> Result<i32> {
    let config = build_config(&cli)?;

    match cli.command {
        Commands::Versions { channel } => {
            let resolver = DependencyResolver::new(&channel, config)?;
            let index = resolver.fetch_versions(resolver.channel())?;
            for version in index.iter() {
                println!("{}", version);
            }
        }
        Commands::Download { channel, version, dir } => {
            let resolver = DependencyResolver::new(&channel, config)?;
            let channel = resolver.channel();
            let version = resolver.resolve_version(channel, &version)?;

            let bar = progress::create(&resolver.artifact_file_name(&version));
            let entry = resolver.download_entry(channel, &version, &dir, |fraction| {
                progress::update(&bar, fraction);
            });
            bar.finish_and_clear();
            let entry = entry?;

            let note = if entry.was_downloaded() { "downloaded" } else { "already present" };
            eprintln!("{} {} {} ({})", "[OK]".green(), channel, version, note);
            println!("{}", entry.path.display());
        }
        Commands::Locate { version } => {
            let resolver = DependencyResolver::new(Channel::default().as_str(), config)?;
            match resolver.find_locally(&version) {
                Some(path) => println!("{}", path.display()),
                None => {
                    eprintln!(
                        "{} {} not found in the working directory or its parent",
                        "[!]".yellow(),
                        resolver.artifact_file_name(&version)
                    );
                    return Ok(ERROR);
                }
            }
        }
        Commands::Channel { version } => {
            let resolver = DependencyResolver::new(Channel::default().as_str(), config)?;
            println!("{}", resolver.find_channel(&version)?);
        }
    }

    Ok(SUCCESS)
}

fn exit_code_for(err: &ResolverError) -> i32 {
    match err {
        ResolverError::InvalidChannel(_) => USAGE,
        ResolverError::ParseError(_) | ResolverError::UnknownVersion(_) => DATA_ERR,
        ResolverError::NetworkError(_) => SERVICE_UNAVAILABLE,
        ResolverError::FileCreationFailed { .. } => IO_ERR,
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{} {}", "[!]".yellow(), e);
    }

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => match e.downcast_ref::<ResolverError>() {
            Some(err) => {
                tracing::debug!("{:?}", err);
                eprintln!("{}", err.report().red());
                exit_code_for(err)
            }
            None => {
                eprintln!("{}", ErrorBuilder::new(format!("{:#}", e)).build().red());
                CONFIG
            }
        },
    };

    std::process::exit(code);
}
