use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

mod actions;
mod assets;
mod config;
mod debug;
mod error;
mod input;
mod matcher;
mod poller;
mod screen;
#[cfg(test)]
mod testutil;
mod ui;

use crate::actions::{Action, Bot};
use crate::assets::PatternSet;
use crate::config::{BotConfig, DEFAULT_CONFIG_FILE};
use crate::input::EnigoPointer;
use crate::screen::MonitorCapturer;

#[derive(Parser)]
#[command(version, about = "Clicks through the daily menus of a mobile game", long_about = None)]
struct Cli {
    /// TOML file with thresholds, timeouts and pattern paths
    #[arg(long)]
    config: Option<PathBuf>,
    /// 0 = all monitors, 1.. = a single monitor
    #[arg(long)]
    monitor: Option<usize>,
    /// Minimum match score in [-1, 1]
    #[arg(long)]
    threshold: Option<f32>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Go back to the home screen
    Home,
    /// Click the skip button of a cutscene
    Skip,
    /// Skip a story scene through its menu
    SkipScene,
    /// Claim the free daily gacha pull
    Gacha,
    /// Send the team exploring
    Adventure,
    /// Start a dungeon run
    Dungeon,
    /// Home, gacha, adventure and dungeon in a row
    Daily,
    /// Find patterns on screen and save annotated screenshots
    Locate {
        /// Pattern names, every configured pattern when empty
        patterns: Vec<String>,
    },
}

impl Command {
    fn action(&self) -> Option<Action> {
        match self {
            Command::Home => Some(Action::Home),
            Command::Skip => Some(Action::Skip),
            Command::SkipScene => Some(Action::SkipScene),
            Command::Gacha => Some(Action::Gacha),
            Command::Adventure => Some(Action::Adventure),
            Command::Dungeon => Some(Action::Dungeon),
            Command::Daily => Some(Action::Daily),
            Command::Locate { .. } => None,
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<BotConfig> {
    let mut config = match &cli.config {
        Some(path) => BotConfig::load(path, true)?,
        None => BotConfig::load(&PathBuf::from(DEFAULT_CONFIG_FILE), false)?,
    };
    if let Some(monitor) = cli.monitor {
        config.monitor = monitor;
    }
    if let Some(threshold) = cli.threshold {
        config.threshold = threshold;
    }
    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = load_config(&cli)?;

    let names: Vec<String> = match (&cli.command, cli.command.action()) {
        (_, Some(action)) => action.patterns().into_iter().map(str::to_string).collect(),
        (Command::Locate { patterns }, None) if !patterns.is_empty() => patterns.clone(),
        _ => config.pattern_names().map(str::to_string).collect(),
    };
    let patterns = PatternSet::load(&config, names.iter().map(String::as_str))
        .context("failed to load patterns")?;
    if patterns.is_empty() {
        anyhow::bail!("no patterns to look for");
    }
    info!("Loaded {} pattern(s)", patterns.len());

    let pointer = EnigoPointer::new()?;
    let mut bot = Bot::new(
        MonitorCapturer::new(config.monitor),
        pointer,
        patterns,
        &config,
    );

    match cli.command.action() {
        Some(action) => {
            let done = bot.run(action)?;
            info!("'{}' {}", action, if done { "done" } else { "failed" });
            Ok(done)
        }
        None => {
            let located = debug::locate_patterns(&mut bot, &names, &config.debug_dir)?;
            for found in &located {
                info!(
                    "[{}] center {} -> '{}'",
                    found.name,
                    found.center,
                    found.snapshot.display()
                );
            }
            info!("Located {} of {} pattern(s)", located.len(), names.len());
            Ok(located.len() == names.len())
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::from(2)
        }
    }
}
