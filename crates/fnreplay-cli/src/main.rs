//! fnreplay - Print match results decoded from a Fortnite .replay file
//!
//! Usage:
//!   fnreplay <replay_file>            - Show stats, team placement and eliminations
//!   fnreplay <replay_file> --json     - Dump the whole decoded replay as JSON
//!   fnreplay <replay_file> -v         - Also log decoder warnings (-vv for debug)

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::path::{Path, PathBuf};

use fnreplay::{format_size, format_time, ParseOptions, ParsedReplay};

#[derive(Parser)]
#[command(name = "fnreplay")]
#[command(version = "0.1.0")]
#[command(about = "Decode Fortnite replay files", long_about = None)]
struct Cli {
    /// Path to the .replay file
    replay_file: PathBuf,

    /// Print the decoded replay as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v warnings, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Stop after this many chunks
    #[arg(long)]
    max_chunks: Option<usize>,

    /// Stop reading past this many bytes
    #[arg(long)]
    max_bytes: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut options = ParseOptions::new();
    if let Some(max) = cli.max_chunks {
        options = options.with_max_chunks(max);
    }
    if let Some(max) = cli.max_bytes {
        options = options.with_max_bytes(max);
    }

    let replay = open_replay(&cli.replay_file, &options)?;

    if cli.json {
        let json = serde_json::to_string_pretty(&replay).context("Failed to serialize replay")?;
        println!("{}", json);
    } else {
        print_summary(&cli.replay_file, &replay);
    }

    Ok(())
}

fn open_replay(path: &Path, options: &ParseOptions) -> Result<ParsedReplay> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    fnreplay::open_with_options(file, options)
        .with_context(|| format!("Failed to decode {}", path.display()))
}

fn print_summary(path: &Path, replay: &ParsedReplay) {
    let header = replay.header();

    println!("Replay Information:");
    println!("  File: {}", path.display());
    println!("  Name: {}", header.friendly_name);
    println!("  Length: {}", format_time(header.length_in_ms));
    println!("  File version: {}", header.file_version);
    println!("  Network version: {}", header.network_version);
    if let Some(game) = replay.game_header() {
        println!("  Branch: {}", game.branch);
        println!(
            "  Engine: {}.{}.{} (CL {})",
            game.major, game.minor, game.patch, game.changelist
        );
    }
    println!(
        "  Flags: {}{}{}",
        if header.is_compressed() { "compressed " } else { "" },
        if header.is_encrypted() { "encrypted " } else { "" },
        if header.is_live() { "live" } else { "" }
    );

    if let Some(stats) = replay.stats() {
        println!();
        println!("Match Stats:");
        println!("  Eliminations: {}", stats.eliminations);
        println!("  Assists: {}", stats.assists);
        println!("  Accuracy: {}%", stats.accuracy_percent());
        println!("  Damage dealt: {}", stats.weapon_damage);
        println!("  Damage to others: {}", stats.other_damage);
        println!("  Damage taken: {}", stats.damage_taken);
        println!("  Damage to structures: {}", stats.damage_structures);
        println!("  Revives: {}", stats.revives);
        println!("  Materials gathered: {}", stats.materials_gathered);
        println!("  Materials used: {}", stats.materials_used);
        println!("  Distance travelled: {} km", stats.total_traveled_km());
    }

    if !replay.team_stats().is_empty() {
        println!();
        println!("Team Stats:");
        for team in replay.team_stats().values() {
            println!(
                "  Team {}: placed #{} of {} players",
                team.team_id, team.placement, team.player_count
            );
        }
    }

    println!();
    println!("Eliminations ({}):", replay.eliminations().len());
    for elim in replay.eliminations() {
        println!("  [{}] {}", format_time(elim.timestamp), elim);
    }

    let diagnostics = replay.diagnostics();
    let data_size: usize = replay.data_chunks.iter().map(|chunk| chunk.size).sum();
    println!();
    println!("Decoder Summary:");
    println!("  Chunks: {}", diagnostics.chunks);
    println!("  Records: {}", diagnostics.records);
    println!("  Checkpoints: {}", replay.checkpoints.len());
    println!(
        "  Replay data: {} chunks, {}",
        replay.data_chunks.len(),
        format_size(data_size as u64)
    );
    if !diagnostics.is_clean() {
        println!("  Skipped chunks: {}", diagnostics.skipped_chunks);
        println!("  Unknown chunks: {}", diagnostics.unknown_chunks);
        println!("  Unknown records: {}", diagnostics.unknown_records);
        println!("  Failed records: {}", diagnostics.failed_records);
        if diagnostics.truncated {
            println!("  File is truncated");
        }
        if diagnostics.limit_reached {
            println!("  Stopped at parse limit");
        }
    }
}
