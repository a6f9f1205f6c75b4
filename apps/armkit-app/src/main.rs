//! armkit command-line interface.
//!
//! Provides four modes of operation:
//! - `pick-place`: Run the pick-and-place sequence and print each phase
//! - `solve`: Solve inverse kinematics for one target
//! - `workspace`: Sample the workspace and print statistics
//! - `info`: Print the chain summary and crate versions

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use armkit_core::prelude::*;
use armkit_ik::{IkSolver, LinkChain};
use armkit_motion::{PickPlaceSequencer, SequencerState};
use armkit_workspace::{BoundaryAnalysis, WorkspaceSampler, WorkspaceStatistics};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Serial-link arm kinematics toolkit.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Arm description (TOML). Uses the built-in two-link arm when absent.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pick-and-place sequence.
    PickPlace,

    /// Solve inverse kinematics for one target.
    Solve {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,

        /// Target height. Defaults to the base height.
        #[arg(short, long, allow_negative_numbers = true)]
        z: Option<f64>,
    },

    /// Sample the workspace and print statistics.
    Workspace {
        /// Samples per joint (overrides the config).
        #[arg(short, long)]
        resolution: Option<usize>,
    },

    /// Print chain and crate information.
    Info,
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<ArmConfig> {
    match path {
        Some(path) => ArmConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => Ok(ArmConfig::default()),
    }
}

fn joints(q: &Configuration) -> String {
    let values: Vec<String> = q.iter().map(|v| format!("{v:.4}")).collect();
    format!("[{}]", values.join(", "))
}

fn run_pick_place(config: &ArmConfig, chain: LinkChain, json: bool) -> Result<()> {
    let mut sequencer = PickPlaceSequencer::from_config(Arc::new(chain), config)?;
    let steps = sequencer.run_to_completion()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&steps)?);
        return Ok(());
    }

    let mut phase = SequencerState::Idle;
    for (i, step) in steps.iter().enumerate() {
        if step.state != phase {
            phase = step.state;
            println!(
                "step {i:>4}: {phase:<16} q={} object=({:.3}, {:.3}){}",
                joints(&step.configuration),
                step.object_pose.x(),
                step.object_pose.y(),
                if step.object_attached { " attached" } else { "" },
            );
            if let Some(w) = &step.singularity {
                println!("            warning: {w}");
            }
        }
    }
    println!("\ntotal: steps={}", steps.len());
    Ok(())
}

fn run_solve(config: &ArmConfig, chain: &LinkChain, target: Pose, json: bool) -> Result<()> {
    let solution = IkSolver::new(config.solver).solve(chain, &target, None)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&solution)?);
        return Ok(());
    }

    println!("method:          {:?}", solution.method);
    println!("configuration:   {}", joints(&solution.configuration));
    println!(
        "reached:         ({:.4}, {:.4}, {:.4})",
        solution.pose.x(),
        solution.pose.y(),
        solution.pose.z()
    );
    println!("iterations:      {}", solution.iterations);
    println!("residual:        {:.3e}", solution.residual);
    println!("manipulability:  {:.4}", solution.manipulability);
    if let Some(warning) = &solution.singularity {
        println!("warning:         {warning}");
    }
    Ok(())
}

fn run_workspace(
    config: &ArmConfig,
    chain: &LinkChain,
    resolution: Option<usize>,
    json: bool,
) -> Result<()> {
    let resolution = resolution.unwrap_or(config.workspace.resolution);
    let map = WorkspaceSampler::from_config(&config.workspace).sample(chain, resolution)?;
    let stats = WorkspaceStatistics::from_map(chain, &map)?;
    let boundary = BoundaryAnalysis::compare(chain, &map);
    info!(samples = map.len(), "workspace analysed");

    if json {
        let report = serde_json::json!({ "statistics": stats, "boundary": boundary });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "samples:           {} ({} within limits)",
        stats.sample_count, stats.within_limits_count
    );
    println!(
        "theoretical reach: [{:.3}, {:.3}]",
        boundary.theoretical.min, boundary.theoretical.max
    );
    if let Some(sampled) = boundary.sampled {
        println!("sampled reach:     [{:.3}, {:.3}]", sampled.min, sampled.max);
    }
    println!("theoretical area:  {:.2}", stats.theoretical_area);
    if let Some(d) = stats.distance {
        println!(
            "distance:          mean={:.3} std={:.3} min={:.3} max={:.3}",
            d.mean, d.std, d.min, d.max
        );
    }
    if let Some(m) = stats.manipulability {
        println!(
            "manipulability:    mean={:.3} std={:.3} max={:.3}",
            m.mean, m.std, m.max
        );
    }
    let q = stats.quadrants;
    println!("quadrants:         q1={} q2={} q3={} q4={}", q.q1, q.q2, q.q3, q.q4);
    Ok(())
}

fn run_info(chain: &LinkChain) {
    println!("armkit v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("chain:");
    for (i, link) in chain.links().iter().enumerate() {
        println!(
            "  joint {i}: {:?} length={:.3} limits=[{:.3}, {:.3}]",
            link.joint_type, link.length, link.limits.lower, link.limits.upper
        );
    }
    let base = chain.base();
    println!("  base:  ({:.3}, {:.3}, {:.3})", base.x, base.y, base.z);
    println!("  reach: [{:.3}, {:.3}]", chain.min_reach(), chain.max_reach());
    println!("  planar: {}", chain.is_planar());
    println!();
    println!("crates:");
    println!("  armkit-core      {}", env!("CARGO_PKG_VERSION"));
    println!("  armkit-ik        {}", env!("CARGO_PKG_VERSION"));
    println!("  armkit-motion    {}", env!("CARGO_PKG_VERSION"));
    println!("  armkit-workspace {}", env!("CARGO_PKG_VERSION"));
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let chain = LinkChain::from_config(&config)?;

    match cli.command {
        Some(Commands::PickPlace) => run_pick_place(&config, chain, cli.json),
        Some(Commands::Solve { x, y, z }) => {
            let target = Pose::new(x, y, z.unwrap_or(chain.base().z));
            run_solve(&config, &chain, target, cli.json)
        }
        Some(Commands::Workspace { resolution }) => {
            run_workspace(&config, &chain, resolution, cli.json)
        }
        Some(Commands::Info) => {
            run_info(&chain);
            Ok(())
        }
        None => {
            // Default: run the demo sequence
            run_pick_place(&config, chain, cli.json)
        }
    }
}
