//           ,--.           ,--.
//  ,---.  ,-'  '-. ,--,--.,-'  '-.,--,--,--.,--.,--.,--.  ,--.
// (  .-'  '-.  .-'' ,-.  |'-.  .-'|        ||  ||  | \  `'  /
// .-'  `)   |  |  \ '-'  |  |  |  |  |  |  |'  ''  ' /  /.  \
// `----'    `--'   `--`--'  `--'  `--`--`--' `----' '--'  '--'

// Statistical multiplexing on one shared link: N on/off users, a bounded buffer, and the loss
// you get when more of them talk at once than the link can carry.

// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use statmux::metrics::analyzer::{self, AnalysisReport};
use statmux::simulation::{SimConfig, Simulation};
use statmux::theory::{self, TheoreticalStats};

use anyhow::Result;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario
    Run {
        /// Start from a JSON config, flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        name: Option<String>,
        #[arg(short = 'n', long)]
        users: Option<u32>,
        #[arg(short, long)]
        prob: Option<f64>,
        #[arg(long)]
        link_mbps: Option<f64>,
        #[arg(long)]
        user_mbps: Option<f64>,
        #[arg(short, long)]
        buffer: Option<usize>,
        #[arg(long)]
        dt: Option<f64>,
        #[arg(long)]
        processing_capacity: Option<usize>,
        #[arg(long)]
        emission_prob: Option<f64>,
        #[arg(short, long)]
        seed: Option<u64>,
        #[arg(short, long, default_value_t = 500)]
        ticks: u64,
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
        #[arg(long)]
        no_save: bool,
    },

    /// Run several population sizes side by side
    Compare {
        #[arg(short = 'n', long, default_value = "10,35,50,100")]
        users: String,
        #[arg(short, long, default_value_t = 0.1)]
        prob: f64,
        #[arg(short, long, default_value_t = 500)]
        ticks: u64,
        #[arg(short, long, default_value_t = 3)]
        repetitions: u32,
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Binomial overload probabilities, no simulation
    Theory {
        #[arg(short = 'n', long, default_value = "10,35,50,100")]
        users: String,
        #[arg(short, long, default_value_t = 0.1)]
        prob: f64,
        #[arg(long, default_value_t = 1000.0)]
        link_mbps: f64,
        #[arg(long, default_value_t = 100.0)]
        user_mbps: f64,
        #[arg(long, default_value_t = 200_000)]
        trials: u64,
        #[arg(short, long, default_value_t = 12345)]
        seed: u64,
        /// Also sweep N = 1..=max-n and write tail_summary.csv
        #[arg(long)]
        max_n: Option<u64>,
        #[arg(long, default_value = "0.01,0.05,0.1,0.2,0.3")]
        p_values: String,
        #[arg(short, long, default_value = "results")]
        output: PathBuf,
    },

    /// Print the comparison table for saved analysis files
    Analyze {
        #[arg(default_value = "results")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let program_start = Instant::now();
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            config,
            name,
            users,
            prob,
            link_mbps,
            user_mbps,
            buffer,
            dt,
            processing_capacity,
            emission_prob,
            seed,
            ticks,
            output,
            no_save,
        } => {
            let mut sim_config = match config {
                Some(path) => SimConfig::from_json_file(path)?,
                None => SimConfig::default(),
            };
            if let Some(v) = name {
                sim_config.name = v;
            }
            if let Some(v) = users {
                sim_config.num_users = v;
            }
            if let Some(v) = prob {
                sim_config.user_active_prob = v;
            }
            if let Some(v) = link_mbps {
                sim_config.link_capacity_bps = v * 1e6;
            }
            if let Some(v) = user_mbps {
                sim_config.user_capacity_bps = v * 1e6;
            }
            if let Some(v) = buffer {
                sim_config.max_buffer_size = v;
            }
            if let Some(v) = dt {
                sim_config.dt = v;
            }
            if let Some(v) = processing_capacity {
                sim_config.processing_capacity = v;
            }
            if let Some(v) = emission_prob {
                sim_config.emission_prob = v;
            }
            if seed.is_some() {
                sim_config.random_seed = seed;
            }

            run_single(sim_config, ticks, (!no_save).then_some(output))?;
        }

        Commands::Compare {
            users,
            prob,
            ticks,
            repetitions,
            seed,
            output,
        } => {
            let populations = parse_users(&users)?;
            compare_populations(&populations, prob, ticks, repetitions, seed, &output)?;
        }

        Commands::Theory {
            users,
            prob,
            link_mbps,
            user_mbps,
            trials,
            seed,
            max_n,
            p_values,
            output,
        } => {
            let populations = parse_users(&users)?;
            let (link_bps, user_bps) = (link_mbps * 1e6, user_mbps * 1e6);
            theory_table(&populations, prob, link_bps, user_bps, trials, seed);

            if let Some(max_n) = max_n {
                let probs = parse_probs(&p_values)?;
                tail_sweep(max_n, &probs, link_bps, user_bps, &output)?;
            }
        }

        Commands::Analyze { path } => {
            analyze_results(&path)?;
        }
    }

    info!("Total runtime: {:.2}s", program_start.elapsed().as_secs_f64());
    Ok(())
}

fn parse_users(list: &str) -> Result<Vec<u32>> {
    let mut out = Vec::new();
    for part in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match part.parse::<u32>() {
            Ok(n) if n > 0 => out.push(n),
            _ => anyhow::bail!("Invalid user count: {}", part),
        }
    }
    if out.is_empty() {
        anyhow::bail!("No user counts given");
    }
    Ok(out)
}

fn parse_probs(list: &str) -> Result<Vec<f64>> {
    let mut out = Vec::new();
    for part in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match part.parse::<f64>() {
            Ok(p) if p > 0.0 && p <= 1.0 => out.push(p),
            _ => anyhow::bail!("Invalid probability: {}", part),
        }
    }
    if out.is_empty() {
        anyhow::bail!("No probabilities given");
    }
    Ok(out)
}

fn run_single(config: SimConfig, ticks: u64, output: Option<PathBuf>) -> Result<()> {
    info!("statmux: Single Run");

    let stats = TheoreticalStats::for_config(&config);
    info!(
        "Theory: E[X] = {:.2} active, P(X > {}) = {:.6}",
        stats.expected_active, stats.threshold, stats.prob_overload
    );

    let mut sim = Simulation::new(config, ticks)?.with_progress(true);
    let report = sim.run()?;

    if let Some(dir) = output {
        sim.save_results(dir, &report)?;
    }
    comparison_table(&[report]);
    Ok(())
}

fn compare_populations(
    populations: &[u32],
    prob: f64,
    ticks: u64,
    repetitions: u32,
    base_seed: u64,
    output: &Path,
) -> Result<()> {
    info!("statmux: Comparison");
    info!("Populations: {:?} at p = {}", populations, prob);
    info!("Repetitions: {}, {} ticks each", repetitions, ticks);

    let jobs: Vec<(u32, u32)> = populations
        .iter()
        .flat_map(|&n| (0..repetitions.max(1)).map(move |rep| (n, rep)))
        .collect();

    // Every run owns its engine and rng, so they can all go at once
    let results: Vec<(u32, AnalysisReport)> = jobs
        .par_iter()
        .map(|&(n, rep)| -> Result<(u32, AnalysisReport)> {
            let config = SimConfig::default()
                .with_name(format!("n{}", n))
                .with_users(n, prob)
                .with_seed(base_seed.wrapping_add(rep as u64));
            let mut sim = Simulation::new(config, ticks)?;
            Ok((n, sim.run()?))
        })
        .collect::<Result<_>>()?;

    let mut reports = Vec::new();
    for &n in populations {
        let runs: Vec<AnalysisReport> = results
            .iter()
            .filter(|(users, _)| *users == n)
            .map(|(_, r)| r.clone())
            .collect();
        if let Some(avg) = analyzer::average_reports(&runs) {
            reports.push(avg);
        }
    }

    comparison_table(&reports);

    std::fs::create_dir_all(output)?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = output.join(format!("comparison_{}.json", timestamp));
    std::fs::write(&path, serde_json::to_string_pretty(&reports)?)?;
    info!("Comparison saved to: {}", path.display());

    Ok(())
}

fn theory_table(
    populations: &[u32],
    prob: f64,
    link_bps: f64,
    user_bps: f64,
    trials: u64,
    seed: u64,
) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    println!("\n┌─────────┬───────────────┬───────────────┬───────────────┬──────────┬────────────┐");
    println!("│ N Users │ P(X > k)      │ Normal approx │ Monte Carlo   │ E[X]     │ Status     │");
    println!("├─────────┼───────────────┼───────────────┼───────────────┼──────────┼────────────┤");

    for &n in populations {
        let stats = TheoreticalStats::new(n as u64, prob, link_bps, user_bps);
        let approx = theory::normal_approx_tail(stats.n, stats.threshold, prob);
        let mc = theory::monte_carlo_tail(stats.n, stats.threshold, prob, trials, &mut rng);
        let status = if stats.overloaded_on_average() { "OVERLOAD" } else { "SAFE" };

        println!(
            "│ {:>7} │ {:>13.6} │ {:>13.6} │ {:>13.6} │ {:>8.1} │ {:<10} │",
            n, stats.prob_overload, approx, mc, stats.expected_active, status
        );
    }

    println!("└─────────┴───────────────┴───────────────┴───────────────┴──────────┴────────────┘");
    println!(
        "k = {} users fit at full rate ({:.0} Mb/s link, {:.0} Mb/s each)\n",
        theory::circuit_capacity(link_bps, user_bps),
        link_bps / 1e6,
        user_bps / 1e6
    );
}

fn tail_sweep(
    max_n: u64,
    probs: &[f64],
    link_bps: f64,
    user_bps: f64,
    output: &Path,
) -> Result<()> {
    let threshold = theory::circuit_capacity(link_bps, user_bps);
    info!("Sweeping N = 1..={} for p in {:?}", max_n, probs);

    let rows = theory::tail_sweep(max_n, threshold, probs);
    let path = output.join("tail_summary.csv");
    theory::write_tail_summary(&path, probs, &rows)?;
    info!("Tail summary saved to: {}", path.display());

    for (column, p) in probs.iter().enumerate() {
        match theory::first_population_above(&rows, column, 0.01) {
            Some(n) => println!("p = {:<5} P(X > {}) passes 1% at N = {}", p, threshold, n),
            None => println!(
                "p = {:<5} P(X > {}) stays under 1% up to N = {}",
                p, threshold, max_n
            ),
        }
    }
    println!();
    Ok(())
}

fn analyze_results(path: &Path) -> Result<()> {
    info!("Analyzing results in: {}", path.display());

    let mut reports = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json")
            && path.to_string_lossy().contains("analysis")
        {
            let content = std::fs::read_to_string(&path)?;
            let report: AnalysisReport = serde_json::from_str(&content)?;
            reports.push(report);
        }
    }

    if reports.is_empty() {
        info!("No analysis files found.");
        return Ok(());
    }

    reports.sort_by_key(|r| r.num_users);
    comparison_table(&reports);
    Ok(())
}

fn comparison_table(reports: &[AnalysisReport]) {
    println!("\n╔═══════════════╦═══════╦═══════════╦═══════════╦═══════════╦═══════════╦═══════════╗");
    println!("║ Scenario      ║ Users ║ Throughput║ Util      ║ Loss Rate ║ Avg Buffer║ Latency   ║");
    println!("║               ║       ║ (Mb/s)    ║ (%)       ║ (%)       ║ (%)       ║ (ms)      ║");
    println!("╠═══════════════╬═══════╬═══════════╬═══════════╬═══════════╬═══════════╬═══════════╣");

    for report in reports {
        println!(
            "║ {:<13} ║ {:>5} ║ {:>9.2} ║ {:>9.1} ║ {:>9.2} ║ {:>9.1} ║ {:>9.1} ║",
            report.scenario_name,
            report.num_users,
            report.avg_throughput_mbps,
            report.avg_utilization_pct,
            report.loss_rate_pct,
            report.avg_buffer_occupancy_pct,
            report.avg_latency_ms,
        );
    }

    println!("╚═══════════════╩═══════╩═══════════╩═══════════╩═══════════╩═══════════╩═══════════╝\n");

    if let Some(worst) = reports
        .iter()
        .max_by(|a, b| a.loss_rate_pct.total_cmp(&b.loss_rate_pct))
        .filter(|r| r.loss_rate_pct > 0.0)
    {
        println!("Highest Loss: {} ({:.2}%)", worst.scenario_name, worst.loss_rate_pct);
    }
    if let Some(busiest) = reports
        .iter()
        .max_by(|a, b| a.avg_utilization_pct.total_cmp(&b.avg_utilization_pct))
    {
        println!("Busiest Link: {} ({:.1}%)", busiest.scenario_name, busiest.avg_utilization_pct);
    }
    println!();
}
