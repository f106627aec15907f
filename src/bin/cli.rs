use clap::{Parser, Subcommand};
use forgetful_bloom_rs::{
    FilterParameters, ForgetfulConfig, ForgetfulConfigBuilder, ForgetfulFilter,
    OldestWindowPolicy, ResizeOutcome, WindowChain,
};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute window parameters for a capacity and false positive rate
    Params {
        /// Projected number of keys per window
        #[arg(short = 'n', long, default_value = "10000")]
        elements: u64,

        /// False positive probability of a single window (between 0 and 1)
        #[arg(short, long, default_value = "0.0001")]
        fpr: f64,
    },

    /// Insert a key range and compare the dumb and smart membership rules
    Compare {
        /// Bits per window
        #[arg(short = 'm', long, default_value = "6250")]
        table_bits: u64,

        /// Hash functions per window
        #[arg(short = 'k', long, default_value = "3")]
        hash_count: u32,

        /// Number of windows
        #[arg(short, long, default_value = "3")]
        windows: usize,

        /// Keys inserted, `0..elements`
        #[arg(short, long, default_value = "1000")]
        elements: u64,

        /// Keys queried that were never inserted
        #[arg(short, long, default_value = "5000")]
        invalids: u64,

        /// Refresh the chain after this many inserts (0 disables refreshing)
        #[arg(short, long, default_value = "0")]
        refresh_every: u64,

        /// Ignore lone hits in the oldest window
        #[arg(long)]
        ignore_oldest: bool,
    },

    /// Drive an adaptive filter with a simulated clock and report resizes
    Resize {
        /// Keys inserted in total
        #[arg(short, long, default_value = "50000")]
        elements: u64,

        /// Inserts per simulated second
        #[arg(short, long, default_value = "1000")]
        rate: u64,

        /// Target effective false positive rate
        #[arg(short, long, default_value = "0.01")]
        target_fpr: f64,

        /// Bits per window
        #[arg(short = 'm', long, default_value = "12500")]
        table_bits: u64,

        /// Hash functions per window
        #[arg(short = 'k', long, default_value = "3")]
        hash_count: u32,

        /// Initial refresh interval in seconds
        #[arg(short = 'i', long, default_value = "5")]
        refresh_interval: u64,
    },

    /// Print the configuration read from FBF_* environment variables
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Params { elements, fpr } => {
            let params = FilterParameters::optimal(elements, fpr)?;
            println!("Window parameters:");
            println!("  Projected elements: {elements}");
            println!("  False positive probability: {fpr}");
            println!("  Table bits: {}", params.table_bits);
            println!("  Hash functions: {}", params.hash_count);
            println!("  Memory per window: {}", bytes2hr(params.window_bytes()));
        }
        Commands::Compare {
            table_bits,
            hash_count,
            windows,
            elements,
            invalids,
            refresh_every,
            ignore_oldest,
        } => {
            let mut chain = WindowChain::new(windows, table_bits, hash_count)?;
            for key in 0..elements {
                chain.insert(key);
                if refresh_every > 0 && (key + 1) % refresh_every == 0 {
                    chain.refresh();
                }
            }

            let policy = if ignore_oldest {
                OldestWindowPolicy::Ignore
            } else {
                OldestWindowPolicy::Hit
            };
            // Queries start well past the inserted range
            let first = elements.saturating_mul(100).max(elements + 1);
            let measurement = chain
                .classifier()
                .with_oldest_policy(policy)
                .measure(first..first.saturating_add(invalids))?;

            println!("Chain: {chain:?}");
            println!("Queries: {}", measurement.queries());
            println!(
                "  Dumb false positives: {} ({:.5})",
                measurement.dumb_false_positives(),
                measurement.dumb_rate()
            );
            println!(
                "  Smart false positives: {} ({:.5})",
                measurement.smart_false_positives(),
                measurement.smart_rate()
            );
            println!("Estimates:");
            println!("  Dumb rule: {:.5}", chain.dumb_fpr());
            println!(
                "  Smart rule: {:.5}",
                forgetful_bloom_rs::effective_fpr_with(&chain, policy)
            );
            println!("  Memory: {}", bytes2hr(chain.memory_bytes()));
        }
        Commands::Resize {
            elements,
            rate,
            target_fpr,
            table_bits,
            hash_count,
            refresh_interval,
        } => {
            let config = ForgetfulConfigBuilder::default()
                .table_bits(table_bits)
                .hash_count(hash_count)
                .target_fpr(target_fpr)
                .refresh_interval(Duration::from_secs(refresh_interval))
                .adaptive(true)
                .build()?;
            run_resize_simulation(config, elements, rate)?;
        }
        Commands::Config => {
            let config = ForgetfulConfig::from_env()?;
            config.validate()?;
            println!("{}", config.to_json()?);
        }
    }

    Ok(())
}

fn run_resize_simulation(
    config: ForgetfulConfig,
    elements: u64,
    rate: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    if rate == 0 {
        return Err("rate must be greater than 0".into());
    }

    let mut filter = ForgetfulFilter::new(config)?;
    let start = filter.chain().last_refresh();
    let step = Duration::from_secs(1) / u32::try_from(rate).unwrap_or(u32::MAX);

    let mut now = start;
    for key in 0..elements {
        now += step;
        let outcome = filter.tick_at(now);
        match outcome.resize {
            Some(ResizeOutcome::Grew) | Some(ResizeOutcome::Shrunk) => info!(
                at = ?now.duration_since(start),
                windows = filter.chain().window_count(),
                refresh_interval = ?filter.chain().refresh_interval(),
                effective_fpr = filter.effective_fpr(),
                outcome = ?outcome.resize,
                "resized"
            ),
            Some(ResizeOutcome::Unchanged) if outcome.refreshed > 0 => {
                if filter.chain().window_count()
                    == filter.config().resize_policy.max_window_count
                {
                    warn!("window count capped, target may be unreachable");
                }
            }
            _ => {}
        }
        filter.insert_at(key, now);
    }

    let stats = filter.stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn bytes2hr(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} bytes")
    } else if bytes < 1024 * 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
