// src/main.rs
use clap::Parser;
use crossbeam_channel::{Receiver, unbounded};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::runtime::Runtime;
use xmr_idle_miner_rs::miner::engine::randomx::RandomXFactory;
use xmr_idle_miner_rs::utils::logging::init_bench_logging;
use xmr_idle_miner_rs::{self, *};

/// Main entry point for the idle miner
///
/// # Flow
/// 1. Parses command line arguments
/// 2. Delegates to appropriate subcommand handler
/// 3. Propagates any errors upward
fn main() -> Result<(), MinerError> {
    let cli = cli::Commands::parse();

    match cli.action {
        cli::Action::Start(opts) => start_mining(opts),
        cli::Action::Benchmark(opts) => run_benchmark(opts),
        cli::Action::Config(opts) => generate_config(opts),
    }
}

/// Mines jobs read from a file or stdin until end of input or Ctrl-C
///
/// # Operations
/// 1. Loads configuration and applies CLI overrides
/// 2. Builds the pool with a RandomX engine factory
/// 3. Starts statistics reporting and candidate printing
/// 4. Feeds every decoded job line to the pool
/// 5. Stops and joins all workers on exit
fn start_mining(opts: cli::StartOptions) -> Result<(), MinerError> {
    let loaded = config::load_if_present(&opts.config)?;
    let found = loaded.is_some();
    let mut config = loaded.unwrap_or_default();
    // Apply CLI overrides
    if let Some(workers) = opts.workers {
        config.worker_threads = Some(workers);
    }
    if let Some(load_factor) = opts.load_factor {
        config.load_factor = load_factor;
    }
    if let Some(mode) = opts.mode {
        config.randomx_mode = mode;
    }
    config.validate()?;
    utils::init_logging(&config.log_level);
    if !found {
        log::warn!("Config {} not found, using defaults", opts.config.display());
    }

    let (candidate_sender, candidate_receiver) = unbounded::<Candidate>();
    let pool = Arc::new(Pool::new(
        config.pool_config(),
        Arc::new(RandomXFactory::new(config.randomx_mode)),
        Arc::new(candidate_sender),
    ));

    let mut reporter =
        StatsReporter::new(Arc::clone(&pool), Duration::from_secs(config.report_interval_secs));
    let printer = print_candidates(reporter.count_candidates(candidate_receiver));
    reporter.start_reporting();

    let rt = Runtime::new()?;
    let result = rt.block_on(async {
        let feeder = tokio::spawn(feed_jobs(opts.jobs.clone(), Arc::clone(&pool)));
        tokio::select! {
            joined = feeder => {
                joined??;
                log::info!("End of job input");
                Ok(())
            }
            signal = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, shutting down");
                signal.map_err(MinerError::from)
            }
        }
    });

    pool.stop();
    // drops an interrupted feeder along with its pool handle
    rt.shutdown_timeout(Duration::from_secs(1));

    reporter.stop();
    let stats = reporter.get_stats();
    log::info!(
        "Mined for {:.0?}, {} candidates found",
        stats.uptime,
        stats.candidates_found
    );

    // the pool holds the last candidate sender
    drop(pool);
    drop(reporter);
    let _ = printer.join();

    result
}

/// Reads newline-delimited JSON jobs and submits them in order
///
/// Malformed lines are logged and skipped.
async fn feed_jobs(source: String, pool: Arc<Pool>) -> Result<(), MinerError> {
    let input: Box<dyn AsyncRead + Unpin + Send> = if source == "-" {
        Box::new(tokio::io::stdin())
    } else {
        Box::new(tokio::fs::File::open(&source).await?)
    };

    let mut lines = BufReader::new(input).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let submitted = serde_json::from_str::<JobMessage>(line)
            .map_err(MinerError::from)
            .and_then(|message| pool.submit(message));
        if let Err(e) = submitted {
            log::warn!("Skipping job line: {}", e);
        }
    }
    Ok(())
}

/// Prints each candidate as a JSON submission line on stdout
fn print_candidates(candidates: Receiver<Candidate>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for candidate in candidates {
            match serde_json::to_string(&candidate.to_submission()) {
                Ok(line) => println!("{}", line),
                Err(e) => log::error!("Failed to encode candidate: {}", e),
            }
        }
    })
}

/// Runs the pool on a synthetic job and reports the smoothed hashrate
///
/// # Operations
/// 1. Initializes benchmark-specific logging
/// 2. Starts the pool on a zero blob with an unreachable target
/// 3. Logs the aggregate hashrate every few seconds
/// 4. Stops the pool after the requested duration
fn run_benchmark(opts: cli::BenchmarkOptions) -> Result<(), MinerError> {
    init_bench_logging();

    let (candidate_sender, _candidate_receiver) = unbounded::<Candidate>();
    let pool = Pool::new(
        PoolConfig {
            load_factor: opts.load_factor,
            worker_threads: opts.workers,
            ..PoolConfig::default()
        },
        Arc::new(RandomXFactory::new(opts.mode)),
        Arc::new(candidate_sender),
    );

    log::info!(
        "Starting RandomX ({}) benchmark for {} seconds",
        opts.mode,
        opts.duration
    );

    let job = Job::new("benchmark", vec![0u8; 76], vec![0u8; 32], 0, Target::new([0; 4]))?;
    pool.submit_job(job);

    let start_time = Instant::now();
    let duration = Duration::from_secs(opts.duration);
    let mut last_log = Instant::now();
    while start_time.elapsed() < duration {
        std::thread::sleep(Duration::from_millis(250));
        if last_log.elapsed() >= Duration::from_secs(5) {
            log::debug!(
                "{:.2} H/s across {} workers",
                pool.hashrate(),
                pool.live_workers()
            );
            last_log = Instant::now();
        }
    }

    // Report final results
    let hashrate = pool.hashrate();
    let workers = pool.worker_count();
    pool.stop();

    log::info!("Benchmark results:");
    log::info!("Workers: {}", workers);
    log::info!("Load factor: {:.2}", opts.load_factor);
    log::info!("Smoothed hashrate: {:.2} H/s", hashrate);
    log::logger().flush(); // Ensure final results appear

    Ok(())
}

/// Generates configuration template file
fn generate_config(opts: cli::ConfigOptions) -> Result<(), MinerError> {
    std::fs::write(&opts.output, config::generate_template())?;
    println!("Wrote {}", opts.output.display());
    Ok(())
}
