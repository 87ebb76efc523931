//! aggregate-ops CLI
//!
//! Benchmarks the execution paths on synthetic workloads and checks that the
//! parallel paths agree with the sequential one.

use aggregate_ops::{
    AggregateError, Backend, BatchGenerator, Config, Executor, Result, SequentialExecutor, Workload,
};
use clap::{Args, Parser, Subcommand};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use log::{error, info};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "aggregate-ops")]
#[command(version)]
#[command(about = "Fused SkipGram/CBOW kernels: benchmarks and parity checks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a synthetic workload and report throughput
    Bench {
        #[command(flatten)]
        workload: WorkloadArgs,

        /// Execution path (sequential, cooperative, gpu)
        #[arg(short, long)]
        backend: Option<Backend>,
    },

    /// Compare the cooperative path against the sequential path
    Parity {
        #[command(flatten)]
        workload: WorkloadArgs,

        /// Maximum allowed absolute difference per element
        #[arg(short, long, default_value = "1e-3")]
        tolerance: f32,
    },
}

/// Overrides applied on top of the configuration file.
#[derive(Args)]
struct WorkloadArgs {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Threads per lane group
    #[arg(long)]
    lanes: Option<usize>,

    /// Concurrent lane groups (0 = one per rayon thread)
    #[arg(long)]
    groups: Option<usize>,

    /// Vocabulary size (rows per matrix)
    #[arg(long)]
    vocab: Option<usize>,

    /// Vector length (columns per matrix)
    #[arg(long)]
    dim: Option<usize>,

    /// Descriptors per batch
    #[arg(long)]
    batch: Option<usize>,

    /// Number of batches
    #[arg(short = 'n', long)]
    iterations: Option<usize>,

    /// Random seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,
}

impl WorkloadArgs {
    fn load(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        let execution = &mut config.execution;
        execution.lanes = self.lanes.unwrap_or(execution.lanes);
        execution.groups = self.groups.unwrap_or(execution.groups);

        let workload = &mut config.workload;
        workload.vocab_size = self.vocab.unwrap_or(workload.vocab_size);
        workload.vector_length = self.dim.unwrap_or(workload.vector_length);
        workload.batch_size = self.batch.unwrap_or(workload.batch_size);
        workload.iterations = self.iterations.unwrap_or(workload.iterations);
        workload.seed = self.seed.unwrap_or(workload.seed);

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let result = match cli.command {
        Commands::Bench { workload, backend } => run_bench(&workload, backend),
        Commands::Parity { workload, tolerance } => run_parity(&workload, tolerance),
    };

    if let Err(e) = result {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn progress_bar(len: usize, message: &str) -> Result<ProgressBar> {
    let style = ProgressStyle::default_bar()
        .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) ETA: {eta}")
        .map_err(|e| AggregateError::Config(e.to_string()))?
        .progress_chars("█▓▒░  ");

    let pb = ProgressBar::new(len as u64);
    pb.set_style(style);
    pb.set_message(message.to_string());
    Ok(pb)
}

/// Runs every batch of the workload through `executor`, returning the
/// number of invocations executed.
fn run_batches(
    executor: &dyn Executor,
    config: &Config,
    workload: &mut Workload,
    pb: Option<&ProgressBar>,
) -> Result<usize> {
    let mut generator = BatchGenerator::new(config.workload.clone());
    let mut invocations = 0;

    for _ in 0..config.workload.iterations {
        let batch = generator.next_batch();
        let (mut weights, tables) = workload.split()?;
        executor.execute_batch(&mut weights, &tables, &batch)?;
        invocations += batch.len();
        if let Some(pb) = pb {
            pb.inc(1);
        }
    }

    Ok(invocations)
}

fn run_bench(args: &WorkloadArgs, backend: Option<Backend>) -> Result<()> {
    let mut config = args.load()?;
    if let Some(backend) = backend {
        config.execution.backend = backend;
    }
    let w = &config.workload;

    println!("aggregate-ops benchmark");
    println!(
        "   Backend: {} (lanes {}, groups {})",
        config.execution.backend,
        config.execution.lanes,
        config.execution.effective_groups()
    );
    println!(
        "   Workload: vocab {}, dim {}, {} x {} invocations, {} HS + {} NS rounds",
        w.vocab_size, w.vector_length, w.iterations, w.batch_size, w.hs_depth, w.negative_rounds
    );
    println!();

    let mut workload = Workload::generate(&config.workload)?;
    let executor = config.executor()?;
    info!("Executor ready: {}", executor.name());

    let pb = progress_bar(config.workload.iterations, "Running batches...")?;
    let start = Instant::now();
    let invocations = run_batches(executor.as_ref(), &config, &mut workload, Some(&pb))?;
    let elapsed = start.elapsed();
    pb.finish_with_message("Done");

    let rounds_per_invocation = max_rounds(&config);
    let seconds = elapsed.as_secs_f64().max(f64::EPSILON);
    println!();
    println!("Results:");
    println!("  Invocations: {}", invocations);
    println!("  Time: {}", HumanDuration(elapsed));
    println!("  Throughput: {:.0} invocations/s", invocations as f64 / seconds);
    println!(
        "  Rounds: {:.0} rounds/s (at most {} per invocation)",
        (invocations * rounds_per_invocation) as f64 / seconds,
        rounds_per_invocation
    );

    Ok(())
}

/// Upper bound on rounds per invocation: HS nodes, the positive target and
/// the drawn negatives.
fn max_rounds(config: &Config) -> usize {
    let w = &config.workload;
    let negative = if w.negative_rounds > 0 { w.negative_rounds + 1 } else { 0 };
    w.hs_depth + negative
}

fn run_parity(args: &WorkloadArgs, tolerance: f32) -> Result<()> {
    let mut config = args.load()?;
    config.execution.backend = Backend::Cooperative;
    // One group keeps the cooperative run free of cross-group races.
    if args.groups.is_none() {
        config.execution.groups = 1;
    }

    println!("aggregate-ops parity check");
    println!(
        "   cooperative (lanes {}, groups {}) vs sequential, tolerance {:e}",
        config.execution.lanes,
        config.execution.effective_groups(),
        tolerance
    );
    println!();

    let mut expected = Workload::generate(&config.workload)?;
    let mut actual = expected.clone();

    let pb = progress_bar(config.workload.iterations * 2, "Running both paths...")?;
    run_batches(&SequentialExecutor::new(), &config, &mut expected, Some(&pb))?;
    let cooperative = config.executor()?;
    run_batches(cooperative.as_ref(), &config, &mut actual, Some(&pb))?;
    pb.finish_with_message("Done");

    let (syn0, syn1, syn1_neg) = actual.max_divergence(&expected);
    println!();
    println!("Max absolute divergence:");
    println!("  syn0:     {:e}", syn0);
    println!("  syn1:     {:e}", syn1);
    println!("  syn1_neg: {:e}", syn1_neg);

    let worst = syn0.max(syn1).max(syn1_neg);
    if worst > tolerance {
        return Err(AggregateError::Config(format!(
            "divergence {worst:e} exceeds tolerance {tolerance:e}"
        )));
    }
    println!("Parity OK");
    Ok(())
}
