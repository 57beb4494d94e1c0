//! batchinv command-line interface.

mod io;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use batchinv_backend_cpu::HostDevice;
use batchinv_core::{Element, ElementKind};
use batchinv_solver::{
    BatchedInverse, ComputeBackend, InverseConfig, InversionStrategy, LuKernels, STREAM_POOL_SIZE,
};
use clap::{Args, Parser, Subcommand};
use num_traits::ToPrimitive;

use crate::io::MatrixFile;

#[derive(Parser)]
#[command(name = "batchinv")]
#[command(about = "Invert batches of square matrices", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Invert every matrix of a JSON batch file
    Invert(InvertArgs),
    /// Show which strategy a batch would run with
    Plan(PlanArgs),
}

#[derive(Args)]
struct InvertArgs {
    /// Input batch file ({"shape": [..., n, n], "data": [...]}, row-major)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Write the inverse here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Batch strategy: auto, parallel, or fused
    #[arg(long, default_value = "auto")]
    strategy: String,

    /// Compute backend: auto, cpu, or cuda
    #[arg(long, default_value = "auto")]
    backend: String,

    /// Element type: f32 or f64
    #[arg(long, default_value = "f64")]
    dtype: String,

    /// Size of the parallel-stream pool (at least 1)
    #[arg(
        long,
        default_value_t = STREAM_POOL_SIZE,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    streams: usize,
}

#[derive(Args)]
struct PlanArgs {
    /// Number of matrices
    #[arg(long)]
    batch: usize,

    /// Matrix dimension n
    #[arg(long)]
    size: usize,

    /// Batch strategy: auto, parallel, or fused
    #[arg(long, default_value = "auto")]
    strategy: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Invert(args) => run_invert(args, cli.verbose),
        Command::Plan(args) => run_plan(args, cli.verbose),
    }
}

/// Select the compute backend named on the command line.
///
/// `auto` prefers CUDA when it is compiled in and a device is present. An
/// explicit `cuda` request never degrades to the host backend.
fn detect_backend(name: &str) -> Result<ComputeBackend> {
    match name.to_lowercase().as_str() {
        "cpu" => Ok(ComputeBackend::Cpu),
        "cuda" => {
            #[cfg(feature = "cuda")]
            {
                if batchinv_backend_cuda::CudaDevice::is_available() {
                    Ok(ComputeBackend::Cuda { device_id: 0 })
                } else {
                    bail!("CUDA backend requested but no CUDA device is available")
                }
            }
            #[cfg(not(feature = "cuda"))]
            {
                bail!("CUDA backend requested but CUDA support is not compiled in")
            }
        }
        "auto" => {
            #[cfg(feature = "cuda")]
            {
                if batchinv_backend_cuda::CudaDevice::is_available() {
                    return Ok(ComputeBackend::Cuda { device_id: 0 });
                }
            }
            Ok(ComputeBackend::Cpu)
        }
        other => bail!("Unknown backend '{}': expected auto, cpu, or cuda", other),
    }
}

fn parse_strategy(name: &str) -> Result<InversionStrategy> {
    InversionStrategy::from_name(name)
        .ok_or_else(|| anyhow!("Unknown strategy '{}': expected auto, parallel, or fused", name))
}

fn parse_dtype(name: &str) -> Result<ElementKind> {
    match ElementKind::from_name(name) {
        Some(kind @ (ElementKind::F32 | ElementKind::F64)) => Ok(kind),
        _ => bail!("Unsupported dtype '{}': expected f32 or f64", name),
    }
}

fn run_invert(args: &InvertArgs, verbose: bool) -> Result<()> {
    let file = MatrixFile::read(&args.input)?;
    let config = InverseConfig::default()
        .with_strategy(parse_strategy(&args.strategy)?)
        .with_stream_pool_size(args.streams);
    let dtype = parse_dtype(&args.dtype)?;
    let backend = detect_backend(&args.backend)?;

    if verbose {
        eprintln!("Backend: {}", backend);
        eprintln!("Input: {} ({})", file.describe(), dtype);
    }

    let start = Instant::now();
    let result = match backend {
        ComputeBackend::Cpu => invert_on(Arc::new(HostDevice::new()), config, &file, dtype, verbose)?,
        ComputeBackend::Cuda { device_id } => invert_cuda(device_id, config, &file, dtype, verbose)?,
    };

    if verbose {
        eprintln!("Inverted in {:.3} ms", start.elapsed().as_secs_f64() * 1e3);
    }

    match &args.output {
        Some(path) => {
            result.write(path)?;
            if verbose {
                eprintln!("Wrote {}", path.display());
            }
        }
        None => println!("{}", result.to_json()?),
    }

    Ok(())
}

#[cfg(feature = "cuda")]
fn invert_cuda(
    device_id: usize,
    config: InverseConfig,
    file: &MatrixFile,
    dtype: ElementKind,
    verbose: bool,
) -> Result<MatrixFile> {
    let device = batchinv_backend_cuda::CudaDevice::with_device(device_id)
        .context("Failed to open CUDA device")?;
    invert_on(Arc::new(device), config, file, dtype, verbose)
}

#[cfg(not(feature = "cuda"))]
fn invert_cuda(
    _device_id: usize,
    _config: InverseConfig,
    _file: &MatrixFile,
    _dtype: ElementKind,
    _verbose: bool,
) -> Result<MatrixFile> {
    bail!("CUDA support not compiled in")
}

fn invert_on<D>(
    device: Arc<D>,
    config: InverseConfig,
    file: &MatrixFile,
    dtype: ElementKind,
    verbose: bool,
) -> Result<MatrixFile>
where
    D: LuKernels<f32> + LuKernels<f64>,
{
    let engine = BatchedInverse::with_config(device, config);

    if verbose {
        match engine.plan(&file.shape)? {
            Some(strategy) => eprintln!("Strategy: {}", strategy),
            None => eprintln!("Strategy: single matrix"),
        }
    }

    match dtype {
        ElementKind::F32 => invert_as::<D, f32>(&engine, file),
        ElementKind::F64 => invert_as::<D, f64>(&engine, file),
        other => bail!("Unsupported dtype '{}'", other),
    }
}

fn invert_as<D, T>(engine: &BatchedInverse<D>, file: &MatrixFile) -> Result<MatrixFile>
where
    D: LuKernels<T>,
    T: Element + ToPrimitive,
{
    let batch = file.to_batch::<T>()?;
    let inverse = engine.invert_host(&batch).context("Inversion failed")?;
    Ok(MatrixFile::from_batch(&inverse))
}

fn run_plan(args: &PlanArgs, verbose: bool) -> Result<()> {
    let config = InverseConfig::default().with_strategy(parse_strategy(&args.strategy)?);

    println!("Batch: {} matrices of {}x{}", args.batch, args.size, args.size);
    println!("Strategy: {}", describe_plan(&config, args.batch, args.size));

    if verbose {
        println!(
            "Auto thresholds: parallel streams when batch <= {} or n >= {}",
            config.looped_batch_limit, config.looped_matrix_threshold
        );
    }

    Ok(())
}

fn describe_plan(config: &InverseConfig, batch: usize, n: usize) -> String {
    if batch <= 1 {
        return "single matrix (default stream)".to_string();
    }
    match config.resolve(batch, n) {
        InversionStrategy::ParallelStreams => format!(
            "{} ({} streams)",
            InversionStrategy::ParallelStreams,
            config.stream_pool_size.min(batch)
        ),
        other => other.to_string(),
    }
}
