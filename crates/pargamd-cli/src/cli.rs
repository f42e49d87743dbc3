use clap::{Args, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "ParGaMD Forge Contributors",
    version,
    about = "ParGaMD Forge - Generate WESTPA/GaMD configuration bundles for ParGaMD simulations.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a complete ParGaMD simulation bundle from a parameter file.
    Generate(GenerateArgs),
    /// Write an annotated starter parameter file.
    Init(InitArgs),
    /// Manage the directory searched for existing auxiliary files.
    Assets(AssetsArgs),
    /// Start the HTTP interface for interactive bundle generation.
    Serve(ServeArgs),
}

/// Arguments for the `generate` subcommand.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    // --- Core Arguments ---
    /// Path to the parameter file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Directory the bundle is written into.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    /// Overwrite files in a non-empty output directory.
    #[arg(long)]
    pub force: bool,

    // --- Uploaded Files ---
    /// Protein structure in PDB format.
    #[arg(long, value_name = "PATH")]
    pub pdb: Option<PathBuf>,

    /// AMBER coordinate file.
    #[arg(long, value_name = "PATH")]
    pub inpcrd: Option<PathBuf>,

    /// AMBER topology file.
    #[arg(long, value_name = "PATH")]
    pub prmtop: Option<PathBuf>,

    /// AMBER restart file.
    #[arg(long, value_name = "PATH")]
    pub rst: Option<PathBuf>,

    // --- Parameter Overrides ---
    /// Place the restart file as the WE basis state instead of the cMD restart.
    #[arg(long)]
    pub rst_as_bstate: bool,

    /// Override `enable-gpu-parallelization` from the parameter file.
    #[command(flatten)]
    pub gpu: GpuToggle,

    /// Set a specific parameter value, overriding the parameter file.
    /// Can be used multiple times. Example: -S simulation.nstlim=100000
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,

    /// Extra directory searched for existing auxiliary files, before the
    /// current directory and the asset directory. Can be used multiple times.
    #[arg(long = "fallback-dir", value_name = "DIR")]
    pub fallback_dirs: Vec<PathBuf>,
}

/// Mutually exclusive flags for the multi-GPU device assignment.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct GpuToggle {
    /// Pin each WE worker to its own allocated GPU.
    #[arg(long)]
    pub gpu: bool,
    /// Leave GPU assignment to the scheduler.
    #[arg(long)]
    pub no_gpu: bool,
}

impl GpuToggle {
    pub fn as_override(&self) -> Option<bool> {
        match (self.gpu, self.no_gpu) {
            (true, false) => Some(true),
            (false, true) => Some(false),
            _ => None,
        }
    }
}

/// Arguments for the `init` subcommand.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where to write the parameter file.
    #[arg(short, long, default_value = "params.toml", value_name = "PATH")]
    pub output: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `assets` subcommand.
#[derive(Args, Debug)]
pub struct AssetsArgs {
    #[command(subcommand)]
    pub command: AssetsCommands,
}

#[derive(Subcommand, Debug)]
pub enum AssetsCommands {
    /// Show the absolute path to the asset directory.
    Path,
    /// Set a custom path for the asset directory.
    SetPath {
        /// The directory holding existing auxiliary files.
        #[arg(required = true)]
        path: PathBuf,
    },
    /// Reset the asset path to its default, OS-specific location.
    ResetPath,
}

/// Arguments for the `serve` subcommand.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1", value_name = "ADDR")]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(short, long, default_value_t = 5000, value_name = "PORT")]
    pub port: u16,

    /// Working directory for `uploads/` and `generated/`.
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub workdir: PathBuf,
}
