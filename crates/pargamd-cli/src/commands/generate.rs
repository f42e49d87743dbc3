use crate::assets::AssetManager;
use crate::cli::GenerateArgs;
use crate::config;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use pargamd::core::uploads::{UploadKind, Uploads};
use pargamd::engine::progress::ProgressReporter;
use pargamd::workflows::generate::{self, GenerationReport};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub async fn run(args: GenerateArgs) -> Result<()> {
    info!("Initializing asset manager...");
    let assets = AssetManager::new()?;
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Generating ParGaMD bundle...");
    let cwd = std::env::current_dir().ok();
    let (report, written) =
        tokio::task::block_in_place(|| execute(&args, &assets, cwd, &reporter))?;

    for warning in report.notable_warnings() {
        println!("⚠ {}", warning);
    }
    let tally = progress_handler.tally();
    info!("Bundle contents: {}", tally);
    if tally.placeholder > 0 {
        println!(
            "  {} auxiliary file(s) were not found and were written as placeholders.",
            tally.placeholder
        );
    }
    println!(
        "✓ Wrote {} file(s) to {}",
        written.len(),
        args.output.display()
    );
    Ok(())
}

/// Builds the record, generates the bundle and writes it to the output directory.
pub fn execute(
    args: &GenerateArgs,
    assets: &AssetManager,
    cwd: Option<PathBuf>,
    reporter: &ProgressReporter,
) -> Result<(GenerationReport, Vec<PathBuf>)> {
    let record = config::build_record(args)?;
    let uploads = read_uploads(args)?;
    if record.rst_as_bstate && !uploads.contains(UploadKind::Rst) {
        warn!("rst-as-bstate is set but no restart file was given; it has no effect.");
    }

    prepare_output_dir(&args.output, args.force)?;

    let fallback = assets.search_paths(&args.fallback_dirs, cwd);
    let report = generate::run(&record, &uploads, &fallback, reporter)?;

    info!("Writing bundle to {:?}", &args.output);
    let written = report.bundle.write_to_dir(&args.output)?;
    mark_scripts_executable(&written)?;
    Ok((report, written))
}

fn read_uploads(args: &GenerateArgs) -> Result<Uploads> {
    let sources = [
        (UploadKind::Pdb, &args.pdb),
        (UploadKind::Inpcrd, &args.inpcrd),
        (UploadKind::Prmtop, &args.prmtop),
        (UploadKind::Rst, &args.rst),
    ];
    let mut uploads = Uploads::new();
    for (kind, path) in sources {
        let Some(path) = path else {
            continue;
        };
        info!("Reading {} file from {:?}", kind, path);
        let bytes = fs::read(path).map_err(|e| CliError::FileParsing {
            path: path.clone(),
            source: e.into(),
        })?;
        uploads.insert(kind, bytes);
    }
    Ok(uploads)
}

fn prepare_output_dir(output: &Path, force: bool) -> Result<()> {
    if output.is_file() {
        return Err(CliError::Argument(format!(
            "Output path '{}' is a file, not a directory.",
            output.display()
        )));
    }
    if output.is_dir() && fs::read_dir(output)?.next().is_some() {
        if !force {
            return Err(CliError::Argument(format!(
                "Output directory '{}' is not empty. Use --force to overwrite.",
                output.display()
            )));
        }
        warn!("--force specified, overwriting files in {:?}", output);
    }
    fs::create_dir_all(output)?;
    Ok(())
}

#[cfg(unix)]
fn mark_scripts_executable(paths: &[PathBuf]) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    for path in paths.iter().filter(|p| p.extension().is_some_and(|e| e == "sh")) {
        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_mode(permissions.mode() | 0o755);
        fs::set_permissions(path, permissions)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn mark_scripts_executable(_paths: &[PathBuf]) -> Result<()> {
    Ok(())
}
