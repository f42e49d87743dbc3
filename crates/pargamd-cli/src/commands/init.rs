use crate::cli::InitArgs;
use crate::error::{CliError, Result};
use std::fs;
use tracing::info;

const STARTER_PARAMETERS: &str = r#"# ParGaMD parameter file.
# Generate a bundle with: pargamd generate -c params.toml -o my_run --pdb protein.pdb --prmtop protein.prmtop

# HPC allocation and notification address used in the #SBATCH headers.
account = "your-allocation"
email = "you@example.org"

# Base name of the structure/topology files (common_files/<name>.prmtop, ...).
protein-name = "chignolin"

# Pin each WE worker to its own GPU via CUDA_VISIBLE_DEVICES.
enable-gpu-parallelization = false
# Wrap every boundary list in '-inf' ... 'inf'.
include-infinite-bounds = true
# Place an uploaded restart file at bstates/bstate.rst instead of cMD/.
rst-as-bstate = false

[simulation]
bin-target-counts = 4
max-total-iterations = 1000
# MD steps per segment and output frequency; pcoord_len = nstlim / ntpr + 1.
nstlim = 50000
ntpr = 500

# One [[cv]] table per progress-coordinate dimension. Types: rmsd,
# radius_gyration, distance, native_contacts, dihedral, hbond, surface_area,
# secondary_structure, custom (requires editing the generated scripts).
[[cv]]
type = "rmsd"
min = 0.0
max = 8.0
step = 0.2
name = "PC1"

[scheduler]
partition = "gpu-shared"
nodes = 1
gpus = 1
ntasks-per-node = 1
memory = "50G"
wall-time = "48:00:00"
"#;

pub async fn run(args: InitArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        return Err(CliError::Argument(format!(
            "'{}' already exists. Use --force to overwrite.",
            args.output.display()
        )));
    }
    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&args.output, STARTER_PARAMETERS)?;
    info!("Wrote starter parameters to {:?}", &args.output);
    println!(
        "✓ Starter parameter file written to {}. Edit the account and email before generating.",
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::file::FileConfig;
    use tempfile::tempdir;

    #[test]
    fn starter_file_parses_with_every_section() {
        let config: FileConfig = toml::from_str(STARTER_PARAMETERS).unwrap();
        assert_eq!(config.protein_name.as_deref(), Some("chignolin"));
        assert_eq!(config.cvs.as_ref().map(Vec::len), Some(1));
        assert_eq!(config.simulation.and_then(|s| s.nstlim), Some(50_000));
        assert_eq!(
            config.scheduler.map(|s| s.into_options().wall_time),
            Some("48:00:00".to_string())
        );
    }

    #[tokio::test]
    async fn refuses_to_overwrite_without_force() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("nested/params.toml");

        run(InitArgs {
            output: output.clone(),
            force: false,
        })
        .await
        .unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), STARTER_PARAMETERS);

        let err = run(InitArgs {
            output: output.clone(),
            force: false,
        })
        .await
        .unwrap_err();
        assert!(matches!(err, CliError::Argument(_)));

        run(InitArgs {
            output,
            force: true,
        })
        .await
        .unwrap();
    }
}
