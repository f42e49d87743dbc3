use crate::core::auxiliary::{FallbackSource, auxiliary_files};
use crate::core::bins::{BinBoundaries, generate_bin_boundaries, normalize_step};
use crate::core::bundle::{FileContent, OutputBundle};
use crate::core::cv::cpptraj_command;
use crate::core::templates::{
    self, AnalysisContext, CvRendering, env_sh, get_pcoord, runseg, slurm, west_cfg,
};
use crate::core::uploads::{TextEncoding, UploadKind, Uploads, decode_text, encode_base64};
use crate::engine::config::{ConfigError, ParameterRecord};
use crate::engine::diagnostics::GenerationWarning;
use crate::engine::error::GeneratorError;
use crate::engine::progress::{FileOrigin, Phase, Progress, ProgressReporter};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

const RENDERED_ARTIFACTS: u64 = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    pub bundle: OutputBundle,
    pub warnings: Vec<GenerationWarning>,
}

impl GenerationReport {
    /// Warnings that point at altered or incomplete user input.
    pub fn notable_warnings(&self) -> impl Iterator<Item = &GenerationWarning> {
        self.warnings.iter().filter(|w| !w.is_routine())
    }
}

/// Generates a bundle without progress reporting.
pub fn generate<F: FallbackSource + ?Sized>(
    params: &ParameterRecord,
    uploads: &Uploads,
    fallback: &F,
) -> Result<GenerationReport, GeneratorError> {
    run(params, uploads, fallback, &ProgressReporter::new())
}

#[instrument(skip_all, name = "generate_workflow", fields(protein = %params.protein_name))]
pub fn run<F: FallbackSource + ?Sized>(
    params: &ParameterRecord,
    uploads: &Uploads,
    fallback: &F,
    reporter: &ProgressReporter,
) -> Result<GenerationReport, GeneratorError> {
    if params.cvs.is_empty() {
        return Err(ConfigError::NoCollectiveVariables.into());
    }

    let mut bundle = OutputBundle::new();
    let mut warnings = Vec::new();

    // === Phase 1: Uploaded files ===
    embed_uploads(params, uploads, &mut bundle, &mut warnings, reporter);

    // === Phase 2: Templates ===
    reporter.report(Progress::PhaseStart {
        phase: Phase::Templates,
        files: RENDERED_ARTIFACTS,
    });
    render_templates(params, uploads, &mut bundle, &mut warnings, reporter)?;
    reporter.report(Progress::PhaseFinish {
        phase: Phase::Templates,
    });

    // === Phase 3: Auxiliary files ===
    collect_auxiliary_files(params, uploads, fallback, &mut bundle, &mut warnings, reporter);

    info!(
        "Generated {} file(s) with {} warning(s).",
        bundle.len(),
        warnings.len()
    );
    Ok(GenerationReport { bundle, warnings })
}

fn embed_uploads(
    params: &ParameterRecord,
    uploads: &Uploads,
    bundle: &mut OutputBundle,
    warnings: &mut Vec<GenerationWarning>,
    reporter: &ProgressReporter,
) {
    let placements: Vec<(UploadKind, Vec<String>)> = uploads
        .kinds()
        .map(|kind| (kind, upload_targets(params, kind)))
        .collect();
    reporter.report(Progress::PhaseStart {
        phase: Phase::Uploads,
        files: placements.iter().map(|(_, t)| t.len() as u64).sum(),
    });

    for (kind, targets) in placements {
        let Some(bytes) = uploads.get(kind) else {
            continue;
        };
        let content = if kind.is_text() {
            let (text, encoding) = decode_text(bytes);
            if encoding == TextEncoding::Latin1 {
                warn!("Uploaded {} file is not valid UTF-8; decoding as Latin-1.", kind);
                warnings.push(GenerationWarning::Latin1Fallback { upload: kind });
            }
            FileContent::Text(text)
        } else {
            FileContent::Base64(encode_base64(bytes))
        };

        debug!("Embedding uploaded {} file at {:?}", kind, targets);
        for target in targets {
            reporter.file(&target, FileOrigin::Uploaded);
            bundle.insert(target, content.clone());
        }
    }
    reporter.report(Progress::PhaseFinish {
        phase: Phase::Uploads,
    });
}

/// Bundle paths an upload occupies. Restart files go to one place, everything
/// else is mirrored into both run directories.
fn upload_targets(params: &ParameterRecord, kind: UploadKind) -> Vec<String> {
    let p = &params.protein_name;
    match kind {
        UploadKind::Rst if params.rst_as_bstate => vec!["bstates/bstate.rst".to_string()],
        UploadKind::Rst => vec![format!("cMD/{}.rst", p)],
        _ => ["common_files", "cMD"]
            .iter()
            .map(|dir| format!("{}/{}.{}", dir, p, kind.extension()))
            .collect(),
    }
}

fn render_templates(
    params: &ParameterRecord,
    uploads: &Uploads,
    bundle: &mut OutputBundle,
    warnings: &mut Vec<GenerationWarning>,
    reporter: &ProgressReporter,
) -> Result<(), GeneratorError> {
    if params.ntpr <= 0 {
        warn!("ntpr = {} is not positive; using 1.", params.ntpr);
        warnings.push(GenerationWarning::NonPositiveNtpr { ntpr: params.ntpr });
    }

    let mut boundaries: Vec<BinBoundaries> = Vec::with_capacity(params.cvs.len());
    let mut renderings: Vec<CvRendering> = Vec::with_capacity(params.cvs.len());
    for (index, cv) in params.cvs.iter().enumerate() {
        let (step, substituted) = normalize_step(cv.step);
        if substituted {
            warn!("CV {} has non-positive step {}; using {}.", index + 1, cv.step, step);
            warnings.push(GenerationWarning::NonPositiveStep {
                cv_index: index,
                step: cv.step,
                substituted: step,
            });
        }
        boundaries.push(generate_bin_boundaries(
            cv.min,
            cv.max,
            step,
            params.include_infinite_bounds,
        ));

        let (cv_name, output_file) = cv.output_naming(index);
        if cv.cv_type.kind().is_none() {
            warn!(
                "CV {} has unrecognized type '{}'; using the RMSD command.",
                index + 1,
                cv.cv_type.name()
            );
            warnings.push(GenerationWarning::UnrecognizedCvType {
                cv_index: index,
                cv_type: cv.cv_type.name().to_string(),
            });
        } else if cv.cv_type.is_custom() {
            warn!("CV {} ('{}') is custom and needs a cpptraj command.", index + 1, cv_name);
            warnings.push(GenerationWarning::CustomCvNeedsCommand {
                cv_index: index,
                cv_name: cv_name.clone(),
            });
        }
        renderings.push(CvRendering {
            command: cpptraj_command(&cv.cv_type, &output_file, &cv_name),
            cv_name,
            output_file,
        });
    }

    let pcoord_ndim = params.pcoord_ndim();
    if boundaries.len() != pcoord_ndim || renderings.len() != pcoord_ndim {
        return Err(GeneratorError::Inconsistent(format!(
            "pcoord_ndim is {} but {} boundary list(s) and {} CV output(s) were rendered",
            pcoord_ndim,
            boundaries.len(),
            renderings.len()
        )));
    }

    let analysis = AnalysisContext {
        protein_name: &params.protein_name,
        cvs: &renderings,
        has_pdb_file: uploads.contains(UploadKind::Pdb),
    };
    let job = slurm::JobContext {
        protein_name: &params.protein_name,
        account: &params.account,
        email: &params.email,
        scheduler: &params.scheduler,
    };

    let rendered = [
        (
            templates::WEST_CFG,
            west_cfg::render(&west_cfg::WestCfgContext {
                pcoord_ndim,
                pcoord_len: params.pcoord_len(),
                boundaries: &boundaries,
                bin_target_counts: params.bin_target_counts,
                max_total_iterations: params.max_total_iterations,
            }),
        ),
        (templates::ENV_SH, env_sh::render()),
        (
            templates::RUNSEG_SH,
            runseg::render(&runseg::RunsegContext {
                analysis,
                enable_gpu_parallelization: params.enable_gpu_parallelization,
            }),
        ),
        (templates::RUN_CMD_SH, slurm::render_run_cmd(&job)),
        (templates::RUN_WE_SH, slurm::render_run_we(&job)),
        (templates::GET_PCOORD_SH, get_pcoord::render(&analysis)),
    ];
    for (path, content) in rendered {
        debug!("Rendered {}", path);
        reporter.file(path, FileOrigin::Rendered);
        bundle.insert(path, content);
    }
    Ok(())
}

fn collect_auxiliary_files<F: FallbackSource + ?Sized>(
    params: &ParameterRecord,
    uploads: &Uploads,
    fallback: &F,
    bundle: &mut OutputBundle,
    warnings: &mut Vec<GenerationWarning>,
    reporter: &ProgressReporter,
) {
    let files = auxiliary_files(&params.protein_name, uploads, params.rst_as_bstate);
    reporter.report(Progress::PhaseStart {
        phase: Phase::Auxiliary,
        files: files.len() as u64,
    });
    for file in files {
        if bundle.contains(&file.path) {
            reporter.file(&file.path, FileOrigin::Uploaded);
            continue;
        }
        match fallback.read(&file.path) {
            Some(content) => {
                reporter.file(&file.path, FileOrigin::Existing);
                bundle.insert(file.path.as_str(), content);
            }
            None => {
                debug!("No existing '{}'; writing a placeholder.", file.path);
                reporter.file(&file.path, FileOrigin::Placeholder);
                bundle.insert(file.path.as_str(), file.placeholder());
                warnings.push(GenerationWarning::PlaceholderSynthesized { path: file.path });
            }
        }
    }
    reporter.report(Progress::PhaseFinish {
        phase: Phase::Auxiliary,
    });
}
