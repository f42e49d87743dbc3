use crate::error::{CliError, Result};
use pargamd::core::cv::CvSpec;
use pargamd::engine::config::SchedulerOptions;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSimulationConfig {
    pub bin_target_counts: Option<u32>,
    pub max_total_iterations: Option<u64>,
    pub nstlim: Option<u64>,
    pub ntpr: Option<i64>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileCvConfig {
    #[serde(rename = "type")]
    pub cv_type: String,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub name: Option<String>,
}

impl From<FileCvConfig> for CvSpec {
    fn from(f: FileCvConfig) -> Self {
        let spec = CvSpec::new(f.cv_type, f.min, f.max, f.step);
        match f.name {
            Some(name) => spec.with_name(name),
            None => spec,
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSchedulerConfig {
    pub partition: Option<String>,
    pub nodes: Option<u32>,
    pub gpus: Option<u32>,
    pub ntasks_per_node: Option<u32>,
    pub memory: Option<String>,
    pub wall_time: Option<String>,
}

impl FileSchedulerConfig {
    pub fn into_options(self) -> SchedulerOptions {
        let defaults = SchedulerOptions::default();
        SchedulerOptions {
            partition: self.partition.unwrap_or(defaults.partition),
            nodes: self.nodes.unwrap_or(defaults.nodes),
            gpus: self.gpus.unwrap_or(defaults.gpus),
            ntasks_per_node: self.ntasks_per_node.unwrap_or(defaults.ntasks_per_node),
            memory: self.memory.unwrap_or(defaults.memory),
            wall_time: self.wall_time.unwrap_or(defaults.wall_time),
        }
    }
}

/// The parameter file as written; every field may be absent.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub account: Option<String>,
    pub email: Option<String>,
    pub protein_name: Option<String>,
    pub enable_gpu_parallelization: Option<bool>,
    pub include_infinite_bounds: Option<bool>,
    pub rst_as_bstate: Option<bool>,
    pub simulation: Option<FileSimulationConfig>,
    #[serde(rename = "cv")]
    pub cvs: Option<Vec<FileCvConfig>>,
    pub scheduler: Option<FileSchedulerConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading parameters from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pargamd::core::cv::{CvKind, CvType};

    #[test]
    fn parses_a_complete_file() {
        let config: FileConfig = toml::from_str(
            r#"
            account = "abc123"
            email = "me@example.org"
            protein-name = "villin"
            enable-gpu-parallelization = true

            [simulation]
            bin-target-counts = 8
            ntpr = 250

            [[cv]]
            type = "rmsd"
            min = 0.0
            max = 8.0
            step = 0.2

            [[cv]]
            type = "custom"
            min = 0.0
            max = 1.0
            step = 0.05
            name = "twist"

            [scheduler]
            wall-time = "24:00:00"
            "#,
        )
        .unwrap();

        assert_eq!(config.protein_name.as_deref(), Some("villin"));
        let simulation = config.simulation.unwrap();
        assert_eq!(simulation.bin_target_counts, Some(8));
        assert_eq!(simulation.nstlim, None);

        let cvs: Vec<CvSpec> = config.cvs.unwrap().into_iter().map(Into::into).collect();
        assert_eq!(cvs[0].cv_type, CvType::Known(CvKind::Rmsd));
        assert_eq!(cvs[1].name.as_deref(), Some("twist"));

        let scheduler = config.scheduler.unwrap().into_options();
        assert_eq!(scheduler.wall_time, "24:00:00");
        assert_eq!(scheduler.partition, "gpu-shared");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: std::result::Result<FileConfig, _> = toml::from_str("acount = \"typo\"");
        assert!(result.is_err());

        let result: std::result::Result<FileConfig, _> =
            toml::from_str("[simulation]\nnstlim = 10\nsteps = 3\n");
        assert!(result.is_err());
    }

    #[test]
    fn from_file_reports_the_path_on_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "account = [").unwrap();
        let err = FileConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, CliError::FileParsing { path: p, .. } if p == path));
    }
}
