use crate::core::bins::{MAX_BIN_EDGES, edge_count};
use crate::core::cv::CvSpec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("At least one collective variable is required")]
    NoCollectiveVariables,
}

/// `#SBATCH` resources requested by the generated job-submission scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SchedulerOptions {
    pub partition: String,
    pub nodes: u32,
    pub gpus: u32,
    pub ntasks_per_node: u32,
    pub memory: String,
    pub wall_time: String,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            partition: "gpu-shared".to_string(),
            nodes: 1,
            gpus: 1,
            ntasks_per_node: 1,
            memory: "50G".to_string(),
            wall_time: "48:00:00".to_string(),
        }
    }
}

/// Everything needed to render a bundle, validated once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRecord {
    pub account: String,
    pub email: String,
    pub protein_name: String,
    pub bin_target_counts: u32,
    pub max_total_iterations: u64,
    pub nstlim: u64,
    /// Output frequency in MD steps. Non-positive values are clamped to 1 at
    /// generation time.
    pub ntpr: i64,
    pub include_infinite_bounds: bool,
    pub enable_gpu_parallelization: bool,
    /// Place an uploaded restart file as the WE basis state instead of the
    /// conventional-MD restart.
    pub rst_as_bstate: bool,
    pub cvs: Vec<CvSpec>,
    pub scheduler: SchedulerOptions,
}

impl ParameterRecord {
    /// The output frequency actually used: `ntpr` clamped to at least 1.
    pub fn effective_ntpr(&self) -> u64 {
        self.ntpr.max(1) as u64
    }

    pub fn pcoord_len(&self) -> u64 {
        crate::core::bins::pcoord_len(self.nstlim, self.effective_ntpr())
    }

    pub fn pcoord_ndim(&self) -> usize {
        self.cvs.len()
    }
}

#[derive(Default, Debug, Clone)]
pub struct ParameterRecordBuilder {
    account: Option<String>,
    email: Option<String>,
    protein_name: Option<String>,
    bin_target_counts: Option<u32>,
    max_total_iterations: Option<u64>,
    nstlim: Option<u64>,
    ntpr: Option<i64>,
    include_infinite_bounds: Option<bool>,
    enable_gpu_parallelization: Option<bool>,
    rst_as_bstate: Option<bool>,
    cvs: Option<Vec<CvSpec>>,
    scheduler: Option<SchedulerOptions>,
}

impl ParameterRecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
    pub fn protein_name(mut self, name: impl Into<String>) -> Self {
        self.protein_name = Some(name.into());
        self
    }
    pub fn bin_target_counts(mut self, count: u32) -> Self {
        self.bin_target_counts = Some(count);
        self
    }
    pub fn max_total_iterations(mut self, iterations: u64) -> Self {
        self.max_total_iterations = Some(iterations);
        self
    }
    pub fn nstlim(mut self, steps: u64) -> Self {
        self.nstlim = Some(steps);
        self
    }
    pub fn ntpr(mut self, frequency: i64) -> Self {
        self.ntpr = Some(frequency);
        self
    }
    pub fn include_infinite_bounds(mut self, include: bool) -> Self {
        self.include_infinite_bounds = Some(include);
        self
    }
    pub fn enable_gpu_parallelization(mut self, enable: bool) -> Self {
        self.enable_gpu_parallelization = Some(enable);
        self
    }
    pub fn rst_as_bstate(mut self, as_bstate: bool) -> Self {
        self.rst_as_bstate = Some(as_bstate);
        self
    }
    pub fn cvs(mut self, cvs: Vec<CvSpec>) -> Self {
        self.cvs = Some(cvs);
        self
    }
    pub fn cv(mut self, cv: CvSpec) -> Self {
        self.cvs.get_or_insert_with(Vec::new).push(cv);
        self
    }
    pub fn scheduler(mut self, scheduler: SchedulerOptions) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn build(self) -> Result<ParameterRecord, ConfigError> {
        let account = non_blank(
            "account",
            self.account.ok_or(ConfigError::MissingParameter("account"))?,
        )?;
        let email = non_blank(
            "email",
            self.email.ok_or(ConfigError::MissingParameter("email"))?,
        )?;
        let protein_name = validate_protein_name(
            self.protein_name
                .ok_or(ConfigError::MissingParameter("protein_name"))?,
        )?;

        let cvs = self.cvs.unwrap_or_else(|| vec![CvSpec::default()]);
        if cvs.is_empty() {
            return Err(ConfigError::NoCollectiveVariables);
        }
        for (index, cv) in cvs.iter().enumerate() {
            validate_cv_range(index, cv)?;
        }

        Ok(ParameterRecord {
            account,
            email,
            protein_name,
            bin_target_counts: self
                .bin_target_counts
                .ok_or(ConfigError::MissingParameter("bin_target_counts"))?,
            max_total_iterations: self
                .max_total_iterations
                .ok_or(ConfigError::MissingParameter("max_total_iterations"))?,
            nstlim: self
                .nstlim
                .ok_or(ConfigError::MissingParameter("nstlim"))?,
            ntpr: self.ntpr.ok_or(ConfigError::MissingParameter("ntpr"))?,
            include_infinite_bounds: self.include_infinite_bounds.unwrap_or(true),
            enable_gpu_parallelization: self
                .enable_gpu_parallelization
                .ok_or(ConfigError::MissingParameter("enable_gpu_parallelization"))?,
            rst_as_bstate: self.rst_as_bstate.unwrap_or(false),
            cvs,
            scheduler: self.scheduler.unwrap_or_default(),
        })
    }
}

fn non_blank(name: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidParameter {
            name,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn validate_cv_range(index: usize, cv: &CvSpec) -> Result<(), ConfigError> {
    if !cv.min.is_finite() || !cv.max.is_finite() {
        return Err(ConfigError::InvalidParameter {
            name: "cvs",
            reason: format!("CV {} has a non-finite range [{}, {}]", index + 1, cv.min, cv.max),
        });
    }
    if edge_count(cv.min, cv.max, cv.step).is_none() {
        return Err(ConfigError::InvalidParameter {
            name: "cvs",
            reason: format!(
                "CV {} range [{}, {}] with step {} needs more than {} bin edges",
                index + 1,
                cv.min,
                cv.max,
                cv.step,
                MAX_BIN_EDGES
            ),
        });
    }
    Ok(())
}

/// The protein name becomes part of several file names, so it has to be a
/// single plain path component.
fn validate_protein_name(name: String) -> Result<String, ConfigError> {
    let name = non_blank("protein_name", name)?;
    if name == "." || name == ".." || name.contains(['/', '\\']) || name.contains(char::is_whitespace) {
        return Err(ConfigError::InvalidParameter {
            name: "protein_name",
            reason: format!("'{}' must be a single file-name component without whitespace", name),
        });
    }
    Ok(name)
}
