//! Multi-step form state kept by front ends between requests.
//!
//! A [`Session`] walks through six [`WizardStep`]s. Forward transitions are
//! gated on the data each step collects; the bundle is generated when the
//! review step is entered and can then be edited file by file.

use crate::core::auxiliary::FallbackSource;
use crate::core::bundle::{FileContent, OutputBundle};
use crate::core::cv::{CvKind, CvSpec};
use crate::core::uploads::{UploadKind, Uploads};
use crate::engine::config::{ConfigError, ParameterRecord, ParameterRecordBuilder, SchedulerOptions};
use crate::engine::diagnostics::GenerationWarning;
use crate::engine::error::GeneratorError;
use crate::workflows::generate::generate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    SystemSetup,
    MolecularSystem,
    WeParameters,
    GpuOptions,
    Review,
    Download,
}

impl WizardStep {
    /// 1-based position shown to users.
    pub fn number(&self) -> u8 {
        match self {
            WizardStep::SystemSetup => 1,
            WizardStep::MolecularSystem => 2,
            WizardStep::WeParameters => 3,
            WizardStep::GpuOptions => 4,
            WizardStep::Review => 5,
            WizardStep::Download => 6,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::SystemSetup => "System Setup",
            WizardStep::MolecularSystem => "Molecular System",
            WizardStep::WeParameters => "WE Parameters",
            WizardStep::GpuOptions => "GPU Options",
            WizardStep::Review => "Review & Edit",
            WizardStep::Download => "Download",
        }
    }

    pub fn next(&self) -> Option<WizardStep> {
        match self {
            WizardStep::SystemSetup => Some(WizardStep::MolecularSystem),
            WizardStep::MolecularSystem => Some(WizardStep::WeParameters),
            WizardStep::WeParameters => Some(WizardStep::GpuOptions),
            WizardStep::GpuOptions => Some(WizardStep::Review),
            WizardStep::Review => Some(WizardStep::Download),
            WizardStep::Download => None,
        }
    }

    pub fn previous(&self) -> Option<WizardStep> {
        match self {
            WizardStep::SystemSetup => None,
            WizardStep::MolecularSystem => Some(WizardStep::SystemSetup),
            WizardStep::WeParameters => Some(WizardStep::MolecularSystem),
            WizardStep::GpuOptions => Some(WizardStep::WeParameters),
            WizardStep::Review => Some(WizardStep::GpuOptions),
            WizardStep::Download => Some(WizardStep::Review),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Cannot leave '{step}': {missing} is required")]
    StepIncomplete {
        step: &'static str,
        missing: &'static str,
    },

    #[error("The first collective variable is required and cannot be removed")]
    RequiredCv,

    #[error("No collective variable at index {0}")]
    CvOutOfRange(usize),

    #[error("No file '{0}' in the generated bundle")]
    UnknownFile(String),

    #[error("'{0}' is a binary upload and cannot be edited as text")]
    BinaryFile(String),

    #[error("Nothing has been generated yet")]
    NotGenerated,

    #[error(transparent)]
    Generation(#[from] GeneratorError),
}

impl From<ConfigError> for SessionError {
    fn from(e: ConfigError) -> Self {
        SessionError::Generation(e.into())
    }
}

/// Raw form values as entered; validated only when a record is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormDraft {
    pub account: String,
    pub email: String,
    pub protein_name: String,
    pub bin_target_counts: u32,
    pub max_total_iterations: u64,
    pub nstlim: u64,
    pub ntpr: i64,
    pub include_infinite_bounds: bool,
    pub enable_gpu_parallelization: bool,
    pub rst_as_bstate: bool,
    pub cvs: Vec<CvSpec>,
    pub scheduler: SchedulerOptions,
}

impl Default for FormDraft {
    fn default() -> Self {
        Self {
            account: String::new(),
            email: String::new(),
            protein_name: "chignolin".to_string(),
            bin_target_counts: 4,
            max_total_iterations: 1000,
            nstlim: 50_000,
            ntpr: 500,
            include_infinite_bounds: true,
            enable_gpu_parallelization: false,
            rst_as_bstate: false,
            cvs: vec![CvSpec::default().with_name("PC1")],
            scheduler: SchedulerOptions::default(),
        }
    }
}

impl FormDraft {
    pub fn to_record(&self) -> Result<ParameterRecord, ConfigError> {
        ParameterRecordBuilder::new()
            .account(self.account.as_str())
            .email(self.email.as_str())
            .protein_name(self.protein_name.as_str())
            .bin_target_counts(self.bin_target_counts)
            .max_total_iterations(self.max_total_iterations)
            .nstlim(self.nstlim)
            .ntpr(self.ntpr)
            .include_infinite_bounds(self.include_infinite_bounds)
            .enable_gpu_parallelization(self.enable_gpu_parallelization)
            .rst_as_bstate(self.rst_as_bstate)
            .cvs(self.cvs.clone())
            .scheduler(self.scheduler.clone())
            .build()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    step: WizardStep,
    form: FormDraft,
    uploads: Uploads,
    generated: Option<OutputBundle>,
    warnings: Vec<GenerationWarning>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn form(&self) -> &FormDraft {
        &self.form
    }

    pub fn uploads(&self) -> &Uploads {
        &self.uploads
    }

    pub fn generated(&self) -> Option<&OutputBundle> {
        self.generated.as_ref()
    }

    pub fn warnings(&self) -> &[GenerationWarning] {
        &self.warnings
    }

    /// Replaces the form. Any generated bundle is discarded as stale.
    pub fn set_form(&mut self, form: FormDraft) {
        self.form = form;
        self.invalidate();
    }

    pub fn set_upload(&mut self, kind: UploadKind, bytes: impl Into<Vec<u8>>) {
        self.uploads.insert(kind, bytes);
        self.invalidate();
    }

    pub fn remove_upload(&mut self, kind: UploadKind) -> bool {
        let removed = self.uploads.remove(kind).is_some();
        if removed {
            self.invalidate();
        }
        removed
    }

    /// Appends a radius-of-gyration CV named after its position.
    pub fn add_cv(&mut self) -> usize {
        let n = self.form.cvs.len() + 1;
        self.form
            .cvs
            .push(CvSpec::new(CvKind::RadiusGyration, 0.0, 8.0, 0.2).with_name(format!("PC{}", n)));
        self.invalidate();
        n
    }

    pub fn remove_cv(&mut self, index: usize) -> Result<CvSpec, SessionError> {
        if index == 0 {
            return Err(SessionError::RequiredCv);
        }
        if index >= self.form.cvs.len() {
            return Err(SessionError::CvOutOfRange(index));
        }
        self.invalidate();
        Ok(self.form.cvs.remove(index))
    }

    /// Moves one step forward if the current step is complete.
    ///
    /// Entering the review step generates the bundle when none exists yet. The
    /// download step is terminal and advancing from it is a no-op.
    pub fn advance<F: FallbackSource + ?Sized>(
        &mut self,
        fallback: &F,
    ) -> Result<WizardStep, SessionError> {
        let Some(next) = self.step.next() else {
            return Ok(self.step);
        };
        self.check_complete()?;
        if next == WizardStep::Review && self.generated.is_none() {
            self.regenerate(fallback)?;
        }
        debug!("Session advancing from {:?} to {:?}", self.step, next);
        self.step = next;
        Ok(next)
    }

    pub fn back(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    /// Returns to the first step with an empty draft.
    pub fn reset(&mut self) {
        *self = Session::new();
    }

    /// Renders a fresh bundle from the current form and uploads, discarding edits.
    pub fn regenerate<F: FallbackSource + ?Sized>(
        &mut self,
        fallback: &F,
    ) -> Result<&OutputBundle, SessionError> {
        let record = self.form.to_record()?;
        let report = generate(&record, &self.uploads, fallback)?;
        info!("Session bundle generated with {} file(s).", report.bundle.len());
        self.warnings = report.warnings;
        Ok(self.generated.insert(report.bundle))
    }

    /// Replaces the text of one generated file. Base64 entries hold uploaded
    /// binaries and are refused.
    pub fn edit_file(&mut self, path: &str, content: impl Into<String>) -> Result<(), SessionError> {
        let bundle = self.generated.as_mut().ok_or(SessionError::NotGenerated)?;
        match bundle.get(path) {
            None => return Err(SessionError::UnknownFile(path.to_string())),
            Some(existing) if existing.is_binary() => {
                return Err(SessionError::BinaryFile(path.to_string()));
            }
            Some(_) => {}
        }
        bundle.insert(path, content.into());
        Ok(())
    }

    /// Restores one file to its freshly rendered content, keeping other edits.
    pub fn reset_file<F: FallbackSource + ?Sized>(
        &mut self,
        path: &str,
        fallback: &F,
    ) -> Result<&FileContent, SessionError> {
        if self.generated.is_none() {
            return Err(SessionError::NotGenerated);
        }
        let record = self.form.to_record()?;
        let mut fresh = generate(&record, &self.uploads, fallback)?.bundle;
        let content = fresh
            .remove(path)
            .ok_or_else(|| SessionError::UnknownFile(path.to_string()))?;
        let bundle = self.generated.as_mut().ok_or(SessionError::NotGenerated)?;
        bundle.insert(path, content);
        bundle
            .get(path)
            .ok_or_else(|| SessionError::UnknownFile(path.to_string()))
    }

    fn check_complete(&self) -> Result<(), SessionError> {
        let step = self.step.title();
        let require = |ok: bool, missing: &'static str| {
            if ok {
                Ok(())
            } else {
                Err(SessionError::StepIncomplete { step, missing })
            }
        };
        match self.step {
            WizardStep::SystemSetup => {
                require(!self.form.account.trim().is_empty(), "account")?;
                require(!self.form.email.trim().is_empty(), "email")
            }
            WizardStep::MolecularSystem => {
                require(!self.form.protein_name.trim().is_empty(), "protein name")?;
                require(self.uploads.contains(UploadKind::Pdb), "a PDB upload")?;
                require(self.uploads.contains(UploadKind::Prmtop), "a PRMTOP upload")
            }
            WizardStep::WeParameters => {
                require(!self.form.cvs.is_empty(), "at least one collective variable")
            }
            WizardStep::GpuOptions => Ok(()),
            WizardStep::Review => require(self.generated.is_some(), "a generated bundle"),
            WizardStep::Download => Ok(()),
        }
    }

    fn invalidate(&mut self) {
        self.generated = None;
        self.warnings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auxiliary::NoFallback;
    use crate::core::templates;

    fn session_at_review() -> Session {
        let mut session = Session::new();
        session.set_form(FormDraft {
            account: "abc123".to_string(),
            email: "me@example.org".to_string(),
            ..FormDraft::default()
        });
        session.set_upload(UploadKind::Pdb, b"ATOM\n".to_vec());
        session.set_upload(UploadKind::Prmtop, vec![1u8, 2, 3]);
        for _ in 0..4 {
            session.advance(&NoFallback).unwrap();
        }
        assert_eq!(session.step(), WizardStep::Review);
        session
    }

    #[test]
    fn first_step_requires_account_and_email() {
        let mut session = Session::new();
        let err = session.advance(&NoFallback).unwrap_err();
        assert!(matches!(err, SessionError::StepIncomplete { missing: "account", .. }));

        let mut form = session.form().clone();
        form.account = "abc123".to_string();
        session.set_form(form);
        let err = session.advance(&NoFallback).unwrap_err();
        assert!(matches!(err, SessionError::StepIncomplete { missing: "email", .. }));
        assert_eq!(session.step(), WizardStep::SystemSetup);
    }

    #[test]
    fn second_step_requires_pdb_and_prmtop() {
        let mut session = Session::new();
        session.set_form(FormDraft {
            account: "a".to_string(),
            email: "e".to_string(),
            ..FormDraft::default()
        });
        assert_eq!(session.advance(&NoFallback).unwrap(), WizardStep::MolecularSystem);

        session.set_upload(UploadKind::Pdb, b"ATOM\n".to_vec());
        let err = session.advance(&NoFallback).unwrap_err();
        assert!(matches!(err, SessionError::StepIncomplete { missing: "a PRMTOP upload", .. }));

        session.set_upload(UploadKind::Prmtop, vec![0u8]);
        assert_eq!(session.advance(&NoFallback).unwrap(), WizardStep::WeParameters);
    }

    #[test]
    fn entering_review_generates_and_download_is_terminal() {
        let mut session = session_at_review();
        let bundle = session.generated().unwrap();
        assert!(bundle.contains(templates::WEST_CFG));
        assert!(bundle.contains("common_files/chignolin.pdb"));

        assert_eq!(session.advance(&NoFallback).unwrap(), WizardStep::Download);
        assert_eq!(session.advance(&NoFallback).unwrap(), WizardStep::Download);
        assert_eq!(session.back(), WizardStep::Review);
    }

    #[test]
    fn back_stops_at_first_step_and_reset_clears_everything() {
        let mut session = session_at_review();
        session.back();
        session.back();
        session.back();
        session.back();
        assert_eq!(session.back(), WizardStep::SystemSetup);

        session.reset();
        assert_eq!(session.step(), WizardStep::SystemSetup);
        assert_eq!(session.form(), &FormDraft::default());
        assert!(session.uploads().is_empty());
        assert!(session.generated().is_none());
    }

    #[test]
    fn cv_list_editing_keeps_the_first_cv() {
        let mut session = Session::new();
        assert_eq!(session.add_cv(), 2);
        assert_eq!(session.form().cvs[1].name.as_deref(), Some("PC2"));
        assert_eq!(session.form().cvs[1].cv_type, CvKind::RadiusGyration.into());

        assert!(matches!(session.remove_cv(0), Err(SessionError::RequiredCv)));
        assert!(matches!(session.remove_cv(5), Err(SessionError::CvOutOfRange(5))));
        session.remove_cv(1).unwrap();
        assert_eq!(session.form().cvs.len(), 1);
    }

    #[test]
    fn edits_survive_until_reset_file_or_regenerate() {
        let mut session = session_at_review();
        session.edit_file(templates::ENV_SH, "#!/bin/bash\n# edited\n").unwrap();
        session.edit_file(templates::RUN_WE_SH, "edited too").unwrap();

        let restored = session.reset_file(templates::ENV_SH, &NoFallback).unwrap();
        assert!(restored.as_str().contains("export CPPTRAJ="));
        let bundle = session.generated().unwrap();
        assert_eq!(bundle.text(templates::RUN_WE_SH), Some("edited too"));

        session.regenerate(&NoFallback).unwrap();
        assert_ne!(session.generated().unwrap().text(templates::RUN_WE_SH), Some("edited too"));
    }

    #[test]
    fn editing_unknown_file_is_rejected() {
        let mut session = session_at_review();
        assert!(matches!(
            session.edit_file("nope.txt", ""),
            Err(SessionError::UnknownFile(_))
        ));
        assert!(matches!(
            Session::new().edit_file(templates::ENV_SH, ""),
            Err(SessionError::NotGenerated)
        ));
    }

    #[test]
    fn binary_uploads_keep_their_encoding() {
        let mut session = session_at_review();
        let path = "common_files/chignolin.prmtop";
        let before = session.generated().unwrap().get(path).cloned().unwrap();
        assert!(before.is_binary());

        assert!(matches!(
            session.edit_file(path, "AQID edited"),
            Err(SessionError::BinaryFile(p)) if p == path
        ));
        let after = session.generated().unwrap().get(path).unwrap();
        assert_eq!(after, &before);
        assert_eq!(after.to_bytes().unwrap(), vec![1u8, 2, 3]);
    }

    #[test]
    fn changing_the_form_discards_the_bundle() {
        let mut session = session_at_review();
        let mut form = session.form().clone();
        form.enable_gpu_parallelization = true;
        session.set_form(form);
        assert!(session.generated().is_none());
        assert!(matches!(
            session.advance(&NoFallback),
            Err(SessionError::StepIncomplete { missing: "a generated bundle", .. })
        ));
    }
}
