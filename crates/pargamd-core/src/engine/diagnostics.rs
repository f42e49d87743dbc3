use crate::core::uploads::UploadKind;
use serde::Serialize;
use std::fmt;

/// A questionable input the generator recovered from instead of failing.
///
/// The bundle is still produced, but front ends should show these so the user
/// can tell when the output does not reflect what they entered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationWarning {
    /// A CV step was zero, negative or not a number and was replaced.
    NonPositiveStep { cv_index: usize, step: f64, substituted: f64 },
    /// `ntpr` was not positive and was clamped to 1.
    NonPositiveNtpr { ntpr: i64 },
    /// A CV type was not recognized; the RMSD command was used instead.
    UnrecognizedCvType { cv_index: usize, cv_type: String },
    /// A custom CV only received a commented stub that must be edited.
    CustomCvNeedsCommand { cv_index: usize, cv_name: String },
    /// An uploaded text file was not valid UTF-8 and was read as Latin-1.
    Latin1Fallback { upload: UploadKind },
    /// No existing auxiliary file was found, so a stub was written instead.
    PlaceholderSynthesized { path: String },
}

impl GenerationWarning {
    /// Placeholders are expected for most fresh bundles; everything else points
    /// at user input that was altered or left incomplete.
    pub fn is_routine(&self) -> bool {
        matches!(self, GenerationWarning::PlaceholderSynthesized { .. })
    }
}

impl fmt::Display for GenerationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationWarning::NonPositiveStep {
                cv_index,
                step,
                substituted,
            } => write!(
                f,
                "CV {} has non-positive step {}; using {} instead",
                cv_index + 1,
                step,
                substituted
            ),
            GenerationWarning::NonPositiveNtpr { ntpr } => {
                write!(f, "ntpr = {} is not positive; using 1 instead", ntpr)
            }
            GenerationWarning::UnrecognizedCvType { cv_index, cv_type } => write!(
                f,
                "CV {} has unrecognized type '{}'; generated an RMSD command instead",
                cv_index + 1,
                cv_type
            ),
            GenerationWarning::CustomCvNeedsCommand { cv_index, cv_name } => write!(
                f,
                "CV {} ('{}') is custom; edit the generated scripts to supply its cpptraj command",
                cv_index + 1,
                cv_name
            ),
            GenerationWarning::Latin1Fallback { upload } => write!(
                f,
                "uploaded {} file is not valid UTF-8; decoded as Latin-1",
                upload
            ),
            GenerationWarning::PlaceholderSynthesized { path } => {
                write!(f, "no existing '{}' found; wrote a placeholder", path)
            }
        }
    }
}
