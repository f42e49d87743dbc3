//! Structured renderers for every generated artifact.
//!
//! Each submodule owns one output file and exposes a `render` function taking a
//! typed context. Pieces that must agree across files (the per-CV `cpptraj`
//! lines, the reference structure, the progress-coordinate extraction) are
//! built here once and shared.

pub mod env_sh;
pub mod get_pcoord;
pub mod runseg;
pub mod slurm;
pub mod west_cfg;

pub const WEST_CFG: &str = "west.cfg";
pub const ENV_SH: &str = "env.sh";
pub const RUNSEG_SH: &str = "westpa_scripts/runseg.sh";
pub const GET_PCOORD_SH: &str = "westpa_scripts/get_pcoord.sh";
pub const RUN_CMD_SH: &str = "cMD/run_cmd.sh";
pub const RUN_WE_SH: &str = "run_WE.sh";

/// One CV as it appears in the analysis scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CvRendering {
    pub cv_name: String,
    pub output_file: String,
    pub command: String,
}

/// Shared inputs of the two scripts that run `cpptraj` to compute the
/// progress coordinate.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub protein_name: &'a str,
    pub cvs: &'a [CvRendering],
    /// Use the uploaded PDB as the `cpptraj` reference; otherwise the inpcrd.
    pub has_pdb_file: bool,
}

impl AnalysisContext<'_> {
    pub(crate) fn reference_file(&self) -> String {
        let extension = if self.has_pdb_file { "pdb" } else { "inpcrd" };
        format!(
            "$WEST_SIM_ROOT/common_files/{}.{}",
            self.protein_name, extension
        )
    }

    pub(crate) fn commands(&self) -> String {
        self.cvs
            .iter()
            .map(|cv| cv.command.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Shell line that feeds the second column of each CV output (after
    /// `tail {tail_arg}`) into `$WEST_PCOORD_RETURN`, one column per CV.
    pub(crate) fn extraction(&self, tail_arg: &str) -> String {
        let column = |file: &str| format!("cat {} | tail {} | awk {{'print $2'}}", file, tail_arg);
        match self.cvs {
            [single] => format!("{} > $WEST_PCOORD_RETURN", column(&single.output_file)),
            many => {
                let sources: Vec<String> = many
                    .iter()
                    .map(|cv| format!("<({})", column(&cv.output_file)))
                    .collect();
                format!("paste {} >$WEST_PCOORD_RETURN", sources.join(" "))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::CvRendering;

    pub fn rendering(output_file: &str) -> CvRendering {
        CvRendering {
            cv_name: "CV1".to_string(),
            output_file: output_file.to_string(),
            command: format!(
                r#"COMMAND="${{COMMAND}} rms ca-rmsd @CA reference out {} mass\n""#,
                output_file
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::rendering;
    use super::*;

    #[test]
    fn single_cv_extraction_redirects_directly() {
        let cvs = [rendering("rmsd_1.dat")];
        let ctx = AnalysisContext {
            protein_name: "p",
            cvs: &cvs,
            has_pdb_file: true,
        };
        assert_eq!(
            ctx.extraction("-n +2"),
            "cat rmsd_1.dat | tail -n +2 | awk {'print $2'} > $WEST_PCOORD_RETURN"
        );
    }

    #[test]
    fn multi_cv_extraction_pastes_one_column_per_cv() {
        let cvs = [rendering("rmsd_1.dat"), rendering("hbond_2.dat")];
        let ctx = AnalysisContext {
            protein_name: "p",
            cvs: &cvs,
            has_pdb_file: false,
        };
        let line = ctx.extraction("-n 1");
        assert!(line.starts_with("paste <(cat rmsd_1.dat | tail -n 1"));
        assert!(line.contains("<(cat hbond_2.dat | tail -n 1 | awk {'print $2'})"));
        assert!(line.ends_with(">$WEST_PCOORD_RETURN"));
        assert_eq!(ctx.reference_file(), "$WEST_SIM_ROOT/common_files/p.inpcrd");
    }
}
