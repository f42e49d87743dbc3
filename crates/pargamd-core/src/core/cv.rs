use phf::{Map, phf_map};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The collective-variable analyses the generator knows how to express as a
/// `cpptraj` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CvKind {
    Rmsd,
    RadiusGyration,
    Distance,
    NativeContacts,
    Dihedral,
    Hbond,
    SurfaceArea,
    SecondaryStructure,
    Custom,
}

static CV_KINDS: Map<&'static str, CvKind> = phf_map! {
    "rmsd" => CvKind::Rmsd,
    "radius_gyration" => CvKind::RadiusGyration,
    "distance" => CvKind::Distance,
    "native_contacts" => CvKind::NativeContacts,
    "dihedral" => CvKind::Dihedral,
    "hbond" => CvKind::Hbond,
    "surface_area" => CvKind::SurfaceArea,
    "secondary_structure" => CvKind::SecondaryStructure,
    "custom" => CvKind::Custom,
};

impl CvKind {
    pub const ALL: [CvKind; 9] = [
        CvKind::Rmsd,
        CvKind::RadiusGyration,
        CvKind::Distance,
        CvKind::NativeContacts,
        CvKind::Dihedral,
        CvKind::Hbond,
        CvKind::SurfaceArea,
        CvKind::SecondaryStructure,
        CvKind::Custom,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        CV_KINDS.get(name).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CvKind::Rmsd => "rmsd",
            CvKind::RadiusGyration => "radius_gyration",
            CvKind::Distance => "distance",
            CvKind::NativeContacts => "native_contacts",
            CvKind::Dihedral => "dihedral",
            CvKind::Hbond => "hbond",
            CvKind::SurfaceArea => "surface_area",
            CvKind::SecondaryStructure => "secondary_structure",
            CvKind::Custom => "custom",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CvKind::Rmsd => "RMSD (Root Mean Square Deviation)",
            CvKind::RadiusGyration => "Radius of Gyration",
            CvKind::Distance => "Distance (Atom Pair Distance)",
            CvKind::NativeContacts => "Native Contacts",
            CvKind::Dihedral => "Dihedral Angle",
            CvKind::Hbond => "Hydrogen Bonds",
            CvKind::SurfaceArea => "Surface Area",
            CvKind::SecondaryStructure => "Secondary Structure",
            CvKind::Custom => "Custom (user-supplied command)",
        }
    }
}

impl fmt::Display for CvKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The type tag of a CV as supplied by the caller.
///
/// Unknown tags are preserved verbatim instead of rejected: they still name the
/// output file, and the dispatcher maps them onto the RMSD action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CvType {
    Known(CvKind),
    Unrecognized(String),
}

impl CvType {
    pub fn name(&self) -> &str {
        match self {
            CvType::Known(kind) => kind.as_str(),
            CvType::Unrecognized(raw) => raw,
        }
    }

    pub fn kind(&self) -> Option<CvKind> {
        match self {
            CvType::Known(kind) => Some(*kind),
            CvType::Unrecognized(_) => None,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, CvType::Known(CvKind::Custom))
    }
}

impl From<CvKind> for CvType {
    fn from(kind: CvKind) -> Self {
        CvType::Known(kind)
    }
}

impl From<&str> for CvType {
    fn from(name: &str) -> Self {
        match CvKind::from_name(name) {
            Some(kind) => CvType::Known(kind),
            None => CvType::Unrecognized(name.to_string()),
        }
    }
}

impl From<String> for CvType {
    fn from(name: String) -> Self {
        match CvKind::from_name(&name) {
            Some(kind) => CvType::Known(kind),
            None => CvType::Unrecognized(name),
        }
    }
}

impl From<CvType> for String {
    fn from(cv_type: CvType) -> Self {
        match cv_type {
            CvType::Known(kind) => kind.as_str().to_string(),
            CvType::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for CvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single progress-coordinate dimension: what to measure and how to bin it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvSpec {
    #[serde(rename = "type")]
    pub cv_type: CvType,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CvSpec {
    pub fn new(cv_type: impl Into<CvType>, min: f64, max: f64, step: f64) -> Self {
        Self {
            cv_type: cv_type.into(),
            min,
            max,
            step,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Output naming for the CV at zero-based `index`: `(cv_name, output_file)`.
    ///
    /// Only custom CVs take their user-given name; everything else is labelled
    /// `CV{n}` and writes `{type}_{n}.dat`.
    pub fn output_naming(&self, index: usize) -> (String, String) {
        let ordinal = index + 1;
        match (&self.cv_type, &self.name) {
            (CvType::Known(CvKind::Custom), Some(name)) => {
                (name.clone(), format!("custom_{}.dat", ordinal))
            }
            (cv_type, _) => (
                format!("CV{}", ordinal),
                format!("{}_{}.dat", cv_type.name(), ordinal),
            ),
        }
    }
}

impl Default for CvSpec {
    fn default() -> Self {
        Self::new(CvKind::Rmsd, 0.0, 8.0, 0.2)
    }
}

/// Returns the `cpptraj` command-building shell line that computes the CV and
/// writes it to `output_file`.
///
/// Unrecognized types resolve to the RMSD action. Custom CVs produce a commented
/// stub that must be edited before the run script is usable.
pub fn cpptraj_command(cv_type: &CvType, output_file: &str, cv_name: &str) -> String {
    let kind = cv_type.kind().unwrap_or(CvKind::Rmsd);
    let action = match kind {
        CvKind::Rmsd => format!("rms ca-rmsd @CA reference out {} mass", output_file),
        CvKind::RadiusGyration => format!("radgyr ca-rg @CA out {} mass", output_file),
        CvKind::Distance => format!("distance {} :1@CA :10@CA out {}", cv_name, output_file),
        CvKind::NativeContacts => {
            format!("nativecontacts {} :* byresidue out {}", cv_name, output_file)
        }
        CvKind::Dihedral => format!(
            "dihedral {} :1@C :1@N :2@CA :2@C out {}",
            cv_name, output_file
        ),
        CvKind::Hbond => format!("hbond {} out {}", cv_name, output_file),
        CvKind::SurfaceArea => format!("surf {} :* out {}", cv_name, output_file),
        CvKind::SecondaryStructure => format!("secstruct {} :* out {}", cv_name, output_file),
        CvKind::Custom => return custom_placeholder(output_file, cv_name),
    };
    format!("COMMAND=\"${{COMMAND}} {}\\n\"", action)
}

fn custom_placeholder(output_file: &str, cv_name: &str) -> String {
    format!(
        "# Custom CV: {name} - Manual implementation required\n\
         # Replace this comment with your custom CPPTRAJ command\n\
         # COMMAND=\"${{COMMAND}} [YOUR_CUSTOM_CPPTRAJ_COMMAND] out {out}\\n\"\n\
         # NOTE: Make sure the result is written to {out} and extract value to $WEST_PCOORD_RETURN",
        name = cv_name,
        out = output_file,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_round_trips_through_its_name() {
        for kind in CvKind::ALL {
            assert_eq!(CvKind::from_name(kind.as_str()), Some(kind));
            assert_eq!(CvType::from(kind.as_str()), CvType::Known(kind));
        }
        assert_eq!(CvKind::from_name("RMSD"), None);
    }

    #[test]
    fn unknown_type_name_is_preserved() {
        let cv_type = CvType::from("foo");
        assert_eq!(cv_type, CvType::Unrecognized("foo".to_string()));
        assert_eq!(cv_type.name(), "foo");
        assert_eq!(cv_type.kind(), None);
        assert_eq!(String::from(cv_type), "foo");
    }

    #[test]
    fn rmsd_command_substitutes_output_file() {
        let cmd = cpptraj_command(&CvKind::Rmsd.into(), "rmsd_1.dat", "CV1");
        assert_eq!(
            cmd,
            r#"COMMAND="${COMMAND} rms ca-rmsd @CA reference out rmsd_1.dat mass\n""#
        );
    }

    #[test]
    fn unknown_type_falls_back_to_rmsd_command() {
        let fallback = cpptraj_command(&CvType::from("foo"), "foo_1.dat", "CV1");
        let rmsd = cpptraj_command(&CvKind::Rmsd.into(), "foo_1.dat", "CV1");
        assert_eq!(fallback, rmsd);
    }

    #[test]
    fn named_commands_use_cv_name_and_output_file() {
        let expectations = [
            (CvKind::Distance, r#"distance CV2 :1@CA :10@CA out out.dat\n"#),
            (CvKind::NativeContacts, r#"nativecontacts CV2 :* byresidue out out.dat\n"#),
            (CvKind::Dihedral, r#"dihedral CV2 :1@C :1@N :2@CA :2@C out out.dat\n"#),
            (CvKind::Hbond, r#"hbond CV2 out out.dat\n"#),
            (CvKind::SurfaceArea, r#"surf CV2 :* out out.dat\n"#),
            (CvKind::SecondaryStructure, r#"secstruct CV2 :* out out.dat\n"#),
            (CvKind::RadiusGyration, r#"radgyr ca-rg @CA out out.dat mass\n"#),
        ];
        for (kind, tail) in expectations {
            let cmd = cpptraj_command(&kind.into(), "out.dat", "CV2");
            assert!(cmd.starts_with(r#"COMMAND="${COMMAND} "#), "{}", cmd);
            assert!(cmd.ends_with(&format!("{}\"", tail)), "{}", cmd);
        }
    }

    #[test]
    fn custom_command_is_a_commented_placeholder() {
        let cmd = cpptraj_command(&CvKind::Custom.into(), "custom_1.dat", "loop_twist");
        assert!(cmd.lines().all(|line| line.starts_with('#')));
        assert!(cmd.contains("Custom CV: loop_twist"));
        assert!(cmd.contains("out custom_1.dat"));
        assert!(!cmd.contains("\nCOMMAND="));
    }

    #[test]
    fn output_naming_follows_type_and_position() {
        let rmsd = CvSpec::default();
        assert_eq!(
            rmsd.output_naming(0),
            ("CV1".to_string(), "rmsd_1.dat".to_string())
        );

        let named_rmsd = CvSpec::default().with_name("PC1");
        assert_eq!(named_rmsd.output_naming(2).0, "CV3");

        let custom = CvSpec::new(CvKind::Custom, 0.0, 1.0, 0.1).with_name("twist");
        assert_eq!(
            custom.output_naming(1),
            ("twist".to_string(), "custom_2.dat".to_string())
        );

        let unnamed_custom = CvSpec::new(CvKind::Custom, 0.0, 1.0, 0.1);
        assert_eq!(
            unnamed_custom.output_naming(0),
            ("CV1".to_string(), "custom_1.dat".to_string())
        );

        let unknown = CvSpec::new("foo", 0.0, 1.0, 0.1);
        assert_eq!(unknown.output_naming(0).1, "foo_1.dat");
    }
}
