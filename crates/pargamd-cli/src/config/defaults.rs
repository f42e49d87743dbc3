use pargamd::core::cv::CvSpec;

/// Values for the optional settings when neither the parameter file nor the
/// command line sets them. Required parameters have no entry here.
pub struct DefaultsConfig {
    pub include_infinite_bounds: bool,
    pub rst_as_bstate: bool,
    pub cvs: Vec<CvSpec>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            include_infinite_bounds: true,
            rst_as_bstate: false,
            cvs: vec![CvSpec::default().with_name("PC1")],
        }
    }
}
