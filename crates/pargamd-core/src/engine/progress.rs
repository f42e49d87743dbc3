use std::fmt;

/// The three passes a generation run makes over the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uploads,
    Templates,
    Auxiliary,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Uploads => "Embedding uploads",
            Phase::Templates => "Rendering templates",
            Phase::Auxiliary => "Collecting auxiliary files",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where the content of a bundle entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOrigin {
    Uploaded,
    Rendered,
    Existing,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart { phase: Phase, files: u64 },
    /// One bundle path was settled. Already-present auxiliary paths are
    /// reported too, as `Uploaded`, so the count always reaches `files`.
    File { path: String, origin: FileOrigin },
    PhaseFinish { phase: Phase },
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    pub(crate) fn file(&self, path: &str, origin: FileOrigin) {
        if self.callback.is_some() {
            self.report(Progress::File {
                path: path.to_string(),
                origin,
            });
        }
    }
}
