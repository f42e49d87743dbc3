use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use pargamd::engine::progress::{FileOrigin, Progress, ProgressCallback};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{trace, warn};

/// How many bundle entries came from each source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OriginTally {
    pub uploaded: usize,
    pub rendered: usize,
    pub existing: usize,
    pub placeholder: usize,
}

impl OriginTally {
    fn record(&mut self, origin: FileOrigin) {
        match origin {
            FileOrigin::Uploaded => self.uploaded += 1,
            FileOrigin::Rendered => self.rendered += 1,
            FileOrigin::Existing => self.existing += 1,
            FileOrigin::Placeholder => self.placeholder += 1,
        }
    }
}

impl fmt::Display for OriginTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rendered, {} uploaded, {} existing, {} placeholder",
            self.rendered, self.uploaded, self.existing, self.placeholder
        )
    }
}

struct BarState {
    pb: ProgressBar,
    tally: OriginTally,
}

/// Draws one bar per generation phase on stderr and tallies file origins.
#[derive(Clone)]
pub struct CliProgressHandler {
    state: Arc<Mutex<BarState>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    pub fn hidden() -> Self {
        Self::with_draw_target(ProgressDrawTarget::hidden())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::with_draw_target(Some(0), target).with_style(Self::bar_style());
        Self {
            state: Arc::new(Mutex::new(BarState {
                pb,
                tally: OriginTally::default(),
            })),
        }
    }

    pub fn tally(&self) -> OriginTally {
        self.state
            .lock()
            .map(|s| s.tally)
            .unwrap_or_default()
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let state = self.state.clone();

        Box::new(move |progress: Progress| {
            let Ok(mut state) = state.lock() else {
                warn!("Progress state mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::PhaseStart { phase, files } => {
                    state.pb.reset();
                    state.pb.set_length(files);
                    state.pb.set_prefix(phase.label());
                    state.pb.set_message("");
                }
                Progress::File { path, origin } => {
                    trace!("{:?}: {}", origin, path);
                    state.tally.record(origin);
                    state.pb.set_message(path);
                    state.pb.inc(1);
                }
                Progress::PhaseFinish { .. } => {
                    state.pb.finish_with_message("✓");
                }
            }
        })
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{prefix:<28} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pargamd::engine::progress::Phase;
    use std::thread;

    fn file(path: &str, origin: FileOrigin) -> Progress {
        Progress::File {
            path: path.to_string(),
            origin,
        }
    }

    #[test]
    fn bar_follows_each_phase() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();

        callback(Progress::PhaseStart {
            phase: Phase::Templates,
            files: 6,
        });
        callback(file("west.cfg", FileOrigin::Rendered));
        callback(file("env.sh", FileOrigin::Rendered));
        {
            let state = handler.state.lock().unwrap();
            assert_eq!(state.pb.length(), Some(6));
            assert_eq!(state.pb.position(), 2);
            assert_eq!(state.pb.prefix(), "Rendering templates");
            assert_eq!(state.pb.message(), "env.sh");
        }

        callback(Progress::PhaseFinish {
            phase: Phase::Templates,
        });
        assert!(handler.state.lock().unwrap().pb.is_finished());

        callback(Progress::PhaseStart {
            phase: Phase::Auxiliary,
            files: 40,
        });
        let state = handler.state.lock().unwrap();
        assert_eq!(state.pb.position(), 0);
        assert_eq!(state.pb.length(), Some(40));
    }

    #[test]
    fn tally_counts_every_origin() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();
        callback(file("cMD/p.pdb", FileOrigin::Uploaded));
        callback(file("run.sh", FileOrigin::Placeholder));
        callback(file("tstate.file", FileOrigin::Placeholder));
        callback(file("md.in", FileOrigin::Existing));

        let tally = handler.tally();
        assert_eq!(
            tally,
            OriginTally {
                uploaded: 1,
                rendered: 0,
                existing: 1,
                placeholder: 2,
            }
        );
        assert_eq!(tally.to_string(), "0 rendered, 1 uploaded, 1 existing, 2 placeholder");
    }

    #[test]
    fn callback_can_run_on_another_thread() {
        let handler = CliProgressHandler::hidden();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::PhaseStart {
                phase: Phase::Uploads,
                files: 1,
            });
            callback(file("bstates/bstate.rst", FileOrigin::Uploaded));
            callback(Progress::PhaseFinish {
                phase: Phase::Uploads,
            });
        })
        .join()
        .unwrap();

        assert_eq!(handler.tally().uploaded, 1);
        assert!(handler.state.lock().unwrap().pb.is_finished());
    }
}
