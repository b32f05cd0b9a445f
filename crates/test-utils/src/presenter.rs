use std::sync::{Arc, Mutex};
use std::time::Duration;

use qk::engine::{RunSummary, ViewToggle};
use qk::errors::Result;
use qk::registry::{Registry, Status};
use qk::view::{Presenter, ViewState};

/// Status of every unit (in `unit_ids` order) at one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub statuses: Vec<Status>,
    pub output_lines: Vec<Vec<String>>,
}

impl Snapshot {
    fn capture(registry: &Registry) -> Self {
        let units: Vec<_> = registry
            .unit_ids()
            .into_iter()
            .filter_map(|id| registry.unit(id))
            .collect();
        Self {
            statuses: units.iter().map(|u| u.status()).collect(),
            output_lines: units
                .iter()
                .map(|u| u.output().lines().map(str::to_string).collect())
                .collect(),
        }
    }
}

/// Everything a [`RecordingPresenter`] saw.
#[derive(Debug, Default)]
pub struct Recording {
    pub snapshots: Vec<Snapshot>,
    pub state: Option<ViewState>,
    pub finished: Option<(RunSummary, Snapshot)>,
    pub finish_calls: usize,
}

/// A presenter that records registry snapshots instead of drawing.
pub struct RecordingPresenter {
    state: ViewState,
    recording: Arc<Mutex<Recording>>,
}

impl RecordingPresenter {
    pub fn new() -> (Self, Arc<Mutex<Recording>>) {
        let recording = Arc::new(Mutex::new(Recording::default()));
        (
            Self {
                state: ViewState::default(),
                recording: Arc::clone(&recording),
            },
            recording,
        )
    }
}

impl Presenter for RecordingPresenter {
    fn render(&mut self, registry: &Registry, _elapsed: Duration) -> Result<()> {
        self.recording
            .lock()
            .unwrap()
            .snapshots
            .push(Snapshot::capture(registry));
        Ok(())
    }

    fn toggle(&mut self, toggle: ViewToggle) {
        self.state.toggle(toggle);
        self.recording.lock().unwrap().state = Some(self.state);
    }

    fn finish(
        &mut self,
        registry: &Registry,
        summary: &RunSummary,
        _elapsed: Duration,
    ) -> Result<()> {
        let mut rec = self.recording.lock().unwrap();
        rec.finished = Some((*summary, Snapshot::capture(registry)));
        rec.finish_calls += 1;
        Ok(())
    }
}
