use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use oncointeract_contracts::analysis::{
    AnalysisRequest, AnalysisResult, GeneratedImages, VisualizationKey,
};
use oncointeract_contracts::events::{Event, EventWriter};

use crate::analysis::analyze_interaction;
use crate::imaging::ImageClient;
use crate::oracle::{ImageOracle, TextOracle};

pub const ANALYZING_LABEL: &str = "Analyzing Molecular Interactions & Correlating Data...";
pub const GENERATING_LABEL: &str = "Generating Biomedical Visualizations...";
pub const GENERIC_ERROR_MESSAGE: &str =
    "Analysis failed. Please check your inputs and try again. Ensure the API Key is valid.";

const WAIT_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
    AwaitingText,
    GeneratingImages,
    Settled(Outcome),
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::AwaitingText => "awaiting_text",
            Self::GeneratingImages => "generating_images",
            Self::Settled(Outcome::Success) => "settled_success",
            Self::Settled(Outcome::Error) => "settled_error",
        }
    }

    pub fn in_flight(self) -> bool {
        matches!(
            self,
            Self::Submitting | Self::AwaitingText | Self::GeneratingImages
        )
    }
}

/// Every state change goes through one of these. All but `Reset` belong to
/// a submission cycle and carry its epoch.
#[derive(Debug, Clone)]
pub enum Transition {
    Submitted {
        epoch: u64,
    },
    TextStarted {
        epoch: u64,
    },
    TextSucceeded {
        epoch: u64,
        result: Box<AnalysisResult>,
    },
    TextFailed {
        epoch: u64,
        cause: String,
    },
    ImageResolved {
        epoch: u64,
        key: VisualizationKey,
        payload: String,
    },
    ImagesSettled {
        epoch: u64,
    },
    Reset,
}

impl Transition {
    pub fn epoch(&self) -> Option<u64> {
        match self {
            Self::Submitted { epoch }
            | Self::TextStarted { epoch }
            | Self::TextSucceeded { epoch, .. }
            | Self::TextFailed { epoch, .. }
            | Self::ImageResolved { epoch, .. }
            | Self::ImagesSettled { epoch } => Some(*epoch),
            Self::Reset => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Submitted { .. } => "submitted",
            Self::TextStarted { .. } => "text_started",
            Self::TextSucceeded { .. } => "text_succeeded",
            Self::TextFailed { .. } => "text_failed",
            Self::ImageResolved { .. } => "image_resolved",
            Self::ImagesSettled { .. } => "images_settled",
            Self::Reset => "reset",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed,
    /// Belongs to an abandoned cycle.
    Stale,
    /// Current cycle, but not meaningful in the current phase (or an empty
    /// image payload).
    Ignored,
}

/// What the presentation layer observes. Only `apply` mutates it.
#[derive(Debug, Clone)]
pub struct ViewState {
    phase: Phase,
    epoch: u64,
    loading: bool,
    progress: Option<String>,
    result: Option<AnalysisResult>,
    images: GeneratedImages,
    error: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            epoch: 0,
            loading: false,
            progress: None,
            result: None,
            images: GeneratedImages::new(),
            error: None,
        }
    }
}

impl ViewState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn progress(&self) -> Option<&str> {
        self.progress.as_deref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn images(&self) -> &GeneratedImages {
        &self.images
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn clear_presented(&mut self) {
        self.loading = false;
        self.progress = None;
        self.result = None;
        self.images = GeneratedImages::new();
        self.error = None;
    }

    pub fn apply(&mut self, transition: Transition) -> Applied {
        if let Transition::Reset = transition {
            self.epoch += 1;
            self.clear_presented();
            self.phase = Phase::Idle;
            return Applied::Changed;
        }

        if let Transition::Submitted { epoch } = transition {
            if epoch <= self.epoch {
                return Applied::Stale;
            }
            self.epoch = epoch;
            self.clear_presented();
            self.loading = true;
            self.phase = Phase::Submitting;
            return Applied::Changed;
        }

        if transition.epoch() != Some(self.epoch) {
            return Applied::Stale;
        }

        match (self.phase, transition) {
            (Phase::Submitting, Transition::TextStarted { .. }) => {
                self.progress = Some(ANALYZING_LABEL.to_string());
                self.phase = Phase::AwaitingText;
            }
            (Phase::AwaitingText, Transition::TextSucceeded { result, .. }) => {
                self.result = Some(*result);
                self.progress = Some(GENERATING_LABEL.to_string());
                self.phase = Phase::GeneratingImages;
            }
            (Phase::Submitting | Phase::AwaitingText, Transition::TextFailed { .. }) => {
                self.loading = false;
                self.progress = None;
                self.error = Some(GENERIC_ERROR_MESSAGE.to_string());
                self.phase = Phase::Settled(Outcome::Error);
            }
            (Phase::GeneratingImages, Transition::ImageResolved { key, payload, .. }) => {
                if !self.images.insert(key, payload) {
                    return Applied::Ignored;
                }
            }
            (Phase::GeneratingImages, Transition::ImagesSettled { .. }) => {
                self.loading = false;
                self.progress = None;
                self.phase = Phase::Settled(Outcome::Success);
            }
            _ => return Applied::Ignored,
        }
        Applied::Changed
    }
}

/// Runs one submission cycle on its own thread: the text call, then three
/// independent image calls whose results are reported as each finishes.
struct CycleWorker {
    epoch: u64,
    request: AnalysisRequest,
    text: Arc<dyn TextOracle>,
    images: ImageClient,
    events: Option<EventWriter>,
    sender: mpsc::Sender<Transition>,
}

impl CycleWorker {
    fn run(self) {
        let result = match analyze_interaction(self.text.as_ref(), &self.request) {
            Ok(result) => result,
            Err(err) => {
                let _ = self.sender.send(Transition::TextFailed {
                    epoch: self.epoch,
                    cause: err.to_string(),
                });
                return;
            }
        };

        let prompts = result.image_prompts.clone();
        let _ = self.sender.send(Transition::TextSucceeded {
            epoch: self.epoch,
            result: Box::new(result),
        });

        let mut handles = Vec::new();
        for key in VisualizationKey::ALL {
            let images = self.images.clone();
            let sender = self.sender.clone();
            let epoch = self.epoch;
            let prompt = key.prompt(&prompts).to_string();
            let spawned = thread::Builder::new()
                .name(format!("oncointeract-image-{}", key.as_str()))
                .spawn(move || {
                    let payload = images.generate(epoch, key, &prompt);
                    let _ = sender.send(Transition::ImageResolved {
                        epoch,
                        key,
                        payload,
                    });
                });
            match spawned {
                Ok(handle) => handles.push((key, handle)),
                Err(err) => self.log_image_failure(key, format!("image thread spawn failed: {err}")),
            }
        }

        for (key, handle) in handles {
            if handle.join().is_err() {
                self.log_image_failure(key, "image worker panicked".to_string());
            }
        }
        let _ = self.sender.send(Transition::ImagesSettled { epoch: self.epoch });
    }

    fn log_image_failure(&self, key: VisualizationKey, error: String) {
        if let Some(events) = self.events.as_ref() {
            let _ = events.record_cycle(
                self.epoch,
                &Event::ImageFailed {
                    key,
                    model: None,
                    error,
                },
            );
        }
    }
}

/// Owns the view state and the submission cycles feeding it.
///
/// Workers report through a channel; nothing changes until `pump` or `wait`
/// applies what they sent. Reset and resubmission never abort in-flight
/// calls; their late results are discarded by epoch.
pub struct Orchestrator {
    text: Arc<dyn TextOracle>,
    images: ImageClient,
    events: Option<EventWriter>,
    state: ViewState,
    sender: mpsc::Sender<Transition>,
    receiver: mpsc::Receiver<Transition>,
    workers: Vec<(u64, thread::JoinHandle<()>)>,
}

impl Orchestrator {
    pub fn new(
        text: Arc<dyn TextOracle>,
        image: Arc<dyn ImageOracle>,
        events: Option<EventWriter>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            text,
            images: ImageClient::new(image, events.clone()),
            events,
            state: ViewState::default(),
            sender,
            receiver,
            workers: Vec::new(),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn text_model(&self) -> &str {
        self.text.name()
    }

    pub fn image_model(&self) -> &str {
        self.images.model()
    }

    /// Starts a new cycle and returns its epoch. Presented state from any
    /// earlier cycle is cleared immediately.
    pub fn submit(&mut self, request: AnalysisRequest) -> anyhow::Result<u64> {
        self.cleanup_finished_workers();
        let epoch = self.state.epoch() + 1;
        self.apply(Transition::Submitted { epoch });

        let worker = CycleWorker {
            epoch,
            request,
            text: Arc::clone(&self.text),
            images: self.images.clone(),
            events: self.events.clone(),
            sender: self.sender.clone(),
        };
        let spawned = thread::Builder::new()
            .name(format!("oncointeract-cycle-{epoch}"))
            .spawn(move || worker.run());
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                self.apply(Transition::TextFailed {
                    epoch,
                    cause: format!("cycle thread spawn failed: {err}"),
                });
                return Err(err).context("failed to start analysis cycle");
            }
        };
        self.workers.push((epoch, handle));
        self.apply(Transition::TextStarted { epoch });
        Ok(epoch)
    }

    pub fn reset(&mut self) {
        self.apply(Transition::Reset);
    }

    /// Swaps the models used by later submissions. The presented state and
    /// the epoch counter carry over; refused while a cycle is in flight.
    pub fn set_oracles(
        &mut self,
        text: Arc<dyn TextOracle>,
        image: Arc<dyn ImageOracle>,
    ) -> anyhow::Result<()> {
        self.pump();
        if self.state.phase().in_flight() {
            anyhow::bail!("wait for the current analysis to settle before switching models");
        }
        self.text = text;
        self.images = ImageClient::new(image, self.events.clone());
        Ok(())
    }

    /// Applies whatever the workers have reported so far without blocking.
    /// A cycle whose worker exited without settling is settled here too.
    /// Returns how many transitions changed the state.
    pub fn pump(&mut self) -> usize {
        let mut changed = self.drain();
        if self.settle_vanished_worker() {
            changed += 1;
        }
        changed
    }

    /// Blocks until the current cycle settles, calling `observer` after each
    /// change. Returns immediately when nothing is in flight.
    pub fn wait(&mut self, mut observer: impl FnMut(&ViewState)) -> &ViewState {
        while self.state.phase().in_flight() {
            match self.receiver.recv_timeout(WAIT_POLL) {
                Ok(transition) => {
                    if self.apply(transition) == Applied::Changed {
                        observer(&self.state);
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if self.settle_vanished_worker() {
                        observer(&self.state);
                    }
                }
                // The orchestrator holds a sender, so this never disconnects.
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
        &self.state
    }

    /// Joins every cycle thread, including abandoned ones, then applies
    /// what they reported.
    pub fn join_workers(&mut self) -> usize {
        for (_, handle) in self.workers.drain(..) {
            let _ = handle.join();
        }
        self.pump()
    }

    fn drain(&mut self) -> usize {
        let mut changed = 0;
        while let Ok(transition) = self.receiver.try_recv() {
            if self.apply(transition) == Applied::Changed {
                changed += 1;
            }
        }
        changed
    }

    /// Settles the current cycle when its worker thread is gone but the
    /// state still shows it in flight (a panicking oracle).
    fn settle_vanished_worker(&mut self) -> bool {
        if !self.state.phase().in_flight() {
            return false;
        }
        let epoch = self.state.epoch();
        let finished = self
            .workers
            .iter()
            .find(|(worker_epoch, _)| *worker_epoch == epoch)
            .map(|(_, handle)| handle.is_finished())
            .unwrap_or(true);
        if !finished {
            return false;
        }
        // Anything it sent before exiting is already queued.
        self.drain();
        let settle = match self.state.phase() {
            Phase::GeneratingImages => Transition::ImagesSettled { epoch },
            phase if phase.in_flight() => Transition::TextFailed {
                epoch,
                cause: "analysis worker exited without reporting".to_string(),
            },
            _ => return false,
        };
        self.apply(settle) == Applied::Changed
    }

    fn cleanup_finished_workers(&mut self) {
        let mut running = Vec::new();
        for (epoch, handle) in self.workers.drain(..) {
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                running.push((epoch, handle));
            }
        }
        self.workers = running;
    }

    fn apply(&mut self, transition: Transition) -> Applied {
        let name = transition.name();
        let epoch = transition.epoch();
        let detail = match &transition {
            Transition::TextFailed { cause, .. } => Some(cause.clone()),
            Transition::ImageResolved { key, payload, .. } if payload.is_empty() => {
                Some(format!("{key} (empty)"))
            }
            Transition::ImageResolved { key, .. } => Some(key.to_string()),
            _ => None,
        };

        let applied = self.state.apply(transition);
        self.log_transition(name, epoch, applied, detail);
        applied
    }

    fn log_transition(
        &self,
        name: &str,
        epoch: Option<u64>,
        applied: Applied,
        detail: Option<String>,
    ) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        let transition = name.to_string();
        let phase = self.state.phase().label().to_string();
        let event = match applied {
            Applied::Changed => Event::TransitionApplied {
                transition,
                phase,
                detail,
            },
            Applied::Ignored => Event::TransitionIgnored {
                transition,
                phase,
                detail,
            },
            Applied::Stale => Event::StaleTransitionDiscarded {
                transition,
                current_epoch: self.state.epoch(),
            },
        };
        let _ = events.record_cycle(epoch.unwrap_or(self.state.epoch()), &event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    use oncointeract_contracts::analysis::{AnalysisResult, VisualizationKey};
    use oncointeract_contracts::events::EventWriter;
    use serde_json::Value;

    use super::{
        Applied, Orchestrator, Outcome, Phase, Transition, ViewState, ANALYZING_LABEL,
        GENERATING_LABEL, GENERIC_ERROR_MESSAGE,
    };
    use crate::analysis::tests::{sample_request, sample_response};
    use crate::oracle::{ImageOracle, OracleError, TextOracle};

    struct ScriptedText {
        reply: Option<String>,
    }

    impl ScriptedText {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                reply: Some(sample_response().to_string()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { reply: None })
        }
    }

    impl TextOracle for ScriptedText {
        fn name(&self) -> &str {
            "scripted-text"
        }

        fn complete_json(&self, _prompt: &str, _schema: &Value) -> Result<String, OracleError> {
            self.reply.clone().ok_or_else(|| OracleError::Api {
                provider: "Gemini".to_string(),
                status: 403,
                body: "API key not valid".to_string(),
            })
        }
    }

    /// Image oracle keyed on prompt text: sample prompts are `complex`,
    /// `pathway` and `cell`.
    struct ScriptedImages {
        gate: AtomicBool,
        calls: AtomicUsize,
        failing: Vec<&'static str>,
        panicking: Vec<&'static str>,
        prefix: Mutex<String>,
    }

    impl ScriptedImages {
        fn new(open: bool) -> Arc<Self> {
            Arc::new(Self {
                gate: AtomicBool::new(open),
                calls: AtomicUsize::new(0),
                failing: Vec::new(),
                panicking: Vec::new(),
                prefix: Mutex::new("img".to_string()),
            })
        }

        fn release(&self) {
            self.gate.store(true, Ordering::SeqCst);
        }
    }

    impl ImageOracle for ScriptedImages {
        fn name(&self) -> &str {
            "scripted-image"
        }

        fn render(
            &self,
            prompt: &str,
            _system_instruction: &str,
        ) -> Result<Option<String>, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            while !self.gate.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(5));
            }
            if self.panicking.contains(&prompt) {
                panic!("renderer crashed");
            }
            if self.failing.contains(&prompt) {
                return Err(OracleError::transport("Gemini", "connection reset"));
            }
            let prefix = self.prefix.lock().map(|p| p.clone()).unwrap_or_default();
            Ok(Some(format!("{prefix}-{prompt}")))
        }
    }

    fn pump_until(
        orchestrator: &mut Orchestrator,
        done: impl Fn(&ViewState) -> bool,
    ) -> anyhow::Result<()> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(orchestrator.state()) {
            if Instant::now() > deadline {
                anyhow::bail!("timed out in phase {:?}", orchestrator.state().phase());
            }
            orchestrator.pump();
            thread::sleep(Duration::from_millis(2));
        }
        Ok(())
    }

    fn sample_result() -> anyhow::Result<AnalysisResult> {
        Ok(serde_json::from_value(sample_response())?)
    }

    #[test]
    fn reducer_walks_a_successful_cycle() -> anyhow::Result<()> {
        let mut state = ViewState::default();
        assert_eq!(state.apply(Transition::Submitted { epoch: 1 }), Applied::Changed);
        assert!(state.loading());
        assert_eq!(state.apply(Transition::TextStarted { epoch: 1 }), Applied::Changed);
        assert_eq!(state.progress(), Some(ANALYZING_LABEL));

        state.apply(Transition::TextSucceeded {
            epoch: 1,
            result: Box::new(sample_result()?),
        });
        assert_eq!(state.phase(), Phase::GeneratingImages);
        assert!(state.result().is_some());
        assert!(state.loading());
        assert_eq!(state.progress(), Some(GENERATING_LABEL));

        let empty = Transition::ImageResolved {
            epoch: 1,
            key: VisualizationKey::PathwayMap,
            payload: String::new(),
        };
        assert_eq!(state.apply(empty), Applied::Ignored);
        state.apply(Transition::ImageResolved {
            epoch: 1,
            key: VisualizationKey::CellularResponse,
            payload: "abc".to_string(),
        });
        state.apply(Transition::ImagesSettled { epoch: 1 });

        assert_eq!(state.phase(), Phase::Settled(Outcome::Success));
        assert!(!state.loading());
        assert_eq!(state.progress(), None);
        assert_eq!(state.images().len(), 1);
        assert_eq!(state.images().get(VisualizationKey::CellularResponse), Some("abc"));
        Ok(())
    }

    #[test]
    fn reducer_discards_other_epochs_and_out_of_phase_transitions() -> anyhow::Result<()> {
        let mut state = ViewState::default();
        state.apply(Transition::Submitted { epoch: 1 });
        state.apply(Transition::Reset);
        assert_eq!(state.epoch(), 2);
        assert_eq!(state.phase(), Phase::Idle);

        let late = Transition::TextSucceeded {
            epoch: 1,
            result: Box::new(sample_result()?),
        };
        assert_eq!(state.apply(late), Applied::Stale);
        assert_eq!(state.apply(Transition::Submitted { epoch: 2 }), Applied::Stale);
        assert!(state.result().is_none());

        assert_eq!(state.apply(Transition::ImagesSettled { epoch: 2 }), Applied::Ignored);
        assert_eq!(state.phase(), Phase::Idle);
        Ok(())
    }

    #[test]
    fn text_result_is_visible_while_images_are_in_flight() -> anyhow::Result<()> {
        let images = ScriptedImages::new(false);
        let mut orchestrator = Orchestrator::new(ScriptedText::ok(), images.clone(), None);

        let epoch = orchestrator.submit(sample_request())?;
        assert_eq!(epoch, 1);
        assert_eq!(orchestrator.state().phase(), Phase::AwaitingText);
        assert_eq!(orchestrator.state().progress(), Some(ANALYZING_LABEL));

        pump_until(&mut orchestrator, |state| state.result().is_some())?;
        assert!(orchestrator.state().loading());
        assert_eq!(orchestrator.state().phase(), Phase::GeneratingImages);
        assert!(orchestrator.state().images().is_empty());

        images.release();
        let mut observed = Vec::new();
        let state = orchestrator.wait(|state| observed.push(state.images().len()));
        assert_eq!(state.phase(), Phase::Settled(Outcome::Success));
        assert!(!state.loading());
        assert!(state.images().is_complete());
        assert_eq!(state.images().get(VisualizationKey::PathwayMap), Some("img-pathway"));
        assert_eq!(observed, vec![1, 2, 3, 3]);
        Ok(())
    }

    #[test]
    fn only_successful_images_are_merged() -> anyhow::Result<()> {
        let images = Arc::new(ScriptedImages {
            gate: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            failing: vec!["pathway"],
            panicking: vec!["cell"],
            prefix: Mutex::new("img".to_string()),
        });
        let temp = tempfile::tempdir()?;
        let events_path = temp.path().join("events.jsonl");
        let mut orchestrator = Orchestrator::new(
            ScriptedText::ok(),
            images.clone(),
            Some(EventWriter::new(&events_path, "s")),
        );

        orchestrator.submit(sample_request())?;
        let state = orchestrator.wait(|_| {});
        assert_eq!(state.phase(), Phase::Settled(Outcome::Success));
        assert_eq!(state.error(), None);
        let keys: Vec<VisualizationKey> = state.images().keys().collect();
        assert_eq!(keys, vec![VisualizationKey::MolecularViz]);
        assert_eq!(images.calls.load(Ordering::SeqCst), 3);

        let log = std::fs::read_to_string(&events_path)?;
        let failures = log
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter(|event| event["type"] == Value::from("image_failed"))
            .count();
        assert_eq!(failures, 2);
        Ok(())
    }

    #[test]
    fn text_failure_settles_with_generic_error_and_no_images() -> anyhow::Result<()> {
        let images = ScriptedImages::new(true);
        let temp = tempfile::tempdir()?;
        let events_path = temp.path().join("events.jsonl");
        let mut orchestrator = Orchestrator::new(
            ScriptedText::failing(),
            images.clone(),
            Some(EventWriter::new(&events_path, "s")),
        );

        orchestrator.submit(sample_request())?;
        let state = orchestrator.wait(|_| {});
        assert_eq!(state.phase(), Phase::Settled(Outcome::Error));
        assert_eq!(state.error(), Some(GENERIC_ERROR_MESSAGE));
        assert!(!state.loading());
        assert!(state.result().is_none());
        orchestrator.join_workers();
        assert_eq!(images.calls.load(Ordering::SeqCst), 0);

        let log = std::fs::read_to_string(&events_path)?;
        assert!(log.contains("API key not valid"));
        Ok(())
    }

    #[test]
    fn reset_discards_results_from_the_abandoned_cycle() -> anyhow::Result<()> {
        let images = ScriptedImages::new(false);
        let mut orchestrator = Orchestrator::new(ScriptedText::ok(), images.clone(), None);

        orchestrator.submit(sample_request())?;
        pump_until(&mut orchestrator, |state| state.result().is_some())?;
        orchestrator.reset();
        assert_eq!(orchestrator.state().phase(), Phase::Idle);
        assert!(orchestrator.state().result().is_none());

        images.release();
        assert_eq!(orchestrator.join_workers(), 0);
        assert_eq!(orchestrator.state().phase(), Phase::Idle);
        assert!(orchestrator.state().images().is_empty());
        assert_eq!(orchestrator.state().error(), None);

        if let Ok(mut prefix) = images.prefix.lock() {
            *prefix = "fresh".to_string();
        }
        let epoch = orchestrator.submit(sample_request())?;
        assert_eq!(epoch, 3);
        let state = orchestrator.wait(|_| {});
        assert_eq!(state.images().get(VisualizationKey::MolecularViz), Some("fresh-complex"));
        Ok(())
    }

    #[test]
    fn resubmission_supersedes_a_running_cycle() -> anyhow::Result<()> {
        let images = ScriptedImages::new(false);
        let mut orchestrator = Orchestrator::new(ScriptedText::ok(), images.clone(), None);

        orchestrator.submit(sample_request())?;
        pump_until(&mut orchestrator, |state| state.result().is_some())?;
        let second = orchestrator.submit(sample_request())?;
        assert_eq!(second, 2);
        assert!(orchestrator.state().result().is_none());

        images.release();
        let state = orchestrator.wait(|_| {});
        assert_eq!(state.epoch(), 2);
        assert_eq!(state.phase(), Phase::Settled(Outcome::Success));
        assert_eq!(state.images().len(), 3);
        Ok(())
    }

    struct PanickingText;

    impl TextOracle for PanickingText {
        fn name(&self) -> &str {
            "panicking-text"
        }

        fn complete_json(&self, _prompt: &str, _schema: &Value) -> Result<String, OracleError> {
            panic!("oracle crashed");
        }
    }

    #[test]
    fn pump_settles_a_cycle_whose_worker_died() -> anyhow::Result<()> {
        let mut orchestrator =
            Orchestrator::new(Arc::new(PanickingText), ScriptedImages::new(true), None);
        orchestrator.submit(sample_request())?;
        assert_eq!(orchestrator.state().phase(), Phase::AwaitingText);

        pump_until(&mut orchestrator, |state| !state.phase().in_flight())?;
        assert_eq!(orchestrator.state().phase(), Phase::Settled(Outcome::Error));
        assert_eq!(orchestrator.state().error(), Some(GENERIC_ERROR_MESSAGE));
        assert!(!orchestrator.state().loading());
        Ok(())
    }

    #[test]
    fn switching_models_keeps_results_and_epoch() -> anyhow::Result<()> {
        let images = ScriptedImages::new(false);
        let mut orchestrator = Orchestrator::new(ScriptedText::ok(), images.clone(), None);

        orchestrator.submit(sample_request())?;
        let busy = orchestrator.set_oracles(ScriptedText::failing(), ScriptedImages::new(true));
        assert!(busy.is_err());
        assert_eq!(orchestrator.text_model(), "scripted-text");

        images.release();
        orchestrator.wait(|_| {});
        let replacement = ScriptedImages::new(true);
        if let Ok(mut prefix) = replacement.prefix.lock() {
            *prefix = "swapped".to_string();
        }
        orchestrator.set_oracles(ScriptedText::ok(), replacement)?;
        let state = orchestrator.state();
        assert_eq!(state.phase(), Phase::Settled(Outcome::Success));
        assert!(state.result().is_some());
        assert!(state.images().is_complete());

        assert_eq!(orchestrator.submit(sample_request())?, 2);
        let state = orchestrator.wait(|_| {});
        assert_eq!(state.images().get(VisualizationKey::CellularResponse), Some("swapped-cell"));
        Ok(())
    }

    #[test]
    fn wait_returns_immediately_when_idle() {
        let mut orchestrator =
            Orchestrator::new(ScriptedText::ok(), ScriptedImages::new(true), None);
        let mut calls = 0;
        let state = orchestrator.wait(|_| calls += 1);
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(calls, 0);
    }
}
