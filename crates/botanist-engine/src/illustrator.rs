use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use botanist_contracts::events::EventWriter;
use botanist_contracts::plants::LifeCycleStage;
use serde_json::json;

use crate::config::DEFAULT_STAGE_DELAY;
use crate::image::ImagePayload;
use crate::{log_event, payload, PlantGateway};

/// Shared stop flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Pending,
    Loading,
    Illustrated,
    Skipped,
}

impl StageState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Loading => "loading",
            Self::Illustrated => "illustrated",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone)]
struct StageSlot {
    name: String,
    state: StageState,
    image: Option<ImagePayload>,
}

/// Per-plant cache of stage illustrations, keyed by stage index.
///
/// A gallery belongs to one plant name. Retargeting it at a different
/// plant drops every cached image and bumps the generation so a run that
/// is still working on the old plant stops writing into it.
#[derive(Debug, Clone, Default)]
pub struct StageGallery {
    plant_name: String,
    generation: u64,
    slots: Vec<StageSlot>,
}

impl StageGallery {
    pub fn new(plant_name: impl Into<String>, stages: &[LifeCycleStage]) -> Self {
        Self {
            plant_name: plant_name.into(),
            generation: 0,
            slots: slots_for(stages),
        }
    }

    /// Returns `true` when the plant changed and the cache was reset.
    pub fn retarget(&mut self, plant_name: &str, stages: &[LifeCycleStage]) -> bool {
        if self.plant_name == plant_name && self.slots.len() == stages.len() {
            return false;
        }
        self.plant_name = plant_name.to_string();
        self.generation += 1;
        self.slots = slots_for(stages);
        true
    }

    pub fn plant_name(&self) -> &str {
        &self.plant_name
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn stage_name(&self, index: usize) -> Option<&str> {
        self.slots.get(index).map(|slot| slot.name.as_str())
    }

    pub fn state(&self, index: usize) -> Option<StageState> {
        self.slots.get(index).map(|slot| slot.state)
    }

    pub fn image(&self, index: usize) -> Option<&ImagePayload> {
        self.slots.get(index).and_then(|slot| slot.image.as_ref())
    }

    pub fn illustrated_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.state == StageState::Illustrated)
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.slots
            .iter()
            .all(|slot| matches!(slot.state, StageState::Illustrated | StageState::Skipped))
    }

    fn set_state(&mut self, index: usize, state: StageState) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.state = state;
        }
    }

    fn store(&mut self, index: usize, image: ImagePayload) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.image = Some(image);
            slot.state = StageState::Illustrated;
        }
    }
}

fn slots_for(stages: &[LifeCycleStage]) -> Vec<StageSlot> {
    stages
        .iter()
        .map(|stage| StageSlot {
            name: stage.stage_name.clone(),
            state: StageState::Pending,
            image: None,
        })
        .collect()
}

fn lock(gallery: &Mutex<StageGallery>) -> MutexGuard<'_, StageGallery> {
    gallery.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pause between stage requests.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IllustrationReport {
    pub requested: Vec<usize>,
    pub illustrated: Vec<usize>,
    pub skipped: Vec<usize>,
    pub cancelled: bool,
}

/// Requests stage illustrations one at a time, in stage order.
///
/// After each successful image the run pauses for `delay` before the next
/// request. A stage that comes back without an image (or fails) is marked
/// skipped and the run moves on immediately. Cancellation is observed
/// before every request and again when a request returns; a result that
/// arrives after cancellation is discarded.
///
/// A stage marked loading belongs to the run that marked it. Another run
/// sharing the gallery stops when it reaches that stage instead of issuing
/// a second request for it.
#[derive(Clone)]
pub struct SequentialIllustrator {
    delay: Duration,
    sleeper: Arc<dyn Sleeper>,
    events: EventWriter,
}

impl SequentialIllustrator {
    pub fn new(events: EventWriter) -> Self {
        Self {
            delay: DEFAULT_STAGE_DELAY,
            sleeper: Arc::new(ThreadSleeper),
            events,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn run(
        &self,
        gateway: &dyn PlantGateway,
        gallery: &Mutex<StageGallery>,
        token: &CancellationToken,
    ) -> IllustrationReport {
        let mut report = IllustrationReport::default();
        let (plant_name, generation, count) = {
            let mut guard = lock(gallery);
            for index in 0..guard.len() {
                if guard.state(index) == Some(StageState::Skipped) {
                    guard.set_state(index, StageState::Pending);
                }
            }
            (guard.plant_name.clone(), guard.generation, guard.len())
        };

        for index in 0..count {
            if token.is_cancelled() {
                self.cancelled(&plant_name, index, &mut report);
                return report;
            }

            let stage_name = {
                let mut guard = lock(gallery);
                if guard.generation != generation {
                    return report;
                }
                match guard.state(index) {
                    Some(StageState::Illustrated) => continue,
                    // Another run has this stage in flight.
                    Some(StageState::Loading) => return report,
                    _ => {}
                }
                guard.set_state(index, StageState::Loading);
                guard.stage_name(index).unwrap_or_default().to_string()
            };

            report.requested.push(index);
            log_event(
                &self.events,
                "stage_image_requested",
                payload(json!({
                    "plant": plant_name,
                    "stage_index": index,
                    "stage_name": stage_name,
                })),
            );
            let outcome = gateway.generate_stage_image(&plant_name, &stage_name);

            let mut guard = lock(gallery);
            if guard.generation != generation {
                return report;
            }
            if token.is_cancelled() {
                if guard.state(index) == Some(StageState::Loading) && guard.image(index).is_none() {
                    guard.set_state(index, StageState::Pending);
                }
                drop(guard);
                self.cancelled(&plant_name, index, &mut report);
                return report;
            }

            match outcome {
                Ok(Some(image)) => {
                    guard.store(index, image);
                    drop(guard);
                    report.illustrated.push(index);
                    log_event(
                        &self.events,
                        "stage_image_illustrated",
                        payload(json!({
                            "plant": plant_name,
                            "stage_index": index,
                            "stage_name": stage_name,
                        })),
                    );
                    if index + 1 < count {
                        self.sleeper.sleep(self.delay);
                    }
                }
                Ok(None) => {
                    guard.set_state(index, StageState::Skipped);
                    drop(guard);
                    report.skipped.push(index);
                    log_event(
                        &self.events,
                        "stage_image_skipped",
                        payload(json!({
                            "plant": plant_name,
                            "stage_index": index,
                            "stage_name": stage_name,
                        })),
                    );
                }
                Err(err) => {
                    guard.set_state(index, StageState::Skipped);
                    drop(guard);
                    report.skipped.push(index);
                    log_event(
                        &self.events,
                        "stage_image_skipped",
                        payload(json!({
                            "plant": plant_name,
                            "stage_index": index,
                            "stage_name": stage_name,
                            "error": err.to_string(),
                        })),
                    );
                }
            }
        }
        report
    }

    fn cancelled(&self, plant_name: &str, index: usize, report: &mut IllustrationReport) {
        report.cancelled = true;
        log_event(
            &self.events,
            "illustration_cancelled",
            payload(json!({
                "plant": plant_name,
                "next_stage_index": index,
            })),
        );
    }
}

/// An illustrator run on its own thread. Dropping the task cancels it;
/// the request in flight, if any, still completes but its result is
/// thrown away.
pub struct IllustrationTask {
    token: CancellationToken,
    handle: Option<JoinHandle<IllustrationReport>>,
}

impl IllustrationTask {
    pub fn spawn(
        illustrator: SequentialIllustrator,
        gateway: Arc<dyn PlantGateway>,
        gallery: Arc<Mutex<StageGallery>>,
    ) -> Self {
        let token = CancellationToken::new();
        let worker_token = token.clone();
        let handle =
            thread::spawn(move || illustrator.run(gateway.as_ref(), &gallery, &worker_token));
        Self {
            token,
            handle: Some(handle),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Block until the run ends. `None` if the worker panicked.
    pub fn join(mut self) -> Option<IllustrationReport> {
        self.handle.take().and_then(|handle| handle.join().ok())
    }
}

impl Drop for IllustrationTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
