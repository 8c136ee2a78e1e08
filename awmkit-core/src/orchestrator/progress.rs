//! Single-latest-snapshot progress reporting: push (callback) and pull
//! (poll) semantics over the same underlying state.

use std::sync::Arc;

use parking_lot::Mutex;

/// Longest `phase_label` the snapshot will carry, in UTF-8 characters.
const PHASE_LABEL_MAX_CHARS: usize = 63;

/// Which kind of call a [`ProgressBus`] is currently tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    None,
    Embed,
    Detect,
}

/// A phase of the embed/detect pipeline, in the order the orchestrator
/// walks through them. `RouteStep` carries the 0-indexed channel pair
/// currently being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PrepareInput,
    Precheck,
    Core,
    RouteStep(usize),
    Merge,
    Evidence,
    CloneCheck,
    Finalize,
}

impl Phase {
    /// Fixed position in the state machine, `RouteStep` collapsing to a
    /// single step regardless of which pair it names.
    fn step_index(self) -> usize {
        match self {
            Phase::PrepareInput => 0,
            Phase::Precheck => 1,
            Phase::Core => 2,
            Phase::RouteStep(_) => 3,
            Phase::Merge => 4,
            Phase::Evidence => 5,
            Phase::CloneCheck => 6,
            Phase::Finalize => 7,
        }
    }

    /// Total number of fixed steps in the state machine.
    const STEP_TOTAL: usize = 8;

    fn label(self) -> String {
        match self {
            Phase::PrepareInput => "prepare_input".to_string(),
            Phase::Precheck => "precheck".to_string(),
            Phase::Core => "core".to_string(),
            Phase::RouteStep(pair) => format!("route_step({pair})"),
            Phase::Merge => "merge".to_string(),
            Phase::Evidence => "evidence".to_string(),
            Phase::CloneCheck => "clone_check".to_string(),
            Phase::Finalize => "finalize".to_string(),
        }
    }
}

/// Coarse state of an operation tracked by a [`ProgressBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// A point-in-time view of an operation's progress: the fixed-layout
/// record described by the external interface.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub op_id: u64,
    pub operation: Operation,
    pub phase: Phase,
    pub state: OpState,
    pub determinate: bool,
    pub completed_units: u64,
    pub total_units: u64,
    pub step_index: usize,
    pub step_total: usize,
    /// Human-readable phase label, truncated to `PHASE_LABEL_MAX_CHARS`
    /// characters.
    pub phase_label: String,
    pub message: Option<String>,
}

fn truncate_label(label: String) -> String {
    if label.chars().count() <= PHASE_LABEL_MAX_CHARS {
        label
    } else {
        label.chars().take(PHASE_LABEL_MAX_CHARS).collect()
    }
}

type ProgressCallback = Arc<dyn Fn(&ProgressSnapshot) + Send + Sync>;

struct Inner {
    next_op_id: u64,
    latest: Option<ProgressSnapshot>,
    callback: Option<ProgressCallback>,
}

/// Thread-safe progress observable. Only the single latest snapshot is
/// ever retained; callers that need a full history must subscribe via
/// [`ProgressBus::set_callback`] before the operation starts.
pub struct ProgressBus {
    inner: Mutex<Inner>,
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBus {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_op_id: 1,
                latest: None,
                callback: None,
            }),
        }
    }

    /// Registers a push-mode callback invoked on every [`ProgressBus::push`],
    /// [`ProgressBus::complete`], and [`ProgressBus::fail`] call. The
    /// callback runs with no lock on this bus held, so it may safely call
    /// back into `push`/`poll`/`clear` without deadlocking.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(&ProgressSnapshot) + Send + Sync + 'static,
    {
        self.inner.lock().callback = Some(Arc::new(callback));
    }

    /// Allocates a new monotonically increasing operation id and marks it
    /// `Running` at [`Phase::PrepareInput`].
    pub fn start_operation(&self, operation: Operation) -> u64 {
        let op_id = {
            let mut inner = self.inner.lock();
            let op_id = inner.next_op_id;
            inner.next_op_id += 1;
            op_id
        };
        self.push_with_units(op_id, operation, Phase::PrepareInput, None);
        op_id
    }

    /// Pushes a running update at `phase`, with no unit-progress
    /// information within the phase.
    pub fn push(&self, op_id: u64, phase: Phase) {
        self.push_units(op_id, phase, None);
    }

    /// Pushes a running update at `phase`, optionally reporting
    /// `(completed, total)` unit progress within that phase (e.g. the
    /// current channel pair out of however many the layout has).
    pub fn push_units(&self, op_id: u64, phase: Phase, units: Option<(u64, u64)>) {
        let operation = self.current_operation(op_id);
        self.push_with_units(op_id, operation, phase, units);
    }

    fn push_with_units(
        &self,
        op_id: u64,
        operation: Operation,
        phase: Phase,
        units: Option<(u64, u64)>,
    ) {
        let (completed_units, total_units, determinate) = match units {
            Some((completed, total)) => (completed, total, true),
            None => (0, 0, false),
        };
        let snapshot = ProgressSnapshot {
            op_id,
            operation,
            phase,
            state: OpState::Running,
            determinate,
            completed_units,
            total_units,
            step_index: phase.step_index(),
            step_total: Phase::STEP_TOTAL,
            phase_label: truncate_label(phase.label()),
            message: None,
        };
        self.publish(snapshot);
    }

    pub fn complete(&self, op_id: u64) {
        let operation = self.current_operation(op_id);
        let snapshot = ProgressSnapshot {
            op_id,
            operation,
            phase: Phase::Finalize,
            state: OpState::Completed,
            determinate: true,
            completed_units: Phase::STEP_TOTAL as u64,
            total_units: Phase::STEP_TOTAL as u64,
            step_index: Phase::Finalize.step_index(),
            step_total: Phase::STEP_TOTAL,
            phase_label: truncate_label(Phase::Finalize.label()),
            message: None,
        };
        self.publish(snapshot);
    }

    pub fn fail(&self, op_id: u64, phase: Phase, message: String) {
        let operation = self.current_operation(op_id);
        let snapshot = ProgressSnapshot {
            op_id,
            operation,
            phase,
            state: OpState::Failed,
            determinate: false,
            completed_units: 0,
            total_units: 0,
            step_index: phase.step_index(),
            step_total: Phase::STEP_TOTAL,
            phase_label: truncate_label(phase.label()),
            message: Some(message),
        };
        self.publish(snapshot);
    }

    /// Pull-mode read of the single latest snapshot, if any operation has
    /// started.
    pub fn poll(&self) -> Option<ProgressSnapshot> {
        self.inner.lock().latest.clone()
    }

    /// Resets the bus to idle, as required on the `Completed`/`Failed` ->
    /// `Idle` transition once a caller has observed the terminal snapshot.
    pub fn clear(&self) {
        self.inner.lock().latest = None;
    }

    fn current_operation(&self, op_id: u64) -> Operation {
        match &self.inner.lock().latest {
            Some(snapshot) if snapshot.op_id == op_id => snapshot.operation,
            _ => Operation::None,
        }
    }

    /// Stores `snapshot` and invokes the registered callback, if any, with
    /// no lock on this bus held — the callback is free to call back into
    /// `push`/`poll`/`clear` without deadlocking.
    fn publish(&self, snapshot: ProgressSnapshot) {
        let callback = {
            let mut inner = self.inner.lock();
            inner.latest = Some(snapshot.clone());
            inner.callback.clone()
        };
        if let Some(callback) = callback {
            callback(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn op_ids_are_monotonically_increasing() {
        let bus = ProgressBus::new();
        let a = bus.start_operation(Operation::Embed);
        let b = bus.start_operation(Operation::Embed);
        assert!(b > a);
    }

    #[test]
    fn poll_reflects_latest_snapshot_only() {
        let bus = ProgressBus::new();
        let op_id = bus.start_operation(Operation::Detect);
        bus.push(op_id, Phase::RouteStep(2));
        let snapshot = bus.poll().unwrap();
        assert_eq!(snapshot.phase, Phase::RouteStep(2));
        assert_eq!(snapshot.state, OpState::Running);
        assert_eq!(snapshot.operation, Operation::Detect);
        assert_eq!(snapshot.step_index, 3);
        assert_eq!(snapshot.step_total, Phase::STEP_TOTAL);
    }

    #[test]
    fn complete_and_fail_set_terminal_state() {
        let bus = ProgressBus::new();
        let op_id = bus.start_operation(Operation::Embed);
        bus.complete(op_id);
        assert_eq!(bus.poll().unwrap().state, OpState::Completed);

        let op_id2 = bus.start_operation(Operation::Embed);
        bus.fail(op_id2, Phase::Core, "boom".into());
        let snapshot = bus.poll().unwrap();
        assert_eq!(snapshot.state, OpState::Failed);
        assert_eq!(snapshot.message.as_deref(), Some("boom"));
    }

    #[test]
    fn clear_resets_a_terminal_snapshot_to_idle() {
        let bus = ProgressBus::new();
        let op_id = bus.start_operation(Operation::Embed);
        bus.complete(op_id);
        assert!(bus.poll().is_some());
        bus.clear();
        assert!(bus.poll().is_none());
    }

    #[test]
    fn unit_progress_reports_completed_and_total() {
        let bus = ProgressBus::new();
        let op_id = bus.start_operation(Operation::Embed);
        bus.push_units(op_id, Phase::RouteStep(1), Some((2, 3)));
        let snapshot = bus.poll().unwrap();
        assert_eq!(snapshot.completed_units, 2);
        assert_eq!(snapshot.total_units, 3);
        assert!(snapshot.determinate);
    }

    #[test]
    fn phase_label_is_bounded() {
        let bus = ProgressBus::new();
        let op_id = bus.start_operation(Operation::Embed);
        bus.push(op_id, Phase::RouteStep(999_999_999));
        let snapshot = bus.poll().unwrap();
        assert!(snapshot.phase_label.chars().count() <= PHASE_LABEL_MAX_CHARS);
    }

    #[test]
    fn callback_fires_on_every_push() {
        let bus = ProgressBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        bus.set_callback(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let op_id = bus.start_operation(Operation::Embed);
        bus.push(op_id, Phase::Merge);
        bus.complete(op_id);

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn callback_can_reenter_the_bus_without_deadlocking() {
        let bus = Arc::new(ProgressBus::new());
        let bus_in_callback = bus.clone();
        bus.set_callback(move |snapshot| {
            // Reentrant poll: this would deadlock if `publish` still held
            // the lock while invoking the callback.
            let _ = bus_in_callback.poll();
            let _ = snapshot;
        });

        let op_id = bus.start_operation(Operation::Embed);
        bus.push(op_id, Phase::Core);
    }
}
