//! Result cell for one forked unit

use parking_lot::{Condvar, Mutex};

use vthread_core::error::{TaskFailure, VtError, VtResult};
use vthread_core::traits::{ErasedValue, StructuredSubtask, SubtaskState};

/// Completion slot written once by the unit, read by the scope owner
pub struct SubtaskCell {
    slot: Mutex<CellSlot>,
    ready: Condvar,
}

struct CellSlot {
    state: SubtaskState,
    value: Option<ErasedValue>,
    failure: Option<TaskFailure>,
}

impl CellSlot {
    fn execution_error(&self) -> VtError {
        VtError::Execution(self.failure.clone().unwrap_or(TaskFailure::NoResult))
    }
}

impl SubtaskCell {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(CellSlot {
                state: SubtaskState::Running,
                value: None,
                failure: None,
            }),
            ready: Condvar::new(),
        }
    }

    /// Record the unit's outcome; later calls are ignored
    pub(crate) fn complete(&self, outcome: Result<ErasedValue, TaskFailure>) {
        let mut slot = self.slot.lock();
        if slot.state.is_terminal() {
            return;
        }
        match outcome {
            Ok(value) => {
                slot.state = SubtaskState::Success;
                slot.value = Some(value);
            }
            Err(failure) => {
                slot.state = if failure.is_cancelled() {
                    SubtaskState::Cancelled
                } else {
                    SubtaskState::Failed
                };
                slot.failure = Some(failure);
            }
        }
        self.ready.notify_all();
    }

    /// Block until the unit is terminal
    pub fn wait(&self) -> SubtaskState {
        let mut slot = self.slot.lock();
        self.ready.wait_while(&mut slot, |s| !s.state.is_terminal());
        slot.state
    }
}

impl StructuredSubtask for SubtaskCell {
    fn state(&self) -> SubtaskState {
        self.slot.lock().state
    }

    fn failure(&self) -> Option<TaskFailure> {
        self.slot.lock().failure.clone()
    }

    fn take(&self) -> VtResult<ErasedValue> {
        let mut slot = self.slot.lock();
        self.ready.wait_while(&mut slot, |s| !s.state.is_terminal());
        match slot.state {
            SubtaskState::Success => slot.value.take().ok_or(VtError::ResultTaken),
            _ => Err(slot.execution_error()),
        }
    }

    fn inspect(&self, reader: &mut dyn FnMut(&ErasedValue)) -> VtResult<()> {
        let mut slot = self.slot.lock();
        self.ready.wait_while(&mut slot, |s| !s.state.is_terminal());
        match (slot.state, slot.value.as_ref()) {
            (SubtaskState::Success, Some(value)) => {
                reader(value);
                Ok(())
            }
            (SubtaskState::Success, None) => Err(VtError::ResultTaken),
            _ => Err(slot.execution_error()),
        }
    }
}

impl std::fmt::Debug for SubtaskCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubtaskCell")
            .field("state", &self.state())
            .finish()
    }
}
