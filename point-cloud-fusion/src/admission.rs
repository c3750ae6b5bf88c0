/// Single-flight frame admission: at most one frame is fused at a time.
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Why an arriving frame was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    CaptureDisabled,
    Busy,
    WorkerStopped,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::CaptureDisabled => "capture disabled",
            Self::Busy => "fusion pass in progress",
            Self::WorkerStopped => "fusion worker stopped",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Default)]
struct GateState {
    capturing: AtomicBool,
    busy: AtomicBool,
}

/// Idle/Busy state machine plus the externally toggled capture flag.
///
/// Frames that arrive while capture is off or a pass is running are dropped,
/// never queued. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct FrameAdmissionGate {
    state: Arc<GateState>,
}

impl FrameAdmissionGate {
    pub fn new(capturing: bool) -> Self {
        let gate = Self::default();
        gate.set_capturing(capturing);
        gate
    }

    pub fn set_capturing(&self, capturing: bool) {
        self.state.capturing.store(capturing, Ordering::Release);
    }

    pub fn is_capturing(&self) -> bool {
        self.state.capturing.load(Ordering::Acquire)
    }

    pub fn is_busy(&self) -> bool {
        self.state.busy.load(Ordering::Acquire)
    }

    /// Move Idle -> Busy if capture is enabled. Never blocks.
    pub fn try_admit(&self) -> Result<AdmissionPermit, DropReason> {
        if !self.is_capturing() {
            return Err(DropReason::CaptureDisabled);
        }

        self.state
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DropReason::Busy)?;

        Ok(AdmissionPermit {
            state: Arc::clone(&self.state),
        })
    }
}

/// Proof of admission. The gate returns to Idle when the permit is dropped.
#[derive(Debug)]
#[must_use = "dropping the permit immediately returns the gate to idle"]
pub struct AdmissionPermit {
    state: Arc<GateState>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.state.busy.store(false, Ordering::Release);
    }
}
