/// Capture session: admits frames through the gate and fuses them on a worker thread.
use crate::admission::{AdmissionPermit, DropReason, FrameAdmissionGate};
use crate::frame::FrameSample;
use crate::fusion::{FusionEngine, FusionStats};
use crate::merge_store::Vertex;
use crate::ply::{self, PlyError, PlyExport};
use crate::render::PointGeometry;
use crate::settings::FusionSettings;
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, info, warn};

const WORKER_THREAD_NAME: &str = "point-cloud-fusion";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("fusion worker has stopped")]
    WorkerStopped,
    #[error(transparent)]
    Export(#[from] PlyError),
}

/// Outcome of offering a frame to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Dropped(DropReason),
}

/// Counters for frames offered and fused since the session started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub admitted: usize,
    pub dropped_disabled: usize,
    pub dropped_busy: usize,
    pub dropped_stopped: usize,
    pub frames_fused: usize,
    /// Admitted frames whose buffers or camera matrices were unusable.
    pub frames_skipped: usize,
    pub fusion: FusionStats,
}

#[derive(Debug, Clone, Copy, Default)]
struct WorkerStats {
    frames_fused: usize,
    frames_skipped: usize,
    fusion: FusionStats,
}

#[derive(Debug, Default)]
struct SubmitCounters {
    admitted: AtomicUsize,
    dropped_disabled: AtomicUsize,
    dropped_busy: AtomicUsize,
    dropped_stopped: AtomicUsize,
}

impl SubmitCounters {
    fn record(&self, admission: Admission) {
        let counter = match admission {
            Admission::Admitted => &self.admitted,
            Admission::Dropped(DropReason::CaptureDisabled) => &self.dropped_disabled,
            Admission::Dropped(DropReason::Busy) => &self.dropped_busy,
            Admission::Dropped(DropReason::WorkerStopped) => &self.dropped_stopped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

enum Command {
    /// The permit travels with the frame so the gate stays busy until the pass ends.
    Fuse {
        frame: Box<FrameSample>,
        permit: AdmissionPermit,
    },
    Snapshot(Sender<Vec<Vertex>>),
    Sampled(usize, Sender<Vec<Vertex>>),
    Stats(Sender<WorkerStats>),
    Reset,
    Sync(Sender<()>),
    Shutdown,
}

/// Owns the fusion worker. The merged point set lives only on that thread;
/// callers read it through snapshots.
pub struct CaptureSession {
    gate: FrameAdmissionGate,
    commands: Sender<Command>,
    counters: Arc<SubmitCounters>,
    render_stride: usize,
    worker: Option<JoinHandle<()>>,
}

impl CaptureSession {
    /// Start the worker with capture disabled.
    pub fn spawn(settings: FusionSettings) -> io::Result<Self> {
        let render_stride = settings.render_stride;
        let (commands, receiver) = unbounded();

        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(FusionEngine::new(settings), receiver))?;

        Ok(Self {
            gate: FrameAdmissionGate::new(false),
            commands,
            counters: Arc::new(SubmitCounters::default()),
            render_stride,
            worker: Some(worker),
        })
    }

    pub fn gate(&self) -> &FrameAdmissionGate {
        &self.gate
    }

    pub fn set_capturing(&self, capturing: bool) {
        info!("Capture {}", if capturing { "enabled" } else { "disabled" });
        self.gate.set_capturing(capturing);
    }

    pub fn is_capturing(&self) -> bool {
        self.gate.is_capturing()
    }

    /// Offer a frame. Returns immediately; admitted frames are fused on the worker.
    pub fn submit(&self, frame: FrameSample) -> Admission {
        let timestamp = frame.timestamp;
        let admission = match self.gate.try_admit() {
            Ok(permit) => {
                let command = Command::Fuse {
                    frame: Box::new(frame),
                    permit,
                };
                // A failed send hands the command back and its permit drops with it.
                match self.commands.send(command) {
                    Ok(()) => Admission::Admitted,
                    Err(_) => Admission::Dropped(DropReason::WorkerStopped),
                }
            }
            Err(reason) => Admission::Dropped(reason),
        };

        if let Admission::Dropped(reason) = admission {
            debug!("Dropped frame at {:.3}s: {}", timestamp, reason);
        }
        self.counters.record(admission);
        admission
    }

    /// Block until every command sent so far has been handled.
    pub fn wait_idle(&self) -> Result<(), SessionError> {
        self.request(Command::Sync)
    }

    pub fn snapshot(&self) -> Result<Vec<Vertex>, SessionError> {
        self.request(Command::Snapshot)
    }

    /// Downsampled geometry for the point renderer.
    pub fn render_geometry(&self) -> Result<PointGeometry, SessionError> {
        let stride = self.render_stride;
        let vertices = self.request(|reply| Command::Sampled(stride, reply))?;
        Ok(PointGeometry::from_vertices(&vertices))
    }

    pub fn export(&self) -> Result<PlyExport, SessionError> {
        Ok(ply::export(&self.snapshot()?)?)
    }

    /// Clear the merged point set. Frames already queued are fused after the reset.
    pub fn reset(&self) -> Result<(), SessionError> {
        self.commands
            .send(Command::Reset)
            .map_err(|_| SessionError::WorkerStopped)
    }

    pub fn stats(&self) -> Result<SessionStats, SessionError> {
        let worker = self.request(Command::Stats)?;
        Ok(SessionStats {
            admitted: self.counters.admitted.load(Ordering::Relaxed),
            dropped_disabled: self.counters.dropped_disabled.load(Ordering::Relaxed),
            dropped_busy: self.counters.dropped_busy.load(Ordering::Relaxed),
            dropped_stopped: self.counters.dropped_stopped.load(Ordering::Relaxed),
            frames_fused: worker.frames_fused,
            frames_skipped: worker.frames_skipped,
            fusion: worker.fusion,
        })
    }

    /// Stop the worker after it drains queued commands. Later submissions are dropped.
    pub fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.commands.send(Command::Shutdown);
            if worker.join().is_err() {
                warn!("Fusion worker panicked");
            }
        }
    }

    fn request<T>(&self, command: impl FnOnce(Sender<T>) -> Command) -> Result<T, SessionError> {
        let (reply, response) = bounded(1);
        self.commands
            .send(command(reply))
            .map_err(|_| SessionError::WorkerStopped)?;
        response.recv().map_err(|_| SessionError::WorkerStopped)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(mut engine: FusionEngine, commands: Receiver<Command>) {
    let mut stats = WorkerStats::default();

    for command in commands {
        match command {
            Command::Fuse { frame, permit } => {
                match engine.process(&frame) {
                    Ok(frame_stats) => {
                        stats.frames_fused += 1;
                        stats.fusion += frame_stats;
                    }
                    Err(err) => {
                        stats.frames_skipped += 1;
                        warn!("Skipped frame at {:.3}s: {}", frame.timestamp, err);
                    }
                }
                drop(permit);
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(engine.store().snapshot());
            }
            Command::Sampled(stride, reply) => {
                let _ = reply.send(engine.store().sampled(stride));
            }
            Command::Stats(reply) => {
                let _ = reply.send(stats);
            }
            Command::Reset => {
                engine.reset();
                info!("Point cloud reset");
            }
            Command::Sync(reply) => {
                let _ = reply.send(());
            }
            Command::Shutdown => break,
        }
    }

    debug!("Fusion worker exiting with {} points", engine.store().len());
}
