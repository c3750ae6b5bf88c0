/// Depth + colour frame fusion into a deduplicated, exportable point cloud.
pub mod admission;
pub mod buffer;
pub mod camera;
pub mod capture;
pub mod color;
pub mod frame;
pub mod fusion;
pub mod merge_store;
pub mod ply;
pub mod render;
pub mod session;
pub mod settings;

#[cfg(test)]
mod test_support;

pub use admission::{AdmissionPermit, DropReason, FrameAdmissionGate};
pub use buffer::{BufferError, PixelBuffer, PlanarBuffer, PlanarBufferView, Plane};
pub use camera::{InterfaceOrientation, Unprojector};
pub use capture::{Capture, CaptureError, CaptureManifest, FrameRecord};
pub use frame::{ConfidenceLevel, DepthData, FrameSample};
pub use fusion::{FusionEngine, FusionError, FusionStats, fuse_frame};
pub use merge_store::{GridKey, SpatialMergeStore, Vertex};
pub use ply::{PlyError, PlyExport};
pub use render::PointGeometry;
pub use session::{Admission, CaptureSession, SessionError, SessionStats};
pub use settings::{FusionSettings, SettingsError};
