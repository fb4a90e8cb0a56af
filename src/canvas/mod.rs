pub mod host;
pub mod snapshot;

pub use host::CanvasHost;
pub use snapshot::{CanvasSnapshotter, Snapshot};
