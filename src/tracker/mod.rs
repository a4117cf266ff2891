/// Wrapped-asset tracker: reducer task, scoped handle and published snapshot
pub mod handle;
pub mod reducer;
pub mod settings;
pub mod snapshot;
pub mod tasks;

pub use handle::TrackerHandle;
pub use settings::TrackerSettings;
pub use snapshot::TrackerSnapshot;
