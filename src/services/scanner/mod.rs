pub mod classify;
pub mod ephemeral;
pub mod walker;

pub use classify::{classify, ClassifiedFileSet, FileCategory};
pub use ephemeral::{
    sweep_stale_runs, touch_live_marker, EphemeralTracker, LiveMarker, LIVE_MARKER,
    MOUNT_DIR_PREFIX, RUN_DIR_PREFIX,
};
pub use walker::Scanner;
