pub mod cleanup;

pub use cleanup::{CleanupReport, CleanupService};
