pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use mocks::{
    Args, FailingListener, PanickingListener, RecordingListener, RendezvousListener, SlowListener,
};
pub use setup::RegistryBuilder;
