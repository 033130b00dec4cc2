pub mod logging;

pub use tracing;

/// Lifecycle notifications broadcast from the controller to long-running
/// components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Stop accepting work and wind down.
    Shutdown,
    /// Every component has released its resources.
    Finalised,
}
