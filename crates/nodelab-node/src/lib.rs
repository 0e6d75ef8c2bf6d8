//! Node runtime management: remote discovery, downloads, installation
//! orchestration and activation of the global slot.

pub mod activate;
mod fsutil;
pub mod install;
pub mod npm;
pub mod platform;
pub mod process;
pub mod registry;
pub mod remote;
pub mod transport;

pub use activate::{
    Activation, ActivationError, ActivationManager, Activator, BinaryCopier, BinaryInspector,
    ExecInspector, StdBinaryCopier, use_version,
};
pub use install::{InstallOrchestrator, InstallSummary};
pub use registry::Registries;
pub use transport::{HttpTransport, InstallTask, Transport, TransportError};
