//! Operation flows and the collaborator contracts they drive

pub mod runner;
pub mod traits;

pub use runner::{FlowRunner, UpscaleOutcome};
pub use traits::{DownloadOrchestrator, OrganizedMedia, UpscaleApi};
