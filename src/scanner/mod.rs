//! Feed scanning: the media scanner, session state and operation log

pub mod events;
pub mod manager;
pub mod session;

pub use events::{LoggedEvent, OperationEvent, OperationLog};
pub use manager::MediaScanner;
pub use session::{CancelToken, OperationGuard, OperationLock};
