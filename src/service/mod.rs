pub mod sync_queue;
pub mod token_gate;

pub use sync_queue::{SyncJob, SyncQueue};
pub use token_gate::TokenGate;
