mod admission;
mod handlers;
mod state;

pub use admission::{AdmissionController, AdmissionPermit};
pub use handlers::{build_router, run_server};
pub use state::ServerState;
