//! tagmirror daemon runtime: sync scheduler + static HTTP server.

mod error;
mod runtime;
pub mod scheduler;
pub mod server;
pub mod telemetry;

pub use error::{DaemonError, ServeError};
pub use runtime::{run, serve, start_blocking};
pub use server::{router, AppState};
pub use telemetry::{init_tracing, LogFormat};
