//! volley-exec: concurrent SSH execution engine
//!
//! Bounded-concurrency dispatch, a per-host connect/retry state machine, and
//! order-preserving result collection over a pluggable transport.

pub mod dispatch;
pub mod error;
pub mod result;
pub mod session;
pub mod ssh;
pub mod target;
pub mod transport;

pub use dispatch::Dispatcher;
pub use error::ExecError;
pub use result::{CommandOutput, HostResult};
pub use target::{HostKeyPolicy, Target};
pub use transport::{Connection, Transport};
