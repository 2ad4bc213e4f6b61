//! The gateway server: an axum WebSocket endpoint that bridges each
//! client connection onto the shared bus driver. One session per
//! connection; each session runs a reader, an exclusive writer (which
//! also owns the liveness prober), and one drain task per
//! subscription, all scoped to a single cancellation token.

mod form;
pub mod server;
pub mod session;

pub use server::{build_router, start, AppState, ServerHandle};
pub use session::{ClientInputError, SessionRequest, SocketGateway};
