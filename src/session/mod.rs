//! SCR client - Session Layer
//!
//! The protocol state machine between a race server and a control policy:
//!
//! - **Configuration**: [`SessionConfig`] and its builder
//! - **State machine**: [`Session`], `Disconnected → Identifying → Driving → Terminated`
//! - **Episodes**: [`EpisodeRunner`] re-identifies after a server restart
//!
//! One session is one strictly sequential receive, decide, send loop. The
//! only suspension point is the bounded receive, which is also where
//! cancellation is observed.

mod config;
mod episode;
mod error;
#[allow(clippy::module_inception)]
mod session;
mod state;

pub use config::*;
pub use episode::*;
pub use error::*;
pub use session::*;
pub use state::*;
