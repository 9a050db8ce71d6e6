// Session module - Interactive terminal session over one serial connection
pub mod keys;
pub mod session;
pub mod state;

pub use keys::Command;
pub use session::{Session, TICK_PERIOD};
pub use state::{SessionPhase, SessionState};
