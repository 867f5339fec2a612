pub mod config;
pub mod errors;
pub mod message;
pub mod room;
pub mod session;

pub use config::ClientConfig;
pub use room::RoomId;
pub use session::{ConnectionState, PollHealth, SessionSnapshot};
