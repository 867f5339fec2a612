pub mod connection;
pub mod poller;
pub mod room;
pub mod session;

pub use connection::ChatConnection;
pub use room::{FixedDelayAssigner, HttpRoomAssigner, RoomAssigner};
pub use session::SessionClient;
