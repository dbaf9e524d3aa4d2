//! Relay client: connection state machine, event bindings, and a
//! WebSocket client built on tokio-tungstenite.

pub mod bindings;
pub mod relay_client;
pub mod state;

pub use bindings::{BindingId, EventBindings};
pub use relay_client::{ClientError, RelayClient};
pub use state::{ClientEvent, ClientState};
