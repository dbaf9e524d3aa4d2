//! Service layer: delivery, session lifecycle, and ingress.
//!
//! [`IngressGateway`] is the boundary used by HTTP handlers and the
//! WebSocket adapter. It validates publishes for the [`DeliveryEngine`] and
//! hands new transports to the [`SessionManager`].

pub mod delivery;
pub mod gateway;
pub mod session;

pub use delivery::{DeliveryEngine, DeliveryReport};
pub use gateway::{IngressGateway, PublishLimits, PublishRequest};
pub use session::{SessionManager, SessionOptions};
