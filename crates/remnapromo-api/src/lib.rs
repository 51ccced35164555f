// remnapromo-api: Async Rust client for the Remnawave panel REST API

pub mod error;
pub mod panel;
pub mod transport;

pub use error::Error;
pub use panel::client::PanelClient;
pub use panel::models::{CreateUserRequest, PanelUser, TrafficLimitStrategy, UserStatus};
pub use transport::{PanelAuth, TlsMode, TransportConfig};
