//! quizhub-api – HTTP-Schnittstellen des Quiz-Servers
//!
//! - **WebSocket** (`/ws/:room`): Host, Teams und Anzeigen eines Raums
//! - **REST** (`/api/...`): Raeume, Hardware-Buttons und Praesentationen
//!
//! Alle Zugaenge teilen sich einen [`ApiState`] mit derselben
//! [`quizhub_session::SessionEngine`].

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;
pub mod ws;

pub use error::{ApiError, ApiResult};
pub use routes::api_router;
pub use server::{RestServer, RestServerKonfig};
pub use state::{ApiKonfig, ApiState};
