//! WebSocket-Zugang fuer Host, Teams und Anzeigen
//!
//! Pro Verbindung laeuft ein Actor: ein Writer-Task leert die Send-Queue der
//! Engine in den Socket, der Reader gibt eingehende Nachrichten an den
//! [`quizhub_session::MessageDispatcher`] weiter.

pub mod actor;
pub mod handler;

pub use handler::ws_upgrade;
