//! Gemeinsamer Axum-State

use std::sync::Arc;

use quizhub_db::{ButtonRepository, PresentationRepository};
use quizhub_session::{MessageDispatcher, PressRouter, SessionEngine};

/// Einstellungen der API-Schicht
#[derive(Debug, Clone)]
pub struct ApiKonfig {
    /// Unbekannte Buttons beim ersten Druck automatisch registrieren
    pub auto_registrierung: bool,
}

impl Default for ApiKonfig {
    fn default() -> Self {
        Self {
            auto_registrierung: true,
        }
    }
}

/// Axum-State fuer REST und WebSocket
///
/// Clone ist billig, alle Felder teilen ihren Zustand.
#[derive(Clone)]
pub struct ApiState {
    pub engine: SessionEngine,
    pub dispatcher: MessageDispatcher,
    pub router: PressRouter,
    pub buttons: Arc<dyn ButtonRepository>,
    pub praesentationen: Arc<dyn PresentationRepository>,
    pub konfig: ApiKonfig,
}

impl ApiState {
    pub fn neu(
        engine: SessionEngine,
        buttons: Arc<dyn ButtonRepository>,
        praesentationen: Arc<dyn PresentationRepository>,
        konfig: ApiKonfig,
    ) -> Self {
        Self {
            dispatcher: MessageDispatcher::neu(engine.clone(), Some(praesentationen.clone())),
            router: PressRouter::neu(buttons.clone(), engine.clone()),
            engine,
            buttons,
            praesentationen,
            konfig,
        }
    }
}
