//! Verbindungs-Hub – Send-Queues aller Verbindungen eines Raums
//!
//! Jeder Raum besitzt genau einen Hub. Der Hub wird nur unter dem Lock des
//! Raums gelesen oder veraendert, Registrierung, Abmeldung und Fan-out
//! koennen sich daher nie ueberschneiden.
//!
//! Gesendet wird ausschliesslich per `try_send`. Eine volle oder geschlossene
//! Queue fuehrt dazu, dass die Verbindung aus dem Hub entfernt wird; der
//! Writer-Task der Verbindung sieht danach das Ende seiner Queue und
//! schliesst den Socket.

use std::collections::HashMap;
use std::sync::Arc;

use quizhub_core::{ConnectionId, TeamId};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::messages::ServerMessage;

/// Rolle einer Verbindung im Raum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rolle {
    /// Teilnehmer-Client, optional an ein Team gebunden
    Team,
    /// Moderator, darf den Ablauf steuern
    Host,
    /// Reine Anzeige (Beamer, Zuschauer)
    Display,
}

impl std::fmt::Display for Rolle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Team => f.write_str("team"),
            Self::Host => f.write_str("host"),
            Self::Display => f.write_str("display"),
        }
    }
}

/// Empfangsseite einer Verbindung, wird vom Writer-Task geleert
pub type VerbindungsEmpfaenger = mpsc::Receiver<Arc<ServerMessage>>;

/// Eine registrierte Verbindung
#[derive(Debug)]
pub struct Verbindung {
    pub id: ConnectionId,
    pub rolle: Rolle,
    pub team: Option<TeamId>,
    tx: mpsc::Sender<Arc<ServerMessage>>,
}

impl Verbindung {
    /// Reiht eine Nachricht nicht-blockierend ein
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    fn senden(&self, nachricht: Arc<ServerMessage>) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn = %self.id, "Send-Queue voll – Verbindung wird getrennt");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(conn = %self.id, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

/// Menge der Verbindungen eines Raums
#[derive(Debug)]
pub struct VerbindungsHub {
    verbindungen: HashMap<ConnectionId, Verbindung>,
    queue_groesse: usize,
}

impl VerbindungsHub {
    pub fn neu(queue_groesse: usize) -> Self {
        Self {
            verbindungen: HashMap::new(),
            queue_groesse: queue_groesse.max(1),
        }
    }

    /// Legt eine neue Verbindung an und gibt ihre Empfangs-Queue zurueck
    pub fn registrieren(
        &mut self,
        rolle: Rolle,
        team: Option<TeamId>,
    ) -> (ConnectionId, VerbindungsEmpfaenger) {
        let (tx, rx) = mpsc::channel(self.queue_groesse);
        let id = ConnectionId::new();
        self.verbindungen.insert(
            id,
            Verbindung {
                id,
                rolle,
                team,
                tx,
            },
        );
        (id, rx)
    }

    /// Entfernt eine Verbindung (idempotent)
    pub fn entfernen(&mut self, id: &ConnectionId) -> Option<Verbindung> {
        self.verbindungen.remove(id)
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&Verbindung> {
        self.verbindungen.get(id)
    }

    /// Bindet eine bestehende Verbindung an ein Team
    pub fn team_setzen(&mut self, id: &ConnectionId, team: Option<TeamId>) -> bool {
        match self.verbindungen.get_mut(id) {
            Some(v) => {
                v.team = team;
                true
            }
            None => false,
        }
    }

    pub fn anzahl(&self) -> usize {
        self.verbindungen.len()
    }

    pub fn ist_leer(&self) -> bool {
        self.verbindungen.is_empty()
    }

    /// Sendet an alle Verbindungen, gibt die dabei getrennten zurueck
    pub fn an_alle_senden(&mut self, nachricht: ServerMessage) -> Vec<Verbindung> {
        self.an_gefilterte_senden(nachricht, |_| true)
    }

    /// Sendet an alle Verbindungen, die den Filter erfuellen
    pub fn an_gefilterte_senden<F>(&mut self, nachricht: ServerMessage, filter: F) -> Vec<Verbindung>
    where
        F: Fn(&Verbindung) -> bool,
    {
        let nachricht = Arc::new(nachricht);
        let fehlgeschlagen: Vec<ConnectionId> = self
            .verbindungen
            .values()
            .filter(|v| filter(v))
            .filter(|v| !v.senden(Arc::clone(&nachricht)))
            .map(|v| v.id)
            .collect();

        fehlgeschlagen
            .iter()
            .filter_map(|id| self.verbindungen.remove(id))
            .collect()
    }

    /// Sendet an eine einzelne Verbindung
    ///
    /// `Err` enthaelt die Verbindung, falls sie dabei getrennt wurde.
    pub fn an_verbindung_senden(
        &mut self,
        id: &ConnectionId,
        nachricht: ServerMessage,
    ) -> Result<bool, Verbindung> {
        let Some(verbindung) = self.verbindungen.get(id) else {
            return Ok(false);
        };
        if verbindung.senden(Arc::new(nachricht)) {
            return Ok(true);
        }
        match self.verbindungen.remove(id) {
            Some(v) => Err(v),
            None => Ok(false),
        }
    }

    /// Trennt alle Verbindungen, gibt die Anzahl zurueck
    pub fn alle_trennen(&mut self) -> usize {
        let anzahl = self.verbindungen.len();
        self.verbindungen.clear();
        anzahl
    }
}
