//! Press-Router – leitet Hardware-Button-Drucke an die Engine weiter
//!
//! Ablauf pro Druck:
//! 1. `druck_erfassen` in der Registry (zaehlt den Druck, prueft Status)
//! 2. Unbekannt, deaktiviert oder ohne Zuordnung endet hier, die Engine
//!    wird nicht erreicht
//! 3. Sonst `antwort_einreichen(raum, team)` und deren Ergebnis
//!
//! Der Router legt nie selbst Buttons an.

use std::sync::Arc;

use quizhub_core::{QuizEvent, RoomCode, TeamId};
use quizhub_db::{mac_normalisieren, ButtonRepository, DbError};
use tracing::debug;

use crate::engine::SessionEngine;
use crate::error::{SessionError, SessionResult};
use crate::messages::LedgerEintrag;

/// Ergebnis eines angenommenen Drucks
#[derive(Debug, Clone, PartialEq)]
pub struct DruckErgebnis {
    pub mac: String,
    pub room: RoomCode,
    pub team_id: TeamId,
    pub eintrag: LedgerEintrag,
}

/// Verbindet Button-Registry und Session-Engine
#[derive(Clone)]
pub struct PressRouter {
    buttons: Arc<dyn ButtonRepository>,
    engine: SessionEngine,
}

impl PressRouter {
    pub fn neu(buttons: Arc<dyn ButtonRepository>, engine: SessionEngine) -> Self {
        Self { buttons, engine }
    }

    /// Verarbeitet den Druck eines Buttons
    ///
    /// Fehler: `UnbekannterButton`, `ButtonInaktiv`, `NichtZugeordnet` vor der
    /// Engine; danach alle Ablehnungen von `antwort_einreichen`.
    pub async fn druck_verarbeiten(&self, mac: &str) -> SessionResult<DruckErgebnis> {
        let mac = mac_normalisieren(mac);

        let button = match self.buttons.druck_erfassen(&mac).await {
            Ok(button) => button,
            Err(DbError::NichtGefunden(_)) => {
                return Err(self.abgelehnt(SessionError::UnbekannterButton(mac), None))
            }
            Err(DbError::ButtonInaktiv(_)) => {
                return Err(self.abgelehnt(SessionError::ButtonInaktiv(mac), None))
            }
            Err(e) => return Err(e.into()),
        };

        let Some((room, team_id)) = button.zuordnung() else {
            return Err(self.abgelehnt(
                SessionError::NichtZugeordnet(mac),
                button.room_code.as_ref(),
            ));
        };
        let room = room.clone();

        let eintrag = self.engine.antwort_einreichen(&room, team_id)?;
        Ok(DruckErgebnis {
            mac,
            room,
            team_id,
            eintrag,
        })
    }

    fn abgelehnt(&self, fehler: SessionError, room: Option<&RoomCode>) -> SessionError {
        debug!(grund = fehler.code(), fehler = %fehler, "Button-Druck vor der Engine abgelehnt");
        if let Some(room) = room {
            self.engine.melden(QuizEvent::AntwortAbgelehnt {
                room: room.clone(),
                grund: fehler.code().to_string(),
            });
        }
        fehler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SitzungsKonfig;
    use async_trait::async_trait;
    use chrono::Utc;
    use parking_lot::Mutex;
    use quizhub_db::{ButtonRecord, ButtonZuordnung, DbResult};
    use std::collections::HashMap;

    /// Registry im Speicher, zaehlt Drucke wie die SQLite-Variante
    #[derive(Default)]
    struct SpeicherRegistry {
        buttons: Mutex<HashMap<String, ButtonRecord>>,
    }

    impl SpeicherRegistry {
        fn mit(mac: &str, zuordnung: Option<(RoomCode, TeamId)>, aktiv: bool) -> Self {
            let registry = Self::default();
            let mac = mac_normalisieren(mac);
            let jetzt = Utc::now();
            registry.buttons.lock().insert(
                mac.clone(),
                ButtonRecord {
                    id: format!("btn_{mac}"),
                    mac_address: mac,
                    button_id: "1".into(),
                    name: String::new(),
                    room_code: zuordnung.as_ref().map(|(r, _)| r.clone()),
                    team_id: zuordnung.map(|(_, t)| t),
                    team_name: String::new(),
                    is_active: aktiv,
                    press_count: 0,
                    last_press: None,
                    created_at: jetzt,
                    updated_at: jetzt,
                },
            );
            registry
        }
    }

    #[async_trait]
    impl ButtonRepository for SpeicherRegistry {
        async fn registrieren(&self, _: &str, _: &str, _: &str) -> DbResult<ButtonRecord> {
            Err(DbError::intern("Router darf keine Buttons anlegen"))
        }
        async fn laden(&self, mac: &str) -> DbResult<Option<ButtonRecord>> {
            Ok(self.buttons.lock().get(&mac_normalisieren(mac)).cloned())
        }
        async fn druck_erfassen(&self, mac: &str) -> DbResult<ButtonRecord> {
            let mut buttons = self.buttons.lock();
            let button = buttons
                .get_mut(&mac_normalisieren(mac))
                .ok_or_else(|| DbError::nicht_gefunden(mac))?;
            if !button.is_active {
                return Err(DbError::ButtonInaktiv(mac.into()));
            }
            button.press_count += 1;
            Ok(button.clone())
        }
        async fn zuordnen(&self, _: &str, _: ButtonZuordnung<'_>) -> DbResult<ButtonRecord> {
            unimplemented!()
        }
        async fn zuordnung_aufheben(&self, _: &str) -> DbResult<ButtonRecord> {
            unimplemented!()
        }
        async fn team_zuordnungen_aufheben(&self, _: &RoomCode, _: TeamId) -> DbResult<u64> {
            Ok(0)
        }
        async fn aktiv_setzen(&self, _: &str, _: bool) -> DbResult<ButtonRecord> {
            unimplemented!()
        }
        async fn alle(&self) -> DbResult<Vec<ButtonRecord>> {
            Ok(self.buttons.lock().values().cloned().collect())
        }
        async fn fuer_raum(&self, _: &RoomCode) -> DbResult<Vec<ButtonRecord>> {
            Ok(Vec::new())
        }
        async fn loeschen(&self, _: &str) -> DbResult<bool> {
            Ok(false)
        }
    }

    fn engine() -> SessionEngine {
        SessionEngine::neu(SitzungsKonfig::default(), None)
    }

    #[tokio::test]
    async fn unbekannter_button_erreicht_engine_nicht() {
        let engine = engine();
        let mut events = engine.events_abonnieren();
        let router = PressRouter::neu(Arc::new(SpeicherRegistry::default()), engine.clone());

        let fehler = router
            .druck_verarbeiten("AA:BB:CC:DD:EE:FF")
            .await
            .unwrap_err();
        assert!(matches!(fehler, SessionError::UnbekannterButton(ref mac) if mac == "AABBCCDDEEFF"));
        assert_eq!(fehler.code(), "UnknownButton");
        assert_eq!(engine.raum_anzahl(), 0);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn nicht_zugeordneter_button() {
        let engine = engine();
        let registry = Arc::new(SpeicherRegistry::mit("AABBCC000001", None, true));
        let router = PressRouter::neu(registry.clone(), engine.clone());

        let fehler = router.druck_verarbeiten("aabbcc000001").await.unwrap_err();
        assert!(matches!(fehler, SessionError::NichtZugeordnet(_)));
        // Der Druck wurde trotzdem gezaehlt
        let button = registry.laden("AABBCC000001").await.unwrap().unwrap();
        assert_eq!(button.press_count, 1);
    }

    #[tokio::test]
    async fn deaktivierter_button() {
        let engine = engine();
        let router = PressRouter::neu(
            Arc::new(SpeicherRegistry::mit("AABBCC000001", None, false)),
            engine,
        );
        let fehler = router.druck_verarbeiten("AABBCC000001").await.unwrap_err();
        assert_eq!(fehler.code(), "InactiveButton");
    }

    #[tokio::test]
    async fn zugeordneter_button_reicht_antwort_ein() {
        let engine = engine();
        let room = RoomCode::parse("A1B2").unwrap();
        engine.raum_erstellen_oder_holen(&room);
        let team = engine.team_beitreten(&room, "Rot").unwrap().team_id;

        let router = PressRouter::neu(
            Arc::new(SpeicherRegistry::mit(
                "AABBCC000001",
                Some((room.clone(), team)),
                true,
            )),
            engine.clone(),
        );

        // Noch keine Frage offen
        let fehler = router.druck_verarbeiten("AABBCC000001").await.unwrap_err();
        assert!(matches!(fehler, SessionError::FrageNichtAktiv));

        engine
            .frage_oeffnen(
                &room,
                crate::room::FrageParameter {
                    slide_id: "1".into(),
                    time_limit_seconds: 30,
                    points_correct: 100,
                    points_wrong: 0,
                },
            )
            .unwrap();

        let ergebnis = router.druck_verarbeiten("AA:BB:CC:00:00:01").await.unwrap();
        assert_eq!(ergebnis.room, room);
        assert_eq!(ergebnis.team_id, team);
        assert_eq!(ergebnis.eintrag.rank, 1);

        let fehler = router.druck_verarbeiten("AABBCC000001").await.unwrap_err();
        assert!(matches!(fehler, SessionError::DoppelteAntwort));
    }
}
