use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use quizhub_session::{ClientMessage, ServerMessage, VerbindungsEmpfaenger, VerbindungsKontext};
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::state::ApiState;

/// Server-Ping alle 30 Sekunden
const PING_INTERVALL: Duration = Duration::from_secs(30);

/// Ohne Pong innerhalb von 10 Sekunden wird die Verbindung geschlossen
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Betreibt eine registrierte WebSocket-Verbindung bis zum Ende
///
/// Endet, wenn der Client schliesst, der Socket bricht, der Pong ausbleibt
/// oder die Engine die Send-Queue schliesst (Raum zu, Queue voll, Team von
/// einer neueren Verbindung uebernommen). Danach wird die Verbindung in der
/// Engine abgemeldet.
pub async fn verbindung_betreiben(
    socket: WebSocket,
    state: ApiState,
    mut ctx: VerbindungsKontext,
    rx: VerbindungsEmpfaenger,
) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (steuer_tx, steuer_rx) = mpsc::unbounded_channel::<Message>();

    tracing::info!(room = %ctx.room, conn = %ctx.conn, rolle = %ctx.rolle, "WebSocket-Actor gestartet");

    let mut writer = tokio::spawn(writer_task(ws_sender, rx, steuer_rx));

    let (pong_tx, pong_rx) = mpsc::unbounded_channel::<()>();
    let ping_handle = tokio::spawn(ping_schleife(
        steuer_tx.clone(),
        pong_rx,
        PING_INTERVALL,
        PONG_TIMEOUT,
    ));

    loop {
        tokio::select! {
            // Writer beendet: Queue von der Engine geschlossen oder Socket kaputt
            _ = &mut writer => break,
            eingang = ws_receiver.next() => match eingang {
                Some(Ok(Message::Text(text))) => {
                    text_verarbeiten(&state, &mut ctx, &text).await;
                }
                Some(Ok(Message::Binary(_))) => {
                    tracing::debug!(conn = %ctx.conn, "Binaer-Nachricht ignoriert");
                }
                Some(Ok(Message::Pong(_))) => {
                    let _ = pong_tx.send(());
                }
                Some(Ok(Message::Ping(daten))) => {
                    let _ = steuer_tx.send(Message::Pong(daten));
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(conn = %ctx.conn, grund = ?frame, "Client hat geschlossen");
                    break;
                }
                Some(Err(e)) => {
                    tracing::warn!(conn = %ctx.conn, fehler = %e, "WebSocket-Empfangsfehler");
                    break;
                }
                None => {
                    tracing::info!(conn = %ctx.conn, "WebSocket-Stream beendet");
                    break;
                }
            }
        }
    }

    writer.abort();
    ping_handle.abort();
    state.engine.verbindung_abmelden(&ctx.room, &ctx.conn);

    tracing::info!(room = %ctx.room, conn = %ctx.conn, "WebSocket-Actor beendet");
}

/// Sendet periodisch Pings und schliesst, wenn kein Pong rechtzeitig kommt
///
/// Pongs, die vor dem Ping eingetroffen sind, zaehlen nicht.
async fn ping_schleife(
    ping_tx: mpsc::UnboundedSender<Message>,
    mut pong_rx: mpsc::UnboundedReceiver<()>,
    intervall: Duration,
    pong_timeout: Duration,
) {
    let mut ping_timer = interval(intervall);
    // Erster Tick kommt sofort
    ping_timer.tick().await;

    loop {
        ping_timer.tick().await;
        while pong_rx.try_recv().is_ok() {}
        if ping_tx.send(Message::Ping(vec![1, 2, 3, 4])).is_err() {
            break;
        }
        match timeout(pong_timeout, pong_rx.recv()).await {
            Ok(Some(())) => {}
            _ => {
                tracing::warn!("Pong-Timeout, Verbindung wird geschlossen");
                let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                    code: 1001,
                    reason: "Pong-Timeout".into(),
                })));
                break;
            }
        }
    }
}

/// Dekodiert eine Text-Nachricht und gibt sie an den Dispatcher
///
/// Direkte Antworten laufen ueber dieselbe Queue wie die Broadcasts, damit
/// die Reihenfolge pro Verbindung erhalten bleibt.
async fn text_verarbeiten(state: &ApiState, ctx: &mut VerbindungsKontext, text: &str) {
    let antwort = match serde_json::from_str::<ClientMessage>(text) {
        Ok(nachricht) => state.dispatcher.dispatch(nachricht, ctx).await,
        Err(e) => {
            tracing::debug!(conn = %ctx.conn, fehler = %e, "Ungueltige Client-Nachricht");
            Some(ServerMessage::Error {
                code: "InvalidInput".into(),
                message: format!("Ungueltige Nachricht: {e}"),
            })
        }
    };

    if let Some(antwort) = antwort {
        state
            .engine
            .an_verbindung_senden(&ctx.room, &ctx.conn, antwort);
    }
}

/// Leert Engine-Queue und Steuer-Kanal in den Socket
async fn writer_task(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut rx: VerbindungsEmpfaenger,
    mut steuer_rx: mpsc::UnboundedReceiver<Message>,
) {
    loop {
        let nachricht = tokio::select! {
            ausgang = rx.recv() => match ausgang {
                Some(nachricht) => match serde_json::to_string(&*nachricht) {
                    Ok(text) => Message::Text(text),
                    Err(e) => {
                        tracing::error!(fehler = %e, "Server-Nachricht nicht serialisierbar");
                        continue;
                    }
                },
                None => Message::Close(Some(CloseFrame {
                    code: 1000,
                    reason: "Verbindung vom Server beendet".into(),
                })),
            },
            steuer = steuer_rx.recv() => match steuer {
                Some(nachricht) => nachricht,
                None => break,
            },
        };

        let schliessen = matches!(nachricht, Message::Close(_));
        if ws_sender.send(nachricht).await.is_err() || schliessen {
            break;
        }
    }
}
