//! Route-Definitionen fuer REST-API und WebSocket

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers;
use crate::state::ApiState;
use crate::ws;

/// Erstellt den vollstaendigen Router (ohne State)
pub fn api_router() -> Router<ApiState> {
    Router::new()
        // WebSocket
        .route("/ws/:room", get(ws::ws_upgrade))
        // Raeume
        .route("/api/rooms", post(handlers::rooms::create_room))
        .route(
            "/api/rooms/:code",
            get(handlers::rooms::get_room).delete(handlers::rooms::delete_room),
        )
        // Buttons
        .route("/api/button/press", post(handlers::buttons::press))
        .route("/api/button/register", post(handlers::buttons::register))
        .route("/api/button/assign", post(handlers::buttons::assign).put(handlers::buttons::assign))
        .route("/api/button/unassign", post(handlers::buttons::unassign))
        .route("/api/button/list", get(handlers::buttons::list))
        .route("/api/button/room/:code", get(handlers::buttons::by_room))
        .route(
            "/api/button/:mac",
            get(handlers::buttons::get_button).delete(handlers::buttons::delete_button),
        )
        .route("/api/button/:mac/active", put(handlers::buttons::set_active))
        // Praesentationen
        .route("/api/presentation/link", post(handlers::presentations::link))
        .route(
            "/api/presentation/room/:doc_key",
            get(handlers::presentations::room_for_presentation),
        )
        .route("/api/presentation/snapshot", post(handlers::presentations::snapshot))
        .route("/api/presentation/config", post(handlers::presentations::save_config))
        .route(
            "/api/presentation/config/:doc_key/:slide_id",
            get(handlers::presentations::get_config),
        )
}
