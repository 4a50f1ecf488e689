//! HTTP router.
//!
//! Public routes: booking, confirmation, certificate verification and staff
//! login. Everything else sits behind the staff session guard.

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::endpoints::{admin, bookings, certificates, consultations};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // NOTE: Path params use `:param` syntax (axum 0.7).
    let staff = Router::new()
        .route("/consultations", get(consultations::list))
        .route("/consultations/search", get(consultations::search))
        .route(
            "/consultations/reconciliation",
            get(consultations::reconciliation),
        )
        .route("/consultations/:id", get(consultations::detail))
        .route(
            "/consultations/:id/start-call",
            post(consultations::start_call),
        )
        .route("/consultations/:id/notes", put(consultations::update_notes))
        .route("/consultations/:id/issue", post(consultations::issue))
        .route("/consultations/:id/decline", post(consultations::decline))
        .route(
            "/consultations/:id/certificate",
            get(consultations::certificate),
        )
        .route("/consultations/:id/events", get(consultations::events))
        .route("/admin/summary", get(admin::summary))
        .route("/admin/summary.csv", get(admin::summary_csv))
        .route("/admin/logout", post(auth::logout))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_staff,
        ));

    let public = Router::new()
        .route("/bookings", post(bookings::create))
        .route("/bookings/:id/confirm", post(bookings::confirm))
        .route("/certificates/verify/:code", get(certificates::verify))
        .route("/admin/login", post(auth::login));

    Router::new()
        .merge(staff)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
