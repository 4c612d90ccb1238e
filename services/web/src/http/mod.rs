//! HTTP handlers and routing.

mod assets;
pub mod error;
pub mod flash;
mod health;
pub mod request_context;
mod sensors;
mod sites;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::paths;
use crate::state::AppState;
use crate::views::{layout, Page};

use flash::Flash;

/// Create the router with all pages and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to(&paths::sites()) }))
        .route("/sites", get(sites::index))
        .route("/sites/{site_id}", get(sites::show))
        .route(
            "/sites/{site_id}/sensors",
            get(sensors::index).post(sensors::create),
        )
        .route("/sites/{site_id}/sensors/new", get(sensors::new))
        .route(
            "/sites/{site_id}/sensors/{sensor_id}",
            get(sensors::show).post(sensors::update),
        )
        .route("/sites/{site_id}/sensors/{sensor_id}/edit", get(sensors::edit))
        .route(
            "/sites/{site_id}/sensors/{sensor_id}/remove",
            post(sensors::destroy),
        )
        .route(paths::SENSOR_FORM_SCRIPT, get(assets::sensor_form_js))
        // Health endpoints
        .merge(health::routes())
        // Middleware
        .layer(TraceLayer::new_for_http())
        // Application state
        .with_state(state)
}

/// Renders `page` in the layout with the pending notice, if any.
fn render(status: StatusCode, page: &Page, flash: &Flash) -> Response {
    let mut response = (status, Html(layout(page, flash.notice()))).into_response();
    flash.consume(&mut response);
    response
}
