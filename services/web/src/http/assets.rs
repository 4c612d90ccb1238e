use axum::{http::header::CONTENT_TYPE, response::IntoResponse};

/// Adds, removes and toggles rows on the sensor forms.
const SENSOR_FORM_JS: &str = include_str!("../../assets/sensor_form.js");

pub async fn sensor_form_js() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "application/javascript; charset=utf-8")],
        SENSOR_FORM_JS,
    )
}
