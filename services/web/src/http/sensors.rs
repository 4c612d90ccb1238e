//! Sensor pages and form submissions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Form,
};
use snowfinch_id::{SensorId, SiteId};
use snowfinch_model::ValidationErrors;
use tracing::debug;

use crate::db::SensorRecord;
use crate::paths;
use crate::sensors::{self, SaveError, SensorForm};
use crate::state::AppState;
use crate::views::sensors::{self as pages, NoticeAction};

use super::{
    error::PageError,
    flash::{redirect_with_notice, Flash},
    render,
    request_context::RequestContext,
    sites::load_site,
};

fn sensor_not_found(ctx: &RequestContext) -> PageError {
    PageError::not_found(
        "sensor_not_found",
        "The sensor you were looking for doesn't exist.",
    )
    .with_request_id(ctx.request_id.clone())
}

/// Loads a sensor of the site; foreign or malformed ids are a 404.
async fn load_sensor(
    state: &AppState,
    ctx: &RequestContext,
    site_id: SiteId,
    raw: &str,
) -> Result<SensorRecord, PageError> {
    let sensor_id: SensorId = raw.parse().map_err(|_| sensor_not_found(ctx))?;
    state
        .store()
        .find_sensor(site_id, sensor_id)
        .await
        .map_err(|e| PageError::store(e, &ctx.request_id))?
        .ok_or_else(|| sensor_not_found(ctx))
}

fn save_failed(err: SaveError, ctx: &RequestContext) -> PageError {
    match err {
        SaveError::NotFound => sensor_not_found(ctx),
        SaveError::Store(e) => PageError::store(e, &ctx.request_id),
        // Handlers re-render the form before getting here.
        SaveError::Invalid(_) => PageError::internal("invalid_form", "The form could not be saved.")
            .with_request_id(ctx.request_id.clone()),
    }
}

pub async fn index(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
    ctx: RequestContext,
    flash: Flash,
) -> Result<Response, PageError> {
    let site = load_site(&state, &ctx, &site_id).await?;
    let sensors = state
        .store()
        .list_sensors(site.id)
        .await
        .map_err(|e| PageError::store(e, &ctx.request_id))?;
    Ok(render(StatusCode::OK, &pages::list(site.id, &sensors), &flash))
}

pub async fn new(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
    ctx: RequestContext,
    flash: Flash,
) -> Result<Response, PageError> {
    let site = load_site(&state, &ctx, &site_id).await?;
    let page = pages::new_form(site.id, &SensorForm::default(), &ValidationErrors::new());
    Ok(render(StatusCode::OK, &page, &flash))
}

pub async fn create(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
    ctx: RequestContext,
    flash: Flash,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, PageError> {
    let site = load_site(&state, &ctx, &site_id).await?;
    let form = SensorForm::from_pairs(&fields);

    match sensors::create_sensor(state.store(), site.id, &form).await {
        Ok(sensor) => Ok(redirect_with_notice(
            &paths::sensor(site.id, sensor.id),
            &pages::notice(&sensor.name, NoticeAction::Created),
        )),
        Err(SaveError::Invalid(errors)) => {
            debug!(request_id = %ctx.request_id, errors = errors.len(), "Re-rendering new sensor form");
            let page = pages::new_form(site.id, &form, &errors);
            Ok(render(StatusCode::UNPROCESSABLE_ENTITY, &page, &flash))
        }
        Err(err) => Err(save_failed(err, &ctx)),
    }
}

pub async fn show(
    State(state): State<AppState>,
    Path((site_id, sensor_id)): Path<(String, String)>,
    ctx: RequestContext,
    flash: Flash,
) -> Result<Response, PageError> {
    let site = load_site(&state, &ctx, &site_id).await?;
    let sensor = load_sensor(&state, &ctx, site.id, &sensor_id).await?;
    Ok(render(StatusCode::OK, &pages::show(&sensor), &flash))
}

pub async fn edit(
    State(state): State<AppState>,
    Path((site_id, sensor_id)): Path<(String, String)>,
    ctx: RequestContext,
    flash: Flash,
) -> Result<Response, PageError> {
    let site = load_site(&state, &ctx, &site_id).await?;
    let sensor = load_sensor(&state, &ctx, site.id, &sensor_id).await?;
    let form = SensorForm::from_record(&sensor);
    let page = pages::edit_form(site.id, sensor.id, &form, &ValidationErrors::new());
    Ok(render(StatusCode::OK, &page, &flash))
}

pub async fn update(
    State(state): State<AppState>,
    Path((site_id, sensor_id)): Path<(String, String)>,
    ctx: RequestContext,
    flash: Flash,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Response, PageError> {
    let site = load_site(&state, &ctx, &site_id).await?;
    let sensor_id: SensorId = sensor_id.parse().map_err(|_| sensor_not_found(&ctx))?;
    let form = SensorForm::from_pairs(&fields);

    match sensors::update_sensor(state.store(), site.id, sensor_id, &form).await {
        Ok(sensor) => Ok(redirect_with_notice(
            &paths::sensor(site.id, sensor.id),
            &pages::notice(&sensor.name, NoticeAction::Updated),
        )),
        Err(SaveError::Invalid(errors)) => {
            debug!(request_id = %ctx.request_id, errors = errors.len(), "Re-rendering edit sensor form");
            let page = pages::edit_form(site.id, sensor_id, &form, &errors);
            Ok(render(StatusCode::UNPROCESSABLE_ENTITY, &page, &flash))
        }
        Err(err) => Err(save_failed(err, &ctx)),
    }
}

pub async fn destroy(
    State(state): State<AppState>,
    Path((site_id, sensor_id)): Path<(String, String)>,
    ctx: RequestContext,
) -> Result<Response, PageError> {
    let site = load_site(&state, &ctx, &site_id).await?;
    let sensor_id: SensorId = sensor_id.parse().map_err(|_| sensor_not_found(&ctx))?;

    let sensor = sensors::remove_sensor(state.store(), site.id, sensor_id)
        .await
        .map_err(|err| save_failed(err, &ctx))?;

    Ok(redirect_with_notice(
        &paths::sensors(site.id),
        &pages::notice(&sensor.name, NoticeAction::Removed),
    ))
}
