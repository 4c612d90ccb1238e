use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use snowfinch_id::SiteId;

use crate::db::SiteRecord;
use crate::state::AppState;
use crate::views;

use super::{error::PageError, flash::Flash, render, request_context::RequestContext};

/// Parses and loads a site; a malformed or unknown id is a 404.
pub(super) async fn load_site(
    state: &AppState,
    ctx: &RequestContext,
    raw: &str,
) -> Result<SiteRecord, PageError> {
    let not_found = || {
        PageError::not_found("site_not_found", "The site you were looking for doesn't exist.")
            .with_request_id(ctx.request_id.clone())
    };
    let site_id: SiteId = raw.parse().map_err(|_| not_found())?;

    state
        .store()
        .find_site(site_id)
        .await
        .map_err(|e| PageError::store(e, &ctx.request_id))?
        .ok_or_else(not_found)
}

pub async fn index(
    State(state): State<AppState>,
    ctx: RequestContext,
    flash: Flash,
) -> Result<Response, PageError> {
    let sites = state
        .store()
        .list_sites()
        .await
        .map_err(|e| PageError::store(e, &ctx.request_id))?;
    Ok(render(StatusCode::OK, &views::sites::index(&sites), &flash))
}

pub async fn show(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
    ctx: RequestContext,
    flash: Flash,
) -> Result<Response, PageError> {
    let site = load_site(&state, &ctx, &site_id).await?;
    Ok(render(StatusCode::OK, &views::sites::show(&site), &flash))
}
