//! Vehicle route handlers

use crate::{
    api::{
        error::Result,
        extractors::{ApiJson, ApiPath, ApiQuery},
        types::{CreateVehicleRequest, PageParams, UpdateVehicleRequest},
    },
    domain::{Vehicle, VehicleId},
    server::AppState,
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::Datelike;
use mottu_common::Page;

pub async fn list_vehicles(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<Vehicle>>> {
    let page = params.to_page_request()?;
    Ok(Json(state.fleet.list_vehicles(page).await?))
}

pub async fn get_vehicle(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vehicle>> {
    Ok(Json(state.fleet.get_vehicle(VehicleId::new(id)).await?))
}

pub async fn create_vehicle(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<Vehicle>)> {
    let (year, model, plate) = request.validate(state.clock.now().year())?;
    let vehicle = state.fleet.register_vehicle(year, model, plate).await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

pub async fn update_vehicle(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateVehicleRequest>,
) -> Result<StatusCode> {
    let update = request.validate(state.clock.now().year())?;
    state.fleet.update_vehicle(VehicleId::new(id), update).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_vehicle(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    state.fleet.delete_vehicle(VehicleId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
