//! Rental lifecycle route handlers

use crate::{
    api::{
        error::Result,
        extractors::{ApiJson, ApiPath, ApiQuery},
        types::{
            CreateRentalRequest, PageParams, RentalResponse, ReturnRentalRequest,
            ReturnRentalResponse,
        },
    },
    domain::{Rental, RentalId},
    server::AppState,
};
use axum::{extract::State, http::StatusCode, Json};
use mottu_common::Page;
use tracing::info;

pub async fn list_rentals(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<RentalResponse>>> {
    let page = params.to_page_request()?;
    let rentals = state.rentals.list_rentals(page).await?;
    Ok(Json(rentals.map(RentalResponse::from)))
}

pub async fn get_rental(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<RentalResponse>> {
    let details = state.rentals.get_rental(RentalId::new(id)).await?;
    Ok(Json(details.into()))
}

pub async fn create_rental(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateRentalRequest>,
) -> Result<(StatusCode, Json<Rental>)> {
    let customer_id = request.customer_id()?;
    info!(
        "Rental requested by customer {} until {}",
        customer_id, request.expected_end
    );

    let rental = state
        .rentals
        .create_rental(customer_id, request.expected_end)
        .await?;
    Ok((StatusCode::CREATED, Json(rental)))
}

pub async fn return_rental(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<ReturnRentalRequest>,
) -> Result<Json<ReturnRentalResponse>> {
    let settled = state
        .rentals
        .end_rental(RentalId::new(id), request.returned_at)
        .await?;

    Ok(Json(ReturnRentalResponse {
        rental: settled.rental,
        settlement: settled.settlement,
    }))
}

pub async fn delete_rental(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    state.rentals.delete_rental(RentalId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
