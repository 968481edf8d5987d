//! Customer route handlers

use crate::{
    api::{
        error::Result,
        extractors::{ApiJson, ApiPath, ApiQuery},
        types::{
            CreateCustomerRequest, EstimateRiskRequest, EstimateRiskResponse, PageParams,
            UpdateCustomerRequest,
        },
    },
    domain::{Customer, CustomerId},
    server::AppState,
};
use axum::{extract::State, http::StatusCode, Json};
use mottu_common::Page;
use tracing::{debug, info};

pub async fn list_customers(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<Customer>>> {
    let page = params.to_page_request()?;
    debug!("Listing customers, page {}", page.page_number());
    Ok(Json(state.customers.list_customers(page).await?))
}

pub async fn get_customer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Customer>> {
    Ok(Json(state.customers.get_customer(CustomerId::new(id)).await?))
}

pub async fn create_customer(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<Customer>)> {
    let registration = request.validate()?;
    info!("Registering customer with license type {}", registration.license_type);

    let customer = state.customers.register_customer(registration).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateCustomerRequest>,
) -> Result<StatusCode> {
    let name = request.validate()?;
    state
        .customers
        .rename_customer(CustomerId::new(id), name)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_customer(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    state.customers.delete_customer(CustomerId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn estimate_risk(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<EstimateRiskRequest>,
) -> Result<Json<EstimateRiskResponse>> {
    let license_type = request.validate()?;
    let risk = state.risk.estimate_risk(request.age, license_type);
    debug!(
        "Estimated {} risk for age {} with license {}",
        risk, request.age, license_type
    );

    Ok(Json(EstimateRiskResponse {
        risk,
        age: request.age,
        license_type,
    }))
}
