//! HTTP API for customers, vehicles and rentals

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod types;

use crate::server::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// Routes served under `/api/v1`. Everything except `/health` sits behind
/// the API key check.
pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route(
            "/customers",
            get(routes::customers::list_customers).post(routes::customers::create_customer),
        )
        .route(
            "/customers/estimate-risk",
            post(routes::customers::estimate_risk),
        )
        .route(
            "/customers/:id",
            get(routes::customers::get_customer)
                .put(routes::customers::update_customer)
                .delete(routes::customers::delete_customer),
        )
        .route(
            "/vehicles",
            get(routes::vehicles::list_vehicles).post(routes::vehicles::create_vehicle),
        )
        .route(
            "/vehicles/:id",
            get(routes::vehicles::get_vehicle)
                .put(routes::vehicles::update_vehicle)
                .delete(routes::vehicles::delete_vehicle),
        )
        .route(
            "/rentals",
            get(routes::rentals::list_rentals).post(routes::rentals::create_rental),
        )
        .route(
            "/rentals/:id",
            get(routes::rentals::get_rental).delete(routes::rentals::delete_rental),
        )
        .route("/rentals/:id/return", post(routes::rentals::return_rental))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::require_api_key,
        ));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .merge(protected)
}
