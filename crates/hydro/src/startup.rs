use crate::{
    dataseries, percentiles, routes, yearly_data, years, ErrorBody, FileAccess, Measurement,
    PercentileRecord, RangeSeries, Registry, REQUESTED_WITH, SeriesAccess, SeriesStore, StationData,
};
use axum::{
    body::Body,
    extract::Request,
    middleware::{self, Next},
    response::IntoResponse,
    routing::get,
    Router,
};
use hyper::{
    header::{HeaderName, ACCEPT, CONTENT_TYPE},
    Method,
};
use log::info;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{openapi::Server, OpenApi};
use utoipa_scalar::{Scalar, Servable};

#[derive(Clone)]
pub struct AppState {
    pub remote_url: String,
    pub station_data: StationData,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::stations::station_routes::years,
        routes::stations::station_routes::percentiles,
        routes::stations::station_routes::dataseries,
        routes::stations::station_routes::yearly_data,
    ),
    components(
        schemas(
                PercentileRecord,
                RangeSeries,
                Measurement,
                ErrorBody,
        )
    ),
    tags(
        (name = "hydro station api", description = "a RESTful api serving station time series and seasonal percentile bands")
    )
)]
struct ApiDoc;

pub fn build_app_state(
    remote_url: String,
    data_dir: String,
    registry: Registry,
) -> AppState {
    let file_access = Arc::new(FileAccess::new(data_dir));
    let store: Arc<dyn SeriesStore> = Arc::new(SeriesAccess::new(file_access));
    app_state_with_store(remote_url, registry, store)
}

/// Builds the state around any store, the seam tests use to stub data.
pub fn app_state_with_store(
    remote_url: String,
    registry: Registry,
    store: Arc<dyn SeriesStore>,
) -> AppState {
    AppState {
        remote_url,
        station_data: StationData::new(Arc::new(registry), store),
    }
}

pub fn app(app_state: AppState) -> Router {
    let mut api_docs = ApiDoc::openapi();
    api_docs.servers = Some(vec![Server::new(app_state.remote_url.clone())]);
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, HeaderName::from_static(REQUESTED_WITH)])
        .allow_origin(Any);

    Router::new()
        .route("/api/stations/{station_id}/years", get(years))
        .route("/api/stations/{station_id}/years/", get(years))
        .route(
            "/api/stations/{station_id}/{field}/percentiles",
            get(percentiles),
        )
        .route(
            "/api/stations/{station_id}/{field}/percentiles/",
            get(percentiles),
        )
        .route(
            "/api/stations/{station_id}/{field}/dataseries",
            get(dataseries),
        )
        .route(
            "/api/stations/{station_id}/{field}/dataseries/",
            get(dataseries),
        )
        .route(
            "/api/stations/{station_id}/{field}/{year}/yearly-data",
            get(yearly_data),
        )
        .route(
            "/api/stations/{station_id}/{field}/{year}/yearly-data/",
            get(yearly_data),
        )
        .with_state(Arc::new(app_state))
        .layer(middleware::from_fn(log_request))
        .merge(Scalar::with_url("/docs", api_docs))
        .layer(cors)
}

async fn log_request(request: Request<Body>, next: Next) -> impl IntoResponse {
    let now = time::OffsetDateTime::now_utc();
    let path = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or_default()
        .to_owned();
    info!(target: "http_request","new request, {} {}", request.method().as_str(), path);

    let response = next.run(request).await;
    let response_time = time::OffsetDateTime::now_utc() - now;
    info!(target: "http_response", "response, {} code: {}, time: {}", path, response.status().as_str(), response_time);

    response
}
