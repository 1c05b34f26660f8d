use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::IntoParams;

use crate::{AppState, Error, Measurement, PercentileRecord, RangeSeries};

/// Header the chart client sends on its background requests.
pub const REQUESTED_WITH: &str = "x-requested-with";
const XML_HTTP_REQUEST: &str = "XMLHttpRequest";

#[derive(Clone, Debug, Default, Deserialize, Serialize, IntoParams)]
pub struct PercentileParams {
    /// Reshape the bands for a cyclic January to December chart
    pub chart: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, IntoParams)]
pub struct DataSeriesParams {
    /// First day to include, `YYYY-MM-DD`
    pub start: Option<String>,
    /// Last day to include, `YYYY-MM-DD`
    pub end: Option<String>,
}

fn wants_chart(headers: &HeaderMap, params: &PercentileParams) -> bool {
    let ajax = headers
        .get(REQUESTED_WITH)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.eq_ignore_ascii_case(XML_HTTP_REQUEST))
        .unwrap_or(false);
    ajax || params.chart.unwrap_or(false)
}

#[utoipa::path(
    get,
    path = "/api/stations/{station_id}/years/",
    params(
        ("station_id" = String, Path, description = "Station identifier"),
    ),
    responses(
        (status = OK, description = "Distinct years with measurements, ascending", body = Vec<i32>),
        (status = NOT_FOUND, description = "Unknown station", body = crate::ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to read station data", body = crate::ErrorBody)
    ))]
pub async fn years(
    State(state): State<Arc<AppState>>,
    Path(station_id): Path<String>,
) -> Result<Json<Vec<i32>>, Error> {
    let years = state.station_data.years(&station_id).await?;
    Ok(Json(years))
}

#[utoipa::path(
    get,
    path = "/api/stations/{station_id}/{field}/percentiles/",
    params(
        ("station_id" = String, Path, description = "Station identifier"),
        ("field" = String, Path, description = "Field name known to the station"),
        PercentileParams,
    ),
    responses(
        (status = OK, description = "Monthly percentile bands across all years", body = Vec<PercentileRecord>),
        (status = BAD_REQUEST, description = "Field not measured by the station", body = crate::ErrorBody),
        (status = NOT_FOUND, description = "Unknown station", body = crate::ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to aggregate station data", body = crate::ErrorBody)
    ))]
pub async fn percentiles(
    State(state): State<Arc<AppState>>,
    Path((station_id, field)): Path<(String, String)>,
    Query(params): Query<PercentileParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<PercentileRecord>>, Error> {
    let reshape = wants_chart(&headers, &params);
    let records = state
        .station_data
        .percentiles(&station_id, &field, reshape)
        .await?;
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/api/stations/{station_id}/{field}/dataseries/",
    params(
        ("station_id" = String, Path, description = "Station identifier"),
        ("field" = String, Path, description = "Field name known to the station"),
        DataSeriesParams,
    ),
    responses(
        (status = OK, description = "Series within the requested or available range", body = RangeSeries),
        (status = BAD_REQUEST, description = "Invalid field or dates", body = crate::ErrorBody),
        (status = NOT_FOUND, description = "Unknown station", body = crate::ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to read station data", body = crate::ErrorBody)
    ))]
pub async fn dataseries(
    State(state): State<Arc<AppState>>,
    Path((station_id, field)): Path<(String, String)>,
    Query(params): Query<DataSeriesParams>,
) -> Result<Json<RangeSeries>, Error> {
    let series = state
        .station_data
        .range_series(
            &station_id,
            &field,
            params.start.as_deref(),
            params.end.as_deref(),
        )
        .await?;
    Ok(Json(series))
}

#[utoipa::path(
    get,
    path = "/api/stations/{station_id}/{field}/{year}/yearly-data/",
    params(
        ("station_id" = String, Path, description = "Station identifier"),
        ("field" = String, Path, description = "Field name known to the station"),
        ("year" = String, Path, description = "Calendar year, e.g. 2021"),
    ),
    responses(
        (status = OK, description = "Series for the calendar year", body = Vec<Measurement>),
        (status = BAD_REQUEST, description = "Invalid field or year", body = crate::ErrorBody),
        (status = NOT_FOUND, description = "Unknown station", body = crate::ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to read station data", body = crate::ErrorBody)
    ))]
pub async fn yearly_data(
    State(state): State<Arc<AppState>>,
    Path((station_id, field, year)): Path<(String, String, String)>,
) -> Result<Json<Vec<Measurement>>, Error> {
    let series = state
        .station_data
        .yearly_series(&station_id, &field, &year)
        .await?;
    Ok(Json(series))
}
