use crate::helpers::{spawn_app, MockSeriesAccess};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use hydro::{db, DateRange, Measurement, PercentileRecord, RangeSeries, REQUESTED_WITH};
use hyper::Method;
use serde_json::{from_slice, Value};
use std::sync::Arc;
use time::macros::datetime;
use tower::ServiceExt;

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    from_slice(&body).unwrap()
}

fn monthly_bands() -> Vec<PercentileRecord> {
    (1..=12)
        .map(|month| {
            let base = month as f64;
            PercentileRecord::from_quantiles(
                format!("{:02}-01T00:00:00", month),
                [
                    Some(base),
                    Some(base + 1.0),
                    Some(base + 2.0),
                    Some(base + 3.0),
                    Some(base + 4.0),
                    Some(base + 5.0),
                    Some(base + 6.0),
                    Some(base + 7.0),
                    Some(base + 8.0),
                ],
            )
        })
        .collect()
}

#[tokio::test]
async fn can_list_years() {
    let mut store = MockSeriesAccess::new();
    store
        .expect_years()
        .withf(|station| station.id == "tmavy")
        .times(1)
        .returning(|_| Ok(vec![2019, 2020, 2021]));
    let test_app = spawn_app(Arc::new(store)).await;

    let response = test_app
        .app
        .clone()
        .oneshot(get("/api/stations/tmavy/years/"))
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::OK);
    let years: Vec<i32> = body_json(response).await;
    assert_eq!(years, vec![2019, 2020, 2021]);
}

#[tokio::test]
async fn unknown_station_is_not_found() {
    let mut store = MockSeriesAccess::new();
    store.expect_years().never();
    let test_app = spawn_app(Arc::new(store)).await;

    let response = test_app
        .app
        .clone()
        .oneshot(get("/api/stations/auth_user/years/"))
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("auth_user"));
}

#[tokio::test]
async fn field_outside_station_is_bad_request() {
    let mut store = MockSeriesAccess::new();
    store.expect_percentile_groups().never();
    let test_app = spawn_app(Arc::new(store)).await;

    // wt_degc is a known field, just not one slatinny_potok measures
    let response = test_app
        .app
        .clone()
        .oneshot(get("/api/stations/slatinny_potok/wt_degc/percentiles/"))
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn percentiles_are_raw_for_plain_requests() {
    let mut store = MockSeriesAccess::new();
    store
        .expect_percentile_groups()
        .times(1)
        .returning(|_, _| Ok(monthly_bands()));
    let test_app = spawn_app(Arc::new(store)).await;

    let response = test_app
        .app
        .clone()
        .oneshot(get("/api/stations/tmavy/wl_mm/percentiles/"))
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = body_json(response).await;
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 12);
    assert_eq!(records[0]["string_date_without_year"], "01-01T00:00:00");
    assert_eq!(records[0]["q50"], 5.0);
}

#[tokio::test]
async fn percentiles_are_reshaped_for_chart_requests() {
    let mut store = MockSeriesAccess::new();
    store
        .expect_percentile_groups()
        .times(2)
        .returning(|_, _| Ok(monthly_bands()));
    let test_app = spawn_app(Arc::new(store)).await;

    let header_request = Request::builder()
        .method(Method::GET)
        .uri("/api/stations/tmavy/wl_mm/percentiles/")
        .header(REQUESTED_WITH, "XMLHttpRequest")
        .body(Body::empty())
        .unwrap();

    for request in [
        header_request,
        get("/api/stations/tmavy/wl_mm/percentiles?chart=true"),
    ] {
        let response = test_app
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request.");
        assert_eq!(response.status(), StatusCode::OK);

        let records: Vec<PercentileRecord> = body_json(response).await;
        assert_eq!(records.len(), 14);

        // December wraps to the start, January wraps to the end
        assert_eq!(records[0].group_key, "01-01T00:00:00");
        assert_eq!(records[0].q10, Some(12.0));
        assert_eq!(records[1].group_key, "01-15T00:00:00");
        assert_eq!(records[12].group_key, "12-15T00:00:00");
        assert_eq!(records[13].group_key, "12-31T00:00:00");
        assert_eq!(records[13].q10, Some(1.0));
    }
}

#[tokio::test]
async fn dataseries_uses_available_range_without_dates() {
    let mut store = MockSeriesAccess::new();
    store.expect_non_null_range().times(1).returning(|_, _| {
        Ok(Some(DateRange {
            start: datetime!(2019-03-01 00:00:00),
            end: datetime!(2021-11-30 23:00:00),
        }))
    });
    store
        .expect_series()
        .withf(|station, field, start, end| {
            station.id == "tmavy"
                && field.column == "EC_lin_microS/cm"
                && *start == datetime!(2019-03-01 00:00:00)
                && *end == datetime!(2021-11-30 23:00:00)
        })
        .times(1)
        .returning(|_, _, _, _| {
            Ok(vec![
                Measurement {
                    date: datetime!(2019-03-01 00:00:00),
                    value: Some(102.5),
                },
                Measurement {
                    date: datetime!(2019-03-01 01:00:00),
                    value: None,
                },
            ])
        });
    let test_app = spawn_app(Arc::new(store)).await;

    let response = test_app
        .app
        .clone()
        .oneshot(get("/api/stations/tmavy/ec_lin_micros_cm/dataseries/"))
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = body_json(response).await;
    assert_eq!(body["min_date"], "01-03-2019");
    assert_eq!(body["max_date"], "30-11-2021");
    assert_eq!(body["data"][0]["date"], "2019-03-01T00:00:00");
    assert_eq!(body["data"][0]["value"], 102.5);
    assert!(body["data"][1]["value"].is_null());
}

#[tokio::test]
async fn dataseries_honours_requested_dates() {
    let mut store = MockSeriesAccess::new();
    store.expect_non_null_range().times(1).returning(|_, _| {
        Ok(Some(DateRange {
            start: datetime!(2019-03-01 00:00:00),
            end: datetime!(2021-11-30 23:00:00),
        }))
    });
    store
        .expect_series()
        .withf(|_, _, start, end| {
            *start == datetime!(2020-06-01 00:00:00) && *end == datetime!(2020-06-02 23:59:59.999999)
        })
        .times(1)
        .returning(|_, _, _, _| Ok(vec![]));
    let test_app = spawn_app(Arc::new(store)).await;

    let response = test_app
        .app
        .clone()
        .oneshot(get(
            "/api/stations/tmavy/wl_mm/dataseries?start=2020-06-01&end=2020-06-02",
        ))
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::OK);
    let series: RangeSeries = body_json(response).await;
    assert_eq!(series.min_date.as_deref(), Some("01-03-2019"));
    assert!(series.data.is_empty());
}

#[tokio::test]
async fn dataseries_rejects_malformed_dates() {
    let mut store = MockSeriesAccess::new();
    store.expect_series().never();
    let test_app = spawn_app(Arc::new(store)).await;

    let response = test_app
        .app
        .clone()
        .oneshot(get(
            "/api/stations/tmavy/wl_mm/dataseries/?start=01-06-2020&end=2020-06-02",
        ))
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("01-06-2020"));
}

#[tokio::test]
async fn yearly_data_covers_the_calendar_year() {
    let mut store = MockSeriesAccess::new();
    store
        .expect_series()
        .withf(|_, field, start, end| {
            field.name == "wt_degc"
                && *start == datetime!(2021-01-01 00:00:00)
                && *end == datetime!(2021-12-31 23:59:59.999999)
        })
        .times(1)
        .returning(|_, _, _, _| {
            Ok(vec![Measurement {
                date: datetime!(2021-07-14 12:00:00),
                value: Some(14.2),
            }])
        });
    let test_app = spawn_app(Arc::new(store)).await;

    let response = test_app
        .app
        .clone()
        .oneshot(get("/api/stations/tmavy/wt_degc/2021/yearly-data"))
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::OK);
    let data: Vec<Measurement> = body_json(response).await;
    assert_eq!(data.len(), 1);
    assert_eq!(data[0].value, Some(14.2));
}

#[tokio::test]
async fn store_failures_are_server_errors() {
    let mut store = MockSeriesAccess::new();
    store.expect_years().times(1).returning(|_| {
        Err(db::Error::Column {
            index: 0,
            expected: "Int64Array",
        })
    });
    let test_app = spawn_app(Arc::new(store)).await;

    let response = test_app
        .app
        .clone()
        .oneshot(get("/api/stations/tmavy/years"))
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = body_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn serves_api_docs() {
    let test_app = spawn_app(Arc::new(MockSeriesAccess::new())).await;

    let response = test_app
        .app
        .clone()
        .oneshot(get("/docs"))
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), StatusCode::OK);
}
