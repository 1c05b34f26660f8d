use async_trait::async_trait;
use axum::Router;
use hydro::{
    app, app_state_with_store, db, DateRange, Field, Measurement, PercentileRecord, Registry,
    SeriesStore, Station,
};
use mockall::mock;
use std::sync::Arc;
use time::PrimitiveDateTime;

pub const TEST_REGISTRY: &str = r#"
    [[fields]]
    name = "wl_mm"
    column = "WL_mm"
    parameter = "Water level"
    code = "WL"
    unit = "mm"

    [[fields]]
    name = "wt_degc"
    column = "WT_degC"
    parameter = "Water temperature"
    code = "WT"
    unit = "degC"

    [[fields]]
    name = "ec_lin_micros_cm"
    column = "EC_lin_microS/cm"
    parameter = "Electrical conductivity"
    code = "EC_lin"
    unit = "microS/cm"

    [[stations]]
    id = "tmavy"
    label = "Tmavý potok"
    fields = ["wl_mm", "wt_degc", "ec_lin_micros_cm"]

    [[stations]]
    id = "slatinny_potok"
    fields = ["wl_mm"]
"#;

pub struct TestApp {
    pub app: Router,
}

pub fn test_registry() -> Registry {
    Registry::from_toml(TEST_REGISTRY).expect("test registry is valid")
}

pub async fn spawn_app(store: Arc<dyn SeriesStore>) -> TestApp {
    let app_state = app_state_with_store(
        String::from("http://127.0.0.1:9810"),
        test_registry(),
        store,
    );
    TestApp { app: app(app_state) }
}

mock! {
    pub SeriesAccess {}
    #[async_trait]
    impl SeriesStore for SeriesAccess {
        async fn series(
            &self,
            station: &Station,
            field: &Field,
            start: PrimitiveDateTime,
            end: PrimitiveDateTime,
        ) -> Result<Vec<Measurement>, db::Error>;
        async fn non_null_range(
            &self,
            station: &Station,
            field: &Field,
        ) -> Result<Option<DateRange>, db::Error>;
        async fn percentile_groups(
            &self,
            station: &Station,
            field: &Field,
        ) -> Result<Vec<PercentileRecord>, db::Error>;
        async fn years(&self, station: &Station) -> Result<Vec<i32>, db::Error>;
    }
}
