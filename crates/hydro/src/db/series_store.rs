use crate::{
    dates::{self, format_param},
    file_access, seasonal::QUANTILES,
    Field, FileData, PercentileRecord, Station,
};
use async_trait::async_trait;
use duckdb::{
    arrow::array::{
        Array, Float64Array, Int64Array, RecordBatch, StringArray, TimestampMicrosecondArray,
    },
    params_from_iter, Connection,
};
use log::debug;
use regex::Regex;
use scooby::postgres::{select, Aliasable, Parameters, Select};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use time::{OffsetDateTime, PrimitiveDateTime};
use utoipa::ToSchema;

/// Column every station file carries its timestamps in.
pub const TIME_COLUMN: &str = "date_time";

/// The bundled build links parquet in; a system libduckdb may need to fetch it.
#[cfg(feature = "bundled")]
const PARQUET_SETUP: &str = "LOAD parquet;";
#[cfg(not(feature = "bundled"))]
const PARQUET_SETUP: &str = "INSTALL parquet; LOAD parquet;";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+)").expect("placeholder pattern is valid"));

pub struct SeriesAccess {
    file_access: Arc<dyn FileData>,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to query duckdb: {0}")]
    Query(#[from] duckdb::Error),
    #[error("Failed to format time string: {0}")]
    TimeFormat(#[from] time::error::Format),
    #[error("Stored timestamp out of range: {0}")]
    TimeRange(#[from] time::error::ComponentRange),
    #[error("Failed to access files: {0}")]
    FileAccess(#[from] file_access::Error),
    #[error("Unexpected result column {index}, expected {expected}")]
    Column { index: usize, expected: &'static str },
}

/// One reading of a station field; `value` is `None` where the sensor
/// recorded nothing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Measurement {
    #[serde(with = "dates::naive_timestamp")]
    #[schema(value_type = String, example = "2021-11-30T23:00:00")]
    pub date: PrimitiveDateTime,
    pub value: Option<f64>,
}

/// Inclusive span of naive local timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: PrimitiveDateTime,
    pub end: PrimitiveDateTime,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SeriesStore: Sync + Send {
    /// Readings of `field` within `[start, end]`, ascending by time, nulls kept.
    async fn series(
        &self,
        station: &Station,
        field: &Field,
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
    ) -> Result<Vec<Measurement>, Error>;
    /// First and last timestamp where `field` is non-null, `None` if it never is.
    async fn non_null_range(
        &self,
        station: &Station,
        field: &Field,
    ) -> Result<Option<DateRange>, Error>;
    /// Continuous 10th..90th percentiles of `field` per calendar month, all
    /// years combined, ordered by group key.
    async fn percentile_groups(
        &self,
        station: &Station,
        field: &Field,
    ) -> Result<Vec<PercentileRecord>, Error>;
    /// Distinct calendar years holding any row for the station, ascending.
    async fn years(&self, station: &Station) -> Result<Vec<i32>, Error>;
}

impl SeriesAccess {
    pub fn new(file_access: Arc<dyn FileData>) -> Self {
        Self { file_access }
    }

    /// Creates new in-memory connection, making it so we always start with a fresh slate and no possible locking issues
    pub fn open_connection(&self) -> Result<Connection, duckdb::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(PARQUET_SETUP)?;
        Ok(conn)
    }

    pub async fn query(
        &self,
        select: Select,
        params: Vec<String>,
    ) -> Result<Vec<RecordBatch>, duckdb::Error> {
        self.query_sql(&select.to_string(), params).await
    }

    pub async fn query_sql(
        &self,
        sql: &str,
        params: Vec<String>,
    ) -> Result<Vec<RecordBatch>, duckdb::Error> {
        let fixed_params = PLACEHOLDER.replace_all(sql, "?");
        debug!("running query: {}", fixed_params);
        let conn = self.open_connection()?;
        let mut stmt = conn.prepare(&fixed_params)?;
        let sql_params = params_from_iter(params.iter());
        Ok(stmt.query_arrow(sql_params)?.collect())
    }

    async fn station_source(
        &self,
        station: &Station,
        fields: &[&Field],
    ) -> Result<Option<String>, Error> {
        let file_paths = self.file_access.station_files(&station.id).await?;
        if file_paths.is_empty() {
            debug!("station {} has no data files", station.id);
            return Ok(None);
        }
        Ok(Some(source_sql(&file_paths, fields)))
    }
}

/// Reads every station file as one relation. The empty typed row keeps a
/// column readable as NULL when older files predate the sensor.
fn source_sql(file_paths: &[String], fields: &[&Field]) -> String {
    let typed_columns: String = fields
        .iter()
        .map(|field| format!(", NULL::DOUBLE AS {}", field.quoted_column()))
        .collect();
    let quoted_paths: Vec<String> = file_paths
        .iter()
        .map(|path| format!("'{}'", path.replace('\'', "''")))
        .collect();
    format!(
        "(SELECT NULL::TIMESTAMP AS {time}{columns} WHERE false \
         UNION ALL BY NAME \
         SELECT * FROM read_parquet([{paths}], union_by_name = true)) AS station_data",
        time = TIME_COLUMN,
        columns = typed_columns,
        paths = quoted_paths.join(", "),
    )
}

#[async_trait]
impl SeriesStore for SeriesAccess {
    async fn series(
        &self,
        station: &Station,
        field: &Field,
        start: PrimitiveDateTime,
        end: PrimitiveDateTime,
    ) -> Result<Vec<Measurement>, Error> {
        let Some(source) = self.station_source(station, &[field]).await? else {
            return Ok(vec![]);
        };

        let mut placeholders = Parameters::new();
        let values = vec![format_param(start)?, format_param(end)?];
        let query = select((
            format!("{}::TIMESTAMP", TIME_COLUMN).as_("date"),
            format!("{}::DOUBLE", field.quoted_column()).as_("value"),
        ))
        .from(source)
        .where_(format!(
            "{} >= {}::TIMESTAMP",
            TIME_COLUMN,
            placeholders.next()
        ))
        .where_(format!(
            "{} <= {}::TIMESTAMP",
            TIME_COLUMN,
            placeholders.next()
        ))
        .order_by(TIME_COLUMN);

        let records = self.query(query, values).await?;
        records.iter().try_fold(Vec::new(), |mut acc, record| {
            acc.extend(measurements_from(record)?);
            Ok(acc)
        })
    }

    async fn non_null_range(
        &self,
        station: &Station,
        field: &Field,
    ) -> Result<Option<DateRange>, Error> {
        let Some(source) = self.station_source(station, &[field]).await? else {
            return Ok(None);
        };

        let query = select((
            format!("MIN({})::TIMESTAMP", TIME_COLUMN).as_("min_date"),
            format!("MAX({})::TIMESTAMP", TIME_COLUMN).as_("max_date"),
        ))
        .from(source)
        .where_(format!("{} IS NOT NULL", field.quoted_column()));

        let records = self.query(query, vec![]).await?;
        for record in &records {
            let min_arr = timestamp_column(record, 0)?;
            let max_arr = timestamp_column(record, 1)?;
            for row_index in 0..record.num_rows() {
                if min_arr.is_null(row_index) || max_arr.is_null(row_index) {
                    continue;
                }
                return Ok(Some(DateRange {
                    start: from_micros(min_arr.value(row_index))?,
                    end: from_micros(max_arr.value(row_index))?,
                }));
            }
        }
        Ok(None)
    }

    async fn percentile_groups(
        &self,
        station: &Station,
        field: &Field,
    ) -> Result<Vec<PercentileRecord>, Error> {
        let Some(source) = self.station_source(station, &[field]).await? else {
            return Ok(vec![]);
        };

        let value = format!("{}::DOUBLE", field.quoted_column());
        let quantile_columns: Vec<String> = QUANTILES
            .iter()
            .map(|fraction| {
                format!(
                    "quantile_cont({}, {:.1}) AS q{}",
                    value,
                    fraction,
                    (fraction * 100.0).round() as u32
                )
            })
            .collect();

        // Grouping on the month-truncated instant discards day and time, so
        // the key is always the first of the month.
        let query_sql = format!(
            r#"
            SELECT
                strftime(date_trunc('month', {time}), '%m-%dT%H:%M:%S') AS group_key,
                {quantiles}
            FROM {source}
            WHERE {time} IS NOT NULL
            GROUP BY group_key
            ORDER BY group_key
            "#,
            time = TIME_COLUMN,
            quantiles = quantile_columns.join(",\n                "),
            source = source,
        );

        let records = self.query_sql(&query_sql, vec![]).await?;
        records.iter().try_fold(Vec::new(), |mut acc, record| {
            acc.extend(percentiles_from(record)?);
            Ok(acc)
        })
    }

    async fn years(&self, station: &Station) -> Result<Vec<i32>, Error> {
        let Some(source) = self.station_source(station, &[]).await? else {
            return Ok(vec![]);
        };

        let query = select(format!("year({})::BIGINT", TIME_COLUMN).as_("measured_year"))
            .from(source)
            .where_(format!("{} IS NOT NULL", TIME_COLUMN))
            .group_by("measured_year")
            .order_by("measured_year");

        let records = self.query(query, vec![]).await?;
        let mut years = Vec::new();
        for record in &records {
            let year_arr = int_column(record, 0)?;
            for row_index in 0..record.num_rows() {
                if !year_arr.is_null(row_index) {
                    let year = year_arr.value(row_index);
                    years.push(i32::try_from(year).map_err(|_| Error::Column {
                        index: 0,
                        expected: "year within i32",
                    })?);
                }
            }
        }
        Ok(years)
    }
}

fn string_column(record_batch: &RecordBatch, index: usize) -> Result<&StringArray, Error> {
    record_batch
        .column(index)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or(Error::Column {
            index,
            expected: "StringArray",
        })
}

fn timestamp_column(
    record_batch: &RecordBatch,
    index: usize,
) -> Result<&TimestampMicrosecondArray, Error> {
    record_batch
        .column(index)
        .as_any()
        .downcast_ref::<TimestampMicrosecondArray>()
        .ok_or(Error::Column {
            index,
            expected: "TimestampMicrosecondArray",
        })
}

/// Naive timestamps are stored as microseconds since the epoch, offset free.
fn from_micros(micros: i64) -> Result<PrimitiveDateTime, Error> {
    let instant = OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)?;
    Ok(PrimitiveDateTime::new(instant.date(), instant.time()))
}

fn float_column(record_batch: &RecordBatch, index: usize) -> Result<&Float64Array, Error> {
    record_batch
        .column(index)
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or(Error::Column {
            index,
            expected: "Float64Array",
        })
}

fn int_column(record_batch: &RecordBatch, index: usize) -> Result<&Int64Array, Error> {
    record_batch
        .column(index)
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or(Error::Column {
            index,
            expected: "Int64Array",
        })
}

fn optional_float(array: &Float64Array, row_index: usize) -> Option<f64> {
    if array.is_null(row_index) {
        None
    } else {
        Some(array.value(row_index))
    }
}

fn measurements_from(record_batch: &RecordBatch) -> Result<Vec<Measurement>, Error> {
    let date_arr = timestamp_column(record_batch, 0)?;
    let value_arr = float_column(record_batch, 1)?;

    let mut measurements = Vec::with_capacity(record_batch.num_rows());
    for row_index in 0..record_batch.num_rows() {
        measurements.push(Measurement {
            date: from_micros(date_arr.value(row_index))?,
            value: optional_float(value_arr, row_index),
        });
    }
    Ok(measurements)
}

fn percentiles_from(record_batch: &RecordBatch) -> Result<Vec<PercentileRecord>, Error> {
    let key_arr = string_column(record_batch, 0)?;
    let quantile_arrs = (1..=QUANTILES.len())
        .map(|index| float_column(record_batch, index))
        .collect::<Result<Vec<_>, _>>()?;

    let mut records = Vec::with_capacity(record_batch.num_rows());
    for row_index in 0..record_batch.num_rows() {
        let mut values = [None; 9];
        for (value, array) in values.iter_mut().zip(&quantile_arrs) {
            *value = optional_float(array, row_index);
        }
        records.push(PercentileRecord::from_quantiles(
            key_arr.value(row_index).to_owned(),
            values,
        ));
    }
    Ok(records)
}
