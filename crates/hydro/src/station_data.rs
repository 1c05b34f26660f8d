//! Per-station queries exposed to the HTTP boundary.
//!
//! Every operation resolves the station and field through the registry
//! before the store is touched, so an unknown station or field never
//! reaches a query.

use std::sync::Arc;

use futures::try_join;
use log::debug;
use serde::{Deserialize, Serialize};
use time::{Date, Month};
use utoipa::ToSchema;

use crate::{
    dates::{end_of_day, format_bound, parse_query_date, start_of_day},
    db::{self, DateRange, Measurement, SeriesStore},
    seasonal::reshape_for_chart,
    Error, PercentileRecord, Registry,
};

/// Raw series plus the span the field has data for.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct RangeSeries {
    /// First day with a non-null value, `DD-MM-YYYY`; null when there is none
    pub min_date: Option<String>,
    /// Last day with a non-null value, `DD-MM-YYYY`; null when there is none
    pub max_date: Option<String>,
    pub data: Vec<Measurement>,
}

#[derive(Clone)]
pub struct StationData {
    registry: Arc<Registry>,
    store: Arc<dyn SeriesStore>,
}

impl StationData {
    pub fn new(registry: Arc<Registry>, store: Arc<dyn SeriesStore>) -> Self {
        Self { registry, store }
    }

    /// Readings of `field` between `start` and `end` (whole days, inclusive).
    /// Without both dates the span where the field has data is used.
    pub async fn range_series(
        &self,
        station_id: &str,
        field_name: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<RangeSeries, Error> {
        let station = self.registry.station(station_id)?;
        let field = station.field(field_name)?;

        let requested = match (non_empty(start), non_empty(end)) {
            (Some(start), Some(end)) => Some(requested_range(start, end)?),
            _ => None,
        };

        let (available, data) = match requested {
            Some(range) => {
                debug!(
                    "series for {}.{} from {} to {}",
                    station.id, field.name, range.start, range.end
                );
                try_join!(
                    self.store.non_null_range(station, field),
                    self.store.series(station, field, range.start, range.end),
                )?
            }
            None => {
                let available = self.store.non_null_range(station, field).await?;
                let data = match available {
                    Some(range) => {
                        self.store
                            .series(station, field, range.start, range.end)
                            .await?
                    }
                    None => vec![],
                };
                (available, data)
            }
        };

        let (min_date, max_date) = match available {
            Some(range) => (
                Some(format_bound(range.start).map_err(db::Error::from)?),
                Some(format_bound(range.end).map_err(db::Error::from)?),
            ),
            None => (None, None),
        };

        Ok(RangeSeries {
            min_date,
            max_date,
            data,
        })
    }

    /// Readings of `field` from 1 January through 31 December of `year`.
    pub async fn yearly_series(
        &self,
        station_id: &str,
        field_name: &str,
        year: &str,
    ) -> Result<Vec<Measurement>, Error> {
        let station = self.registry.station(station_id)?;
        let field = station.field(field_name)?;
        let year: i32 = year
            .trim()
            .parse()
            .map_err(|_| Error::InvalidYear(year.to_owned()))?;

        let first = Date::from_calendar_date(year, Month::January, 1)
            .map_err(|_| Error::InvalidYear(year.to_string()))?;
        let last = Date::from_calendar_date(year, Month::December, 31)
            .map_err(|_| Error::InvalidYear(year.to_string()))?;

        Ok(self
            .store
            .series(station, field, start_of_day(first), end_of_day(last))
            .await?)
    }

    /// Monthly percentile bands of `field` across all years, optionally
    /// reshaped for a cyclic chart.
    pub async fn percentiles(
        &self,
        station_id: &str,
        field_name: &str,
        reshape: bool,
    ) -> Result<Vec<PercentileRecord>, Error> {
        let station = self.registry.station(station_id)?;
        let field = station.field(field_name)?;

        let records = self.store.percentile_groups(station, field).await?;
        if reshape {
            Ok(reshape_for_chart(records))
        } else {
            Ok(records)
        }
    }

    /// Calendar years the station has any rows for, ascending.
    pub async fn years(&self, station_id: &str) -> Result<Vec<i32>, Error> {
        let station = self.registry.station(station_id)?;
        Ok(self.store.years(station).await?)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn requested_range(start: &str, end: &str) -> Result<DateRange, Error> {
    let start_date = parse_query_date(start)?;
    let end_date = parse_query_date(end)?;
    if start_date > end_date {
        return Err(Error::InvalidRange {
            start: start.to_owned(),
            end: end.to_owned(),
        });
    }
    Ok(DateRange {
        start: start_of_day(start_date),
        end: end_of_day(end_date),
    })
}
