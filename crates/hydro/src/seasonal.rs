//! Seasonal percentile bands.
//!
//! Records are bucketed by calendar month with the year discarded, so each
//! band summarizes every year a station has measured. The store renders
//! a bucket's key from the month-truncated timestamp as `MM-DDTHH:MM:SS`,
//! which makes every key `MM-01T00:00:00` and keeps lexicographic order
//! equal to calendar order.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Percentile fractions computed for every group, 10th through 90th.
pub const QUANTILES: [f64; 9] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];

/// Key the December band is copied to at the start of the chart.
pub const YEAR_START_KEY: &str = "01-01T00:00:00";

/// Key the January band is copied to at the end of the chart.
pub const YEAR_END_KEY: &str = "12-31T00:00:00";

/// One seasonal group with its nine percentiles; a percentile is `None`
/// when the group holds no non-null value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct PercentileRecord {
    /// Year-less group label, `MM-DDTHH:MM:SS`
    #[serde(rename = "string_date_without_year")]
    pub group_key: String,
    pub q10: Option<f64>,
    pub q20: Option<f64>,
    pub q30: Option<f64>,
    pub q40: Option<f64>,
    pub q50: Option<f64>,
    pub q60: Option<f64>,
    pub q70: Option<f64>,
    pub q80: Option<f64>,
    pub q90: Option<f64>,
}

impl PercentileRecord {
    /// Builds a record from values ordered like [`QUANTILES`].
    pub fn from_quantiles(group_key: String, values: [Option<f64>; 9]) -> Self {
        let [q10, q20, q30, q40, q50, q60, q70, q80, q90] = values;
        Self {
            group_key,
            q10,
            q20,
            q30,
            q40,
            q50,
            q60,
            q70,
            q80,
            q90,
        }
    }

    pub fn quantiles(&self) -> [Option<f64>; 9] {
        [
            self.q10, self.q20, self.q30, self.q40, self.q50, self.q60, self.q70, self.q80,
            self.q90,
        ]
    }

    fn month(&self) -> &str {
        self.group_key.get(..2).unwrap_or_default()
    }

    fn with_key(&self, group_key: &str) -> Self {
        Self {
            group_key: group_key.to_owned(),
            ..self.clone()
        }
    }
}

/// Prepares monthly bands for a cyclic January to December line chart.
///
/// Every key moves to the 15th of its month. December is then copied to
/// [`YEAR_START_KEY`] at the front and January to [`YEAR_END_KEY`] at the
/// back, so the line has no gap at the year boundary. A missing December
/// or January simply skips its copy.
pub fn reshape_for_chart(mut records: Vec<PercentileRecord>) -> Vec<PercentileRecord> {
    for record in records.iter_mut() {
        record.group_key = format!("{}-15T00:00:00", record.month());
    }

    let december = records
        .iter()
        .find(|record| record.group_key.starts_with("12-"))
        .map(|record| record.with_key(YEAR_START_KEY));
    let january = records
        .iter()
        .find(|record| record.group_key.starts_with("01-"))
        .map(|record| record.with_key(YEAR_END_KEY));

    if let Some(december) = december {
        records.insert(0, december);
    }
    if let Some(january) = january {
        records.push(january);
    }

    records
}
