//! Date formats shared by the store and the API.
//!
//! Station timestamps are naive local times, so everything here works on
//! `PrimitiveDateTime` and never attaches an offset.

use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
use time::{
    format_description::BorrowedFormatItem,
    macros::{format_description, time},
    Date, PrimitiveDateTime, Time,
};

use crate::Error;

/// `2021-11-30T23:00:00`, the timestamp format of series points
pub const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// `2021-11-30 23:00:00.750000`, timestamps bound into queries at the
/// store's microsecond precision
pub const PARAM_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]");

/// `30-11-2021`, the format of resolved range bounds
pub const BOUND_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day]-[month]-[year]");

/// `2021-11-30`, the format of requested range dates
pub const QUERY_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

pub fn parse_timestamp(value: &str) -> Result<PrimitiveDateTime, time::error::Parse> {
    PrimitiveDateTime::parse(value, TIMESTAMP_FORMAT)
}

pub fn format_timestamp(value: PrimitiveDateTime) -> Result<String, time::error::Format> {
    value.format(TIMESTAMP_FORMAT)
}

pub fn format_param(value: PrimitiveDateTime) -> Result<String, time::error::Format> {
    value.format(PARAM_FORMAT)
}

pub fn format_bound(value: PrimitiveDateTime) -> Result<String, time::error::Format> {
    value.format(BOUND_FORMAT)
}

pub fn parse_query_date(value: &str) -> Result<Date, Error> {
    Date::parse(value.trim(), QUERY_DATE_FORMAT).map_err(|_| Error::InvalidDate {
        value: value.to_owned(),
    })
}

/// First instant of `date`
pub fn start_of_day(date: Date) -> PrimitiveDateTime {
    PrimitiveDateTime::new(date, Time::MIDNIGHT)
}

/// Last microsecond of `date`, the finest step the store keeps
pub fn end_of_day(date: Date) -> PrimitiveDateTime {
    PrimitiveDateTime::new(date, time!(23:59:59.999999))
}

/// Serde adapter for timestamps in `TIMESTAMP_FORMAT`, used with
/// `#[serde(with = "crate::dates::naive_timestamp")]`.
pub mod naive_timestamp {
    use super::*;

    pub fn serialize<S>(value: &PrimitiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = format_timestamp(*value).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<PrimitiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(D::Error::custom)
    }
}
