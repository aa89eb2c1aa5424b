use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::enums::{Direction, Interval, ParamName, Sorting};

/// A canonical parameter value. Closed union: converters know how to render
/// every variant into a platform-native encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Decimal(Decimal),
    Time(DateTime<Utc>),
    Interval(Interval),
    Direction(Direction),
    Sorting(Sorting),
}

/// Canonical request parameters: a `ParamName -> ParamValue` map with
/// builder helpers for the common fields.
#[derive(Debug, Clone, Default)]
pub struct Params(HashMap<ParamName, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: ParamName, value: ParamValue) -> Self {
        self.0.insert(name, value);
        self
    }

    pub fn symbol(self, symbol: impl Into<String>) -> Self {
        self.set(ParamName::Symbol, ParamValue::Str(symbol.into()))
    }

    pub fn interval(self, interval: Interval) -> Self {
        self.set(ParamName::Interval, ParamValue::Interval(interval))
    }

    pub fn limit(self, limit: u32) -> Self {
        self.set(ParamName::Limit, ParamValue::Int(limit as i64))
    }

    pub fn from_item(self, id: impl Into<String>) -> Self {
        self.set(ParamName::FromItem, ParamValue::Str(id.into()))
    }

    pub fn from_time(self, time: DateTime<Utc>) -> Self {
        self.set(ParamName::FromTime, ParamValue::Time(time))
    }

    pub fn to_time(self, time: DateTime<Utc>) -> Self {
        self.set(ParamName::ToTime, ParamValue::Time(time))
    }

    pub fn sorting(self, sorting: Sorting) -> Self {
        self.set(ParamName::Sorting, ParamValue::Sorting(sorting))
    }

    pub fn get(&self, name: ParamName) -> Option<&ParamValue> {
        self.0.get(&name)
    }

    pub fn contains(&self, name: ParamName) -> bool {
        self.0.contains_key(&name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParamName, &ParamValue)> {
        self.0.iter()
    }
}
