use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Store-assigned parcel identifier. Kept as an integer internally so the
/// store can compute the next id, but rendered as a decimal string on the
/// wire ("1", "2", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParcelId(u64);

impl ParcelId {
    pub const FIRST: ParcelId = ParcelId(1);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn successor(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ParcelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ParcelId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

impl Serialize for ParcelId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ParcelId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParcelStatus {
    Pending,
    Delivered,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Parcel {
    pub id: ParcelId,
    pub tracking_number: String,
    pub sender: String,
    pub receiver: String,
    pub origin: String,
    pub destination: String,
    pub status: ParcelStatus,
    pub cost: f64,
    pub weight: f64,
    pub dispatch_date: String,
    pub delivery_date: Option<String>,
}
