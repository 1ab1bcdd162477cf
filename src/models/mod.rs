pub mod parcel;
pub mod stats;
