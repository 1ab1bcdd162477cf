use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use crate::error::AppError;
use crate::models::parcel::{Parcel, ParcelId, ParcelStatus};
use crate::models::stats::ParcelStats;

/// Raw create input, form-shaped: every field arrives as text and is
/// validated by the store, not the deserializer. Missing fields default to
/// empty strings so they fall through the same required-field checks.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ParcelDraft {
    pub tracking_number: String,
    pub sender: String,
    pub receiver: String,
    pub origin: String,
    pub destination: String,
    pub cost: String,
    pub weight: String,
    pub dispatch_date: String,
}

/// The one editable field per update call, with its raw value. Field names
/// outside this set fail deserialization at the API boundary instead of
/// being silently ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldUpdate {
    Status(String),
    DeliveryDate(String),
    Cost(String),
    Weight(String),
}

/// Strict YYYY-MM-DD calendar check; "2025-13-40" does not pass.
pub fn validate_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

/// Owns the live parcel collection. Insertion order is preserved so list
/// and JSON reads return parcels in the order they were created.
#[derive(Debug, Default)]
pub struct ParcelStore {
    parcels: Vec<Parcel>,
}

impl ParcelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed six-record data set the service boots with.
    pub fn with_sample_data() -> Self {
        let sample = |id: u64,
                      tracking_number: &str,
                      sender: &str,
                      receiver: &str,
                      origin: &str,
                      destination: &str,
                      cost: f64,
                      weight: f64,
                      dispatch_date: &str,
                      delivery_date: Option<&str>| Parcel {
            id: ParcelId::new(id),
            tracking_number: tracking_number.to_string(),
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            origin: origin.to_string(),
            destination: destination.to_string(),
            status: if delivery_date.is_some() {
                ParcelStatus::Delivered
            } else {
                ParcelStatus::Pending
            },
            cost,
            weight,
            dispatch_date: dispatch_date.to_string(),
            delivery_date: delivery_date.map(str::to_string),
        };

        Self {
            parcels: vec![
                sample(
                    1,
                    "LP000123456CN",
                    "Cainiao Warehouse",
                    "Yossi Levi",
                    "Cainiao, China",
                    "Tel Aviv, Israel",
                    18.5,
                    1.2,
                    "2025-07-20",
                    Some("2025-08-01"),
                ),
                sample(
                    2,
                    "YT123456789CN",
                    "Shenzhen Logistics",
                    "Noa Cohen",
                    "Shenzhen, China",
                    "Haifa, Israel",
                    22.0,
                    2.0,
                    "2025-07-18",
                    Some("2025-07-29"),
                ),
                sample(
                    3,
                    "LP987654321CN",
                    "Cainiao Hub",
                    "Avi Mizrahi",
                    "Guangzhou, China",
                    "Jerusalem, Israel",
                    19.75,
                    1.7,
                    "2025-08-03",
                    None,
                ),
                sample(
                    4,
                    "UB123987456CN",
                    "Cainiao Dispatch",
                    "Maya Shalom",
                    "Hangzhou, China",
                    "Ramat Gan, Israel",
                    21.3,
                    0.8,
                    "2025-07-15",
                    Some("2025-07-27"),
                ),
                sample(
                    5,
                    "YT987321654CN",
                    "Yiwu Cainiao",
                    "Daniel Ben-David",
                    "Yiwu, China",
                    "Be'er Sheva, Israel",
                    20.0,
                    3.2,
                    "2025-08-04",
                    None,
                ),
                sample(
                    6,
                    "LP456789123CN",
                    "Cainiao Logistics",
                    "Tamar Azulay",
                    "Shanghai, China",
                    "Netanya, Israel",
                    25.6,
                    2.5,
                    "2025-07-22",
                    Some("2025-08-02"),
                ),
            ],
        }
    }

    pub fn parcels(&self) -> &[Parcel] {
        &self.parcels
    }

    pub fn len(&self) -> usize {
        self.parcels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }

    pub fn get(&self, id: ParcelId) -> Option<&Parcel> {
        self.parcels.iter().find(|parcel| parcel.id == id)
    }

    /// Max existing id plus one, or 1 on an empty store. Ids are never
    /// reused within a process even when the latest parcel is deleted,
    /// unless the current maximum itself is removed first.
    pub fn next_id(&self) -> ParcelId {
        self.parcels
            .iter()
            .map(|parcel| parcel.id)
            .max()
            .map(ParcelId::successor)
            .unwrap_or(ParcelId::FIRST)
    }

    /// True iff no parcel other than `exclude` carries this tracking number.
    pub fn is_tracking_number_unique(
        &self,
        tracking_number: &str,
        exclude: Option<ParcelId>,
    ) -> bool {
        !self.parcels.iter().any(|parcel| {
            parcel.tracking_number == tracking_number && Some(parcel.id) != exclude
        })
    }

    /// Validates the draft and appends a new pending parcel. Cost and weight
    /// must parse as decimals before anything else is checked; a failure
    /// there is reported alone. All remaining field errors accumulate.
    pub fn create(&mut self, draft: &ParcelDraft) -> Result<Parcel, Vec<String>> {
        let tracking_number = draft.tracking_number.trim();
        let sender = draft.sender.trim();
        let receiver = draft.receiver.trim();
        let origin = draft.origin.trim();
        let destination = draft.destination.trim();
        let dispatch_date = draft.dispatch_date.trim();

        let (Ok(cost), Ok(weight)) = (
            draft.cost.trim().parse::<f64>(),
            draft.weight.trim().parse::<f64>(),
        ) else {
            return Err(vec!["Invalid cost or weight value".to_string()]);
        };

        let mut errors = Vec::new();

        if tracking_number.is_empty() {
            errors.push("Tracking Number is required".to_string());
        } else if !self.is_tracking_number_unique(tracking_number, None) {
            errors.push("Tracking Number already exists".to_string());
        }

        if sender.is_empty() {
            errors.push("Sender is required".to_string());
        }
        if receiver.is_empty() {
            errors.push("Receiver is required".to_string());
        }
        if origin.is_empty() {
            errors.push("Origin is required".to_string());
        }
        if destination.is_empty() {
            errors.push("Destination is required".to_string());
        }
        if cost < 0.0 {
            errors.push("Cost cannot be negative".to_string());
        }
        if weight <= 0.0 {
            errors.push("Weight must be greater than 0".to_string());
        }
        if dispatch_date.is_empty() {
            errors.push("Dispatch Date is required".to_string());
        } else if !validate_date(dispatch_date) {
            errors.push("Invalid date format. Use YYYY-MM-DD".to_string());
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let parcel = Parcel {
            id: self.next_id(),
            tracking_number: tracking_number.to_string(),
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            origin: origin.to_string(),
            destination: destination.to_string(),
            status: ParcelStatus::Pending,
            cost,
            weight,
            dispatch_date: dispatch_date.to_string(),
            delivery_date: None,
        };

        self.parcels.push(parcel.clone());
        Ok(parcel)
    }

    /// Applies a single-field edit and returns a human-readable success
    /// message. The caller re-fetches the record if it needs the new state.
    pub fn update_field(&mut self, id: ParcelId, update: &FieldUpdate) -> Result<String, AppError> {
        let parcel = self
            .parcels
            .iter_mut()
            .find(|parcel| parcel.id == id)
            .ok_or_else(|| AppError::NotFound("Parcel not found".to_string()))?;

        match update {
            FieldUpdate::Status(value) => match value.as_str() {
                "pending" => {
                    parcel.status = ParcelStatus::Pending;
                    parcel.delivery_date = None;
                    Ok("Status updated successfully!".to_string())
                }
                "delivered" => {
                    parcel.status = ParcelStatus::Delivered;
                    if parcel.delivery_date.is_none() {
                        // Accepted, but the record is now delivered with no
                        // delivery date until one is supplied.
                        warn!(id = %parcel.id, "parcel marked delivered without a delivery date");
                    }
                    Ok("Status updated successfully!".to_string())
                }
                _ => Err(AppError::Validation(vec!["Invalid status value".to_string()])),
            },
            FieldUpdate::DeliveryDate(value) => {
                let value = value.trim();
                if value.is_empty() || value.eq_ignore_ascii_case("none") {
                    parcel.delivery_date = None;
                    parcel.status = ParcelStatus::Pending;
                    Ok("Delivery date cleared successfully!".to_string())
                } else if validate_date(value) {
                    parcel.delivery_date = Some(value.to_string());
                    parcel.status = ParcelStatus::Delivered;
                    Ok("Delivery date updated successfully!".to_string())
                } else {
                    Err(AppError::Validation(vec![
                        "Invalid date format. Use YYYY-MM-DD".to_string(),
                    ]))
                }
            }
            FieldUpdate::Cost(value) => match value.trim().parse::<f64>() {
                Ok(cost) if cost < 0.0 => Err(AppError::Validation(vec![
                    "Cost cannot be negative".to_string(),
                ])),
                Ok(cost) => {
                    parcel.cost = cost;
                    Ok("Cost updated successfully!".to_string())
                }
                Err(_) => Err(AppError::Validation(vec!["Invalid cost value".to_string()])),
            },
            FieldUpdate::Weight(value) => match value.trim().parse::<f64>() {
                Ok(weight) if weight <= 0.0 => Err(AppError::Validation(vec![
                    "Weight must be greater than 0".to_string(),
                ])),
                Ok(weight) => {
                    parcel.weight = weight;
                    Ok("Weight updated successfully!".to_string())
                }
                Err(_) => Err(AppError::Validation(vec![
                    "Invalid weight value".to_string(),
                ])),
            },
        }
    }

    /// Permanently removes the parcel and returns it.
    pub fn remove(&mut self, id: ParcelId) -> Result<Parcel, AppError> {
        let index = self
            .parcels
            .iter()
            .position(|parcel| parcel.id == id)
            .ok_or_else(|| AppError::NotFound("Parcel not found".to_string()))?;

        Ok(self.parcels.remove(index))
    }

    pub fn stats(&self) -> ParcelStats {
        if self.parcels.is_empty() {
            return ParcelStats::empty();
        }

        let total_parcels = self.parcels.len();
        let delivered_count = self
            .parcels
            .iter()
            .filter(|parcel| parcel.status == ParcelStatus::Delivered)
            .count();
        let total_cost: f64 = self.parcels.iter().map(|parcel| parcel.cost).sum();
        let total_weight: f64 = self.parcels.iter().map(|parcel| parcel.weight).sum();

        ParcelStats {
            total_parcels,
            delivered_count,
            pending_count: total_parcels - delivered_count,
            total_cost,
            total_weight,
            avg_cost: total_cost / total_parcels as f64,
            avg_weight: total_weight / total_parcels as f64,
            delivery_rate: delivered_count as f64 / total_parcels as f64 * 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_date, FieldUpdate, ParcelDraft, ParcelStore};
    use crate::error::AppError;
    use crate::models::parcel::{ParcelId, ParcelStatus};

    fn draft(tracking_number: &str) -> ParcelDraft {
        ParcelDraft {
            tracking_number: tracking_number.to_string(),
            sender: "Cainiao Warehouse".to_string(),
            receiver: "Yossi Levi".to_string(),
            origin: "Shenzhen, China".to_string(),
            destination: "Tel Aviv, Israel".to_string(),
            cost: "18.5".to_string(),
            weight: "1.2".to_string(),
            dispatch_date: "2025-07-20".to_string(),
        }
    }

    #[test]
    fn strict_date_validation() {
        assert!(validate_date("2025-09-01"));
        assert!(!validate_date("2025-13-40"));
        assert!(!validate_date("2025-02-30"));
        assert!(!validate_date("01-09-2025"));
        assert!(!validate_date("2025-9-1 extra"));
    }

    #[test]
    fn first_id_on_empty_store_is_one() {
        let mut store = ParcelStore::new();
        let parcel = store.create(&draft("LP1")).unwrap();
        assert_eq!(parcel.id, ParcelId::new(1));
    }

    #[test]
    fn ids_are_max_plus_one() {
        let mut store = ParcelStore::with_sample_data();
        let parcel = store.create(&draft("LP-NEW")).unwrap();
        assert_eq!(parcel.id, ParcelId::new(7));

        // Deleting a non-max record does not affect the sequence.
        store.remove(ParcelId::new(2)).unwrap();
        let parcel = store.create(&draft("LP-NEWER")).unwrap();
        assert_eq!(parcel.id, ParcelId::new(8));
    }

    #[test]
    fn create_round_trip() {
        let mut store = ParcelStore::new();
        let created = store.create(&draft("LP1")).unwrap();

        let fetched = store.get(created.id).unwrap();
        assert_eq!(fetched, &created);
        assert_eq!(fetched.status, ParcelStatus::Pending);
        assert_eq!(fetched.delivery_date, None);
        assert_eq!(fetched.tracking_number, "LP1");
        assert_eq!(fetched.cost, 18.5);
        assert_eq!(fetched.weight, 1.2);
    }

    #[test]
    fn create_trims_whitespace() {
        let mut store = ParcelStore::new();
        let mut input = draft("  LP1  ");
        input.sender = " Cainiao Warehouse ".to_string();
        let created = store.create(&input).unwrap();
        assert_eq!(created.tracking_number, "LP1");
        assert_eq!(created.sender, "Cainiao Warehouse");
    }

    #[test]
    fn duplicate_tracking_number_is_rejected() {
        let mut store = ParcelStore::new();
        store.create(&draft("LP1")).unwrap();

        let errors = store.create(&draft("LP1")).unwrap_err();
        assert!(errors.contains(&"Tracking Number already exists".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unparseable_cost_short_circuits_all_other_checks() {
        let mut store = ParcelStore::new();
        let input = ParcelDraft {
            cost: "abc".to_string(),
            weight: "1.0".to_string(),
            ..ParcelDraft::default()
        };

        // Every other field is empty, yet only the parse error is reported.
        let errors = store.create(&input).unwrap_err();
        assert_eq!(errors, vec!["Invalid cost or weight value".to_string()]);
        assert!(store.is_empty());
    }

    #[test]
    fn create_accumulates_all_field_errors() {
        let mut store = ParcelStore::new();
        let input = ParcelDraft {
            cost: "-1".to_string(),
            weight: "0".to_string(),
            dispatch_date: "2025-13-40".to_string(),
            ..ParcelDraft::default()
        };

        let errors = store.create(&input).unwrap_err();
        assert_eq!(
            errors,
            vec![
                "Tracking Number is required".to_string(),
                "Sender is required".to_string(),
                "Receiver is required".to_string(),
                "Origin is required".to_string(),
                "Destination is required".to_string(),
                "Cost cannot be negative".to_string(),
                "Weight must be greater than 0".to_string(),
                "Invalid date format. Use YYYY-MM-DD".to_string(),
            ]
        );
        assert!(store.is_empty());
    }

    #[test]
    fn delivery_date_update_couples_status() {
        let mut store = ParcelStore::new();
        let id = store.create(&draft("LP1")).unwrap().id;

        store
            .update_field(id, &FieldUpdate::DeliveryDate("2025-09-01".to_string()))
            .unwrap();
        let parcel = store.get(id).unwrap();
        assert_eq!(parcel.status, ParcelStatus::Delivered);
        assert_eq!(parcel.delivery_date.as_deref(), Some("2025-09-01"));

        store
            .update_field(id, &FieldUpdate::DeliveryDate("".to_string()))
            .unwrap();
        let parcel = store.get(id).unwrap();
        assert_eq!(parcel.status, ParcelStatus::Pending);
        assert_eq!(parcel.delivery_date, None);

        // The literal "none" clears too, case-insensitively.
        store
            .update_field(id, &FieldUpdate::DeliveryDate("2025-09-01".to_string()))
            .unwrap();
        store
            .update_field(id, &FieldUpdate::DeliveryDate("None".to_string()))
            .unwrap();
        let parcel = store.get(id).unwrap();
        assert_eq!(parcel.status, ParcelStatus::Pending);
        assert_eq!(parcel.delivery_date, None);
    }

    #[test]
    fn invalid_delivery_date_leaves_parcel_untouched() {
        let mut store = ParcelStore::new();
        let id = store.create(&draft("LP1")).unwrap().id;

        let err = store
            .update_field(id, &FieldUpdate::DeliveryDate("2025-13-40".to_string()))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let parcel = store.get(id).unwrap();
        assert_eq!(parcel.status, ParcelStatus::Pending);
        assert_eq!(parcel.delivery_date, None);
    }

    #[test]
    fn status_pending_clears_delivery_date() {
        let mut store = ParcelStore::new();
        let id = store.create(&draft("LP1")).unwrap().id;
        store
            .update_field(id, &FieldUpdate::DeliveryDate("2025-09-01".to_string()))
            .unwrap();

        store
            .update_field(id, &FieldUpdate::Status("pending".to_string()))
            .unwrap();
        let parcel = store.get(id).unwrap();
        assert_eq!(parcel.status, ParcelStatus::Pending);
        assert_eq!(parcel.delivery_date, None);
    }

    #[test]
    fn status_delivered_does_not_set_delivery_date() {
        let mut store = ParcelStore::new();
        let id = store.create(&draft("LP1")).unwrap().id;

        store
            .update_field(id, &FieldUpdate::Status("delivered".to_string()))
            .unwrap();
        let parcel = store.get(id).unwrap();
        assert_eq!(parcel.status, ParcelStatus::Delivered);
        assert_eq!(parcel.delivery_date, None);
    }

    #[test]
    fn status_value_is_case_sensitive() {
        let mut store = ParcelStore::new();
        let id = store.create(&draft("LP1")).unwrap().id;

        let err = store
            .update_field(id, &FieldUpdate::Status("Delivered".to_string()))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.get(id).unwrap().status, ParcelStatus::Pending);
    }

    #[test]
    fn cost_and_weight_updates_validate_ranges() {
        let mut store = ParcelStore::new();
        let id = store.create(&draft("LP1")).unwrap().id;

        store
            .update_field(id, &FieldUpdate::Cost("0".to_string()))
            .unwrap();
        assert_eq!(store.get(id).unwrap().cost, 0.0);

        let err = store
            .update_field(id, &FieldUpdate::Cost("-2.5".to_string()))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msgs) if msgs == &["Cost cannot be negative"]));

        let err = store
            .update_field(id, &FieldUpdate::Cost("abc".to_string()))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msgs) if msgs == &["Invalid cost value"]));

        let err = store
            .update_field(id, &FieldUpdate::Weight("0".to_string()))
            .unwrap_err();
        assert!(
            matches!(err, AppError::Validation(ref msgs) if msgs == &["Weight must be greater than 0"])
        );

        let err = store
            .update_field(id, &FieldUpdate::Weight("heavy".to_string()))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msgs) if msgs == &["Invalid weight value"]));

        store
            .update_field(id, &FieldUpdate::Weight("2.75".to_string()))
            .unwrap();
        assert_eq!(store.get(id).unwrap().weight, 2.75);
    }

    #[test]
    fn update_on_missing_parcel_is_not_found() {
        let mut store = ParcelStore::new();
        let err = store
            .update_field(
                ParcelId::new(99),
                &FieldUpdate::Cost("1.0".to_string()),
            )
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn remove_returns_the_parcel() {
        let mut store = ParcelStore::new();
        let id = store.create(&draft("LP1")).unwrap().id;

        let removed = store.remove(id).unwrap();
        assert_eq!(removed.tracking_number, "LP1");
        assert!(store.is_empty());
    }

    #[test]
    fn remove_missing_parcel_leaves_store_unchanged() {
        let mut store = ParcelStore::with_sample_data();
        let err = store.remove(ParcelId::new(99)).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(store.len(), 6);
    }

    #[test]
    fn stats_on_empty_store_are_all_zero() {
        let store = ParcelStore::new();
        let stats = store.stats();
        assert_eq!(stats.total_parcels, 0);
        assert_eq!(stats.delivered_count, 0);
        assert_eq!(stats.pending_count, 0);
        assert_eq!(stats.total_cost, 0.0);
        assert_eq!(stats.total_weight, 0.0);
        assert_eq!(stats.avg_cost, 0.0);
        assert_eq!(stats.avg_weight, 0.0);
        assert_eq!(stats.delivery_rate, 0.0);
    }

    #[test]
    fn stats_for_two_delivered_parcels() {
        let mut store = ParcelStore::new();
        let mut first = draft("LP1");
        first.cost = "10".to_string();
        first.weight = "1".to_string();
        let mut second = draft("LP2");
        second.cost = "20".to_string();
        second.weight = "3".to_string();

        let first_id = store.create(&first).unwrap().id;
        let second_id = store.create(&second).unwrap().id;
        store
            .update_field(first_id, &FieldUpdate::DeliveryDate("2025-08-01".to_string()))
            .unwrap();
        store
            .update_field(second_id, &FieldUpdate::DeliveryDate("2025-08-02".to_string()))
            .unwrap();

        let stats = store.stats();
        assert_eq!(stats.total_parcels, 2);
        assert_eq!(stats.delivered_count, 2);
        assert_eq!(stats.pending_count, 0);
        assert_eq!(stats.total_cost, 30.0);
        assert_eq!(stats.avg_cost, 15.0);
        assert_eq!(stats.total_weight, 4.0);
        assert_eq!(stats.avg_weight, 2.0);
        assert_eq!(stats.delivery_rate, 100.0);
    }

    #[test]
    fn sample_data_is_consistent() {
        let store = ParcelStore::with_sample_data();
        assert_eq!(store.len(), 6);
        assert_eq!(store.next_id(), ParcelId::new(7));

        for parcel in store.parcels() {
            assert_eq!(
                parcel.status == ParcelStatus::Delivered,
                parcel.delivery_date.is_some()
            );
            assert!(parcel.cost >= 0.0);
            assert!(parcel.weight > 0.0);
            assert!(store.is_tracking_number_unique(&parcel.tracking_number, Some(parcel.id)));
        }

        let stats = store.stats();
        assert_eq!(stats.delivered_count, 4);
        assert_eq!(stats.pending_count, 2);
    }
}
