use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::scan_types::{AVAILABLE_STATUS, SpotRecord, StayWindow};

/// One way the upstream can express whether a spot is bookable.
///
/// Returns `None` when the record does not carry this shape, so the next
/// predicate gets a chance.
pub trait AvailabilityPredicate: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Verdict for this shape, if present.
    fn evaluate(&self, spot: &SpotRecord, window: &StayWindow) -> Option<bool>;
}

/// `isSpotAvailable: bool`
pub struct SpotFlag;

impl AvailabilityPredicate for SpotFlag {
    fn name(&self) -> &'static str {
        "isSpotAvailable"
    }

    fn evaluate(&self, spot: &SpotRecord, _window: &StayWindow) -> Option<bool> {
        spot.is_spot_available
    }
}

/// `availability: "Available"`
pub struct StatusField;

impl AvailabilityPredicate for StatusField {
    fn name(&self) -> &'static str {
        "availability"
    }

    fn evaluate(&self, spot: &SpotRecord, _window: &StayWindow) -> Option<bool> {
        spot.availability
            .as_deref()
            .map(|status| status == AVAILABLE_STATUS)
    }
}

/// `availabilities: { date: status }`, bookable only when the whole stay is.
pub struct DateMap;

impl AvailabilityPredicate for DateMap {
    fn name(&self) -> &'static str {
        "availabilities"
    }

    fn evaluate(&self, spot: &SpotRecord, window: &StayWindow) -> Option<bool> {
        spot.availabilities
            .as_ref()
            .map(|availabilities| whole_stay_available(availabilities, window))
    }
}

/// Every night present and `Available`, and nothing inside the window (or
/// undatable) reporting anything else.
fn whole_stay_available(availabilities: &BTreeMap<String, String>, window: &StayWindow) -> bool {
    let mut open_dates = BTreeSet::new();

    for (key, status) in availabilities {
        let available = status == AVAILABLE_STATUS;
        match parse_date_key(key) {
            Some(date) => {
                if !window.covers(date) {
                    continue;
                }
                if !available {
                    return false;
                }
                open_dates.insert(date);
            }
            None => {
                debug!("Unparseable availability date key: {}", key);
                if !available {
                    return false;
                }
            }
        }
    }

    let mut nights = window.nights().peekable();
    if nights.peek().is_none() {
        return false;
    }
    nights.all(|night| open_dates.contains(&night))
}

/// Date keys arrive as `2025-06-28`, `2025-06-28T00:00:00Z` or `06/28/2025`.
fn parse_date_key(key: &str) -> Option<NaiveDate> {
    key.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .or_else(|| NaiveDate::parse_from_str(key, "%m/%d/%Y").ok())
}

/// Ordered predicate chain; first predicate with an opinion wins.
pub struct AvailabilityEvaluator {
    window: StayWindow,
    predicates: Vec<Box<dyn AvailabilityPredicate>>,
}

impl AvailabilityEvaluator {
    /// Evaluator with the standard order: flag, status field, date map.
    pub fn new(window: StayWindow) -> Self {
        Self::with_predicates(
            window,
            vec![Box::new(SpotFlag), Box::new(StatusField), Box::new(DateMap)],
        )
    }

    /// Evaluator with a custom predicate order.
    pub fn with_predicates(
        window: StayWindow,
        predicates: Vec<Box<dyn AvailabilityPredicate>>,
    ) -> Self {
        Self { window, predicates }
    }

    /// Whether `spot` is bookable for the whole stay. Unknown shapes are not.
    pub fn is_available(&self, spot: &SpotRecord) -> bool {
        for predicate in &self.predicates {
            if let Some(verdict) = predicate.evaluate(spot, &self.window) {
                debug!(
                    "{} decided by {}: {}",
                    spot.display_name(),
                    predicate.name(),
                    verdict
                );
                return verdict;
            }
        }
        false
    }
}
