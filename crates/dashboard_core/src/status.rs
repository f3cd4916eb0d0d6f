//! crates/dashboard_core/src/status.rs
//!
//! Derives event and subscription statuses from wall-clock time.
//!
//! Nothing here is ever persisted: callers classify on every read and on every
//! refresh tick, so a status can never go stale in storage.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Event, InvoiceStatus, ProductType, SubscriptionLine, UserId};

/// A subscription is "expiring soon" while this many days or fewer remain.
pub const EXPIRING_SOON_DAYS: i64 = 7;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "upcoming",
            EventStatus::Ongoing => "ongoing",
            EventStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Active,
    ExpiringSoon,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::ExpiringSoon => "expiring_soon",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

/// Classifies an event window. Both ends of the window count as `Ongoing`.
pub fn classify_event(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> EventStatus {
    if now < start {
        EventStatus::Upcoming
    } else if now <= end {
        EventStatus::Ongoing
    } else {
        EventStatus::Completed
    }
}

/// Whole days left until `end`, rounded up.
///
/// Any positive remainder counts as a full day, so a contract ending later
/// today yields `1` and one ending exactly now yields `0`.
pub fn days_remaining(now: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let millis = (end - now).num_milliseconds();
    // Integer division truncates toward zero, which is already the ceiling
    // for negative values.
    let days = millis / MILLIS_PER_DAY;
    if millis > 0 && millis % MILLIS_PER_DAY != 0 {
        days + 1
    } else {
        days
    }
}

pub fn classify_days_remaining(days: i64) -> SubscriptionStatus {
    if days < 0 {
        SubscriptionStatus::Expired
    } else if days <= EXPIRING_SOON_DAYS {
        SubscriptionStatus::ExpiringSoon
    } else {
        SubscriptionStatus::Active
    }
}

/// Classifies a contract ending at `end`, returning the days left alongside.
pub fn classify_subscription(now: DateTime<Utc>, end: DateTime<Utc>) -> (i64, SubscriptionStatus) {
    let days = days_remaining(now, end);
    (days, classify_days_remaining(days))
}

/// An event paired with the status it has at the time of the read.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedEvent {
    pub event: Event,
    pub status: EventStatus,
}

pub fn classify_events(now: DateTime<Utc>, events: Vec<Event>) -> Vec<ClassifiedEvent> {
    events
        .into_iter()
        .map(|event| {
            let status = classify_event(now, event.start_time, event.end_time);
            ClassifiedEvent { event, status }
        })
        .collect()
}

/// Read-time projection of a sold subscription item.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionWatch {
    pub item_id: Uuid,
    pub invoice_number: String,
    pub customer_name: String,
    pub product_name: String,
    pub contract_start: Option<DateTime<Utc>>,
    pub contract_end: DateTime<Utc>,
    pub days_remaining: i64,
    pub status: SubscriptionStatus,
}

/// Projects joined invoice lines into subscription watches.
///
/// Ownership, invoice status, product type and the presence of a contract end
/// are all checked here explicitly, whatever the storage layer already
/// filtered. The result is ordered by contract end, soonest first.
pub fn project_subscriptions(
    now: DateTime<Utc>,
    owner_id: UserId,
    lines: Vec<SubscriptionLine>,
) -> Vec<SubscriptionWatch> {
    let mut watches: Vec<SubscriptionWatch> = lines
        .into_iter()
        .filter(|line| line.invoice_owner_id == owner_id)
        .filter(|line| line.invoice_status == InvoiceStatus::Completed)
        .filter(|line| line.product_type == ProductType::Subscription)
        .filter_map(|line| {
            let contract_end = line.contract_end?;
            let (days_remaining, status) = classify_subscription(now, contract_end);
            Some(SubscriptionWatch {
                item_id: line.item_id,
                invoice_number: line.invoice_number,
                customer_name: line.customer_name,
                product_name: line.product_name,
                contract_start: line.contract_start,
                contract_end,
                days_remaining,
                status,
            })
        })
        .collect();
    watches.sort_by_key(|w| w.contract_end);
    watches
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, h, m, 0).unwrap()
    }

    #[test]
    fn event_scenario_moves_through_all_three_states() {
        let (start, end) = (at(10, 0), at(12, 0));
        assert_eq!(classify_event(at(9, 0), start, end), EventStatus::Upcoming);
        assert_eq!(classify_event(at(11, 0), start, end), EventStatus::Ongoing);
        assert_eq!(classify_event(at(13, 0), start, end), EventStatus::Completed);
    }

    #[test]
    fn event_window_bounds_are_ongoing() {
        let (start, end) = (at(10, 0), at(12, 0));
        assert_eq!(classify_event(start, start, end), EventStatus::Ongoing);
        assert_eq!(classify_event(end, start, end), EventStatus::Ongoing);
        let just_before = start - Duration::milliseconds(1);
        let just_after = end + Duration::milliseconds(1);
        assert_eq!(classify_event(just_before, start, end), EventStatus::Upcoming);
        assert_eq!(classify_event(just_after, start, end), EventStatus::Completed);
    }

    #[test]
    fn days_remaining_rounds_up() {
        let now = at(10, 0);
        assert_eq!(days_remaining(now, now), 0);
        assert_eq!(days_remaining(now, now + Duration::hours(1)), 1);
        assert_eq!(days_remaining(now, now + Duration::days(1)), 1);
        assert_eq!(days_remaining(now, now + Duration::days(1) + Duration::seconds(1)), 2);
        assert_eq!(days_remaining(now, now - Duration::hours(1)), 0);
        assert_eq!(days_remaining(now, now - Duration::days(1)), -1);
        assert_eq!(days_remaining(now, now - Duration::hours(25)), -1);
    }

    #[test]
    fn subscription_thresholds() {
        assert_eq!(classify_days_remaining(-1), SubscriptionStatus::Expired);
        assert_eq!(classify_days_remaining(0), SubscriptionStatus::ExpiringSoon);
        assert_eq!(classify_days_remaining(7), SubscriptionStatus::ExpiringSoon);
        assert_eq!(classify_days_remaining(8), SubscriptionStatus::Active);
    }

    #[test]
    fn contract_ending_now_is_not_expired() {
        let now = at(10, 0);
        assert_eq!(classify_subscription(now, now), (0, SubscriptionStatus::ExpiringSoon));
    }

    fn line(owner: UserId, status: InvoiceStatus, product_type: ProductType, end: Option<DateTime<Utc>>) -> SubscriptionLine {
        SubscriptionLine {
            item_id: Uuid::new_v4(),
            invoice_owner_id: owner,
            invoice_number: "INV-1".to_string(),
            invoice_status: status,
            customer_name: "Salim".to_string(),
            product_name: "Hosting".to_string(),
            product_type,
            contract_start: None,
            contract_end: end,
        }
    }

    #[test]
    fn projection_filters_explicitly_and_sorts_by_end() {
        let now = at(10, 0);
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let lines = vec![
            line(owner, InvoiceStatus::Completed, ProductType::Subscription, Some(now + Duration::days(30))),
            line(owner, InvoiceStatus::Completed, ProductType::Subscription, Some(now - Duration::days(2))),
            line(owner, InvoiceStatus::Pending, ProductType::Subscription, Some(now)),
            line(owner, InvoiceStatus::Completed, ProductType::Physical, Some(now)),
            line(owner, InvoiceStatus::Completed, ProductType::Subscription, None),
            line(stranger, InvoiceStatus::Completed, ProductType::Subscription, Some(now)),
        ];

        let watches = project_subscriptions(now, owner, lines);

        assert_eq!(watches.len(), 2);
        assert_eq!(watches[0].status, SubscriptionStatus::Expired);
        assert_eq!(watches[0].days_remaining, -2);
        assert_eq!(watches[1].status, SubscriptionStatus::Active);
        assert_eq!(watches[1].days_remaining, 30);
    }
}
