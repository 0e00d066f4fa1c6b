//! Location heuristics: state extraction, lane distance factors and
//! regional fuel/labor adjustments.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_STATE: &str = "XX";

const STATE_KEYWORDS: [(&str, &str); 20] = [
    ("CALIFORNIA", "CA"),
    ("CA", "CA"),
    ("SAN JOSE", "CA"),
    ("LOS ANGELES", "CA"),
    ("TEXAS", "TX"),
    ("TX", "TX"),
    ("AUSTIN", "TX"),
    ("DALLAS", "TX"),
    ("NEW YORK", "NY"),
    ("NY", "NY"),
    ("NYC", "NY"),
    ("FLORIDA", "FL"),
    ("FL", "FL"),
    ("MIAMI", "FL"),
    ("WASHINGTON", "WA"),
    ("WA", "WA"),
    ("SEATTLE", "WA"),
    ("OREGON", "OR"),
    ("OR", "OR"),
    ("PORTLAND", "OR"),
];

// (a, b, factor in tenths)
const LANE_FACTORS: [(&str, &str, i64); 9] = [
    ("CA", "TX", 12),
    ("CA", "NY", 21),
    ("CA", "FL", 19),
    ("TX", "NY", 15),
    ("TX", "FL", 11),
    ("NY", "FL", 13),
    ("WA", "TX", 14),
    ("WA", "FL", 20),
    ("OR", "NY", 18),
];

// state, fuel factor in hundredths
const REGIONAL_FUEL_FACTORS: [(&str, i64); 5] =
    [("CA", 115), ("NY", 112), ("TX", 95), ("FL", 105), ("WA", 110)];

// scanned in order against the upper-cased location
const REGIONAL_LABOR_RATES: [(&str, i64); 6] =
    [("CA", 52), ("NY", 48), ("TX", 42), ("FL", 40), ("WA", 50), ("OR", 46)];

const NATIONAL_LABOR_RATE: i64 = 45;

/// First keyword contained in the upper-cased location wins.
pub fn state_code(location: &str) -> &'static str {
    let upper = location.to_uppercase();
    STATE_KEYWORDS
        .iter()
        .find(|(keyword, _)| upper.contains(keyword))
        .map(|(_, code)| *code)
        .unwrap_or(UNKNOWN_STATE)
}

pub fn distance_factor(origin: &str, destination: &str) -> Decimal {
    let from = state_code(origin);
    let to = state_code(destination);
    LANE_FACTORS
        .iter()
        .find(|(a, b, _)| (*a == from && *b == to) || (*a == to && *b == from))
        .map(|(_, _, tenths)| Decimal::new(*tenths, 1))
        .unwrap_or(Decimal::ONE)
}

pub fn base_fuel_rate() -> Decimal {
    Decimal::new(18, 2)
}

fn regional_fuel_factor(state: &str) -> Decimal {
    REGIONAL_FUEL_FACTORS
        .iter()
        .find(|(code, _)| *code == state)
        .map(|(_, hundredths)| Decimal::new(*hundredths, 2))
        .unwrap_or(Decimal::ONE)
}

/// 0.18 scaled by the mean of the origin and destination regional factors.
pub fn regional_fuel_rate(origin: &str, destination: &str) -> Decimal {
    let origin_factor = regional_fuel_factor(state_code(origin));
    let destination_factor = regional_fuel_factor(state_code(destination));
    base_fuel_rate() * (origin_factor + destination_factor) / Decimal::TWO
}

pub fn regional_labor_rate(location: &str) -> Decimal {
    let upper = location.to_uppercase();
    REGIONAL_LABOR_RATES
        .iter()
        .find(|(state, _)| upper.contains(state))
        .map(|(_, rate)| Decimal::from(*rate))
        .unwrap_or(Decimal::from(NATIONAL_LABOR_RATE))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEstimate {
    pub distance_miles: u32,
    pub estimated_transit_days: u32,
    pub route_difficulty: Decimal,
    pub known_route: bool,
}

const KNOWN_ROUTES: [(&str, &str, u32, u32, i64); 3] = [
    ("San Jose, CA", "Austin, TX", 1235, 3, 12),
    ("Los Angeles, CA", "New York, NY", 2445, 5, 18),
    ("Seattle, WA", "Miami, FL", 2734, 6, 20),
];

/// Exact lane lookup in either direction; unknown lanes get a national average.
pub fn route_estimate(origin: &str, destination: &str) -> RouteEstimate {
    let origin = origin.trim();
    let destination = destination.trim();
    KNOWN_ROUTES
        .iter()
        .find(|(a, b, ..)| {
            (*a == origin && *b == destination) || (*a == destination && *b == origin)
        })
        .map(|(_, _, miles, days, difficulty)| RouteEstimate {
            distance_miles: *miles,
            estimated_transit_days: *days,
            route_difficulty: Decimal::new(*difficulty, 1),
            known_route: true,
        })
        .unwrap_or(RouteEstimate {
            distance_miles: 1200,
            estimated_transit_days: 4,
            route_difficulty: Decimal::new(13, 1),
            known_route: false,
        })
}
