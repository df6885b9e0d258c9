//! Ride fabrication: synthesizes demo ride requests from a fixed location catalog.
//!
//! Draw order from the ride stream is pickup index, drop index, then distance. Money and time
//! are computed from the distance in whole tenths of a kilometre so the floors are exact.

use crate::ecs::{Coordinates, Customer, Location, Ride, RideId, RideStatus};
use crate::random::RandomSource;

/// Distance draws are uniform in `[MIN_DISTANCE_KM, MIN_DISTANCE_KM + DISTANCE_SPAN_KM)`.
pub const MIN_DISTANCE_KM: f64 = 2.0;
pub const DISTANCE_SPAN_KM: f64 = 10.0;

pub const BASE_FARE: u32 = 30;
pub const PER_KM_RATE: u32 = 15;
pub const BASE_ETA_MINS: u32 = 5;
pub const ETA_MINS_PER_KM: u32 = 3;

struct CatalogEntry {
    name: &'static str,
    lng: f64,
    lat: f64,
    address: &'static str,
}

const fn entry(
    name: &'static str,
    lng: f64,
    lat: f64,
    address: &'static str,
) -> CatalogEntry {
    CatalogEntry {
        name,
        lng,
        lat,
        address,
    }
}

const PICKUPS: [CatalogEntry; 4] = [
    entry("MG Road, Bangalore", 77.6105, 12.9758, "Near UB City"),
    entry("Indiranagar, Bangalore", 77.6408, 12.9784, "100 Feet Road"),
    entry("Koramangala, Bangalore", 77.6245, 12.9279, "Near Forum Mall"),
    entry("Whitefield, Bangalore", 77.7500, 12.9698, "ITPL Road"),
];

const DROPS: [CatalogEntry; 4] = [
    entry("Jayanagar, Bangalore", 77.5827, 12.9308, "4th Block"),
    entry("HSR Layout, Bangalore", 77.6387, 12.9123, "Sector 7"),
    entry("Malleswaram, Bangalore", 77.5667, 13.0067, "8th Cross"),
    entry("Yeshwanthpur, Bangalore", 77.5393, 13.0232, "Near Metro Station"),
];

impl CatalogEntry {
    fn to_location(&self) -> Location {
        Location {
            name: self.name.to_string(),
            coords: Coordinates {
                lng: self.lng,
                lat: self.lat,
            },
            address: self.address.to_string(),
        }
    }
}

pub fn pickup_catalog() -> Vec<Location> {
    PICKUPS.iter().map(CatalogEntry::to_location).collect()
}

pub fn drop_catalog() -> Vec<Location> {
    DROPS.iter().map(CatalogEntry::to_location).collect()
}

pub fn demo_customer() -> Customer {
    Customer {
        name: "Rahul Sharma".to_string(),
        phone: "+91 98765 43210".to_string(),
        rating: 4.5,
    }
}

fn tenths(distance_km: f64) -> u32 {
    (distance_km * 10.0).round().max(0.0) as u32
}

/// `floor(distance * 15 + 30)`.
pub fn fare_for_distance(distance_km: f64) -> u32 {
    (tenths(distance_km) * PER_KM_RATE + BASE_FARE * 10) / 10
}

/// `floor(distance * 3) + 5` minutes.
pub fn eta_for_distance(distance_km: f64) -> u32 {
    tenths(distance_km) * ETA_MINS_PER_KM / 10 + BASE_ETA_MINS
}

/// Distance for a unit draw, rounded to one decimal.
pub fn distance_for_draw(unit: f64) -> f64 {
    let raw = unit * DISTANCE_SPAN_KM + MIN_DISTANCE_KM;
    (raw * 10.0).round() / 10.0
}

/// Builds a pending ride. Deterministic given the draws from `rng`.
pub fn fabricate_ride(
    id: RideId,
    requested_at: u64,
    countdown_secs: u32,
    rng: &mut dyn RandomSource,
) -> Ride {
    let pickup = &PICKUPS[rng.index(PICKUPS.len())];
    let drop = &DROPS[rng.index(DROPS.len())];
    let distance_km = distance_for_draw(rng.next_unit());

    Ride {
        id,
        pickup: pickup.to_location(),
        drop: drop.to_location(),
        distance_km,
        fare: fare_for_distance(distance_km),
        eta_mins: eta_for_distance(distance_km),
        customer: demo_customer(),
        status: RideStatus::Pending,
        progress: 0,
        countdown_secs_left: countdown_secs,
        requested_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{ScriptedRandom, SeededRandom};

    #[test]
    fn fare_and_eta_follow_formula() {
        assert_eq!(fare_for_distance(5.0), 105);
        assert_eq!(eta_for_distance(5.0), 20);
        // 5.2 * 15 = 78 exactly; the tenths arithmetic keeps the floor from slipping to 107.
        assert_eq!(fare_for_distance(5.2), 108);
        assert_eq!(fare_for_distance(2.3), 64);
        assert_eq!(eta_for_distance(2.3), 11);
        assert_eq!(fare_for_distance(11.9), 208);
    }

    #[test]
    fn fabricated_ride_uses_scripted_draws() {
        let mut rng = ScriptedRandom::new([0.5, 0.99, 0.3]);
        let ride = fabricate_ride(RideId(7), 3000, 30, &mut rng);

        assert_eq!(ride.pickup.name, "Koramangala, Bangalore");
        assert_eq!(ride.drop.name, "Yeshwanthpur, Bangalore");
        assert_eq!(ride.distance_km, 5.0);
        assert_eq!(ride.fare, 105);
        assert_eq!(ride.eta_mins, 20);
        assert_eq!(ride.status, RideStatus::Pending);
        assert_eq!(ride.countdown_secs_left, 30);
        assert_eq!(ride.requested_at, 3000);
    }

    #[test]
    fn seeded_rides_stay_in_range() {
        let mut rng = SeededRandom::new(9);
        for n in 0..200 {
            let ride = fabricate_ride(RideId(n), 0, 30, &mut rng);
            assert!(ride.distance_km >= MIN_DISTANCE_KM);
            assert!(ride.distance_km <= MIN_DISTANCE_KM + DISTANCE_SPAN_KM);
            assert_eq!(ride.distance_km, (ride.distance_km * 10.0).round() / 10.0);
            assert_eq!(
                ride.fare,
                (ride.distance_km * 15.0 + 30.0 + 1e-9).floor() as u32
            );
        }
    }

    #[test]
    fn catalog_has_four_by_four_pairs() {
        assert_eq!(pickup_catalog().len(), 4);
        assert_eq!(drop_catalog().len(), 4);
    }
}
