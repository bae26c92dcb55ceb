use once_cell::sync::Lazy;
use rand::Rng;
use tracing::{debug, warn};

use crate::models::{AppStatRecord, Timeframe, Vehicle};
use crate::normalize::normalize_app_name;

/// Vehicles the hand-authored seed figures exist for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeedVehicle {
    Bike,
    Car,
    Scooter,
    Foot,
}

#[derive(Debug, Clone, Copy)]
struct SeedEntry {
    app: &'static str,
    orders: u32,
    avg_pay: f64,
}

const fn e(app: &'static str, orders: u32, avg_pay: f64) -> SeedEntry {
    SeedEntry {
        app,
        orders,
        avg_pay,
    }
}

type SeedBucket = [SeedEntry; 5];

// [timeframe][bike, car, scooter, foot]
const SEED_TABLE: [[SeedBucket; 4]; 4] = [
    // hour
    [
        [
            e("Just Eat", 6, 14.5),
            e("Uber Eats", 6, 13.8),
            e("Deliveroo", 6, 13.1),
            e("Foodhub", 4, 10.8),
            e("Zapp", 3, 9.5),
        ],
        [
            e("Just Eat", 4, 13.2),
            e("Uber Eats", 4, 12.9),
            e("Deliveroo", 4, 12.5),
            e("Foodhub", 2, 9.5),
            e("Zapp", 0, 0.0),
        ],
        [
            e("Just Eat", 5, 11.2),
            e("Uber Eats", 5, 10.9),
            e("Deliveroo", 0, 0.0),
            e("Foodhub", 0, 0.0),
            e("Zapp", 0, 0.0),
        ],
        [
            e("Just Eat", 2, 4.2),
            e("Uber Eats", 2, 4.1),
            e("Deliveroo", 0, 0.0),
            e("Foodhub", 0, 0.0),
            e("Zapp", 0, 0.0),
        ],
    ],
    // day
    [
        [
            e("Just Eat", 30, 105.5),
            e("Uber Eats", 28, 102.0),
            e("Deliveroo", 25, 95.0),
            e("Foodhub", 15, 72.0),
            e("Zapp", 12, 62.0),
        ],
        [
            e("Just Eat", 20, 98.0),
            e("Uber Eats", 20, 96.0),
            e("Deliveroo", 18, 92.0),
            e("Foodhub", 0, 0.0),
            e("Zapp", 0, 0.0),
        ],
        [
            e("Just Eat", 15, 85.0),
            e("Uber Eats", 15, 82.0),
            e("Deliveroo", 0, 0.0),
            e("Foodhub", 0, 0.0),
            e("Zapp", 0, 0.0),
        ],
        [
            e("Just Eat", 5, 30.0),
            e("Uber Eats", 5, 28.0),
            e("Deliveroo", 0, 0.0),
            e("Foodhub", 0, 0.0),
            e("Zapp", 0, 0.0),
        ],
    ],
    // week
    [
        [
            e("Just Eat", 200, 680.0),
            e("Uber Eats", 190, 650.0),
            e("Deliveroo", 180, 620.0),
            e("Foodhub", 100, 390.0),
            e("Zapp", 80, 320.0),
        ],
        [
            e("Just Eat", 150, 630.0),
            e("Uber Eats", 140, 610.0),
            e("Deliveroo", 130, 590.0),
            e("Foodhub", 0, 0.0),
            e("Zapp", 0, 0.0),
        ],
        [
            e("Just Eat", 120, 530.0),
            e("Uber Eats", 110, 510.0),
            e("Deliveroo", 0, 0.0),
            e("Foodhub", 0, 0.0),
            e("Zapp", 0, 0.0),
        ],
        [
            e("Just Eat", 30, 120.0),
            e("Uber Eats", 30, 114.0),
            e("Deliveroo", 0, 0.0),
            e("Foodhub", 0, 0.0),
            e("Zapp", 0, 0.0),
        ],
    ],
    // month
    [
        [
            e("Just Eat", 850, 2600.0),
            e("Uber Eats", 800, 2500.0),
            e("Deliveroo", 750, 2400.0),
            e("Foodhub", 400, 1500.0),
            e("Zapp", 300, 1100.0),
        ],
        [
            e("Just Eat", 600, 2200.0),
            e("Uber Eats", 550, 2100.0),
            e("Deliveroo", 500, 2000.0),
            e("Foodhub", 0, 0.0),
            e("Zapp", 0, 0.0),
        ],
        [
            e("Just Eat", 500, 1900.0),
            e("Uber Eats", 450, 1800.0),
            e("Deliveroo", 0, 0.0),
            e("Foodhub", 0, 0.0),
            e("Zapp", 0, 0.0),
        ],
        [
            e("Just Eat", 100, 380.0),
            e("Uber Eats", 90, 350.0),
            e("Deliveroo", 0, 0.0),
            e("Foodhub", 0, 0.0),
            e("Zapp", 0, 0.0),
        ],
    ],
];

fn seed_bucket(timeframe: Timeframe, vehicle: SeedVehicle) -> &'static SeedBucket {
    let column = match vehicle {
        SeedVehicle::Bike => 0,
        SeedVehicle::Car => 1,
        SeedVehicle::Scooter => 2,
        SeedVehicle::Foot => 3,
    };
    &SEED_TABLE[timeframe.index()][column]
}

/// Which seed column a vehicle is derived from, and the scale applied.
fn seed_source(vehicle: Vehicle) -> (SeedVehicle, f64) {
    match vehicle {
        Vehicle::Bike => (SeedVehicle::Bike, 1.0),
        Vehicle::Ebike => (SeedVehicle::Bike, 1.1),
        Vehicle::Scooter => (SeedVehicle::Scooter, 1.0),
        Vehicle::Foot => (SeedVehicle::Foot, 1.0),
        Vehicle::Motor => (SeedVehicle::Car, 0.98),
        Vehicle::Car => (SeedVehicle::Car, 1.0),
    }
}

/// Apps missing from the seed table, keyed by lowercased normalized name.
pub const NEW_APP_VEHICLES: &[(&str, &[Vehicle])] = &[
    ("stuart", &[Vehicle::Bike, Vehicle::Scooter, Vehicle::Ebike]),
    ("glovo", &[Vehicle::Bike, Vehicle::Foot]),
    ("dishpatch", &[Vehicle::Car]),
    ("gophr", &[Vehicle::Bike, Vehicle::Car, Vehicle::Ebike]),
    ("snappy shopper", &[Vehicle::Car, Vehicle::Motor]),
];

const NEW_APP_SCALE: f64 = 0.97;

/// Replaces the last digit of two-digit-or-larger counts with a random one.
pub fn randomize_last_digit<R: Rng + ?Sized>(orders: u32, rng: &mut R) -> u32 {
    if orders < 10 {
        return orders;
    }
    orders / 10 * 10 + rng.gen_range(0..10)
}

/// Applies up to 2% jitter either way, rounded to pence.
pub fn randomize_avg_pay<R: Rng + ?Sized>(avg_pay: f64, rng: &mut R) -> f64 {
    let factor = 1.0 + rng.gen_range(-0.02..0.02);
    round2(avg_pay * factor)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn scaled<R: Rng + ?Sized>(
    app: String,
    orders: u32,
    avg_pay: f64,
    scale: f64,
    rng: &mut R,
) -> AppStatRecord {
    AppStatRecord {
        app,
        orders: randomize_last_digit((f64::from(orders) * scale).round() as u32, rng),
        avg_pay: randomize_avg_pay(avg_pay * scale, rng),
    }
}

/// Baseline figures for every (timeframe, vehicle) pair.
#[derive(Debug, Clone)]
pub struct FallbackTable {
    buckets: [[Vec<AppStatRecord>; 6]; 4],
}

impl FallbackTable {
    /// Expands the seed table to every vehicle and injects the new apps.
    pub fn synthesize<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let buckets = std::array::from_fn(|t| {
            let timeframe = Timeframe::ALL[t];
            std::array::from_fn(|v| {
                let (source, scale) = seed_source(Vehicle::ALL[v]);
                seed_bucket(timeframe, source)
                    .iter()
                    .map(|entry| {
                        scaled(
                            normalize_app_name(entry.app),
                            entry.orders,
                            entry.avg_pay,
                            scale,
                            rng,
                        )
                    })
                    .collect()
            })
        });

        let mut table = Self { buckets };
        for (app, _) in NEW_APP_VEHICLES {
            table.inject_new_app(app, rng);
        }
        table
    }

    pub fn bucket(&self, timeframe: Timeframe, vehicle: Vehicle) -> &[AppStatRecord] {
        &self.buckets[timeframe.index()][vehicle.index()]
    }

    /// Adds `app` to every bucket its vehicles cover, priced just under the
    /// last entry with real figures. Returns false for apps without a vehicle
    /// mapping.
    pub fn inject_new_app<R: Rng + ?Sized>(&mut self, app: &str, rng: &mut R) -> bool {
        let app_name = normalize_app_name(app);
        let key = app_name.to_lowercase();
        let Some((_, vehicles)) = NEW_APP_VEHICLES.iter().find(|(name, _)| *name == key) else {
            warn!(app = %key, "no vehicle mapping found, skipping fallback generation");
            return false;
        };

        for timeframe in Timeframe::ALL {
            for vehicle in vehicles.iter().copied() {
                let bucket = &mut self.buckets[timeframe.index()][vehicle.index()];
                if bucket.iter().any(|record| record.app == app_name) {
                    debug!(app = %app_name, %timeframe, %vehicle, "already present");
                    continue;
                }

                let base = bucket
                    .iter()
                    .rev()
                    .find(|record| record.orders > 0 && record.avg_pay > 0.0)
                    .map(|record| (record.orders, record.avg_pay));

                let record = match base {
                    Some((orders, avg_pay)) => {
                        scaled(app_name.clone(), orders, avg_pay, NEW_APP_SCALE, rng)
                    }
                    None => AppStatRecord {
                        app: app_name.clone(),
                        orders: 0,
                        avg_pay: 0.0,
                    },
                };
                bucket.push(record);
            }
        }

        true
    }
}

static FALLBACK: Lazy<FallbackTable> =
    Lazy::new(|| FallbackTable::synthesize(&mut rand::thread_rng()));

/// Process-wide table, synthesized on first use.
pub fn fallback_table() -> &'static FallbackTable {
    &FALLBACK
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn table(seed: u64) -> FallbackTable {
        FallbackTable::synthesize(&mut StdRng::seed_from_u64(seed))
    }

    fn find<'a>(records: &'a [AppStatRecord], app: &str) -> &'a AppStatRecord {
        records
            .iter()
            .find(|record| record.app == app)
            .unwrap_or_else(|| panic!("{app} missing"))
    }

    fn within_jitter(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() <= expected * 0.02 + 0.01
    }

    #[test]
    fn last_digit_only_changes_from_ten_up() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(randomize_last_digit(9, &mut rng), 9);
        for _ in 0..50 {
            let value = randomize_last_digit(127, &mut rng);
            assert!((120..=129).contains(&value));
        }
    }

    #[test]
    fn avg_pay_jitter_is_bounded_and_rounded() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let value = randomize_avg_pay(105.5, &mut rng);
            assert!(within_jitter(value, 105.5));
            assert!((value * 100.0 - (value * 100.0).round()).abs() < 1e-6);
        }
    }

    #[test]
    fn every_bucket_is_populated() {
        let table = table(1);
        for timeframe in Timeframe::ALL {
            for vehicle in Vehicle::ALL {
                assert!(table.bucket(timeframe, vehicle).len() >= 5);
            }
        }
    }

    #[test]
    fn ebike_scales_bike_by_ten_percent() {
        for seed in 0..20 {
            let table = table(seed);
            for timeframe in Timeframe::ALL {
                let bike = seed_bucket(timeframe, SeedVehicle::Bike);
                let ebike = table.bucket(timeframe, Vehicle::Ebike);
                for entry in bike {
                    let expected = (f64::from(entry.orders) * 1.1).round();
                    let actual = f64::from(find(ebike, entry.app).orders);
                    assert!((actual - expected).abs() < 10.0, "{timeframe} {}", entry.app);
                    assert!(within_jitter(find(ebike, entry.app).avg_pay, entry.avg_pay * 1.1));
                }
            }
        }
    }

    #[test]
    fn motor_scales_car_down() {
        let table = table(3);
        let motor = table.bucket(Timeframe::Month, Vehicle::Motor);
        let just_eat = find(motor, "Just Eat");
        assert_eq!(just_eat.orders / 10, 58);
        assert!(within_jitter(just_eat.avg_pay, 2200.0 * 0.98));
    }

    #[test]
    fn new_apps_only_land_in_supported_buckets() {
        let table = table(5);
        for timeframe in Timeframe::ALL {
            assert!(table
                .bucket(timeframe, Vehicle::Foot)
                .iter()
                .all(|record| record.app != "Stuart"));
            let scooter = table.bucket(timeframe, Vehicle::Scooter);
            let uber = find(scooter, "Uber Eats");
            let stuart = find(scooter, "Stuart");
            let ratio = stuart.avg_pay / (uber.avg_pay * 0.97);
            assert!((0.97..=1.03).contains(&ratio), "{timeframe}: {ratio}");
        }
    }

    #[test]
    fn new_app_copies_last_positive_entry() {
        let table = table(9);
        let bike = table.bucket(Timeframe::Hour, Vehicle::Bike);
        let zapp = find(bike, "Zapp");
        let stuart = find(bike, "Stuart");
        assert_eq!(zapp.orders, 3);
        assert_eq!(stuart.orders, 3);
        assert!(stuart.avg_pay < zapp.avg_pay);
        assert!(within_jitter(stuart.avg_pay, zapp.avg_pay * 0.97));
    }

    #[test]
    fn apps_are_unique_per_bucket() {
        let mut table = table(13);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(table.inject_new_app("Glovo", &mut rng));
        for timeframe in Timeframe::ALL {
            for vehicle in Vehicle::ALL {
                let bucket = table.bucket(timeframe, vehicle);
                for (i, record) in bucket.iter().enumerate() {
                    assert!(bucket[i + 1..].iter().all(|other| other.app != record.app));
                }
            }
        }
    }

    #[test]
    fn unmapped_app_is_skipped() {
        let mut table = table(2);
        let before = table.bucket(Timeframe::Day, Vehicle::Bike).len();
        assert!(!table.inject_new_app("Beelivery", &mut StdRng::seed_from_u64(1)));
        assert_eq!(table.bucket(Timeframe::Day, Vehicle::Bike).len(), before);
    }

    #[test]
    fn shared_table_is_stable_between_calls() {
        let first = fallback_table().bucket(Timeframe::Week, Vehicle::Car).to_vec();
        let second = fallback_table().bucket(Timeframe::Week, Vehicle::Car).to_vec();
        assert_eq!(first, second);
    }
}
