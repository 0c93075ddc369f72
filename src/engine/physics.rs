//! Physics - Per-tick movement, damage and tire model
//!
//! Top speed is scaled by a random handling swing and by accumulated damage.
//! Every swing costs damage and tire life, so cars degrade over a stage.

use rand::Rng;

use crate::engine::car::Car;
use crate::engine::stage::Stage;

/// Car physics logic
pub struct Physics;

impl Physics {
    /// Constants
    const KMH_PER_MPS: f64 = 3.6;
    const DAMAGE_PENALTY_EXPONENT: f64 = 1.5;
    const MIN_TIRE_GRIP: f64 = 0.4;
    const TIRE_GRIP_RANGE: f64 = 0.6;
    const HANDLING_CEILING: f64 = 12.0;
    const HANDLING_SWING: f64 = 0.12;
    const DAMAGE_HANDLING_CEILING: f64 = 15.0;
    const DAMAGE_SCALE: f64 = 0.08;
    const SPEED_DAMAGE_REFERENCE: f64 = 70.0;
    const TIRE_SPEED_REFERENCE: f64 = 100.0;
    const TIRE_WEAR_SCALE: f64 = 0.06;

    /// Advance a single car by one tick.
    ///
    /// Returns the distance covered this tick, or `None` if the car already
    /// finished `stage` and was left untouched. The distance can be negative
    /// after a bad moment; clamping cumulative progress is up to the caller.
    pub fn step<R: Rng + ?Sized>(car: &mut Car, stage: &Stage, rng: &mut R) -> Option<f64> {
        if car.has_finished(stage) {
            return None;
        }

        let speed_mps = car.speed / Self::KMH_PER_MPS;
        let damage_penalty = (1.0 - car.damage / Car::MAX_DAMAGE)
            .max(0.0)
            .powf(Self::DAMAGE_PENALTY_EXPONENT);
        let tire_grip =
            Self::MIN_TIRE_GRIP + (car.tire_wear / Car::FRESH_TIRES) * Self::TIRE_GRIP_RANGE;
        let effective_handling = car.handling * tire_grip;

        // Lower handling means wider swings in both directions
        let roll: f64 = rng.gen();
        let handling_factor =
            (roll - 0.5) * (Self::HANDLING_CEILING - effective_handling) * Self::HANDLING_SWING;

        let distance = (speed_mps + speed_mps * handling_factor) * damage_penalty;

        let base_damage =
            handling_factor.abs() * (Self::DAMAGE_HANDLING_CEILING - car.handling) * Self::DAMAGE_SCALE;
        let speed_damage_multiplier = 1.0 + speed_mps / Self::SPEED_DAMAGE_REFERENCE;
        let damage_taken = base_damage * speed_damage_multiplier;
        car.damage = (car.damage + damage_taken.max(0.0)).min(Car::MAX_DAMAGE);

        let base_tire_wear = (handling_factor.abs() * 2.0 + speed_mps / Self::TIRE_SPEED_REFERENCE)
            * Self::TIRE_WEAR_SCALE;
        car.tire_wear = (car.tire_wear - base_tire_wear).max(0.0);

        car.position += distance;

        Some(distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Generator whose every `gen::<f64>()` is exactly 0.5
    fn neutral_rng() -> StepRng {
        StepRng::new(1 << 63, 0)
    }

    fn endless_stage() -> Stage {
        Stage::new("Endless", 1000.0, u32::MAX)
    }

    #[test]
    fn neutral_roll_advances_by_top_speed() {
        let stage = endless_stage();
        let mut car = Car::new("Comet", 180.0, 7.0, "red");
        let mut rng = neutral_rng();

        let distance = Physics::step(&mut car, &stage, &mut rng);

        assert_eq!(distance, Some(50.0));
        assert_eq!(car.position, 50.0);
        assert_eq!(car.damage, 0.0);
        assert!((car.tire_wear - 99.97).abs() < 1e-9);
    }

    #[test]
    fn finished_car_is_skipped() {
        let stage = Stage::new("Loop", 1000.0, 3);
        let mut car = Car::new("Comet", 180.0, 7.0, "red");
        car.current_lap = 4;
        car.position = 120.0;
        let before = car.clone();

        assert_eq!(Physics::step(&mut car, &stage, &mut neutral_rng()), None);
        assert_eq!(car, before);
    }

    #[test]
    fn wrecked_car_does_not_move() {
        let stage = endless_stage();
        let mut car = Car::new("Comet", 180.0, 7.0, "red");
        car.damage = Car::MAX_DAMAGE;
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..50 {
            let distance = Physics::step(&mut car, &stage, &mut rng).unwrap_or(1.0);
            assert_eq!(distance, 0.0);
        }
        assert_eq!(car.position, 0.0);
    }

    #[test]
    fn bad_moment_can_move_backwards() {
        let stage = endless_stage();
        // Negative handling widens the swing past -100% of top speed
        let mut car = Car::new("Brick", 72.0, -10.0, "grey");
        let mut rng = StepRng::new(0, 0);

        let distance = Physics::step(&mut car, &stage, &mut rng).unwrap_or(0.0);

        assert!(distance < 0.0);
        assert!((distance - -6.4).abs() < 1e-9);
        assert_eq!(car.position, distance);
    }

    #[test]
    fn damage_and_wear_stay_bounded_and_monotonic() {
        let stage = endless_stage();
        let mut rng = StdRng::seed_from_u64(42);
        let mut cars = vec![
            Car::new("Rocket", 400.0, 0.0, "red"),
            Car::new("Steady", 150.0, 10.0, "blue"),
            Car::new("Middle", 220.0, 5.0, "green"),
        ];

        for _ in 0..5_000 {
            for car in &mut cars {
                let (damage, tire_wear) = (car.damage, car.tire_wear);
                Physics::step(car, &stage, &mut rng);

                assert!((0.0..=Car::MAX_DAMAGE).contains(&car.damage));
                assert!((0.0..=Car::FRESH_TIRES).contains(&car.tire_wear));
                assert!(car.damage >= damage);
                assert!(car.tire_wear <= tire_wear);
            }
        }

        // A zero-handling car at 400 km/h is wrecked long before 5000 ticks
        assert_eq!(cars[0].damage, Car::MAX_DAMAGE);
        assert_eq!(cars[0].tire_wear, 0.0);
    }
}
