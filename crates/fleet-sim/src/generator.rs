//! `GuestArrivalGenerator`: synthetic guest traffic.
//!
//! # Determinism strategy
//!
//! Hours are generated strictly in order and each hour draws from its own
//! RNG stream, `SimRng::stream(seed, hour_index)`.  The events of hour `h`
//! therefore do not depend on how far ahead the scheduler was filled, and
//! eager and day-by-day filling produce the same timeline and the same
//! event ids.
//!
//! # Per arrival
//!
//! Each party draws, in this order: an offset within the hour, a party size
//! (`1 + Poisson(average - 1)`), a "needs help" flag, a table and a meal
//! length (±25 % around the configured mean).  It then yields
//!
//!   GuestArrived  at the arrival instant,
//!   FoodReady     at 40 % of the meal,
//!   GuestNeedsHelp somewhere in the first 80 % of the meal (flagged parties only),
//!   GuestLeft     at the end of the meal.
//!
//! Events at or past the end of the run are dropped after all draws are
//! made, so truncation never shifts later random values.

use chrono::Duration;
use fleet_core::time::{floor_to_hour, hour_of_day, secs_f64, weekday_index};
use fleet_core::{EventId, SimRng, TableId, Timestamp};

use crate::config::{ArrivalSampling, EventPatterns};
use crate::{EventKind, SimulatedEvent, SimulationConfig};

const MEAL_JITTER: f64 = 0.25;
const FOOD_READY_AT: f64 = 0.4;
const HELP_WINDOW: f64 = 0.8;

#[derive(Clone, Debug)]
pub struct GuestArrivalGenerator {
    patterns:    EventPatterns,
    sampling:    ArrivalSampling,
    table_count: u32,
    seed:        u64,
    start:       Timestamp,
    end:         Timestamp,

    /// Start of the next hour to generate.
    cursor:  Timestamp,
    next_id: EventId,
    /// Fractional arrivals carried by [`ArrivalSampling::Expected`].
    carry:   f64,
    emitted: u64,
}

impl GuestArrivalGenerator {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            patterns:    config.event_patterns.clone(),
            sampling:    config.arrival_sampling,
            table_count: config.table_count,
            seed:        config.random_seed,
            start:       config.simulated_start_time,
            end:         config.simulated_end_time,
            cursor:      floor_to_hour(config.simulated_start_time),
            next_id:     EventId(1),
            carry:       0.0,
            emitted:     0,
        }
    }

    /// Start of the first hour not yet generated.
    pub fn generated_until(&self) -> Timestamp {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.end
    }

    /// Events handed out so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Expected parties for the hour starting at `hour_start`.
    pub fn expected_arrivals(&self, hour_start: Timestamp) -> f64 {
        self.patterns.hourly_arrival_rates[hour_of_day(hour_start)]
            * self.patterns.day_of_week_multipliers[weekday_index(hour_start)]
    }

    /// Generate every hour starting before `until` and hand the events to
    /// `emit`.  Returns the number of events emitted.
    pub fn fill_until(&mut self, until: Timestamp, mut emit: impl FnMut(SimulatedEvent)) -> u64 {
        let before = self.emitted;
        while self.cursor < until && !self.is_exhausted() {
            self.generate_hour(&mut emit);
            self.cursor = self.cursor + Duration::hours(1);
        }
        self.emitted - before
    }

    /// Every event this generator will ever emit, counting those already
    /// handed out.  Runs the remaining hours on a copy.
    pub fn estimate_total_events(&self) -> u64 {
        let mut dry = self.clone();
        let end = dry.end;
        dry.fill_until(end, |_| {});
        dry.emitted
    }

    fn arrivals(&mut self, rng: &mut SimRng, expected: f64) -> u32 {
        match self.sampling {
            ArrivalSampling::Poisson => rng.poisson(expected),
            ArrivalSampling::Expected => {
                let total = expected + self.carry;
                let whole = total.floor();
                self.carry = total - whole;
                whole as u32
            }
        }
    }

    fn generate_hour(&mut self, emit: &mut impl FnMut(SimulatedEvent)) {
        let hour_start = self.cursor;
        let hour_index = (hour_start - floor_to_hour(self.start)).num_hours().max(0) as u64;
        let mut rng = SimRng::stream(self.seed, hour_index);

        let expected = self.expected_arrivals(hour_start);
        let count = self.arrivals(&mut rng, expected);

        let meal_secs = self.patterns.average_meal_duration_minutes * 60.0;
        let extra_guests = (self.patterns.average_party_size - 1.0).max(0.0);

        for _ in 0..count {
            let arrived_at = hour_start + secs_f64(rng.unit() * 3_600.0);
            let party_size = 1 + rng.poisson(extra_guests);
            let needs_help = rng.gen_bool(self.patterns.guest_needs_help_probability);
            let table = TableId(rng.gen_range(1..=self.table_count));
            let meal = rng.jitter(meal_secs, MEAL_JITTER);
            let help_after = rng.unit() * HELP_WINDOW * meal;

            // Parties arriving before an unaligned start are drawn but
            // not emitted.
            if arrived_at < self.start {
                continue;
            }

            let mut push = |this: &mut Self, at: Timestamp, kind: EventKind| {
                if at >= this.end {
                    return;
                }
                let id = this.next_id;
                this.next_id = id.next();
                this.emitted += 1;
                emit(SimulatedEvent { id, scheduled_at: at, kind });
            };

            push(self, arrived_at, EventKind::GuestArrived { table, party_size, needs_help });
            push(self, arrived_at + secs_f64(meal * FOOD_READY_AT), EventKind::FoodReady { table });
            if needs_help {
                push(self, arrived_at + secs_f64(help_after), EventKind::GuestNeedsHelp { table });
            }
            push(self, arrived_at + secs_f64(meal), EventKind::GuestLeft { table, party_size });
        }
    }
}
