use std::{fmt::Display, ops::Deref};

use chrono::Duration;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl Percentage {
    pub fn new_opt(value: f64) -> Option<Percentage> {
        if value < 0. {
            None
        } else {
            Some(Percentage(value))
        }
    }

    pub fn is_full(&self) -> bool {
        self.0 >= 100.
    }
}

impl Deref for Percentage {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Progress of `total` against a daily goal, rounded and clamped to
/// [0, 100]. Time past the goal never reports more than 100%.
pub fn goal_progress(total: Duration, goal_hours: f64) -> Percentage {
    let goal_ms = goal_hours * 3_600_000.;
    // A nonpositive goal is treated as met.
    if goal_ms <= 0. {
        return Percentage(100.);
    }
    let ratio = total.num_milliseconds() as f64 / goal_ms * 100.;
    Percentage::new_opt(ratio.round().clamp(0., 100.))
        .expect("Percentage should always be at least 0")
}
