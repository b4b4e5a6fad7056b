//! Time-interval vocabulary for period-scoped metrics (Sharpe, Sortino,
//! Calmar): the window a ratio was computed over, and a target to scale it
//! to.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// A named time interval a period-scoped metric can be computed over or
/// scaled to.
pub trait TimeInterval: Clone + std::fmt::Debug + PartialEq {
    fn interval(&self) -> TimeDelta;
}

impl TimeInterval for TimeDelta {
    fn interval(&self) -> TimeDelta {
        *self
    }
}

macro_rules! fixed_interval {
    ($name:ident, $days:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
        pub struct $name;

        impl TimeInterval for $name {
            fn interval(&self) -> TimeDelta {
                TimeDelta::days($days)
            }
        }
    };
}

fixed_interval!(Daily, 1);
fixed_interval!(Weekly, 7);
fixed_interval!(Monthly, 30);
fixed_interval!(Annual252, 252);
fixed_interval!(Annual365, 365);
