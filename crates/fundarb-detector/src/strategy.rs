//! Directional strategy classification.
//!
//! The rule table is deliberately partial: a strategy is only assigned
//! when the venue with the larger absolute rate is also the one that
//! settles first, or when the smaller-rate venue settles last. Every other
//! combination yields no strategy, even above the differential gate.

use fundarb_core::Venue;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;

/// Marker rendered when a pair passes the gate but gets no strategy.
pub const NO_OPPORTUNITY: &str = "No arbitrage opportunity";

/// A venue and its percentage funding rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VenueRate {
    pub venue: Venue,
    pub rate: Decimal,
}

impl VenueRate {
    pub fn new(venue: Venue, rate: Decimal) -> Self {
        Self { venue, rate }
    }
}

/// One side of a two-venue strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Leg {
    pub venue: Venue,
    pub rate: Decimal,
    /// Whether this leg receives funding at its rate.
    pub collects: bool,
}

/// Long one venue, short the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub long: Leg,
    pub short: Leg,
}

impl Strategy {
    fn new(long: VenueRate, short: VenueRate) -> Self {
        // Negative funding pays longs, positive funding pays shorts.
        Self {
            long: Leg {
                venue: long.venue,
                rate: long.rate,
                collects: long.rate.is_sign_negative() && !long.rate.is_zero(),
            },
            short: Leg {
                venue: short.venue,
                rate: short.rate,
                collects: short.rate > Decimal::ZERO,
            },
        }
    }
}

fn describe(f: &mut fmt::Formatter<'_>, action: &str, leg: &Leg) -> fmt::Result {
    let verb = if leg.collects { "collect" } else { "pay" };
    write!(
        f,
        "{action} on {} to {verb} {:.4}% funding",
        leg.venue,
        leg.rate.abs()
    )
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        describe(f, "Long", &self.long)?;
        f.write_str(", ")?;
        describe(f, "short", &self.short)
    }
}

impl Serialize for Strategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Repr<'a> {
            long: &'a Leg,
            short: &'a Leg,
            description: String,
        }
        Repr {
            long: &self.long,
            short: &self.short,
            description: self.to_string(),
        }
        .serialize(serializer)
    }
}

/// Classify a pair. Pure function of the two rates and the two race
/// outcomes from venue `a`'s point of view.
pub fn classify(
    a: VenueRate,
    b: VenueRate,
    a_settles_first: bool,
    a_has_bigger_rate: bool,
) -> Option<Strategy> {
    let a_leads = a_has_bigger_rate && a_settles_first;
    let b_leads = !a_has_bigger_rate && !a_settles_first;
    let zero = Decimal::ZERO;

    if a.rate <= zero && b.rate <= zero {
        if a_leads {
            Some(Strategy::new(a, b))
        } else if b_leads {
            Some(Strategy::new(b, a))
        } else {
            None
        }
    } else if a.rate >= zero && b.rate >= zero {
        if a_leads {
            Some(Strategy::new(b, a))
        } else if b_leads {
            Some(Strategy::new(a, b))
        } else {
            None
        }
    } else if a_leads {
        Some(if a.rate > zero {
            Strategy::new(b, a)
        } else {
            Strategy::new(a, b)
        })
    } else if b_leads {
        Some(if b.rate > zero {
            Strategy::new(a, b)
        } else {
            Strategy::new(b, a)
        })
    } else {
        None
    }
}
