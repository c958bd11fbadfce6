//! Demand specification and the lot expander.
//!
//! Demand is either a flat unit count or a list of lots.  The expander turns
//! it into an ordered sequence of unit slots `0..U-1`; the simulator
//! instantiates per-unit task instances lazily from those indices, so the
//! flow structure itself is never duplicated.

use takt_core::{Stamp, UnitIndex};

// ── Demand ───────────────────────────────────────────────────────────────────

/// One production lot.
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Lot {
    pub product_code: String,
    pub units: u32,
    /// Higher priority is expanded (and therefore tie-broken) first.
    #[serde(default)]
    pub priority: Option<i32>,
    /// Optional release pin: no unit of this lot starts before it.
    #[serde(default)]
    pub earliest_start: Option<Stamp>,
}

impl Lot {
    pub fn new(product_code: impl Into<String>, units: u32) -> Self {
        Self {
            product_code: product_code.into(),
            units,
            priority: None,
            earliest_start: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_earliest_start(mut self, at: Stamp) -> Self {
        self.earliest_start = Some(at);
        self
    }
}

/// What to produce in one run.
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum Demand {
    /// A flat unit count of the flow's product.
    Units(u32),
    /// Prioritised lots.
    Lots(Vec<Lot>),
}

impl Demand {
    pub fn total_units(&self) -> u32 {
        match self {
            Demand::Units(u) => *u,
            Demand::Lots(lots) => lots.iter().map(|l| l.units).sum(),
        }
    }
}

// ── UnitSlot ─────────────────────────────────────────────────────────────────

/// One demanded unit, ready for simulation.
///
/// `unit` doubles as the first-order tie-break: lower indices are scheduled
/// first when everything else is equal.  Units of the same lot are free to
/// run in parallel when resources permit — the expander imposes no
/// serialisation.
#[derive(Clone, PartialEq, Eq, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct UnitSlot {
    pub unit: UnitIndex,
    /// Index into the demand's lot list, if lots were given.
    pub lot: Option<u16>,
    pub earliest_start: Option<Stamp>,
}

/// Expand a demand into unit slots, ordered by lot priority (higher first)
/// then lot index.  A zero demand expands to no slots.
pub fn expand(demand: &Demand) -> Vec<UnitSlot> {
    match demand {
        Demand::Units(count) => (0..*count)
            .map(|u| UnitSlot { unit: UnitIndex(u), lot: None, earliest_start: None })
            .collect(),
        Demand::Lots(lots) => {
            let mut order: Vec<usize> = (0..lots.len()).collect();
            // Stable sort: equal priorities keep declaration order.
            order.sort_by_key(|&i| std::cmp::Reverse(lots[i].priority.unwrap_or(0)));

            let mut slots = Vec::with_capacity(demand.total_units() as usize);
            let mut unit = 0u32;
            for lot_idx in order {
                let lot = &lots[lot_idx];
                for _ in 0..lot.units {
                    slots.push(UnitSlot {
                        unit: UnitIndex(unit),
                        lot: Some(lot_idx as u16),
                        earliest_start: lot.earliest_start,
                    });
                    unit += 1;
                }
            }
            slots
        }
    }
}
