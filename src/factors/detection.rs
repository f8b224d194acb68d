use crate::Cost;

/// A detection's decided state: not yet rounded, switched off, or on with a chosen state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectionPrimal {
    #[default]
    Undecided,
    Off,
    On(usize),
}

impl DetectionPrimal {
    pub fn is_on(self) -> bool {
        matches!(self, DetectionPrimal::On(_))
    }

    pub fn is_off(self) -> bool {
        matches!(self, DetectionPrimal::Off)
    }
}

/// A CT detection factor: one "off" cost and a small bank of "on" costs (distinct on-states
/// a detection can take, e.g. distinct bounding boxes for the same object hypothesis).
///
/// `conflict_count` tracks how many conflicts this detection has been linked into so far;
/// the ordinal a detection hands out at each new link (its value before incrementing) is
/// what the conflict-factor message weight divides by, not the conflict's own local slot
/// index. See [`crate::factors::ConflictFactor`] for why the two numbers are different.
#[derive(Debug, Clone)]
pub struct DetectionFactor {
    off_cost: Cost,
    on_costs: Vec<Cost>,
    primal: DetectionPrimal,
    conflict_count: usize,
}

impl DetectionFactor {
    pub fn new(num_on_states: usize) -> Self {
        assert!(num_on_states > 0, "a detection needs at least one on-state");
        Self {
            off_cost: 0.0,
            on_costs: vec![Cost::NAN; num_on_states],
            primal: DetectionPrimal::Undecided,
            conflict_count: 0,
        }
    }

    pub fn num_on_states(&self) -> usize {
        self.on_costs.len()
    }

    pub fn is_prepared(&self) -> bool {
        !self.off_cost.is_nan() && self.on_costs.iter().all(|c| !c.is_nan())
    }

    pub fn set_off_cost(&mut self, cost: Cost) {
        self.off_cost = cost;
    }

    pub fn set_on_cost(&mut self, state: usize, cost: Cost) {
        self.on_costs[state] = cost;
    }

    pub fn off_cost(&self) -> Cost {
        self.off_cost
    }

    pub fn on_cost(&self, state: usize) -> Cost {
        self.on_costs[state]
    }

    /// The minimum over all on-states, the quantity the conflict factor actually exchanges
    /// messages with (individual on-states never appear in the conflict kernel).
    pub fn min_detection(&self) -> Cost {
        self.on_costs.iter().cloned().fold(Cost::INFINITY, Cost::min)
    }

    /// Adds `msg` to every on-state, shifting `min_detection` by `msg` while preserving the
    /// argmin among on-states.
    pub fn repam_detection(&mut self, msg: Cost) {
        for c in &mut self.on_costs {
            *c += msg;
        }
    }

    pub fn repam_off(&mut self, msg: Cost) {
        self.off_cost += msg;
    }

    pub fn lower_bound(&self) -> Cost {
        self.off_cost.min(self.min_detection())
    }

    /// Registers this detection as a member of one more conflict and returns the ordinal
    /// (0-based) that membership is assigned. The conflict factor stores this ordinal on
    /// its edge and uses it, not the edge's slot within the conflict's own table, as the
    /// weight-formula denominator term.
    pub fn next_conflict_ordinal(&mut self) -> usize {
        let ordinal = self.conflict_count;
        self.conflict_count += 1;
        ordinal
    }

    pub fn conflict_count(&self) -> usize {
        self.conflict_count
    }

    pub fn primal(&self) -> DetectionPrimal {
        self.primal
    }

    pub fn reset_primal(&mut self) {
        self.primal = DetectionPrimal::Undecided;
    }

    pub fn set_off(&mut self) {
        self.primal = DetectionPrimal::Off;
    }

    pub fn set_on(&mut self, state: usize) {
        self.primal = DetectionPrimal::On(state);
    }

    /// Rounds to whichever of `off_cost` / argmin-on-state is cheaper, off wins ties.
    pub fn round_primal(&mut self) {
        let mut best_on_state = 0;
        let mut best_on_cost = Cost::INFINITY;
        for (state, &cost) in self.on_costs.iter().enumerate() {
            if cost < best_on_cost {
                best_on_cost = cost;
                best_on_state = state;
            }
        }
        self.primal = if self.off_cost <= best_on_cost {
            DetectionPrimal::Off
        } else {
            DetectionPrimal::On(best_on_state)
        };
    }

    pub fn evaluate_primal(&self) -> Cost {
        match self.primal {
            DetectionPrimal::Undecided => Cost::INFINITY,
            DetectionPrimal::Off => self.off_cost,
            DetectionPrimal::On(state) => self.on_costs[state],
        }
    }
}
