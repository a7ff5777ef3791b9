// Candidate generator: the first feasible lineup.
//
// Locks are seated first, then the remaining mandatory seats are filled
// most-constrained first with the best available projection, then the
// required number of optional seats are filled the same way. A player is
// only placed when the cheapest legal completion of the lineup still fits
// the budget, so the generator fails only when no legal lineup exists.
// Synergy is ignored here; the search engine takes care of it.

use tracing::{debug, trace};

use crate::completion::cheapest_completion;
use crate::constraints::Constraints;
use crate::error::InputError;
use crate::pool::{PlayerIndex, PlayerPool};

/// Per-instance assignment produced by the generator.
pub type Assignment = Vec<Option<PlayerIndex>>;

/// Build the seed lineup.
///
/// Fails with [`InputError::NoFeasibleSeed`] when no assignment satisfies
/// the slot counts, the locks and the budget together.
pub fn generate(constraints: &Constraints, pool: &PlayerPool) -> Result<Assignment, InputError> {
    let mut gen = Generator::new(constraints, pool);
    if !gen.completable() {
        let slot = gen.blame();
        debug!("No legal lineup exists; blaming slot {}", slot);
        return Err(InputError::NoFeasibleSeed { slot });
    }

    for &(player, packed) in constraints.lock_placements() {
        let seat = gen
            .lock_seats(player, packed)
            .into_iter()
            .find(|&seat| gen.extendable(seat, player))
            .ok_or_else(|| gen.no_seed(&[packed]))?;
        gen.place(seat, player);
    }

    while let Some(seat) = gen.most_constrained_mandatory() {
        let player = gen
            .candidates(&[seat])
            .into_iter()
            .find(|&p| gen.extendable(seat, p))
            .ok_or_else(|| gen.no_seed(&[seat]))?;
        gen.place(seat, player);
    }

    while gen.filled < constraints.roster_size() {
        let open = gen.open_optional();
        let (player, seat) = gen
            .candidates(&open)
            .into_iter()
            .find_map(|p| {
                gen.optional_seats_for(&open, p)
                    .into_iter()
                    .find(|&seat| gen.extendable(seat, p))
                    .map(|seat| (p, seat))
            })
            .ok_or_else(|| gen.no_seed(&open))?;
        gen.place(seat, player);
    }

    debug!(
        "Seed generated: {} seats filled, cost {}",
        gen.filled, gen.spent
    );
    Ok(gen.slots)
}

struct Generator<'a> {
    constraints: &'a Constraints,
    pool: &'a PlayerPool,
    slots: Assignment,
    taken: Vec<bool>,
    spent: u64,
    filled: usize,
}

impl<'a> Generator<'a> {
    fn new(constraints: &'a Constraints, pool: &'a PlayerPool) -> Self {
        Generator {
            constraints,
            pool,
            slots: vec![None; constraints.instances().len()],
            taken: vec![false; pool.len()],
            spent: 0,
            filled: 0,
        }
    }

    fn place(&mut self, inst: usize, player: PlayerIndex) {
        trace!(
            "Seed places {} in {}",
            self.pool.get(player).id,
            self.label(inst)
        );
        self.slots[inst] = Some(player);
        self.taken[player] = true;
        self.spent += self.pool.get(player).cost_or_zero();
        self.filled += 1;
    }

    fn label(&self, inst: usize) -> &str {
        &self.constraints.rule(self.constraints.instances()[inst].rule).label
    }

    fn no_seed(&self, seats: &[usize]) -> InputError {
        let slot = match seats.first() {
            Some(&seat) => self.label(seat).to_string(),
            None => self.blame(),
        };
        InputError::NoFeasibleSeed { slot }
    }

    /// Slot to name when nothing fits: the first one with fewer free
    /// candidates than empty mandatory seats, else the most constrained.
    fn blame(&self) -> String {
        let instances = self.constraints.instances();
        let short = self.constraints.rules().iter().enumerate().find(|&(r, rule)| {
            let empty = instances
                .iter()
                .enumerate()
                .filter(|&(idx, inst)| {
                    inst.rule == r && !inst.optional && self.slots[idx].is_none()
                })
                .count();
            rule.eligible.iter().filter(|&&p| !self.taken[p]).count() < empty
        });
        match (short, self.most_constrained_mandatory()) {
            (Some((_, rule)), _) => rule.label.clone(),
            (None, Some(seat)) => self.label(seat).to_string(),
            (None, None) => self
                .constraints
                .rules()
                .first()
                .map(|rule| rule.label.clone())
                .unwrap_or_default(),
        }
    }

    fn available(&self, inst: usize) -> impl Iterator<Item = PlayerIndex> + '_ {
        let rule = self.constraints.instances()[inst].rule;
        self.constraints
            .rule(rule)
            .eligible
            .iter()
            .copied()
            .filter(move |&p| !self.taken[p])
    }

    fn eligible(&self, inst: usize, player: PlayerIndex) -> bool {
        let rule = self.constraints.instances()[inst].rule;
        self.constraints.rule(rule).eligible.binary_search(&player).is_ok()
    }

    /// Whether some legal lineup within budget extends the current one.
    fn completable(&self) -> bool {
        match cheapest_completion(self.constraints, self.pool, &self.slots) {
            Some(rest) => self.fits(self.spent + rest),
            None => false,
        }
    }

    /// Whether putting `player` into `seat` keeps a legal lineup reachable.
    fn extendable(&self, seat: usize, player: PlayerIndex) -> bool {
        let spent = self.spent + self.pool.get(player).cost_or_zero();
        if !self.fits(spent) {
            return false;
        }
        let mut trial = self.slots.clone();
        trial[seat] = Some(player);
        match cheapest_completion(self.constraints, self.pool, &trial) {
            Some(rest) => self.fits(spent + rest),
            None => false,
        }
    }

    fn fits(&self, total: u64) -> bool {
        self.constraints.budget().map_or(true, |budget| total <= budget)
    }

    /// Seats a lock may take: its packed seat if still empty, then the
    /// first empty seat of every other slot it is eligible for, mandatory
    /// seats before optional ones.
    fn lock_seats(&self, player: PlayerIndex, packed: usize) -> Vec<usize> {
        let instances = self.constraints.instances();
        let mut seats = Vec::new();
        if self.slots[packed].is_none() {
            seats.push(packed);
        }
        for r in 0..self.constraints.rules().len() {
            let first_empty = instances
                .iter()
                .enumerate()
                .find(|&(idx, inst)| inst.rule == r && self.slots[idx].is_none())
                .map(|(idx, _)| idx);
            if let Some(seat) = first_empty {
                if !seats.contains(&seat) && self.eligible(seat, player) {
                    seats.push(seat);
                }
            }
        }
        seats
    }

    /// Empty mandatory seat with the fewest remaining candidates.
    fn most_constrained_mandatory(&self) -> Option<usize> {
        self.constraints
            .instances()
            .iter()
            .enumerate()
            .filter(|&(idx, inst)| !inst.optional && self.slots[idx].is_none())
            .map(|(idx, _)| (self.available(idx).count(), idx))
            .min()
            .map(|(_, idx)| idx)
    }

    /// Empty optional seats, one per rule (seats of a rule are interchangeable).
    fn open_optional(&self) -> Vec<usize> {
        let mut seen_rules = Vec::new();
        let mut out = Vec::new();
        for (idx, inst) in self.constraints.instances().iter().enumerate() {
            if inst.optional && self.slots[idx].is_none() && !seen_rules.contains(&inst.rule) {
                seen_rules.push(inst.rule);
                out.push(idx);
            }
        }
        out
    }

    /// Seats among `seats` that `player` may fill, fewest remaining
    /// candidates first.
    fn optional_seats_for(&self, seats: &[usize], player: PlayerIndex) -> Vec<usize> {
        let mut fits: Vec<(usize, usize)> = seats
            .iter()
            .copied()
            .filter(|&inst| self.eligible(inst, player))
            .map(|inst| (self.available(inst).count(), inst))
            .collect();
        fits.sort_unstable();
        fits.into_iter().map(|(_, inst)| inst).collect()
    }

    /// Free candidates for any of `seats`, best projection first. Ties go
    /// to the lower identifier.
    fn candidates(&self, seats: &[usize]) -> Vec<PlayerIndex> {
        let mut candidates: Vec<PlayerIndex> =
            seats.iter().flat_map(|&s| self.available(s)).collect();
        candidates.sort_unstable();
        candidates.dedup();
        candidates.sort_by(|&a, &b| {
            self.pool
                .get(b)
                .projection
                .total_cmp(&self.pool.get(a).projection)
                .then(a.cmp(&b))
        });
        candidates
    }
}
