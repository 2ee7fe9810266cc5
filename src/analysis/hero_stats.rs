use super::mean::IterativeMean;

/// Rating given to a matchup with no recorded data. Every real rating is a
/// sum of non-negative ratios under non-negative weights, so this always
/// sorts below them.
pub const NO_DATA_PENALTY: f64 = -1.0;

/// Weights of the three ratios in a matchup rating. Finite and `>= 0`, as
/// enforced when read from the environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingWeights {
    /// α, damage dealt over damage received
    pub damage: f64,
    /// β, kills over deaths
    pub kill_death: f64,
    /// γ, wins over games
    pub win: f64,
}

impl Default for RatingWeights {
    fn default() -> Self {
        RatingWeights {
            damage: 0.9,
            kill_death: 0.5,
            win: 0.7,
        }
    }
}

/// One hero's solo track record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelfStats {
    pub picked: u64,
    pub wins: u64,
    pub time_avg: IterativeMean,
}

impl SelfStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, duration_secs: f64, won: bool) {
        self.picked += 1;
        if won {
            self.wins += 1;
        }
        self.time_avg.update(duration_secs, self.picked);
    }

    pub fn is_empty(&self) -> bool {
        self.picked == 0
    }

    /// Percentage of won games, `None` when the hero was never picked.
    pub fn win_rate(&self) -> Option<f64> {
        if self.picked == 0 {
            None
        } else {
            Some(self.wins as f64 / self.picked as f64 * 100.0)
        }
    }

    pub fn restore(&mut self, picked: u64, wins: u64, time_avg: f64) {
        self.picked = picked;
        self.wins = wins;
        self.time_avg.set(time_avg);
    }
}

/// Per-opponent values a player registered in one match. Absent fields
/// leave the matching mean untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchupSignals {
    pub kills: Option<f64>,
    pub deaths: Option<f64>,
    pub damage_done: Option<f64>,
}

/// Record of hero A facing opponent B. Damage received is not stored here:
/// it is the damage-done mean of the mirrored (B, A) entry, see [`Matchup`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedStats {
    pub picked_vs: u64,
    pub win_vs: u64,
    pub killed_avg: IterativeMean,
    pub died_avg: IterativeMean,
    pub damage_done_avg: IterativeMean,
}

impl SharedStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, signals: &MatchupSignals, won: bool) {
        self.picked_vs += 1;
        if won {
            self.win_vs += 1;
        }

        let count = self.picked_vs;
        if let Some(kills) = signals.kills {
            self.killed_avg.update(kills, count);
        }
        if let Some(deaths) = signals.deaths {
            self.died_avg.update(deaths, count);
        }
        if let Some(damage) = signals.damage_done {
            self.damage_done_avg.update(damage, count);
        }
    }

    /// True when none of the owned fields has moved from zero.
    pub fn is_empty(&self) -> bool {
        self.picked_vs == 0
            && self.win_vs == 0
            && self.killed_avg.value() == 0.0
            && self.died_avg.value() == 0.0
            && self.damage_done_avg.value() == 0.0
    }

    pub fn restore(
        &mut self,
        picked_vs: u64,
        win_vs: u64,
        killed_avg: f64,
        died_avg: f64,
        damage_done_avg: f64,
    ) {
        self.picked_vs = picked_vs;
        self.win_vs = win_vs;
        self.killed_avg.set(killed_avg);
        self.died_avg.set(died_avg);
        self.damage_done_avg.set(damage_done_avg);
    }
}

/// Read view of an ordered pair joined with its mirrored damage.
#[derive(Debug, Clone, Copy)]
pub struct Matchup<'a> {
    pub stats: &'a SharedStats,
    pub damage_received: f64,
}

impl<'a> Matchup<'a> {
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty() && self.damage_received == 0.0
    }

    /// Weighted sum of the damage, kill/death and win ratios. A zero
    /// denominator falls back to the numerator alone.
    pub fn rate(&self, weights: &RatingWeights) -> f64 {
        if self.is_empty() {
            return NO_DATA_PENALTY;
        }

        let s = self.stats;
        let damage_done = s.damage_done_avg.value();
        let killed = s.killed_avg.value();
        let died = s.died_avg.value();

        let damage_ratio = if self.damage_received == 0.0 {
            damage_done
        } else {
            damage_done / self.damage_received
        };
        let kd_ratio = if died == 0.0 { killed } else { killed / died };
        let win_ratio = if s.picked_vs == 0 {
            s.win_vs as f64
        } else {
            s.win_vs as f64 / s.picked_vs as f64
        };

        (weights.damage * damage_ratio) + (weights.kill_death * kd_ratio) + (weights.win * win_ratio)
    }
}
