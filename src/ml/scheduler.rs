// ============================================================
// Layer 5 — Reduce-on-Plateau Learning Rate Schedule
// ============================================================
// Watches a metric that should go down (validation loss) and
// multiplies the learning rate by `factor` once it has failed to
// improve for more than `patience` consecutive epochs.
//
// "Improve" is relative: metric < best · (1 - threshold).
// After a reduction the bad-epoch counter restarts, and the
// optional cooldown suppresses counting for a few epochs.

/// Settings of a [`ReduceLrOnPlateau`].
#[derive(Debug, Clone)]
pub struct PlateauConfig {
    pub patience:  usize,
    pub factor:    f64,
    pub threshold: f64,
    pub cooldown:  usize,
    pub min_lr:    f64,
    /// Reductions smaller than this are skipped
    pub eps:       f64,
}

impl Default for PlateauConfig {
    fn default() -> Self {
        Self {
            patience:  6,
            factor:    0.1,
            threshold: 1e-4,
            cooldown:  0,
            min_lr:    0.0,
            eps:       1e-8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReduceLrOnPlateau {
    config:            PlateauConfig,
    lr:                f64,
    best:              f64,
    num_bad_epochs:    usize,
    cooldown_counter:  usize,
}

impl ReduceLrOnPlateau {
    pub fn new(initial_lr: f64, config: PlateauConfig) -> Self {
        Self {
            config,
            lr:               initial_lr,
            best:             f64::INFINITY,
            num_bad_epochs:   0,
            cooldown_counter: 0,
        }
    }

    /// Current learning rate
    pub fn lr(&self) -> f64 {
        self.lr
    }

    /// Feed one epoch's metric and return the learning rate to use next.
    pub fn step(&mut self, metric: f64) -> f64 {
        if metric < self.best * (1.0 - self.config.threshold) {
            self.best           = metric;
            self.num_bad_epochs = 0;
        } else {
            self.num_bad_epochs += 1;
        }

        if self.cooldown_counter > 0 {
            self.cooldown_counter -= 1;
            self.num_bad_epochs    = 0;
        }

        if self.num_bad_epochs > self.config.patience {
            let new_lr = (self.lr * self.config.factor).max(self.config.min_lr);
            if self.lr - new_lr > self.config.eps {
                tracing::info!("Reducing learning rate: {:.3e} -> {:.3e}", self.lr, new_lr);
                self.lr = new_lr;
            }
            self.cooldown_counter = self.config.cooldown;
            self.num_bad_epochs   = 0;
        }

        self.lr
    }
}
