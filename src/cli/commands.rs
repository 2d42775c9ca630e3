// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `test`, and all their
// configurable flags. Option names (dataset, model, activation,
// layer type, beta) are taken as plain strings here and parsed
// by the application layer, which reports unsupported values
// with the matching error.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{test_use_case::TestConfig, train_use_case::TrainConfig};
use crate::domain::priors::PriorConfig;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a Bayesian CNN and keep its best checkpoint
    Train(TrainArgs),

    /// Evaluate the best checkpoint of a trained run with Monte Carlo sampling
    Test(TestArgs),
}

/// Working-directory guard shared by both commands
#[derive(Args, Debug, Clone)]
pub struct RootArgs {
    /// Name the current directory must have
    #[arg(long, default_value = "Project8")]
    pub root_dir: String,

    /// Run from any directory
    #[arg(long)]
    pub skip_root_check: bool,
}

/// Options that name a run directory; shared by `train` and `test`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// MNIST, CIFAR10 or CRC
    #[arg(long, default_value = "MNIST")]
    pub dataset: String,

    /// MCDROP3CONV3FC, VARINF3CONV3FC, MCDROPALEXNET or VARINFALEXNET
    #[arg(long, default_value = "MCDROP3CONV3FC")]
    pub model: String,

    /// Dropout probability of MC dropout models
    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,

    /// softplus, relu or tanh
    #[arg(long, default_value = "softplus")]
    pub activation_function: String,

    #[arg(long, default_value_t = 256)]
    pub batch_size: usize,

    /// Root of all run directories
    #[arg(long, default_value = "results")]
    pub results_dir: String,

    /// Directory holding cifar-10-batches-bin/ and CRC/
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Background data-loading threads (0 loads on the main thread)
    #[arg(long, default_value_t = 4)]
    pub num_workers: usize,
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub run: RunArgs,

    #[arg(long, default_value_t = 200)]
    pub epochs: usize,

    /// Initial Adam learning rate; reduced on validation-loss plateaus
    #[arg(long, default_value_t = 0.001)]
    pub lr: f64,

    /// Fraction of the training set held out for validation
    #[arg(long, default_value_t = 0.2)]
    pub val_split: f64,

    #[arg(long, default_value_t = 25)]
    pub seed: u64,

    /// Debug logging, including one line per minibatch
    #[arg(long)]
    pub verbose: bool,

    /// Don't print the per-epoch summary to stdout (log.txt still gets it)
    #[arg(long)]
    pub suppress_epoch_print: bool,

    /// JSON file with the class index and channel count of every dataset
    #[arg(long, default_value = "data/data_info.json")]
    pub data_info: String,

    /// bbb or lrt (variational models only)
    #[arg(long, default_value = "lrt")]
    pub layer_type: String,

    /// KL weight: blundell, soenderby, standard, none or a number
    #[arg(long, default_value = "0.1")]
    pub beta_type: String,

    /// Mean of the Gaussian weight prior
    #[arg(long, default_value_t = 0.0)]
    pub prior_mu: f64,

    /// Standard deviation of the Gaussian weight prior
    #[arg(long, default_value_t = 0.1)]
    pub prior_sigma: f64,

    #[command(flatten)]
    pub root: RootArgs,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            dataset:              a.run.dataset,
            model:                a.run.model,
            dropout:              a.run.dropout,
            activation_function:  a.run.activation_function,
            batch_size:           a.run.batch_size,
            epochs:               a.epochs,
            lr:                   a.lr,
            val_split:            a.val_split,
            seed:                 a.seed,
            suppress_epoch_print: a.suppress_epoch_print,
            data_info:            a.data_info,
            num_workers:          a.run.num_workers,
            layer_type:           a.layer_type,
            beta_type:            a.beta_type,
            priors: PriorConfig {
                prior_mu:    a.prior_mu,
                prior_sigma: a.prior_sigma,
                ..PriorConfig::default()
            },
            results_dir:          a.run.results_dir,
            data_dir:             a.run.data_dir,
            class_index:          Vec::new(),
            input_channels:       0,
        }
    }
}

/// All arguments for the `test` command
#[derive(Args, Debug)]
pub struct TestArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Monte Carlo forward passes per test batch
    #[arg(long, default_value_t = 10)]
    pub samples: usize,

    #[arg(long)]
    pub verbose: bool,

    #[command(flatten)]
    pub root: RootArgs,
}

impl From<TestArgs> for TestConfig {
    fn from(a: TestArgs) -> Self {
        TestConfig {
            dataset:             a.run.dataset,
            model:               a.run.model,
            dropout:             a.run.dropout,
            activation_function: a.run.activation_function,
            batch_size:          a.run.batch_size,
            results_dir:         a.run.results_dir,
            data_dir:            a.run.data_dir,
            num_workers:         a.run.num_workers,
            samples:             a.samples,
        }
    }
}
