// Runner - Executes CLI commands against the store and the invariant enforcer
// Principle: The core decides, the runner reports; a halt becomes a failing exit

use crate::cli::config::{ConfigError, NodeConfig};
use crate::cli::{CheckCmd, Cli, Commands, ParamsSubcommand, TallyCmd};
use crate::governance::{
    tally, ParamsValidationError, ProposalTier, TieredGovernanceParams, VoteTally,
};
use crate::invariants::{
    Enforcement, InvariantEnforcer, InvariantRegistry, InvariantViolation, LedgerSnapshot,
    SnapshotError,
};
use crate::storage::{
    describe, Database, DatabaseError, GovParamStore, ParamChangeError, ParamField, ParamKey,
    StoreError,
};
use std::path::Path;
use tracing::{info, warn};

/// Run the parsed command; the returned text goes to stdout
pub fn run(cli: &Cli) -> Result<String, RunnerError> {
    let config = NodeConfig::from_cli(cli)?;

    match cli.command {
        Commands::Params(ref cmd) => match cmd.subcommand {
            ParamsSubcommand::Defaults => params_defaults(),
            ParamsSubcommand::Validate { ref file } => params_validate(file),
            ParamsSubcommand::Init => params_init(&config),
            ParamsSubcommand::Apply { ref file } => params_apply(&config, file),
            ParamsSubcommand::Show { tier } => params_show(&config, tier),
        },
        Commands::Tally(ref cmd) => run_tally(&config, cmd),
        Commands::Check(ref cmd) => run_check(&config, cmd),
    }
}

/// Default parameter set, as JSON
pub fn params_defaults() -> Result<String, RunnerError> {
    Ok(serde_json::to_string_pretty(&TieredGovernanceParams::default())?)
}

/// Load a proposed parameter set from a JSON file
pub fn load_params(path: &Path) -> Result<TieredGovernanceParams, RunnerError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| RunnerError::Io(format!("{}: {}", path.display(), e)))?;
    Ok(serde_json::from_str(&content)?)
}

pub fn params_validate(path: &Path) -> Result<String, RunnerError> {
    let proposed = load_params(path)?;
    proposed.validate_all()?;
    info!("Parameter set {} is valid", path.display());
    Ok("valid".to_string())
}

fn open_store(config: &NodeConfig) -> Result<GovParamStore<Database>, RunnerError> {
    let path = config.params_db_path();
    std::fs::create_dir_all(&path)
        .map_err(|e| RunnerError::Io(format!("Failed to create data dir: {}", e)))?;
    info!("Parameter store: {}", path.display());
    Ok(GovParamStore::new(Database::open(&path)?))
}

pub fn params_init(config: &NodeConfig) -> Result<String, RunnerError> {
    let store = open_store(config)?;
    if store.init_genesis()? {
        Ok("initialized with defaults".to_string())
    } else {
        Ok("already initialized".to_string())
    }
}

pub fn params_apply(config: &NodeConfig, path: &Path) -> Result<String, RunnerError> {
    let proposed = load_params(path)?;
    let store = open_store(config)?;
    store.apply_param_change(proposed)?;
    Ok("applied".to_string())
}

/// One `Key = value` line per stored parameter
pub fn params_show(config: &NodeConfig, tier: Option<ProposalTier>) -> Result<String, RunnerError> {
    let store = open_store(config)?;
    let tiers: Vec<ProposalTier> = match tier {
        Some(t) => vec![t],
        None => ProposalTier::ALL.to_vec(),
    };

    let mut lines = Vec::new();
    for tier in tiers {
        for field in ParamField::ALL {
            let key = ParamKey::new(tier, field);
            let name = key.to_string();
            let value = describe(&name, &store.raw(key)?)?;
            lines.push(format!("{} = {}", name, value));
        }
    }
    Ok(lines.join("\n"))
}

pub fn run_tally(config: &NodeConfig, cmd: &TallyCmd) -> Result<String, RunnerError> {
    let params = if cmd.defaults {
        TieredGovernanceParams::default()
    } else {
        let store = open_store(config)?;
        if store.is_empty()? {
            warn!("Parameter store is empty, tallying with defaults");
            TieredGovernanceParams::default()
        } else {
            store.get_all()?
        }
    };

    let votes = VoteTally {
        yes: cmd.yes,
        no: cmd.no,
        abstain: cmd.abstain,
        no_with_veto: cmd.no_with_veto,
        total_bonded_power: cmd.bonded,
    };
    let result = tally(&params[cmd.tier].tallying, &votes);

    Ok(format!(
        "{:?} (tier {}, participation {})",
        result.outcome, cmd.tier, result.participation
    ))
}

pub fn run_check(config: &NodeConfig, cmd: &CheckCmd) -> Result<String, RunnerError> {
    let mut snapshot = LedgerSnapshot::from_file(&cmd.snapshot)?;
    if let Some(height) = cmd.height {
        snapshot.height = height;
    }

    let enforcer = InvariantEnforcer::new(config.invariant_level, InvariantRegistry::runtime());
    info!(
        height = snapshot.height,
        level = %enforcer.level(),
        invariants = enforcer.registry().len(),
        "Checking ledger snapshot"
    );

    match enforcer.enforce(&snapshot.context()) {
        Enforcement::Halt(violation) => Err(RunnerError::Halted(violation)),
        Enforcement::Continue { violations } if violations.is_empty() => {
            Ok(format!("height {}: all invariants hold", snapshot.height))
        }
        Enforcement::Continue { violations } => Ok(format!(
            "height {}: {} invariant(s) broken: {}",
            snapshot.height,
            violations.len(),
            violations
                .iter()
                .map(|v| v.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}

/// Runner errors
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid parameter set: {0}")]
    Invalid(#[from] ParamsValidationError),

    #[error(transparent)]
    ParamChange(#[from] ParamChangeError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("Node halted: {0}")]
    Halted(InvariantViolation),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governance::ValidationError;
    use crate::invariants::InvariantLevel;
    use crate::types::{tokens, AccountId, Coin, STAKE_DENOM};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    #[derive(Clone, Default)]
    struct ErrorEvents(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for ErrorEvents {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn config(dir: &TempDir, level: InvariantLevel) -> NodeConfig {
        NodeConfig {
            base_path: dir.path().to_path_buf(),
            invariant_level: level,
        }
    }

    fn write_json(dir: &TempDir, name: &str, value: &impl serde::Serialize) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
        path
    }

    fn snapshot_with_negative_balance() -> LedgerSnapshot {
        let mut snap = LedgerSnapshot::new(5);
        snap.fund(AccountId::from_bytes([1; 32]), Coin::new(STAKE_DENOM, tokens(3)))
            .bond(AccountId::from_bytes([2; 32]), tokens(10), 10);
        snap.accounts[0].coins.push(Coin::new("other", -4));
        snap
    }

    #[test]
    fn test_defaults_round_through_validate() {
        let dir = TempDir::new().unwrap();
        let json = params_defaults().unwrap();
        let path = dir.path().join("defaults.json");
        std::fs::write(&path, json).unwrap();

        assert_eq!(params_validate(&path).unwrap(), "valid");
    }

    #[test]
    fn test_validate_reports_violation() {
        let dir = TempDir::new().unwrap();
        let mut params = TieredGovernanceParams::default();
        params[ProposalTier::Critical].voting.max_concurrent_proposals = 0;
        let path = write_json(&dir, "bad.json", &params);

        match params_validate(&path) {
            Err(RunnerError::Invalid(e)) => {
                assert_eq!(e.tier, ProposalTier::Critical);
                assert_eq!(e.error, ValidationError::MaxNumTooLow { min: 1, found: 0 });
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_init_apply_show() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, InvariantLevel::LogOnly);

        assert_eq!(params_init(&config).unwrap(), "initialized with defaults");
        assert_eq!(params_init(&config).unwrap(), "already initialized");

        let mut params = TieredGovernanceParams::default();
        params[ProposalTier::Normal].voting.max_concurrent_proposals = 3;
        let path = write_json(&dir, "change.json", &params);
        assert_eq!(params_apply(&config, &path).unwrap(), "applied");

        let shown = params_show(&config, Some(ProposalTier::Normal)).unwrap();
        assert_eq!(shown.lines().count(), 8);
        assert!(shown.contains("NormalMaxNum = 3"));
        assert!(shown.contains("NormalVotingPeriod = 48h0m0s"));
        assert_eq!(params_show(&config, None).unwrap().lines().count(), 24);
    }

    #[test]
    fn test_tally_uses_defaults_when_store_empty() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, InvariantLevel::LogOnly);
        let cmd = TallyCmd {
            tier: ProposalTier::Normal,
            yes: 40,
            no: 0,
            abstain: 0,
            no_with_veto: 0,
            bonded: 100,
            defaults: false,
        };
        assert!(run_tally(&config, &cmd).unwrap().starts_with("FailedQuorum"));
    }

    #[test]
    fn test_check_fatal_halts() {
        let dir = TempDir::new().unwrap();
        let path = write_json(&dir, "snap.json", &snapshot_with_negative_balance());
        let cmd = CheckCmd {
            snapshot: path,
            height: Some(77),
        };

        match run_check(&config(&dir, InvariantLevel::Fatal), &cmd) {
            Err(RunnerError::Halted(v)) => {
                assert_eq!(v.name, "nonnegative-balance");
                assert_eq!(v.height, 77);
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let report = run_check(&config(&dir, InvariantLevel::LogOnly), &cmd).unwrap();
        assert_eq!(report, "height 77: 1 invariant(s) broken: nonnegative-balance");

        let report = run_check(&config(&dir, InvariantLevel::Ignore), &cmd).unwrap();
        assert_eq!(report, "height 77: all invariants hold");
    }

    #[test]
    fn test_halt_is_logged_once() {
        let dir = TempDir::new().unwrap();
        let path = write_json(&dir, "snap.json", &snapshot_with_negative_balance());
        let cmd = CheckCmd {
            snapshot: path,
            height: None,
        };
        let config = config(&dir, InvariantLevel::Fatal);

        let errors = ErrorEvents::default();
        let subscriber = tracing_subscriber::registry().with(errors.clone());
        let result = tracing::subscriber::with_default(subscriber, || run_check(&config, &cmd));

        let err = result.unwrap_err();
        assert!(err.to_string().contains("nonnegative-balance"));
        assert_eq!(errors.0.load(Ordering::SeqCst), 1);
    }
}
