//! `run-sim`: replay an action file against a scenario and summarize.
//!
//! The summary is a fixed set of `KEY field=value` lines on stdout so runs
//! can be diffed. Every failure is reported as one or more stderr lines and
//! nothing is printed to stdout.

use std::collections::BTreeMap;
use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use scanner_sim::{
    apply_action, create_initial_certification_progress, create_session, score_session,
    update_certification_progress, validate_scenario, CertificationProgress, ContractError,
    EngineConfig, EngineError, Event, EventContract, EventType, ProficiencyScore, Scenario,
    ScenarioError, ScenarioValidation, SessionIds, SessionState,
};

#[derive(Parser, Debug, Clone)]
#[command(name = "run-sim")]
#[command(about = "Replay trainee actions against a scenario and print a summary")]
pub struct RunSimArgs {
    /// Scenario JSON file
    #[arg(long)]
    pub scenario: PathBuf,

    /// Actions JSON file: `{"actions": [event, ...]}`
    #[arg(long)]
    pub actions: PathBuf,

    #[arg(long = "trainee", default_value = "t1")]
    pub trainee_id: String,

    #[arg(long = "session", default_value = "s1")]
    pub session_id: String,

    /// Certification progress JSON file, created if missing
    #[arg(long)]
    pub progress: Option<PathBuf>,

    /// Overrides SCANNER_SIM_ACCURACY_TARGET
    #[arg(long)]
    pub accuracy_target: Option<f64>,

    /// Overrides SCANNER_SIM_MAX_CRITICAL_VIOLATIONS
    #[arg(long)]
    pub max_critical_violations: Option<u32>,

    /// Overrides SCANNER_SIM_REQUIRED_CONSECUTIVE
    #[arg(long)]
    pub required_consecutive: Option<NonZeroU32>,
}

impl RunSimArgs {
    /// Apply command-line overrides on top of `base`.
    pub fn engine_config(&self, base: EngineConfig) -> Result<EngineConfig, RunSimError> {
        let config = EngineConfig {
            accuracy_target: self.accuracy_target.unwrap_or(base.accuracy_target),
            max_critical_sequence_violations: self
                .max_critical_violations
                .unwrap_or(base.max_critical_sequence_violations),
            required_consecutive: self.required_consecutive.unwrap_or(base.required_consecutive),
        };
        config
            .validate()
            .map_err(|e| RunSimError::Config(e.to_string()))?;
        Ok(config)
    }
}

#[derive(Debug, Error)]
pub enum RunSimError {
    #[error("Failed to read JSON file {}: {source}", .path.display())]
    ReadJson {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read JSON file {}: {source}", .path.display())]
    ParseJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{}", prefixed("Scenario validation", .0))]
    InvalidScenario(Vec<String>),

    #[error("{}", prefixed("Actions validation", .0))]
    InvalidActions(Vec<String>),

    #[error("Engine execution failed: {0}")]
    Engine(#[from] EngineError),

    #[error("Engine execution failed: {0}")]
    Contract(#[from] ContractError),

    #[error("Scenario could not be decoded: {0}")]
    Scenario(#[from] ScenarioError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to write progress file {}: {source}", .path.display())]
    WriteProgress {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Progress file {} is not valid certification progress: {source}", .path.display())]
    InvalidProgress {
        path: PathBuf,
        source: serde_json::Error,
    },
}

fn prefixed(prefix: &str, errors: &[String]) -> String {
    errors
        .iter()
        .map(|e| format!("{prefix}: {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replay and summarize. Returns the stdout lines on success.
pub fn run_sim(args: &RunSimArgs, config: &EngineConfig) -> Result<Vec<String>, RunSimError> {
    let contract = EventContract::shared()?;

    let scenario = Arc::new(load_scenario(&args.scenario)?);
    let actions = load_actions(contract, &args.actions)?;
    info!(
        scenario_id = %scenario.id,
        actions = actions.len(),
        "replaying actions"
    );

    let ids = SessionIds::new(args.trainee_id.clone(), args.session_id.clone());
    let mut session = create_session(scenario.clone(), ids);
    for action in &actions {
        session = apply_action(session, action)?;
    }

    let score = score_session(session.event_log(), &config.scoring());
    let mut lines = summary_lines(&scenario, &session, &score);

    if let Some(path) = &args.progress {
        let progress = record_progress(path, &score, config)?;
        lines.push(format!(
            "CERTIFICATION consecutivePassed={}/{} certified={}",
            progress.consecutive_passed, progress.required_consecutive, progress.is_certified
        ));
    }

    Ok(lines)
}

/// The summary block for a finished session.
pub fn summary_lines(
    scenario: &Scenario,
    session: &SessionState,
    score: &ProficiencyScore,
) -> Vec<String> {
    let mut rejected_by_error: BTreeMap<&'static str, u64> = BTreeMap::new();
    let mut accepted_by_type: BTreeMap<&'static str, u64> = BTreeMap::new();

    for event in session.event_log() {
        if event.is(EventType::StepRejected) {
            if let Some(code) = event.error_code() {
                *rejected_by_error.entry(code.as_str()).or_insert(0) += 1;
            }
        } else if let Some(accepted) = event.accepted_type() {
            *accepted_by_type.entry(accepted.as_str()).or_insert(0) += 1;
        }
    }

    let reasons = if score.reasons.is_empty() {
        "none".to_string()
    } else {
        score
            .reasons
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(",")
    };

    let metrics = session.metrics();
    vec![
        format!("SCENARIO {} mode={}", scenario.id, scenario.mode),
        format!(
            "FINAL mode={} buildCart={} pick={} cursor={}",
            session.mode(),
            session.build_cart().state.status(),
            session.pick().state.status(),
            session.cursor()
        ),
        format!(
            "METRICS totalActions={} accepted={} rejected={} lastError={}",
            metrics.total_actions,
            metrics.total_accepted,
            metrics.total_rejected,
            last_error_code(session.event_log().as_slice())
        ),
        format!(
            "SCORE pickAccuracy={:.3} criticalViolations={} passed={} reasons={}",
            score.pick_accuracy, score.critical_sequence_violations, score.passed, reasons
        ),
        count_line("REJECTED_BY_ERROR", &rejected_by_error),
        count_line("ACCEPTED_BY_TYPE", &accepted_by_type),
    ]
}

fn count_line(prefix: &str, counts: &BTreeMap<&'static str, u64>) -> String {
    let parts: Vec<String> = counts
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(key, count)| format!("{key}={count}"))
        .collect();

    if parts.is_empty() {
        format!("{prefix} none")
    } else {
        format!("{prefix} {}", parts.join(" "))
    }
}

fn last_error_code(events: &[Event]) -> &'static str {
    events
        .iter()
        .rev()
        .find_map(Event::error_code)
        .map_or("none", |code| code.as_str())
}

fn read_json(path: &Path) -> Result<Value, RunSimError> {
    let raw = fs::read_to_string(path).map_err(|source| RunSimError::ReadJson {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| RunSimError::ParseJson {
        path: path.to_path_buf(),
        source,
    })
}

fn load_scenario(path: &Path) -> Result<Scenario, RunSimError> {
    let value = read_json(path)?;
    match validate_scenario(&value) {
        Ok(()) => {}
        Err(ScenarioValidation::Invalid(errors)) => {
            return Err(RunSimError::InvalidScenario(errors));
        }
        Err(ScenarioValidation::Contract(e)) => return Err(RunSimError::Contract(e)),
    }
    Ok(Scenario::from_value(value)?)
}

fn load_actions(contract: &EventContract, path: &Path) -> Result<Vec<Event>, RunSimError> {
    let value = read_json(path)?;
    let Some(raw_actions) = value.get("actions").and_then(Value::as_array) else {
        return Err(RunSimError::InvalidActions(vec![
            "Actions JSON must be an object with an actions array".to_string(),
        ]));
    };

    let errors: Vec<String> = raw_actions
        .iter()
        .enumerate()
        .filter_map(|(index, action)| {
            contract
                .validate_value(action)
                .err()
                .map(|e| format!("actions[{index}] {}", e.issues.join(" | ")))
        })
        .collect();
    if !errors.is_empty() {
        return Err(RunSimError::InvalidActions(errors));
    }

    raw_actions
        .iter()
        .enumerate()
        .map(|(index, action)| {
            serde_json::from_value(action.clone())
                .map_err(|e| RunSimError::InvalidActions(vec![format!("actions[{index}] {e}")]))
        })
        .collect()
}

fn record_progress(
    path: &Path,
    score: &ProficiencyScore,
    config: &EngineConfig,
) -> Result<CertificationProgress, RunSimError> {
    let gate = config.certification();
    let previous = if path.exists() {
        let value = read_json(path)?;
        serde_json::from_value(value).map_err(|source| RunSimError::InvalidProgress {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        debug!(path = %path.display(), "starting new certification progress");
        create_initial_certification_progress(&gate)
    };

    let progress = update_certification_progress(&previous, score, &gate);
    let body =
        serde_json::to_string_pretty(&progress).map_err(|source| RunSimError::InvalidProgress {
            path: path.to_path_buf(),
            source,
        })?;
    fs::write(path, body + "\n").map_err(|source| RunSimError::WriteProgress {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        consecutive_passed = progress.consecutive_passed,
        certified = progress.is_certified,
        "certification progress updated"
    );
    Ok(progress)
}
