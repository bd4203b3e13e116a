//! Acceptability policy — what to do when a run hits a classified issue.
//!
//! The decision is a pure table lookup `(issue, mode) → policy action`; the
//! policy action then resolves to one of five control-flow outcomes. Callers
//! that want an audit trail append each decision to their own [`DecisionLog`].
//! Nothing here prompts.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    EnvironmentMinor,
    EnvironmentMajor,
    DataMissing,
    HashMismatch,
    LogicError,
    SecurityFlag,
}

impl IssueKind {
    pub const ALL: [IssueKind; 6] = [
        IssueKind::EnvironmentMinor,
        IssueKind::EnvironmentMajor,
        IssueKind::DataMissing,
        IssueKind::HashMismatch,
        IssueKind::LogicError,
        IssueKind::SecurityFlag,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::EnvironmentMinor => "environment_minor",
            IssueKind::EnvironmentMajor => "environment_major",
            IssueKind::DataMissing => "data_missing",
            IssueKind::HashMismatch => "hash_mismatch",
            IssueKind::LogicError => "logic_error",
            IssueKind::SecurityFlag => "security_flag",
        }
    }
}

impl FromStr for IssueKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IssueKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown issue kind '{s}'"))
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Abort on anything beyond minor environment drift.
    Strict,
    /// Log and carry on where the result stays meaningful.
    #[default]
    Audit,
    /// Never stop for data problems; log only.
    DryRun,
    /// Like audit, but fetch missing data and re-verify mismatched hashes.
    Auto,
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(ExecutionMode::Strict),
            "audit" => Ok(ExecutionMode::Audit),
            "dry-run" => Ok(ExecutionMode::DryRun),
            "auto" => Ok(ExecutionMode::Auto),
            other => Err(format!("unknown execution mode '{other}' (strict, audit, dry-run, auto)")),
        }
    }
}

/// The action a policy table prescribes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    LogAndContinue,
    LogDrift,
    LogOnly,
    LogAndSkip,
    LogAndSkipPhase,
    Skip,
    Fetch,
    FetchOrAbort,
    FetchFromDiscoveryTree,
    VerifySource,
    PromptRebuild,
    Abort,
}

/// Control-flow outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Continue,
    Skip,
    Abort,
    Retry,
    Fetch,
}

impl PolicyAction {
    pub fn resolve(self) -> Action {
        match self {
            PolicyAction::LogAndContinue | PolicyAction::LogDrift | PolicyAction::LogOnly => {
                Action::Continue
            }
            PolicyAction::LogAndSkip | PolicyAction::LogAndSkipPhase | PolicyAction::Skip => {
                Action::Skip
            }
            PolicyAction::Fetch
            | PolicyAction::FetchOrAbort
            | PolicyAction::FetchFromDiscoveryTree => Action::Fetch,
            PolicyAction::VerifySource => Action::Retry,
            // Non-interactive: a rebuild prompt degrades to skipping.
            PolicyAction::PromptRebuild => Action::Skip,
            PolicyAction::Abort => Action::Abort,
        }
    }
}

/// Policy table lookup.
pub fn decide(issue: IssueKind, mode: ExecutionMode) -> PolicyAction {
    use ExecutionMode::*;
    use IssueKind::*;
    use PolicyAction::*;

    match (mode, issue) {
        (Audit, EnvironmentMinor) => LogAndContinue,
        (Audit, EnvironmentMajor) => LogDrift,
        (Audit, DataMissing) => LogAndSkip,
        (Audit, HashMismatch) => LogAndContinue,

        (Strict, EnvironmentMinor) => LogAndContinue,

        (DryRun, EnvironmentMinor | EnvironmentMajor | HashMismatch) => LogOnly,
        (DryRun, DataMissing | LogicError) => LogAndSkip,

        (Auto, EnvironmentMinor) => LogAndContinue,
        (Auto, EnvironmentMajor) => LogDrift,
        (Auto, DataMissing) => FetchFromDiscoveryTree,
        (Auto, HashMismatch) => VerifySource,

        (_, SecurityFlag) | (_, LogicError) | (Strict, _) => Abort,
    }
}

/// Lookup by free-text issue name; unknown names abort.
pub fn decide_named(issue: &str, mode: ExecutionMode) -> PolicyAction {
    issue
        .parse::<IssueKind>()
        .map(|k| decide(k, mode))
        .unwrap_or(PolicyAction::Abort)
}

// ─── Decision log ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub timestamp: DateTime<Utc>,
    pub issue: IssueKind,
    pub mode: ExecutionMode,
    pub policy_action: PolicyAction,
    pub resolved: Action,
    pub details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionSummary {
    pub total: usize,
    pub by_issue: BTreeMap<IssueKind, usize>,
    pub by_action: BTreeMap<Action, usize>,
}

/// Append-only record of decisions, owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionLog {
    decisions: Vec<Decision>,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide, record, and return the resolved action.
    pub fn handle(&mut self, issue: IssueKind, mode: ExecutionMode, details: impl Into<String>) -> Action {
        let policy_action = decide(issue, mode);
        let resolved = policy_action.resolve();
        self.decisions.push(Decision {
            timestamp: Utc::now(),
            issue,
            mode,
            policy_action,
            resolved,
            details: details.into(),
        });
        resolved
    }

    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    pub fn summary(&self) -> DecisionSummary {
        let mut summary = DecisionSummary {
            total: self.decisions.len(),
            ..DecisionSummary::default()
        };
        for d in &self.decisions {
            *summary.by_issue.entry(d.issue).or_insert(0) += 1;
            *summary.by_action.entry(d.resolved).or_insert(0) += 1;
        }
        summary
    }
}
