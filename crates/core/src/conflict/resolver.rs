//! Conflict resolution strategies.
//!
//! The [`ConflictResolver`] turns a conflict list into a single merged tree
//! using one [`Strategy`]. The automatic strategies are synchronous and pure.
//! [`Strategy::Manual`] asks a [`Prompter`] once per conflict, in order, and
//! only writes anything after every conflict has an answer: a cancelled
//! manual run yields [`Resolution::Aborted`] and never a partial tree.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::detector::Conflict;
use super::merger::MergeAccumulator;
use crate::prompt::Prompter;
use crate::tree::{render_value, ConfigTree};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Policy used to pick a winning value per conflict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Always keep the local value.
    PreferLocal,
    /// Always take the remote value.
    PreferRemote,
    /// Take the side with the larger timestamp; ties keep local.
    PreferNewer,
    /// Ask for every conflict.
    Manual,
}

impl Strategy {
    /// Every strategy, in the order offered by the strategy prompt.
    pub const ALL: [Strategy; 4] = [
        Strategy::PreferLocal,
        Strategy::PreferRemote,
        Strategy::PreferNewer,
        Strategy::Manual,
    ];

    /// Human-readable label for prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PreferLocal => "Keep local values",
            Self::PreferRemote => "Take remote values",
            Self::PreferNewer => "Take the newer value for each conflict",
            Self::Manual => "Choose for each conflict",
        }
    }

    /// Decide a conflict without user input.
    ///
    /// Returns `None` only for [`Strategy::Manual`].
    pub fn decide(&self, conflict: &Conflict) -> Option<Side> {
        match self {
            Self::PreferLocal => Some(Side::Local),
            Self::PreferRemote => Some(Side::Remote),
            Self::PreferNewer => {
                let local = conflict.local_timestamp.unwrap_or(0);
                let remote = conflict.remote_timestamp.unwrap_or(0);
                if remote > local {
                    Some(Side::Remote)
                } else {
                    Some(Side::Local)
                }
            }
            Self::Manual => None,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreferLocal => write!(f, "prefer_local"),
            Self::PreferRemote => write!(f, "prefer_remote"),
            Self::PreferNewer => write!(f, "prefer_newer"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "prefer_local" | "local" => Ok(Self::PreferLocal),
            "prefer_remote" | "remote" => Ok(Self::PreferRemote),
            "prefer_newer" | "newer" => Ok(Self::PreferNewer),
            "manual" => Ok(Self::Manual),
            other => Err(format!(
                "unknown strategy '{other}': use prefer_local, prefer_remote, prefer_newer or manual"
            )),
        }
    }
}

/// Which side of a conflict wins.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Local,
    Remote,
}

impl Side {
    /// The chosen value of `conflict`.
    pub fn value_of<'a>(&self, conflict: &'a Conflict) -> Option<&'a Value> {
        match self {
            Self::Local => conflict.local_value.as_ref(),
            Self::Remote => conflict.remote_value.as_ref(),
        }
    }
}

/// Why a resolution produced no tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbortReason {
    /// The strategy prompt was dismissed.
    NoStrategySelected,
    /// A manual per-conflict prompt was dismissed.
    ManualCancelled {
        /// Zero-based index of the conflict being asked about.
        index: usize,
        /// Dotted path of that conflict.
        path: String,
    },
    /// Manual resolution was requested where no prompter is available.
    PromptRequired,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoStrategySelected => write!(f, "no resolution strategy was selected"),
            Self::ManualCancelled { index, path } => write!(
                f,
                "manual resolution cancelled at conflict #{} ('{}')",
                index + 1,
                path
            ),
            Self::PromptRequired => {
                write!(f, "manual resolution needs an interactive prompt")
            }
        }
    }
}

/// Outcome of a resolution call: a complete merged tree, or nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Every conflict was resolved.
    Resolved(ConfigTree),
    /// Resolution did not complete; no values were applied.
    Aborted(AbortReason),
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// The merged tree, if resolution completed.
    pub fn into_tree(self) -> Option<ConfigTree> {
        match self {
            Self::Resolved(tree) => Some(tree),
            Self::Aborted(_) => None,
        }
    }

    /// The abort reason, if resolution did not complete.
    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match self {
            Self::Resolved(_) => None,
            Self::Aborted(reason) => Some(reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Stateless conflict resolution operations.
///
/// Every call allocates its own [`MergeAccumulator`]; nothing is retained
/// between calls.
pub struct ConflictResolver;

impl ConflictResolver {
    /// Resolve `conflicts` into a fresh tree holding only the chosen values.
    ///
    /// [`Strategy::Manual`] cannot run here and yields
    /// [`AbortReason::PromptRequired`].
    pub fn resolve(conflicts: &[Conflict], strategy: Strategy) -> Resolution {
        Self::resolve_onto(&ConfigTree::new(), conflicts, strategy)
    }

    /// Resolve `conflicts` on top of a copy of `base`.
    ///
    /// A chosen side that lacks the key removes it from the result.
    pub fn resolve_onto(base: &ConfigTree, conflicts: &[Conflict], strategy: Strategy) -> Resolution {
        info!(count = conflicts.len(), %strategy, "resolving conflicts");

        let choices: Option<Vec<Side>> = conflicts.iter().map(|c| strategy.decide(c)).collect();
        match choices {
            Some(choices) => Resolution::Resolved(Self::apply(base, conflicts, &choices)),
            None => {
                warn!(%strategy, "strategy needs a prompt");
                Resolution::Aborted(AbortReason::PromptRequired)
            }
        }
    }

    /// Resolve with `strategy`, prompting through `prompter` when manual.
    pub async fn resolve_with(
        base: &ConfigTree,
        conflicts: &[Conflict],
        strategy: Strategy,
        prompter: &dyn Prompter,
    ) -> Resolution {
        if strategy != Strategy::Manual {
            return Self::resolve_onto(base, conflicts, strategy);
        }

        info!(count = conflicts.len(), "resolving conflicts manually");
        match Self::collect_manual_choices(conflicts, prompter).await {
            Ok(choices) => Resolution::Resolved(Self::apply(base, conflicts, &choices)),
            Err(reason) => {
                info!(%reason, "manual resolution aborted");
                Resolution::Aborted(reason)
            }
        }
    }

    /// Ask for a strategy first, then resolve with it.
    ///
    /// An empty conflict list resolves to `base` without prompting.
    pub async fn resolve_interactive(
        base: &ConfigTree,
        conflicts: &[Conflict],
        prompter: &dyn Prompter,
    ) -> Resolution {
        if conflicts.is_empty() {
            return Resolution::Resolved(base.clone());
        }

        match Self::choose_strategy(conflicts.len(), prompter).await {
            Some(strategy) => Self::resolve_with(base, conflicts, strategy, prompter).await,
            None => {
                info!("no strategy selected, aborting resolution");
                Resolution::Aborted(AbortReason::NoStrategySelected)
            }
        }
    }

    /// Prompt for one of [`Strategy::ALL`].
    pub async fn choose_strategy(conflict_count: usize, prompter: &dyn Prompter) -> Option<Strategy> {
        let title = format!("{conflict_count} conflict(s) found. How should they be resolved?");
        let options: Vec<String> = Strategy::ALL.iter().map(|s| s.label().to_string()).collect();
        let index = prompter.select(&title, &options).await?;
        let strategy = Strategy::ALL.get(index).copied();
        debug!(?strategy, "strategy selected");
        strategy
    }

    /// Ask once per conflict, strictly in order. Stops at the first
    /// dismissed prompt.
    async fn collect_manual_choices(
        conflicts: &[Conflict],
        prompter: &dyn Prompter,
    ) -> Result<Vec<Side>, AbortReason> {
        let total = conflicts.len();
        let mut choices = Vec::with_capacity(total);

        for (index, conflict) in conflicts.iter().enumerate() {
            let title = format!("Conflict {}/{} at '{}'", index + 1, total, conflict.dotted_path());
            let options = vec![
                format!("Keep local: {}", render_value(conflict.local_value.as_ref())),
                format!("Use remote: {}", render_value(conflict.remote_value.as_ref())),
            ];

            let side = match prompter.select(&title, &options).await {
                Some(0) => Side::Local,
                Some(1) => Side::Remote,
                _ => {
                    return Err(AbortReason::ManualCancelled {
                        index,
                        path: conflict.dotted_path(),
                    })
                }
            };
            debug!(path = %conflict.dotted_path(), ?side, "manual choice");
            choices.push(side);
        }

        Ok(choices)
    }

    fn apply(base: &ConfigTree, conflicts: &[Conflict], choices: &[Side]) -> ConfigTree {
        let mut acc = MergeAccumulator::from_base(base);
        for (conflict, side) in conflicts.iter().zip(choices) {
            acc.apply(&conflict.path, side.value_of(conflict));
        }
        debug!(applied = acc.applied(), "merge applied");
        acc.into_tree()
    }
}
