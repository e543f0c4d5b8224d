//! Engine configuration. Loading it from disk is up to the host; this only
//! defines the typed shape and its defaults.
use crate::errors::ReconcilerError;
use serde::Deserialize;

/// How stable children are chosen before emitting MOVEs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveStrategy {
    /// Longest increasing subsequence of old positions: fewest moves.
    #[default]
    Lis,
    /// Single pass keeping a running maximum of old positions.
    Greedy,
}

/// How a node whose kind or key changed is destroyed and recreated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplaceMode {
    /// One REPLACE patch at the old element's position.
    #[default]
    Replace,
    /// INSERT before the old element, REMOVE it with the stale records.
    InsertRemove,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    pub move_strategy: MoveStrategy,
    pub replace_mode: ReplaceMode,
    /// Mount point used by `flush` for contexts never reconciled explicitly.
    pub default_mount: String,
    /// Props that never enter a delta (raw callables on the producer side).
    pub ignored_props: Vec<String>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        ReconcilerConfig {
            move_strategy: MoveStrategy::default(),
            replace_mode: ReplaceMode::default(),
            default_mount: "root-container".to_string(),
            ignored_props: ["widget_instance", "itemBuilder", "onChanged", "onPressed", "onTap", "onDrag"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ReconcilerConfig {
    pub fn from_json_str(source: &str) -> Result<Self, ReconcilerError> {
        let config: ReconcilerConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconcilerError> {
        if self.default_mount.trim().is_empty() {
            return Err(ReconcilerError::Config { details: "default_mount must not be empty".into() });
        }
        Ok(())
    }

    pub(crate) fn is_ignored(&self, prop: &str) -> bool {
        self.ignored_props.iter().any(|p| p == prop)
    }
}
