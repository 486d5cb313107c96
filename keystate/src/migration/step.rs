use async_trait::async_trait;

use crate::migration::error::MigrationResult;
use crate::migration::stores::StateStores;

/// What a step found to migrate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Data was transformed and relocated
    Applied,
    /// Nothing to transform; the version marker was still advanced
    NothingToMigrate,
}

/// A single `from_version → from_version + 1` transformation of the persisted state.
///
/// Every step follows the same shape:
/// 1. read what it needs, failing with `MissingRequiredKey` when a mandatory key is absent,
/// 2. transform and relocate,
/// 3. persist [`MigrationStep::to_version`] with [`StateStores::set_state_version`],
/// 4. remove every key the new schema supersedes.
///
/// Persisting the marker is part of the step. The controller checks it and fails the run
/// when a step returns without doing it.
#[async_trait]
pub trait MigrationStep: Send + Sync {
    /// Stable identifier used in logs, e.g. `state.v2_to_v3`
    fn migration_id(&self) -> String;

    /// Schema version this step migrates from
    fn from_version(&self) -> i32;

    /// Schema version this step migrates to
    fn to_version(&self) -> i32 {
        self.from_version() + 1
    }

    /// Runs the step against the stores
    async fn execute(&self, stores: &StateStores) -> MigrationResult<StepOutcome>;
}
