use crate::device::DeviceKeyValueStore;
use crate::migration::detector::{VersionDetector, FRESH_INSTALL_VERSION};
use crate::migration::error::{MigrationError, MigrationResult};
use crate::migration::step::{MigrationStep, StepOutcome};
use crate::migration::steps::default_steps;
use crate::migration::stores::StateStores;
use crate::primitives::config::current_environment;
use crate::session::TokenService;
use chrono::Utc;
use keystate_macros::keystate_export;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Global lock serializing migration runs across all controller instances.
///
/// Held for the whole of [`MigrationController::migrate_if_needed`]. A second caller waits
/// for the first run to finish and then finds the state already on the latest version.
static MIGRATION_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Summary of a migration run
#[derive(Debug, Default, Clone, PartialEq, Eq, uniffi::Record)]
pub struct MigrationRunSummary {
    /// Version detected before the run
    pub starting_version: i32,
    /// Version persisted when the run finished
    pub final_version: i32,
    /// Steps that transformed data
    pub steps_applied: i32,
    /// Steps that found nothing to transform and only advanced the version
    pub steps_empty: i32,
    /// Whether the device had no persisted state and was stamped with the latest version
    pub fresh_install: bool,
}

/// Controller that brings persisted state up to the latest schema version.
///
/// ## Storage Architecture
///
/// State is spread over three host stores ([`StoreKind`](crate::migration::StoreKind)):
/// - **Documents**: the `state` aggregate and large per-user documents
/// - **Preferences**: small settings and the `stateVersion` marker
/// - **Secure**: key material (Keychain / Keystore)
///
/// The marker is the single source of truth for progress. Steps persist it themselves,
/// right after their writes and before their cleanup, so a crash between steps resumes at
/// the next step and a crash inside a step re-runs only that step.
#[derive(uniffi::Object)]
pub struct MigrationController {
    stores: StateStores,
    steps: Vec<Arc<dyn MigrationStep>>,
}

#[keystate_export]
impl MigrationController {
    /// Creates a controller over the host stores with the full step chain.
    ///
    /// `token_service` backfills account identity from a legacy access token when the
    /// stored identity is incomplete. Without it such installs fail with
    /// `MissingRequiredKey`.
    #[uniffi::constructor]
    pub fn new(
        documents: Arc<dyn DeviceKeyValueStore>,
        preferences: Arc<dyn DeviceKeyValueStore>,
        secure: Arc<dyn DeviceKeyValueStore>,
        token_service: Option<Arc<dyn TokenService>>,
    ) -> Arc<Self> {
        Self::with_steps(
            StateStores::new(documents, preferences, secure),
            default_steps(token_service),
        )
    }

    /// Migrates the persisted state to the latest version, if it is not there already.
    ///
    /// Must complete before anything else reads the state.
    ///
    /// # Concurrency
    ///
    /// A global lock serializes runs across all `MigrationController` instances in the
    /// process. Callers arriving while a run is in progress wait for it and then return
    /// without running anything.
    ///
    /// # Errors
    ///
    /// - `MigrationError::InvalidOperation` if the step chain is malformed
    /// - `MigrationError::UnsupportedVersion` if the data is newer than this build
    /// - `MigrationError::MissingRequiredKey` if mandatory data is absent
    /// - `MigrationError::VersionNotAdvanced` if a step did not persist its version
    /// - any store, JSON or token service error raised by a step
    ///
    /// On error the version marker keeps the value of the last completed step.
    pub async fn migrate_if_needed(&self) -> Result<MigrationRunSummary, MigrationError> {
        let _guard = MIGRATION_LOCK.lock().await;
        self.migrate_if_needed_locked().await
    }

    /// Whether [`Self::migrate_if_needed`] has steps to run. Does not modify any store.
    ///
    /// # Errors
    ///
    /// Returns store or JSON errors raised while detecting the version.
    pub async fn needs_migration(&self) -> Result<bool, MigrationError> {
        let _guard = MIGRATION_LOCK.lock().await;
        let version = VersionDetector::new(&self.stores).detect().await?;
        Ok((1..self.latest_version()).contains(&version))
    }

    /// The version of the data currently on the device, `0` for a fresh install.
    ///
    /// # Errors
    ///
    /// Returns store or JSON errors raised while detecting the version.
    pub async fn state_version(&self) -> Result<i32, MigrationError> {
        let _guard = MIGRATION_LOCK.lock().await;
        VersionDetector::new(&self.stores).detect().await
    }

    /// The version the step chain migrates to
    #[must_use]
    pub fn latest_version(&self) -> i32 {
        self.steps
            .last()
            .map_or(FRESH_INSTALL_VERSION, |step| step.to_version())
    }
}

impl MigrationController {
    /// Create a controller with steps injected in
    pub fn with_steps(stores: StateStores, steps: Vec<Arc<dyn MigrationStep>>) -> Arc<Self> {
        Arc::new(Self { stores, steps })
    }

    /// Checks the chain is non-empty, starts at version 1 and advances one version per step.
    fn validate_chain(&self) -> MigrationResult<()> {
        let Some(first) = self.steps.first() else {
            return Err(MigrationError::InvalidOperation(
                "migration chain has no steps".to_string(),
            ));
        };

        if first.from_version() != 1 {
            return Err(MigrationError::InvalidOperation(format!(
                "migration chain must start at version 1, starts at {}",
                first.from_version()
            )));
        }

        for step in &self.steps {
            if step.to_version() != step.from_version() + 1 {
                return Err(MigrationError::InvalidOperation(format!(
                    "step {} migrates {} -> {}, expected a single version",
                    step.migration_id(),
                    step.from_version(),
                    step.to_version()
                )));
            }
        }

        for pair in self.steps.windows(2) {
            if pair[0].to_version() != pair[1].from_version() {
                return Err(MigrationError::InvalidOperation(format!(
                    "migration chain has a gap between {} and {}",
                    pair[0].migration_id(),
                    pair[1].migration_id()
                )));
            }
        }

        Ok(())
    }

    /// Body of `migrate_if_needed`; the caller holds `MIGRATION_LOCK`.
    async fn migrate_if_needed_locked(&self) -> MigrationResult<MigrationRunSummary> {
        self.validate_chain()?;

        let run_start_time = Utc::now();
        let latest = self.latest_version();
        let detected = VersionDetector::new(&self.stores).detect().await?;

        crate::info!(
            "migration_run.started detected_version={} latest_version={} environment={} timestamp={}",
            detected,
            latest,
            current_environment(),
            run_start_time.to_rfc3339()
        );

        let mut summary = MigrationRunSummary {
            starting_version: detected,
            final_version: detected,
            ..MigrationRunSummary::default()
        };

        if detected == FRESH_INSTALL_VERSION {
            self.stores.set_state_version(latest).await?;
            crate::info!(
                "migration_run.fresh_install version={} timestamp={}",
                latest,
                Utc::now().to_rfc3339()
            );
            summary.final_version = latest;
            summary.fresh_install = true;
            return Ok(summary);
        }

        if detected == latest {
            crate::info!(
                "migration_run.up_to_date version={} timestamp={}",
                latest,
                Utc::now().to_rfc3339()
            );
            return Ok(summary);
        }

        if !(1..latest).contains(&detected) {
            crate::error!(
                "migration_run.unsupported_version version={} latest_version={} timestamp={}",
                detected,
                latest,
                Utc::now().to_rfc3339()
            );
            return Err(MigrationError::UnsupportedVersion {
                version: detected,
                latest,
            });
        }

        for step in self
            .steps
            .iter()
            .filter(|step| step.from_version() >= detected)
        {
            match self.run_step(step.as_ref()).await? {
                StepOutcome::Applied => summary.steps_applied += 1,
                StepOutcome::NothingToMigrate => summary.steps_empty += 1,
            }
            summary.final_version = step.to_version();
        }

        let run_duration_ms = (Utc::now() - run_start_time).num_milliseconds();

        crate::info!(
            "migration_run.completed starting_version={} final_version={} applied={} empty={} duration_ms={} timestamp={}",
            summary.starting_version,
            summary.final_version,
            summary.steps_applied,
            summary.steps_empty,
            run_duration_ms,
            Utc::now().to_rfc3339()
        );

        Ok(summary)
    }

    /// Runs one step and checks it persisted its target version.
    async fn run_step(&self, step: &dyn MigrationStep) -> MigrationResult<StepOutcome> {
        let migration_id = step.migration_id();
        let execute_start = Utc::now();

        crate::info!(
            "migration.started id={} from_version={} to_version={} timestamp={}",
            migration_id,
            step.from_version(),
            step.to_version(),
            execute_start.to_rfc3339()
        );

        let outcome = match step.execute(&self.stores).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let duration_ms = (Utc::now() - execute_start).num_milliseconds();
                crate::error!(
                    "migration.failed id={} duration_ms={} error={:?} timestamp={}",
                    migration_id,
                    duration_ms,
                    e,
                    Utc::now().to_rfc3339()
                );
                return Err(e);
            }
        };

        let persisted = self.stores.state_version().await?;
        if persisted != Some(step.to_version()) {
            crate::error!(
                "migration.failed id={} reason=version_not_advanced expected={} found={:?} timestamp={}",
                migration_id,
                step.to_version(),
                persisted,
                Utc::now().to_rfc3339()
            );
            return Err(MigrationError::VersionNotAdvanced {
                expected: step.to_version(),
                found: persisted,
            });
        }

        let duration_ms = (Utc::now() - execute_start).num_milliseconds();
        crate::info!(
            "migration.succeeded id={} outcome={:?} duration_ms={} timestamp={}",
            migration_id,
            outcome,
            duration_ms,
            Utc::now().to_rfc3339()
        );

        Ok(outcome)
    }
}
