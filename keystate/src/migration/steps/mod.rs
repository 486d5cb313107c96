//! The schema step chain, one module per version transition.

use std::sync::Arc;

use crate::migration::step::MigrationStep;
use crate::session::TokenService;

mod v1_to_v2;
mod v2_to_v3;
mod v3_to_v4;

pub use v1_to_v2::V1ToV2Step;
pub use v2_to_v3::V2ToV3Step;
pub use v3_to_v4::V3ToV4Step;

/// The full chain from schema 1 to the latest schema, in order.
#[must_use]
pub fn default_steps(
    token_service: Option<Arc<dyn TokenService>>,
) -> Vec<Arc<dyn MigrationStep>> {
    vec![
        Arc::new(V1ToV2Step),
        Arc::new(V2ToV3Step::new(token_service)),
        Arc::new(V3ToV4Step),
    ]
}
