//! Resource handles over [`DataSync`]. Each names its endpoints, cache keys
//! and the keys its writes make stale.

mod auth;
mod dishes;
mod restaurants;
mod socials;

pub use auth::Auth;
pub use dishes::{Dishes, DEFAULT_RECOMMENDATION_LIMIT};
pub use restaurants::Restaurants;
pub use socials::Socials;

use serde::de::IgnoredAny;

use crate::{
    data_sync::{DataSync, MutationRequest},
    error::ClientError,
    validation::Validation,
};

/// Validates, then sends a write whose response body is not needed.
async fn checked_write(
    sync: &DataSync,
    validation: Validation,
    mutation: MutationRequest,
) -> Result<(), ClientError> {
    validation?;
    sync.mutate::<IgnoredAny>(mutation).await?;
    Ok(())
}
