use serde::{Deserialize, Serialize};

use bazaar_core::UserId;

/// Public profile of a marketplace user.
///
/// Recorded from the authenticated identity; the catalog only needs it to
/// show who sells a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub username: String,
    pub display_name: String,
}
