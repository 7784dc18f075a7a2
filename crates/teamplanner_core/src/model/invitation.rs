//! Group invitation model.

use super::group::{GroupId, MemberRole};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type InvitationId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub group_id: GroupId,
    /// Normalized invitee email.
    pub email: String,
    /// Role granted on acceptance.
    pub role: MemberRole,
    /// Opaque acceptance token, unique across invitations.
    pub token: String,
    pub is_accepted: bool,
    pub created_at: i64,
    pub accepted_at: Option<i64>,
}
