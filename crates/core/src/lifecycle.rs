//! Ownership predicate and lifecycle transition rules.
//!
//! Every mutating operation and every chat access goes through the checks in
//! this module, so the permission rules live in one place. The functions are
//! pure: callers read the request, ask whether the transition is allowed, and
//! then write with a compare-and-set on the claimant they observed.
//!
//! ```text
//!            claim                 complete (claimant)
//!   Open ───────────▶ Claimed ─────────────────────▶ Closed (deleted)
//!    ▲  ◀───────────     │
//!    │     unclaim       │ delete (owner)
//!    │                   ▼
//!    └── delete (owner) ─▶ Closed (deleted)
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, HelpRequest};

/// The caller's relationship to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// Caller created the request.
    Owner,
    /// Caller is the current claimant.
    Claimant,
    /// No relationship.
    None,
}

impl Access {
    /// Owners and claimants may read and write the request's thread.
    #[must_use]
    pub const fn permits_chat(self) -> bool {
        matches!(self, Self::Owner | Self::Claimant)
    }
}

/// Resolve the caller's relationship to `request`.
///
/// Ownership wins when an owner has also claimed their own request.
#[must_use]
pub fn can_access(request: &HelpRequest, account: AccountId) -> Access {
    if request.owner_id == account {
        Access::Owner
    } else if request.claimed_by == Some(account) {
        Access::Claimant
    } else {
        Access::None
    }
}

/// The other party of the request's thread, from the caller's side.
///
/// For the owner this is the claimant (if any); for the claimant it is the
/// owner; anyone else has no counterpart.
#[must_use]
pub fn counterpart_of(request: &HelpRequest, caller: AccountId) -> Option<AccountId> {
    match can_access(request, caller) {
        Access::Owner => request.claimed_by,
        Access::Claimant => Some(request.owner_id),
        Access::None => None,
    }
}

/// How a claim on an already-claimed request is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimPolicy {
    /// Refuse to displace another claimant and refuse self-claims.
    #[default]
    Reject,
    /// Any authenticated caller, the owner included, becomes the claimant.
    Overwrite,
}

impl fmt::Display for ClaimPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => f.write_str("reject"),
            Self::Overwrite => f.write_str("overwrite"),
        }
    }
}

impl std::str::FromStr for ClaimPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(format!("invalid claim policy: {other} (expected reject or overwrite)")),
        }
    }
}

/// A refused transition.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    /// The caller lacks the relationship the transition requires.
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    /// The request is in a state that conflicts with the transition.
    #[error("conflict: {0}")]
    Conflict(&'static str),
}

/// What a permitted claim should write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimPlan {
    /// Caller already holds the claim; nothing to write.
    AlreadyClaimant,
    /// Set the claimant to the caller if it is still `expected`.
    Claim {
        /// Claimant observed at read time.
        expected: Option<AccountId>,
    },
}

/// Decide whether `caller` may claim `request` under `policy`.
///
/// # Errors
///
/// Under [`ClaimPolicy::Reject`], returns `Forbidden` for the owner and
/// `Conflict` when someone else already holds the claim.
pub fn plan_claim(
    request: &HelpRequest,
    caller: AccountId,
    policy: ClaimPolicy,
) -> Result<ClaimPlan, LifecycleError> {
    if request.claimed_by == Some(caller) {
        return Ok(ClaimPlan::AlreadyClaimant);
    }

    if policy == ClaimPolicy::Reject {
        if request.owner_id == caller {
            return Err(LifecycleError::Forbidden("cannot claim your own request"));
        }
        if request.claimed_by.is_some() {
            return Err(LifecycleError::Conflict("request already claimed"));
        }
    }

    Ok(ClaimPlan::Claim {
        expected: request.claimed_by,
    })
}

/// Only the current claimant may release or complete a request.
///
/// # Errors
///
/// Returns `Forbidden` unless `caller` is the claimant.
pub fn require_claimant(request: &HelpRequest, caller: AccountId) -> Result<(), LifecycleError> {
    if request.claimed_by == Some(caller) {
        Ok(())
    } else {
        Err(LifecycleError::Forbidden("not your commitment"))
    }
}

/// Only the owner may cancel a request.
///
/// # Errors
///
/// Returns `Forbidden` unless `caller` owns the request.
pub fn require_owner(request: &HelpRequest, caller: AccountId) -> Result<(), LifecycleError> {
    if request.owner_id == caller {
        Ok(())
    } else {
        Err(LifecycleError::Forbidden("not your request"))
    }
}

/// Only the owner or claimant may touch the thread.
///
/// # Errors
///
/// Returns `Forbidden` for everyone else.
pub fn require_chat_access(
    request: &HelpRequest,
    caller: AccountId,
) -> Result<Access, LifecycleError> {
    let access = can_access(request, caller);
    if access.permits_chat() {
        Ok(access)
    } else {
        Err(LifecycleError::Forbidden("access denied"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::types::{Location, RequestId};

    const OWNER: AccountId = AccountId::new(1);
    const HELPER: AccountId = AccountId::new(2);
    const OTHER: AccountId = AccountId::new(3);

    fn request(claimed_by: Option<AccountId>) -> HelpRequest {
        HelpRequest {
            id: RequestId::new(10),
            owner_id: OWNER,
            message: "Could use some help".to_owned(),
            location: Location::new(Decimal::ZERO, Decimal::ZERO).unwrap(),
            address: "2 Mill Lane".to_owned(),
            pickup_time: "1200".to_owned(),
            pickup_date: None,
            items: vec![],
            claimed_by,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_can_access() {
        let claimed = request(Some(HELPER));
        assert_eq!(can_access(&claimed, OWNER), Access::Owner);
        assert_eq!(can_access(&claimed, HELPER), Access::Claimant);
        assert_eq!(can_access(&claimed, OTHER), Access::None);

        let self_claimed = request(Some(OWNER));
        assert_eq!(can_access(&self_claimed, OWNER), Access::Owner);
    }

    #[test]
    fn test_counterpart_of() {
        let claimed = request(Some(HELPER));
        assert_eq!(counterpart_of(&claimed, OWNER), Some(HELPER));
        assert_eq!(counterpart_of(&claimed, HELPER), Some(OWNER));
        assert_eq!(counterpart_of(&claimed, OTHER), None);
        assert_eq!(counterpart_of(&request(None), OWNER), None);
    }

    #[test]
    fn test_plan_claim_open_request() {
        for policy in [ClaimPolicy::Reject, ClaimPolicy::Overwrite] {
            assert_eq!(
                plan_claim(&request(None), HELPER, policy).unwrap(),
                ClaimPlan::Claim { expected: None }
            );
        }
    }

    #[test]
    fn test_plan_claim_is_idempotent_for_claimant() {
        for policy in [ClaimPolicy::Reject, ClaimPolicy::Overwrite] {
            assert_eq!(
                plan_claim(&request(Some(HELPER)), HELPER, policy).unwrap(),
                ClaimPlan::AlreadyClaimant
            );
        }
    }

    #[test]
    fn test_plan_claim_reject_policy() {
        assert_eq!(
            plan_claim(&request(Some(HELPER)), OTHER, ClaimPolicy::Reject),
            Err(LifecycleError::Conflict("request already claimed"))
        );
        assert!(matches!(
            plan_claim(&request(None), OWNER, ClaimPolicy::Reject),
            Err(LifecycleError::Forbidden(_))
        ));
    }

    #[test]
    fn test_plan_claim_overwrite_policy() {
        assert_eq!(
            plan_claim(&request(Some(HELPER)), OTHER, ClaimPolicy::Overwrite).unwrap(),
            ClaimPlan::Claim {
                expected: Some(HELPER)
            }
        );
        assert_eq!(
            plan_claim(&request(None), OWNER, ClaimPolicy::Overwrite).unwrap(),
            ClaimPlan::Claim { expected: None }
        );
    }

    #[test]
    fn test_require_claimant() {
        assert!(require_claimant(&request(Some(HELPER)), HELPER).is_ok());
        assert!(require_claimant(&request(Some(HELPER)), OWNER).is_err());
        assert!(require_claimant(&request(None), HELPER).is_err());
    }

    #[test]
    fn test_require_owner() {
        assert!(require_owner(&request(Some(HELPER)), OWNER).is_ok());
        assert!(require_owner(&request(Some(HELPER)), HELPER).is_err());
    }

    #[test]
    fn test_require_chat_access() {
        let claimed = request(Some(HELPER));
        assert_eq!(require_chat_access(&claimed, OWNER), Ok(Access::Owner));
        assert_eq!(require_chat_access(&claimed, HELPER), Ok(Access::Claimant));
        assert!(require_chat_access(&claimed, OTHER).is_err());
    }

    #[test]
    fn test_claim_policy_parse() {
        assert_eq!("reject".parse::<ClaimPolicy>().unwrap(), ClaimPolicy::Reject);
        assert_eq!(" Overwrite ".parse::<ClaimPolicy>().unwrap(), ClaimPolicy::Overwrite);
        assert!("first-wins".parse::<ClaimPolicy>().is_err());
        assert_eq!(ClaimPolicy::default(), ClaimPolicy::Reject);
        assert_eq!(ClaimPolicy::Overwrite.to_string(), "overwrite");
    }
}
