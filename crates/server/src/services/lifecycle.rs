//! Order lifecycle engine.
//!
//! Creates, lists, claims, releases, completes and cancels help requests.
//! Each transition reads the request, checks it against the rules in
//! [`neighbourly_core::lifecycle`], then writes with a compare-and-set on the
//! claimant it observed. A write that loses to a concurrent caller is
//! reported as `Conflict`, or `NotFound` if the request vanished meanwhile.

use tracing::{info, instrument};

use neighbourly_core::lifecycle::{plan_claim, require_claimant, require_owner};
use neighbourly_core::{
    AccountId, ClaimPlan, ClaimPolicy, Clock, Email, HelpRequest, NewHelpRequest, RequestId,
};

use super::ServiceError;
use crate::db::Store;

/// A request the caller has claimed, with its requester resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedRequest {
    pub request: HelpRequest,
    /// `None` if the owner account could not be found.
    pub requester_email: Option<Email>,
}

/// The combined browse view: what the caller is helping with and what is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseOverview {
    pub claimed: Vec<ClaimedRequest>,
    pub available: Vec<HelpRequest>,
}

/// Lifecycle operations over a [`Store`].
pub struct LifecycleService<'a, S> {
    store: &'a S,
    clock: &'a dyn Clock,
    policy: ClaimPolicy,
}

impl<'a, S: Store> LifecycleService<'a, S> {
    /// Create a lifecycle service.
    #[must_use]
    pub const fn new(store: &'a S, clock: &'a dyn Clock, policy: ClaimPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    /// Store a new open request owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the insert fails.
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn create(
        &self,
        owner: AccountId,
        request: &NewHelpRequest,
    ) -> Result<HelpRequest, ServiceError> {
        let created = self
            .store
            .insert_request(owner, request, self.clock.now())
            .await?;
        info!(request_id = %created.id, "Help request created");
        Ok(created)
    }

    /// Open, unexpired requests, by id.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_available(&self) -> Result<Vec<HelpRequest>, ServiceError> {
        Ok(self.store.list_open(self.clock.today()).await?)
    }

    /// Every request the caller owns, whatever its state.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_mine(&self, caller: AccountId) -> Result<Vec<HelpRequest>, ServiceError> {
        Ok(self.store.list_owned_by(caller).await?)
    }

    /// Whether the caller owns at least one request.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if the query fails.
    #[instrument(skip(self))]
    pub async fn has_own_request(&self, caller: AccountId) -> Result<bool, ServiceError> {
        Ok(self.store.first_owned_by(caller).await?.is_some())
    }

    /// Commit the caller to a request.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the request does not exist, `Forbidden` or
    /// `Conflict` when the claim policy refuses, and `Conflict` if another
    /// claim landed first.
    #[instrument(skip(self))]
    pub async fn claim(&self, caller: AccountId, id: RequestId) -> Result<(), ServiceError> {
        let request = self.load(id).await?;

        match plan_claim(&request, caller, self.policy)? {
            ClaimPlan::AlreadyClaimant => Ok(()),
            ClaimPlan::Claim { expected } => {
                if !self.store.set_claimant(id, expected, Some(caller)).await? {
                    return Err(self.lost_race(id).await);
                }
                info!(request_id = %id, helper = %caller, "Request claimed");
                Ok(())
            }
        }
    }

    /// Release the caller's claim, reopening the request.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the request does not exist and `Forbidden`
    /// unless the caller is the claimant.
    #[instrument(skip(self))]
    pub async fn unclaim(&self, caller: AccountId, id: RequestId) -> Result<(), ServiceError> {
        let request = self.load(id).await?;
        require_claimant(&request, caller)?;

        if !self.store.set_claimant(id, Some(caller), None).await? {
            return Err(self.lost_race(id).await);
        }
        info!(request_id = %id, helper = %caller, "Request released");
        Ok(())
    }

    /// Requests the caller has claimed, each with the requester's email.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    #[instrument(skip(self))]
    pub async fn list_my_claims(
        &self,
        caller: AccountId,
    ) -> Result<Vec<ClaimedRequest>, ServiceError> {
        let requests = self.store.list_claimed_by(caller).await?;

        let mut claimed = Vec::with_capacity(requests.len());
        for request in requests {
            let requester_email = self
                .store
                .get_account(request.owner_id)
                .await?
                .map(|account| account.email);
            claimed.push(ClaimedRequest {
                request,
                requester_email,
            });
        }
        Ok(claimed)
    }

    /// The caller's claims together with the open requests.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if a query fails.
    pub async fn overview(&self, caller: AccountId) -> Result<BrowseOverview, ServiceError> {
        Ok(BrowseOverview {
            claimed: self.list_my_claims(caller).await?,
            available: self.list_available().await?,
        })
    }

    /// Mark the caller's commitment done, deleting the request, its items
    /// and its thread.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the request does not exist and `Forbidden`
    /// unless the caller is the claimant.
    #[instrument(skip(self))]
    pub async fn complete(&self, caller: AccountId, id: RequestId) -> Result<(), ServiceError> {
        let request = self.load(id).await?;
        require_claimant(&request, caller)?;

        if !self.store.delete_claimed_by(id, caller).await? {
            return Err(self.lost_race(id).await);
        }
        info!(request_id = %id, helper = %caller, "Request completed");
        Ok(())
    }

    /// Cancel one of the caller's requests, claimed or not.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the request does not exist and `Forbidden`
    /// unless the caller owns it.
    #[instrument(skip(self))]
    pub async fn delete_own(&self, caller: AccountId, id: RequestId) -> Result<(), ServiceError> {
        let request = self.load(id).await?;
        require_owner(&request, caller)?;

        if !self.store.delete_request(id).await? {
            return Err(ServiceError::NotFound);
        }
        info!(request_id = %id, "Request deleted by owner");
        Ok(())
    }

    /// Cancel the caller's lowest-id request.
    ///
    /// Kept for clients that predate per-request deletion.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the caller owns no requests.
    #[instrument(skip(self))]
    pub async fn delete_first_own(&self, caller: AccountId) -> Result<RequestId, ServiceError> {
        let request = self
            .store
            .first_owned_by(caller)
            .await?
            .ok_or(ServiceError::NotFound)?;

        if !self.store.delete_request(request.id).await? {
            return Err(ServiceError::NotFound);
        }
        info!(request_id = %request.id, "Request deleted by owner");
        Ok(request.id)
    }

    async fn load(&self, id: RequestId) -> Result<HelpRequest, ServiceError> {
        self.store
            .get_request(id)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    /// Classify a compare-and-set that matched no row.
    async fn lost_race(&self, id: RequestId) -> ServiceError {
        match self.store.get_request(id).await {
            Ok(Some(_)) => ServiceError::Conflict("request was updated concurrently"),
            Ok(None) => ServiceError::NotFound,
            Err(e) => e.into(),
        }
    }
}
