//! Help request route handlers.
//!
//! Every request view uses one schema:
//! `{id, message, account_id, lat, lng, address, collectionTime,
//! collectionDate, items, fulfilled}`, where `fulfilled` is the claimant's
//! account id or `null`. Claim-oriented views add `requester_email`.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection, rejection::PathRejection},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use neighbourly_core::{
    AccountId, HelpRequest, Location, NewHelpRequest, RequestId, RequestItem, parse_pickup_date,
};

use super::{OrderIdBody, json_body, path_id};
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::middleware::RequireAccount;
use crate::services::{BrowseOverview, ClaimedRequest};
use crate::state::AppState;

/// A request as the frontend sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestView {
    pub id: RequestId,
    pub message: String,
    pub account_id: AccountId,
    pub lat: Decimal,
    pub lng: Decimal,
    pub address: String,
    #[serde(rename = "collectionTime")]
    pub collection_time: String,
    #[serde(rename = "collectionDate")]
    pub collection_date: Option<NaiveDate>,
    pub items: Vec<RequestItem>,
    pub fulfilled: Option<AccountId>,
}

impl From<HelpRequest> for RequestView {
    fn from(request: HelpRequest) -> Self {
        Self {
            id: request.id,
            message: request.message,
            account_id: request.owner_id,
            lat: request.location.lat,
            lng: request.location.lng,
            address: request.address,
            collection_time: request.pickup_time,
            collection_date: request.pickup_date,
            items: request.items,
            fulfilled: request.claimed_by,
        }
    }
}

/// A claimed request with its requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimedRequestView {
    #[serde(flatten)]
    pub request: RequestView,
    pub requester_email: Option<String>,
}

impl From<ClaimedRequest> for ClaimedRequestView {
    fn from(claimed: ClaimedRequest) -> Self {
        Self {
            request: claimed.request.into(),
            requester_email: claimed.requester_email.map(String::from),
        }
    }
}

/// Response for `GET /requests`.
#[derive(Debug, Serialize)]
pub struct OverviewView {
    pub claimed: Vec<ClaimedRequestView>,
    pub available: Vec<RequestView>,
}

impl From<BrowseOverview> for OverviewView {
    fn from(overview: BrowseOverview) -> Self {
        Self {
            claimed: overview.claimed.into_iter().map(Into::into).collect(),
            available: overview.available.into_iter().map(Into::into).collect(),
        }
    }
}

/// Body of `POST /create-request`.
#[derive(Debug, Deserialize)]
pub struct CreateRequestBody {
    pub message: Option<String>,
    pub lat: Option<Decimal>,
    pub lng: Option<Decimal>,
    pub address: Option<String>,
    #[serde(rename = "collectionTime")]
    pub collection_time: Option<String>,
    #[serde(rename = "collectionDate")]
    pub collection_date: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemBody>,
}

/// One submitted item line.
#[derive(Debug, Deserialize)]
pub struct ItemBody {
    pub name: String,
    pub quantity: i32,
}

impl CreateRequestBody {
    /// Validate into a storable request.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for missing fields, out-of-range
    /// coordinates or an unparsable pickup date.
    pub fn into_new_request(self) -> Result<NewHelpRequest> {
        let lat = self
            .lat
            .ok_or_else(|| AppError::BadRequest("lat is required".to_string()))?;
        let lng = self
            .lng
            .ok_or_else(|| AppError::BadRequest("lng is required".to_string()))?;
        let location = Location::new(lat, lng).map_err(|e| AppError::BadRequest(e.to_string()))?;
        let pickup_date = parse_pickup_date(self.collection_date.as_deref())
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let items = self
            .items
            .into_iter()
            .map(|item| RequestItem {
                name: item.name,
                quantity: item.quantity,
            })
            .collect();

        NewHelpRequest::new(
            self.message.unwrap_or_default(),
            location,
            self.address.unwrap_or_default(),
            self.collection_time.unwrap_or_default(),
            pickup_date,
            items,
        )
        .map_err(|e| AppError::BadRequest(e.to_string()))
    }
}

fn views(requests: Vec<HelpRequest>) -> Vec<RequestView> {
    requests.into_iter().map(RequestView::from).collect()
}

/// Open requests available to claim.
///
/// # Route
///
/// `GET /available-requests`
pub async fn available<S: Store>(
    State(state): State<AppState<S>>,
    RequireAccount(_caller): RequireAccount,
) -> Result<Json<Vec<RequestView>>> {
    let requests = state.lifecycle().list_available().await?;
    Ok(Json(views(requests)))
}

/// The caller's claims together with the open requests.
///
/// # Route
///
/// `GET /requests`
pub async fn overview<S: Store>(
    State(state): State<AppState<S>>,
    RequireAccount(caller): RequireAccount,
) -> Result<Json<OverviewView>> {
    let overview = state.lifecycle().overview(caller.account.id).await?;
    Ok(Json(overview.into()))
}

/// The caller's own requests.
///
/// # Route
///
/// `GET /deliver-personal-order`
pub async fn mine<S: Store>(
    State(state): State<AppState<S>>,
    RequireAccount(caller): RequireAccount,
) -> Result<Json<Vec<RequestView>>> {
    let requests = state.lifecycle().list_mine(caller.account.id).await?;
    Ok(Json(views(requests)))
}

/// Whether the caller has any request.
///
/// # Route
///
/// `GET /check-order`
pub async fn check_order<S: Store>(
    State(state): State<AppState<S>>,
    RequireAccount(caller): RequireAccount,
) -> Result<Json<Value>> {
    let exists = state.lifecycle().has_own_request(caller.account.id).await?;
    Ok(Json(json!({ "exists": exists })))
}

/// Create a request.
///
/// # Route
///
/// `POST /create-request`
pub async fn create<S: Store>(
    State(state): State<AppState<S>>,
    RequireAccount(caller): RequireAccount,
    payload: std::result::Result<Json<CreateRequestBody>, JsonRejection>,
) -> Result<Json<Value>> {
    let new = json_body(payload)?.into_new_request()?;
    let created = state.lifecycle().create(caller.account.id, &new).await?;
    Ok(Json(json!({ "success": true, "id": created.id })))
}

/// Claim a request.
///
/// # Route
///
/// `POST /fulfil-request`
pub async fn claim<S: Store>(
    State(state): State<AppState<S>>,
    RequireAccount(caller): RequireAccount,
    payload: std::result::Result<Json<OrderIdBody>, JsonRejection>,
) -> Result<Json<Value>> {
    let id = json_body(payload)?.order_id()?;
    state.lifecycle().claim(caller.account.id, id).await?;
    Ok(Json(json!({ "success": true, "order_id": id })))
}

/// Requests the caller is helping with.
///
/// # Route
///
/// `GET /my-commitments`
pub async fn commitments<S: Store>(
    State(state): State<AppState<S>>,
    RequireAccount(caller): RequireAccount,
) -> Result<Json<Vec<ClaimedRequestView>>> {
    let claims = state.lifecycle().list_my_claims(caller.account.id).await?;
    Ok(Json(claims.into_iter().map(Into::into).collect()))
}

/// Release a claim.
///
/// # Route
///
/// `POST /unfulfil-request`
pub async fn unclaim<S: Store>(
    State(state): State<AppState<S>>,
    RequireAccount(caller): RequireAccount,
    payload: std::result::Result<Json<OrderIdBody>, JsonRejection>,
) -> Result<Json<Value>> {
    let id = json_body(payload)?.order_id()?;
    state.lifecycle().unclaim(caller.account.id, id).await?;
    Ok(Json(json!({ "success": true })))
}

/// Complete a commitment, deleting the request and its thread.
///
/// # Route
///
/// `POST /complete-commitment`
pub async fn complete<S: Store>(
    State(state): State<AppState<S>>,
    RequireAccount(caller): RequireAccount,
    payload: std::result::Result<Json<OrderIdBody>, JsonRejection>,
) -> Result<Json<Value>> {
    let id = json_body(payload)?.order_id()?;
    state.lifecycle().complete(caller.account.id, id).await?;
    Ok(Json(json!({ "success": true })))
}

/// Delete the caller's lowest-id request.
///
/// # Route
///
/// `GET /completed-request`
pub async fn delete_first<S: Store>(
    State(state): State<AppState<S>>,
    RequireAccount(caller): RequireAccount,
) -> Result<Json<Value>> {
    let id = state.lifecycle().delete_first_own(caller.account.id).await?;
    Ok(Json(json!({ "success": true, "id": id })))
}

/// Delete one of the caller's requests.
///
/// # Route
///
/// `DELETE /requests/{id}`
pub async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    RequireAccount(caller): RequireAccount,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>> {
    let id = path_id(id)?;
    state.lifecycle().delete_own(caller.account.id, id).await?;
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn body(json: Value) -> CreateRequestBody {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_create_body_accepts_strings_and_numbers() {
        let new = body(json!({
            "message": "Need nappies",
            "lat": "51.4545",
            "lng": -2.5879,
            "address": "5 Park Street",
            "collectionTime": "1730",
            "collectionDate": "2026-05-02",
            "items": [{"name": "Nappies", "quantity": 3}, {"name": "Wipes", "quantity": 1}]
        }))
        .into_new_request()
        .unwrap();

        assert_eq!(new.location.lat, Decimal::new(514_545, 4));
        assert_eq!(new.location.lng, Decimal::new(-25_879, 4));
        assert_eq!(new.pickup_date, NaiveDate::from_ymd_opt(2026, 5, 2));
        assert_eq!(new.items[1].name, "Wipes");
    }

    #[test]
    fn test_create_body_empty_date_means_none() {
        let new = body(json!({
            "message": "Lift to the GP",
            "lat": 0, "lng": 0,
            "address": "Flat 2",
            "collectionTime": "0900",
            "collectionDate": ""
        }))
        .into_new_request()
        .unwrap();
        assert_eq!(new.pickup_date, None);
        assert!(new.items.is_empty());
    }

    #[test]
    fn test_create_body_rejects_bad_input() {
        let missing_message = json!({
            "lat": 0, "lng": 0, "address": "Flat 2", "collectionTime": "0900"
        });
        let bad_lat = json!({
            "message": "x", "lat": 91, "lng": 0, "address": "Flat 2", "collectionTime": "0900"
        });
        let bad_date = json!({
            "message": "x", "lat": 0, "lng": 0, "address": "Flat 2",
            "collectionTime": "0900", "collectionDate": "next tuesday"
        });
        let missing_time = json!({
            "message": "x", "lat": 0, "lng": 0, "address": "Flat 2"
        });

        for payload in [missing_message, bad_lat, bad_date, missing_time] {
            let result = body(payload).into_new_request();
            assert!(matches!(result, Err(AppError::BadRequest(_))));
        }
    }

    #[test]
    fn test_request_view_schema() {
        let request = HelpRequest {
            id: RequestId::new(7),
            owner_id: AccountId::new(3),
            message: "Bread".to_owned(),
            location: Location::new(Decimal::new(515, 1), Decimal::new(-1, 1)).unwrap(),
            address: "1 High Street".to_owned(),
            pickup_time: "1030".to_owned(),
            pickup_date: None,
            items: vec![RequestItem {
                name: "Bread".to_owned(),
                quantity: 2,
            }],
            claimed_by: Some(AccountId::new(4)),
            created_at: Utc::now(),
        };
        let view = serde_json::to_value(ClaimedRequestView {
            request: request.into(),
            requester_email: Some("alice@example.com".to_owned()),
        })
        .unwrap();

        assert_eq!(
            view,
            json!({
                "id": 7,
                "message": "Bread",
                "account_id": 3,
                "lat": "51.5",
                "lng": "-0.1",
                "address": "1 High Street",
                "collectionTime": "1030",
                "collectionDate": null,
                "items": [{"name": "Bread", "quantity": 2}],
                "fulfilled": 4,
                "requester_email": "alice@example.com"
            })
        );
    }
}
