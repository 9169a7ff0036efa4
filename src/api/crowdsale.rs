use log::error;
use rocket::http::Status;
use rocket::serde::json::serde_json::json;
use rocket::serde::json::Json;
use rocket::{get, post, State};
use serde::Deserialize;

use crate::api::session::adopt_accounts;
use crate::api::{error_response, ApiResponse};
use crate::error::SaleError;
use crate::models::crowdsale::{CrowdsaleView, PurchaseOutcome};
use crate::models::AppState;

#[derive(Debug, Deserialize)]
pub struct BuyRequest {
    pub quantity: u32,
}

#[get("/crowdsale")]
pub async fn get_crowdsale(state: &State<AppState>) -> ApiResponse {
    match state.sale.snapshot().await {
        Some(snapshot) => (
            Status::Ok,
            Json(json!(CrowdsaleView::new(&snapshot, &state.config.explorer_url))),
        ),
        None => error_response(&SaleError::NoSnapshot),
    }
}

#[post("/crowdsale/refresh")]
pub async fn refresh(state: &State<AppState>) -> ApiResponse {
    match state.sale.refresh().await {
        Ok(snapshot) => (
            Status::Ok,
            Json(json!(CrowdsaleView::new(&snapshot, &state.config.explorer_url))),
        ),
        Err(e) => error_response(&e),
    }
}

// Order quantity defaults to 1, like the slider
#[get("/crowdsale/quote?<quantity>")]
pub async fn quote(quantity: Option<&str>, state: &State<AppState>) -> ApiResponse {
    let quantity = match quantity.map(str::parse::<u32>) {
        None => 1,
        Some(Ok(quantity)) => quantity,
        Some(Err(e)) => return error_response(&SaleError::InvalidQuantity(e.to_string())),
    };

    match state.sale.quote(quantity).await {
        Ok(quote) => (Status::Ok, Json(json!(quote))),
        Err(e) => error_response(&e),
    }
}

#[post("/crowdsale/buy", format = "json", data = "<request>")]
pub async fn buy(request: Json<BuyRequest>, state: &State<AppState>) -> ApiResponse {
    let session = state.session.read().await.clone();

    match state.sale.buy(&session, request.quantity).await {
        Ok(PurchaseOutcome::ConnectionRequested { accounts }) => {
            let session = adopt_accounts(state, &accounts).await;
            (
                Status::Accepted,
                Json(json!({
                    "status": "connection_requested",
                    "account": session.account,
                    "message": "Wallet connected, submit the order again to buy",
                })),
            )
        }
        // The confirmation task keeps running after its handle is dropped
        Ok(PurchaseOutcome::Submitted { tx_hash, quote, .. }) => (
            Status::Accepted,
            Json(json!({
                "status": "submitted",
                "tx_hash": tx_hash,
                "quote": quote,
            })),
        ),
        Err(e) => {
            if matches!(e, SaleError::WalletUnavailable) {
                state.session.write().await.fail(&e);
            }
            error!("Purchase request failed: {}", e);
            error_response(&e)
        }
    }
}

#[get("/notifications")]
pub async fn notifications(state: &State<AppState>) -> ApiResponse {
    (Status::Ok, Json(json!(state.notifications.recent())))
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{client, client_with_chain, wait_for_calls, ClientOptions};
    use crate::testing::{buyer, crowdsale_address};
    use rocket::http::{ContentType, Status};
    use rocket::serde::json::Value;
    use std::time::Duration;
    use web3::types::U256;

    #[tokio::test]
    async fn crowdsale_is_unavailable_before_the_first_fetch() {
        let (client, _) = client(ClientOptions::default()).await;

        let response = client.get("/crowdsale").dispatch().await;
        assert_eq!(response.status(), Status::ServiceUnavailable);
    }

    #[tokio::test]
    async fn refresh_serves_the_formatted_snapshot() {
        let (client, _) = client(ClientOptions::default()).await;

        let response = client.post("/crowdsale/refresh").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let body: Value = client.get("/crowdsale").dispatch().await.into_json().await.unwrap();
        assert_eq!(body["generation"], 1);
        assert_eq!(body["available_for_sale"], "5000.0");
        assert_eq!(body["price_wei"], "1000");
        assert_eq!(body["closing_time_utc"], "2030-01-01T00:00:00+00:00");
    }

    #[tokio::test]
    async fn quote_prices_the_order() {
        let (client, _) = client(ClientOptions::default()).await;
        client.post("/crowdsale/refresh").dispatch().await;

        let body: Value = client
            .get("/crowdsale/quote?quantity=5")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(body["value_wei"], "5000000000000000");
        assert_eq!(body["unit_price_wei"], "1000000000000000");

        let response = client.get("/crowdsale/quote?quantity=1001").dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[tokio::test]
    async fn quote_rejects_unparsable_quantities() {
        let (client, _) = client(ClientOptions::default()).await;
        client.post("/crowdsale/refresh").dispatch().await;

        for query in ["quantity=-5", "quantity=two", "quantity=1.5"] {
            let response = client.get(format!("/crowdsale/quote?{}", query)).dispatch().await;
            assert_eq!(response.status(), Status::BadRequest, "{}", query);
        }

        let body: Value = client.get("/crowdsale/quote").dispatch().await.into_json().await.unwrap();
        assert_eq!(body["quantity"], 1);
    }

    #[tokio::test]
    async fn connecting_through_buy_refetches_the_sale() {
        let (client, wallet, chain) = client_with_chain(ClientOptions::default()).await;
        client.post("/crowdsale/refresh").dispatch().await;
        assert_eq!(chain.calls_to(crowdsale_address()), 4);

        let response = client
            .post("/crowdsale/buy")
            .header(ContentType::JSON)
            .body(r#"{"quantity": 1}"#)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Accepted);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["status"], "connection_requested");

        assert_eq!(wait_for_calls(&chain, crowdsale_address(), 8).await, 8);
        assert!(wallet.sent().is_empty());
    }

    #[tokio::test]
    async fn first_buy_connects_second_buy_submits() {
        let (client, wallet) = client(ClientOptions::default()).await;
        client.post("/crowdsale/refresh").dispatch().await;

        let response = client
            .post("/crowdsale/buy")
            .header(ContentType::JSON)
            .body(r#"{"quantity": 2}"#)
            .dispatch()
            .await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["status"], "connection_requested");
        assert!(wallet.sent().is_empty());

        let response = client
            .post("/crowdsale/buy")
            .header(ContentType::JSON)
            .body(r#"{"quantity": 2}"#)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Accepted);
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["status"], "submitted");
        assert_eq!(body["quote"]["value_wei"], "2000000000000000");
        assert_eq!(
            wallet.sent(),
            vec![(buyer(), crowdsale_address(), U256::exp10(15) * 2)]
        );

        // Wait for the background confirmation to land in the feed
        let mut kinds = Vec::new();
        for _ in 0..50 {
            let feed: Value = client.get("/notifications").dispatch().await.into_json().await.unwrap();
            kinds = feed
                .as_array()
                .unwrap()
                .iter()
                .map(|n| n["kind"].as_str().unwrap().to_string())
                .collect();
            if kinds.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(kinds, vec!["success", "pending"]);
    }

    #[tokio::test]
    async fn buy_without_wallet_reports_install_hint() {
        let (client, _) = client(ClientOptions {
            without_wallet: true,
            ..Default::default()
        })
        .await;

        let response = client
            .post("/crowdsale/buy")
            .header(ContentType::JSON)
            .body(r#"{"quantity": 1}"#)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::ServiceUnavailable);

        let body: Value = response.into_json().await.unwrap();
        assert!(body["details"].as_str().unwrap().contains("metamask.io"));
    }
}
