use log::error;
use rocket::http::Status;
use rocket::serde::json::serde_json::json;
use rocket::serde::json::Json;
use rocket::{get, post, State};

use web3::types::Address;

use crate::api::{error_response, ApiResponse};
use crate::models::session::{Session, SessionView};
use crate::models::AppState;

#[get("/session")]
pub async fn get_session(state: &State<AppState>) -> ApiResponse {
    let session = state.session.read().await;
    (
        Status::Ok,
        Json(json!(SessionView::new(&session, state.config.expected_chain_id))),
    )
}

/// Adopts the first of `accounts` and re-reads the sale in the background.
/// Every route that connects a wallet goes through here.
pub(crate) async fn adopt_accounts(state: &AppState, accounts: &[Address]) -> Session {
    let sale = state.sale.clone();
    tokio::spawn(async move { sale.refresh().await });

    let mut session = state.session.write().await;
    session.connect(accounts);
    session.clone()
}

#[post("/session/connect")]
pub async fn connect(state: &State<AppState>) -> ApiResponse {
    match state.wallet.request_accounts().await {
        Ok(accounts) => {
            let session = adopt_accounts(state, &accounts).await;
            (
                Status::Ok,
                Json(json!(SessionView::new(&session, state.config.expected_chain_id))),
            )
        }
        Err(e) => {
            error!("Wallet connection failed: {}", e);
            state.session.write().await.fail(&e);
            error_response(&e)
        }
    }
}
