use rocket::http::Status;
use rocket::serde::json::serde_json::json;
use rocket::serde::json::Json;
use rocket::{get, State};

use crate::api::ApiResponse;
use crate::models::token::TokenInfoView;
use crate::models::AppState;
use crate::services::token_info::QueryState;

#[get("/token/<address>")]
pub async fn get_token(address: &str, state: &State<AppState>) -> ApiResponse {
    token_response(state, address).await
}

/// Token sold by the crowdsale. Disabled until the sale parameters are known.
#[get("/crowdsale/token")]
pub async fn get_sale_token(state: &State<AppState>) -> ApiResponse {
    let address = state
        .sale
        .snapshot()
        .await
        .map(|snapshot| format!("{:?}", snapshot.token_address))
        .unwrap_or_default();
    token_response(state, &address).await
}

async fn token_response(state: &AppState, address: &str) -> ApiResponse {
    match state.tokens.load(address).await {
        QueryState::Loaded(info) => (
            Status::Ok,
            Json(json!({
                "status": "loaded",
                "data": TokenInfoView::new(&info, &state.config.explorer_url),
            })),
        ),
        failed @ QueryState::Failed(_) => (Status::BadGateway, Json(json!(failed))),
        other => (Status::Ok, Json(json!(other))),
    }
}
