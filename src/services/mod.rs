pub mod crowdsale;
pub mod notify;
pub mod token_info;
