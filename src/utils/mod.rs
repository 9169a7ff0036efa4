pub mod abi;
pub mod config;
pub mod ethereum;
pub mod units;
