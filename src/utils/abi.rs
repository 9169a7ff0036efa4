use std::fs;
use std::path::Path;
use std::sync::Arc;

use ethabi::{Contract, Token};
use eyre::Result;
use web3::types::{Address, U256};

use crate::error::SaleError;
use crate::utils::ethereum::ChainReader;

const ERC20_ABI: &str = include_str!("../abis/erc20.json");
const CROWDSALE_ABI: &str = include_str!("../abis/crowdsale.json");

pub fn load_abi<P: AsRef<Path>>(path: P) -> Result<Contract> {
    let file = fs::read_to_string(path)?;
    let contract = Contract::load(file.as_bytes())?;
    Ok(contract)
}

/// The two contract interfaces the service talks to.
#[derive(Clone)]
pub struct Abis {
    pub erc20: Arc<Contract>,
    pub crowdsale: Arc<Contract>,
}

impl Abis {
    /// ABIs compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Ok(Self {
            erc20: Arc::new(Contract::load(ERC20_ABI.as_bytes())?),
            crowdsale: Arc::new(Contract::load(CROWDSALE_ABI.as_bytes())?),
        })
    }

    /// Loads `erc20.json` and `crowdsale.json` from an artifacts directory,
    /// falling back to the embedded copies when no directory is given.
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        match dir {
            Some(dir) => Ok(Self {
                erc20: Arc::new(load_abi(dir.join("erc20.json"))?),
                crowdsale: Arc::new(load_abi(dir.join("crowdsale.json"))?),
            }),
            None => Self::embedded(),
        }
    }
}

/// Calls a zero-argument view function and returns its first output.
pub async fn call_view(
    reader: &dyn ChainReader,
    abi: &Contract,
    at: Address,
    name: &str,
) -> std::result::Result<Token, SaleError> {
    let function = abi.function(name)?;
    let data = function.encode_input(&[])?;
    let output = reader.call(at, data).await?;

    function
        .decode_output(&output)?
        .into_iter()
        .next()
        .ok_or_else(|| SaleError::Read(format!("{}() returned no value", name)))
}

pub fn expect_string(token: Token, name: &str) -> std::result::Result<String, SaleError> {
    token
        .into_string()
        .ok_or_else(|| SaleError::Read(format!("{}() did not return a string", name)))
}

pub fn expect_uint(token: Token, name: &str) -> std::result::Result<U256, SaleError> {
    token
        .into_uint()
        .ok_or_else(|| SaleError::Read(format!("{}() did not return an integer", name)))
}

pub fn expect_address(token: Token, name: &str) -> std::result::Result<Address, SaleError> {
    token
        .into_address()
        .ok_or_else(|| SaleError::Read(format!("{}() did not return an address", name)))
}
