use clap::{Parser, Subcommand};
use crowdsale_desk::models::crowdsale::{Confirmation, CrowdsaleView, PurchaseOutcome};
use crowdsale_desk::models::session::Session;
use crowdsale_desk::models::token::{TokenInfo, TokenInfoView};
use crowdsale_desk::services::token_info::QueryState;
use crowdsale_desk::{build_state, load_config};
use dotenv::dotenv;
use eyre::{eyre, Result};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Crowdsale terminal client")]
struct Args {
    /// Crowdsale contract address (overrides CROWDSALE_ADDRESS)
    #[clap(short, long)]
    crowdsale: Option<String>,

    /// JSON-RPC endpoint (overrides HTTP_RPC_URL)
    #[clap(short, long)]
    rpc_url: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the sale parameters and the token on sale
    Info,
    /// Show metadata for any ERC20 token
    Token { address: String },
    /// Price an order
    Quote { quantity: u32 },
    /// Buy tokens and wait for the transaction to be mined
    Buy { quantity: u32 },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = Args::parse();
    let config = load_config(args.crowdsale, args.rpc_url)?;
    let explorer_url = config.explorer_url.clone();
    let state = build_state(config).await?;

    match args.command {
        Command::Info => {
            let snapshot = state.sale.refresh().await?;
            print_json(&CrowdsaleView::new(&snapshot, &explorer_url))?;

            let token = format!("{:?}", snapshot.token_address);
            print_token(state.tokens.load(&token).await, &explorer_url)?;
        }
        Command::Token { address } => {
            print_token(state.tokens.load(&address).await, &explorer_url)?;
        }
        Command::Quote { quantity } => {
            state.sale.refresh().await?;
            print_json(&state.sale.quote(quantity).await?)?;
        }
        Command::Buy { quantity } => {
            state.sale.refresh().await?;
            let mut session: Session = state.session.read().await.clone();

            // First attempt connects the wallet, second one buys
            let mut outcome = state.sale.buy(&session, quantity).await?;
            if let PurchaseOutcome::ConnectionRequested { accounts } = &outcome {
                session.connect(accounts);
                println!("Connected account {:?}", session.account);
                if session.account.is_none() {
                    return Err(eyre!("wallet returned no accounts"));
                }
                outcome = state.sale.buy(&session, quantity).await?;
            }

            let PurchaseOutcome::Submitted { tx_hash, quote, confirmation } = outcome else {
                return Err(eyre!("wallet did not accept the purchase"));
            };
            println!("Submitted {:?} for {} tokens ({} ETH)", tx_hash, quote.quantity, quote.total_cost_eth);

            match confirmation.await? {
                Confirmation::Confirmed(Some(snapshot)) => {
                    println!("Transaction confirmed!");
                    print_json(&CrowdsaleView::new(&snapshot, &explorer_url))?;
                }
                Confirmation::Confirmed(None) => println!("Transaction confirmed! (sale refresh failed)"),
                Confirmation::Failed(reason) => return Err(eyre!("Transaction failed: {}", reason)),
            }
        }
    }

    Ok(())
}

fn print_token(state: QueryState<TokenInfo>, explorer_url: &str) -> Result<()> {
    match state {
        QueryState::Loaded(info) => print_json(&TokenInfoView::new(&info, explorer_url)),
        QueryState::Failed(reason) => Err(eyre!(reason)),
        other => print_json(&other),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
