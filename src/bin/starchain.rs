#![forbid(unsafe_code)]
use clap::{Parser, Subcommand};
use colored::*;
use serde_json::json;
use starchain::blockchain::Blockchain;
use starchain::config::load_config;
use starchain::crypto::{AddressKind, KeyPair, Network};
use starchain::logging::{default_logger, init_logging};
use starchain::persistence::InMemoryStore;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prints an ownership message for an address
    Message {
        /// The address that will sign the message
        address: String,
    },
    /// Generates a secret key and its P2PKH address
    Keygen {
        #[arg(long)]
        testnet: bool,
    },
    /// Signs a message with a hex secret key
    Sign {
        secret_hex: String,
        message: String,
    },
    /// Runs an in-memory registry, submits signed entries and prints the chain
    Demo {
        #[arg(long, default_value_t = 3)]
        entries: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config()?;
    init_logging(&config.logging.level, config.logging.log_format());

    let chain = Blockchain::with_config(
        config.registry.clone(),
        Box::new(InMemoryStore::new()),
        default_logger(),
    )?;

    match &cli.command {
        Commands::Message { address } => {
            println!("{}", chain.request_ownership_message(address));
        }
        Commands::Keygen { testnet } => {
            let network = if *testnet { Network::Testnet } else { Network::Mainnet };
            let keypair = KeyPair::generate();
            println!("{} {}", "secret: ".bright_yellow(), keypair.secret_hex());
            println!("{} {}", "address:".bright_green(), keypair.address(AddressKind::P2pkh, network)?);
        }
        Commands::Sign { secret_hex, message } => {
            let keypair = KeyPair::from_secret_hex(secret_hex)?;
            println!("{}", keypair.sign_message(message, AddressKind::P2pkh)?);
        }
        Commands::Demo { entries } => demo(&chain, *entries)?,
    }

    Ok(())
}

fn demo(chain: &Blockchain, entries: usize) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("{}", "🌟  Registering stars...".bright_cyan());

    let keypair = KeyPair::generate();
    let address = keypair.address(AddressKind::P2pkh, Network::Mainnet)?;

    for n in 0..entries {
        let message = chain.request_ownership_message(&address);
        let signature = keypair.sign_message(&message, AddressKind::P2pkh)?;
        let star = json!({
            "dec": format!("68° 52' {}.9", 50 + n),
            "ra": format!("16h 29m {}.0s", n),
            "story": format!("Demo star #{}", n + 1),
        });
        let block = chain.submit_entry(&address, &message, &signature, star)?;
        eprintln!(
            "{} block #{} {}",
            "•".bright_yellow(),
            block.height(),
            block.hash().unwrap_or_default().bright_green()
        );
    }

    println!("{}", serde_json::to_string_pretty(&chain.blocks())?);

    let violations = chain.validate_chain();
    if violations.is_empty() {
        eprintln!("{}", "Chain is valid.".bright_green());
    } else {
        eprintln!("{} {}", "Invalid blocks:".red(), violations.len());
    }
    eprintln!(
        "{} owns {} entries",
        address.bright_yellow(),
        chain.get_entries_by_owner(&address)?.len()
    );
    Ok(())
}
