use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use ethereum_types::{Address, U256};
use hwsign::chains::ethereum::build_sign_request;
use hwsign::{DerivationPath, DeviceModel, PendingTransaction, SessionContext, SignerConfig};
use hwsign_db::{AddressBookEntry, Database};
use std::path::PathBuf;

/// Hardware-wallet signer for Ethereum transactions
#[derive(Debug, Parser)]
#[command(name = "hwsign", version)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, default_value_os_t = hwsign_db::get_database_path())]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Manage sender addresses and their derivation paths
    #[command(subcommand)]
    AddressBook(AddressBookCommand),
    /// Show or change signer settings
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print the sign request a device would receive, without contacting one
    Preview(PreviewArgs),
    /// Inspect stored transactions
    #[command(subcommand)]
    Transactions(TransactionsCommand),
}

#[derive(Debug, Subcommand)]
enum AddressBookCommand {
    /// Attach a derivation path to an address
    Set {
        #[arg(value_parser = parse_address)]
        address: Address,
        /// e.g. "m/44'/60'/0'/0/0"
        path: String,
        #[arg(long)]
        name: Option<String>,
    },
    List,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    Show,
    /// Keys: chain_id, device_model (trezor, keepkey, auto), show_display
    Set { key: String, value: String },
}

#[derive(Debug, Subcommand)]
enum TransactionsCommand {
    List,
}

#[derive(Debug, Args)]
struct PreviewArgs {
    #[arg(long, value_parser = parse_address)]
    from: Address,
    #[arg(long, value_parser = parse_address)]
    to: Address,
    /// Wei, decimal
    #[arg(long, value_parser = parse_u256, default_value = "0")]
    value: U256,
    #[arg(long, value_parser = parse_u256)]
    nonce: U256,
    #[arg(long, value_parser = parse_u256)]
    gas_price: U256,
    #[arg(long, value_parser = parse_u256, default_value = "21000")]
    gas_limit: U256,
    /// Call data as hex
    #[arg(long)]
    data: Option<String>,
    /// Overrides the configured chain id
    #[arg(long)]
    chain_id: Option<u64>,
    /// trezor or keepkey; defaults to the configured model, then trezor
    #[arg(long)]
    model: Option<DeviceModel>,
    /// Derivation path; looked up in the address book when omitted
    #[arg(long)]
    path: Option<DerivationPath>,
}

fn parse_address(value: &str) -> Result<Address, String> {
    let digits = value.trim().trim_start_matches("0x").trim_start_matches("0X");
    let bytes = hex::decode(digits).map_err(|e| format!("invalid address {}: {}", value, e))?;
    if bytes.len() != 20 {
        return Err(format!("address must be 20 bytes, got {}", bytes.len()));
    }
    Ok(Address::from_slice(&bytes))
}

fn parse_u256(value: &str) -> Result<U256, String> {
    U256::from_dec_str(value.trim()).map_err(|e| format!("invalid amount {}: {:?}", value, e))
}

fn parse_hex(value: &str) -> Result<Vec<u8>> {
    let digits = value.trim().trim_start_matches("0x");
    hex::decode(digits).with_context(|| format!("invalid hex data: {}", value))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let db = Database::open_at_path(cli.db.clone())
        .await
        .with_context(|| format!("failed to open database at {}", cli.db.display()))?;

    match cli.command {
        Command::AddressBook(command) => address_book(&db, command).await,
        Command::Config(command) => config(&db, command).await,
        Command::Preview(args) => preview(&db, args).await,
        Command::Transactions(TransactionsCommand::List) => list_transactions(&db).await,
    }
}

async fn address_book(db: &Database, command: AddressBookCommand) -> Result<()> {
    match command {
        AddressBookCommand::Set { address, path, name } => {
            let parsed: DerivationPath = path.parse()?;
            let existing = db.get_address_book_entry(&format!("{:#x}", address)).await?;
            let entry = AddressBookEntry {
                address: format!("{:#x}", address),
                name: name.or_else(|| existing.as_ref().and_then(|e| e.name.clone())),
                trezor_derivation_path: Some(parsed.to_string()),
                created_at: existing
                    .map(|e| e.created_at)
                    .unwrap_or_else(Database::current_timestamp),
            };
            db.upsert_address_book_entry(&entry).await?;
            println!("{:#x} -> {}", address, parsed);
        }
        AddressBookCommand::List => {
            let mut table = Table::new();
            table.set_header(vec!["Address", "Name", "Derivation path"]);
            for entry in db.list_address_book().await? {
                table.add_row(vec![
                    entry.address,
                    entry.name.unwrap_or_default(),
                    entry.trezor_derivation_path.unwrap_or_else(|| "-".to_string()),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

async fn config(db: &Database, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let config = SignerConfig::load(db).await?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommand::Set { key, value } => SignerConfig::set(db, &key, &value).await?,
    }
    Ok(())
}

async fn preview(db: &Database, args: PreviewArgs) -> Result<()> {
    let config = SignerConfig::load(db).await?;
    let path = match args.path {
        Some(path) => path,
        None => SessionContext::resolve(db, &args.from, &config).await?.derivation_path,
    };
    let model = args.model.or(config.device_model).unwrap_or(DeviceModel::Trezor);

    let tx = PendingTransaction {
        from: args.from,
        to: Some(args.to),
        value: args.value,
        nonce: args.nonce,
        gas_price: args.gas_price,
        gas_limit: args.gas_limit,
        chain_id: args.chain_id.unwrap_or(config.chain_id),
        input: args.data.as_deref().map(parse_hex).transpose()?.unwrap_or_default(),
        tx_hash: None,
    };

    let request = build_sign_request(&tx, &path, model)?;
    println!("{}", serde_json::to_string_pretty(&request)?);

    let message = request.into_message();
    println!(
        "{} (type {}): {}",
        message.name(),
        message.message_type(),
        hex::encode(message.encode_payload())
    );
    Ok(())
}

async fn list_transactions(db: &Database) -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Hash", "Chain", "From", "To", "Value", "Nonce", "Status"]);
    for record in db.list_transactions().await? {
        table.add_row(vec![
            record.tx_hash,
            record.chain_id.to_string(),
            record.from_address,
            record.to_address.unwrap_or_else(|| "-".to_string()),
            record.value,
            record.nonce,
            record.status.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
