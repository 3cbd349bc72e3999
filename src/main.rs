use clap::{Parser, Subcommand};

mod cmd;

#[derive(Parser, Debug)]
#[command(name = "rentledger", version, about = "Rent balances, lump-sum plans and owner statements")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Balance of a tenant's active contract for one month, or the whole account
    Balance(cmd::balance::BalanceCommand),
    /// Spread a lump-sum payment over consecutive months of rent
    Spread(cmd::spread::SpreadCommand),
    /// Owner statement: distributed income, expenses and net balance per owner
    Owners(cmd::owners::OwnersCommand),
    /// Check ownership tables and active contracts for data problems
    Validate(cmd::validate::ValidateCommand),
    /// Print the expected input formats
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Balance(balance) => balance.exec(),
        Command::Spread(spread) => spread.exec(),
        Command::Owners(owners) => owners.exec(),
        Command::Validate(validate) => validate.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}
