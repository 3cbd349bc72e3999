//! Schema command - print expected input formats

use clap::Args;
use rentledger::input::{LedgerSnapshot, PaymentCsvRow};
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format: json-schema, csv-header or csv-fields
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for the snapshot format
    JsonSchema,
    /// CSV header row for payment imports
    CsvHeader,
    /// Payment CSV column descriptions
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => {
                let schema = schema_for!(LedgerSnapshot);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::CsvHeader => println!("{}", PaymentCsvRow::csv_header()),
            SchemaFormat::CsvFields => print_csv_fields(),
        }
        Ok(())
    }
}

fn print_csv_fields() {
    println!("Payment CSV Format");
    println!("==================");
    println!();
    for column in PaymentCsvRow::csv_schema() {
        let req = if column.required { "required" } else { "optional" };
        println!("{:16} ({:8})  {}", column.name, req, column.description);
    }
    println!();
    println!("Exchange rate convention: secondary units per one primary unit");
}
