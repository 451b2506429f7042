use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::Table;
use tracing_subscriber::EnvFilter;

use extrato::detect::sniff_delimiter;
use extrato::extract::{rows_from_csv, rows_from_text};
use extrato::profile::DateFormat;
use extrato::{
    parse_statement, parse_with_profile, ParseError, ParseResult, ProfileRegistry, RawRow, TxnKind,
};

#[derive(Parser)]
#[command(name = "extrato", version, about = "Bank-statement parsing engine (debug CLI)")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a statement file and print transactions, errors and totals
    Parse {
        file: PathBuf,
        /// Account the import belongs to (scopes dedup fingerprints)
        #[arg(long)]
        account: String,
        /// Force a bank profile instead of detecting one
        #[arg(long)]
        bank: Option<String>,
        /// Emit the full ParseResult as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the registered bank profiles in detection order
    Banks,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("extrato=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Parse {
            file,
            account,
            bank,
            json,
        } => run_parse(&file, &account, bank.as_deref(), json),
        Commands::Banks => run_banks(),
    };

    if let Err(e) = result {
        eprintln!("{} {e:#}", "Error:".red());
        std::process::exit(1);
    }
}

fn extract_rows(path: &Path, text: &str) -> Vec<RawRow> {
    let is_csv = path
        .extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        let lines = rows_from_text(text);
        if let Some(delimiter) = sniff_delimiter(&lines) {
            if let Ok(rows) = rows_from_csv(text, delimiter) {
                return rows;
            }
        }
    }
    rows_from_text(text)
}

fn run_parse(file: &Path, account: &str, bank: Option<&str>, json: bool) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let rows = extract_rows(file, &text);

    let registry = ProfileRegistry::builtin();
    let result = match bank {
        Some(id) => {
            let profile = registry
                .get(id)
                .ok_or_else(|| anyhow!("unknown bank profile '{id}' (see `extrato banks`)"))?;
            parse_with_profile(account, &rows, profile, None)
        }
        None => parse_statement(account, &filename, &rows, &registry, None),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    print_result(&result);
    Ok(())
}

fn print_result(result: &ParseResult) {
    let status = if result.success {
        "ok".green()
    } else {
        "failed".red()
    };
    println!("{} — bank: {}", status, result.bank_detected.bold());

    if !result.transactions.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Row", "Date", "Kind", "Amount", "Description", "Balance", "Dup"]);
        for txn in &result.transactions {
            let kind = match txn.kind {
                TxnKind::Income => "income".green().to_string(),
                TxnKind::Expense => "expense".red().to_string(),
            };
            table.add_row(vec![
                (txn.source_row_index + 1).to_string(),
                txn.date.to_string(),
                kind,
                format!("{:.2}", txn.amount),
                txn.description.clone(),
                txn.balance_after
                    .map(|b| format!("{b:.2}"))
                    .unwrap_or_default(),
                match txn.duplicate_of_existing {
                    Some(true) => "yes".into(),
                    Some(false) => "no".into(),
                    None => String::new(),
                },
            ]);
        }
        println!("{table}");
    }

    for error in &result.errors {
        match error {
            ParseError::Row(_) => println!("{} {error}", "warning:".yellow()),
            _ => println!("{} {error}", "error:".red()),
        }
    }

    let s = &result.summary;
    println!(
        "{} transactions — income {:.2}, expense {:.2}, balance {:.2}",
        s.count, s.income, s.expense, s.balance
    );
}

fn run_banks() -> anyhow::Result<()> {
    let registry = ProfileRegistry::builtin();
    let mut table = Table::new();
    table.set_header(vec!["Id", "Priority", "Delimiter", "Dates", "Decimal", "Markers"]);
    for profile in registry.all_profiles() {
        let dates = match profile.date_format {
            DateFormat::Dmy => "DD/MM/YYYY",
            DateFormat::Mdy => "MM/DD/YYYY",
            DateFormat::Iso => "YYYY-MM-DD",
        };
        table.add_row(vec![
            profile.id.clone(),
            profile.priority.to_string(),
            match profile.delimiter {
                '\t' => "tab".to_string(),
                d => d.to_string(),
            },
            dates.to_string(),
            profile.decimal_separator.to_string(),
            profile.matchers.len().to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
