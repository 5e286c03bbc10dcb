#![forbid(unsafe_code)]
//! Offline inspection and editing of exported chain snapshots

use clap::{Parser, Subcommand};
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use std::path::PathBuf;
use certchain::blockchain::{BlockData, Blockchain, CertificateRecord, ChainStore, Verification};
use certchain::persistence::{JsonFilePersistence, Persistence};

#[derive(Parser)]
#[command(name = "certchain-cli", about = "Inspect and verify certificate chain snapshots")]
struct Cli {
    /// Snapshot file (JSON array of blocks)
    #[arg(short, long, default_value = "chain.json", global = true)]
    snapshot: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a genesis-only snapshot
    Init {
        /// Overwrite an existing snapshot
        #[arg(long)]
        force: bool,
    },
    /// Chain length and integrity
    Status,
    /// Look up a certificate by id
    Verify { certificate_id: String },
    /// Table of every block
    List,
    /// Append a certificate to the snapshot
    Issue {
        #[arg(long)]
        id: String,
        #[arg(long)]
        student: String,
        #[arg(long)]
        course: String,
        #[arg(long)]
        issue_date: String,
        #[arg(long)]
        issuer: String,
        #[arg(long)]
        certificate_type: Option<String>,
        #[arg(long)]
        expiry_date: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
}

fn load_chain(snapshot: &JsonFilePersistence) -> Result<Blockchain, Box<dyn std::error::Error>> {
    let blocks = snapshot.load_chain()?.ok_or_else(|| {
        format!(
            "No snapshot at {}; run 'certchain-cli init' first",
            snapshot.path().display()
        )
    })?;
    Ok(Blockchain { blocks })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let snapshot = JsonFilePersistence::new(&cli.snapshot);

    match cli.command {
        Command::Init { force } => {
            if !force && snapshot.load_chain()?.is_some() {
                return Err(format!("{} already exists; pass --force to overwrite", cli.snapshot.display()).into());
            }
            let store = ChainStore::new()?;
            store.export_to(&snapshot)?;
            println!("{}", format!("✅ Wrote genesis snapshot to {}", cli.snapshot.display()).green());
        }
        Command::Status => {
            let chain = load_chain(&snapshot)?;
            println!("Blocks:       {}", chain.len());
            println!("Certificates: {}", chain.len().saturating_sub(1));
            match chain.audit() {
                Ok(()) => println!("Integrity:    {}", "valid".green().bold()),
                Err(e) => println!("Integrity:    {} ({})", "INVALID".red().bold(), e),
            }
        }
        Command::Verify { certificate_id } => {
            let chain = load_chain(&snapshot)?;
            if chain.audit().is_err() {
                eprintln!("{}", "⚠️  Snapshot fails its integrity check; result is untrusted".yellow());
            }
            match chain.verify_certificate(&certificate_id) {
                Verification::Found(found) => {
                    println!("{}", format!("✅ Certificate {} found", certificate_id).green().bold());
                    println!("Student:  {}", found.data.student_name);
                    println!("Course:   {}", found.data.course_name);
                    println!("Issued:   {} by {}", found.data.issue_date, found.data.issuer);
                    if let Some(kind) = &found.data.certificate_type {
                        println!("Type:     {}", kind);
                    }
                    if let Some(expiry) = &found.data.expiry_date {
                        println!("Expires:  {}", expiry);
                    }
                    println!("Block:    #{} {}", found.index, found.block_hash);
                    println!("Recorded: {}", found.timestamp);
                }
                Verification::NotFound => {
                    println!("{}", format!("❌ Certificate {} not found", certificate_id).red().bold());
                    std::process::exit(1);
                }
            }
        }
        Command::List => {
            let chain = load_chain(&snapshot)?;
            let broken_at = chain.first_untrusted_index();

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    Cell::new("Block").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
                    Cell::new("Certificate").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
                    Cell::new("Student").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
                    Cell::new("Hash").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
                    Cell::new("Recorded").fg(TableColor::Cyan).add_attribute(Attribute::Bold),
                ]);

            for block in &chain.blocks {
                let color = match broken_at {
                    Some(index) if block.index >= index => TableColor::Red,
                    _ => TableColor::White,
                };
                let (id, student) = match &block.data {
                    BlockData::Genesis => ("genesis".to_string(), String::new()),
                    BlockData::Certificate(record) => (record.certificate_id.clone(), record.student_name.clone()),
                };
                table.add_row(vec![
                    Cell::new(format!("#{}", block.index)).fg(color),
                    Cell::new(id).fg(color),
                    Cell::new(student).fg(color),
                    Cell::new(block.short_hash()).fg(color),
                    Cell::new(&block.timestamp).fg(color),
                ]);
            }
            println!("{table}");
        }
        Command::Issue {
            id,
            student,
            course,
            issue_date,
            issuer,
            certificate_type,
            expiry_date,
            description,
        } => {
            let store = ChainStore::new()?;
            store.import_from(&snapshot)?;

            let mut record = CertificateRecord::new(id, student, course, issue_date, issuer);
            record.certificate_type = certificate_type;
            record.expiry_date = expiry_date;
            record.description = description;

            let receipt = store.issue(record)?;
            store.export_to(&snapshot)?;
            println!(
                "{}",
                format!("✅ Issued at block #{} ({})", receipt.index, receipt.hash).green().bold()
            );
        }
    }

    Ok(())
}
