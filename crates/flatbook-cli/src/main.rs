//! Flatbook CLI - flatten workbook formulas to values

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flatbook::prelude::*;
use flatbook::{resolve_formulas_to_values_with, ResolveOptions, DEFAULT_MAX_PASSES};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "flatbook")]
#[command(author, version, about = "Resolve workbook formulas and emit values-only copies")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve formulas and write a values-only workbook
    Resolve {
        /// Input workbook (xlsx, xlsm)
        input: PathBuf,

        /// Output file (default: <input stem>-values.xlsx beside the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum number of resolution passes
        #[arg(short, long, default_value_t = DEFAULT_MAX_PASSES)]
        passes: u32,
    },

    /// Show information about a workbook
    Info {
        /// Input workbook file
        input: PathBuf,
    },

    /// List all sheets in a workbook
    Sheets {
        /// Input workbook file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            input,
            output,
            passes,
        } => resolve(&input, output.as_deref(), passes),
        Commands::Info { input } => show_info(&input),
        Commands::Sheets { input } => list_sheets(&input),
    }
}

fn resolve(input: &Path, output: Option<&Path>, passes: u32) -> Result<()> {
    let options = ResolveOptions { max_passes: passes };
    let outcome = resolve_formulas_to_values_with(input, &options)
        .with_context(|| format!("Failed to resolve '{}'", input.display()))?;

    eprintln!(
        "{} formula cells: {} resolved, {} unresolved ({} passes)",
        outcome.stats.formula_cells,
        outcome.stats.resolved,
        outcome.stats.unresolved,
        outcome.stats.passes
    );

    // The pipeline wrote to a temp file it handed over to us; move it to
    // where the user asked (or to a sibling of the input).
    let destination = match output {
        Some(path) => path.to_path_buf(),
        None => {
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("workbook");
            input.with_file_name(format!("{}-values.xlsx", stem))
        }
    };

    move_file(&outcome.output_path, &destination).with_context(|| {
        format!(
            "Failed to move output to '{}'",
            destination.display()
        )
    })?;

    eprintln!("Wrote '{}'", destination.display());
    Ok(())
}

/// Rename, falling back to copy+remove for cross-device moves
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)?;
    std::fs::remove_file(from)
}

fn show_info(input: &Path) -> Result<()> {
    let workbook =
        Workbook::open(input).with_context(|| format!("Failed to open '{}'", input.display()))?;

    println!("File: {}", input.display());
    println!("Sheets: {}", workbook.sheet_count());

    for (i, sheet) in workbook.worksheets().enumerate() {
        let formula_count = sheet.formula_cells().count();

        println!();
        println!("  Sheet {}: \"{}\"", i, sheet.name());

        match sheet.used_range() {
            Some(range) => println!(
                "    Used range: {} rows x {} columns",
                range.end.row + 1,
                range.end.col + 1
            ),
            None => println!("    Used range: empty"),
        }
        println!("    Cells: {}", sheet.cell_count());
        println!("    Formulas: {}", formula_count);
    }

    Ok(())
}

fn list_sheets(input: &Path) -> Result<()> {
    let workbook =
        Workbook::open(input).with_context(|| format!("Failed to open '{}'", input.display()))?;

    for (i, sheet) in workbook.worksheets().enumerate() {
        println!("{}\t{}", i, sheet.name());
    }

    Ok(())
}
