//! tabsieve - filter a CSV file the way a table browser would.
//!
//! Prints the filtered table as tab-separated text on stdout.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tabsieve::config::Settings;
use tabsieve::engine::{Engine, View};
use tabsieve::search::ColumnMatches;
use tabsieve::store::{RowStore, Table};
use tabsieve::{logging, Result};

/// Row and column filters for CSV files
#[derive(Parser)]
#[command(name = "tabsieve")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// CSV file with a header line
    input: PathBuf,
    /// Row filter, e.g. "price > 100 @ report !old *"
    #[arg(short, long)]
    rows: Option<String>,
    /// Column filter, e.g. '"Date", *, !tmp'
    #[arg(short, long)]
    columns: Option<String>,
    /// Column name to search for; the suggestions go to stderr
    #[arg(short, long)]
    search: Option<String>,
    /// Move the best search match to the first column
    #[arg(long, requires = "search")]
    move_to_start: bool,
    /// Settings file (defaults to ./tabsieve.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print at most this many rows
    #[arg(short = 'n', long)]
    limit: Option<usize>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("tabsieve: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    logging::init(&settings.logging)?;
    let mut table = Table::from_csv_path(&cli.input)?;
    let mut engine = Engine::new(settings);

    // ------------- Column search -------------
    if let Some(fragment) = &cli.search {
        let matches = engine.search_columns(&table, fragment);
        print_suggestions(&matches);
        if let Some(best) = matches.best().map(str::to_string) {
            engine.select_column(&table, &best)?;
            if cli.move_to_start {
                if let Some(order) = engine.move_selected_to_start(&table) {
                    table.reorder_columns(&order)?;
                }
            }
        }
    }

    // ------------- Filters -------------
    if let Some(filter) = &cli.columns {
        engine.apply_column_filter(&table, filter);
    }
    if let Some(filter) = &cli.rows {
        engine.apply_row_filter(&table, filter)?;
    }
    let view = engine.view(&table)?;
    print_view(&table, &view, cli.limit)?;
    Ok(())
}

fn print_suggestions(matches: &ColumnMatches) {
    for (label, columns) in [("exact", &matches.exact), ("partial", &matches.partial), ("fuzzy", &matches.fuzzy)] {
        if !columns.is_empty() {
            eprintln!("{}: {}", label, columns.join(", "));
        }
    }
    if matches.is_empty() {
        eprintln!("no matching columns");
    }
}

fn print_view(table: &Table, view: &View, limit: Option<usize>) -> Result<()> {
    let indexes: Vec<usize> = view.columns.iter().filter_map(|c| table.column_index(c)).collect();
    let mut out = BufWriter::new(io::stdout().lock());
    writeln!(out, "{}", view.columns.join("\t"))?;
    for row in view.rows.iter().take(limit.unwrap_or(usize::MAX)) {
        let cells: Vec<String> = indexes
            .iter()
            .map(|&i| table.cell_at(row, i).map(|c| c.to_display_string()).unwrap_or_default())
            .collect();
        writeln!(out, "{}", cells.join("\t"))?;
    }
    out.flush()?;
    Ok(())
}
