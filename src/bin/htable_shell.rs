use chained_htable::logger::init_logger;
use chained_htable::shell::{self, ShellError};
use chained_htable::{ChainTable, TableConfig};
use clap::Parser;
use std::io;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "htable-shell")]
#[command(about = "Interactive set/get/del shell over a chained hash table", long_about = None)]
struct Cli {
    /// Largest bucket array the table may allocate
    #[arg(long)]
    max_buckets: Option<usize>,
    /// Largest number of entries the table may hold
    #[arg(long)]
    max_entries: Option<usize>,
}

fn main() -> ExitCode {
    init_logger();
    let cli = Cli::parse();

    let mut config = TableConfig::new();
    if let Some(n) = cli.max_buckets {
        config = config.max_buckets(n);
    }
    if let Some(n) = cli.max_entries {
        config = config.max_entries(n);
    }

    let mut table = match ChainTable::with_config(config) {
        Ok(t) => t,
        Err(e) => {
            println!("ERROR: table not created: {e}");
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    match shell::run(&mut table, stdin.lock(), stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(ShellError::Io(e)) => {
            log::error!("shell aborted: {e}");
            ExitCode::FAILURE
        }
    }
}
