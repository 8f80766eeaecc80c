use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rox::ast_printer::AstPrinter;
use rox::scanner::Scanner;
use rox::session::{RunError, Session, EXIT_STATIC_ERROR};

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to a file
    #[arg(long, global = true)]
    log: bool,

    /// Log file written when --log is given
    #[arg(long, global = true, default_value = "app.log")]
    log_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print tokens as JSON, one per line
        #[arg(long)]
        json: bool,
    },

    /// Parses a file and prints its syntax tree
    Parse { filename: PathBuf },

    /// Evaluates a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs a file as a Lox program, or starts a REPL without one
    Run { filename: Option<PathBuf> },
}

/// Memory-maps `filename`.  Empty files are not mapped.
fn map_file(filename: &Path) -> Result<Option<Mmap>> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let len: u64 = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?
        .len();

    if len == 0 {
        return Ok(None);
    }

    // SAFETY: the mapping is read-only and lives only for this process run;
    // the script is not expected to be modified while it is being interpreted.
    let map = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    info!("Mapped {} bytes from {:?}", map.len(), filename);

    Ok(Some(map))
}

fn source_text(map: &Option<Mmap>) -> Result<&str> {
    let bytes: &[u8] = map.as_deref().unwrap_or(&[]);
    Ok(std::str::from_utf8(bytes).context("Source is not valid UTF-8")?)
}

fn init_logger(path: &Path) -> Result<()> {
    let log_file = File::create(path).context(format!("Failed to create {:?}", path))?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'rox::' from module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // RUST_LOG narrows this
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to {:?}", path);
    Ok(())
}

fn report(error: &RunError) -> ! {
    eprintln!("{}", error);
    debug!("Exiting with code {}", error.exit_code());
    std::process::exit(error.exit_code());
}

fn tokenize(filename: &Path, json: bool) -> Result<()> {
    let map = map_file(filename)?;
    let text: &str = source_text(&map)?;

    let mut tokenized = true;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for result in Scanner::new(text) {
        match result {
            Ok(token) if json => writeln!(out, "{}", serde_json::to_string(&token)?)?,
            Ok(token) => writeln!(out, "{}", token)?,
            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    out.flush()?;

    if !tokenized {
        debug!("Tokenization failed, exiting with code {}", EXIT_STATIC_ERROR);
        std::process::exit(EXIT_STATIC_ERROR);
    }

    Ok(())
}

fn parse(filename: &Path) -> Result<()> {
    let map = map_file(filename)?;
    let mut session = Session::new();

    match session.parse_program(source_text(&map)?) {
        Ok(statements) => {
            for stmt in &statements {
                println!("{}", AstPrinter::print_stmt(stmt));
            }
            Ok(())
        }
        Err(e) => report(&e),
    }
}

fn evaluate(filename: &Path) -> Result<()> {
    let map = map_file(filename)?;
    let mut session = Session::new();

    match session.evaluate(source_text(&map)?) {
        Ok(value) => {
            println!("{}", value);
            Ok(())
        }
        Err(e) => report(&e),
    }
}

fn run_file(filename: &Path) -> Result<()> {
    let map = map_file(filename)?;
    let mut session = Session::new();

    if let Err(e) = session.run(source_text(&map)?) {
        report(&e);
    }

    info!("Program executed successfully");
    Ok(())
}

/// Read-eval-print loop.  Errors are printed and the loop carries on with
/// the same globals.
fn run_prompt() -> Result<()> {
    info!("Starting REPL");

    let mut session = Session::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };

        if let Err(e) = session.run(&line?) {
            eprintln!("{}", e);
        }
    }

    info!("REPL closed");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger(&args.log_file)?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match &args.commands {
        Commands::Tokenize { filename, json } => tokenize(filename, *json),
        Commands::Parse { filename } => parse(filename),
        Commands::Evaluate { filename } => evaluate(filename),
        Commands::Run {
            filename: Some(filename),
        } => run_file(filename),
        Commands::Run { filename: None } => run_prompt(),
    }
}
