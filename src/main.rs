use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox as lox;

use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::parser::Parser;
use lox::runner::{Lox, EXIT_STATIC_ERROR, EXIT_USAGE};
use lox::scanner::{scan_tokens, Scanner};

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print one JSON object per token
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: Option<PathBuf> },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program
    Run { filename: Option<PathBuf> },

    /// Starts an interactive prompt
    Repl,
}

/// Reads the contents of a file into a String
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf).context(format!("File {:?} is not valid UTF-8", filename))
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

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
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn report<'e>(errors: impl IntoIterator<Item = &'e LoxError>) {
    for e in errors {
        debug!("Reporting error on line {:?}: {}", e.line(), e.message());
        eprintln!("{}", e);
    }
}

fn no_input(subcommand: &str) -> ! {
    info!("No filepath provided for {}", subcommand);
    eprintln!("No input filepath was provided. Exiting...");
    std::process::exit(EXIT_USAGE);
}

fn tokenize(source: &str, json: bool) -> Result<()> {
    let mut tokenized = true;

    for token in Scanner::new(source) {
        match token {
            Ok(token) => {
                debug!("Scanned token: {}", token);

                if json {
                    println!("{}", serde_json::to_string(&token)?);
                } else {
                    println!("{}", token);
                }
            }

            Err(e) => {
                tokenized = false;
                debug!("Tokenization debug: {}", e);
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");
        std::process::exit(EXIT_STATIC_ERROR);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn parse(source: &str) {
    let (tokens, lex_errors) = scan_tokens(source);
    let (expr, parse_errors) = Parser::new(&tokens).parse_expression();

    report(lex_errors.iter().chain(&parse_errors));

    match expr {
        Some(expr) if lex_errors.is_empty() && parse_errors.is_empty() => {
            let ast_str = AstPrinter::print(&expr);
            debug!("AST: {}", ast_str);
            println!("{}", ast_str);
        }

        _ => std::process::exit(EXIT_STATIC_ERROR),
    }
}

fn repl() -> Result<()> {
    info!("Starting REPL");

    let mut session = Lox::new();
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!("Goodbye!");
            break;
        }

        // A bad line is reported and the session carries on.
        let outcome = session.run(&line);
        report(outcome.errors());
    }

    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,

        // --help and --version are not failures
        Err(e) if !e.use_stderr() => e.exit(),

        Err(e) => {
            e.print()?;
            std::process::exit(EXIT_USAGE);
        }
    };

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename, json } => {
            let Some(filename) = filename else {
                no_input("Tokenize")
            };
            info!("Running Tokenize subcommand");
            tokenize(&read_file(filename)?, json)?;
        }

        Commands::Parse { filename } => {
            let Some(filename) = filename else {
                no_input("Parse")
            };
            info!("Running Parse subcommand");
            parse(&read_file(filename)?);
        }

        Commands::Evaluate { filename } => {
            let Some(filename) = filename else {
                no_input("Evaluate")
            };
            info!("Running Evaluate subcommand");

            let outcome = Lox::new().evaluate(&read_file(filename)?);
            report(outcome.errors());

            if let Some(value) = &outcome.value {
                debug!("Evaluated to: {}", value);
                println!("{}", value);
            }

            if outcome.exit_code() != 0 {
                std::process::exit(outcome.exit_code());
            }
        }

        Commands::Run { filename } => {
            let Some(filename) = filename else {
                no_input("Run")
            };
            info!("Running Run subcommand");

            let source = read_file(filename)?;
            info!("Provided input:\n {}", source);

            let outcome = Lox::new().run(&source);
            report(outcome.errors());

            if outcome.exit_code() != 0 {
                debug!("Exiting with code {}", outcome.exit_code());
                std::process::exit(outcome.exit_code());
            }

            info!("Program executed successfully");
        }

        Commands::Repl => repl()?,
    }

    Ok(())
}
