use std::io::{self, Read};

use clap::{Parser as ClapParser, Subcommand};
use lingo::cli::{self, CliError, EvalOptions};

#[derive(ClapParser)]
#[command(name = "lingo")]
#[command(about = "lingo - evaluate expressions against JSON parameters")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression
    Eval {
        /// The expression to evaluate
        expression: String,

        /// JSON parameter (reads from stdin if `-`)
        #[arg(short, long)]
        param: Option<String>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate expression syntax without evaluating
    Check {
        /// The expression to check
        expression: String,
    },
}

fn read_stdin() -> Result<String, CliError> {
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(CliError::Io)?;
    Ok(buffer)
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Eval {
            expression,
            param,
            pretty,
        } => {
            let param = match param {
                Some(p) if p == "-" => Some(read_stdin()?),
                other => other,
            };
            let options = EvalOptions {
                expression,
                param,
                pretty,
            };
            println!("{}", cli::execute_eval(&options)?);
            Ok(())
        }
        Commands::Check { expression } => {
            cli::execute_check(&expression)?;
            println!("Syntax OK");
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
