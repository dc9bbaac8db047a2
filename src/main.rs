use clap::{ArgAction, Parser as ClapParser, Subcommand};
use fetchxml_sql::cli::{self, CheckOptions, CliError};
use fetchxml_sql::{DEFAULT_CONTEXT_WIDTH, FetchXmlOptions, ParseOptions, SqlOptions};
use std::io::{self, Read};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(ClapParser)]
#[command(name = "fxsql")]
#[command(about = "fxsql - Translate between SQL SELECT statements and FetchXML")]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate SQL to FetchXML
    ToFetchxml {
        /// The SQL statement (reads from stdin if not provided)
        sql: Option<String>,

        /// Spaces per indentation level, 0 for a single line
        #[arg(long, default_value_t = 2)]
        indent: usize,

        /// Bind unqualified columns to the FROM entity even when joins are present
        #[arg(long)]
        allow_unqualified: bool,
    },

    /// Translate FetchXML to SQL
    ToSql {
        /// The FetchXML document (reads from stdin if not provided)
        xml: Option<String>,

        /// Render the SQL on a single line
        #[arg(long)]
        compact: bool,

        /// Print the full result, warnings included, as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the SQL token stream as JSON
    Tokens {
        /// The SQL to tokenize (reads from stdin if not provided)
        sql: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Validate SQL without translating it
    Check {
        /// The SQL statement (reads from stdin if not provided)
        sql: Option<String>,

        /// Width of the source window shown with an error
        #[arg(long, default_value_t = DEFAULT_CONTEXT_WIDTH)]
        context_width: usize,

        /// Bind unqualified columns to the FROM entity even when joins are present
        #[arg(long)]
        allow_unqualified: bool,
    },

    /// List documentation categories
    Docs,

    /// Show documentation for a specific category
    Doc {
        /// Category name (use 'fxsql docs' to list categories)
        category: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::ToFetchxml {
            sql,
            indent,
            allow_unqualified,
        } => run_to_fetchxml(sql, indent, allow_unqualified),
        Commands::ToSql { xml, compact, json } => run_to_sql(xml, compact, json),
        Commands::Tokens { sql, pretty } => read_input(sql)
            .and_then(|sql| cli::tokens_json(&sql, pretty))
            .map(|json| println!("{}", json)),
        Commands::Check {
            sql,
            context_width,
            allow_unqualified,
        } => run_check(sql, context_width, allow_unqualified),
        Commands::Docs => {
            print!("{}", cli::get_docs_overview());
            Ok(())
        }
        Commands::Doc { category } => {
            cli::get_doc_category(&category).map(|content| print!("{}", content))
        }
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so they never mix with translated output.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn read_input(arg: Option<String>) -> Result<String, CliError> {
    match arg {
        Some(s) => Ok(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
        None => Err(CliError::NoInput),
    }
}

fn run_to_fetchxml(sql: Option<String>, indent: usize, allow_unqualified: bool) -> Result<(), CliError> {
    let sql = read_input(sql)?;
    let xml = cli::execute_to_fetchxml(
        &sql,
        FetchXmlOptions { indent },
        ParseOptions {
            allow_unqualified_columns: allow_unqualified,
        },
    )?;
    println!("{}", xml);
    Ok(())
}

fn run_to_sql(xml: Option<String>, compact: bool, json: bool) -> Result<(), CliError> {
    let xml = read_input(xml)?;
    let result = cli::execute_to_sql(&xml, SqlOptions { pretty: !compact });

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        if !result.success {
            std::process::exit(1);
        }
        return Ok(());
    }

    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }
    match (result.sql, result.error) {
        (Some(sql), _) => {
            println!("{}", sql);
            Ok(())
        }
        (None, error) => Err(CliError::Transpile(
            error.unwrap_or_else(|| "unknown error".to_string()),
        )),
    }
}

fn run_check(sql: Option<String>, context_width: usize, allow_unqualified: bool) -> Result<(), CliError> {
    let options = CheckOptions {
        sql: read_input(sql)?,
        context_width,
        allow_unqualified,
    };
    cli::execute_check(&options)?;
    println!("Syntax is valid");
    Ok(())
}
