//! sqlsieve CLI
//!
//! Runs filter/sort reads, constraint-aware writes and guarded deletes
//! against PostgreSQL or SQLite, or prints the SQL they compile to.

mod input;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use sqlsieve_core::{
    ConstraintSpec, DialectKind, Filter, Page, QueryCompiler, RowSet, Sort, SqlValue, Statement,
};
use sqlsieve_engine::{connect, AnyBackend, Engine, EngineConfig};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use crate::input::{json_arg, optional_json_arg};

/// Compile data-driven filters and upserts to SQL, and run them.
#[derive(Parser)]
#[command(name = "sqlsieve")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (postgres://... or sqlite:...).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Schema applied to table names without one.
    #[arg(short, long, env = "SQLSIEVE_SCHEMA")]
    schema: Option<String>,

    /// Wrap `like` values as `%value%`.
    #[arg(long)]
    auto_wildcard: bool,

    /// Normalize filter values with the column-name heuristics.
    #[arg(long)]
    normalize_filters: bool,

    /// Run write chunks one after another.
    #[arg(long)]
    sequential: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Run(Operation),

    /// Print the SQL an operation compiles to, without connecting.
    Compile {
        /// Dialect to compile for.
        #[arg(long, default_value = "postgres")]
        dialect: DialectKind,

        #[command(subcommand)]
        operation: Operation,
    },
}

#[derive(Subcommand)]
enum Operation {
    /// Fetch every matching row and the total count.
    Get(ReadArgs),

    /// Fetch one page of matching rows and the total count.
    List {
        #[command(flatten)]
        read: ReadArgs,

        /// Zero-based page number.
        #[arg(long, default_value_t = 0)]
        page: u64,

        /// Rows per page.
        #[arg(long, default_value_t = Page::DEFAULT_LIMIT)]
        limit: u64,
    },

    /// Count matching rows.
    Count(FilterArgs),

    /// Delete matching rows, or flag them with --soft-delete.
    Remove(FilterArgs),

    /// Insert records; a duplicate fails with the database error.
    Insert(WriteArgs),

    /// Insert records or update the rows they conflict with.
    Upsert(WriteArgs),

    /// Run raw SQL with positional parameters.
    Query {
        /// SQL text.
        sql: String,

        /// JSON array of parameters, or @file.
        #[arg(short, long)]
        params: Option<String>,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Table name, optionally schema-qualified.
    #[arg(short, long)]
    table: String,

    /// Filter as JSON (`[[["col", "op", value], ...], ...]`), or @file.
    #[arg(short, long)]
    filter: Option<String>,

    /// Soft-delete flag column.
    #[arg(long)]
    soft_delete: Option<String>,
}

#[derive(Args)]
struct ReadArgs {
    #[command(flatten)]
    filter: FilterArgs,

    /// Sort tokens; prefix with `-` for descending.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    sort: Vec<String>,
}

#[derive(Args)]
struct WriteArgs {
    /// Table name, optionally schema-qualified.
    #[arg(short, long)]
    table: String,

    /// A record or an array of records as JSON, or @file.
    #[arg(short, long)]
    data: String,

    /// Unique constraints as JSON (`["email", ["tenant_id", "slug"]]`), or @file.
    #[arg(short, long)]
    constraints: Option<String>,
}

impl FilterArgs {
    fn filter(&self) -> anyhow::Result<Filter> {
        let json = optional_json_arg(self.filter.as_deref())?;
        Filter::from_json(&json).context("invalid --filter")
    }
}

impl WriteArgs {
    fn data(&self) -> anyhow::Result<Value> {
        json_arg(&self.data)
    }

    fn constraints(&self) -> anyhow::Result<ConstraintSpec> {
        let json = optional_json_arg(self.constraints.as_deref())?;
        ConstraintSpec::from_json(&json).context("invalid --constraints")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = EngineConfig::from_env()?;
    if cli.sequential {
        config = config.sequential_chunks(true);
    }
    let mut options = config.compiler.clone();
    if let Some(schema) = &cli.schema {
        options = options.schema(schema.as_str());
    }
    if cli.auto_wildcard {
        options = options.auto_wildcard(true);
    }
    if cli.normalize_filters {
        options = options.normalize_filter_values(true);
    }
    config = config.compiler(options);

    match cli.command {
        Commands::Compile { dialect, operation } => {
            let compiler = QueryCompiler::new(dialect).with_options(config.compiler);
            for statement in compile(&compiler, &operation)? {
                println!("{};", statement.sql);
                for (i, value) in statement.params.iter().enumerate() {
                    println!("  -- {} = {}", i + 1, value.to_sql_inline());
                }
            }
        }
        Commands::Run(operation) => {
            let backend = connect(&cli.database, config.max_connections).await?;
            let engine = Engine::new(backend, config);
            let output = run(&engine, &operation).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

async fn run(engine: &Engine<AnyBackend>, operation: &Operation) -> anyhow::Result<Value> {
    let output = match operation {
        Operation::Get(args) => {
            let filter = args.filter.filter()?;
            let result = engine
                .get(
                    &args.filter.table,
                    &filter,
                    &Sort::parse(args.sort.as_slice()),
                    args.filter.soft_delete.as_deref(),
                )
                .await?;
            serde_json::to_value(result)?
        }
        Operation::List { read, page, limit } => {
            let filter = read.filter.filter()?;
            let result = engine
                .list(
                    &read.filter.table,
                    &filter,
                    &Sort::parse(read.sort.as_slice()),
                    read.filter.soft_delete.as_deref(),
                    Page::new(*page, *limit),
                )
                .await?;
            serde_json::to_value(result)?
        }
        Operation::Count(args) => {
            let filter = args.filter()?;
            let count = engine
                .count(&args.table, &filter, args.soft_delete.as_deref())
                .await?;
            Value::from(count)
        }
        Operation::Remove(args) => {
            let filter = args.filter()?;
            let result = engine
                .remove(&args.table, &filter, args.soft_delete.as_deref())
                .await?;
            serde_json::to_value(result)?
        }
        Operation::Insert(args) => {
            let result = engine
                .insert(&args.table, &args.data()?, &args.constraints()?)
                .await?;
            serde_json::to_value(result)?
        }
        Operation::Upsert(args) => {
            let result = engine
                .upsert(&args.table, &args.data()?, &args.constraints()?)
                .await?;
            serde_json::to_value(result)?
        }
        Operation::Query { sql, params } => {
            let rows = engine.query(sql, &query_params(params.as_deref())?).await?;
            Value::Array(rows.into_iter().map(Value::Object).collect())
        }
    };
    Ok(output)
}

fn compile(compiler: &QueryCompiler, operation: &Operation) -> anyhow::Result<Vec<Statement>> {
    let statements = match operation {
        Operation::Get(args) => vec![compiler.select(
            &args.filter.table,
            &args.filter.filter()?,
            &Sort::parse(args.sort.as_slice()),
            args.filter.soft_delete.as_deref(),
            None,
        )?],
        Operation::List { read, page, limit } => vec![compiler.select(
            &read.filter.table,
            &read.filter.filter()?,
            &Sort::parse(read.sort.as_slice()),
            read.filter.soft_delete.as_deref(),
            Some(Page::new(*page, *limit)),
        )?],
        Operation::Count(args) => {
            vec![compiler.count(&args.table, &args.filter()?, args.soft_delete.as_deref())?]
        }
        Operation::Remove(args) => {
            vec![compiler.delete(&args.table, &args.filter()?, args.soft_delete.as_deref())?]
        }
        Operation::Insert(args) => {
            let rows = RowSet::from_json(&args.data()?)?;
            compiler.insert(&args.table, &rows)?.statements
        }
        Operation::Upsert(args) => {
            let rows = RowSet::from_json(&args.data()?)?;
            compiler.upsert(&args.table, &rows, &args.constraints()?)?.statements
        }
        Operation::Query { sql, params } => {
            let params = query_params(params.as_deref())?;
            vec![compiler.raw(sql.as_str(), params.iter().map(SqlValue::from).collect())]
        }
    };
    debug!(statements = statements.len(), dialect = %compiler.kind(), "compiled");
    Ok(statements)
}

/// `--params`: absent, or a JSON array.
fn query_params(raw: Option<&str>) -> anyhow::Result<Vec<Value>> {
    match optional_json_arg(raw)? {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        other => anyhow::bail!("--params must be a JSON array, got {other}"),
    }
}
