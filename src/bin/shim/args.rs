use clap::{Parser, Subcommand};
use fitness_shim::context::{BackendParams, Context};
use fitness_shim::{Error, InternalError, Params};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Creates a context.
    ///
    /// Contexts allow the shim command to switch between different data sources: a Supabase
    /// project, or a JSON export of one.
    CreateContext(ContextParams),
    /// Selects an existing context.
    UseContext { name: String },
    /// List available contexts.
    ListContexts,
    /// Runs a query against the current context and prints the rows.
    Query(QueryParams),
    /// Counts the rows a query matches.
    Count(QueryParams),
    /// Prints the backend calls a query translates to, without running anything.
    Explain {
        #[command(flatten)]
        query: QueryParams,
        /// Explain the count version of the query
        #[arg(long)]
        count: bool,
    },
    /// Reads queries from stdin, one per line, and runs them. Results are remembered for the
    /// context's cache TTL.
    Shell {
        /// Always query this table, whatever the FROM clause says
        #[arg(long)]
        table: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
pub struct ContextParams {
    /// You can reuse your context by referencing this name
    name: String,

    /// Project URL of a Supabase or PostgREST server, e.g. https://abc.supabase.co
    #[arg(long, required_unless_present = "file", conflicts_with = "file")]
    url: Option<String>,
    /// Environment variable holding the API key. The key itself is never saved.
    #[arg(long, default_value = "SUPABASE_KEY")]
    api_key_env: String,
    /// JSON file with tables to query instead of a server: {"table": [{...}, ...]}
    #[arg(long)]
    file: Option<PathBuf>,
    /// How long the shell remembers query results, in seconds
    #[arg(long, default_value_t = 300)]
    cache_ttl: u64,
    /// Use the new context
    #[arg(long = "use")]
    pub use_it: bool,
}

#[derive(clap::Args, Debug)]
pub struct QueryParams {
    /// The SQL-like query, e.g. "SELECT * FROM gps_data WHERE speler = ? LIMIT 10"
    pub sql: String,
    /// Value for the next ? placeholder; can be repeated
    #[arg(short = 'p', long = "param")]
    positional: Vec<String>,
    /// Value for a :name placeholder, as name=value; can be repeated
    #[arg(short = 'n', long = "named", value_parser = parse_named, conflicts_with = "positional")]
    named: Vec<(String, String)>,
    /// Always query this table, whatever the FROM clause says
    #[arg(long)]
    pub table: Option<String>,
}

impl QueryParams {
    pub fn params(&self) -> Params {
        if !self.named.is_empty() {
            Params::named(self.named.iter().cloned())
        } else if !self.positional.is_empty() {
            Params::positional(self.positional.iter().cloned())
        } else {
            Params::None
        }
    }
}

fn parse_named(input: &str) -> Result<(String, String), String> {
    match input.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().trim_start_matches(':').to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got '{input}'")),
    }
}

impl TryFrom<ContextParams> for Context {
    type Error = Error;

    fn try_from(value: ContextParams) -> Result<Self, Self::Error> {
        let backend = match (value.url, value.file) {
            (Some(url), None) => BackendParams::Rest {
                url,
                api_key_env: value.api_key_env,
            },
            (None, Some(path)) => BackendParams::Memory { path },
            _ => Err(InternalError(
                "A context needs either --url or --file. See --help for more info".to_string(),
            ))?,
        };

        Ok(Context {
            name: value.name.into(),
            backend,
            cache_ttl_seconds: value.cache_ttl,
        })
    }
}
