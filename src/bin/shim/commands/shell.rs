//! A read-eval-print loop over stdin.
//!
//! Every line is a query. Lines starting with `count ` run the count flow. Repeated queries are
//! answered from memory until the context's TTL runs out.
use crate::commands::{connect_current, print_failures};
use colored::Colorize;
use fitness_shim::cache::memo::QueryCache;
use fitness_shim::{render_rows, Error, Flow, Params};
use std::io::{BufRead, Write};

pub fn run(pinned: Option<Flow>) -> Result<(), Error> {
    let (context, backend) = connect_current()?;
    let mut memo = QueryCache::new(context.cache_ttl());

    println!(
        "Querying {}. One query per line, {} to quit.",
        context.name.to_string().bold().green(),
        "<ctrl-d>".bold()
    );

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (flow, input) = match line.strip_prefix("count ") {
            Some(input) => (Flow::Count, input),
            None => (pinned.clone().unwrap_or(Flow::Select), line),
        };

        memo.evict_expired();
        let outcome = memo.fetch(&backend, &flow, input, &Params::None);

        print!("{}", render_rows(&outcome.rows));
        print_failures(&outcome.failures);
    }

    Ok(())
}
