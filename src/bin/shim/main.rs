mod args;
mod commands;

use crate::args::{Command, ContextParams};
use args::Args;
use clap::Parser;
use colored::Colorize;
use fitness_shim::cache;
use fitness_shim::context::{Context, ContextName};
use fitness_shim::Flow;
use std::process::exit;

fn main() {
    env_logger::init();

    let args = Args::parse();

    let result = match args.command {
        Command::CreateContext(context) => create_context(context),
        Command::UseContext { name } => use_context(name),
        Command::ListContexts => list_contexts(),
        Command::Query(query) => commands::query(query, false),
        Command::Count(query) => commands::query(query, true),
        Command::Explain { query, count } => {
            commands::explain(query, count);
            Ok(())
        }
        Command::Shell { table } => commands::shell::run(table.map(Flow::SelectFrom)),
    };

    // Query problems are printed as notices and never end up here; only setup errors do.
    if let Err(error) = result {
        eprintln!("{intro}: {error}", intro = "error".bold().red());
        exit(1);
    }
}

fn create_context(params: ContextParams) -> Result<(), fitness_shim::Error> {
    let use_it = params.use_it;
    let new_context: Context = params.try_into()?;

    cache::write(&new_context)?;

    println!("Create new context \x1b[1m{}\x1b[0m.", new_context.name);

    if use_it {
        use_context(new_context.name.into())?;
    } else {
        println!(
            "Switch to it by running \x1b[1mshim use-context {}\x1b[0m.",
            new_context.name
        );
    }

    Ok(())
}

fn use_context(name: String) -> Result<(), fitness_shim::Error> {
    let context_name: ContextName = name.into();

    // make sure it exists before switching to it
    let _: Context = cache::read(&context_name)?;

    cache::write(&context_name)?;

    println!("Switched to context \x1b[1m{}\x1b[0m.", context_name);

    Ok(())
}

fn list_contexts() -> Result<(), fitness_shim::Error> {
    let current_context = ContextName::current().ok();
    let known_contexts: Vec<Context> = cache::read_all()?;

    println!("Available contexts:");
    for context in &known_contexts {
        println!(
            "{}{}: {}",
            if current_context.as_ref() == Some(&context.name) {
                " * ".bold()
            } else {
                "   ".into()
            },
            context.name.to_string().bold(),
            context.backend,
        )
    }

    Ok(())
}
