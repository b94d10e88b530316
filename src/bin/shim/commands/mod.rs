use crate::args::QueryParams;
use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Password;
use fitness_shim::backend::Backend;
use fitness_shim::context::{Context, ContextName};
use fitness_shim::{cache, explain as explain_query, render_calls, render_rows, run, Error, Failure, Flow};

pub mod shell;

pub fn query(params: QueryParams, count: bool) -> Result<(), Error> {
    let (_, backend) = connect_current()?;

    let flow = flow(&params, count);
    let outcome = run(&backend, &flow, &params.sql, &params.params());

    print!("{}", render_rows(&outcome.rows));
    print_failures(&outcome.failures);

    Ok(())
}

/// Needs no context: explaining never talks to a backend.
pub fn explain(params: QueryParams, count: bool) {
    let flow = flow(&params, count);
    let explanation = explain_query(&flow, &params.sql, &params.params());

    print!("{}", render_calls(&explanation.calls));
    print_failures(&explanation.failures);
}

fn flow(params: &QueryParams, count: bool) -> Flow {
    match (&params.table, count) {
        (_, true) => Flow::Count,
        (Some(table), false) => Flow::SelectFrom(table.clone()),
        (None, false) => Flow::Select,
    }
}

pub fn connect_current() -> Result<(Context, Backend), Error> {
    let current_context = ContextName::current()?;
    let context: Context = cache::read(&current_context)?;

    let api_key = if context.needs_api_key() {
        Some(ask_for_api_key(&context)?)
    } else {
        None
    };

    let backend = context.connect(api_key)?;

    Ok((context, backend))
}

fn ask_for_api_key(context: &Context) -> Result<String, Error> {
    println!("Using context {}", context.name.to_string().bold().green());
    println!(
        "Please provide the API key for {}",
        context.backend.to_string().bold().green()
    );
    Ok(Password::with_theme(&ColorfulTheme::default())
        .with_prompt("API key: ")
        .interact()?)
}

pub fn print_failures(failures: &[Failure]) {
    for failure in failures {
        let intro = match failure {
            Failure::Parse(_) => "ignored".yellow(),
            Failure::Unsupported(_) => "unsupported".yellow(),
            Failure::Backend(_) => "backend".red(),
        };

        eprintln!("{}: {failure}", intro.bold());
    }
}
