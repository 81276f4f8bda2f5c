use std::{env, process};

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod cli;

use crate::cli::{CliError, Command};

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("metrics-churn");
    let opts = cli::opts();

    let builder = match cli::parse(&opts, args.get(1..).unwrap_or_default()) {
        Ok(Command::Help) => {
            print!("{}", cli::usage(program, &opts));
            return;
        }
        Ok(Command::Serve(builder)) => builder,
        Err(e) => exit_with(program, &opts, &e),
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start runtime");
            process::exit(1);
        }
    };

    let result = runtime.block_on(async move {
        let (_store, exporter) = builder.build()?;
        exporter.await?;
        Ok::<_, Box<dyn std::error::Error>>(())
    });

    if let Err(e) = result {
        error!(error = %e, "load generator stopped");
        process::exit(1);
    }

    info!("load generator stopped");
}

fn exit_with(program: &str, opts: &getopts::Options, e: &CliError) -> ! {
    if e.wants_usage() {
        eprint!("{}", cli::usage(program, opts));
    }
    error!("error: {}", e);
    process::exit(e.exit_code());
}
