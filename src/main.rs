use std::process;

use clap::Parser;
use parley::{compiler, Source};
use tracing_subscriber::EnvFilter;

mod cli;

use crate::cli::{play::play, status::Status, Args, Emit};

fn run(args: Args) -> Result<(), String> {
    let source = Source::path(&args.path)
        .map_err(|e| format!("Could not read '{}': {}", args.path.display(), e))?;

    let program = compiler::compile(&source).map_err(|e| e.to_string())?;

    if args.check {
        Status::success().log(&format!(
            "'{}' compiled to {} instructions",
            args.path.display(),
            program.code.len()
        ));
        return Ok(());
    }

    if args.dump {
        print!("{}", program.dump());
        return Ok(());
    }

    if let Some(Emit::Json) = args.emit {
        let json = serde_json::to_string_pretty(&program).map_err(|e| e.to_string())?;
        println!("{}", json);
        return Ok(());
    }

    play(program)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(message) = run(args) {
        Status::fatal().log(&message);
        process::exit(1);
    }
}
