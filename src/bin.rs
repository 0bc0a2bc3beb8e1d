use std::fs;
use std::io::Read;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use ifjcompiler::prelude::*;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, help = "Source file to compile (standard input when omitted)")]
    input: Option<String>,
    #[arg(short, long, help = "File to write the generated code to (standard output when omitted)")]
    output: Option<String>,
    #[arg(long, help = "Print the analysed AST to standard error")]
    dump_ast: bool,
    #[arg(long, help = "Disable constant folding and dead-code elimination")]
    no_optimize: bool,
}

fn main() -> ExitCode {
    colog::init();

    let args = Args::parse();

    let source = match &args.input {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).map(|_| text)
        }
    };
    let source = match source {
        Ok(source) => source,
        Err(e) => {
            error!("cannot read input: {}", e);
            return ExitCode::from(99);
        }
    };

    info!("compiling {}", args.input.as_deref().unwrap_or("<stdin>"));
    match ifjcompiler::compile_with_ast(&source, !args.no_optimize) {
        Ok((code, ast)) => {
            if args.dump_ast {
                eprintln!("{}", ast);
            }
            let written = match &args.output {
                Some(path) => fs::write(path, code).map_err(|e| e.to_string()),
                None => {
                    print!("{}", code);
                    Ok(())
                }
            };
            if let Err(e) = written {
                error!("cannot write output: {}", e);
                return ExitCode::from(99);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
