//! Ember demo runner
//!
//! Usage:
//!   ember                 - Run every sample program
//!   ember run <name>      - Run one sample program
//!   ember list            - List the sample programs
//!   ember help            - Show help message
//!
//! Set RUST_LOG (e.g. `RUST_LOG=ember=trace`) to watch calls, launches and links.

mod demos;

use std::env;
use std::process;

use colored::Colorize;
use tracing_subscriber::EnvFilter;

use ember::{Interpreter, VERSION};

use demos::{Demo, DEMOS};

fn main() {
    install_tracing();
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        None | Some("all") => {
            let failures = DEMOS.iter().filter(|demo| !run_demo(demo)).count();
            if failures > 0 {
                process::exit(1);
            }
        }
        Some("run") => {
            let Some(name) = args.get(2) else {
                eprintln!("{}: missing demo name", "error".red());
                eprintln!("Usage: ember run <name>");
                process::exit(1);
            };
            match demos::find(name) {
                Some(demo) => {
                    if !run_demo(demo) {
                        process::exit(1);
                    }
                }
                None => {
                    eprintln!("{}: unknown demo '{}'", "error".red(), name);
                    list_demos();
                    process::exit(1);
                }
            }
        }
        Some("list") => list_demos(),
        Some("help" | "--help" | "-h") => print_help(),
        Some("version" | "--version" | "-v") => println!("Ember {}", VERSION),
        Some(other) => {
            eprintln!("{}: unknown command '{}'", "error".red(), other);
            print_help();
            process::exit(1);
        }
    }
}

fn install_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn print_help() {
    println!("{}", "Ember".cyan().bold());
    println!("Execution core demo runner");
    println!("{} {}\n", "Version".cyan(), VERSION);
    println!("{}", "USAGE:".yellow());
    println!("  ember                 Run every sample program");
    println!("  ember run <name>      Run one sample program");
    println!("  ember list            List the sample programs");
    println!("  ember help            Show this help message");
    println!("  ember version         Show version\n");
    list_demos();
}

fn list_demos() {
    println!("{}", "DEMOS:".yellow());
    for demo in DEMOS {
        println!("  {:<12} {}", demo.name, demo.about);
    }
}

/// Build and run one sample in a fresh interpreter. Returns false on failure.
fn run_demo(demo: &Demo) -> bool {
    let interp = Interpreter::new();
    let result = (demo.build)(&interp.builder()).and_then(|tree| interp.run_blocking(&tree));

    match result {
        Ok(value) => {
            println!("{} {} {:?}", demo.name.cyan().bold(), "=>".dimmed(), value);
            true
        }
        Err(e) => {
            eprintln!("{} {} {}", demo.name.cyan().bold(), "error:".red(), e);
            false
        }
    }
}
