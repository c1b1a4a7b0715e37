//! Compiler-style defines demo.
//!
//! Demonstrates key-value sets with last-write-wins keys, boolean negation,
//! occurrence counting, and arity groups.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p declargs-demos --example defines -- -D host=localhost -D host=prod -vv --no-color in.c
//! cargo run -p declargs-demos --example defines -- --map 1 one --map 2 two in.c
//! ```

use declargs_core::{ConfigError, Schema};

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => {}
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn run(args: &[String]) -> Result<(), ConfigError> {
    let mut schema = Schema::new();

    let defines = schema
        .option(&["-D", "--define"])
        .key_value()
        .help("preprocessor define; later values win per key")
        .set()
        .finish()?;
    let verbose = schema.option(&["-v", "--verbose"]).bool().list().finish()?;
    let color = schema
        .option(&["--color"])
        .bool()
        .negatable()
        .default(true)
        .finish()?;
    let maps = schema
        .option(&["--map"])
        .string()
        .list()
        .arity(2)
        .finish()?;
    let inputs = schema
        .positional("inputs")
        .string()
        .list()
        .at_least(1)
        .finish()?;

    let Some(matches) = schema.parse_or_report(args, |err| {
        eprintln!("{}", schema.render_error(err).text());
    }) else {
        std::process::exit(2);
    };

    println!("verbosity: {}", verbose.get(&matches).len());
    println!("color: {}", color.get(&matches));
    for define in defines.get(&matches) {
        println!("define: {define}");
    }
    for pair in maps.get(&matches) {
        println!("map: {} -> {}", pair[0], pair[1]);
    }
    for input in inputs.get(&matches) {
        println!("input: {input}");
    }
    Ok(())
}
