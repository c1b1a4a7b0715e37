//! Domain-based deploy tool demo.
//!
//! Demonstrates domains (subcommand-like modes), a shared constraint
//! fragment, environment fallback, and the schema snapshot.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p declargs-demos --example deploy_tool -- build --target x86_64 --out dist/
//! cargo run -p declargs-demos --example deploy_tool -- deploy --out dist/ --env prod
//! cargo run -p declargs-demos --example deploy_tool -- --describe
//! ```

use declargs_core::{ConfigError, Schema, ValueSource};

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

    let describe = schema
        .option(&["--describe"])
        .bool()
        .help("print the schema as JSON and exit")
        .finish()?;
    let verbose = schema
        .option(&["-v", "--verbose"])
        .bool()
        .list()
        .finish()?;
    let out = schema
        .option(&["--out"])
        .string()
        .from_env("DEPLOY_OUT")
        .help("artifact directory")
        .finish()?;

    // Both build and deploy need an output location.
    let common = schema.fragment("needs-out").required(out.id()).finish()?;

    let build = schema
        .domain("build")
        .alias("b")
        .label("Build")
        .help("compile the project")
        .inherit(common)
        .finish()?;
    let deploy = schema
        .domain("deploy")
        .alias("d")
        .label("Deploy")
        .help("push artifacts to an environment")
        .inherit(common)
        .finish()?;
    schema.domain("clean").help("remove build artifacts").finish()?;

    let target = schema
        .option(&["--target"])
        .string()
        .only_in_domains(&[build])
        .finish()?;
    let environment = schema
        .option(&["--env"])
        .one_of(&["dev", "staging", "prod"])
        .only_in_domains(&[deploy])
        .finish()?;
    let force = schema
        .option(&["--force"])
        .bool()
        .only_in_domains(&[deploy])
        .finish()?;

    // Pushing to prod needs an explicit --force.
    schema
        .constrain(deploy)
        .require_if_value::<String, _>(force.id(), environment.id(), |env| env.as_str() == "prod")?;

    let Some(matches) = schema.parse_or_report(args, |err| {
        eprintln!("{}", schema.render_error(err).text());
    }) else {
        std::process::exit(2);
    };

    if describe.get(&matches) == Some(true) {
        let json = serde_json::to_string_pretty(&schema.snapshot())
            .unwrap_or_else(|_| "{}".to_string());
        println!("{json}");
        return Ok(());
    }

    let verbosity = verbose.get(&matches).len();
    match matches.domain_name() {
        Some("build") => {
            println!(
                "building target {:?} into {:?} (verbosity {verbosity})",
                target.get(&matches).unwrap_or_else(|| "host".to_string()),
                out.get(&matches).unwrap_or_default(),
            );
        }
        Some("deploy") => {
            let out_dir = out.get(&matches).unwrap_or_default();
            let via_env = matches.source_of(out.id()) == ValueSource::Environment;
            println!(
                "deploying {out_dir:?}{} to {}",
                if via_env { " (from DEPLOY_OUT)" } else { "" },
                environment.get(&matches).unwrap_or_else(|| "dev".to_string()),
            );
        }
        Some("clean") => println!("cleaning"),
        _ => println!("no domain selected; try `build`, `deploy`, or `clean`"),
    }
    Ok(())
}
