mod cli;

use hcl::eval::Evaluate;
use hinv::value::{Data, Value};

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("HINV_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Resolve(resolve_cli) => resolve(resolve_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn resolve(cli: cli::ResolveCommand) -> anyhow::Result<()> {
    let override_data = cli
        .data
        .iter()
        .map(|(key, value)| Ok((key.clone(), parse_data_value(value)?)))
        .collect::<anyhow::Result<Data>>()?;

    let mut options = hinv::ResolveOptions::default()
        .with_override_data(override_data)
        .with_cwd(std::env::current_dir()?);
    for directory in cli.group_data {
        options = options.with_group_data_directory(directory);
    }

    let registry = hinv::function::FunctionRegistry::new();
    let lookup = hinv::source::SystemLookup::default();
    let inventory = hinv::Resolver::new(&registry, &lookup).make_inventory(&cli.inventory, &options)?;

    match &cli.host {
        Some(host) => {
            let data = inventory
                .get_host_data(host)
                .ok_or_else(|| anyhow::anyhow!("Host {host} is not part of the inventory"))?;
            output(&cli.output, &data)
        }
        None => output(&cli.output, &inventory),
    }
}

/// `--data` values are HCL expressions, anything that does not parse is a string
fn parse_data_value(raw: &str) -> anyhow::Result<Value> {
    let Ok(expr) = raw.parse::<hcl_edit::expr::Expression>() else {
        return Ok(Value::from(raw));
    };

    let expr: hcl::Expression = expr.into();
    match expr.evaluate(&hcl::eval::Context::new()) {
        Ok(value) => Ok(Value::try_from(value)?),
        Err(err) => {
            tracing::debug!(value = raw, error = %err, "Treating data value as string");
            Ok(Value::from(raw))
        }
    }
}

fn output(output: &cli::OutputArgs, value: &impl serde::Serialize) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), value)?,
    };

    Ok(())
}

/// (hinv-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: cli::DevCommand) -> anyhow::Result<()> {
    use cli::DevSubCommand::*;

    match cli.command {
        Document { file } => {
            let document = hinv::hcl_document::HclDocument::load_file(&file)?;
            println!("{document:#?}");
        }
        Bindings { file, output: out } => {
            let document = hinv::hcl_document::HclDocument::load_file(&file)?;
            let bindings = document.evaluate(&hcl::eval::Context::new())?;
            output(&out, &bindings)?;
        }
    }

    Ok(())
}
