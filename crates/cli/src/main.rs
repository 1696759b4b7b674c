use crate::{commands::Commands, error::CliError};
use clap::Parser;
use connectors::{MemoryDirectory, SqliteDatasource};
use engine_config::CompilerSettings;
use expression_engine::{
    Compiler, Datasource, JsonRuleParser, MapResolver, Operand, RuleParser, ScopedResolver,
};
use grammar::Backend;
use model::{
    core::{value::Value, value_type::ValueType},
    records::record::Record,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;

#[derive(Parser)]
#[command(
    name = "filterc",
    version = "0.1.0",
    about = "Compiles expressions into SQL and LDAP filters"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<(), CliError> {
    // Logs go to stderr so filters and results stay pipeable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            backend,
            expr,
            settings,
            inline,
            resolvables,
            json,
        } => {
            let target =
                Backend::from_name(&backend).ok_or_else(|| CliError::UnknownBackend(backend))?;
            let mut settings = load_settings(settings.as_deref())?;
            settings.inline_literals |= inline;

            let expression = load_expression(&expr)?;
            let mut filter = Compiler::with_settings(settings).compile(expression, target)?;
            if let Some(path) = resolvables {
                filter.set_resolvables(load_resolvables(&path)?);
            }
            let resolved = filter.resolve(None, None)?;
            output::print_filter(&resolved, json)?;
        }
        Commands::Eval {
            expr,
            object,
            resolvables,
            settings,
        } => {
            let compiler = Compiler::with_settings(load_settings(settings.as_deref())?);
            let expression = load_expression(&expr)?;
            let resolvables = match resolvables {
                Some(path) => load_resolvables(&path)?,
                None => MapResolver::new(),
            };

            let value = match object {
                Some(path) => {
                    let scoped = ScopedResolver::new(
                        &compiler.settings().object_prefix,
                        Value::Object(load_object(&path)?),
                        &resolvables,
                    );
                    compiler.evaluate(&expression, &scoped, ValueType::Any)?
                }
                None => compiler.evaluate(&expression, &resolvables, ValueType::Any)?,
            };
            output::print_value(&value)?;
        }
        Commands::Query {
            expr,
            sqlite,
            table,
            directory,
            concat_function,
            attributes,
            settings,
        } => {
            let datasource = open_datasource(sqlite, table, directory, concat_function)?;
            let compiler = Compiler::with_settings(load_settings(settings.as_deref())?);
            let expression = load_expression(&expr)?;

            let filter = compiler.compile(expression, datasource.backend())?;
            let results = filter.query(datasource.as_ref(), &attributes, None)?;
            info!("{} matching objects", results.len());
            output::print_results(&results)?;
        }
        Commands::Functions => {
            output::print_functions(Compiler::new().registry());
        }
    }

    Ok(())
}

/// Settings from `path` when given, otherwise the defaults, then the
/// environment overrides.
fn load_settings(path: Option<&str>) -> Result<CompilerSettings, CliError> {
    let settings = match path {
        Some(path) => CompilerSettings::from_file(path)?,
        None => CompilerSettings::default(),
    };
    Ok(settings.with_env(|key| std::env::var(key).ok())?)
}

fn load_expression(path: &str) -> Result<Operand, CliError> {
    let source = std::fs::read_to_string(path)?;
    Ok(JsonRuleParser.parse(&source)?)
}

fn load_json(path: &str) -> Result<serde_json::Value, CliError> {
    let source = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&source)?)
}

fn to_record(json: serde_json::Value, what: &str) -> Result<Record, CliError> {
    match Value::from(json) {
        Value::Object(record) => Ok(record),
        other => Err(CliError::InvalidInput(format!(
            "{what} must be a JSON object, got {other:?}"
        ))),
    }
}

fn load_object(path: &str) -> Result<Record, CliError> {
    to_record(load_json(path)?, "the object")
}

fn load_resolvables(path: &str) -> Result<MapResolver, CliError> {
    let record = to_record(load_json(path)?, "resolvables")?;
    Ok(record
        .attributes()
        .fold(MapResolver::new(), |resolver, (base, value)| {
            resolver.with(base, value.clone())
        }))
}

fn open_datasource(
    sqlite: Option<String>,
    table: Option<String>,
    directory: Option<String>,
    concat_function: bool,
) -> Result<Box<dyn Datasource>, CliError> {
    match (sqlite, table, directory) {
        (Some(url), Some(table), None) => {
            let datasource = SqliteDatasource::connect(&url, &table)?;
            Ok(if concat_function {
                Box::new(datasource.with_concat_function())
            } else {
                Box::new(datasource)
            })
        }
        (None, _, Some(path)) => {
            let serde_json::Value::Array(entries) = load_json(&path)? else {
                return Err(CliError::InvalidInput(
                    "the directory file must hold a JSON array of entries".to_string(),
                ));
            };
            let mut directory = MemoryDirectory::new();
            for entry in entries {
                directory.add(to_record(entry, "a directory entry")?);
            }
            Ok(Box::new(directory))
        }
        _ => Err(CliError::InvalidInput(
            "query needs either --sqlite with --table, or --directory".to_string(),
        )),
    }
}
