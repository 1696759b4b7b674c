use crate::error::CliError;
use expression_engine::{FunctionId, FunctionRegistry, ResolvedFilter};
use grammar::BackendKind;
use model::{core::value::Value, records::record::ResultSet};
use serde_json::json;

fn print_json(json: &serde_json::Value) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(json).map_err(CliError::JsonSerialize)?;
    println!("{text}");
    Ok(())
}

pub fn print_filter(resolved: &ResolvedFilter, as_json: bool) -> Result<(), CliError> {
    if !as_json {
        println!("{}", resolved.statement.text);
        for (i, param) in resolved.statement.params.iter().enumerate() {
            println!("  ${} = {param}", i + 1);
        }
        for postprocessor in &resolved.postprocessors {
            println!("  then {}({:?})", postprocessor.name, postprocessor.data);
        }
        return Ok(());
    }

    print_json(&json!({
        "filter": resolved.statement.text,
        "params": resolved.statement.params.iter().map(Value::to_json).collect::<Vec<_>>(),
        "postprocessors": resolved
            .postprocessors
            .iter()
            .map(|p| json!({
                "name": p.name,
                "data": p.data.as_ref().map(Value::to_json),
            }))
            .collect::<Vec<_>>(),
    }))
}

pub fn print_value(value: &Value) -> Result<(), CliError> {
    print_json(&value.to_json())
}

pub fn print_results(results: &ResultSet) -> Result<(), CliError> {
    let rows = results
        .iter()
        .map(|record| Value::Object(record.clone()).to_json())
        .collect::<Vec<_>>();
    print_json(&serde_json::Value::Array(rows))
}

pub fn print_functions(registry: &FunctionRegistry) {
    println!("{:<16} {:<8} {}", "Function", "Arity", "Backends");
    for name in registry.function_names() {
        let Some(id) = FunctionId::from_name(name) else {
            continue;
        };
        let backends = [BackendKind::Relational, BackendKind::Directory]
            .into_iter()
            .filter(|kind| id.supported_backends().supports(*kind))
            .map(|kind| kind.to_string())
            .collect::<Vec<_>>();
        let backends = if backends.is_empty() {
            "in-process only".to_string()
        } else {
            backends.join(", ")
        };
        println!("{:<16} {:<8} {backends}", name, id.arity().to_string());
    }
}
