//! Operations command - List the operation tree with rate-limit groups

use anyhow::{Context as _, Result};
use octopace_client::{endpoints, ThrottledClient};
use octopace_core::ports::Entry;
use serde::Serialize;
use serde_json::{json, Value};

use super::Context;

/// Arguments for the operations subcommand
#[derive(Debug, clap::Args)]
pub struct OperationsCommand {
    /// Only list this namespace
    #[arg(long)]
    pub namespace: Option<String>,
}

/// One line of the listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationRow {
    pub namespace: String,
    pub name: String,
    pub group: String,
    pub interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Non-callable entry of the tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueRow {
    pub namespace: String,
    pub name: String,
    pub value: Value,
}

impl OperationsCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let client = ThrottledClient::from_config(&ctx.config).context("Failed to build client")?;
        let (operations, values) = list_entries(&client, self.namespace.as_deref());

        let formatter = ctx.format.formatter();
        if ctx.format.is_json() {
            formatter.result(&json!({"operations": operations, "values": values}));
            return Ok(());
        }

        if operations.is_empty() && values.is_empty() {
            formatter.error("No matching operations");
            return Ok(());
        }

        let width = operations
            .iter()
            .map(|row| row.namespace.len() + row.name.len() + 1)
            .max()
            .unwrap_or(0);
        for row in &operations {
            let id = format!("{}.{}", row.namespace, row.name);
            println!(
                "{:<width$}  {:<8} {:>6}ms  {:<6} {}",
                id,
                row.group,
                row.interval_ms,
                row.method.as_deref().unwrap_or("-"),
                row.path.as_deref().unwrap_or("-"),
                width = width,
            );
        }
        for row in &values {
            println!("{}.{} = {}", row.namespace, row.name, row.value);
        }
        Ok(())
    }
}

/// Walks the client's tree, optionally restricted to one namespace
pub fn list_entries(
    client: &ThrottledClient,
    namespace: Option<&str>,
) -> (Vec<OperationRow>, Vec<ValueRow>) {
    let mut operations = Vec::new();
    let mut values = Vec::new();

    for (ns, entries) in client.tree().namespaces() {
        if namespace.is_some_and(|wanted| wanted != ns) {
            continue;
        }
        for (name, entry) in entries.entries() {
            match entry {
                Entry::Operation(_) => {
                    let group = client.group_of(ns, name);
                    let interval = client.registry().interval_for(&group);
                    let endpoint = endpoints::find(ns, name);
                    operations.push(OperationRow {
                        namespace: ns.to_string(),
                        name: name.to_string(),
                        group: group.to_string(),
                        interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
                        method: endpoint.map(|e| e.method.to_string()),
                        path: endpoint.map(|e| e.path.to_string()),
                    });
                }
                Entry::Value(value) => values.push(ValueRow {
                    namespace: ns.to_string(),
                    name: name.to_string(),
                    value: value.clone(),
                }),
            }
        }
    }

    (operations, values)
}
