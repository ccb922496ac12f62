//! Cross-kind search handler.

use atelier_core::{EntityKind, Hub, SearchResults};

use crate::cli::{GlobalOpts, SearchArgs};
use crate::error::CliError;
use crate::output;

fn summary(results: &SearchResults) -> String {
    let mut lines = Vec::with_capacity(results.total + 1);
    for c in &results.clients {
        lines.push(format!("client      {}  {}", c.id, c.full_name()));
    }
    for i in &results.instruments {
        lines.push(format!("instrument  {}  {}", i.id, i.display_name()));
    }
    for c in &results.connections {
        lines.push(format!("connection  {}  {}", c.id, c.relationship_type));
    }
    lines.push(format!("{} match(es)", results.total));
    lines.join("\n")
}

fn ids(results: &SearchResults) -> String {
    results
        .clients
        .iter()
        .map(|c| c.id.to_string())
        .chain(results.instruments.iter().map(|i| i.id.to_string()))
        .chain(results.connections.iter().map(|c| c.id.to_string()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn handle(hub: &Hub, args: SearchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    hub.ensure_loaded_many(&EntityKind::ALL).await?;
    let results = hub.search_all(&args.query);

    let out = output::render_single(&global.output, &results, summary, ids);
    output::print_output(&out, global.quiet);
    Ok(())
}
