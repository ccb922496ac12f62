//! Relationship view handler.

use tabled::Tabled;

use atelier_core::{EntityKind, Hub, RelationshipView};

use crate::cli::{GlobalOpts, RelationshipsArgs};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct RelationshipRow {
    #[tabled(rename = "Connection")]
    id: String,
    #[tabled(rename = "Client")]
    client: String,
    #[tabled(rename = "Instrument")]
    instrument: String,
    #[tabled(rename = "Relationship")]
    relationship: String,
}

impl RelationshipRow {
    fn new(view: &RelationshipView, color: bool) -> Self {
        Self {
            id: view.connection.id.to_string(),
            client: view.client.full_name(),
            instrument: view.instrument.display_name(),
            relationship: output::paint_relationship(&view.connection.relationship_type, color),
        }
    }
}

pub async fn handle(
    hub: &Hub,
    args: RelationshipsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    hub.ensure_loaded_many(&EntityKind::ALL).await?;

    let views = match (args.client, args.instrument) {
        (Some(client), _) => hub.relationships_for_client(&util::parse_id(&client, "client")?),
        (None, Some(instrument)) => {
            hub.relationships_for_instrument(&util::parse_id(&instrument, "instrument")?)
        }
        (None, None) => hub.client_relationships().as_ref().clone(),
    };

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &views,
        |v| RelationshipRow::new(v, color),
        |v| v.connection.id.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
