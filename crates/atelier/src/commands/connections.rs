//! Connection command handlers.

use std::sync::Arc;

use tabled::Tabled;

use atelier_core::{
    Connection, ConnectionFilter, ConnectionPatch, EntityId, EntityKind, Hub, NewConnection,
    RelationshipType,
};

use crate::cli::{ConnectionsArgs, ConnectionsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ConnectionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Client")]
    client: String,
    #[tabled(rename = "Instrument")]
    instrument: String,
    #[tabled(rename = "Relationship")]
    relationship: String,
    #[tabled(rename = "#")]
    order: i64,
}

impl ConnectionRow {
    fn new(c: &Arc<Connection>, color: bool) -> Self {
        Self {
            id: c.id.to_string(),
            client: c.client_id.as_ref().map(ToString::to_string).unwrap_or_default(),
            instrument: c
                .instrument_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            relationship: output::paint_relationship(&c.relationship_type, color),
            order: c.display_order,
        }
    }
}

fn detail(c: &Arc<Connection>) -> String {
    let id_or_dash = |id: Option<&EntityId>| {
        id.map_or_else(|| "-".to_owned(), ToString::to_string)
    };
    let mut lines = vec![
        format!("ID:           {}", c.id),
        format!("Client:       {}", id_or_dash(c.client_id.as_ref())),
        format!("Instrument:   {}", id_or_dash(c.instrument_id.as_ref())),
        format!("Relationship: {}", c.relationship_type),
        format!("Order:        {}", c.display_order),
    ];
    if let Some(notes) = &c.notes {
        lines.push(format!("Notes:        {notes}"));
    }
    lines.join("\n")
}

fn print_one(connection: &Arc<Connection>, global: &GlobalOpts) {
    let out = output::render_single(&global.output, connection, detail, |c| c.id.to_string());
    output::print_output(&out, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(
    hub: &Hub,
    args: ConnectionsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        ConnectionsCommand::List {
            list,
            client,
            instrument,
            relationship,
            orphaned,
        } => {
            let mut filters = Vec::new();
            if let Some(client) = client {
                filters.push(ConnectionFilter::ByClient(util::parse_id(
                    &client, "client",
                )?));
            }
            if let Some(instrument) = instrument {
                filters.push(ConnectionFilter::ByInstrument(util::parse_id(
                    &instrument,
                    "instrument",
                )?));
            }
            if let Some(relationship) = relationship {
                filters.push(ConnectionFilter::ByRelationship(relationship.into()));
            }
            if orphaned {
                filters.push(ConnectionFilter::Orphaned);
            }

            let mut connections =
                util::list_records(hub, hub.connection_repository(), &list).await?;
            connections.retain(|c| filters.iter().all(|f| f.matches(c)));

            let out = output::render_list(
                &global.output,
                &connections,
                |c| ConnectionRow::new(c, color),
                |c| c.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConnectionsCommand::Get { id } => {
            let connection = util::find_record::<Connection>(hub, &id).await?;
            print_one(&connection, global);
            Ok(())
        }

        ConnectionsCommand::Create {
            client,
            instrument,
            relationship,
            notes,
            order,
        } => {
            let input = NewConnection {
                client_id: util::parse_id(&client, "client")?,
                instrument_id: util::parse_id(&instrument, "instrument")?,
                relationship_type: RelationshipType::from(relationship),
                notes,
                display_order: order,
            };
            let created = hub.create_connection(input).await?;
            print_one(&created, global);
            Ok(())
        }

        ConnectionsCommand::Update {
            id,
            relationship,
            notes,
            order,
        } => {
            let id = util::parse_id(&id, "id")?;
            let patch = ConnectionPatch {
                relationship_type: relationship.map(RelationshipType::from),
                notes,
                display_order: order,
                ..ConnectionPatch::default()
            };
            let updated = hub.update_connection(&id, patch).await?;
            print_one(&updated, global);
            Ok(())
        }

        ConnectionsCommand::Delete { id } => {
            let id = util::parse_id(&id, "id")?;
            if !util::confirm(&format!("Delete connection {id}?"), global.yes)? {
                return Ok(());
            }
            hub.delete_connection(&id).await?;
            if !global.quiet {
                eprintln!("Deleted connection {id}");
            }
            Ok(())
        }

        ConnectionsCommand::Reorder { ids } => {
            let ids = ids
                .iter()
                .map(|raw| util::parse_id(raw, "id"))
                .collect::<Result<Vec<_>, _>>()?;
            hub.load(EntityKind::Connections).await?;
            let updated = hub.reorder_connections(&ids).await?;
            let out = output::render_list(
                &global.output,
                &updated,
                |c| ConnectionRow::new(c, color),
                |c| c.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
