//! Client command handlers.

use std::sync::Arc;

use tabled::Tabled;

use atelier_core::{Client, ClientFilter, ClientPatch, Hub, NewClient};

use crate::cli::{ClientFields, ClientsArgs, ClientsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Number")]
    number: String,
    #[tabled(rename = "Tags")]
    tags: String,
}

impl From<&Arc<Client>> for ClientRow {
    fn from(c: &Arc<Client>) -> Self {
        Self {
            id: c.id.to_string(),
            name: c.full_name(),
            email: c.email.clone().unwrap_or_default(),
            number: c.client_number.clone().unwrap_or_default(),
            tags: c.tags.join(", "),
        }
    }
}

fn detail(c: &Arc<Client>) -> String {
    let mut lines = vec![
        format!("ID:        {}", c.id),
        format!("Name:      {}", util::or_dash(Some(c.full_name().as_str()))),
        format!("Email:     {}", util::or_dash(c.email.as_deref())),
        format!("Phone:     {}", util::or_dash(c.contact_number.as_deref())),
        format!("Number:    {}", util::or_dash(c.client_number.as_deref())),
        format!("Interest:  {}", util::or_dash(c.interest.as_deref())),
    ];
    if !c.tags.is_empty() {
        lines.push(format!("Tags:      {}", c.tags.join(", ")));
    }
    if let Some(note) = &c.note {
        lines.push(format!("Note:      {note}"));
    }
    if let Some(created) = c.created_at {
        lines.push(format!("Created:   {}", created.format("%Y-%m-%d %H:%M")));
    }
    lines.join("\n")
}

impl From<ClientFields> for NewClient {
    fn from(f: ClientFields) -> Self {
        Self {
            first_name: f.first_name,
            last_name: f.last_name,
            email: f.email,
            contact_number: f.contact_number,
            tags: f.tags.unwrap_or_default(),
            interest: f.interest,
            note: f.note,
            client_number: f.client_number,
        }
    }
}

impl From<ClientFields> for ClientPatch {
    fn from(f: ClientFields) -> Self {
        Self {
            first_name: f.first_name,
            last_name: f.last_name,
            email: f.email,
            contact_number: f.contact_number,
            tags: f.tags,
            interest: f.interest,
            note: f.note,
            client_number: f.client_number,
        }
    }
}

fn print_one(client: &Arc<Client>, global: &GlobalOpts) {
    let out = output::render_single(&global.output, client, detail, |c| c.id.to_string());
    output::print_output(&out, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(hub: &Hub, args: ClientsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ClientsCommand::List {
            list,
            tag,
            with_email,
        } => {
            let mut filters = Vec::new();
            if let Some(tag) = tag {
                filters.push(ClientFilter::Tagged(tag));
            }
            if with_email {
                filters.push(ClientFilter::WithEmail);
            }
            let mut clients = util::list_records(hub, hub.client_repository(), &list).await?;
            clients.retain(|c| filters.iter().all(|f| f.matches(c)));

            let out = output::render_list(
                &global.output,
                &clients,
                |c| ClientRow::from(c),
                |c| c.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ClientsCommand::Get { id } => {
            let client = util::find_record::<Client>(hub, &id).await?;
            print_one(&client, global);
            Ok(())
        }

        ClientsCommand::Create(fields) => {
            let created = hub.create_client(fields.into()).await?;
            print_one(&created, global);
            Ok(())
        }

        ClientsCommand::Update { id, fields } => {
            let id = util::parse_id(&id, "id")?;
            let updated = hub.update_client(&id, fields.into()).await?;
            print_one(&updated, global);
            Ok(())
        }

        ClientsCommand::Delete { id } => {
            let id = util::parse_id(&id, "id")?;
            if !util::confirm(&format!("Delete client {id}?"), global.yes)? {
                return Ok(());
            }
            hub.delete_client(&id).await?;
            if !global.quiet {
                eprintln!("Deleted client {id}");
            }
            Ok(())
        }
    }
}
