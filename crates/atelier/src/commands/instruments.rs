//! Instrument command handlers.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use atelier_core::{
    Client, EntityKind, Hub, Instrument, InstrumentFilter, InstrumentPatch, InstrumentStatus,
    NewInstrument,
};

use crate::cli::{GlobalOpts, InstrumentFields, InstrumentsArgs, InstrumentsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct InstrumentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Instrument")]
    name: String,
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Price")]
    price: String,
}

impl InstrumentRow {
    fn new(i: &Arc<Instrument>, color: bool) -> Self {
        Self {
            id: i.id.to_string(),
            name: i.display_name(),
            serial: i.serial_number.clone().unwrap_or_default(),
            status: output::paint_status(&i.status, color),
            price: i.price.map(|p| format!("{p:.2}")).unwrap_or_default(),
        }
    }
}

/// Detail view payload: the instrument plus its current owner.
#[derive(Serialize)]
struct InstrumentDetail {
    #[serde(flatten)]
    instrument: Arc<Instrument>,
    owner: Option<Arc<Client>>,
}

fn detail(d: &InstrumentDetail) -> String {
    let i = &d.instrument;
    let mut lines = vec![
        format!("ID:          {}", i.id),
        format!("Maker:       {}", util::or_dash(i.maker.as_deref())),
        format!("Type:        {}", util::or_dash(i.type_.as_deref())),
        format!("Subtype:     {}", util::or_dash(i.subtype.as_deref())),
        format!(
            "Year:        {}",
            i.year.map_or_else(|| "-".into(), |y| y.to_string())
        ),
        format!("Serial:      {}", util::or_dash(i.serial_number.as_deref())),
        format!("Status:      {}", i.status),
        format!(
            "Price:       {}",
            i.price.map_or_else(|| "-".into(), |p| format!("{p:.2}"))
        ),
        format!("Ownership:   {}", util::or_dash(i.ownership.as_deref())),
        format!("Certificate: {}", if i.certificate { "yes" } else { "no" }),
    ];
    if let Some(owner) = &d.owner {
        lines.push(format!("Owner:       {} ({})", owner.full_name(), owner.id));
    }
    if let Some(note) = &i.note {
        lines.push(format!("Note:        {note}"));
    }
    lines.join("\n")
}

fn new_instrument(type_: String, f: InstrumentFields) -> NewInstrument {
    NewInstrument {
        maker: f.maker,
        type_,
        subtype: f.subtype,
        year: f.year,
        serial_number: f.serial_number,
        status: f.status.map(InstrumentStatus::from).unwrap_or_default(),
        price: f.price,
        ownership: f.ownership,
        certificate: f.certificate.unwrap_or(false),
        note: f.note,
    }
}

fn instrument_patch(type_: Option<String>, f: InstrumentFields) -> InstrumentPatch {
    InstrumentPatch {
        maker: f.maker,
        type_,
        subtype: f.subtype,
        year: f.year,
        serial_number: f.serial_number,
        status: f.status.map(InstrumentStatus::from),
        price: f.price,
        ownership: f.ownership,
        certificate: f.certificate,
        note: f.note,
    }
}

fn print_one(instrument: Arc<Instrument>, owner: Option<Arc<Client>>, global: &GlobalOpts) {
    let view = InstrumentDetail { instrument, owner };
    let out = output::render_single(&global.output, &view, detail, |d| {
        d.instrument.id.to_string()
    });
    output::print_output(&out, global.quiet);
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    hub: &Hub,
    args: InstrumentsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        InstrumentsCommand::List {
            list,
            status,
            maker,
            type_,
            certified,
        } => {
            let mut filters = Vec::new();
            if let Some(status) = status {
                filters.push(InstrumentFilter::ByStatus(status.into()));
            }
            if let Some(maker) = maker {
                filters.push(InstrumentFilter::ByMaker(maker));
            }
            if let Some(type_) = type_ {
                filters.push(InstrumentFilter::ByType(type_));
            }
            if certified {
                filters.push(InstrumentFilter::Certified);
            }

            let mut instruments =
                util::list_records(hub, hub.instrument_repository(), &list).await?;
            instruments.retain(|i| filters.iter().all(|f| f.matches(i)));

            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &instruments,
                |i| InstrumentRow::new(i, color),
                |i| i.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        InstrumentsCommand::Get { id } => {
            let instrument = util::find_record::<Instrument>(hub, &id).await?;
            hub.ensure_loaded_many(&[EntityKind::Clients, EntityKind::Connections])
                .await?;
            let owner = hub.instrument_owner(&instrument.id);
            print_one(instrument, owner, global);
            Ok(())
        }

        InstrumentsCommand::Create { type_, fields } => {
            let created = hub
                .create_instrument(new_instrument(type_, fields))
                .await?;
            print_one(created, None, global);
            Ok(())
        }

        InstrumentsCommand::Update { id, type_, fields } => {
            let id = util::parse_id(&id, "id")?;
            let updated = hub
                .update_instrument(&id, instrument_patch(type_, fields))
                .await?;
            print_one(updated, None, global);
            Ok(())
        }

        InstrumentsCommand::Delete { id } => {
            let id = util::parse_id(&id, "id")?;
            if !util::confirm(&format!("Delete instrument {id}?"), global.yes)? {
                return Ok(());
            }
            hub.delete_instrument(&id).await?;
            if !global.quiet {
                eprintln!("Deleted instrument {id}");
            }
            Ok(())
        }
    }
}
