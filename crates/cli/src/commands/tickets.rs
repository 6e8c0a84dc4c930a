use crate::execute::Context;
use chrono::Utc;
use clap::Subcommand;
use std::str::FromStr;
use ticketry_core::{Ticket, TicketKind};

#[derive(Subcommand, Debug)]
pub enum TicketCommands {
    /// List stored tickets
    List {
        /// Only tickets of this kind (e.g. ticket_granting, service)
        #[arg(long, value_parser = TicketKind::from_str)]
        kind: Option<TicketKind>,
        /// Include tickets that are already expired
        #[arg(long)]
        all: bool,
        /// Print full tickets as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Show a single ticket with its ancestors
    Show {
        ticket_id: String,
    },
    /// Count stored tickets, per kind or in total
    Count {
        #[arg(long, value_parser = TicketKind::from_str)]
        kind: Option<TicketKind>,
    },
    /// Delete a ticket, and in dependent mode everything issued from it
    Delete {
        ticket_id: String,
    },
    /// Delete every ticket of every kind
    Purge {
        /// Confirm the purge
        #[arg(long)]
        yes: bool,
    },
}

impl TicketCommands {
    pub async fn execute(self, context: &Context) -> eyre::Result<()> {
        let runtime = context.runtime().await?;
        let registry = &runtime.registry;

        match self {
            TicketCommands::List { kind, all, json } => {
                let now = Utc::now();
                let tickets: Vec<Ticket> = registry
                    .get_tickets()
                    .await?
                    .into_iter()
                    .filter(|ticket| kind.map_or(true, |kind| ticket.kind() == kind))
                    .filter(|ticket| all || !ticket.is_expired_at(now))
                    .collect();

                for ticket in &tickets {
                    if json {
                        println!("{}", serde_json::to_string(ticket)?);
                    } else {
                        println!("{}", summary_line(ticket, now));
                    }
                }
                tracing::info!("{} ticket(s)", tickets.len());
                Ok(())
            }
            TicketCommands::Show { ticket_id } => {
                let Some(ticket) = registry.get_ticket(&ticket_id).await? else {
                    eyre::bail!("ticket '{ticket_id}' not found");
                };
                println!("{}", serde_json::to_string_pretty(&ticket)?);
                let now = Utc::now();
                for ancestor in ticket.ancestors() {
                    println!("  issued by {}", summary_line(ancestor, now));
                }
                if ticket.lineage().is_some_and(|lineage| lineage.is_orphaned()) {
                    println!("  parent is gone");
                }
                Ok(())
            }
            TicketCommands::Count { kind } => {
                match kind {
                    Some(kind) => {
                        println!("{kind}: {}", registry.count_tickets_for(kind).await?);
                    }
                    None => {
                        for kind in runtime.catalog.definitions().map(|d| d.kind()) {
                            println!("{kind}: {}", registry.count_tickets_for(kind).await?);
                        }
                        println!("total: {}", registry.size().await?);
                    }
                }
                Ok(())
            }
            TicketCommands::Delete { ticket_id } => {
                if registry.delete_ticket(&ticket_id).await? {
                    tracing::info!("✓ deleted {ticket_id}");
                    Ok(())
                } else {
                    eyre::bail!("ticket '{ticket_id}' not found")
                }
            }
            TicketCommands::Purge { yes } => {
                eyre::ensure!(yes, "refusing to purge the registry without --yes");
                let removed = registry.delete_all().await?;
                tracing::info!("✓ removed {removed} ticket(s)");
                Ok(())
            }
        }
    }
}

pub(crate) fn summary_line(ticket: &Ticket, now: chrono::DateTime<Utc>) -> String {
    let state = if ticket.is_expired_at(now) {
        "expired"
    } else {
        "live"
    };
    format!(
        "{:<48} {:<20} {:<8} uses={} principal={} created={}",
        ticket.id(),
        ticket.kind(),
        state,
        ticket.count_of_uses(),
        ticket.principal_id().unwrap_or("-"),
        ticket.creation_time().to_rfc3339()
    )
}
