use std::sync::Arc;

use anyhow::{Context, Result};
use asset_placement::{
    client::ApiClient,
    commands::{
        placements::{
            CreatePlacementCommand, DeletePlacementCommand, RemoveFromLocationCommand,
            UpdatePlacementCommand,
        },
        Command,
    },
    config::{self, AppConfig},
    events::{self, Event, EventSender},
    notifications::{Notification, NotificationLevel, Notifier, TracingNotifier},
    prompt::{AutoConfirm, ConfirmationPrompt, TerminalPrompt},
    relocation::{PreflightStatus, RelocationCoordinator, SubmissionOutcome},
    LifecycleDates, LocationType, PlacementPayload, PlacementServices, PlacementTarget,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize(&cli)?;

    let result = match cli.command {
        Commands::Check(args) => handle_check(&context, args, cli.json).await,
        Commands::Place(args) => handle_place(&context, args, cli.json).await,
        Commands::Update(args) => handle_update(&context, args, cli.json).await,
        Commands::Delete(args) => handle_delete(&context, args, cli.json).await,
        Commands::Vacate(args) => handle_vacate(&context, args, cli.json).await,
    };

    // Failed commands publish events too.
    context.shutdown().await?;
    result
}

#[derive(Parser)]
#[command(
    name = "placement-cli",
    about = "Place assets at sites and warehouses without double placement",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[arg(
        long,
        short = 'y',
        global = true,
        action = ArgAction::SetTrue,
        help = "Confirm moving an already-placed asset without asking"
    )]
    yes: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show where an asset is currently placed
    Check(CheckArgs),
    /// Place an asset, moving it away from its current location if needed
    Place(PlaceArgs),
    /// Edit an existing placement record
    Update(UpdateArgs),
    /// Delete a placement record
    Delete(DeleteArgs),
    /// Remove an asset from its current location of one kind
    Vacate(VacateArgs),
}

#[derive(Args)]
struct CheckArgs {
    #[arg(long, help = "Asset to look up")]
    asset_id: i64,
}

#[derive(Args)]
struct PlacementArgs {
    #[arg(long, help = "Location kind: site or warehouse")]
    location_type: LocationType,
    #[arg(long, help = "Asset to place")]
    asset_id: i64,
    #[arg(long, help = "Site or warehouse id")]
    location_id: i64,
    #[arg(long, help = "Asset status to record on the placement")]
    asset_status_id: i64,
    #[arg(long)]
    activity_work_id: Option<i64>,
    #[arg(long)]
    assigned_date: Option<NaiveDate>,
    #[arg(long)]
    delivered_date: Option<NaiveDate>,
    #[arg(long)]
    deployed_date: Option<NaiveDate>,
    #[arg(long)]
    activated_date: Option<NaiveDate>,
    #[arg(long)]
    decommissioned_date: Option<NaiveDate>,
    #[arg(long)]
    vacated_date: Option<NaiveDate>,
}

impl PlacementArgs {
    fn payload(&self) -> PlacementPayload {
        let mut payload = PlacementPayload::new(self.asset_id, self.location_id, self.asset_status_id)
            .with_dates(LifecycleDates {
                assigned_date: self.assigned_date,
                delivered_date: self.delivered_date,
                deployed_date: self.deployed_date,
                activated_date: self.activated_date,
                decommissioned_date: self.decommissioned_date,
                vacated_date: self.vacated_date,
            });
        payload.activity_work_id = self.activity_work_id;
        payload
    }
}

#[derive(Args)]
struct PlaceArgs {
    #[command(flatten)]
    placement: PlacementArgs,
}

#[derive(Args)]
struct UpdateArgs {
    #[arg(long, help = "Placement record to edit")]
    placement_id: i64,
    #[command(flatten)]
    placement: PlacementArgs,
}

#[derive(Args)]
struct DeleteArgs {
    #[arg(long, help = "Location kind: site or warehouse")]
    location_type: LocationType,
    #[arg(long, help = "Placement record to delete")]
    placement_id: i64,
}

#[derive(Args)]
struct VacateArgs {
    #[arg(long, help = "Location kind: site or warehouse")]
    location_type: LocationType,
    #[arg(long, help = "Asset to remove")]
    asset_id: i64,
}

/// Prints notifications for a human reader.
struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, notification: Notification) {
        let marker = match notification.level {
            NotificationLevel::Success => "ok",
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        eprintln!("[{}] {}: {}", marker, notification.title, notification.message);
    }
}

struct CliContext {
    coordinator: Arc<RelocationCoordinator>,
    event_sender: Arc<EventSender>,
    event_processor: JoinHandle<()>,
}

impl CliContext {
    fn initialize(cli: &Cli) -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let coordinator = Arc::new(build_coordinator(&config, cli.yes, cli.json)?);

        let (event_tx, event_rx) = mpsc::channel::<Event>(32);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_processor = tokio::spawn(events::process_events(event_rx));

        Ok(Self {
            coordinator,
            event_sender,
            event_processor,
        })
    }

    /// Closes the event channel and waits until every published event has
    /// been processed.
    async fn shutdown(self) -> Result<()> {
        let Self {
            event_sender,
            event_processor,
            ..
        } = self;
        drop(event_sender);
        event_processor
            .await
            .context("event processor stopped abnormally")
    }

    fn services(&self) -> &PlacementServices {
        self.coordinator.services()
    }
}

fn build_coordinator(config: &AppConfig, yes: bool, json: bool) -> Result<RelocationCoordinator> {
    let api = ApiClient::from_config(config).context("failed to build placement API client")?;

    let prompt: Arc<dyn ConfirmationPrompt> = if yes {
        Arc::new(AutoConfirm(true))
    } else {
        Arc::new(TerminalPrompt)
    };
    let notifier: Arc<dyn Notifier> = if json {
        Arc::new(TracingNotifier)
    } else {
        Arc::new(ConsoleNotifier)
    };

    Ok(RelocationCoordinator::new(
        PlacementServices::http(api),
        prompt,
        notifier,
        config.relocation_settings(),
    ))
}

async fn handle_check(context: &CliContext, args: CheckArgs, json: bool) -> Result<()> {
    let check = context
        .services()
        .location_query
        .check_location(args.asset_id)
        .await
        .with_context(|| format!("failed to check location of asset {}", args.asset_id))?;

    if json {
        print_json(&check)?;
    } else if check.is_placed() {
        println!("Asset {} is placed at {}", check.asset_tag_id, check.describe());
    } else {
        println!("Asset {} has no active placement", check.asset_tag_id);
    }
    Ok(())
}

async fn handle_place(context: &CliContext, args: PlaceArgs, json: bool) -> Result<()> {
    let target = PlacementTarget::new(args.placement.location_type, args.placement.payload());
    let outcome = CreatePlacementCommand::new(target)
        .execute(context.coordinator.clone(), context.event_sender.clone())
        .await
        .context("failed to place asset")?;

    if json {
        return print_json(&outcome);
    }
    match &outcome {
        SubmissionOutcome::Created {
            placement,
            location_type,
            preflight,
        } => {
            println!(
                "Placement {} created at {} {}",
                placement.id, location_type, placement.location_id
            );
            if *preflight == PreflightStatus::Unavailable {
                println!("Note: the location check was unavailable; the asset was placed unchecked");
            }
        }
        SubmissionOutcome::Relocated {
            placement,
            location_type,
            previous,
        } => println!(
            "Asset {} moved from {} to {} {} (placement {})",
            previous.asset_tag_id,
            previous.describe(),
            location_type,
            placement.location_id,
            placement.id
        ),
        SubmissionOutcome::Cancelled { previous } => println!(
            "Cancelled; asset {} stays at {}",
            previous.asset_tag_id,
            previous.describe()
        ),
    }
    Ok(())
}

async fn handle_update(context: &CliContext, args: UpdateArgs, json: bool) -> Result<()> {
    let command = UpdatePlacementCommand {
        location_type: args.placement.location_type,
        placement_id: args.placement_id,
        payload: args.placement.payload(),
    };
    let placement = command
        .execute(context.coordinator.clone(), context.event_sender.clone())
        .await
        .with_context(|| format!("failed to update placement {}", args.placement_id))?;

    if json {
        print_json(&placement)?;
    } else {
        println!("Placement {} updated", placement.id);
    }
    Ok(())
}

async fn handle_delete(context: &CliContext, args: DeleteArgs, json: bool) -> Result<()> {
    DeletePlacementCommand {
        location_type: args.location_type,
        placement_id: args.placement_id,
    }
    .execute(context.coordinator.clone(), context.event_sender.clone())
    .await
    .with_context(|| format!("failed to delete placement {}", args.placement_id))?;

    if json {
        print_json(&Ack {
            action: "deleted",
            id: args.placement_id,
        })?;
    } else {
        println!("Placement {} deleted", args.placement_id);
    }
    Ok(())
}

async fn handle_vacate(context: &CliContext, args: VacateArgs, json: bool) -> Result<()> {
    RemoveFromLocationCommand {
        location_type: args.location_type,
        asset_id: args.asset_id,
    }
    .execute(context.coordinator.clone(), context.event_sender.clone())
    .await
    .with_context(|| format!("failed to remove asset {}", args.asset_id))?;

    if json {
        print_json(&Ack {
            action: "vacated",
            id: args.asset_id,
        })?;
    } else {
        println!(
            "Asset {} removed from its {}",
            args.asset_id, args.location_type
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct Ack {
    action: &'static str,
    id: i64,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
