pub mod actions;
pub mod output;
pub mod timeline;
pub mod watch;

use std::path::PathBuf;

use actions::{process_check, process_end, process_start, process_status};
use anyhow::Result;
use clap::{Parser, Subcommand};
use timeline::{process_timeline_command, TimelineCommand};
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use watch::{detect_shutdown, WatchLoop};

use crate::{
    store::event_log::EventStorageImpl,
    utils::{
        clock::DefaultClock, dir::create_application_default_path, logging::enable_logging,
    },
};

#[derive(Parser, Debug)]
#[command(name = "Daytally", version, long_about = None)]
#[command(about = "Personal daily work timer with sessions, tasks and a goal gauge", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        default_value_t = 5.,
        help = "Daily goal in hours"
    )]
    goal: f64,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Start the work timer")]
    Start {},
    #[command(about = "End the running session, checking off tasks and attaching a note")]
    End {
        #[arg(
            short,
            long = "task",
            help = "Task to check off with this session. Can be repeated"
        )]
        tasks: Vec<String>,
        #[arg(short, long, help = "Free-form note for the day")]
        note: Option<String>,
    },
    #[command(about = "Check off a task in the running session")]
    Check { task: String },
    #[command(about = "Show today's sessions, total and goal progress")]
    Status {},
    #[command(about = "Live-updating view of the running session")]
    Watch {},
    #[command(about = "Display a timeline of past days")]
    Timeline {
        #[command(flatten)]
        command: TimelineCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let app_dir = args
        .dir
        .clone()
        .map_or_else(create_application_default_path, Ok)?;
    enable_logging(&app_dir, logging_level, args.log)?;

    let storage = EventStorageImpl::new(app_dir.join("records"))?;
    let clock = DefaultClock;

    match args.commands {
        Commands::Start {} => process_start(&storage, &clock, args.goal).await,
        Commands::End { tasks, note } => {
            process_end(&storage, &clock, args.goal, tasks, note).await
        }
        Commands::Check { task } => process_check(&storage, &clock, task).await,
        Commands::Status {} => process_status(&storage, &clock, args.goal).await,
        Commands::Watch {} => {
            let shutdown = CancellationToken::new();
            tokio::spawn(detect_shutdown(shutdown.clone()));
            WatchLoop::new(storage, Box::new(DefaultClock), shutdown, args.goal)
                .run()
                .await
        }
        Commands::Timeline { command } => {
            process_timeline_command(command, storage, &clock, args.goal).await
        }
    }
}
