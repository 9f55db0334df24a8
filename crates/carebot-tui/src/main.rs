use anyhow::Result;
use carebot_core::{Block, ChatController, Config, Conversation, MessageKind, Segment};
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use tracing::info;

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{AppEvent, EventHandler, Tui};

#[derive(Parser)]
#[command(name = "carebot", version)]
#[command(about = "Chat with the hospital recommendation service")]
struct Cli {
    /// Base URL of the recommendation service (overrides CAREBOT_ENDPOINT and the config file)
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// Send a single query and print the reply
    Ask {
        /// Your question
        query: String,
        /// Print the reply without terminal styling
        #[arg(long)]
        plain: bool,
    },
    /// Show the effective configuration
    Config {
        /// Save this endpoint to the config file (an empty value clears it)
        #[arg(long, value_name = "URL")]
        set_endpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    let endpoint = cli.endpoint.as_deref();

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(&config, endpoint).await,
        Commands::Ask { query, plain } => {
            let ok = run_ask(&config, endpoint, &query, plain).await?;
            if !ok {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Config { set_endpoint } => {
            if let Some(url) = set_endpoint {
                config.set_endpoint(&url);
                config.save()?;
                println!("{}", "Endpoint saved.".green());
            }
            show_config(&config, endpoint)
        }
    }
}

async fn run_chat(config: &Config, endpoint: Option<&str>) -> Result<()> {
    let log_path = logging::init_file_logging()?;
    let client = config.client(endpoint)?;
    info!(endpoint = %client.endpoint(), log = %log_path.display(), "starting chat");

    let mut app = App::new(client, config.greeting());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let tx = events.sender();

    let result = run_loop(&mut terminal, &mut app, &mut events, &tx).await;

    tui::restore()?;
    result
}

async fn run_loop(
    terminal: &mut Tui,
    app: &mut App,
    events: &mut EventHandler,
    tx: &tokio::sync::mpsc::UnboundedSender<AppEvent>,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event, tx)?,
            None => break,
        }
    }
    Ok(())
}

/// Returns false when the reply was an error message.
async fn run_ask(config: &Config, endpoint: Option<&str>, query: &str, plain: bool) -> Result<bool> {
    logging::init_stderr_logging()?;
    let client = config.client(endpoint)?;
    info!(endpoint = %client.endpoint(), "sending one-shot query");

    let mut controller = ChatController::with_conversation(client, Conversation::new());
    controller.send_user_message(query).await;

    let Some(reply) = controller.messages().last() else {
        return Ok(false);
    };

    match reply.kind() {
        MessageKind::Bot => {
            let blocks = carebot_core::render(reply.content());
            if plain {
                for block in &blocks {
                    println!("{}", block.plain_text());
                }
            } else {
                print_blocks(&blocks);
            }
            Ok(true)
        }
        _ if plain => {
            eprintln!("{}", reply.content());
            Ok(false)
        }
        _ => {
            eprintln!("{}", reply.content().red());
            Ok(false)
        }
    }
}

fn styled_segments(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| {
            if s.emphasized {
                s.text.clone().bold().to_string()
            } else {
                s.text.clone()
            }
        })
        .collect()
}

fn print_blocks(blocks: &[Block]) {
    for block in blocks {
        match block {
            Block::Heading(text) => println!("{}", text.clone().bold().underlined()),
            Block::Paragraph(segments) => println!("{}", styled_segments(segments)),
            Block::OrderedList(items) => {
                for (i, item) in items.iter().enumerate() {
                    println!("  {} {}", format!("{}.", i + 1).dark_grey(), styled_segments(item));
                }
            }
            Block::LineBreak => println!(),
        }
    }
}

fn show_config(config: &Config, endpoint: Option<&str>) -> Result<()> {
    println!("{}", "carebot configuration".bold().cyan());
    println!("  config file: {}", Config::get_config_path()?.display());
    println!("  log file:    {}", logging::log_path()?.display());
    println!("  endpoint:    {}", config.client(endpoint)?.endpoint().green());
    println!("  greeting:    {}", config.greeting());
    match config.request_timeout() {
        Some(timeout) => println!("  timeout:     {}s", timeout.as_secs()),
        None => println!("  timeout:     none"),
    }
    Ok(())
}
