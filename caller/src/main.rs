mod config;

use callie_core::scheduler::run_daily;
use callie_core::{check_well_formed, compile, BriefingCaller, CallHandle, CallieConfig};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "callie", about = "Daily briefing phone calls")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build today's briefing and call now (default)
    Call {
        /// Destination number; defaults to YOUR_PHONE
        #[arg(long)]
        to: Option<String>,
    },
    /// Print today's briefing as plain text
    Briefing,
    /// Print the call document for today's briefing
    Markup,
    /// Call every day at CALL_HOUR:CALL_MINUTE
    Schedule,
    /// Call and read out the given text
    Say {
        #[arg(value_name = "TEXT", required = true)]
        text: Vec<String>,
        #[arg(long)]
        to: Option<String>,
    },
    /// Place a short test call
    Test {
        #[arg(long)]
        to: Option<String>,
    },
    /// Show the provider's view of a call
    Status {
        #[arg(value_name = "CALL_SID")]
        sid: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,callie_core=info,callie=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let cfg = config::load();
    if let Err(e) = cfg.validate() {
        error!(target = "callie", error = %e, "Invalid configuration");
        std::process::exit(1);
    }

    if let Err(e) = run(cli.command.unwrap_or(Command::Call { to: None }), cfg).await {
        error!(target = "callie", error = %e, "Command failed");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(command: Command, cfg: CallieConfig) -> callie_core::Result<()> {
    let cfg = Arc::new(cfg);
    let caller = BriefingCaller::live(Arc::clone(&cfg))?;

    match command {
        Command::Call { to } => {
            let handle = caller.call_with_briefing(to.as_deref()).await?;
            report(&handle);
        }
        Command::Briefing => {
            println!("{}", caller.briefing_text().await);
        }
        Command::Markup => {
            let text = caller.briefing_text().await;
            let markup = compile(&text)?;
            let document = caller.render_document(&text)?;
            check_well_formed(document.as_str())?;
            println!("{}", document);
            println!();
            println!("briefing: {} chars", text.chars().count());
            println!("markup:   {} chars", markup.char_len());
            println!("chunks:   {}", document.chunk_count());
            println!(
                "document: {} of {} chars",
                document.char_len(),
                cfg.speech.limits.max_document_chars
            );
            println!("xml:      well-formed");
        }
        Command::Schedule => {
            cfg.validate_credentials()?;
            cfg.destination(None)?;
            info!(
                target = "callie",
                hour = cfg.schedule.hour,
                minute = cfg.schedule.minute,
                "Scheduler started"
            );
            let caller = Arc::new(caller);
            let job = move || {
                let caller = Arc::clone(&caller);
                async move { caller.call_with_briefing(None).await.map(|_| ()) }
            };
            tokio::select! {
                _ = run_daily(cfg.schedule, job) => {}
                _ = signal::ctrl_c() => {
                    info!(target = "callie", "Ctrl-C received; stopping scheduler");
                }
            }
        }
        Command::Say { text, to } => {
            let handle = caller.call_with_text(&text.join(" "), to.as_deref()).await?;
            report(&handle);
        }
        Command::Test { to } => {
            let handle = caller.test_call(to.as_deref()).await?;
            report(&handle);
        }
        Command::Status { sid } => {
            let status = caller.call_status(&sid).await?;
            println!("sid:      {}", status.sid);
            println!("status:   {}", status.status);
            if let Some(d) = &status.duration {
                println!("duration: {}s", d);
            }
            if let Some(p) = &status.price {
                println!(
                    "price:    {} {}",
                    p,
                    status.price_unit.as_deref().unwrap_or_default()
                );
            }
            if let Some(code) = status.error_code {
                println!(
                    "error:    {} {}",
                    code,
                    status.error_message.as_deref().unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

fn report(handle: &CallHandle) {
    println!("Call initiated: {} ({})", handle.sid, handle.status);
}
