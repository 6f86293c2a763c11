use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use std::sync::Arc;
use unconscious::cli::{Args, Command};
use unconscious::config::Config;
use unconscious::logging::init_logging;
use unconscious::prompts::build_prompt;
use unconscious::worker::{EngineLauncher, ProcessLauncher};
use unconscious::Orchestrator;
use unconscious_sdk::TaskDescriptor;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging)?;

    match &args.command {
        Command::Sweep {
            user,
            session,
            message,
            ..
        } => {
            let orchestrator = engine_orchestrator(&config)?;
            let sweep = orchestrator
                .process_sweep(user, session, message, args.command.sweep_options())
                .await?;
            println!("{}", serde_json::to_string_pretty(&sweep)?);
        }

        Command::Task {
            task_type,
            user,
            message,
        } => {
            let orchestrator = engine_orchestrator(&config)?;
            let payload = orchestrator
                .run_unconscious_task(*task_type, user, message)
                .await;
            println!("{}", serde_json::to_string_pretty(&payload)?);
            if payload.is_none() {
                std::process::exit(1);
            }
        }

        Command::Prompt {
            task_type,
            user,
            session,
            message,
            context,
        } => {
            let mut task = TaskDescriptor::new(*task_type, user, session, message);
            if let Some(context) = context {
                task = task.with_context(context.clone());
            }
            println!("{}", build_prompt(&task));
        }

        Command::Status => {
            // no engine home is created just to report on it
            let launcher = Arc::new(EngineLauncher::new(config.engine.clone()));
            let orchestrator =
                Orchestrator::with_launcher(config.orchestrator.clone(), launcher.clone());
            let env: serde_json::Map<String, serde_json::Value> = launcher
                .env()
                .into_iter()
                .map(|(key, value)| (key, json!(value)))
                .collect();

            let status = json!({
                "engine": {
                    "program": launcher.program(),
                    "args": launcher.args("<prompt>"),
                    "env": env,
                    "home_exists": config.engine.home.is_dir(),
                },
                "orchestrator": {
                    "timeout_ms": config.orchestrator.timeout_ms,
                    "timeouts": config.orchestrator.timeouts,
                },
                "registry": orchestrator.snapshot(),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

fn engine_orchestrator(config: &Config) -> Result<Orchestrator> {
    Orchestrator::new(config).with_context(|| {
        format!(
            "Failed to create engine home: {}",
            config.engine.home.display()
        )
    })
}
