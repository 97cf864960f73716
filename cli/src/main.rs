use anyhow::{Context, Result};
use clap::Parser;
use resume_chat_core::config::default_secrets_path;
use resume_chat_core::session::connect;
use resume_chat_core::{AppConfig, ChatSession, CredentialLoader, ProfileAssets};
use std::process::ExitCode;
use tracing::{error, info};

mod app;
mod cli;
mod logging;
mod output;

use crate::cli::Args;
use crate::output::{print_blocking_error, print_sidebar};

/// Loads secrets, resolves credentials once, then chats
fn main() -> Result<ExitCode> {
    // Load .env before clap reads env-backed flags
    dotenvy::dotenv().ok();

    let args = Args::parse();
    logging::init(&args.log_level);

    // Credentials may rewrite the process environment, so they are resolved
    // while this is still the only thread.
    let (config, mut session) = prepare(&args)?;

    if let Some(message) = session.take_blocking_error() {
        print_blocking_error(&message);
        return Ok(ExitCode::FAILURE);
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to start the async runtime")?;
    runtime.block_on(run(&args, &config, &mut session))
}

/// Reads configuration and starts the session; no async work happens here
fn prepare(args: &Args) -> Result<(AppConfig, ChatSession)> {
    let secrets_path = args.secrets.clone().unwrap_or_else(default_secrets_path);
    info!("Using secrets from {}", secrets_path.display());
    let config = AppConfig::load(&secrets_path).context("Failed to load configuration")?;

    let loader = CredentialLoader::new(args.credentials_path.clone(), !args.no_export_env);
    let session = ChatSession::start(|| connect(&config, &loader));

    Ok((config, session))
}

async fn run(args: &Args, config: &AppConfig, session: &mut ChatSession) -> Result<ExitCode> {
    let assets = ProfileAssets::from_config(config);
    let image = assets.fetch_image(&reqwest::Client::new()).await;
    print_sidebar(&assets, &image);

    let outcome = match args.question.as_deref() {
        Some(question) => app::run_single_question(session, question).await,
        None => app::run_interactive_chat(session, &config.profile_name, &config.tagline).await,
    };

    if let Err(e) = outcome {
        error!(error = %e, "Chat ended with an error");
        output::print_inline_error(&format!("{:#}", e));
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use resume_chat_core::credentials::CREDENTIALS_ENV_VAR;
    use std::fs;

    const FIXTURE_KEY: &str = include_str!("../../core/tests/fixtures/service_account.json");

    fn args_for(dir: &std::path::Path, extra: &[&str]) -> Args {
        let secrets = dir.join("secrets.toml");
        let key_path = dir.join("key.json");
        let mut argv = vec![
            "resume-chat".to_string(),
            "--secrets".to_string(),
            secrets.display().to_string(),
            "--credentials-path".to_string(),
            key_path.display().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        Args::parse_from(argv)
    }

    // Plain #[test]: startup must work without an async runtime
    #[test]
    fn test_prepare_resolves_credentials_before_runtime() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("secrets.toml"),
            format!(
                "[key]\nservice_key = '''{}'''\n\n[google_cloud]\ndatastore = \"projects/p/dataStores/cv\"\n",
                FIXTURE_KEY
            ),
        )
        .unwrap();

        let args = args_for(dir.path(), &[]);
        let (config, mut session) = prepare(&args).unwrap();

        assert!(!session.is_halted());
        assert_eq!(session.take_blocking_error(), None);
        assert_eq!(config.datastore.as_deref(), Some("projects/p/dataStores/cv"));

        let key_path = dir.path().join("key.json");
        assert_eq!(fs::read_to_string(&key_path).unwrap(), FIXTURE_KEY);
        assert_eq!(
            std::env::var(CREDENTIALS_ENV_VAR).unwrap(),
            key_path.display().to_string()
        );
    }

    #[test]
    fn test_prepare_without_key_halts_once() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("secrets.toml"),
            "[google_cloud]\ndatastore = \"projects/p/dataStores/cv\"\n",
        )
        .unwrap();

        let args = args_for(dir.path(), &["--no-export-env"]);
        let (_, mut session) = prepare(&args).unwrap();

        assert!(session.is_halted());
        assert!(session.take_blocking_error().is_some());
        assert_eq!(session.take_blocking_error(), None);
        assert!(!dir.path().join("key.json").exists());
    }
}
