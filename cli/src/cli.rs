use clap::Parser;
use std::path::PathBuf;

/// Chat with an assistant about one person's résumé
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Ask a single question and exit instead of starting an interactive chat
    #[arg(index = 1)]
    pub question: Option<String>,

    /// Path to the secrets TOML file
    #[arg(short, long, env = "RESUME_CHAT_SECRETS")]
    pub secrets: Option<PathBuf>,

    /// Where the service-account key is written before use
    #[arg(long, env = "RESUME_CHAT_CREDENTIALS_PATH", default_value = "gcp_service_key.json")]
    pub credentials_path: PathBuf,

    /// Do not point GOOGLE_APPLICATION_CREDENTIALS at the written key
    #[arg(long, default_value_t = false)]
    pub no_export_env: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, env = "RESUME_CHAT_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["resume-chat"]);
        assert_eq!(args.question, None);
        assert_eq!(args.credentials_path, PathBuf::from("gcp_service_key.json"));
        assert!(!args.no_export_env);
    }

    #[test]
    fn test_one_shot_question() {
        let args = Args::parse_from([
            "resume-chat",
            "--secrets",
            "/tmp/secrets.toml",
            "--no-export-env",
            "What certifications does Marcos have?",
        ]);
        assert_eq!(
            args.question.as_deref(),
            Some("What certifications does Marcos have?")
        );
        assert_eq!(args.secrets, Some(PathBuf::from("/tmp/secrets.toml")));
        assert!(args.no_export_env);
    }
}
