pub mod commands;
pub mod console;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use copilot_core::config::{ConfigOverrides, LoadOptions};
use copilot_core::locale::Locale;

#[derive(Debug, Parser)]
#[command(
    name = "copilot",
    about = "Retail copilot demo client",
    long_about = "Submit client briefs to the recommendation service, compare the baseline (Run 1) with the improved pass (Run 2), and inspect client configuration.",
    after_help = "Examples:\n  copilot chat\n  copilot ask --brief \"Family of 4, budget $20k\" --improve\n  copilot doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive session (/improve, /state, /quit)")]
    Chat {
        #[command(flatten)]
        session: SessionArgs,
    },
    #[command(about = "Submit one brief and print the recommendation")]
    Ask {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long, help = "Client brief to submit")]
        brief: String,
        #[arg(long, help = "Run the improved pass after a successful baseline")]
        improve: bool,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config {
        #[command(flatten)]
        session: SessionArgs,
    },
    #[command(about = "Validate configuration and recommendation endpoint readiness")]
    Doctor {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct SessionArgs {
    #[arg(long, help = "Path to a copilot.toml file")]
    pub config: Option<PathBuf>,
    #[arg(long, help = "Override service.base_url")]
    pub base_url: Option<String>,
    #[arg(long, help = "Override service.function_name")]
    pub function_name: Option<String>,
    #[arg(long, help = "Override session.locale (es|en)")]
    pub locale: Option<Locale>,
}

impl SessionArgs {
    pub fn load_options(self) -> LoadOptions {
        LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config,
            overrides: ConfigOverrides {
                service_base_url: self.base_url,
                service_function_name: self.function_name,
                locale: self.locale,
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { session } => commands::chat::run(session.load_options()),
        Command::Ask { session, brief, improve, json } => {
            commands::ask::run(commands::ask::AskRequest {
                options: session.load_options(),
                brief,
                improve,
                json,
            })
        }
        Command::Config { session } => commands::CommandResult {
            exit_code: 0,
            output: commands::config::run(session.load_options()),
        },
        Command::Doctor { session, json } => commands::CommandResult {
            exit_code: 0,
            output: commands::doctor::run(session.load_options(), json),
        },
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
