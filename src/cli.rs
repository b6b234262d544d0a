use std::path::PathBuf;
use std::time::Duration;

use clap::{Arg, ArgMatches, Command};
use clap_complete::{generate, shells};
use clap_complete_nushell::Nushell;

use crate::constants::{
    BASE_URL_ENV, DEFAULT_BASE_URL, DEFAULT_OUTPUT_DIR, DEFAULT_SERVER_SCRIPT,
    DEFAULT_TOOL_TIMEOUT_SECS, OUTPUT_DIR_ENV, get_default_model,
};

/// Runtime configuration, built once in `main` and passed by reference from there
#[derive(Debug, Clone)]
pub struct Config {
    pub server_script: PathBuf,
    pub model: String,
    pub base_url: String,
    pub output_dir: PathBuf,
    pub tool_timeout: Duration,
    pub show_plan: bool, // true = print each generated plan before running it
}

impl Config {
    pub fn from_args() -> Self {
        let matches = Self::build_cli().get_matches();

        // Handle completions generation immediately
        if let Some(shell) = matches.get_one::<String>("completions") {
            Self::handle_completions(shell);
            std::process::exit(0);
        }

        Self::from_matches(&matches)
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        let server_script = matches
            .get_one::<String>("server-script")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SERVER_SCRIPT));

        let model = matches
            .get_one::<String>("model")
            .cloned()
            .unwrap_or_else(get_default_model);

        let base_url = matches
            .get_one::<String>("base-url")
            .cloned()
            .or_else(|| std::env::var(BASE_URL_ENV).ok())
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let output_dir = matches
            .get_one::<String>("output-dir")
            .cloned()
            .or_else(|| std::env::var(OUTPUT_DIR_ENV).ok())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        let tool_timeout_secs = matches
            .get_one::<String>("tool-timeout")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS);

        Self {
            server_script,
            model,
            base_url,
            output_dir,
            tool_timeout: Duration::from_secs(tool_timeout_secs),
            show_plan: matches.get_flag("show-plan"),
        }
    }

    fn build_cli() -> Command {
        Command::new("chainer")
            .version(env!("CHAINER_VERSION"))
            .about("Plan and run chains of MCP tool calls from natural-language requests")
            .arg(
                Arg::new("server-script")
                    .help("MCP server script to launch (.py runs with python, .js with node)")
                    .value_name("SERVER_SCRIPT")
                    .required(false),
            )
            .next_help_heading("Model Options")
            .arg(
                Arg::new("model")
                    .short('m')
                    .long("model")
                    .help("Planning model. Format: 'provider::model' or just 'model' for an OpenAI-compatible endpoint (e.g., 'qwen-plus', 'ollama::llama3.2', 'gemini::gemini-2.5-flash'). Can be set via CHAINER_MODEL or MODEL environment variables.")
                    .value_name("MODEL")
                    .action(clap::ArgAction::Set),
            )
            .arg(
                Arg::new("base-url")
                    .long("base-url")
                    .help("Base URL of the OpenAI-compatible endpoint. Can be set via BASE_URL environment variable.")
                    .value_name("URL")
                    .action(clap::ArgAction::Set),
            )
            .next_help_heading("Session Options")
            .arg(
                Arg::new("output-dir")
                    .short('o')
                    .long("output-dir")
                    .help("Directory the generated report paths point into. Can be set via CHAINER_OUTPUT_DIR environment variable.")
                    .value_name("DIR")
                    .action(clap::ArgAction::Set),
            )
            .arg(
                Arg::new("tool-timeout")
                    .long("tool-timeout")
                    .help("Seconds to wait for a single MCP server response (default: 120)")
                    .value_name("SECONDS")
                    .action(clap::ArgAction::Set),
            )
            .arg(
                Arg::new("show-plan")
                    .long("show-plan")
                    .help("Print each generated tool plan before executing it")
                    .action(clap::ArgAction::SetTrue),
            )
            .next_help_heading("Other Options")
            .arg(
                Arg::new("completions")
                    .long("completions")
                    .help("Generate shell completion script")
                    .value_name("SHELL")
                    .value_parser(["bash", "zsh", "fish", "powershell", "nushell"])
                    .action(clap::ArgAction::Set),
            )
    }

    fn handle_completions(shell: &str) {
        let mut cmd = Self::build_cli();
        let bin_name = "chainer";

        match shell {
            "bash" => generate(shells::Bash, &mut cmd, bin_name, &mut std::io::stdout()),
            "zsh" => generate(shells::Zsh, &mut cmd, bin_name, &mut std::io::stdout()),
            "fish" => generate(shells::Fish, &mut cmd, bin_name, &mut std::io::stdout()),
            "powershell" => generate(
                shells::PowerShell,
                &mut cmd,
                bin_name,
                &mut std::io::stdout(),
            ),
            "nushell" => generate(Nushell, &mut cmd, bin_name, &mut std::io::stdout()),
            _ => eprintln!("Unsupported shell: {}", shell),
        }
    }
}
