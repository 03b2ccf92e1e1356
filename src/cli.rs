use std::fmt::Display;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Color, Style, Styles};
use clap::{ArgAction, Args, ColorChoice, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::aot::{Generator, Shell, generate};
use clap_complete_nushell::Nushell;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use tracing::{debug, info, warn};
use tracing_indicatif::indicatif_println;

use crate::ai::{CommitPrompt, OpenAiInvoker, SchemaContract, tool_definition};
use crate::config::{Config, ConfigOverrides};
use crate::confirm::TerminalConfirm;
use crate::git::{DiffSource, GitCommitExecutor, GitDiffSource};
use crate::pipeline::{Outcome, Pipeline};
use crate::AppResult;

const BIN_NAME: &str = "llmmit";

const STYLES: Styles = Styles::styled()
    .header(Style::new().bold())
    .usage(Style::new().bold())
    .error(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red))))
    .literal(
        Style::new()
            .bold()
            .fg_color(Some(Color::Ansi(AnsiColor::Green))),
    )
    .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
    .valid(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
    .invalid(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightRed))))
    .context(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Magenta))))
    .context_value(
        Style::new()
            .bold()
            .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
    );

/// Long-form CLI description shown in `--help`.
const LONG_ABOUT: &str = "llmmit - Conventional commit messages for your staged changes

Reads the staged diff of the current repository, asks an OpenAI-compatible
model to describe it as a \x1b]8;;https://www.conventionalcommits.org\x1b\\\x1b[4;36mconventional commit\x1b[24;39m\x1b]8;;\x1b\\, shows you the result and commits it once you agree.

Configuration is read from $XDG_CONFIG_HOME/llmmit/config.json or ~/.llmmitrc.
The API key may also come from the OPENAI_API_KEY environment variable.";

/// llmmit - Generate commit messages for staged changes with an LLM.
#[derive(Parser, Debug, Clone)]
#[command(
    name = BIN_NAME,
    author,
    version,
    propagate_version = true,
    about,
    long_about = Some(LONG_ABOUT),
    styles = STYLES
)]
pub struct Cli {
    /// Color choice for the output
    #[arg(long, default_value_t = ColorChoice::Auto, global = true)]
    pub color: ColorChoice,

    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Print the generated message instead of asking and committing
    #[arg(long, default_value_t = false, action = ArgAction::SetTrue)]
    pub dry_run: bool,

    /// Subcommand to run. Without one, a commit message is generated for the staged changes
    #[command(subcommand)]
    pub cmd: Option<Cmd>,
}

/// Options that override the configuration file for this run.
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Read the configuration from this file instead of the default locations
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Model identifier sent to the provider
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Sampling temperature between 0.0 and 2.0
    #[arg(short, long, global = true)]
    pub temperature: Option<f32>,

    /// Language the commit message is written in
    #[arg(short, long, global = true)]
    pub language: Option<String>,

    /// Base URL of an OpenAI-compatible API, e.g. http://localhost:1234/v1
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Git pathspec to leave out of the diff; may be repeated
    ///
    /// Added to the `ignore_patterns` of the configuration file.
    #[arg(short = 'x', long = "exclude", global = true)]
    pub exclude: Vec<String>,

    /// Use the older `functions` request format instead of `tools`
    #[arg(long, default_value_t = false, action = ArgAction::SetTrue, global = true)]
    pub legacy_functions: bool,

    /// Request timeout in seconds
    #[arg(long = "timeout", global = true)]
    pub timeout_secs: Option<u64>,
}

impl SettingsArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            model: self.model.clone(),
            temperature: self.temperature,
            output_language: self.language.clone(),
            base_url: self.base_url.clone(),
            exclude: self.exclude.clone(),
            legacy_functions: self.legacy_functions,
            timeout_secs: self.timeout_secs,
        }
    }

    fn load(&self) -> AppResult<Config> {
        Config::load(self.config.as_deref(), self.overrides())
    }
}

/// Commands besides the default commit flow.
#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// Print the tool definition sent to the model
    Schema,

    /// Print the prompt that would be sent for the staged changes
    ///
    /// No request is made, so no API key is needed.
    Prompt,

    /// Generate shell completion for a given shell
    Completion {
        /// Output file to write the completion script to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// The shell to generate the completion for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

/// Supported completion targets for shell auto-completion.
#[derive(ValueEnum, Clone, Debug)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
    Nushell,
}

impl Display for CompletionShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompletionShell::Bash => "bash",
            CompletionShell::Zsh => "zsh",
            CompletionShell::Fish => "fish",
            CompletionShell::PowerShell => "powershell",
            CompletionShell::Elvish => "elvish",
            CompletionShell::Nushell => "nushell",
        };
        write!(f, "{}", s)
    }
}

impl Generator for &CompletionShell {
    fn generate(&self, cmd: &clap::builder::Command, buf: &mut dyn Write) {
        match self {
            CompletionShell::Bash => Shell::Bash.generate(cmd, buf),
            CompletionShell::Zsh => Shell::Zsh.generate(cmd, buf),
            CompletionShell::Fish => Shell::Fish.generate(cmd, buf),
            CompletionShell::PowerShell => Shell::PowerShell.generate(cmd, buf),
            CompletionShell::Elvish => Shell::Elvish.generate(cmd, buf),
            CompletionShell::Nushell => Nushell.generate(cmd, buf),
        }
    }

    fn file_name(&self, name: &str) -> String {
        match self {
            CompletionShell::Bash => Shell::Bash.file_name(name),
            CompletionShell::Zsh => Shell::Zsh.file_name(name),
            CompletionShell::Fish => Shell::Fish.file_name(name),
            CompletionShell::PowerShell => Shell::PowerShell.file_name(name),
            CompletionShell::Elvish => Shell::Elvish.file_name(name),
            CompletionShell::Nushell => Nushell.file_name(name),
        }
    }
}

/// Whether ANSI styling should be written to stderr.
pub fn use_color(choice: ColorChoice) -> bool {
    match choice {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stderr().is_terminal(),
    }
}

impl Cli {
    /// Execute the chosen command.
    pub async fn run(&self) -> AppResult<()> {
        match &self.cmd {
            None => self.run_commit().await,
            Some(Cmd::Schema) => {
                let definition = tool_definition(&SchemaContract::commit_message());
                indicatif_println!("{}", serde_json::to_string_pretty(&definition)?);
                Ok(())
            }
            Some(Cmd::Prompt) => self.run_prompt().await,
            Some(Cmd::Completion { shell, output }) => {
                let mut cmd = Cli::command();
                if let Some(output_path) = output {
                    let mut file = std::fs::OpenOptions::new()
                        .write(true)
                        .truncate(true)
                        .create(true)
                        .open(output_path)?;
                    generate(shell, &mut cmd, BIN_NAME, &mut file);
                    info!(
                        "Generated completion script for {} at {}",
                        shell,
                        output_path.display()
                    );
                } else {
                    generate(shell, &mut cmd, BIN_NAME, &mut std::io::stdout());
                }
                Ok(())
            }
        }
    }

    #[tracing::instrument(name = "Generating a commit", level = "debug", skip(self))]
    async fn run_commit(&self) -> AppResult<()> {
        let config = self.settings.load()?;
        let invoker = OpenAiInvoker::from_config(&config)?;
        let workdir = std::env::current_dir()?;
        let diff_source = GitDiffSource::new(&workdir, config.ignore_patterns.clone());
        let executor = GitCommitExecutor::new(&workdir);

        let confirm = TerminalConfirm::new(use_color(self.color));

        let mut pipeline = Pipeline::new(
            &diff_source,
            &invoker,
            &confirm,
            &executor,
            &config,
            CommitPrompt::load()?,
        )
        .dry_run(self.dry_run);
        let outcome = pipeline.run().await;
        debug!("Finished at stage '{}'", pipeline.stage());
        let outcome = outcome?;

        match outcome {
            Outcome::NothingStaged => info!("No changes added to staging. Nothing to commit."),
            Outcome::Committed(_) => info!("Changes committed!"),
            Outcome::Cancelled(_) => info!("Commit cancelled."),
            Outcome::DryRun(message) => indicatif_println!("{message}"),
        }
        Ok(())
    }

    async fn run_prompt(&self) -> AppResult<()> {
        let config = self.settings.load()?;
        let diff_source =
            GitDiffSource::new(std::env::current_dir()?, config.ignore_patterns.clone());
        let diff = diff_source.staged_diff().await?.unwrap_or_default();
        if diff.trim().is_empty() {
            warn!("No changes added to staging. The prompt below has an empty diff.");
        }
        let prompt = CommitPrompt::load()?.render(&diff, &config.output_language);
        indicatif_println!("{prompt}");
        Ok(())
    }
}
