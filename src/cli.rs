use std::fmt::Display;
use std::io::Write;
use std::path::PathBuf;

use clap::builder::TypedValueParser;
use clap::builder::styling::{AnsiColor, Color, Style, Styles};
use clap::{Args, ColorChoice, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::aot::{Generator, Shell, generate};
use clap_complete_nushell::Nushell;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use feedback_themes::ai::{ServerSettings, get_client};
use feedback_themes::classify::knn::CentroidUpdate;
use feedback_themes::classify::theme::ThemeLabel;
use feedback_themes::classify::{ModelSettings, cluster_feedback};
use feedback_themes::config::EngineConfig;
use feedback_themes::{AppResult, io_utils};
use schemars::schema_for;
use tracing::info;

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
const LONG_ABOUT: &str = "Feedback Themes - Find ranked opportunities in customer feedback

Reads a JSON array of feedback items, embeds them with an OpenAI-compatible server,
groups them into themes, scores every theme by impact, and asks the model to name each theme.
Themes the model cannot name get a local label instead.";

/// Feedback Themes - Find ranked opportunities in customer feedback.
#[derive(Parser, Debug, Clone)]
#[command(author, version, propagate_version = true, about, long_about = Some(LONG_ABOUT), styles = STYLES)]
pub struct Cli {
    /// Color choice for the output
    #[arg(long, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Subcommand to run
    #[command(subcommand)]
    pub cmd: Cmd,
}

/// Top-level commands supported by the CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// Cluster, score and label a file of feedback items
    Analyze {
        /// JSON file holding an array of feedback items
        input: PathBuf,

        /// Output file to write the result to
        /// If not provided, prints to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        server: ServerArgs,
        #[command(flatten)]
        engine: EngineArgs,
        #[command(flatten)]
        verbosity: Verbosity<InfoLevel>,
    },

    /// Print the JSON schema the labeling model must answer with
    Schema {
        #[command(flatten)]
        verbosity: Verbosity<InfoLevel>,
    },

    /// Generate shell completion for a given shell
    Completion {
        /// Output file to write the completion script to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// The shell to generate the completion for
        #[arg(value_enum)]
        shell: CompletionShell,

        #[command(flatten)]
        verbosity: Verbosity<InfoLevel>,
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

impl CompletionShell {
    fn shell(&self) -> Option<Shell> {
        match self {
            CompletionShell::Bash => Some(Shell::Bash),
            CompletionShell::Zsh => Some(Shell::Zsh),
            CompletionShell::Fish => Some(Shell::Fish),
            CompletionShell::PowerShell => Some(Shell::PowerShell),
            CompletionShell::Elvish => Some(Shell::Elvish),
            CompletionShell::Nushell => None,
        }
    }
}

impl Generator for &CompletionShell {
    fn generate(&self, cmd: &clap::builder::Command, buf: &mut dyn Write) {
        match self.shell() {
            Some(shell) => shell.generate(cmd, buf),
            None => Nushell.generate(cmd, buf),
        }
    }

    fn file_name(&self, name: &str) -> String {
        match self.shell() {
            Some(shell) => shell.file_name(name),
            None => Nushell.file_name(name),
        }
    }
}

/// Connection and model options for the OpenAI-compatible server.
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Whether to use secure connection (HTTPS) to the language model server
    /// Defaults to false for local servers (i.e. `localhost` and private subnets)
    /// Defaults to true for public IP addresses and hostnames
    #[arg(long)]
    pub secure: Option<bool>,

    /// Host for the language model server
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Port for the language model server
    #[arg(long, default_value_t = 1234)]
    pub port: u16,

    /// OpenAI API version for the language model server
    #[arg(long, default_value = "v1")]
    pub api_version: String,

    /// API key sent to the server
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model used to embed feedback text
    #[arg(long, default_value = "text-embedding-nomic-embed-text-v1.5")]
    pub embedding_model: String,

    /// Model used to name themes
    #[arg(long, default_value = "openai/gpt-oss-20b")]
    pub label_model: String,

    /// Give up on a single theme label after this long (e.g. `30s`, `2m`)
    /// The theme then gets a local label
    #[arg(long)]
    pub label_timeout: Option<String>,
}

impl ServerArgs {
    pub fn settings(&self) -> ServerSettings {
        ServerSettings {
            host: self.host.clone(),
            port: self.port,
            secure: self.secure,
            api_version: self.api_version.clone(),
            api_key: self.api_key.clone(),
        }
    }

    pub fn models(&self) -> AppResult<ModelSettings> {
        let label_timeout = self
            .label_timeout
            .as_deref()
            .map(humantime::parse_duration)
            .transpose()?;
        Ok(ModelSettings {
            embedding_model: self.embedding_model.clone(),
            label_model: self.label_model.clone(),
            label_timeout,
        })
    }
}

/// Clustering options.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Fewest themes to look for
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..).map(|v| v as usize))]
    pub min_k: usize,

    /// Most themes to look for
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..).map(|v| v as usize))]
    pub max_k: usize,

    /// Smallest group reported as a theme (at least 2)
    #[arg(long, default_value_t = 2)]
    pub min_cluster_size: usize,

    /// Maximum number of k-means iterations
    #[arg(long, default_value_t = 10)]
    pub max_iterations: usize,

    /// Number of labeling requests in flight at once
    #[arg(long, default_value_t = 1)]
    pub label_concurrency: usize,

    /// How centroids are recomputed after each pass
    #[arg(long, value_enum, default_value_t = CentroidUpdate::Mean)]
    pub centroid_update: CentroidUpdate,

    /// Seed for centroid sampling, for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,
}

impl From<&EngineArgs> for EngineConfig {
    fn from(args: &EngineArgs) -> Self {
        EngineConfig {
            min_k: args.min_k,
            max_k: args.max_k,
            min_cluster_size: args.min_cluster_size,
            max_iterations: args.max_iterations,
            label_concurrency: args.label_concurrency,
            centroid_update: args.centroid_update,
            seed: args.seed,
            ..Default::default()
        }
    }
}

impl Cmd {
    pub fn verbosity(&self) -> &Verbosity<InfoLevel> {
        match self {
            Cmd::Analyze { verbosity, .. } => verbosity,
            Cmd::Schema { verbosity } => verbosity,
            Cmd::Completion { verbosity, .. } => verbosity,
        }
    }

    /// Execute the chosen top-level command.
    #[tracing::instrument(name = "Running command", level = "info", skip(self))]
    pub async fn run(&self) -> AppResult<()> {
        match self {
            Cmd::Analyze {
                input,
                output,
                server,
                engine,
                ..
            } => {
                let models = server.models()?;
                let client = get_client(&server.settings());
                let items = io_utils::read_feedback(input).await?;
                let result = cluster_feedback(&client, &models, engine.into(), &items).await?;
                info!(
                    "Found {} themes, {} unclustered items",
                    result.clusters.len(),
                    result.unclustered.len()
                );
                io_utils::write_json_output(output.as_deref(), &result).await
            }
            Cmd::Schema { .. } => {
                let schema = schema_for!(ThemeLabel);
                io_utils::write_json_output(None::<PathBuf>, &schema).await
            }
            Cmd::Completion { shell, output, .. } => {
                let mut cmd = Cli::command();
                if let Some(output_path) = output {
                    let mut file = std::fs::OpenOptions::new()
                        .write(true)
                        .truncate(true)
                        .create(true)
                        .open(output_path)?;
                    generate(shell, &mut cmd, "feedback-themes", &mut file);
                    info!(
                        "Generated completion script for {} at {}",
                        shell,
                        output_path.display()
                    );
                } else {
                    generate(shell, &mut cmd, "feedback-themes", &mut std::io::stdout());
                }
                Ok(())
            }
        }
    }
}
