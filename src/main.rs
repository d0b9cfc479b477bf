use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bep_designer::fill::generated_text_path;
use bep_designer::headings::{group_of, CANONICAL_TOPICS};
use bep_designer::state::AppState;
use bep_designer::{fill_template, run_generator, Payload, TopicSelection};

#[derive(Parser)]
#[command(
    name = "bep-designer",
    about = "Fill BIM Execution Plan templates and generate planning summaries"
)]
struct Cli {
    /// State file holding the saved form answers
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Copy a template and fill it from the payload
    Fill {
        /// Template document to fill
        #[arg(long)]
        template: Option<PathBuf>,

        /// Payload JSON (overrides the payload from the state file)
        #[arg(long)]
        payload: Option<PathBuf>,

        /// Directory for generated documents
        #[arg(long, default_value = "generated")]
        out_dir: PathBuf,

        /// Additional topics to remove, on top of the saved selection
        #[arg(long)]
        remove: Vec<String>,
    },
    /// Run the external prose generator over the payload
    Generate {
        /// Generator program to spawn
        #[arg(long, env = "BEP_GENERATOR")]
        generator: String,

        /// Arguments passed to the generator
        #[arg(long)]
        generator_arg: Vec<String>,

        /// Payload JSON (overrides the payload from the state file)
        #[arg(long)]
        payload: Option<PathBuf>,

        /// Directory for generated documents
        #[arg(long, default_value = "generated")]
        out_dir: PathBuf,
    },
    /// List the canonical removable topics with their groups
    Topics,
}

fn load_payload(path: &PathBuf) -> Result<Payload> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read payload {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse payload {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let state_path = cli.state.clone().unwrap_or_else(AppState::default_path);
    let mut state = AppState::load(&state_path);

    match cli.command {
        Command::Fill {
            template,
            payload,
            out_dir,
            remove,
        } => {
            let payload = match payload {
                Some(path) => load_payload(&path)?,
                None => state.payload.clone(),
            };
            let template = template
                .or_else(|| state.template_path.clone())
                .context("no template given and none saved in state")?;

            let mut selection = TopicSelection::with_removed(&state.removed_topics);
            for name in &remove {
                selection.set_keep(name, false);
            }

            let outcome = fill_template(&template, &payload, &selection.removed_names(), &out_dir)?;
            println!("{}", outcome.path.display());
            println!("{} change(s) applied", outcome.changes);

            state.payload = payload;
            state.template_path = Some(template);
            state.last_generated_path = Some(outcome.path);
            state.removed_topics = selection.removed_names();
            if let Err(err) = state.save(&state_path) {
                // State is a convenience; a failed save never fails the fill.
                tracing::warn!(%err, "could not save state");
            }
        }
        Command::Generate {
            generator,
            generator_arg,
            payload,
            out_dir,
        } => {
            let payload = match payload {
                Some(path) => load_payload(&path)?,
                None => state.payload.clone(),
            };
            let result = run_generator(&generator, &generator_arg, &payload)?;
            if result.success {
                fs::create_dir_all(&out_dir)?;
                let path = generated_text_path(&out_dir, &payload.project_name);
                fs::write(&path, &result.text)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("{}", path.display());
                state.payload = payload;
                state.last_generated_path = Some(path);
                if let Err(err) = state.save(&state_path) {
                    tracing::warn!(%err, "could not save state");
                }
            } else {
                // The generator's error detail is the visible result.
                println!("{}", result.text.trim_end());
            }
        }
        Command::Topics => {
            let mut current_group = "";
            for (index, name) in CANONICAL_TOPICS.iter().enumerate() {
                let group = group_of(index);
                if group != current_group {
                    println!("{group}");
                    current_group = group;
                }
                println!("  {name}");
            }
        }
    }
    Ok(())
}
