use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use sigcode_rs::project::{Format, ProjectLoader, TemplateSet};
use sigcode_rs::server::{self, AppState};
use sigcode_rs::Settings;

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (YAML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Formula template file
    #[arg(short, long, global = true)]
    templates: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the expression generated for a project file
    Generate {
        /// Path to the project file
        #[arg(short, long)]
        project: PathBuf,
    },
    /// Recompute the stored `code` field of a project file
    Regenerate {
        /// Path to the project file
        #[arg(short, long)]
        project: PathBuf,

        /// Rewrite the file instead of printing the updated document
        #[arg(long)]
        in_place: bool,
    },
    /// Serve the editor API
    Serve {
        /// Folder holding saved projects
        #[arg(long)]
        project_dir: Option<PathBuf>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    settings.apply_env()?;
    if let Some(path) = &args.templates {
        settings.templates_path = Some(path.clone());
    }
    Ok(settings)
}

fn load_templates(settings: &Settings) -> Result<TemplateSet> {
    match &settings.templates_path {
        Some(path) => ProjectLoader::new()
            .load_templates(path)
            .with_context(|| format!("Failed to load templates from {}", path.display())),
        None => Ok(TemplateSet::default()),
    }
}

/// Replace `path` through a sibling temp file and a rename
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let mut settings = load_settings(&args)?;

    match args.command {
        Commands::Generate { project } => {
            let templates = load_templates(&settings)?;
            let project = ProjectLoader::new()
                .load_project(&project)
                .with_context(|| format!("Failed to load project {}", project.display()))?;
            log::info!("Compiling {} elements", project.elements.len());
            let code = sigcode_rs::generate_with_options(&project, &templates, &settings.compiler);
            println!("{}", code);
        }
        Commands::Regenerate { project, in_place } => {
            let templates = load_templates(&settings)?;
            let mut document = ProjectLoader::new()
                .load_value(&project)
                .with_context(|| format!("Failed to load project {}", project.display()))?;
            let code = ProjectLoader::regenerate(&mut document, &templates, &settings.compiler)?;
            log::info!("Regenerated {}: {}", project.display(), code);

            let rendered = match Format::from_path(&project)? {
                Format::Json => serde_json::to_string_pretty(&document)?,
                Format::Yaml => serde_yaml::to_string(&document)?,
            };
            if in_place {
                write_atomic(&project, &rendered)?;
            } else {
                println!("{}", rendered);
            }
        }
        Commands::Serve { project_dir, port } => {
            if let Some(dir) = project_dir {
                settings.project_dir = Some(dir);
            }
            if let Some(port) = port {
                settings.port = port;
            }
            let state = AppState::load(settings)?;
            server::serve(state).await?;
        }
    }

    Ok(())
}
