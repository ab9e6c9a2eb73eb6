use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use metaorm::migration::{ArtifactStore, FsArtifactStore};
use metaorm::schema::ArtifactId;
use metaorm::OrmConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "metaorm-tool")]
#[command(about = "Developer tooling for metaorm migration artifacts")]
struct Cli {
    /// Migrations directory (defaults to METAORM_MIGRATIONS_DIR or db/migrations)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// JSON config file; overrides the environment
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List artifacts in identifier order
    List,
    /// Print the rendered operations of one artifact
    Show { id: String },
    /// Parse every artifact and check identifiers
    Verify,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => OrmConfig::from_file(path)
            .with_context(|| format!("Failed to load config '{}'", path.display()))?,
        None => OrmConfig::from_env().context("Invalid METAORM_* environment")?,
    };
    let dir = cli.dir.clone().unwrap_or_else(|| config.migrations_dir.clone());
    let store = FsArtifactStore::new(&dir, config.artifact_extension.clone());

    match cli.command {
        Command::List => list(&store),
        Command::Show { id } => show(&store, &id),
        Command::Verify => verify(&store),
    }
}

fn list(store: &FsArtifactStore) -> Result<()> {
    let ids = store
        .list()
        .with_context(|| format!("Failed to read '{}'", store.dir().display()))?;
    if ids.is_empty() {
        println!("No migration artifacts in {}", store.dir().display());
        return Ok(());
    }
    for id in ids {
        let artifact = store.load(&id).with_context(|| format!("Failed to load {}", id))?;
        println!(
            "{}  {:<24} {} operation(s)",
            artifact.id,
            artifact.table,
            artifact.operations.len()
        );
    }
    Ok(())
}

fn show(store: &FsArtifactStore, id: &str) -> Result<()> {
    let id: ArtifactId = id.parse().with_context(|| format!("Invalid artifact id '{}'", id))?;
    let artifact = store.load(&id).with_context(|| format!("Failed to load {}", id))?;
    println!("-- {} ({})", artifact.id, artifact.table);
    for statement in artifact.render() {
        println!("{};", statement);
    }
    Ok(())
}

fn verify(store: &FsArtifactStore) -> Result<()> {
    let ids = store
        .list()
        .with_context(|| format!("Failed to read '{}'", store.dir().display()))?;

    let mut previous: Option<&ArtifactId> = None;
    for id in &ids {
        if let Some(prev) = previous
            && prev >= id
        {
            bail!("Artifact {} does not sort after {}", id, prev);
        }
        let artifact = store.load(id).with_context(|| format!("Artifact {} is invalid", id))?;
        if artifact.operations.is_empty() {
            bail!("Artifact {} ({}) has no operations", id, artifact.table);
        }
        previous = Some(id);
    }

    println!("{} artifact(s) OK", ids.len());
    Ok(())
}
