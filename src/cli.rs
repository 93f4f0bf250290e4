use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "aniresume",
    version,
    about = "Track anime resume points and sync them to your account"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Track(TrackArgs),
    Report(ReportArgs),
    List,
    Delete { title_id: String },
    Sync { title_id: String },
    Profile(ProfileArgs),
    Tui,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[arg(long)]
    pub import: Option<std::path::PathBuf>,
    #[arg(long)]
    pub forget: bool,
}

#[derive(Debug, Args)]
pub struct TrackArgs {
    pub title_id: String,
    #[arg(long)]
    pub episode: u32,
    #[arg(long = "episode-ref")]
    pub episode_ref: String,
    #[arg(long)]
    pub label: Option<String>,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    pub title_id: String,
    #[arg(long)]
    pub episode: u32,
    #[arg(long)]
    pub position: f64,
    #[arg(long = "episode-ref")]
    pub episode_ref: String,
    #[arg(long)]
    pub label: Option<String>,
}
