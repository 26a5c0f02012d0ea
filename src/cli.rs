use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mediafetch")]
#[command(about = "Background video and playlist downloads over yt-dlp", long_about = None)]
pub struct Cli {
    /// Config file; defaults to $MEDIAFETCH_CONFIG or config/mediafetch.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Server(ServerArgs),
    /// Download one URL in the foreground; Ctrl+C cancels
    Fetch(FetchArgs),
    /// Print metadata for a URL as JSON without downloading
    Metadata(MetadataArgs),
    /// Check that yt-dlp can be run
    Check,
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to (overrides server.bind_addr)
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    pub url: String,

    /// yt-dlp format selector, e.g. "bestvideo+bestaudio/best"
    #[arg(long, short = 'f')]
    pub format: Option<String>,

    /// Treat the URL as a playlist
    #[arg(long, conflicts_with_all = ["format", "audio_only"])]
    pub playlist: bool,

    /// Extract audio only
    #[arg(long)]
    pub audio_only: bool,
}

#[derive(clap::Args, Debug)]
pub struct MetadataArgs {
    pub url: String,
}
