use anyhow::Result;
use clap::Parser;
use clipsmith::config::Config;
use clipsmith::init;
use clipsmith::pipeline::run_pipeline;

#[derive(Parser, Debug)]
#[command(name = "clipsmith", about = "Cut long-form videos into short vertical clips")]
struct Args {
    /// Source video URL, or a path to a local media file
    source: String,

    /// Path to the JSON config file
    #[clap(long, default_value = "config.json")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    init::ensure_directories().await?;
    if !init::check_ffmpeg().await {
        eprintln!("[WARNING] FFmpeg not found in PATH. Please install FFmpeg.");
    }
    if !init::check_yt_dlp().await {
        eprintln!("[WARNING] yt-dlp not found in PATH. Only local source files will work.");
    }

    let cfg = Config::load(&args.config).await?;
    let summary = run_pipeline(&cfg, &args.source).await?;

    println!(
        "Rendered {} clip(s) ({} of {} requested moments extracted)",
        summary.rendered, summary.extracted, summary.requested
    );
    Ok(())
}
