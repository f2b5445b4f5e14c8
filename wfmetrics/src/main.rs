use clap::Parser;
use wfmetrics::http::setup_http_server;
use wfmetrics::init_telemetry::init_tracing;
use wfmetrics::settings::Settings;
use wfmetrics_core::Instrumentation;

#[derive(Parser)]
#[command(name = "wfmetrics")]
#[command(about = "Demo server reporting HTTP request metrics to Wavefront")]
#[clap(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Parser)]
enum Commands {
    /// Show current configuration and exit
    Config,
    /// Start the demo server (default)
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let settings = Settings::new()?;

    match cli.command.as_ref().unwrap_or(&Commands::Run) {
        Commands::Config => {
            println!("{:#?}", &settings);
            return Ok(());
        }
        Commands::Run => {}
    }

    init_tracing()?;

    let instrumentation = Instrumentation::configure(&settings.metrics)?;
    setup_http_server(instrumentation, &settings.bind_address).await
}
