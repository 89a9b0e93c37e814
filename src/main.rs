use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "ocr-server",
    version,
    about = "Serve OCR over HTTP with bounded concurrency"
)]
struct Cli {
    /// Address to listen on (default: 0.0.0.0)
    #[arg(long = "host")]
    host: Option<String>,

    /// Port to listen on (default: 3746)
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,

    /// Maximum number of OCR requests processed at once (default: 4)
    #[arg(
        short = 'c',
        long = "max-concurrency",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    max_concurrency: Option<u16>,

    /// Longest image side in pixels before OCR (default: 1024)
    #[arg(long = "max-dimension", value_parser = clap::value_parser!(u32).range(1..))]
    max_dimension: Option<u32>,

    /// Tesseract languages, joined with '+' (e.g. eng+jpn)
    #[arg(short = 'l', long = "languages")]
    languages: Option<String>,

    /// Path to the tesseract binary
    #[arg(long = "tesseract")]
    tesseract: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Show installed tesseract languages and exit
    #[arg(long = "show-languages")]
    show_languages: bool,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    ocr_server::logging::init(cli.verbose)?;

    let config = ocr_server::Config {
        host: cli.host,
        port: cli.port,
        max_concurrency: cli.max_concurrency.map(usize::from),
        max_dimension: cli.max_dimension,
        languages: cli.languages,
        tesseract: cli.tesseract,
        settings_path: cli.read_settings,
    };

    if cli.show_languages {
        println!("{}", ocr_server::show_languages(&config)?);
        return Ok(());
    }

    ocr_server::run(config).await
}
