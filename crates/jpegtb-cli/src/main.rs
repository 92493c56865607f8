use clap::Parser as ClapParser;
use jpegtb::{
    Comparison, DEFAULT_THRESHOLD, EncoderModel, FrameFormat, HarnessError, LogObserver,
    Scoreboard, Testbench, stimulus,
};
use miette::{IntoDiagnostic, Result, bail};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};
use std::path::{Path, PathBuf};

/// Suffix of reconstructions written in debug mode.
const PROCESSED_SUFFIX: &str = "_process.jpg";

#[derive(ClapParser)]
#[command(name = "jpegtb", about = "Run stimulus images through the JPEG encoder testbench")]
struct Cli {
    /// Directory holding one stimulus image per test case
    #[arg(default_value = "test_images")]
    images: PathBuf,

    /// Largest tolerated difference in percent
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Fixed JPEG header prepended to every captured payload
    #[arg(long)]
    header: Option<PathBuf>,

    /// Quality setting of the behavioral encoder
    #[arg(long, default_value_t = 90)]
    quality: u8,

    /// Abort a case after this many clock cycles
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Print the scoreboard as JSON to stdout
    #[arg(long)]
    json: bool,

    /// Verbose logging; also saves each reconstruction next to its stimulus
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug)?;

    let header = cli
        .header
        .as_deref()
        .map(FrameFormat::from_file)
        .transpose()
        .into_diagnostic()?;

    let paths: Vec<PathBuf> = stimulus::discover(&cli.images)
        .into_diagnostic()?
        .into_iter()
        .filter(|path| !stimulus::case_name(path).ends_with(PROCESSED_SUFFIX))
        .collect();
    if paths.is_empty() {
        bail!("No stimulus images found in {}", cli.images.display());
    }

    let mut board = Scoreboard::new();
    for path in &paths {
        let name = stimulus::case_name(path);
        log::info!("Running {name}");
        let result = run_case(&cli, header.as_ref(), path);
        match &result {
            Ok(comparison) => log::info!("{name}: passed ({:.6}%)", comparison.score),
            Err(err) => log::error!("{name}: {err}"),
        }
        board.record(name, &result);
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&board).into_diagnostic()?;
        println!("{json}");
    } else {
        for case in board.cases() {
            let status = if case.passed() { "PASS" } else { "FAIL" };
            println!("{status} {}", case.name);
        }
        println!("{}", board.summary());
    }

    if !board.all_passed() {
        bail!("{} of {} cases failed", board.failed(), board.cases().len());
    }
    Ok(())
}

fn run_case(
    cli: &Cli,
    header: Option<&FrameFormat>,
    path: &Path,
) -> Result<Comparison, HarnessError> {
    let image = stimulus::load(path)?;
    let model = EncoderModel::new(image.width(), image.height()).quality(cli.quality);
    let format = match header {
        Some(format) => format.clone(),
        None => model.frame_format()?,
    };

    let mut builder = Testbench::builder(model, format)
        .threshold(cli.threshold)
        .observer(LogObserver);
    if let Some(cycles) = cli.max_cycles {
        builder = builder.max_cycles(cycles);
    }
    let mut tb = builder.build();
    let result = tb.process_image(&image);

    if cli.debug {
        if let Some(frame) = tb.last_frame() {
            let mut target = path.as_os_str().to_owned();
            target.push(PROCESSED_SUFFIX);
            frame.save(PathBuf::from(target))?;
        }
    }
    result
}

fn init_logging(debug: bool) -> Result<()> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        level,
        ConfigBuilder::new()
            .set_location_level(LevelFilter::Off)
            .build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .into_diagnostic()
}
