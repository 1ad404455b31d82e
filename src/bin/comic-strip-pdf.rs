//! Comic Strip PDF CLI tool
//!
//! Renders a folder of comic strip images into a PDF with variable size pages.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use comic_strip_pdf::{render_strip, RenderOptions, SortOrder};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrderOption {
    /// Numbers inside file names compare by value (page2 before page10)
    Natural,
    /// Plain character order (page10 before page2)
    Lexical,
}

impl From<OrderOption> for SortOrder {
    fn from(opt: OrderOption) -> Self {
        match opt {
            OrderOption::Natural => Self::Natural,
            OrderOption::Lexical => Self::Lexical,
        }
    }
}

/// Comic Strip PDF - Render a folder of images into a PDF without white margins
#[derive(Parser)]
#[command(name = "comic-strip-pdf")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Writes ~/comics/xkcd/xkcd.pdf, one page per image
    comic-strip-pdf xkcd ~/comics/xkcd

    # Keep plain character order and open the result
    comic-strip-pdf --order lexical --open \"Strips 2014\" ./strips")]
struct Cli {
    /// Name of the comic, used for the bookmark section and the PDF file name
    title: String,

    /// Directory that contains the comic image sequence
    root_path: PathBuf,

    /// How image files are ordered into pages
    #[arg(long, value_enum, default_value = "natural")]
    order: OrderOption,

    /// Output PDF file path (default: ROOT_PATH/TITLE.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also render files whose names start with a dot
    #[arg(long)]
    include_hidden: bool,

    /// Open the output file after creation
    #[arg(long)]
    open: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Install the fmt subscriber on stderr; RUST_LOG wins over the flags
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::ERROR,
        (false, 0) => LevelFilter::INFO,
        (false, 1) => LevelFilter::DEBUG,
        (false, _) => LevelFilter::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Render the strip directory named on the command line
fn run(cli: Cli) -> anyhow::Result<()> {
    let options = RenderOptions {
        title: cli.title,
        root: cli.root_path,
        order: cli.order.into(),
        include_hidden: cli.include_hidden,
        output_path: cli.output,
    };

    let report = render_strip(&options)
        .with_context(|| format!("Failed to render {}", options.root.display()))?;

    if !cli.quiet {
        println!("{}", report.summary());
    }

    if cli.open {
        open_file(&report.output_path)
            .with_context(|| format!("Failed to open {}", report.output_path.display()))?;
    }

    Ok(())
}

/// Open a file with the system default application
fn open_file(path: &Path) -> std::io::Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}
