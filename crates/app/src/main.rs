use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use directories::ProjectDirs;
use timetable_application::AppContext;
use timetable_core::Settings;
use timetable_engine::Engine;
use timetable_storage::Storage;
use timetable_ui::{Ui, UiExit};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

#[derive(Debug, Default)]
struct Args {
    pdf: Option<PathBuf>,
    json: bool,
    anchor_day: Option<String>,
    split_gap: Option<f32>,
    help: bool,
}

fn parse_args(args: impl IntoIterator<Item = std::ffi::OsString>) -> anyhow::Result<Args> {
    let mut out = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let arg_str = arg.to_string_lossy();
        match arg_str.as_ref() {
            "--json" => out.json = true,
            "--anchor-day" => {
                let value = args.next().context("missing value for --anchor-day")?;
                out.anchor_day = Some(value.to_string_lossy().to_string());
            }
            "--split-gap" => {
                let value = args.next().context("missing value for --split-gap")?;
                let value_str = value.to_string_lossy();
                let gap = value_str
                    .parse::<f32>()
                    .with_context(|| format!("invalid --split-gap value: {value_str}"))?;
                out.split_gap = Some(gap);
            }
            "-h" | "--help" => out.help = true,
            other if other.starts_with('-') => {
                anyhow::bail!("unknown arg: {other} (try --help)")
            }
            _ => {
                if out.pdf.is_some() {
                    anyhow::bail!("only one PDF can be given");
                }
                out.pdf = Some(PathBuf::from(arg));
            }
        }
    }
    Ok(out)
}

fn run() -> anyhow::Result<()> {
    let args = parse_args(std::env::args_os().skip(1))?;
    if args.help {
        print_help();
        return Ok(());
    }

    let project_dirs =
        ProjectDirs::from("dev", "timetable", "timetable").context("resolve project dirs")?;

    if args.json {
        init_logging(None);
    } else {
        init_logging(Some(project_dirs.data_dir()));
    }

    let config_dir = project_dirs.config_dir();
    fs::create_dir_all(config_dir)
        .with_context(|| format!("create config dir {}", config_dir.display()))?;

    let db_path = config_dir.join("timetable.db");
    let storage = Storage::open(&db_path)?;
    let mut settings = storage.load_settings()?;
    if apply_overrides(&mut settings, &args) {
        storage.save_settings(&settings)?;
    }

    if args.json {
        let pdf = args.pdf.context("--json needs a PDF path")?;
        return print_json(&pdf, &settings);
    }

    let mut ui = Ui::new(AppContext::new(settings));
    if let Some(pdf) = args.pdf {
        ui.queue_document(pdf);
    }
    let outcome = ui.run()?;
    storage.save_settings(&outcome.ctx.settings)?;

    match outcome.exit {
        UiExit::Quit => Ok(()),
    }
}

/// Returns whether anything changed.
fn apply_overrides(settings: &mut Settings, args: &Args) -> bool {
    let before = settings.clone();
    if let Some(anchor) = &args.anchor_day {
        settings.layout.anchor_day = anchor.clone();
    }
    if let Some(gap) = args.split_gap {
        settings.layout.split_gap = gap;
    }
    settings.normalize();
    *settings != before
}

fn print_json(pdf: &Path, settings: &Settings) -> anyhow::Result<()> {
    let engine = Engine::new();
    let doc = engine.parse_pdf(pdf, &settings.layout)?;
    if doc.is_empty() {
        log::warn!(
            "no data could be extracted from {} ({} pages); the layout may not be recognized",
            pdf.display(),
            doc.pages
        );
    }
    let json = serde_json::to_string_pretty(&doc.entries).context("encode entries")?;
    println!("{json}");
    Ok(())
}

/// Logs to `<log_dir>/timetable.log` when given, stderr otherwise.
fn init_logging(log_dir: Option<&Path>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    if let Some(dir) = log_dir {
        let file = fs::create_dir_all(dir).and_then(|()| {
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("timetable.log"))
        });
        match file {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            // Nothing may reach the terminal while the TUI owns it.
            Err(_) => {
                builder.filter_level(log::LevelFilter::Off);
            }
        }
    }

    builder.init();
}

fn print_help() {
    println!(
        "\
timetable

Usage:
  timetable [PDF] [--json] [--anchor-day <token>] [--split-gap <points>]

Options:
  --json                 Print the extracted entries as JSON instead of opening the UI
  --anchor-day <token>   Day token anchoring the header row (saved, default: sunday)
  --split-gap <points>   Horizontal gap separating groups inside a cell (saved, default: 15)
  -h, --help             Show this help

Environment:
  RUST_LOG                   Log filter (default: info)
  TIMETABLE_PDFIUM_LIB_PATH  Path to libpdfium
  TIMETABLE_DISABLE_PDFIUM   Set to 1 to read content streams instead
"
    );
}
