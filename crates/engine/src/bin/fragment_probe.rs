use std::path::PathBuf;

use anyhow::Context as _;
use engine::{Engine, FragmentSource as _, analyze_page, parse_page};
use timetable_core::LayoutConfig;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let mut pdf_path: Option<PathBuf> = None;
    let mut page_number: u32 = 1;
    let mut config = LayoutConfig::default();

    let mut args = std::env::args_os().skip(1);
    while let Some(arg) = args.next() {
        let arg_str = arg.to_string_lossy();
        match arg_str.as_ref() {
            "--pdf" => {
                let value = args.next().context("missing value for --pdf")?;
                pdf_path = Some(PathBuf::from(value));
            }
            "--page" => {
                let value = args.next().context("missing value for --page")?;
                let value_str = value.to_string_lossy();
                page_number = value_str
                    .parse::<u32>()
                    .with_context(|| format!("invalid --page value: {value_str}"))?;
                if page_number == 0 {
                    anyhow::bail!("--page must be >= 1");
                }
            }
            "--anchor-day" => {
                let value = args.next().context("missing value for --anchor-day")?;
                config.anchor_day = value.to_string_lossy().to_string();
            }
            "-h" | "--help" => {
                print_help();
                return Ok(());
            }
            other => anyhow::bail!("unknown arg: {other} (try --help)"),
        }
    }
    config.normalize();

    let pdf_path = pdf_path.context("missing --pdf (try --help)")?;
    engine::check_pdf_input(&pdf_path)?;

    let engine = Engine::new();
    let source = engine.open(&pdf_path)?;
    let pages = source.page_count()?;
    println!("backend: {}", source.backend_name());
    println!("pages: {pages}");
    if page_number > pages {
        anyhow::bail!("--page {page_number} out of range (document has {pages} pages)");
    }

    let mut fragments = source
        .page_fragments(page_number - 1)
        .with_context(|| format!("read page {page_number}"))?;
    fragments.sort_by(|a, b| b.y.total_cmp(&a.y).then_with(|| a.x.total_cmp(&b.x)));

    println!();
    println!("fragments: {}", fragments.len());
    for f in &fragments {
        println!(
            "  x={:>7.1} y={:>7.1} w={:>6.1} h={:>5.1}  {:?}",
            f.x, f.y, f.width, f.height, f.text
        );
    }

    println!();
    let Some(layout) = analyze_page(&fragments, page_number, &config) else {
        println!("anchor {:?} not found: not a timetable page", config.anchor_day);
        return Ok(());
    };
    println!("title: {}", layout.title);
    for day in &layout.days {
        println!("  day {:<12} x={:>7.1} w={:>6.1}", day.name, day.x, day.width);
    }
    for period in &layout.periods {
        println!(
            "  period {:<3} y={:>7.1} h={:>5.1} time={:?}",
            period.label, period.y, period.height, period.time
        );
    }

    let entries = parse_page(&fragments, page_number, &config);
    println!();
    println!("entries: {}", entries.len());
    for e in &entries {
        println!(
            "  {} | {} | {} | {} | {} | {}",
            e.day, e.period, e.time, e.subject, e.teacher, e.class_name
        );
    }

    Ok(())
}

fn print_help() {
    println!(
        "\
fragment_probe

Usage:
  cargo run -p engine --bin fragment_probe -- --pdf <path> [--page <n>]

Options:
  --pdf <path>          PDF to inspect
  --page <n>            Page number to dump (1-based, default: 1)
  --anchor-day <token>  Day token anchoring the header row (default: sunday)
  --help                Show this help

Environment:
  TIMETABLE_PDFIUM_LIB_PATH  Path to libpdfium
  TIMETABLE_DISABLE_PDFIUM   Set to 1 to read content streams instead
"
    );
}
