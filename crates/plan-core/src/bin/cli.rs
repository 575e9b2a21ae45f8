use clap::Parser;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use study_plan::calendar::{parse_starting_day, parse_weekday, weekday_label};
use study_plan::config::{
    AppConfig, CONFIG_FILE_NAME, load_config, load_config_or_default, write_default_config,
};
use study_plan::logging::{LogFormat, init_tracing};
use study_plan::render::load_watermark;
use study_plan::schedule::parse_pace;
use study_plan::{
    DocumentFormat, DocumentRenderer, DocxRenderer, PlanMetadata, PlanSession, RecomputeSummary,
    SessionError, TableSnapshot, Watermark, load_catalog, save_table_to_csv, save_table_to_json,
};

/// Interactive monthly memorization plan editor.
#[derive(Parser)]
#[command(name = "cli", version, about = "Build a monthly memorization plan from the terminal.")]
struct Args {
    /// Config file (defaults to ./study-plan.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Chapter catalog (JSON or CSV); overrides `[catalog] path`.
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Write a default config file (to --config or ./study-plan.toml) and exit.
    #[arg(long)]
    init_config: bool,

    /// Participant name; overrides `[plan] participant_name`.
    #[arg(long)]
    participant: Option<String>,

    /// Log format: text (default) or json.
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn render_table_as_text(table: &[Vec<String>]) -> String {
    let columns = table.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in table {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.chars().count());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    for (row_idx, row) in table.iter().enumerate() {
        out.push('|');
        for (ci, width) in widths.iter().enumerate() {
            let cell = row.get(ci).map(String::as_str).unwrap_or("");
            out.push(' ');
            out.push_str(cell);
            out.push_str(&" ".repeat(width.saturating_sub(cell.chars().count())));
            out.push_str(" |");
        }
        out.push('\n');
        if row_idx == 0 {
            out.push_str(&sep);
            out.push('\n');
        }
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_help() {
    println!(
        "Commands:\n  help                       Show this help\n  show                       Show the plan table\n  catalog                    List chapters\n  name <text...>             Set participant name\n  month <1-12>               Set month\n  year <n>                   Set year\n  start-day <n>              First day of the month to plan\n  chapter <number>           Starting chapter (page resets to its first page)\n  page <n>                   Starting page within the chapter\n  pace <n>                   Pages per day\n  alternate <on|off>         Memorize every other day\n  exclude <day>              Skip a weekday (e.g. fri or الجمعة)\n  include <day>              Stop skipping a weekday\n  set <row> <col> <text...>  Edit a cell (row from 1, col 2-4)\n  compute                    Recompute the memorization column\n  export <docx|pdf|csv|json> [path]\n                             Write the plan to disk\n  quit|exit                  Exit"
    );
}

fn print_metadata(session: &PlanSession) {
    let metadata = session.metadata();
    let settings = session.settings();
    let mut excluded: Vec<_> = settings
        .excluded_weekdays
        .iter()
        .map(|day| (day.num_days_from_sunday(), weekday_label(*day)))
        .collect();
    excluded.sort();
    let excluded = excluded
        .into_iter()
        .map(|(_, label)| label)
        .collect::<Vec<_>>()
        .join(", ");
    println!("{}", session.document_title());
    println!(
        "Month {}/{} from day {}",
        metadata.month + 1,
        metadata.year,
        metadata.starting_day
    );
    println!(
        "Start {} page {}, pace {}, alternate {}, excluded [{}]",
        settings
            .start_chapter
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".into()),
        settings
            .start_page
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".into()),
        settings.pages_per_day,
        if settings.alternate_day { "on" } else { "off" },
        excluded
    );
}

fn print_result(session: &PlanSession, result: Result<RecomputeSummary, SessionError>) {
    match result {
        Ok(summary) => {
            println!(
                "Recomputed ({})\n{}",
                summary.to_cli_summary(),
                render_table_as_text(&session.table())
            );
        }
        Err(e) => println!("Error: {}", e),
    }
}

fn export(
    session: &PlanSession,
    config: &AppConfig,
    watermark: Option<&Watermark>,
    format: &str,
    path: Option<&str>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let default_name = session.export_file_name(DocumentFormat::Docx);
    let target = |extension: &str| -> PathBuf {
        match path {
            Some(path) => PathBuf::from(path),
            None => config
                .export
                .output_dir
                .join(Path::new(&default_name).with_extension(extension)),
        }
    };

    match format {
        "docx" | "pdf" => {
            let document = session.document(watermark.cloned());
            let (bytes, target) = if format == "docx" {
                (DocxRenderer::default().render(&document)?, target("docx"))
            } else {
                (config.export.pdf_renderer().render(&document)?, target("pdf"))
            };
            std::fs::write(&target, bytes)?;
            Ok(target)
        }
        "csv" | "json" => {
            let snapshot = TableSnapshot::new(session.document_title(), &session.table());
            let target = target(format);
            if format == "csv" {
                save_table_to_csv(&snapshot, &target)?;
            } else {
                save_table_to_json(&snapshot, &target)?;
            }
            Ok(target)
        }
        other => Err(format!("unknown export format '{other}'").into()),
    }
}

fn load_startup_watermark(config: &AppConfig) -> Option<Watermark> {
    let source = config.export.watermark_source()?;
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::warn!(error = %e, "could not start runtime for watermark download");
            return None;
        }
    };
    runtime.block_on(load_watermark(&source))
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose, args.log_format);

    if args.init_config {
        let path = args
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        if path.exists() {
            eprintln!("Config file {} already exists", path.display());
            std::process::exit(1);
        }
        match write_default_config(&path) {
            Ok(()) => {
                println!("Wrote {}", path.display());
                return;
            }
            Err(e) => {
                eprintln!("Error writing config: {}", e);
                std::process::exit(1);
            }
        }
    }

    let loaded = match &args.config {
        Some(path) => load_config_or_default(path),
        None => load_config(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let catalog_path = args
        .catalog
        .clone()
        .unwrap_or_else(|| config.catalog.path.clone());
    let catalog = match load_catalog(&catalog_path) {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => {
            eprintln!("Error loading catalog {}: {}", catalog_path.display(), e);
            std::process::exit(1);
        }
    };

    let mut metadata = PlanMetadata::default();
    metadata.participant_name = args
        .participant
        .clone()
        .unwrap_or_else(|| config.plan.participant_name.clone());
    let mut session = match PlanSession::new(catalog, metadata) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = session.set_pages_per_day(config.plan.pages_per_day) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    let watermark = load_startup_watermark(&config);

    println!("Study Plan (CLI) - type 'help' for commands\n");
    print_metadata(&session);
    println!("{}", render_table_as_text(&session.table()));

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => {
                print_help();
            }
            "quit" | "exit" => break,
            "show" => {
                print_metadata(&session);
                println!("{}", render_table_as_text(&session.table()));
            }
            "catalog" => {
                for chapter in session.catalog().chapters() {
                    println!(
                        "  {:>3}  {}  {}-{}",
                        chapter.number, chapter.name, chapter.start_page, chapter.end_page
                    );
                }
            }
            "name" => {
                let name = input[cmd.len()..].trim();
                if name.is_empty() {
                    println!("Usage: name <text...>");
                    continue;
                }
                session.set_participant_name(name);
                println!("{}", session.document_title());
            }
            "month" => match parts.next().and_then(|s| s.parse::<u32>().ok()) {
                Some(month @ 1..=12) => {
                    let result = session.set_month(month - 1);
                    print_result(&session, result);
                }
                Some(_) => println!("Invalid month (1-12)"),
                None => println!("Usage: month <1-12>"),
            },
            "year" => match parts.next().and_then(|s| s.parse::<i32>().ok()) {
                Some(year) => {
                    let result = session.set_year(year);
                    print_result(&session, result);
                }
                None => println!("Usage: year <n>"),
            },
            "start-day" => match parts.next() {
                Some(day_s) => {
                    let result = session.set_starting_day(parse_starting_day(day_s));
                    print_result(&session, result);
                }
                None => println!("Usage: start-day <n>"),
            },
            "chapter" => match parts.next().and_then(|s| s.parse::<u32>().ok()) {
                Some(number) => {
                    let result = session.select_chapter(number);
                    print_result(&session, result);
                }
                None => println!("Usage: chapter <number>"),
            },
            "page" => match parts.next().and_then(|s| s.parse::<u32>().ok()) {
                Some(page) => {
                    let result = session.select_page(page);
                    print_result(&session, result);
                }
                None => println!("Usage: page <n>"),
            },
            "pace" => match parts.next() {
                Some(pace_s) => {
                    let result = session.set_pages_per_day(parse_pace(pace_s));
                    print_result(&session, result);
                }
                None => println!("Usage: pace <n>"),
            },
            "alternate" => {
                let enabled = match parts.next() {
                    Some("on") => true,
                    Some("off") => false,
                    _ => {
                        println!("Usage: alternate <on|off>");
                        continue;
                    }
                };
                let result = session.set_alternate_day(enabled);
                print_result(&session, result);
            }
            "exclude" | "include" => match parts.next().and_then(parse_weekday) {
                Some(weekday) => {
                    let result = session.set_weekday_excluded(weekday, cmd == "exclude");
                    print_result(&session, result);
                }
                None => println!("Usage: {} <day>", cmd),
            },
            "set" => {
                let mut fields = input.splitn(4, char::is_whitespace).skip(1);
                let row = fields.next().and_then(|s| s.trim().parse::<usize>().ok());
                let col = fields.next().and_then(|s| s.trim().parse::<usize>().ok());
                let text = fields.next().map(str::trim).unwrap_or("");
                match (row, col) {
                    (Some(row), Some(col)) => match session.update_cell(row, col, text) {
                        Ok(()) => {
                            println!("Cell updated.");
                            println!("{}", render_table_as_text(&session.table()));
                        }
                        Err(e) => println!("Error: {}", e),
                    },
                    _ => println!("Usage: set <row> <col> <text...>"),
                }
            }
            "compute" => {
                let result = session.recompute();
                print_result(&session, result);
            }
            "export" => {
                let format = parts.next();
                let path = parts.next();
                match format {
                    Some(format) => {
                        match export(&session, &config, watermark.as_ref(), format, path) {
                            Ok(target) => println!("Exported to {}.", target.display()),
                            Err(e) => println!("Error exporting plan: {}", e),
                        }
                    }
                    None => println!("Usage: export <docx|pdf|csv|json> [path]"),
                }
            }
            _ => {
                println!("Unknown command. Type 'help'.");
            }
        }
    }
}
