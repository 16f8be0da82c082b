//! Watches a track plan source file and rewrites the rendered JSON
//! whenever it changes, for a browser view that polls the output.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

use log::{info, warn};
use notify::{DebouncedEvent, RecursiveMode, Watcher};
use structopt::StructOpt;

use spurplan::AppResult;
use spurplan::errors::ErrorLog;
use spurplan::output::canvas_json;

#[derive(StructOpt, Debug)]
#[structopt(name = "spurplan-liveview")]
struct Opts {
    /// Track plan source file to watch
    #[structopt(parse(from_os_str))]
    input: PathBuf,
    /// JSON file rewritten after every rebuild
    #[structopt(short = "o", long = "output", parse(from_os_str),
                default_value = "plan.json")]
    output: PathBuf,
}

fn rebuild(input: &Path, output: &Path) -> AppResult<()> {
    let mut log = ErrorLog::new();
    let canvas = spurplan::build_file(input, &mut log)?;
    log.print();
    let doc = canvas_json(&canvas);
    fs::write(output, serde_json::to_string_pretty(&doc)?)?;
    info!("rebuilt {} ({} errors)", output.display(), log.errors().len());
    Ok(())
}

fn run(opts: &Opts) -> AppResult<()> {
    rebuild(&opts.input, &opts.output)?;
    // Editors replace files on save, so watch the directory and filter for
    // the canonical path instead of watching the file itself.
    let canonical = fs::canonicalize(&opts.input)?;
    let dir = canonical.parent().map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let (tx, rx) = channel();
    let mut watcher = notify::watcher(tx, Duration::from_millis(100))?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!("watching {}", canonical.display());
    loop {
        match rx.recv() {
            Ok(DebouncedEvent::Create(path))
            | Ok(DebouncedEvent::Write(path))
            | Ok(DebouncedEvent::Rename(_, path)) => {
                if path == canonical {
                    if let Err(e) = rebuild(&opts.input, &opts.output) {
                        warn!("rebuild failed: {}", e);
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("watch channel closed: {}", e);
                return Ok(());
            }
        }
    }
}

fn main() {
    env_logger::init();
    let opts = Opts::from_args();
    if let Err(e) = run(&opts) {
        eprintln!("spurplan-liveview: {}", e);
        std::process::exit(2);
    }
}
