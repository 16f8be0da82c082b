use std::fs;
use std::path::PathBuf;
use std::process;

use log::info;
use structopt::StructOpt;

use spurplan::AppResult;
use spurplan::errors::ErrorLog;
use spurplan::output::canvas_json;

/// Compiles a track plan source file and renders it to JSON.
#[derive(StructOpt, Debug)]
#[structopt(name = "spurplan")]
struct Opts {
    /// Track plan source file
    #[structopt(parse(from_os_str))]
    input: PathBuf,
    /// Write the rendered canvas JSON to this file
    #[structopt(short = "o", long = "output", parse(from_os_str))]
    output: Option<PathBuf>,
    /// Print the rendered canvas JSON to stdout
    #[structopt(short = "p", long = "print")]
    print: bool,
}

fn run(opts: &Opts) -> AppResult<bool> {
    let mut log = ErrorLog::new();
    let canvas = spurplan::build_file(&opts.input, &mut log)?;
    log.print();
    let doc = canvas_json(&canvas);
    if let Some(ref path) = opts.output {
        fs::write(path, serde_json::to_string_pretty(&doc)?)?;
        info!("wrote {}", path.display());
    }
    if opts.print {
        println!("{}", doc);
    }
    Ok(!log.has_errors())
}

fn main() {
    env_logger::init();
    let opts = Opts::from_args();
    match run(&opts) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("spurplan: {}", e);
            process::exit(2);
        }
    }
}
