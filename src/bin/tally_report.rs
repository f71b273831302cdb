use std::fs;

use tallyrust_rs::{IngestMode, PipelineTuning, Tally, TuningProfile};

const USAGE: &str = "usage: tally_report <input-file> [--workers N] [--stride BYTES] \
[--tuning balanced|high-throughput|memory-saver] [--tuning-file FILE.json] \
[--mode streaming|partitioned]";

fn parse_arg(flag: &str) -> Option<String> {
    let mut args = std::env::args();
    while let Some(arg) = args.next() {
        if arg == flag {
            return args.next();
        }
    }
    None
}

fn input_path() -> Option<String> {
    // First positional argument; every flag takes a value.
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        if args[i].starts_with("--") {
            i += 2;
        } else {
            return Some(args[i].clone());
        }
    }
    None
}

fn parse_tuning(value: Option<String>) -> anyhow::Result<PipelineTuning> {
    match value.as_deref() {
        Some("high-throughput") => Ok(PipelineTuning::from_profile(TuningProfile::HighThroughput)),
        Some("memory-saver") => Ok(PipelineTuning::from_profile(TuningProfile::MemorySaver)),
        Some("balanced") | None => Ok(PipelineTuning::from_profile(TuningProfile::Balanced)),
        Some(other) => anyhow::bail!("unknown tuning profile: {other}"),
    }
}

fn load_tuning(path: Option<String>) -> anyhow::Result<Option<PipelineTuning>> {
    if let Some(path) = path {
        let raw = fs::read_to_string(path)?;
        let tuning = serde_json::from_str(&raw)?;
        Ok(Some(tuning))
    } else {
        Ok(None)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let Some(path) = input_path() else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    let mut tuning = match load_tuning(parse_arg("--tuning-file"))? {
        Some(tuning) => tuning,
        None => parse_tuning(parse_arg("--tuning"))?,
    };
    if let Some(workers) = parse_arg("--workers") {
        tuning.workers = workers.parse()?;
    }
    if let Some(stride) = parse_arg("--stride") {
        tuning.stride = stride.parse()?;
    }
    match parse_arg("--mode").as_deref() {
        Some("partitioned") => tuning.mode = IngestMode::Partitioned,
        Some("streaming") => tuning.mode = IngestMode::Streaming,
        Some(other) => anyhow::bail!("unknown mode: {other}"),
        None => {}
    }

    let tally = Tally::with_tuning(&path, tuning)?;
    let summary = tally.run()?;
    println!("{}", summary.render());
    Ok(())
}
