use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use regtrace::regmap::RegisterMap;
use regtrace::{
    Extractor, IpxactRegisterMap, Protocol, SampleFrame, SignalMapping, TransactionDecoder,
    YamlRegisterMap,
};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    about = "Extracts AMBA AHB/APB register-access transactions from a sampled waveform and decodes them field by field against an IP-XACT or YAML register map. Report bugs and request features at <https://github.com/regtrace/regtrace>."
)]
struct Opt {
    #[structopt(long = "--protocol", help = "Bus protocol to recognize: ahb or apb.")]
    protocol: String,

    #[structopt(
        long = "--map",
        parse(from_os_str),
        help = "Register map file (IP-XACT XML or YAML)."
    )]
    map: PathBuf,

    #[structopt(
        long = "--map-format",
        name = "format",
        help = "Register map format (xml or yaml); inferred from the file extension when omitted."
    )]
    map_format: Option<String>,

    #[structopt(
        long = "--signal",
        number_of_values = 1,
        help = "Map a logical signal name to the waveform's actual name, as logical=actual. May be repeated."
    )]
    signals: Vec<String>,

    #[structopt(long = "--json", help = "Emit one JSON object per transaction.")]
    json: bool,

    #[structopt(
        name = "FRAMES",
        parse(from_os_str),
        help = "Frame input file: one {\"timestamp\": ..., \"signals\": {...}} JSON object per line."
    )]
    frames: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let mut mapping = SignalMapping::identity();
    for pair in &opt.signals {
        match pair.split_once('=') {
            Some((logical, actual)) => mapping = mapping.with(logical, actual),
            None => bail!("invalid --signal {:?}; expected logical=actual", pair),
        }
    }
    let protocol = Protocol::by_name(&opt.protocol, mapping)?;

    let format = match &opt.map_format {
        Some(format) => format.to_ascii_lowercase(),
        None => opt
            .map
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase(),
    };
    let map: Box<dyn RegisterMap> = match format.as_str() {
        "xml" | "ipxact" => Box::new(
            IpxactRegisterMap::load_from_file(&opt.map).context("failed to load register map")?,
        ),
        "yaml" | "yml" => Box::new(
            YamlRegisterMap::load_from_file(&opt.map).context("failed to load register map")?,
        ),
        other => bail!(
            "unsupported register map format {:?}; expected xml or yaml",
            other
        ),
    };
    let decoder = TransactionDecoder::new(map);

    let file = File::open(&opt.frames).context("failed to open frame file")?;
    let mut frames = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.context("failed to read frame file")?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: SampleFrame = serde_json::from_str(&line)
            .with_context(|| format!("frame file line {} is not a valid frame", number + 1))?;
        frames.push(frame);
    }

    let mut extractor = Extractor::new(frames.into_iter(), protocol);
    for transaction in extractor.decoded(&decoder) {
        match transaction {
            Err(e) => return Err(e).context("extraction error"),
            Ok(transaction) => {
                if opt.json {
                    println!("{}", serde_json::to_string(&transaction)?);
                } else {
                    println!("{:?}", transaction);
                }
            }
        }
    }

    Ok(())
}
