mod wav;

use clap::{Args, Parser, Subcommand};
use log::{info, warn, LevelFilter};
use magswipe_core::{
    BufferSource, ClockConfig, DecodeError, DecodeReport, Decoder, DecoderConfig, Encoder,
    EncoderConfig, Orientation, PeakConfig, ReaderSource, SegmenterConfig, SwipeSegmenter,
};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "magswipe")]
#[command(about = "Decode magnetic stripe cards from swipe audio")]
struct Cli {
    /// Log decoder internals (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a recorded swipe
    Decode {
        /// Input WAV file
        #[arg(value_name = "INPUT.WAV")]
        input: PathBuf,

        /// Locate the swipe with the energy detector instead of decoding
        /// the whole file
        #[arg(long)]
        segment: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Read raw s16le 44.1 kHz mono PCM from stdin and decode every swipe
    Listen {
        /// Stop after this many swipes
        #[arg(long, value_name = "N")]
        max_swipes: Option<usize>,

        /// Print each result as a JSON line
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Write a synthetic swipe of the given track data
    Encode {
        /// Characters between the sentinels, e.g. 4111111111111111=2512
        #[arg(value_name = "DATA")]
        data: String,

        /// Output WAV file
        #[arg(value_name = "OUTPUT.WAV")]
        output: PathBuf,

        /// Samples per bit cell (lower is a faster swipe)
        #[arg(long, default_value = "100")]
        samples_per_bit: usize,

        /// Play the card backwards
        #[arg(long)]
        reverse: bool,
    },
}

#[derive(Args)]
struct Tuning {
    /// Chunk power over the noise floor that counts as a swipe
    #[arg(long, default_value_t = magswipe_core::THRESHOLD_FACTOR)]
    threshold: f64,

    /// Initial peak threshold as a fraction of the leading peak-to-peak
    #[arg(long, default_value_t = magswipe_core::FIRST_PEAK_FACTOR)]
    first_peak_factor: f64,

    /// Next peak threshold as a fraction of the last peak
    #[arg(long, default_value_t = magswipe_core::SECOND_PEAK_FACTOR)]
    second_peak_factor: f64,
}

impl Tuning {
    fn segmenter(&self) -> SegmenterConfig {
        SegmenterConfig {
            threshold_factor: self.threshold,
            ..SegmenterConfig::default()
        }
    }

    fn decoder(&self) -> Decoder {
        Decoder::with_config(DecoderConfig {
            peaks: PeakConfig {
                first_peak_factor: self.first_peak_factor,
                second_peak_factor: self.second_peak_factor,
                ..PeakConfig::default()
            },
            clock: ClockConfig::default(),
        })
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    ok: bool,
    track: Option<&'a str>,
    error: Option<String>,
    orientation: Option<&'static str>,
    peaks: usize,
    bits: usize,
    groups: usize,
    malformed: Option<String>,
}

impl<'a> From<&'a DecodeReport> for JsonReport<'a> {
    fn from(report: &'a DecodeReport) -> Self {
        Self {
            ok: report.result.is_ok(),
            track: report.result.as_deref().ok(),
            error: report.result.as_ref().err().map(|e| e.to_string()),
            orientation: report.orientation.map(|o| match o {
                Orientation::Forward => "forward",
                Orientation::Reverse => "reverse",
            }),
            peaks: report.peaks,
            bits: report.bits,
            groups: report.groups,
            malformed: report
                .framing
                .as_ref()
                .and_then(|stop| stop.malformed())
                .map(|e| e.to_string()),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if cli.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    match cli.command {
        Commands::Decode {
            input,
            segment,
            json,
            tuning,
        } => decode_command(&input, segment, json, &tuning),
        Commands::Listen {
            max_swipes,
            json,
            tuning,
        } => listen_command(max_swipes, json, &tuning),
        Commands::Encode {
            data,
            output,
            samples_per_bit,
            reverse,
        } => encode_command(&data, &output, samples_per_bit, reverse),
    }
}

/// Print a report; the decoded track goes to stdout, failures to stderr
fn print_report(report: &DecodeReport, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(&JsonReport::from(report))?);
        return Ok(());
    }
    match &report.result {
        Ok(track) => println!("{}", track),
        Err(err) => eprintln!("{}", err),
    }
    Ok(())
}

fn decode_command(
    input_path: &PathBuf,
    segment: bool,
    json: bool,
    tuning: &Tuning,
) -> Result<(), Box<dyn std::error::Error>> {
    let samples = wav::read_samples(BufReader::new(File::open(input_path)?))?;
    info!("Extracted {} samples", samples.len());

    let decoder = tuning.decoder();
    let report = if segment {
        let mut segmenter =
            SwipeSegmenter::with_config(BufferSource::new(samples), tuning.segmenter())?;
        decoder
            .read_card(&mut segmenter)?
            .ok_or("No swipe found in recording")?
    } else {
        decoder.decode_report(&samples)
    };

    print_report(&report, json)?;
    match report.result {
        Ok(_) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn listen_command(
    max_swipes: Option<usize>,
    json: bool,
    tuning: &Tuning,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = ReaderSource::new(std::io::stdin().lock());
    let mut segmenter = SwipeSegmenter::with_config(source, tuning.segmenter())?;
    let decoder = tuning.decoder();

    eprintln!("READY");
    let mut swipes = 0;
    while max_swipes.map_or(true, |max| swipes < max) {
        let report = match decoder.read_card(&mut segmenter) {
            Ok(Some(report)) => report,
            Ok(None) => {
                info!("Input closed after {} swipes", swipes);
                break;
            }
            // Only this capture is lost; the segmenter carries on with the next chunk
            Err(err @ DecodeError::SwipeTooLong { .. }) => {
                warn!("Discarding capture: {}", err);
                DecodeReport {
                    result: Err(err),
                    orientation: None,
                    peaks: 0,
                    bits: 0,
                    groups: 0,
                    framing: None,
                }
            }
            Err(err) => return Err(err.into()),
        };
        print_report(&report, json)?;
        swipes += 1;
    }
    Ok(())
}

fn encode_command(
    data: &str,
    output_path: &PathBuf,
    samples_per_bit: usize,
    reverse: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let encoder = Encoder::with_config(EncoderConfig {
        samples_per_bit,
        ..EncoderConfig::default()
    })?;
    let mut samples = encoder.encode(data)?;
    if reverse {
        samples.reverse();
    }
    info!("Encoded {} characters to {} samples", data.len(), samples.len());

    wav::write_samples(BufWriter::new(File::create(output_path)?), &samples)?;
    println!("Wrote {} samples to {}", samples.len(), output_path.display());
    Ok(())
}
