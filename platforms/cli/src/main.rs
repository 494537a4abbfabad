use clap::Parser;
use log::debug;
use ndtm::{
    encode_input, Description, DescriptionLoader, EngineConfig, Glyphs, NdtmError,
    SampleManager, DEFAULT_BLANK_GLYPH, DEFAULT_LANES_PER_GROUP, DEFAULT_TERMINATOR,
};
use std::io::{self, Read, Write};
use std::path::Path;
use std::process;

/// Runs a non-deterministic Turing machine on every input of its description.
///
/// Prints one verdict per input: `1` accept, `0` reject, `U` undecided within budget.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(after_help = "EXAMPLES:
  ndtm-cli machine.ndtm
  cat machine.ndtm | ndtm-cli
  ndtm-cli --sample contains-ab --json")]
struct Cli {
    /// Path to a machine description file (.ndtm).
    /// Can also pipe the description via stdin.
    description_file: Option<String>,

    /// Run a built-in sample instead of a file
    #[clap(short, long, conflicts_with = "description_file")]
    sample: Option<String>,

    /// List the built-in samples and exit
    #[clap(long)]
    list_samples: bool,

    /// Glyph standing for the blank symbol [default: _]
    #[clap(short, long, conflicts_with = "sample")]
    blank: Option<char>,

    /// Character ending each input string [default: newline]
    #[clap(short, long, conflicts_with = "sample")]
    terminator: Option<char>,

    /// Number of sibling tapes sharing one allocation group
    #[clap(long, default_value_t = DEFAULT_LANES_PER_GROUP)]
    lanes: usize,

    /// Maximum number of live tape groups per run
    #[clap(long)]
    max_groups: Option<usize>,

    /// Print one JSON report per input instead of a bare verdict
    #[clap(long)]
    json: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if cli.list_samples {
        for name in SampleManager::names() {
            println!("{}", name);
        }
        return;
    }

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), NdtmError> {
    let glyphs = glyphs(cli)?;
    let config = EngineConfig {
        lanes_per_group: cli.lanes,
        max_groups: cli.max_groups,
    };

    match &cli.sample {
        Some(name) => {
            let sample = SampleManager::get(name)?;
            execute(&sample.description, config, cli.json)
        }
        None => {
            let description = load_description(cli, glyphs)?;
            execute(&description, config, cli.json)
        }
    }
}

/// Builds the glyph settings. Samples always use the defaults.
fn glyphs(cli: &Cli) -> Result<Glyphs, NdtmError> {
    let blank = match cli.blank {
        Some(c) => ascii(c, "Blank glyph", u8::is_ascii_graphic)?,
        None => DEFAULT_BLANK_GLYPH,
    };
    let terminator = match cli.terminator {
        Some(c) => ascii(c, "Terminator", u8::is_ascii)?,
        None => DEFAULT_TERMINATOR,
    };

    Ok(Glyphs { blank, terminator })
}

fn ascii(c: char, what: &str, accept: fn(&u8) -> bool) -> Result<u8, NdtmError> {
    u8::try_from(c)
        .ok()
        .filter(accept)
        .ok_or_else(|| {
            NdtmError::ValidationError(format!("{} is not a usable ASCII character: {:?}", what, c))
        })
}

/// Loads the description from a file path, or from stdin when it is piped.
fn load_description(cli: &Cli, glyphs: Glyphs) -> Result<Description, NdtmError> {
    if let Some(file_path) = &cli.description_file {
        DescriptionLoader::load_file(Path::new(file_path), glyphs)
    } else if atty::isnt(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| NdtmError::FileError(format!("Failed to read from stdin: {}", e)))?;
        DescriptionLoader::load_str(&buffer, glyphs)
    } else {
        Err(NdtmError::FileError(
            "No description given; pass a file, pipe one via stdin or use --sample".to_string(),
        ))
    }
}

/// Runs every input in order. Verdicts are flushed one by one so that a failing run
/// leaves the earlier lines in place.
fn execute(description: &Description, config: EngineConfig, json: bool) -> Result<(), NdtmError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for input in &description.inputs {
        let tape = encode_input(input, &description.glyphs);
        let (verdict, stats) = description.machine.run_with(&tape, config)?;
        debug!("input {:?}: {} after {} expansions", input, verdict, stats.expansions);

        let line = if json {
            serde_json::json!({
                "input": input,
                "verdict": verdict,
                "stats": stats,
            })
            .to_string()
        } else {
            verdict.to_string()
        };

        writeln!(out, "{}", line)
            .and_then(|_| out.flush())
            .map_err(|e| NdtmError::FileError(format!("Failed to write to stdout: {}", e)))?;
    }

    Ok(())
}
