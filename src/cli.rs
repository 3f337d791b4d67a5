use clap::*;
use codespan_reporting::{
    diagnostic::{Diagnostic, Label},
    files::SimpleFile,
    term::{
        emit,
        termcolor::{ColorChoice, StandardStream, WriteColor},
    },
};
use intcode::{
    network::{self, Config, Network, Ring},
    parse::{parse_program, SyntaxError},
    vm::{self, batch::run_batch, Device, Instruction, Interpreter, Program, StandardDevice, TestingDevice},
};
use log::{info, warn, LevelFilter};
use std::{fmt, fs::read_to_string};

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum TargetType {
    /// Run the program on standard input and output.
    Run,
    /// Run the program, printing every instruction to standard error.
    Trace,
    /// Print a listing of the program.
    Disasm,
    /// Run the program once per input, in parallel.
    Batch,
    /// Boot a network of nodes running the program.
    Network,
    /// Run a ring of machines seeded with the phases.
    Ring,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// The program image to load.
    #[clap(value_parser)]
    image: String,

    /// What to do with the program.
    #[clap(short, long, value_parser, default_value = "run")]
    target: TargetType,

    /// Input values, separated by commas. For `batch`, separate the runs
    /// with `;`. Without this, input is read from standard input.
    #[clap(short, long, value_parser, allow_hyphen_values = true)]
    input: Option<String>,

    /// Read and write characters instead of numbers.
    #[clap(long)]
    ascii: bool,

    /// Replace a memory cell before running, as `ADDR=VALUE`.
    #[clap(long = "set", value_parser = parse_override)]
    overrides: Vec<(usize, i64)>,

    /// The number of nodes in the network.
    #[clap(short, long, value_parser, default_value = "50")]
    nodes: usize,

    /// The address of the network's monitor.
    #[clap(long, value_parser, default_value = "255", allow_hyphen_values = true)]
    monitor: i64,

    /// How many empty receives in a row make a node idle.
    #[clap(long, value_parser, default_value = "5")]
    idle_threshold: usize,

    /// The seed of each machine in the ring, separated by commas.
    #[clap(long, value_parser, value_delimiter = ',', allow_hyphen_values = true)]
    phases: Vec<i64>,

    /// The log level. Defaults to `RUST_LOG`, or `warn` (`info` from the
    /// switch for networks).
    #[clap(short, long, value_parser)]
    log_level: Option<LogLevel>,
}

enum Error {
    IO(std::io::Error),
    Syntax(SyntaxError),
    Machine(vm::Error),
    Network(network::Error),
    InvalidInput(String),
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::IO(e) => write!(f, "IO error: {:?}", e),
            Error::Syntax(e) => write!(f, "Syntax error: {}", e.message),
            Error::Machine(e) => write!(f, "Machine error: {}", e),
            Error::Network(e) => write!(f, "Network error: {}", e),
            Error::InvalidInput(e) => write!(f, "Invalid input: {}", e),
        }
    }
}

impl From<vm::Error> for Error {
    fn from(e: vm::Error) -> Self {
        Error::Machine(e)
    }
}

impl From<network::Error> for Error {
    fn from(e: network::Error) -> Self {
        Error::Network(e)
    }
}

fn parse_override(s: &str) -> Result<(usize, i64), String> {
    let (addr, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ADDR=VALUE, found {s:?}"))?;
    let addr = addr
        .trim()
        .parse()
        .map_err(|_| format!("{addr:?} is not an address"))?;
    let value = value
        .trim()
        .parse()
        .map_err(|_| format!("{value:?} is not an integer"))?;
    Ok((addr, value))
}

fn parse_values(text: &str) -> Result<Vec<i64>, Error> {
    text.split(|ch: char| ch == ',' || ch.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse()
                .map_err(|_| Error::InvalidInput(format!("{token:?} is not an integer")))
        })
        .collect()
}

/// Render a syntax error in the image with codespan.
fn render_syntax_error(
    out: &mut dyn WriteColor,
    name: &str,
    src: &str,
    err: &SyntaxError,
) -> Result<(), codespan_reporting::files::Error> {
    let file = SimpleFile::new(name, src);
    let loc = format!("{}:{}:{}", name, err.line, err.column + 1);
    let diagnostic = Diagnostic::error()
        .with_message(format!("Invalid program image at {loc}"))
        .with_labels(vec![Label::primary((), err.offset..err.offset + err.length)
            .with_message(err.message.clone())]);

    let config = codespan_reporting::term::Config::default();
    emit(out, &config, &file, &diagnostic)
}

fn report_syntax_error(name: &str, src: &str, err: &SyntaxError) {
    let writer = StandardStream::stderr(ColorChoice::Auto);
    let mut out = writer.lock();
    if let Err(e) = render_syntax_error(&mut out, name, src, err) {
        warn!("could not render the diagnostic: {e}");
        eprintln!("{err}");
    }
}

fn load(name: &str) -> Result<Program, Error> {
    let src = read_to_string(name).map_err(Error::IO)?;
    parse_program(&src).map_err(|e| {
        report_syntax_error(name, &src, &e);
        Error::Syntax(e)
    })
}

/// Run a machine to completion, optionally echoing every instruction.
fn run_machine<T: Device>(program: &Program, device: T, trace: bool) -> Result<T, Error> {
    let mut machine = Interpreter::new(program, device);
    loop {
        if trace {
            match Instruction::decode(machine.memory(), machine.ip()) {
                Ok(instruction) => eprintln!("{instruction}"),
                Err(e) => eprintln!("{}: {e}", machine.ip()),
            }
        }
        if !machine.step()? {
            break;
        }
    }
    Ok(machine.into_device())
}

fn run(args: &Args, program: &Program) -> Result<(), Error> {
    let trace = args.target == TargetType::Trace;
    match &args.input {
        Some(text) => {
            let device = if args.ascii {
                TestingDevice::new(text)
            } else {
                TestingDevice::new_raw(parse_values(text)?)
            };
            let device = run_machine(program, device, trace)?;
            if args.ascii {
                print!("{}", device.output_str());
            } else {
                for val in device.output_vals() {
                    println!("{val}");
                }
            }
        }
        None => {
            let device = if args.ascii {
                StandardDevice::ascii()
            } else {
                StandardDevice::new()
            };
            run_machine(program, device, trace)?;
        }
    }
    Ok(())
}

fn batch(args: &Args, program: &Program) -> Result<(), Error> {
    let text = args.input.as_deref().ok_or_else(|| {
        Error::InvalidInput("batch runs need their inputs, given with --input".to_string())
    })?;
    let inputs = text
        .split(';')
        .map(parse_values)
        .collect::<Result<Vec<_>, _>>()?;

    for (i, result) in run_batch(program, &inputs).into_iter().enumerate() {
        match result {
            Ok(output) => println!("{i}: {}", Program::new(output)),
            Err(e) => println!("{i}: error: {e}"),
        }
    }
    Ok(())
}

fn network(args: &Args, program: &Program) -> Result<(), Error> {
    let config = Config::default()
        .with_nodes(args.nodes)
        .with_monitor(args.monitor)
        .with_idle_threshold(args.idle_threshold);
    let network = Network::new(config);
    let report = network.run(program)?;

    for fault in &report.faults {
        eprintln!("{fault}");
    }
    match report.first_monitor {
        Some(packet) => println!(
            "first packet to the monitor at {}: {packet}",
            network.config().monitor
        ),
        None => println!("nothing was sent to the monitor"),
    }
    if let Some(packet) = report.last_delivery() {
        println!("last delivery to node 0: {packet}");
    }
    info!("{} deliveries", report.deliveries.len());
    Ok(())
}

fn ring(args: &Args, program: &Program) -> Result<(), Error> {
    let signal = Ring::new(program.clone(), args.phases.clone())
        .with_initial_signal(Config::default().initial_signal)
        .run()?;
    println!("{signal}");
    Ok(())
}

/// The log filter used when neither `RUST_LOG` nor `--log-level` is set.
/// Networks report their first monitor packet (and each idle delivery)
/// at `info`, as they happen.
fn default_filter(target: TargetType) -> &'static str {
    match target {
        TargetType::Network => "warn,intcode::network::switch=info",
        _ => "warn",
    }
}

fn main() -> Result<(), Error> {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter(args.target)),
    );
    builder.format_timestamp(None);
    if let Some(level) = args.log_level {
        builder.filter_level(level.into());
    }
    builder.init();

    let program = load(&args.image)?.with_overrides(&args.overrides);
    match args.target {
        TargetType::Run | TargetType::Trace => run(&args, &program),
        TargetType::Disasm => {
            print!("{program:#}");
            Ok(())
        }
        TargetType::Batch => batch(&args, &program),
        TargetType::Network => network(&args, &program),
        TargetType::Ring => ring(&args, &program),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codespan_reporting::term::termcolor::NoColor;

    #[test]
    fn test_render_syntax_error() {
        let src = "1,2,\n3,x4,5\n";
        let err = parse_program(src).unwrap_err();
        let mut out = NoColor::new(Vec::new());
        render_syntax_error(&mut out, "image.txt", src, &err).unwrap();

        let rendered = String::from_utf8(out.into_inner()).unwrap();
        assert!(rendered.contains("Invalid program image at image.txt:2:3"), "{rendered}");
        assert!(rendered.contains("unexpected `x4`"), "{rendered}");
    }

    #[test]
    fn test_parse_override() {
        assert_eq!(parse_override("1=12"), Ok((1, 12)));
        assert_eq!(parse_override(" 2 = -7 "), Ok((2, -7)));
        assert!(parse_override("12").is_err());
        assert!(parse_override("-1=3").is_err());
    }

    #[test]
    fn test_network_logs_monitor_packets_by_default() {
        assert_eq!(default_filter(TargetType::Run), "warn");
        assert!(default_filter(TargetType::Network).contains("intcode::network::switch=info"));
    }

    #[test]
    fn test_args() {
        let args = Args::parse_from([
            "intcode", "image.txt", "-t", "network", "-n", "3", "--monitor", "-5", "--set", "1=2",
        ]);
        assert_eq!(args.target, TargetType::Network);
        assert_eq!(args.nodes, 3);
        assert_eq!(args.monitor, -5);
        assert_eq!(args.overrides, vec![(1, 2)]);
        assert_eq!(args.idle_threshold, 5);
    }
}
