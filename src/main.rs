use clap::{Parser, ValueEnum};
use escore::interpreter::{Location, TraceEvent};
use escore::{CompatFlags, Config, EngineError, Interpreter, JsValue, Strategy};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Tree,
    Bytecode,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CompatArg {
    AnnexB,
    Ext1,
    Undefdef,
    SgmlComment,
}

#[derive(Parser, Debug)]
#[command(name = "escore", version, about = "An ECMAScript 3 interpreter")]
struct Cli {
    /// Script file to execute
    file: Option<PathBuf>,

    /// Evaluate inline code
    #[arg(short = 'e', long = "eval")]
    eval: Option<String>,

    /// Execution strategy
    #[arg(long, value_enum, default_value = "tree")]
    strategy: StrategyArg,

    /// Comma-separated compatibility flags
    #[arg(long, value_enum, value_delimiter = ',')]
    compat: Vec<CompatArg>,

    /// Maximum nested calls before a RangeError (0 for no limit)
    #[arg(long)]
    recursion_limit: Option<u32>,

    /// Disable constant folding in the bytecode compiler
    #[arg(long)]
    no_fold: bool,

    /// Print each statement, call and return to stderr
    #[arg(long)]
    trace: bool,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config {
            strategy: match self.strategy {
                StrategyArg::Tree => Strategy::TreeWalk,
                StrategyArg::Bytecode => Strategy::Bytecode,
            },
            constant_folding: !self.no_fold,
            ..Config::default()
        };
        for flag in &self.compat {
            config.compat |= match flag {
                CompatArg::AnnexB => CompatFlags::ANNEX_B,
                CompatArg::Ext1 => CompatFlags::EXT1,
                CompatArg::Undefdef => CompatFlags::UNDEFDEF,
                CompatArg::SgmlComment => CompatFlags::SGML_COMMENT,
            };
        }
        if let Some(limit) = self.recursion_limit {
            config.recursion_limit = (limit > 0).then_some(limit);
        }
        config
    }
}

fn new_interpreter(cli: &Cli) -> Interpreter {
    let mut interp = Interpreter::new(cli.config());
    let print = interp.create_function("print", 1, |interp, _this, args| {
        let parts: Vec<String> = args.iter().map(|v| interp.value_to_string(v)).collect();
        println!("{}", parts.join(" "));
        Ok(JsValue::Undefined)
    });
    interp.define_global("print", JsValue::Object(print));
    if cli.trace {
        interp.set_trace_hook(Some(Rc::new(|_: &mut Interpreter, location: &Location, event: TraceEvent| {
            eprintln!("[trace] {location} {event:?}");
        })));
    }
    interp
}

fn report(interp: &Interpreter, error: &EngineError) {
    eprintln!("{error}");
    if let EngineError::Uncaught { traceback, .. } = error {
        for entry in traceback.iter().rev() {
            let kind = match entry.call_type {
                escore::interpreter::CallType::Call => "call",
                escore::interpreter::CallType::Construct => "construct",
            };
            eprintln!("    at {} ({kind})", entry.call_location);
        }
    }
    tracing::debug!(objects = interp.live_objects(), "script failed");
}

fn execute_code(cli: &Cli, source_name: &str, code: &str, print_result: bool) -> ExitCode {
    let mut interp = new_interpreter(cli);
    match interp.evaluate(source_name, code) {
        Ok(value) => {
            if print_result && let Some(value) = value.filter(|v| !v.is_undefined()) {
                println!("{}", interp.value_to_string(&value));
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            report(&interp, &e);
            ExitCode::from(1)
        }
    }
}

fn run_file(cli: &Cli, path: &Path) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading {}: {e}", path.display());
            return ExitCode::from(1);
        }
    };
    execute_code(cli, &path.display().to_string(), &source, false)
}

fn run_repl(cli: &Cli) -> ExitCode {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut interp = new_interpreter(cli);

    println!("escore v{}", env!("CARGO_PKG_VERSION"));
    println!("Type ECMAScript statements. Press Ctrl-D to exit.");

    loop {
        print!("> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match interp.evaluate("<stdin>", trimmed) {
                    Ok(Some(value)) => println!("{}", interp.value_to_string(&value)),
                    Ok(None) => {}
                    Err(e) => report(&interp, &e),
                }
            }
            Err(e) => {
                eprintln!("Read error: {e}");
                return ExitCode::from(1);
            }
        }
    }

    println!();
    ExitCode::SUCCESS
}

fn run(cli: &Cli) -> ExitCode {
    if let Some(code) = &cli.eval {
        return execute_code(cli, "<eval>", code, true);
    }

    if let Some(path) = &cli.file {
        return run_file(cli, path);
    }

    run_repl(cli)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .init();
    }

    run(&cli)
}
