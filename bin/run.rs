use px8::{
    assembler::{assemble, AssemblerError},
    compiler::{compile_with_logger, CompileError},
    emulator::Emulator,
    memory::Memory,
};

use clap::{App, Arg, ArgMatches};

use slog::{o, Drain, Logger};

enum Error {
    Compile(CompileError),
    Assemble(AssemblerError),
    Execution,
    IO(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::IO(e)
    }
}

impl From<CompileError> for Error {
    fn from(e: CompileError) -> Error {
        Error::Compile(e)
    }
}

impl From<AssemblerError> for Error {
    fn from(e: AssemblerError) -> Error {
        Error::Assemble(e)
    }
}

fn parse_arguments() -> ArgMatches<'static> {
    App::new("px8run")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Mitja Karhusaari <mitja@karhusaari.me>")
        .about("Utility for compiling and executing px8 programs")
        .arg(Arg::with_name("source")
             .help("File containing source code or a mnemonic listing")
             .value_name("SOURCE")
             .required(true)
             .index(1))
        .arg(Arg::with_name("disasm")
             .help("Print the compiled program before executing it")
             .long("disasm"))
        .arg(Arg::with_name("verbose")
             .help("Log compilation and execution to stderr")
             .long("verbose")
             .short("v"))
        .arg(Arg::with_name("tick")
             .help("Sleep this many milliseconds after every instruction")
             .long("tick")
             .value_name("MILLIS")
             .takes_value(true))
        .get_matches()
}

fn logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Logger::root(drain, o!())
}

fn main() {
    let args = parse_arguments();

    match run(&args) {
        Ok(()) => (),
        Err(Error::IO(io)) => eprintln!("IO error: {}", io),
        Err(Error::Execution) => eprintln!("Execution error"),
        Err(Error::Compile(err)) => eprintln!("Compile error: {}", err),
        Err(Error::Assemble(err)) => eprintln!("Assembler error: {}", err),
    }
}

fn run(args: &ArgMatches) -> Result<(), Error> {
    let file_path = args.value_of("source").unwrap();
    let file = std::fs::read_to_string(file_path)?;

    let logger = match args.is_present("verbose") {
        true => Some(logger()),
        false => None,
    };

    let image;

    if file_path.ends_with(".asm") {
        image = assemble(file.split_whitespace())?;
    } else {
        let artifact = compile_with_logger(&*file, logger.clone())?;

        for diagnostic in &artifact.diagnostics {
            eprintln!("warning: {}", diagnostic);
        }

        if args.is_present("disasm") {
            println!("{}", artifact.disassemble());
        }

        image = artifact.to_image();
    }

    let mut memory = Memory::new(image.len());
    memory.load(&image).map_err(|_| Error::Execution)?;

    let mut emulator = Emulator::new(memory);
    emulator.set_logger(logger);

    if let Some(millis) = args.value_of("tick") {
        let millis = millis.parse().map_err(|_| Error::Execution)?;
        emulator.set_tick(std::time::Duration::from_millis(millis));
    }

    emulator.run().map_err(|_| Error::Execution)?;

    println!("ACC = {}", emulator.context.acc);

    Ok(())
}
