use px8::{
    compiler::{compile, CompiledProgram},
    emulator::Emulator,
    memory::Memory,
};

use slog::{o, Drain, Logger};

fn compile_program() -> CompiledProgram {
    let source = include_str!("countdown.px8");

    let artifact = compile(source).expect("could not compile countdown.px8");
    assert!(artifact.diagnostics.is_empty());

    artifact
}

fn run_program(artifact: &CompiledProgram) -> Emulator {
    let mut memory = Memory::new(artifact.layout.image_size);
    memory.load(&artifact.to_image()).unwrap();

    let mut emulator = Emulator::new(memory);
    emulator.run().unwrap();

    assert!(emulator.halted);

    emulator
}

#[test]
fn test_countdown_allocations() {
    let artifact = compile_program();

    assert_eq!(artifact.variables, vec![
        ("i".to_string(), 200),
        ("sum".to_string(), 201),
    ]);

    // 10, 0 and 1; the loop condition's 0 is an immediate, not a constant.
    assert_eq!(artifact.constants, vec![(10, 100), (0, 101), (1, 102)]);
}

#[test]
fn test_countdown_execution() {
    let artifact = compile_program();
    let emulator = run_program(&artifact);

    assert_eq!(emulator.memory.get(201).unwrap(), 55);
    assert_eq!(emulator.memory.get(200).unwrap(), 0);
}

#[test]
fn test_countdown_with_trace_drain() {
    let decorator = slog_term::PlainDecorator::new(std::io::sink());
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let logger = Logger::root(drain, o!());

    let artifact = compile(include_str!("countdown.px8")).unwrap();

    let mut memory = Memory::new(artifact.layout.image_size);
    memory.load(&artifact.to_image()).unwrap();

    // Tracing every executed instruction must not disturb the result.
    let mut emulator = Emulator::new(memory);
    emulator.set_logger(logger);
    emulator.run().unwrap();

    assert_eq!(emulator.memory.get(201).unwrap(), 55);
}

#[test]
fn test_countdown_disassembly_matches_program() {
    let artifact = compile_program();
    let listing = artifact.disassemble();

    let instructions = listing
        .lines()
        .skip_while(|line| *line != "=== PROGRAM ===")
        .skip(1)
        .count();

    assert_eq!(instructions, artifact.program.len() / 2);
    assert!(!listing.contains("UNKNOWN"));
}
