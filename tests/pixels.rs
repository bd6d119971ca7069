use px8::{
    compiler::compile,
    display::Rgb,
    emulator::Emulator,
    event::Event,
    memory::Memory,
};

use std::sync::{Arc, Mutex};

#[test]
fn test_pixels_diagonal() {
    let artifact = compile(include_str!("pixels.px8")).unwrap();
    assert!(artifact.diagnostics.is_empty());

    let mut memory = Memory::new(artifact.layout.image_size);
    memory.load(&artifact.to_image()).unwrap();

    let mut emulator = Emulator::new(memory);

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    emulator.add_listener(move |event: &Event| {
        sink.lock().unwrap().push(event.clone());
    });

    emulator.run().unwrap();

    let expected = Rgb {
        r: 200,
        g: 100,
        b: 50,
    };

    for i in 0..5usize {
        assert_eq!(emulator.screen.pixel(i, i), expected);
    }

    assert_eq!(emulator.screen.pixel(5, 5), Rgb { r: 0, g: 0, b: 0 });
    assert!(emulator.screen.is_dirty());

    let events = events.lock().unwrap();
    let draws = events
        .iter()
        .filter(|event| matches!(event, Event::PixelDrawn { .. }))
        .count();

    assert_eq!(draws, 5);
    // The trailing HLT sits in the last instruction slot.
    assert!(events.contains(&Event::Halted {
        address: artifact.program.len() as u16 - 2,
    }));
}
