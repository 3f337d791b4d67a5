use intcode::{side_effects::*, vm::*};
use std::{collections::VecDeque, sync::mpsc::channel, thread};

const ECHO_THREE: [i64; 13] = [3, 20, 4, 20, 3, 20, 4, 20, 3, 20, 4, 20, 99];

#[test]
fn test_finite_channels() {
    let program = Program::new(ECHO_THREE);
    let input: VecDeque<i64> = vec![1, 2, 3].into();
    let device = Interpreter::new(&program, Channels::new(input, Vec::new()))
        .finish()
        .unwrap();
    assert_eq!(device.output, vec![1, 2, 3]);
    assert!(device.input.is_empty());
}

#[test]
fn test_finite_input_runs_dry() {
    let program = Program::new(ECHO_THREE);
    let input: VecDeque<i64> = vec![1, 2].into();
    let mut machine = Interpreter::new(&program, Channels::new(input, Vec::new()));
    assert_eq!(machine.run(), Err(Error::InputExhausted));
    assert_eq!(machine.device().output, vec![1, 2]);
}

#[test]
fn test_queue_channels_across_threads() {
    let (to_machine, input) = channel::<i64>();
    let (output, from_machine) = channel::<i64>();
    let program = Program::new(ECHO_THREE);

    let worker = thread::spawn(move || {
        Interpreter::new(&program, Channels::new(input, output))
            .finish()
            .map(|_| ())
    });

    // The machine blocks on each read until the value is pushed.
    for val in [10, 20, 30] {
        to_machine.send(val).unwrap();
        assert_eq!(from_machine.recv(), Ok(val));
    }
    assert_eq!(worker.join().unwrap(), Ok(()));
}

#[test]
fn test_queue_disconnect() {
    let (to_machine, input) = channel::<i64>();
    let (output, _from_machine) = channel::<i64>();
    drop(to_machine);
    let result = Interpreter::new(&Program::new(ECHO_THREE), Channels::new(input, output)).finish();
    assert!(matches!(result, Err(Error::Disconnected)));
}

#[test]
fn test_callback_channels() {
    let mut next: i64 = 0;
    let mut seen: Vec<i64> = vec![];
    let input = Callback(|| {
        next += 5;
        Ok::<i64, Error>(next)
    });
    let output = Callback(|val: i64| {
        seen.push(val);
        Ok::<(), Error>(())
    });
    Interpreter::new(&Program::new(ECHO_THREE), Channels::new(input, output))
        .run()
        .unwrap();
    assert_eq!(seen, vec![5, 10, 15]);
}

#[test]
fn test_callback_can_refuse() {
    let input = Callback(|| Err::<i64, Error>(Error::Device("unplugged".to_string())));
    let mut machine = Interpreter::new(&Program::new(ECHO_THREE), Channels::new(input, Vec::new()));
    assert_eq!(machine.run(), Err(Error::Device("unplugged".to_string())));
}

#[test]
fn test_borrowed_channels() {
    let mut input: VecDeque<i64> = vec![4, 5, 6, 7].into();
    let mut output: Vec<i64> = vec![];
    Interpreter::new(&Program::new(ECHO_THREE), Channels::new(&mut input, &mut output))
        .run()
        .unwrap();
    assert_eq!(output, vec![4, 5, 6]);
    assert_eq!(input, vec![7]);
}
