use intcode::{network::*, vm};

#[test]
fn test_chain() {
    let program: vm::Program = "3,15,3,16,1002,16,10,16,1,16,15,15,4,15,99,0,0".parse().unwrap();
    assert_eq!(Ring::new(program, [4, 3, 2, 1, 0]).run(), Ok(43210));
}

#[test]
fn test_chain_with_more_stages() {
    let program: vm::Program = "3,23,3,24,1002,24,10,24,1002,23,-1,23,\
        101,5,23,23,1,24,23,23,4,23,99,0,0"
        .parse()
        .unwrap();
    assert_eq!(Ring::new(program, [0, 1, 2, 3, 4]).run(), Ok(54321));
}

#[test]
fn test_feedback_loop() {
    let program: vm::Program = "3,26,1001,26,-4,26,3,27,1002,27,2,27,1,27,26,\
        27,4,27,1001,28,-1,28,1005,28,6,99,0,0,5"
        .parse()
        .unwrap();
    assert_eq!(Ring::new(program, [9, 8, 7, 6, 5]).run(), Ok(139629729));
}

#[test]
fn test_initial_signal() {
    // Adds its seed to the signal, once.
    let program = vm::Program::new(vec![3, 11, 3, 12, 1, 11, 12, 11, 4, 11, 99]);
    let ring = Ring::new(program, [1, 2, 3]).with_initial_signal(100);
    assert_eq!(ring.seeds(), &[1, 2, 3]);
    assert_eq!(ring.run(), Ok(106));
}

#[test]
fn test_stage_fault() {
    // Reads its seed, then writes through an immediate argument.
    let program = vm::Program::new(vec![3, 9, 1101, 1, 1, 5, 99]);
    let result = Ring::new(program.with_overrides(&[(2, 11101)]), [0, 0]).run();
    assert!(matches!(
        result,
        Err(Error::NodeFault {
            address: 0,
            ip: 2,
            error: vm::Error::ImmediateWrite { .. },
        })
    ));
}
