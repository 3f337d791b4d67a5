//! # Pipeline Module
//!
//! A [`Ring`] chains machines together: each machine's output is the next
//! machine's input, and the last machine feeds the first. Every machine
//! gets a seed value before anything else (a phase setting, say), and the
//! first one also gets an initial signal to get things going.
//!
//! With a program that halts after one output the ring is just a chain,
//! and with a program that loops the signal goes around until every
//! machine halts. Either way the answer is whatever the last machine
//! left for the first.
use super::Error;
use crate::vm::{Channels, Interpreter, Program};
use ::std::{
    sync::mpsc::{channel, Receiver, Sender},
    thread,
};
use log::debug;

type Stage = Channels<Receiver<i64>, Sender<i64>>;

/// A ring of machines running the same program.
#[derive(Clone, Debug)]
pub struct Ring {
    program: Program,
    seeds: Vec<i64>,
    initial_signal: i64,
}

impl Ring {
    /// A ring with one machine per seed.
    pub fn new(program: Program, seeds: impl Into<Vec<i64>>) -> Self {
        Self {
            program,
            seeds: seeds.into(),
            initial_signal: 0,
        }
    }

    pub fn with_initial_signal(mut self, initial_signal: i64) -> Self {
        self.initial_signal = initial_signal;
        self
    }

    pub fn seeds(&self) -> &[i64] {
        &self.seeds
    }

    /// Run every machine to completion, and return the last value sent
    /// to the first machine.
    pub fn run(&self) -> Result<i64, Error> {
        let n = self.seeds.len();
        if n == 0 {
            return Err(Error::InvalidConfig("a ring needs at least one machine".to_string()));
        }

        let (senders, receivers): (Vec<Sender<i64>>, Vec<Receiver<i64>>) =
            (0..n).map(|_| channel()).unzip();
        for (sender, &seed) in senders.iter().zip(&self.seeds) {
            sender.send(seed).map_err(|_| Error::Disconnected)?;
        }
        senders[0]
            .send(self.initial_signal)
            .map_err(|_| Error::Disconnected)?;

        let mut stages = vec![];
        for (i, input) in receivers.into_iter().enumerate() {
            let output = senders[(i + 1) % n].clone();
            let program = self.program.clone();
            let stage = thread::Builder::new()
                .name(format!("ring-{i}"))
                .spawn(move || -> Result<Stage, Error> {
                    let mut machine = Interpreter::new(&program, Channels::new(input, output));
                    machine.run().map_err(|error| Error::NodeFault {
                        address: i,
                        ip: machine.ip(),
                        error,
                    })?;
                    debug!("ring machine {i} halted");
                    Ok(machine.into_device())
                })
                .map_err(|e| Error::Spawn(e.to_string()))?;
            stages.push(stage);
        }
        // A machine waiting on a halted neighbour must see the hang-up.
        drop(senders);

        let mut devices = vec![];
        for (i, stage) in stages.into_iter().enumerate() {
            let device = stage
                .join()
                .map_err(|_| Error::Panicked(format!("ring-{i}")))?;
            devices.push(device);
        }
        let mut devices = devices.into_iter().collect::<Result<Vec<_>, _>>()?;

        let first = devices.swap_remove(0);
        first.input.try_iter().last().ok_or(Error::NoSignal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_machine_ring() {
        // Reads two values, and outputs their sum.
        let program = Program::new(vec![3, 11, 3, 12, 1, 11, 12, 11, 4, 11, 99]);
        let result = Ring::new(program, [40]).with_initial_signal(2).run();
        assert_eq!(result, Ok(42));
    }

    #[test]
    fn test_empty_ring() {
        let program = Program::new(vec![99]);
        assert!(matches!(Ring::new(program, vec![]).run(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_no_signal() {
        // Consumes both inputs, and prints nothing.
        let program = Program::new(vec![3, 0, 3, 0, 99]);
        assert_eq!(Ring::new(program, [1]).run(), Err(Error::NoSignal));
    }
}
