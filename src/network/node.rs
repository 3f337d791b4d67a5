//! # Node Module
//!
//! A node is one machine on its own thread, wired to the switch. Its
//! input and output are adapters that turn the machine's single values
//! into switch requests.
use super::{Config, Error, Handle, Packet, Reply};
use crate::{
    side_effects::{Input, Output},
    vm::{self, Channels, Interpreter, Program},
};
use ::std::{
    panic::{self, AssertUnwindSafe},
    thread::{self, JoinHandle},
};
use log::{debug, error, warn};

/// How a node stopped, when it stopped cleanly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    /// The program executed `halt`.
    Halted,
    /// The switch told the node to shut down.
    Shutdown,
    /// The switch went away.
    Disconnected,
}

/// Boot handshake first, then packets from the switch.
struct Inbox {
    address: usize,
    handle: Handle,
    booted: bool,
    /// The `y` of a packet whose `x` was just read.
    stashed: Option<i64>,
    empty_input: i64,
}

impl Input for Inbox {
    fn get(&mut self) -> Result<i64, vm::Error> {
        if !self.booted {
            self.booted = true;
            return Ok(self.address as i64);
        }
        if let Some(y) = self.stashed.take() {
            return Ok(y);
        }
        match self.handle.receive(self.address)? {
            Reply::Packet(packet) => {
                self.stashed = Some(packet.y);
                Ok(packet.x)
            }
            Reply::Empty => Ok(self.empty_input),
            Reply::Shutdown => Err(vm::Error::Shutdown),
        }
    }
}

/// Collects outputs into `(destination, x, y)` triples.
struct Outbox {
    address: usize,
    handle: Handle,
    pending: Vec<i64>,
}

impl Output for Outbox {
    fn put(&mut self, val: i64) -> Result<(), vm::Error> {
        self.pending.push(val);
        if let [to, x, y] = self.pending[..] {
            self.pending.clear();
            self.handle.send(self.address, to, Packet::new(x, y))?;
        }
        Ok(())
    }
}

fn run_node(address: usize, program: &Program, handle: Handle, empty_input: i64) -> Result<Exit, Error> {
    let device = Channels::new(
        Inbox {
            address,
            handle: handle.clone(),
            booted: false,
            stashed: None,
            empty_input,
        },
        Outbox {
            address,
            handle,
            pending: vec![],
        },
    );
    let mut machine = Interpreter::new(program, device);
    match machine.run() {
        Ok(()) => Ok(Exit::Halted),
        Err(vm::Error::Shutdown) => Ok(Exit::Shutdown),
        Err(vm::Error::Disconnected) => Ok(Exit::Disconnected),
        Err(error) => Err(Error::NodeFault {
            address,
            ip: machine.ip(),
            error,
        }),
    }
}

/// A running node.
pub struct Node {
    address: usize,
    thread: JoinHandle<Result<Exit, Error>>,
}

impl Node {
    /// Start a machine running `program` at `address`, on a thread named
    /// `node-<address>`.
    ///
    /// A fault, panic or early halt is logged from the node's own thread as
    /// soon as it happens.
    pub fn spawn(address: usize, program: &Program, handle: Handle, config: &Config) -> Result<Self, Error> {
        let program = program.clone();
        let empty_input = config.empty_input;
        let thread = thread::Builder::new()
            .name(format!("node-{address}"))
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_node(address, &program, handle, empty_input)
                }))
                .unwrap_or_else(|_| Err(Error::Panicked(format!("node-{address}"))));

                match &result {
                    Ok(Exit::Halted) => {
                        warn!("node {address} halted, and will no longer talk to the switch")
                    }
                    Ok(exit) => debug!("node {address} exited: {exit:?}"),
                    Err(e) => error!("{e}"),
                }
                result
            })
            .map_err(|e| Error::Spawn(e.to_string()))?;
        Ok(Self { address, thread })
    }

    pub fn address(&self) -> usize {
        self.address
    }

    /// Wait for the node to stop.
    pub fn join(self) -> Result<Exit, Error> {
        self.thread
            .join()
            .map_err(|_| Error::Panicked(format!("node-{}", self.address)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Switch;
    use std::thread;

    #[test]
    fn test_boot_and_packet_inputs() {
        // Reads its address, then one packet, and sends
        // (address + x + y) to the monitor.
        let program = Program::new(vec![
            3, 100, 3, 101, 3, 102, 1, 100, 101, 103, 1, 103, 102, 103, 104, 255, 4, 103, 104, 0,
            99,
        ]);
        let config = Config::default().with_nodes(2);
        let (mut switch, handle) = Switch::new(config.clone()).unwrap();
        switch.send(0, 1, Packet::new(10, 20)).unwrap();

        let node = Node::spawn(1, &program, handle, &config).unwrap();
        let server = thread::spawn(move || {
            while let Some(request) = switch.next_request() {
                switch.handle(request).unwrap();
            }
            switch.report()
        });
        assert_eq!(node.join(), Ok(Exit::Halted));
        let report = server.join().unwrap();
        assert_eq!(report.first_monitor, Some(Packet::new(31, 0)));
    }

    #[test]
    fn test_outbox_flushes_triples() {
        let config = Config::default().with_nodes(2);
        let (mut switch, handle) = Switch::new(config).unwrap();
        let mut outbox = Outbox {
            address: 0,
            handle,
            pending: vec![],
        };
        for val in [1, 7, 8, 1] {
            outbox.put(val).unwrap();
        }
        assert_eq!(outbox.pending, vec![1]);
        drop(outbox);

        let request = switch.next_request().unwrap();
        switch.handle(request).unwrap();
        assert_eq!(switch.receive(1), Ok(Reply::Packet(Packet::new(7, 8))));
    }
}
