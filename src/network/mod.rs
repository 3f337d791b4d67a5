//! # The Network Module
//!
//! Many machines running the same program, each on its own thread, each
//! with its own address, trading packets through a single [`Switch`].
//!
//! A node's first input is its address. After that, every input asks the
//! switch for the next packet addressed to the node: a packet arrives as
//! two inputs (`x` then `y`), and an empty inbox reads as `-1`. Every
//! three outputs form one outgoing packet: destination, `x`, `y`.
//!
//! Packets sent to the monitor address (255 unless configured otherwise)
//! are kept by the switch rather than delivered. When every node has an
//! empty inbox and has been polling without luck for a while, the network
//! is idle, and the switch wakes node 0 by handing it the last monitor
//! packet. Once two wake-ups in a row carry the same `y`, the switch shuts
//! the network down: every node's next receive fails, and the machines
//! stop.
//!
//! A node that faults, panics or halts is reported at once from its own
//! thread, and the rest of the network carries on without it. The switch
//! does not notice: if the network needed that node to go idle or to
//! acknowledge shutdown, the run never finishes. There are no timeouts.
//!
//! The [`pipeline`] submodule has the simpler topology: a ring of
//! machines, each feeding the next.
use crate::vm::{self, Program};
use ::std::{fmt, thread};
use log::{debug, info};
use serde_derive::{Deserialize, Serialize};

mod node;
pub use node::*;
mod switch;
pub use switch::*;
pub mod pipeline;
pub use pipeline::Ring;

/// A message between nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Packet {
    pub x: i64,
    pub y: i64,
}

impl Packet {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// The knobs of a network (and of a ring).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How many nodes to boot. Their addresses are `0..nodes`.
    pub nodes: usize,
    /// The address whose packets are kept by the switch.
    pub monitor: i64,
    /// How many empty receives in a row make a node count as idle.
    pub idle_threshold: usize,
    /// What a node reads when its inbox is empty.
    pub empty_input: i64,
    /// The value fed to the first machine of a ring, after its seed.
    pub initial_signal: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            nodes: 50,
            monitor: 255,
            idle_threshold: 5,
            empty_input: -1,
            initial_signal: 0,
        }
    }
}

impl Config {
    pub fn with_nodes(mut self, nodes: usize) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_monitor(mut self, monitor: i64) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_idle_threshold(mut self, idle_threshold: usize) -> Self {
        self.idle_threshold = idle_threshold;
        self
    }

    pub fn with_empty_input(mut self, empty_input: i64) -> Self {
        self.empty_input = empty_input;
        self
    }

    pub fn with_initial_signal(mut self, initial_signal: i64) -> Self {
        self.initial_signal = initial_signal;
        self
    }

    /// Check that a network could actually run with this configuration.
    pub fn validate(&self) -> Result<(), Error> {
        if self.nodes == 0 {
            return Err(Error::InvalidConfig("a network needs at least one node".to_string()));
        }
        if self.idle_threshold == 0 {
            return Err(Error::InvalidConfig("the idle threshold must be at least 1".to_string()));
        }
        if (0..self.nodes as i64).contains(&self.monitor) {
            return Err(Error::InvalidConfig(format!(
                "monitor address {} is also the address of a node",
                self.monitor
            )));
        }
        Ok(())
    }
}

/// What a finished network run observed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    /// The first packet ever sent to the monitor.
    pub first_monitor: Option<Packet>,
    /// Every packet handed to node 0 on idle, in order.
    pub deliveries: Vec<Packet>,
    /// Nodes that stopped with an error instead of shutting down.
    pub faults: Vec<Error>,
}

impl Report {
    /// The delivery that ended the run.
    pub fn last_delivery(&self) -> Option<Packet> {
        self.deliveries.last().copied()
    }
}

/// An error in a network or a ring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A machine error outside of any particular node.
    Machine(vm::Error),
    /// A node's machine failed.
    NodeFault {
        address: usize,
        ip: usize,
        error: vm::Error,
    },
    /// A packet was addressed to nobody.
    UnknownAddress { from: usize, to: i64 },
    /// The network went idle before anything was sent to the monitor.
    IdleWithoutMonitor,
    InvalidConfig(String),
    /// Every node hung up before the network shut down.
    Disconnected,
    /// A thread could not be started.
    Spawn(String),
    /// The named thread panicked.
    Panicked(String),
    /// A ring finished without leaving a value for its first machine.
    NoSignal,
}

impl From<vm::Error> for Error {
    fn from(e: vm::Error) -> Self {
        Self::Machine(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Machine(e) => write!(f, "{e}"),
            Self::NodeFault { address, ip, error } => {
                write!(f, "node {address} faulted at ip {ip}: {error}")
            }
            Self::UnknownAddress { from, to } => {
                write!(f, "node {from} sent a packet to unknown address {to}")
            }
            Self::IdleWithoutMonitor => {
                write!(f, "the network is idle, but nothing was sent to the monitor")
            }
            Self::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Disconnected => write!(f, "every node hung up before shutdown"),
            Self::Spawn(msg) => write!(f, "could not start a thread: {msg}"),
            Self::Panicked(name) => write!(f, "thread {name} panicked"),
            Self::NoSignal => write!(f, "the ring produced no signal"),
        }
    }
}

impl ::std::error::Error for Error {}

/// Boots a switch and a set of nodes, and waits for them to finish.
#[derive(Clone, Debug, Default)]
pub struct Network {
    config: Config,
}

impl Network {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run `program` on every node until the switch shuts the network
    /// down. Node faults are collected in the report; switch errors are
    /// returned once every node has stopped.
    pub fn run(&self, program: &Program) -> Result<Report, Error> {
        let (switch, handle) = Switch::new(self.config.clone())?;
        let switch = thread::Builder::new()
            .name("switch".to_string())
            .spawn(move || switch.run())
            .map_err(|e| Error::Spawn(e.to_string()))?;

        let nodes = (0..self.config.nodes)
            .map(|address| Node::spawn(address, program, handle.clone(), &self.config))
            .collect::<Result<Vec<_>, _>>()?;
        // Only the nodes may keep the switch alive.
        drop(handle);
        info!("booted {} nodes", nodes.len());

        let outcome = switch
            .join()
            .map_err(|_| Error::Panicked("switch".to_string()))?;

        let mut faults = vec![];
        for node in nodes {
            let address = node.address();
            match node.join() {
                Ok(exit) => debug!("node {address} stopped: {exit:?}"),
                Err(e) => faults.push(e),
            }
        }

        let mut report = outcome?;
        report.faults = faults;
        Ok(report)
    }
}
