//! # Switch Module
//!
//! The switch is the only owner of network state. Nodes never touch it
//! directly: they post [`Request`]s on one shared queue through a
//! [`Handle`], and the switch works through them one at a time.
use super::{Config, Error, Packet, Report};
use crate::vm;
use ::std::{
    collections::VecDeque,
    sync::mpsc::{channel, sync_channel, Receiver, Sender, SyncSender},
};
use log::{debug, info, warn};

/// A message from a node to the switch.
#[derive(Debug)]
pub enum Request {
    /// Route a packet.
    Send { from: usize, to: i64, packet: Packet },
    /// Ask for the next packet addressed to `to`. The answer goes back
    /// through `reply`.
    Receive { to: usize, reply: SyncSender<Reply> },
}

/// The switch's answer to a receive request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    Packet(Packet),
    Empty,
    Shutdown,
}

/// A node's connection to the switch.
#[derive(Clone, Debug)]
pub struct Handle {
    requests: Sender<Request>,
}

impl Handle {
    pub fn send(&self, from: usize, to: i64, packet: Packet) -> Result<(), vm::Error> {
        self.requests
            .send(Request::Send { from, to, packet })
            .map_err(|_| vm::Error::Disconnected)
    }

    /// Ask for the next packet for `to`, and wait for the answer.
    pub fn receive(&self, to: usize) -> Result<Reply, vm::Error> {
        let (reply, answer) = sync_channel(1);
        self.requests
            .send(Request::Receive { to, reply })
            .map_err(|_| vm::Error::Disconnected)?;
        answer.recv().map_err(|_| vm::Error::Disconnected)
    }
}

/// The packet router, with idle and shutdown detection.
pub struct Switch {
    config: Config,
    requests: Receiver<Request>,
    /// Undelivered packets, per address.
    queues: Vec<VecDeque<Packet>>,
    /// Empty receives in a row, per address.
    idle: Vec<usize>,
    /// The latest packet sent to the monitor.
    monitor: Option<Packet>,
    first_monitor: Option<Packet>,
    deliveries: Vec<Packet>,
    shutting_down: bool,
    /// Which addresses were told to shut down.
    acked: Vec<bool>,
}

impl Switch {
    /// Create a switch, and the handle nodes use to reach it.
    pub fn new(config: Config) -> Result<(Self, Handle), Error> {
        config.validate()?;
        let (requests_tx, requests) = channel();
        let n = config.nodes;
        let switch = Self {
            config,
            requests,
            queues: vec![VecDeque::new(); n],
            idle: vec![0; n],
            monitor: None,
            first_monitor: None,
            deliveries: vec![],
            shutting_down: false,
            acked: vec![false; n],
        };
        Ok((switch, Handle { requests: requests_tx }))
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    /// Has every node been told to shut down?
    pub fn is_finished(&self) -> bool {
        self.shutting_down && self.acked.iter().all(|&acked| acked)
    }

    pub fn report(&self) -> Report {
        Report {
            first_monitor: self.first_monitor,
            deliveries: self.deliveries.clone(),
            faults: vec![],
        }
    }

    /// Route a packet from `from` to `to`.
    pub fn send(&mut self, from: usize, to: i64, packet: Packet) -> Result<(), Error> {
        if self.shutting_down {
            debug!("dropped {packet} from {from} to {to} during shutdown");
            return Ok(());
        }

        if to == self.config.monitor {
            if self.first_monitor.is_none() {
                info!("first monitor packet {packet} from node {from}");
                self.first_monitor = Some(packet);
            }
            debug!("monitor got {packet} from {from}");
            self.monitor = Some(packet);
        } else {
            let queue = usize::try_from(to)
                .ok()
                .and_then(|to| self.queues.get_mut(to))
                .ok_or(Error::UnknownAddress { from, to })?;
            debug!("routing {packet} from {from} to {to}");
            queue.push_back(packet);
            if let Some(count) = self.idle.get_mut(from) {
                *count = 0;
            }
        }
        self.check_idle()
    }

    /// Answer a receive request from `to`.
    pub fn receive(&mut self, to: usize) -> Result<Reply, Error> {
        if to >= self.config.nodes {
            return Err(Error::UnknownAddress { from: to, to: to as i64 });
        }

        if self.shutting_down {
            self.acked[to] = true;
            return Ok(Reply::Shutdown);
        }

        if let Some(packet) = self.queues[to].pop_front() {
            self.idle[to] = 0;
            return Ok(Reply::Packet(packet));
        }

        self.idle[to] += 1;
        self.check_idle()?;
        Ok(Reply::Empty)
    }

    /// Process one request. Returns `true` once the network has shut down.
    pub fn handle(&mut self, request: Request) -> Result<bool, Error> {
        match request {
            Request::Send { from, to, packet } => self.send(from, to, packet)?,
            Request::Receive { to, reply } => {
                let answer = self.receive(to)?;
                if reply.send(answer).is_err() {
                    warn!("node {to} hung up before its reply");
                }
            }
        }
        Ok(self.is_finished())
    }

    /// Wait for the next request. Returns `None` once every handle is gone.
    pub fn next_request(&self) -> Option<Request> {
        self.requests.recv().ok()
    }

    /// Serve requests until the network shuts down.
    pub fn run(mut self) -> Result<Report, Error> {
        while let Some(request) = self.next_request() {
            if self.handle(request)? {
                info!("shutdown complete after {} deliveries", self.deliveries.len());
                return Ok(self.report());
            }
        }
        warn!("every node hung up");
        Err(Error::Disconnected)
    }

    /// Wake node 0 with the monitor packet if the network is idle.
    fn check_idle(&mut self) -> Result<(), Error> {
        if self.shutting_down
            || self.queues.iter().any(|queue| !queue.is_empty())
            || self.idle.iter().any(|&count| count < self.config.idle_threshold)
        {
            return Ok(());
        }

        let packet = self.monitor.ok_or(Error::IdleWithoutMonitor)?;
        info!("network idle, delivering {packet} to node 0");
        if self.last_delivered_y() == Some(packet.y) {
            info!("delivered y={} twice in a row, shutting down", packet.y);
            self.shutting_down = true;
        }
        self.queues[0].push_back(packet);
        self.idle.iter_mut().for_each(|count| *count = 0);
        self.deliveries.push(packet);
        Ok(())
    }

    fn last_delivered_y(&self) -> Option<i64> {
        self.deliveries.last().map(|packet| packet.y)
    }
}
