//! Frame request pacer.
//!
//! A self-terminating pull loop: while its connection is Streaming it sends a
//! capture command, sleeps one interval, and checks again. It never waits for
//! the device's answer and gets no backpressure from it, so the send rate is
//! bounded only by the cadence.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, trace};

use crate::protocol::ClientCommand;

use super::lifecycle::Outbound;
use super::ConnectionState;

/// What the pacer watches: the session state and which connection it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Phase {
    pub state: ConnectionState,
    pub conn: u64,
}

impl Phase {
    fn allows(&self, conn: u64) -> bool {
        self.state == ConnectionState::Streaming && self.conn == conn
    }
}

pub fn spawn(
    conn: u64,
    interval: Duration,
    phase: watch::Receiver<Phase>,
    outbound: mpsc::UnboundedSender<Outbound>,
) -> JoinHandle<u64> {
    tokio::spawn(run(conn, interval, phase, outbound))
}

/// Returns how many capture commands were sent
pub async fn run(
    conn: u64,
    interval: Duration,
    phase: watch::Receiver<Phase>,
    outbound: mpsc::UnboundedSender<Outbound>,
) -> u64 {
    let command = ClientCommand::Capture.to_json();
    let mut sent = 0u64;

    loop {
        if !phase.borrow().allows(conn) {
            break;
        }
        if outbound.send(Outbound::Text(command.clone())).is_err() {
            // Socket task is gone
            break;
        }
        sent += 1;
        trace!(conn, sent, "capture requested");
        sleep(interval).await;
    }

    debug!(conn, sent, "pacer stopped");
    sent
}
