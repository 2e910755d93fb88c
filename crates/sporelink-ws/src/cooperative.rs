//! Suspending receive for cooperative, single-threaded schedulers.

use tracing::trace;

use crate::connection::WebSocket;
use crate::error::WsResult;
use crate::message::Received;
use crate::transport::Transport;

impl<T: Transport> WebSocket<T> {
    /// Receive the next data message, suspending while none is available.
    ///
    /// Behaves like [`recv`](Self::recv) except that instead of returning
    /// [`Received::NoData`] it sleeps for the configured poll interval and
    /// tries again. This is the only suspension point; the socket itself is
    /// never awaited.
    pub async fn arecv(&mut self) -> WsResult<Received> {
        let interval = self.config().poll_interval_duration();
        loop {
            match self.recv()? {
                Received::NoData => {
                    trace!(connection_id = %self.id(), ?interval, "suspending until next poll");
                    tokio::time::sleep(interval).await;
                }
                received => return Ok(received),
            }
        }
    }
}
