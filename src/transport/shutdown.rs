use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Pair for stopping an `RpcServer`. The server stops when the handle is shut down or dropped.
pub fn shutdown_signal() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = oneshot::channel();

    (ShutdownHandle { tx }, ShutdownSignal { rx })
}

pub struct ShutdownHandle {
    tx: oneshot::Sender<()>,
}

impl ShutdownHandle {
    pub fn shutdown(self) {
        let _ = self.tx.send(());
    }
}

pub struct ShutdownSignal {
    rx: oneshot::Receiver<()>,
}

impl Future for ShutdownSignal {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let rx = Pin::new(&mut self.rx);

        match rx.poll(cx) {
            Poll::Pending => Poll::Pending,
            // Sent or dropped, either way we stop.
            Poll::Ready(_) => Poll::Ready(()),
        }
    }
}
