use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Polls `future` exactly once.
pub fn poll_once<F: Future + ?Sized>(future: Pin<&mut F>) -> Option<F::Output> {
    let mut cx = Context::from_waker(Waker::noop());
    match future.poll(&mut cx) {
        Poll::Ready(output) => Some(output),
        Poll::Pending => None,
    }
}
