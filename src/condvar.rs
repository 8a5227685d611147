/*
 * An async condition variable for embassy's cooperative tasks.
 *
 * embassy-sync ships a mutex and counting semaphores, but no condition
 * variable. This one pairs with an `embassy_sync::mutex::Mutex`: `wait` gives
 * up the guard, sleeps until signalled, and locks the mutex again before it
 * returns.
 *
 * Waiters draw tickets in arrival order and form a queue. `signal` releases
 * the oldest ticket still waiting, `broadcast` releases every ticket drawn so
 * far. Released waiters leave the queue in ticket order, the same hand-off a
 * `FairSemaphore` does. A ticket is drawn before the guard is dropped, so a
 * signal issued by whoever takes the mutex next can never be missed. A waiter
 * only returns once its ticket has been released, and a signal with nobody
 * waiting does nothing.
 *
 * At most `N` tickets may be queued at once.
 */

use core::cell::RefCell;
use core::cmp::max;
use core::future::poll_fn;
use core::task::{Context, Poll};

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_sync::waitqueue::MultiWakerRegistration;

struct Tickets<const N: usize> {
    next: u64,
    // Every ticket below `released` has been signalled.
    released: u64,
    // Oldest ticket still queued.
    head: u64,
    // `gone[t % N]`: ticket `t` (head <= t < next) was dropped while queued.
    gone: [bool; N],
    wakers: MultiWakerRegistration<N>,
}

impl<const N: usize> Tickets<N> {
    fn slot(ticket: u64) -> usize {
        (ticket % N as u64) as usize
    }

    fn draw(&mut self) -> u64 {
        assert!(
            self.next - self.head < N as u64,
            "more than {} tasks queued on a condition variable",
            N
        );
        let ticket = self.next;
        self.next += 1;
        ticket
    }

    fn is_gone(&self, ticket: u64) -> bool {
        ticket < self.head || self.gone[Self::slot(ticket)]
    }

    /// Tickets still queued that no signal has reached yet.
    fn waiting(&self) -> usize {
        (max(self.released, self.head)..self.next)
            .filter(|&ticket| !self.is_gone(ticket))
            .count()
    }

    fn leave(&mut self, ticket: u64) {
        if ticket < self.head {
            return;
        }
        self.gone[Self::slot(ticket)] = true;
        while self.head < self.next && self.gone[Self::slot(self.head)] {
            self.gone[Self::slot(self.head)] = false;
            self.head += 1;
        }
        if self.head < self.released {
            self.wakers.wake();
        }
    }

    fn poll_turn(&mut self, ticket: u64, cx: &mut Context<'_>) -> Poll<()> {
        if ticket == self.head && ticket < self.released {
            self.leave(ticket);
            Poll::Ready(())
        } else {
            self.wakers.register(cx.waker());
            Poll::Pending
        }
    }
}

/*
 * A ticket in the queue. Dropping it before its turn came takes it out of
 * the queue, so the waiters behind it are not held up.
 */
struct Place<'c, M: RawMutex, const N: usize> {
    condvar: &'c CondVar<M, N>,
    ticket: u64,
    served: bool,
}

impl<M: RawMutex, const N: usize> Place<'_, M, N> {
    fn poll_turn(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        let ticket = self.ticket;
        let turn = self
            .condvar
            .tickets
            .lock(|tickets| tickets.borrow_mut().poll_turn(ticket, cx));
        self.served = turn.is_ready();
        turn
    }
}

impl<M: RawMutex, const N: usize> Drop for Place<'_, M, N> {
    fn drop(&mut self) {
        if !self.served {
            let ticket = self.ticket;
            self.condvar
                .tickets
                .lock(|tickets| tickets.borrow_mut().leave(ticket));
        }
    }
}

pub struct CondVar<M: RawMutex, const N: usize> {
    tickets: BlockingMutex<M, RefCell<Tickets<N>>>,
}

impl<M: RawMutex, const N: usize> CondVar<M, N> {
    pub const fn new() -> Self {
        CondVar {
            tickets: BlockingMutex::new(RefCell::new(Tickets {
                next: 0,
                released: 0,
                head: 0,
                gone: [false; N],
                wakers: MultiWakerRegistration::new(),
            })),
        }
    }

    /// Releases `guard`, sleeps until this waiter is signalled and returns
    /// with `mutex` locked again. `guard` must belong to `mutex`.
    pub async fn wait<'a, T>(
        &self,
        mutex: &'a Mutex<M, T>,
        guard: MutexGuard<'a, M, T>,
    ) -> MutexGuard<'a, M, T> {
        let ticket = self.tickets.lock(|tickets| tickets.borrow_mut().draw());
        drop(guard);

        let mut place = Place {
            condvar: self,
            ticket,
            served: false,
        };
        poll_fn(|cx| place.poll_turn(cx)).await;

        mutex.lock().await
    }

    pub fn signal(&self) {
        self.tickets.lock(|tickets| {
            let mut tickets = tickets.borrow_mut();
            let mut oldest = max(tickets.released, tickets.head);
            while oldest < tickets.next && tickets.is_gone(oldest) {
                oldest += 1;
            }
            if oldest < tickets.next {
                tickets.released = oldest + 1;
                // Wakers are not tied to tickets; everyone re-checks its own.
                tickets.wakers.wake();
            }
        })
    }

    pub fn broadcast(&self) {
        self.tickets.lock(|tickets| {
            let mut tickets = tickets.borrow_mut();
            if tickets.waiting() > 0 {
                tickets.released = tickets.next;
                tickets.wakers.wake();
            }
        })
    }

    /// Number of tasks that are waiting and have not been released yet.
    pub fn waiters(&self) -> usize {
        self.tickets.lock(|tickets| tickets.borrow().waiting())
    }
}

impl<M: RawMutex, const N: usize> Default for CondVar<M, N> {
    fn default() -> Self {
        Self::new()
    }
}
