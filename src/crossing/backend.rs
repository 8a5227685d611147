/*
 * The seam between the admission protocol and the synchronisation primitives
 * underneath it.
 *
 * A backend guards the `Lane` record and offers condition-variable style
 * waiting on three conditions. Holding a `Guard` is holding exclusive access;
 * `signal` and `broadcast` take the guard to prove it.
 */

use core::future::Future;
use core::ops::DerefMut;

use enum_ordinalize::Ordinalize;

use super::Lane;

#[derive(Ordinalize, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Condition {
    // A vehicle of the current direction may fit on the crossing.
    NotFull,
    // The crossing has no vehicles on it.
    Empty,
    // The crossing was claimed for a direction, or became free to claim.
    DirectionChanged,
}

pub trait Backend {
    const NAME: &'static str;

    type Guard<'a>: DerefMut<Target = Lane>
    where
        Self: 'a;

    fn lock(&self) -> impl Future<Output = Self::Guard<'_>>;

    /// Gives up exclusive access, sleeps until `condition` is signalled, and
    /// returns with exclusive access regained. The caller re-checks whatever
    /// it was waiting for.
    fn wait<'a>(
        &'a self,
        condition: Condition,
        guard: Self::Guard<'a>,
    ) -> impl Future<Output = Self::Guard<'a>>;

    /// Wakes one task waiting on `condition`, if there is one.
    fn signal<'a>(&'a self, condition: Condition, guard: &mut Self::Guard<'a>);

    /// Wakes every task waiting on `condition`.
    fn broadcast<'a>(&'a self, condition: Condition, guard: &mut Self::Guard<'a>);
}
