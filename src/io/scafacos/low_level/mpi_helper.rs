/* ************************************************************************ **
** This file is part of fcs2, and is licensed under EITHER the MIT license  **
** or the Apache 2.0 license, at your option.                               **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
**                                                                          **
** Be aware that not all of fcs2 is provided under this permissive license, **
** and that the project as a whole is licensed under the GPL 3.0.           **
** ************************************************************************ */

//! Allows one to write code which only uses MPI on demand, so that the bulk
//! of the codebase executes only on the root process.
//!
//! The external solver library is MPI-collective in every operation, but
//! nothing else in this project is. Rather than let the "multi-process,
//! single-code" model infect everything, the non-root processes sit in an
//! event loop serving solver operations, and the root decides what runs.
//!
//! The price is that the set of operations must be enumerable up front (see
//! the dispatch type in the `mpi` module), and that a single scoped install
//! near the beginning of `main` is the only composition this supports.

use mpi;
use std::sync::Arc;

/// The multi-process entry point for [`MpiOnDemand`].
///
/// An instance of one of these objects exists on all processes.
pub trait DispatchMultiProcess {
    type Input: Broadcast;
    type Output;

    // `&self` rather than `&mut self` because MpiOnDemand impls Clone;
    // implementors with state need interior mutability.
    fn dispatch(&self, root: &impl mpi::Root, input: Self::Input) -> Self::Output;
}

/// Allows code running on the root process to invoke an MPI-collective
/// operation on all processes on demand.
///
/// It is impossible to obtain one of these on a non-root process, and it
/// must not be leaked outside the closure given to `install_with`.
///
/// Clones share the same `Dispatch`.
#[derive(Debug)]
pub struct MpiOnDemand<D>(Arc<D>);

impl<D> Clone for MpiOnDemand<D> {
    fn clone(&self) -> Self { MpiOnDemand(self.0.clone()) }
}

impl<D: DispatchMultiProcess> MpiOnDemand<D> {
    /// Run the provided closure on the root process, with all multi-process
    /// code factored out into the provided `Dispatch`.
    ///
    /// # MPI
    ///
    /// This method is called on all processes. The closure is called on the
    /// root process, while the others enter an event loop (blocking, waiting
    /// for `invoke` to be called). When the closure exits, execution resumes
    /// on all processes; `Some` is returned only on the root.
    ///
    /// # Panics
    ///
    /// Panics after the closure returns if it is detected that the
    /// `MpiOnDemand` has been leaked.
    pub fn install_with<R>(
        dispatch: D,
        func: impl FnOnce(MpiOnDemand<D>) -> R,
    ) -> Option<R> {
        with_root_process(|root| {
            if this_process_is_root(&root) {
                let on_demand = MpiOnDemand(Arc::new(dispatch));
                let out = func(on_demand.clone());

                Arc::try_unwrap(on_demand.0).ok()
                    .expect("Detected leak of `MpiOnDemand` value!");

                // make the other processes exit the event loop
                assert!(!Broadcast::broadcast(&root, Some(false)), "BUG!");
                Some(out)
            } else {
                loop {
                    let keep_going = Broadcast::broadcast(&root, None::<bool>);
                    if !keep_going {
                        break;
                    }
                    let input = Broadcast::broadcast(&root, None);
                    // outputs only matter on the root
                    let _ = dispatch.dispatch(&root, input);
                }
                None
            }
        })
    }

    /// Call the multi-process entry point.
    ///
    /// # MPI
    ///
    /// Because `MpiOnDemand` is only obtainable on the root process, it goes
    /// without saying that this is called on the root. The dispatch runs on
    /// all processes simultaneously; the return value is the root's.
    pub fn invoke(&self, input: D::Input) -> D::Output {
        with_root_process(|root| {
            assert!(this_process_is_root(&root), "BUG!");
            assert!(Broadcast::broadcast(&root, Some(true)), "BUG!");

            let input = Broadcast::broadcast(&root, Some(input));
            self.0.dispatch(&root, input)
        })
    }
}

// Provides the default `mpi::Root` (rank 0 of the world communicator).
//
// Returned continuation-style because a `Process` borrows its communicator
// and thus cannot be `'static`.
fn with_root_process<R>(
    continuation: impl FnOnce(mpi::Process<'_, mpi::SystemCommunicator>) -> R,
) -> R {
    use mpi::Communicator;

    let world = mpi::SystemCommunicator::world();
    let root = world.process_at_rank(0);
    continuation(root)
}

pub fn this_process_is_root(root: &impl mpi::Root) -> bool
{ mpi::Communicator::rank(root.as_communicator()) == root.root_rank() }

/// Helper trait to broadcast data from the root process to all processes,
/// including vectors of unknown length, and types with no default.
pub trait Broadcast: Sized {
    /// Broadcast a value from the root to all processes.
    ///
    /// `value` is ignored on non-root processes, and must be `Some` on the
    /// root process.
    fn broadcast(root: &impl mpi::Root, value: Option<Self>) -> Self;
}

// impl for a type that implements `mpi::BufferMut + Default`
macro_rules! impl_broadcast_for_buffer_mut {
    ($($T:ident)*) => {$(
        impl Broadcast for $T {
            fn broadcast(root: &impl mpi::Root, value: Option<$T>) -> $T
            { broadcast_via_mut_ref(root, value, |root, buf| root.broadcast_into(buf)) }
        }
    )*};
}
impl_broadcast_for_buffer_mut! {
    i8 i16 i32 i64 isize
    u8 u16 u32 u64 usize
    f32 f64 bool
}

// This differs from the `mpi` crate's own `Root::broadcast_into::<[T]>` in
// that it can resize the vectors to match.
macro_rules! impl_broadcast_for_vec_equivalence {
    ($(Vec<$T:ident>)*) => {$(
        impl Broadcast for Vec<$T> {
            fn broadcast(root: &impl mpi::Root, buf: Option<Vec<$T>>) -> Vec<$T>
            { broadcast_vec(root, buf) }
        }
    )*};
}
impl_broadcast_for_vec_equivalence! {
    Vec<i64> Vec<f64>
}

impl Broadcast for String {
    fn broadcast(root: &impl mpi::Root, buf: Option<String>) -> String {
        let bytes = broadcast_vec(root, buf.map(|s| s.into_bytes()));
        String::from_utf8(bytes).expect("BUG: broadcast corrupted utf8")
    }
}

impl<T: Broadcast> Broadcast for Option<T> {
    fn broadcast(root: &impl mpi::Root, value: Option<Option<T>>) -> Option<T> {
        let is_some = Broadcast::broadcast(root, value.as_ref().map(Option::is_some));
        match is_some {
            true => Some(Broadcast::broadcast(root, value.and_then(|x| x))),
            false => None,
        }
    }
}

impl Broadcast for [f64; 3] {
    fn broadcast(root: &impl mpi::Root, value: Option<[f64; 3]>) -> [f64; 3] {
        broadcast_via_mut_ref(root, value, |root, buf| {
            root.broadcast_into(&mut buf[..]);
        })
    }
}

impl Broadcast for [bool; 3] {
    fn broadcast(root: &impl mpi::Root, value: Option<[bool; 3]>) -> [bool; 3] {
        let [a, b, c] = match value {
            Some([a, b, c]) => [Some(a), Some(b), Some(c)],
            None => [None; 3],
        };
        [
            Broadcast::broadcast(root, a),
            Broadcast::broadcast(root, b),
            Broadcast::broadcast(root, c),
        ]
    }
}

// Adapts functions with a signature like `Root::broadcast_into` into a
// Broadcast impl, given the existence of a `Default` impl.
fn broadcast_via_mut_ref<T, R>(
    root: &R,
    value: Option<T>,
    broadcast_into: impl FnOnce(&R, &mut T),
) -> T
where
    R: mpi::AsCommunicator + mpi::Root,
    T: Default,
{
    if this_process_is_root(root) && value.is_none() {
        panic!("root did not provide value to broadcast");
    }
    let mut buf = value.unwrap_or_else(Default::default);
    broadcast_into(root, &mut buf);
    buf
}

fn broadcast_vec<T: mpi::Equivalence + Copy + Default>(
    root: &impl mpi::Root,
    buf: Option<Vec<T>>,
) -> Vec<T> {
    broadcast_via_mut_ref(root, buf, |root, buf| {
        let mut size = buf.len();
        root.broadcast_into(&mut size);

        if !this_process_is_root(root) {
            buf.resize(size, T::default());
        }
        root.broadcast_into(&mut buf[..]);
    })
}
