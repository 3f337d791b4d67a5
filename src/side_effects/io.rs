//! # I/O Module
//!
//! The two capabilities a machine needs from the world: an [`Input`]
//! that produces values, and an [`Output`] that accepts them. Each comes
//! in exactly three flavors.
//!
//! | Flavor          | Input                    | Output                 |
//! |-----------------|--------------------------|------------------------|
//! | Finite sequence | `VecDeque<i64>`          | `Vec<i64>`             |
//! | Blocking queue  | `mpsc::Receiver<i64>`    | `mpsc::Sender<i64>`    |
//! | Callback        | `Callback<FnMut() -> _>` | `Callback<FnMut(i64)>` |
//!
//! A finite input that runs dry is an error ([`Error::InputExhausted`]).
//! A queue input blocks the calling thread until a value is pushed,
//! and only fails once every sender is gone. A callback decides for
//! itself, and may block too.
use crate::vm::Error;
use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, Sender};

/// A source of values for the `in` instruction.
pub trait Input {
    fn get(&mut self) -> Result<i64, Error>;
}

/// A sink for the values of the `out` instruction.
pub trait Output {
    fn put(&mut self, val: i64) -> Result<(), Error>;
}

impl Input for VecDeque<i64> {
    fn get(&mut self) -> Result<i64, Error> {
        self.pop_front().ok_or(Error::InputExhausted)
    }
}

impl Output for Vec<i64> {
    fn put(&mut self, val: i64) -> Result<(), Error> {
        self.push(val);
        Ok(())
    }
}

impl Input for Receiver<i64> {
    fn get(&mut self) -> Result<i64, Error> {
        self.recv().map_err(|_| Error::Disconnected)
    }
}

impl Output for Sender<i64> {
    fn put(&mut self, val: i64) -> Result<(), Error> {
        self.send(val).map_err(|_| Error::Disconnected)
    }
}

/// Wraps a closure so it can serve as an input or an output.
///
/// As an input the closure takes nothing and returns the next value; as
/// an output it takes the emitted value.
pub struct Callback<F>(pub F);

impl<F> Input for Callback<F>
where
    F: FnMut() -> Result<i64, Error>,
{
    fn get(&mut self) -> Result<i64, Error> {
        (self.0)()
    }
}

impl<F> Output for Callback<F>
where
    F: FnMut(i64) -> Result<(), Error>,
{
    fn put(&mut self, val: i64) -> Result<(), Error> {
        (self.0)(val)
    }
}

impl<T: Input + ?Sized> Input for &mut T {
    fn get(&mut self) -> Result<i64, Error> {
        (**self).get()
    }
}

impl<T: Output + ?Sized> Output for &mut T {
    fn put(&mut self, val: i64) -> Result<(), Error> {
        (**self).put(val)
    }
}

impl<T: Input + ?Sized> Input for Box<T> {
    fn get(&mut self) -> Result<i64, Error> {
        (**self).get()
    }
}

impl<T: Output + ?Sized> Output for Box<T> {
    fn put(&mut self, val: i64) -> Result<(), Error> {
        (**self).put(val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn test_finite_runs_dry() {
        let mut input: VecDeque<i64> = vec![4, 5].into();
        assert_eq!(Input::get(&mut input), Ok(4));
        assert_eq!(Input::get(&mut input), Ok(5));
        assert_eq!(Input::get(&mut input), Err(Error::InputExhausted));
    }

    #[test]
    fn test_queue_disconnects() {
        let (mut tx, mut rx) = channel::<i64>();
        tx.put(3).unwrap();
        drop(tx);
        assert_eq!(rx.get(), Ok(3));
        assert_eq!(rx.get(), Err(Error::Disconnected));
    }

    #[test]
    fn test_callback() {
        let mut n: i64 = 0;
        let mut counter = Callback(|| {
            n += 1;
            Ok::<i64, Error>(n)
        });
        assert_eq!(counter.get(), Ok(1));
        assert_eq!(counter.get(), Ok(2));

        let mut seen: Vec<i64> = vec![];
        let mut sink = Callback(|val: i64| {
            seen.push(val * 2);
            Ok::<(), Error>(())
        });
        sink.put(21).unwrap();
        drop(sink);
        assert_eq!(seen, vec![42]);
    }
}
