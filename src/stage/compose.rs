// src/stage/compose.rs

//! Sub-workflow composition.

use crate::errors::Result;

use super::{Progression, State, Update};

/// Step `child` once and express the outcome in the parent's state space.
///
/// An intermediate child state becomes a parent state through `map_next`
/// (usually wrapping the child in a parent variant). The child's final output
/// goes through `map_result`, which picks the parent's next phase or finishes
/// the parent outright, and may fail.
///
/// ```ignore
/// Download::Fetching(http) => compose(
///     http,
///     Download::Fetching,
///     |body| Ok(State::Running(Download::Parsing(body))),
/// ),
/// ```
pub fn compose<C, P, N, R>(child: C, map_next: N, map_result: R) -> Result<Update<P>>
where
    C: Progression,
    P: Progression,
    N: FnOnce(C) -> P + Send + 'static,
    R: FnOnce(C::Output) -> Result<State<P>> + Send + 'static,
{
    let remap = move |state: State<C>| -> Result<State<P>> {
        match state {
            State::Running(next) => Ok(State::Running(map_next(next))),
            State::Finished(output) => map_result(output),
        }
    };

    match child.update_or_defer_next()? {
        Update::Now(state) => remap(state).map(Update::Now),
        Update::Later(next) => Ok(Update::Later(next.try_map(remap))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::Deferred;
    use crate::errors::FlowError;

    /// Counts down, then reports how many ticks it took.
    struct Ticks {
        left: u32,
        taken: u32,
    }

    impl Progression for Ticks {
        type Output = u32;

        fn update_or_defer_next(self) -> Result<Update<Self>> {
            if self.left == 0 {
                return Ok(Update::finish(self.taken));
            }
            let next = Ticks {
                left: self.left - 1,
                taken: self.taken + 1,
            };
            Ok(Update::later_advance(Deferred::value(next)))
        }
    }

    enum Parent {
        Child(Ticks),
        Double(u32),
    }

    impl Progression for Parent {
        type Output = u32;

        fn update_or_defer_next(self) -> Result<Update<Self>> {
            match self {
                Parent::Child(child) => compose(child, Parent::Child, |ticks| {
                    Ok(State::Running(Parent::Double(ticks)))
                }),
                Parent::Double(n) => Ok(Update::finish(n * 2)),
            }
        }
    }

    fn step_to_end(mut p: Parent) -> (u32, usize) {
        let mut steps = 0;
        loop {
            steps += 1;
            let out = std::sync::Arc::new(std::sync::Mutex::new(None));
            let sink = std::sync::Arc::clone(&out);
            p.next().perform(move |r| *sink.lock().unwrap() = Some(r));
            let state = out.lock().unwrap().take().unwrap().unwrap();
            match state {
                State::Running(next) => p = next,
                State::Finished(v) => return (v, steps),
            }
        }
    }

    #[test]
    fn child_states_are_remapped_into_parent() {
        let (value, steps) = step_to_end(Parent::Child(Ticks { left: 3, taken: 0 }));
        assert_eq!(value, 6);
        // 3 ticks + the child's finishing step + Double.
        assert_eq!(steps, 5);
    }

    #[test]
    fn map_result_failure_fails_parent() {
        let child = Ticks { left: 0, taken: 0 };
        let update: Result<Update<Parent>> =
            compose(child, Parent::Child, |_| Err(FlowError::failure("rejected")));
        assert!(update.is_err());
    }
}
