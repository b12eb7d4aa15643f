//! Fan-in folding.
//!
//! Activity completions arrive in arbitrary order, so anything that folds
//! their results must use a commutative, associative operation. The
//! accumulator is threaded by value through each step instead of being
//! captured and mutated by a closure.

use std::ops::Add;

/// A running fold of values under one binary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accumulator<T, F> {
    value: T,
    op: F,
}

impl<T, F> Accumulator<T, F>
where
    F: Fn(T, T) -> T,
{
    /// Start from `identity`.
    pub fn new(identity: T, op: F) -> Self {
        Self {
            value: identity,
            op,
        }
    }

    /// Fold in one value.
    pub fn fold(self, item: T) -> Self {
        let value = (self.op)(self.value, item);
        Self { value, op: self.op }
    }

    /// Fold in every value.
    pub fn fold_all(self, items: impl IntoIterator<Item = T>) -> Self {
        items.into_iter().fold(self, Self::fold)
    }

    /// Current value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Final value.
    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Summing accumulator starting at zero.
pub fn sum<T>() -> Accumulator<T, fn(T, T) -> T>
where
    T: Add<Output = T> + Default,
{
    Accumulator::<T, fn(T, T) -> T>::new(T::default(), |a, b| a + b)
}
