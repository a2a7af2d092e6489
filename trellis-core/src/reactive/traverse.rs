//! Deep-Watch Traversal
//!
//! A deep watch subscribes to everything currently reachable from its
//! value, not just the top-level reference. After a deep computation's
//! getter returns, the runtime walks the produced value while the
//! computation is still on the tracking stack, so every nested cell touched
//! by the walk registers a read.
//!
//! Value types participate by implementing [`Traverse`]: containers forward
//! the walk to their elements, and types embedding an [`ObservableCell`]
//! call [`ObservableCell::register_read`] on it. Plain data implements the
//! trait as a no-op.

use std::rc::Rc;

use super::cell::ObservableCell;

/// Walks a value's reachable structure for deep watching.
///
/// `STRUCTURAL` marks composite values whose in-place mutation cannot be
/// detected by comparing old and new: watches on structural values fire
/// their callback even when the comparison says "unchanged".
pub trait Traverse {
    /// Whether the value is composite (mutation may be invisible to `==`).
    const STRUCTURAL: bool = false;

    /// Touch every nested observable so it registers a read.
    fn traverse(&self) {}
}

/// Reading a bare cell under a deep watch subscribes to it.
impl Traverse for ObservableCell {
    fn traverse(&self) {
        self.register_read();
    }
}

macro_rules! plain {
    ($($ty:ty),* $(,)?) => {
        $(impl Traverse for $ty {})*
    };
}

plain!((), bool, char, i8, i16, i32, i64, i128, isize);
plain!(u8, u16, u32, u64, u128, usize, f32, f64, String, &'static str);

impl<T: Traverse> Traverse for Option<T> {
    const STRUCTURAL: bool = T::STRUCTURAL;

    fn traverse(&self) {
        if let Some(value) = self {
            value.traverse();
        }
    }
}

impl<T: Traverse> Traverse for Vec<T> {
    const STRUCTURAL: bool = true;

    fn traverse(&self) {
        for value in self {
            value.traverse();
        }
    }
}

impl<T: Traverse> Traverse for Box<T> {
    const STRUCTURAL: bool = T::STRUCTURAL;

    fn traverse(&self) {
        (**self).traverse();
    }
}

impl<T: Traverse> Traverse for Rc<T> {
    const STRUCTURAL: bool = T::STRUCTURAL;

    fn traverse(&self) {
        (**self).traverse();
    }
}

impl<A: Traverse, B: Traverse> Traverse for (A, B) {
    const STRUCTURAL: bool = A::STRUCTURAL || B::STRUCTURAL;

    fn traverse(&self) {
        self.0.traverse();
        self.1.traverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_not_structural() {
        assert!(!<i32 as Traverse>::STRUCTURAL);
        assert!(!<String as Traverse>::STRUCTURAL);
    }

    #[test]
    fn containers_are_structural() {
        assert!(<Vec<i32> as Traverse>::STRUCTURAL);
        assert!(<Option<Vec<i32>> as Traverse>::STRUCTURAL);
        assert!(!<Option<i32> as Traverse>::STRUCTURAL);
    }

    #[test]
    fn traversal_reaches_nested_values() {
        // A walk over a nested structure must visit every element; verified
        // indirectly through a counting wrapper.
        use std::cell::Cell;

        struct Counted(Rc<Cell<usize>>);

        impl Traverse for Counted {
            fn traverse(&self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let count = Rc::new(Cell::new(0));
        let values = vec![
            Counted(count.clone()),
            Counted(count.clone()),
            Counted(count.clone()),
        ];
        values.traverse();
        assert_eq!(count.get(), 3);
    }
}
