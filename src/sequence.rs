//! Wrap-tolerant comparison of counter snapshots.
//!
//! Counter values live in an unsigned domain that wraps at its width. Two
//! snapshots are compared by subtracting modulo the width and reading the
//! result as a signed number of the same width, so a value just past the
//! wrap point still compares as "ahead" of a value just before it.
//!
//! ```rust
//! use mbtest::sequence::WrappingSeq;
//!
//! // 250 -> 3 crosses the u8 wrap point: 3 is 9 steps ahead.
//! assert_eq!(3u8.distance_from(250), 9);
//! assert!(3u8.is_ahead_of(250));
//! assert!(!3u8.is_ahead_of(5));
//! ```

/// Unsigned counter types with wrap-tolerant ordering.
pub trait WrappingSeq: Copy {
    /// Signed type of the same width.
    type Signed: Copy + Ord + Default;

    /// `self - earlier`, computed modulo the width and reinterpreted as signed.
    fn distance_from(self, earlier: Self) -> Self::Signed;

    /// True iff `self` is strictly ahead of `other`.
    #[inline]
    fn is_ahead_of(self, other: Self) -> bool {
        self.distance_from(other) > Self::Signed::default()
    }
}

macro_rules! impl_wrapping_seq {
    ($($unsigned:ty => $signed:ty),* $(,)?) => {
        $(
            impl WrappingSeq for $unsigned {
                type Signed = $signed;

                #[inline]
                #[allow(clippy::cast_possible_wrap)]
                fn distance_from(self, earlier: Self) -> $signed {
                    self.wrapping_sub(earlier) as $signed
                }
            }
        )*
    };
}

impl_wrapping_seq!(u8 => i8, u16 => i16, u32 => i32, u64 => i64, usize => isize);

/// The violation rule: B's value `d` is strictly ahead of A's value `c`.
///
/// An observer that read B first and A second, with a read barrier between
/// them, must never see A behind B when the publisher wrote A first and B
/// second with a write barrier between them.
#[inline]
#[must_use]
pub fn is_violation<T: WrappingSeq>(c: T, d: T) -> bool {
    d.is_ahead_of(c)
}
