/// Numeric conversion used by typed field access on a [`PointTable`].
///
/// Every column is read through `f64`; integer targets use Rust's saturating
/// float-to-int casts, so out-of-range values clamp and NaN becomes zero.
///
/// [`PointTable`]: crate::PointTable
pub trait Field: Copy {
    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;
}

macro_rules! impl_int_field {
    ($($t:ty),*) => {
        $(
            impl Field for $t {
                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $t
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_int_field!(u8, i8, u16, i32, i64);

impl Field for f64 {
    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}

impl Field for bool {
    #[inline]
    fn from_f64(value: f64) -> Self {
        value > 0.0
    }

    #[inline]
    fn to_f64(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }
}
