//! Operator impls for single-field newtype wrappers.
//!
//! ```ignore
//! op!(Paise {
//!     binary Add::add,
//!     inplace AddAssign::add_assign,
//!     unary Neg::neg,
//! });
//! ```
//! The operator traits must be in scope where the macro is invoked.

#[macro_export]
macro_rules! op {
    (@binary $ty:ident $tr:ident $f:ident) => {
        impl $tr for $ty {
            type Output = Self;

            fn $f(self, rhs: Self) -> Self {
                Self($tr::$f(self.0, rhs.0))
            }
        }
    };

    (@inplace $ty:ident $tr:ident $f:ident) => {
        impl $tr for $ty {
            fn $f(&mut self, rhs: Self) {
                $tr::$f(&mut self.0, rhs.0)
            }
        }
    };

    (@unary $ty:ident $tr:ident $f:ident) => {
        impl $tr for $ty {
            type Output = Self;

            fn $f(self) -> Self {
                Self($tr::$f(self.0))
            }
        }
    };

    ($ty:ident { $($kind:ident $tr:ident::$f:ident),+ $(,)? }) => {
        $( $crate::op!(@ $kind $ty $tr $f); )+
    };
}
