use crate::{ArrayDataType, Nodata};

// Type requirements for data in rasters
pub trait ArrayNum:
    Copy
    + Nodata
    + num::Num
    + num::NumCast
    + num::Bounded
    + std::cmp::PartialOrd
    + std::fmt::Debug
    + std::string::ToString
    + Send
    + Sync
    + 'static
{
    const TYPE: ArrayDataType;

    /// Addition where the result is nodata when either operand is nodata
    fn add_nodata_aware(self, other: Self) -> Self;

    /// Addition where the result is only nodata when both operands are nodata
    fn add_inclusive_nodata_aware(self, other: Self) -> Self;

    #[inline]
    fn add_assign_nodata_aware(&mut self, other: Self) {
        *self = self.add_nodata_aware(other);
    }

    #[inline]
    fn add_assign_inclusive_nodata_aware(&mut self, other: Self) {
        *self = self.add_inclusive_nodata_aware(other);
    }
}

macro_rules! add_nodata_impl {
    () => {
        #[inline]
        fn add_nodata_aware(self, other: Self) -> Self {
            if self.is_nodata() || other.is_nodata() {
                Self::NODATA
            } else {
                self.saturating_add(other)
            }
        }

        #[inline]
        fn add_inclusive_nodata_aware(self, other: Self) -> Self {
            match (self.is_nodata(), other.is_nodata()) {
                (true, true) => Self::NODATA,
                (false, true) => self,
                (true, false) => other,
                (false, false) => self.saturating_add(other),
            }
        }
    };
}

macro_rules! add_fp_nodata_impl {
    () => {
        #[inline]
        fn add_nodata_aware(self, other: Self) -> Self {
            self + other
        }

        #[inline]
        fn add_inclusive_nodata_aware(self, other: Self) -> Self {
            match (self.is_nodata(), other.is_nodata()) {
                (true, true) => Self::NODATA,
                (false, true) => self,
                (true, false) => other,
                (false, false) => self + other,
            }
        }
    };
}

macro_rules! arraynum_int_impl {
    ( $t:ty, $data_type:ident ) => {
        impl ArrayNum for $t {
            const TYPE: ArrayDataType = ArrayDataType::$data_type;

            add_nodata_impl!();
        }
    };
}

macro_rules! arraynum_fp_impl {
    ( $t:ty, $data_type:ident ) => {
        impl ArrayNum for $t {
            const TYPE: ArrayDataType = ArrayDataType::$data_type;

            add_fp_nodata_impl!();
        }
    };
}

arraynum_int_impl!(i8, Int8);
arraynum_int_impl!(u8, Uint8);
arraynum_int_impl!(i16, Int16);
arraynum_int_impl!(u16, Uint16);
arraynum_int_impl!(i32, Int32);
arraynum_int_impl!(u32, Uint32);
arraynum_int_impl!(i64, Int64);
arraynum_int_impl!(u64, Uint64);
arraynum_fp_impl!(f32, Float32);
arraynum_fp_impl!(f64, Float64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_nodata_aware() {
        assert_eq!(1u16.add_nodata_aware(2), 3);
        assert!(1u16.add_nodata_aware(u16::NODATA).is_nodata());
        assert!(u16::NODATA.add_nodata_aware(u16::NODATA).is_nodata());
        assert!(f32::NODATA.add_nodata_aware(1.0).is_nodata());
    }

    #[test]
    fn add_inclusive_nodata_aware() {
        assert_eq!(1u16.add_inclusive_nodata_aware(2), 3);
        assert_eq!(1u16.add_inclusive_nodata_aware(u16::NODATA), 1);
        assert_eq!(u16::NODATA.add_inclusive_nodata_aware(4), 4);
        assert!(u16::NODATA.add_inclusive_nodata_aware(u16::NODATA).is_nodata());
        assert_eq!(f64::NODATA.add_inclusive_nodata_aware(1.5), 1.5);
    }
}
