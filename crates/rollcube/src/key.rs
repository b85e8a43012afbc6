use core::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    ops::Index,
};

#[cfg(feature = "serde")]
use serde_big_array::BigArray;

/// Upper bound on the number of dimensions a key may have
///
/// Cubing visits `2^D` subsets per base key, so keys are expected to stay far below this.
pub const MAX_DIMS: usize = 16;

/// A single typed dimension value
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    /// Boolean dimension (e.g., a direction flag)
    Bool(bool),
    /// 8-bit identifier
    U8(u8),
    /// 32-bit unsigned identifier
    U32(u32),
    /// 32-bit signed value, used for time buckets
    I32(i32),
    /// 64-bit unsigned identifier
    U64(u64),
    /// 64-bit signed value
    I64(i64),
}

impl Value {
    /// Returns the inner bool if this is a [Value::Bool]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
    /// Returns the inner value if this is a [Value::U32]
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }
    /// Returns the inner value if this is a [Value::I32]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "{v}"),
            Value::U32(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::U64(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! value_from {
    ($type:ty, $variant:ident) => {
        impl From<$type> for Value {
            #[inline]
            fn from(v: $type) -> Self {
                Value::$variant(v)
            }
        }
    };
}

value_from!(bool, Bool);
value_from!(u8, U8);
value_from!(u32, U32);
value_from!(i32, I32);
value_from!(u64, U64);
value_from!(i64, I64);

/// A fixed-arity tuple of dimension values
///
/// Equality, hashing and ordering are structural and lexicographic over all positions.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key<const D: usize>(#[cfg_attr(feature = "serde", serde(with = "BigArray"))] [Value; D]);

impl<const D: usize> Key<D> {
    /// Creates a key from its dimension values
    #[inline]
    pub const fn new(values: [Value; D]) -> Self {
        Self(values)
    }
    /// Returns all dimension values
    #[inline]
    pub fn values(&self) -> &[Value; D] {
        &self.0
    }
    /// Overwrites the value at `dim`
    #[inline]
    pub fn set(&mut self, dim: usize, value: impl Into<Value>) {
        self.0[dim] = value.into();
    }
}

impl<const D: usize> Index<usize> for Key<D> {
    type Output = Value;

    #[inline]
    fn index(&self, dim: usize) -> &Value {
        &self.0[dim]
    }
}

impl<const D: usize> From<[Value; D]> for Key<D> {
    fn from(values: [Value; D]) -> Self {
        Self(values)
    }
}

impl<const D: usize> fmt::Display for Key<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// A set of dimension positions
///
/// Bit `i` set means dimension `i` is used; cleared means it is a wildcard.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Mask(u32);

impl Mask {
    /// A mask with no positions set
    pub const EMPTY: Mask = Mask(0);

    /// A mask with the first `dims` positions set
    #[inline]
    pub const fn full(dims: usize) -> Self {
        if dims >= 32 {
            Mask(u32::MAX)
        } else {
            Mask((1u32 << dims) - 1)
        }
    }
    /// A mask with only `dim` set
    #[inline]
    pub const fn single(dim: usize) -> Self {
        Mask(1 << dim)
    }
    /// Builds a mask from raw bits
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Mask(bits)
    }
    /// Raw bits of the mask
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }
    /// Returns `true` if `dim` is set
    #[inline]
    pub const fn is_set(self, dim: usize) -> bool {
        self.0 & (1 << dim) != 0
    }
    /// Sets or clears `dim`
    #[inline]
    pub fn set(&mut self, dim: usize, used: bool) {
        if used {
            self.0 |= 1 << dim;
        } else {
            self.0 &= !(1 << dim);
        }
    }
    /// Returns a copy with `dim` set or cleared
    #[inline]
    pub const fn with(self, dim: usize, used: bool) -> Self {
        if used {
            Mask(self.0 | (1 << dim))
        } else {
            Mask(self.0 & !(1 << dim))
        }
    }
    /// Union of two masks
    #[inline]
    pub const fn union(self, other: Mask) -> Self {
        Mask(self.0 | other.0)
    }
    /// Returns `true` if every position of `other` is also set in `self`
    #[inline]
    pub const fn contains(self, other: Mask) -> bool {
        self.0 & other.0 == other.0
    }
    /// Number of set positions
    #[inline]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }
    /// Returns `true` if all of the first `dims` positions are set
    #[inline]
    pub const fn is_full(self, dims: usize) -> bool {
        self.contains(Mask::full(dims))
    }
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mask({:#b})", self.0)
    }
}

/// A [Key] with a used-mask; unused positions are wildcards
///
/// Two partial keys are equal only if their masks match exactly and all used
/// positions hold equal values. Values at wildcard positions never take part in
/// equality, hashing or ordering.
///
/// Ordering is lexicographic over positions: where both sides are used the
/// values decide, and at the first position where only one side is used, the used
/// side sorts first (`used < *`).
///
/// # Example
///
/// ```
/// use rollcube::{Key, PartialKey, Value};
///
/// let a = PartialKey::full(Key::new([Value::U32(1), Value::Bool(true)])).project_out(1);
/// let b = PartialKey::full(Key::new([Value::U32(1), Value::Bool(false)])).project_out(1);
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "1 *");
/// ```
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Copy)]
pub struct PartialKey<const D: usize> {
    data: Key<D>,
    used: Mask,
}

impl<const D: usize> PartialKey<D> {
    const DIMS_CHECK: () = assert!(D <= MAX_DIMS, "keys support at most MAX_DIMS dimensions");

    /// Creates a partial key with every position wildcarded
    #[inline]
    pub fn new(data: Key<D>) -> Self {
        Self::with_mask(data, Mask::EMPTY)
    }
    /// Creates a partial key with every position used
    #[inline]
    pub fn full(data: Key<D>) -> Self {
        Self::with_mask(data, Mask::full(D))
    }
    /// Creates a partial key from a key and mask
    ///
    /// Bits beyond `D` are ignored.
    #[inline]
    pub fn with_mask(data: Key<D>, used: Mask) -> Self {
        let () = Self::DIMS_CHECK;
        Self {
            data,
            used: Mask::from_bits(used.bits() & Mask::full(D).bits()),
        }
    }
    /// Underlying key, including values at wildcard positions
    #[inline]
    pub fn key(&self) -> &Key<D> {
        &self.data
    }
    /// The used-mask
    #[inline]
    pub fn used(&self) -> Mask {
        self.used
    }
    /// Returns `true` if `dim` is used
    #[inline]
    pub fn is_used(&self, dim: usize) -> bool {
        self.used.is_set(dim)
    }
    /// Sets whether `dim` is used
    #[inline]
    pub fn set_used(&mut self, dim: usize, used: bool) {
        debug_assert!(dim < D);
        self.used.set(dim, used);
    }
    /// Value at `dim`, or `None` if it is a wildcard
    #[inline]
    pub fn get(&self, dim: usize) -> Option<&Value> {
        self.is_used(dim).then(|| &self.data[dim])
    }
    /// Returns `true` if at least one position is a wildcard
    #[inline]
    pub fn had_wildcard(&self) -> bool {
        !self.used.is_full(D)
    }
    /// Returns a copy with `dim` wildcarded
    #[inline]
    pub fn project_out(mut self, dim: usize) -> Self {
        self.set_used(dim, false);
        self
    }
}

impl<const D: usize> From<Key<D>> for PartialKey<D> {
    fn from(key: Key<D>) -> Self {
        Self::full(key)
    }
}

impl<const D: usize> PartialEq for PartialKey<D> {
    fn eq(&self, other: &Self) -> bool {
        self.used == other.used
            && (0..D).all(|i| !self.used.is_set(i) || self.data[i] == other.data[i])
    }
}

impl<const D: usize> Eq for PartialKey<D> {}

impl<const D: usize> Hash for PartialKey<D> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.used.hash(state);
        for i in (0..D).filter(|i| self.used.is_set(*i)) {
            self.data[i].hash(state);
        }
    }
}

impl<const D: usize> Ord for PartialKey<D> {
    fn cmp(&self, other: &Self) -> Ordering {
        for i in 0..D {
            match (self.used.is_set(i), other.used.is_set(i)) {
                (true, true) => match self.data[i].cmp(&other.data[i]) {
                    Ordering::Equal => continue,
                    ord => return ord,
                },
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                (false, false) => continue,
            }
        }
        Ordering::Equal
    }
}

impl<const D: usize> PartialOrd for PartialKey<D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<const D: usize> fmt::Display for PartialKey<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..D {
            if i > 0 {
                f.write_str(" ")?;
            }
            match self.get(i) {
                Some(v) => write!(f, "{v}")?,
                None => f.write_str("*")?,
            }
        }
        Ok(())
    }
}

impl<const D: usize> fmt::Debug for PartialKey<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartialKey({self})")
    }
}
