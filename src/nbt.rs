//! Typed, non-panicking access to the tag tree handed to us by the NBT reader.

use valence_nbt::{Compound, List, Value};

/// Pattern-matched accessors over a [`Compound`].
///
/// Every accessor returns `None` when the key is missing *or* holds a value
/// of another type. Callers decide whether that means "use the default" or
/// "this chunk is broken".
pub trait CompoundExt {
    fn value(&self, key: &str) -> Option<&Value>;

    /// Any integral tag widened to `i64`. Section `Y` has been written as
    /// both a byte and an int over the years.
    fn int_like(&self, key: &str) -> Option<i64> {
        match self.value(key)? {
            Value::Byte(v) => Some(i64::from(*v)),
            Value::Short(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    fn int(&self, key: &str) -> Option<i32> {
        self.int_like(key).and_then(|v| i32::try_from(v).ok())
    }

    fn string(&self, key: &str) -> Option<&str> {
        match self.value(key)? {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn compound(&self, key: &str) -> Option<&Compound> {
        match self.value(key)? {
            Value::Compound(c) => Some(c),
            _ => None,
        }
    }

    /// A list of compounds. An empty list is stored with the `End` element
    /// type, so that is accepted as an empty slice.
    fn compound_list(&self, key: &str) -> Option<&[Compound]> {
        match self.value(key)? {
            Value::List(List::Compound(list)) => Some(list),
            Value::List(List::End) => Some(&[]),
            _ => None,
        }
    }

    fn string_list(&self, key: &str) -> Option<&[String]> {
        match self.value(key)? {
            Value::List(List::String(list)) => Some(list),
            Value::List(List::End) => Some(&[]),
            _ => None,
        }
    }

    fn byte_array(&self, key: &str) -> Option<&[i8]> {
        match self.value(key)? {
            Value::ByteArray(bytes) => Some(bytes),
            _ => None,
        }
    }

    fn int_array(&self, key: &str) -> Option<&[i32]> {
        match self.value(key)? {
            Value::IntArray(ints) => Some(ints),
            _ => None,
        }
    }

    fn long_array(&self, key: &str) -> Option<&[i64]> {
        match self.value(key)? {
            Value::LongArray(longs) => Some(longs),
            // Some writers emit a long list instead of a long array.
            Value::List(List::Long(longs)) => Some(longs),
            _ => None,
        }
    }
}

impl CompoundExt for Compound {
    fn value(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }
}

/// Reads nibble `index` from a packed nibble array. Even indices live in the
/// low half of the byte.
#[inline]
pub fn nibble(bytes: &[i8], index: usize) -> u8 {
    let byte = bytes[index >> 1] as u8;
    if index & 1 == 0 {
        byte & 0x0F
    } else {
        byte >> 4
    }
}

#[cfg(test)]
mod tests {
    use valence_nbt::compound;

    use super::*;

    #[test]
    fn int_like_widens_every_integral_tag() {
        let nbt = compound! {
            "b" => -4_i8,
            "s" => 300_i16,
            "i" => 70_000,
            "l" => 5_i64,
            "f" => 1.0_f32,
        };
        assert_eq!(nbt.int_like("b"), Some(-4));
        assert_eq!(nbt.int_like("s"), Some(300));
        assert_eq!(nbt.int_like("i"), Some(70_000));
        assert_eq!(nbt.int_like("l"), Some(5));
        assert_eq!(nbt.int_like("f"), None);
        assert_eq!(nbt.int_like("missing"), None);
    }

    #[test]
    fn wrong_types_are_none() {
        let nbt = compound! {
            "name" => "minecraft:stone",
            "data" => Value::LongArray(vec![1, 2]),
        };
        assert_eq!(nbt.string("name"), Some("minecraft:stone"));
        assert!(nbt.byte_array("name").is_none());
        assert!(nbt.compound("data").is_none());
        assert_eq!(nbt.long_array("data"), Some(&[1_i64, 2][..]));
    }

    #[test]
    fn empty_list_reads_as_empty_slice() {
        let nbt = compound! {
            "palette" => List::End,
        };
        assert_eq!(nbt.compound_list("palette").map(<[_]>::len), Some(0));
        assert_eq!(nbt.string_list("palette").map(<[_]>::len), Some(0));
    }

    #[test]
    fn nibble_order_is_low_then_high() {
        let bytes = [0x21_u8 as i8, 0xF3_u8 as i8];
        assert_eq!(nibble(&bytes, 0), 1);
        assert_eq!(nibble(&bytes, 1), 2);
        assert_eq!(nibble(&bytes, 2), 3);
        assert_eq!(nibble(&bytes, 3), 15);
    }
}
