pub trait NumExt {
    /// Returns the base 2 logarithm of the number, rounding up to the next integer.
    fn ilog2_ceil(self) -> Self;
}

impl NumExt for usize {
    #[inline]
    fn ilog2_ceil(self) -> Self {
        if self <= 1 {
            return 0;
        }

        (usize::BITS - (self - 1).leading_zeros()) as Self
    }
}

/// Returns the spreadsheet style label for the zero-based `index`: `A`..`Z`, `AA`, `AB`, ...
pub fn identifier(mut index: usize) -> String {
    let mut buf = Vec::new();

    loop {
        buf.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }

        index = index / 26 - 1;
    }

    buf.reverse();
    // Only ASCII letters are pushed.
    String::from_utf8_lossy(&buf).into_owned()
}

/// Distributes `items` over `buckets` in snake order: 1, 2, 3, 3, 2, 1, 1, 2, ...
pub fn snake<T>(items: &[T], buckets: usize) -> Vec<Vec<T>>
where
    T: Copy,
{
    let mut out: Vec<Vec<T>> = vec![Vec::new(); buckets.min(items.len())];
    let buckets = out.len();
    if buckets == 0 {
        return out;
    }

    for (index, item) in items.iter().enumerate() {
        let (row, column) = (index / buckets, index % buckets);
        let column = if row % 2 == 0 {
            column
        } else {
            buckets - column - 1
        };

        out[column].push(*item);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{identifier, snake, NumExt};

    #[test]
    fn test_ilog2() {
        assert_eq!(1_usize.ilog2_ceil(), 0);
        assert_eq!(2_usize.ilog2_ceil(), 1);
        assert_eq!(3_usize.ilog2_ceil(), 2);
        assert_eq!(4_usize.ilog2_ceil(), 2);
        assert_eq!(5_usize.ilog2_ceil(), 3);
        assert_eq!(8_usize.ilog2_ceil(), 3);
        assert_eq!(9_usize.ilog2_ceil(), 4);
        assert_eq!(16_usize.ilog2_ceil(), 4);
        assert_eq!(17_usize.ilog2_ceil(), 5);
        assert_eq!(32_usize.ilog2_ceil(), 5);
    }

    #[test]
    fn test_identifier() {
        assert_eq!(identifier(0), "A");
        assert_eq!(identifier(25), "Z");
        assert_eq!(identifier(26), "AA");
        assert_eq!(identifier(27), "AB");
        assert_eq!(identifier(51), "AZ");
        assert_eq!(identifier(52), "BA");
        assert_eq!(identifier(701), "ZZ");
        assert_eq!(identifier(702), "AAA");
    }

    #[test]
    fn test_snake() {
        let items: Vec<u32> = (1..=8).collect();
        assert_eq!(snake(&items, 3), [vec![1, 6, 7], vec![2, 5, 8], vec![3, 4]]);
        assert_eq!(snake(&items[..2], 4), [vec![1], vec![2]]);
        assert!(snake(&items[..0], 2).is_empty());
    }
}
