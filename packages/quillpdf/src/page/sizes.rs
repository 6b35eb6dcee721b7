//! Named page sizes in PDF points (1/72 inch)

pub const A3: (f64, f64) = (841.89, 1190.55);
pub const A4: (f64, f64) = (595.28, 841.89);
pub const A5: (f64, f64) = (419.53, 595.28);
pub const A6: (f64, f64) = (297.64, 419.53);
pub const A7: (f64, f64) = (209.76, 297.64);
pub const LETTER: (f64, f64) = (612.0, 792.0);
pub const LEGAL: (f64, f64) = (612.0, 1008.0);
pub const TABLOID: (f64, f64) = (792.0, 1224.0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a_series_halves() {
        // Each A size is the previous one folded in half, within rounding
        assert!((A4.0 - A5.1).abs() < 0.01);
        assert!((A5.0 - A6.1).abs() < 0.01);
    }

    #[test]
    fn test_us_sizes() {
        assert_eq!(LETTER, (612.0, 792.0));
        assert_eq!(LEGAL, (612.0, 1008.0));
    }
}
