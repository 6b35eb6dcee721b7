//! Decode parameter model for PDF filters

use crate::pdf::object::{Dict, DictExt};

/// Parameters shared by FlateDecode and LZWDecode predictors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeParams {
    pub predictor: u8,
    pub colors: u8,
    pub bits_per_component: u8,
    pub columns: u32,
    /// LZW only
    pub early_change: bool,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
            early_change: true,
        }
    }
}

impl DecodeParams {
    pub fn from_dict(dict: &Dict) -> Self {
        let d = Self::default();
        Self {
            predictor: dict.get_int("Predictor").unwrap_or(d.predictor as i64) as u8,
            colors: dict.get_int("Colors").unwrap_or(d.colors as i64) as u8,
            bits_per_component: dict
                .get_int("BitsPerComponent")
                .unwrap_or(d.bits_per_component as i64) as u8,
            columns: dict.get_int("Columns").unwrap_or(d.columns as i64) as u32,
            early_change: dict.get_int("EarlyChange").unwrap_or(1) != 0,
        }
    }

    /// Whole bytes covering one pixel.
    pub fn bytes_per_pixel(&self) -> usize {
        (self.colors as usize * self.bits_per_component as usize).div_ceil(8)
    }

    /// Whole bytes covering one row of samples.
    pub fn bytes_per_row(&self) -> usize {
        (self.colors as usize * self.bits_per_component as usize * self.columns as usize)
            .div_ceil(8)
    }
}
