//! Aspect ratio policies and their lookup table.

use serde::{Deserialize, Serialize};

/// Aspect ratio policy. Everything before `Config` is a fixed ratio; the
/// rest are recomputed from configuration, core geometry or the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    Ratio4x3,
    Ratio16x9,
    Ratio16x10,
    Ratio16x15,
    Ratio21x9,
    Ratio1x1,
    Ratio2x1,
    Ratio3x2,
    Ratio3x4,
    Ratio4x1,
    Ratio9x16,
    Ratio5x4,
    Ratio6x5,
    Ratio7x9,
    Ratio8x3,
    Ratio8x7,
    Ratio19x12,
    Ratio19x14,
    Ratio30x17,
    Ratio32x9,
    /// Value from configuration, or derived from the core when unset
    Config,
    /// 1:1 pixel aspect of the core's base resolution
    SquarePixel,
    /// Whatever the core reports
    Core,
    /// User-placed custom viewport
    Custom,
    /// Fill the whole surface
    Full,
}

pub const ASPECT_RATIO_COUNT: usize = 25;

impl AspectRatio {
    pub const ALL: [AspectRatio; ASPECT_RATIO_COUNT] = [
        AspectRatio::Ratio4x3,
        AspectRatio::Ratio16x9,
        AspectRatio::Ratio16x10,
        AspectRatio::Ratio16x15,
        AspectRatio::Ratio21x9,
        AspectRatio::Ratio1x1,
        AspectRatio::Ratio2x1,
        AspectRatio::Ratio3x2,
        AspectRatio::Ratio3x4,
        AspectRatio::Ratio4x1,
        AspectRatio::Ratio9x16,
        AspectRatio::Ratio5x4,
        AspectRatio::Ratio6x5,
        AspectRatio::Ratio7x9,
        AspectRatio::Ratio8x3,
        AspectRatio::Ratio8x7,
        AspectRatio::Ratio19x12,
        AspectRatio::Ratio19x14,
        AspectRatio::Ratio30x17,
        AspectRatio::Ratio32x9,
        AspectRatio::Config,
        AspectRatio::SquarePixel,
        AspectRatio::Core,
        AspectRatio::Custom,
        AspectRatio::Full,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Next policy in table order, wrapping around
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % ASPECT_RATIO_COUNT]
    }
}

/// One row of the aspect table.
#[derive(Debug, Clone, PartialEq)]
pub struct AspectRatioEntry {
    pub name: String,
    pub value: f32,
}

/// Fixed-size table indexed by [`AspectRatio`].
#[derive(Debug, Clone, PartialEq)]
pub struct AspectRatioTable {
    entries: Vec<AspectRatioEntry>,
}

impl Default for AspectRatioTable {
    fn default() -> Self {
        let fixed: [(&str, f32); ASPECT_RATIO_COUNT] = [
            ("4:3", 4.0 / 3.0),
            ("16:9", 16.0 / 9.0),
            ("16:10", 1.6),
            ("16:15", 16.0 / 15.0),
            ("21:9", 21.0 / 9.0),
            ("1:1", 1.0),
            ("2:1", 2.0),
            ("3:2", 1.5),
            ("3:4", 0.75),
            ("4:1", 4.0),
            ("9:16", 0.5625),
            ("5:4", 1.25),
            ("6:5", 1.2),
            ("7:9", 7.0 / 9.0),
            ("8:3", 8.0 / 3.0),
            ("8:7", 8.0 / 7.0),
            ("19:12", 19.0 / 12.0),
            ("19:14", 19.0 / 14.0),
            ("30:17", 30.0 / 17.0),
            ("32:9", 32.0 / 9.0),
            ("Config", 0.0),
            ("Square pixel", 1.0),
            ("Core provided", 1.0),
            ("Custom", 0.0),
            ("Full", 0.0),
        ];
        Self {
            entries: fixed
                .iter()
                .map(|&(name, value)| AspectRatioEntry {
                    name: name.to_string(),
                    value,
                })
                .collect(),
        }
    }
}

impl AspectRatioTable {
    pub fn get(&self, policy: AspectRatio) -> &AspectRatioEntry {
        &self.entries[policy.index()]
    }

    pub fn value(&self, policy: AspectRatio) -> f32 {
        self.entries[policy.index()].value
    }

    pub(crate) fn set_value(&mut self, policy: AspectRatio, value: f32) {
        self.entries[policy.index()].value = value;
    }

    pub(crate) fn set_name(&mut self, policy: AspectRatio, name: String) {
        self.entries[policy.index()].name = name;
    }

    pub fn iter(&self) -> impl Iterator<Item = (AspectRatio, &AspectRatioEntry)> {
        AspectRatio::ALL.iter().copied().zip(self.entries.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_indexed_by_policy() {
        let table = AspectRatioTable::default();
        assert_eq!(table.get(AspectRatio::Ratio16x9).name, "16:9");
        assert_eq!(table.get(AspectRatio::Custom).name, "Custom");
        assert!((table.value(AspectRatio::Ratio4x3) - 1.3333).abs() < 0.001);
        assert_eq!(table.iter().count(), ASPECT_RATIO_COUNT);
    }

    #[test]
    fn test_policy_index_roundtrip_and_cycle() {
        for policy in AspectRatio::ALL {
            assert_eq!(AspectRatio::from_index(policy.index()), Some(policy));
        }
        assert_eq!(AspectRatio::from_index(ASPECT_RATIO_COUNT), None);
        assert_eq!(AspectRatio::Full.next(), AspectRatio::Ratio4x3);
        assert_eq!(AspectRatio::Config.next(), AspectRatio::SquarePixel);
    }
}
