use std::fmt;

use serde::{Deserialize, Serialize};

/// number of damage classes (and threshold vector components)
pub const CLASS_COUNT: usize = 4;

/// road damage classes in fixed vector order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DamageClass {
    /// longitudinal crack
    D00,
    /// transverse crack
    D10,
    /// alligator crack
    D20,
    /// pothole
    D40,
}

impl DamageClass {
    pub const ALL: [DamageClass; CLASS_COUNT] = [
        DamageClass::D00,
        DamageClass::D10,
        DamageClass::D20,
        DamageClass::D40,
    ];

    /// position in the threshold vector (also the detector's class id)
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// map a detector/label class id back to a class; unknown ids yield None
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(DamageClass::D00),
            1 => Some(DamageClass::D10),
            2 => Some(DamageClass::D20),
            3 => Some(DamageClass::D40),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DamageClass::D00 => "D00",
            DamageClass::D10 => "D10",
            DamageClass::D20 => "D20",
            DamageClass::D40 => "D40",
        }
    }

    /// column name used by the probability table
    pub fn prob_column(self) -> String {
        format!("{}_prob", self.name())
    }
}

impl fmt::Display for DamageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
