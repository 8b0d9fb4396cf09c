//! Human-scaled byte counts.
//!
//! Units step by 1024: `K` divides by 1024, `T` by 1024⁴. A selector outside
//! `K`, `M`, `G`, `T` leaves the raw count untouched.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Unit {
    K,
    M,
    G,
    T,
}

impl Unit {
    pub const ALL: [Self; 4] = [Self::K, Self::M, Self::G, Self::T];

    /// Recognizes exactly `"K"`, `"M"`, `"G"` and `"T"`.
    pub fn from_selector(selector: &str) -> Option<Self> {
        match selector {
            "K" => Some(Self::K),
            "M" => Some(Self::M),
            "G" => Some(Self::G),
            "T" => Some(Self::T),
            _ => None,
        }
    }

    /// Zero-based position in `K < M < G < T`
    pub fn index(self) -> i32 {
        match self {
            Self::K => 0,
            Self::M => 1,
            Self::G => 2,
            Self::T => 3,
        }
    }

    pub fn divisor(self) -> f64 {
        1024_f64.powi(self.index() + 1)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self {
            Self::K => "K",
            Self::M => "M",
            Self::G => "G",
            Self::T => "T",
        };
        f.write_str(unit)
    }
}

/// A byte measurement, either as reported or scaled to a unit.
#[derive(Debug, Clone, PartialEq)]
pub enum SizeValue {
    Raw(u64),
    Scaled {
        raw: u64,
        unit: Unit,
        /// Rounded quotient, equal to the numeric part of `text`
        value: f64,
        /// e.g. `1.50Gb`
        text: String,
    },
}

impl SizeValue {
    /// The unscaled byte count behind either view
    pub fn raw(&self) -> u64 {
        match self {
            Self::Raw(raw) | Self::Scaled { raw, .. } => *raw,
        }
    }

    pub fn unit(&self) -> Option<Unit> {
        match self {
            Self::Raw(_) => None,
            Self::Scaled { unit, .. } => Some(*unit),
        }
    }

    pub fn scaled(&self) -> Option<f64> {
        match self {
            Self::Raw(_) => None,
            Self::Scaled { value, .. } => Some(*value),
        }
    }

    pub fn is_scaled(&self) -> bool {
        matches!(self, Self::Scaled { .. })
    }
}

impl fmt::Display for SizeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(raw) => write!(f, "{raw}"),
            Self::Scaled { text, .. } => f.write_str(text),
        }
    }
}

/// Scales `raw` to the unit named by `selector`, rounded to `decimals` places.
pub fn scale(raw: u64, selector: Option<&str>, decimals: usize) -> SizeValue {
    let Some(unit) = selector.and_then(Unit::from_selector) else {
        return SizeValue::Raw(raw);
    };

    #[allow(clippy::cast_precision_loss)]
    let quotient = raw as f64 / unit.divisor();
    let number = format!("{quotient:.decimals$}");
    let value = number.parse().unwrap_or(quotient);

    SizeValue::Scaled {
        raw,
        unit,
        value,
        text: format!("{number}{unit}b"),
    }
}
