use std::fmt;

/// A tag that was either recognized as a known variant `T`, or kept as its raw
/// on-disk value.
///
/// Asset formats drift between shipped builds, so a header field holding an
/// enumerated tag is stored as a `Recognized` rather than failing the whole
/// decode. Whether an unknown value is fatal is decided where the tag is
/// actually used.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Recognized<T, Raw = u32> {
    Known(T),
    Unknown(Raw),
}

impl<T: Copy, Raw: Copy> Copy for Recognized<T, Raw> {}

impl<T, Raw> Recognized<T, Raw>
where
    T: TryFrom<Raw>,
    Raw: Copy,
{
    /// Classify a raw value, keeping it verbatim when `T` has no matching variant.
    pub fn from_raw(raw: Raw) -> Self {
        match T::try_from(raw) {
            Ok(known) => Recognized::Known(known),
            Err(_) => Recognized::Unknown(raw),
        }
    }
}

impl<T, Raw> Recognized<T, Raw> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Recognized::Known(t) => Some(t),
            Recognized::Unknown(_) => None,
        }
    }

    pub fn unknown(&self) -> Option<&Raw> {
        match self {
            Recognized::Known(_) => None,
            Recognized::Unknown(raw) => Some(raw),
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Recognized::Known(_))
    }
}

impl<T, Raw> From<T> for Recognized<T, Raw> {
    fn from(value: T) -> Self {
        Recognized::Known(value)
    }
}

impl<T: fmt::Display, Raw: fmt::Display> fmt::Display for Recognized<T, Raw> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recognized::Known(t) => t.fmt(f),
            Recognized::Unknown(raw) => write!(f, "unknown({raw})"),
        }
    }
}
