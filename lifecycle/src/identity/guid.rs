use std::{borrow::Borrow, fmt, sync::Arc};

/// A stable, non-empty identifier shared by a canonical object and its clones.
///
/// Cheap to clone; the string is reference counted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Guid(Arc<str>);

impl Guid {
    /// Wrap `value` as a guid.
    ///
    /// # Panics
    ///
    /// Panics if `value` is empty. An empty guid is a programming error, not a missing one;
    /// use `Option<Guid>` for the latter.
    pub fn new(value: impl AsRef<str>) -> Self {
        let value = value.as_ref();
        assert!(!value.is_empty(), "guid must not be empty");
        Self(Arc::from(value))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Guid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Guid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_round_trips_its_string() {
        let guid = Guid::new("3f2a9c");

        assert_eq!(guid.as_str(), "3f2a9c");
        assert_eq!(guid.to_string(), "3f2a9c");
        assert_eq!(Guid::new(String::from("3f2a9c")), guid);
    }

    #[test]
    #[should_panic(expected = "guid must not be empty")]
    fn empty_guid_panics() {
        Guid::new("");
    }
}
