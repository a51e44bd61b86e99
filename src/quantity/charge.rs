quantity!(MilliampHours, "mAh");

impl MilliampHours {
    /// Magnitude of the accumulated charge, discharge sign stripped.
    #[must_use]
    pub fn magnitude(self) -> Self {
        Self(self.0.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitude() {
        assert_eq!(MilliampHours(-4200.0).magnitude(), MilliampHours(4200.0));
        assert_eq!(MilliampHours(1500.0).magnitude(), MilliampHours(1500.0));
    }
}
