quantity!(Volts, "V");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(Volts(29.7) >= Volts(29.6));
        assert!(Volts(21.9) <= Volts(22.0));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("28.3".parse::<Volts>().unwrap(), Volts(28.3));
    }
}
