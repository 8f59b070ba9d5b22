use crate::service::database::DatabaseError;

pub fn clamp<T: Ord>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

pub fn required_str(s: &str, msg: &'static str) -> Result<(), DatabaseError> {
    if s.trim().is_empty() {
        Err(DatabaseError::InvalidArgument(msg))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(0, 1, 365), 1);
        assert_eq!(clamp(400, 1, 365), 365);
        assert_eq!(clamp(30, 1, 365), 30);
    }

    #[test]
    fn test_required_str() {
        assert!(required_str("Alice", "name").is_ok());
        assert!(matches!(
            required_str("  ", "name"),
            Err(DatabaseError::InvalidArgument("name"))
        ));
    }
}
