//! Input normalization before anything reaches the operation table.

use crate::error::ValidationError;

/// Anything the validator can coerce to an `f64` operand.
pub trait ToOperand {
    fn to_operand(&self) -> Result<f64, ValidationError>;
}

impl ToOperand for f64 {
    fn to_operand(&self) -> Result<f64, ValidationError> {
        Ok(*self)
    }
}

impl ToOperand for f32 {
    fn to_operand(&self) -> Result<f64, ValidationError> {
        Ok(f64::from(*self))
    }
}

impl ToOperand for i32 {
    fn to_operand(&self) -> Result<f64, ValidationError> {
        Ok(f64::from(*self))
    }
}

impl ToOperand for i64 {
    fn to_operand(&self) -> Result<f64, ValidationError> {
        Ok(*self as f64)
    }
}

impl ToOperand for u32 {
    fn to_operand(&self) -> Result<f64, ValidationError> {
        Ok(f64::from(*self))
    }
}

impl ToOperand for str {
    fn to_operand(&self) -> Result<f64, ValidationError> {
        self.trim()
            .parse::<f64>()
            .map_err(|_| ValidationError::InvalidNumber {
                input: self.to_string(),
            })
    }
}

impl ToOperand for String {
    fn to_operand(&self) -> Result<f64, ValidationError> {
        self.as_str().to_operand()
    }
}

impl<T: ToOperand + ?Sized> ToOperand for &T {
    fn to_operand(&self) -> Result<f64, ValidationError> {
        (**self).to_operand()
    }
}

/// Bounds-checks operands and normalizes operation names.
#[derive(Debug, Clone, Copy)]
pub struct InputValidator {
    max_input_value: f64,
}

impl InputValidator {
    pub fn new(max_input_value: f64) -> Self {
        InputValidator { max_input_value }
    }

    pub fn max_input_value(&self) -> f64 {
        self.max_input_value
    }

    /// Coerce `value` and reject NaN, infinities, and magnitudes above the maximum.
    pub fn validate_number<T>(&self, value: &T) -> Result<f64, ValidationError>
    where
        T: ToOperand + ?Sized,
    {
        let number = value.to_operand()?;
        if !number.is_finite() {
            return Err(ValidationError::NotFinite {
                input: number.to_string(),
            });
        }
        if number.abs() > self.max_input_value {
            return Err(ValidationError::ExceedsMaximum {
                value: number,
                max: self.max_input_value,
            });
        }
        Ok(number)
    }

    /// Trim and lower-case; blank names are rejected.
    pub fn validate_operation(&self, operation: &str) -> Result<String, ValidationError> {
        let trimmed = operation.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyOperation);
        }
        Ok(trimmed.to_lowercase())
    }

    pub fn validate_operands<A, B>(
        &self,
        left: &A,
        right: &B,
    ) -> Result<(f64, f64), ValidationError>
    where
        A: ToOperand + ?Sized,
        B: ToOperand + ?Sized,
    {
        Ok((self.validate_number(left)?, self.validate_number(right)?))
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        InputValidator::new(f64::MAX)
    }
}
