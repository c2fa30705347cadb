//! The fixed operation table.
//!
//! Each [`OperationKind`] maps to one [`OperationDescriptor`] holding a plain
//! `fn` pointer. Operations are pure, so the table can be shared freely.
//! Adding an operation means adding a variant and one table entry; the
//! [`Calculator`](crate::Calculator) resolves by name and never matches on
//! the kind itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OperationError;
use crate::numeric;

/// Signature shared by all binary operations.
pub type OperationFn = fn(f64, f64) -> Result<f64, OperationError>;

/// Interned operation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Root,
    Modulus,
    IntDivide,
    Percent,
    AbsDiff,
}

impl OperationKind {
    pub const ALL: [OperationKind; 10] = [
        OperationKind::Add,
        OperationKind::Subtract,
        OperationKind::Multiply,
        OperationKind::Divide,
        OperationKind::Power,
        OperationKind::Root,
        OperationKind::Modulus,
        OperationKind::IntDivide,
        OperationKind::Percent,
        OperationKind::AbsDiff,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OperationKind::Add => "add",
            OperationKind::Subtract => "subtract",
            OperationKind::Multiply => "multiply",
            OperationKind::Divide => "divide",
            OperationKind::Power => "power",
            OperationKind::Root => "root",
            OperationKind::Modulus => "modulus",
            OperationKind::IntDivide => "int_divide",
            OperationKind::Percent => "percent",
            OperationKind::AbsDiff => "abs_diff",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperationKind {
    type Err = OperationError;

    /// Case-insensitive; surrounding whitespace is not trimmed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| OperationError::UnknownOperation {
                name: s.to_lowercase(),
            })
    }
}

/// A name bound to a pure binary function.
#[derive(Clone, Copy)]
pub struct OperationDescriptor {
    pub kind: OperationKind,
    pub description: &'static str,
    apply: OperationFn,
}

impl OperationDescriptor {
    pub const fn new(kind: OperationKind, description: &'static str, apply: OperationFn) -> Self {
        OperationDescriptor {
            kind,
            description,
            apply,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn execute(&self, left: f64, right: f64) -> Result<f64, OperationError> {
        (self.apply)(left, right)
    }
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("kind", &self.kind)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

const BUILTIN: [OperationDescriptor; 10] = [
    OperationDescriptor::new(OperationKind::Add, "Add two numbers", add),
    OperationDescriptor::new(OperationKind::Subtract, "Subtract b from a", subtract),
    OperationDescriptor::new(OperationKind::Multiply, "Multiply two numbers", multiply),
    OperationDescriptor::new(OperationKind::Divide, "Divide a by b", divide),
    OperationDescriptor::new(OperationKind::Power, "Raise a to the power b", power),
    OperationDescriptor::new(OperationKind::Root, "The bth root of a", root),
    OperationDescriptor::new(OperationKind::Modulus, "Remainder of a / b (sign of b)", modulus),
    OperationDescriptor::new(OperationKind::IntDivide, "Floor of a / b", int_divide),
    OperationDescriptor::new(OperationKind::Percent, "a as a percentage of b", percent),
    OperationDescriptor::new(OperationKind::AbsDiff, "Absolute difference |a - b|", abs_diff),
];

/// Name-to-operation lookup over a table fixed at construction.
#[derive(Debug, Clone)]
pub struct OperationRegistry {
    descriptors: Vec<OperationDescriptor>,
}

impl OperationRegistry {
    /// The ten built-in operations, in display order.
    pub fn builtin() -> Self {
        OperationRegistry {
            descriptors: BUILTIN.to_vec(),
        }
    }

    /// Resolve `name` case-insensitively.
    pub fn create(&self, name: &str) -> Result<&OperationDescriptor, OperationError> {
        self.descriptors
            .iter()
            .find(|d| d.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| OperationError::UnknownOperation {
                name: name.to_lowercase(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.create(name).is_ok()
    }

    /// Operation names in table order.
    pub fn available_names(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|d| d.name()).collect()
    }

    pub fn descriptors(&self) -> &[OperationDescriptor] {
        &self.descriptors
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        OperationRegistry::builtin()
    }
}

// ──────────────────────────────────────────────
// Built-in operations
// ──────────────────────────────────────────────

fn add(a: f64, b: f64) -> Result<f64, OperationError> {
    Ok(a + b)
}

fn subtract(a: f64, b: f64) -> Result<f64, OperationError> {
    Ok(a - b)
}

fn multiply(a: f64, b: f64) -> Result<f64, OperationError> {
    Ok(a * b)
}

fn divide(a: f64, b: f64) -> Result<f64, OperationError> {
    if b == 0.0 {
        return Err(OperationError::DivisionByZero {
            operation: OperationKind::Divide.name(),
        });
    }
    Ok(a / b)
}

fn power(a: f64, b: f64) -> Result<f64, OperationError> {
    let operation = OperationKind::Power.name();
    if a == 0.0 && b < 0.0 {
        return Err(OperationError::DivisionByZero { operation });
    }
    let result = a.powf(b);
    if result.is_nan() {
        return Err(OperationError::NonReal {
            operation,
            left: a,
            right: b,
        });
    }
    if result.is_infinite() {
        return Err(OperationError::Overflow { operation });
    }
    Ok(result)
}

fn root(a: f64, b: f64) -> Result<f64, OperationError> {
    let operation = OperationKind::Root.name();
    if b == 0.0 {
        return Err(OperationError::RootDegreeZero);
    }
    let result = if a < 0.0 && numeric::is_integral(b) {
        if b.rem_euclid(2.0) == 0.0 {
            return Err(OperationError::EvenRootOfNegative {
                value: a,
                degree: b,
            });
        }
        // Odd degree: real root keeps the sign of the radicand.
        -(-a).powf(1.0 / b)
    } else {
        a.powf(1.0 / b)
    };
    if result.is_nan() {
        return Err(OperationError::NonReal {
            operation,
            left: a,
            right: b,
        });
    }
    if result.is_infinite() {
        return Err(OperationError::Overflow { operation });
    }
    Ok(result)
}

fn modulus(a: f64, b: f64) -> Result<f64, OperationError> {
    if b == 0.0 {
        return Err(OperationError::DivisionByZero {
            operation: OperationKind::Modulus.name(),
        });
    }
    Ok(numeric::floored_mod(a, b))
}

fn int_divide(a: f64, b: f64) -> Result<f64, OperationError> {
    if b == 0.0 {
        return Err(OperationError::DivisionByZero {
            operation: OperationKind::IntDivide.name(),
        });
    }
    Ok(numeric::floor_div(a, b))
}

fn percent(a: f64, b: f64) -> Result<f64, OperationError> {
    if b == 0.0 {
        return Err(OperationError::DivisionByZero {
            operation: OperationKind::Percent.name(),
        });
    }
    Ok((a / b) * 100.0)
}

fn abs_diff(a: f64, b: f64) -> Result<f64, OperationError> {
    Ok((a - b).abs())
}
