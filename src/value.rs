//! [`Value`]: a decoded tag value, independent of which [`Tag`](crate::tag::Tag) variant carried
//! it in from the file.

use crate::error::{CogTiffError, Result};

/// A decoded TIFF field value.
///
/// Scalars decode to their own variant; arrays decode to `List`. Rational numbers keep their
/// numerator/denominator pair rather than collapsing to `f64` immediately, since some callers
/// want the exact fraction (e.g. `XResolution`).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Byte(u8),
    Signed(i32),
    SignedBig(i64),
    Short(u16),
    Unsigned(u32),
    UnsignedBig(u64),
    Float(f32),
    Double(f64),
    Rational(u32, u32),
    SRational(i32, i32),
    Ascii(String),
    List(Vec<Value>),
}

impl Value {
    pub fn into_u16(self) -> Result<u16> {
        match self {
            Value::Byte(v) => Ok(v as u16),
            Value::Short(v) => Ok(v),
            Value::Unsigned(v) => Ok(v as u16),
            Value::UnsignedBig(v) => Ok(v as u16),
            Value::Signed(v) => Ok(v as u16),
            other => Err(unexpected("u16", &other)),
        }
    }

    pub fn into_u32(self) -> Result<u32> {
        match self {
            Value::Byte(v) => Ok(v as u32),
            Value::Short(v) => Ok(v as u32),
            Value::Unsigned(v) => Ok(v),
            Value::UnsignedBig(v) => Ok(v as u32),
            Value::Signed(v) => Ok(v as u32),
            other => Err(unexpected("u32", &other)),
        }
    }

    pub fn into_u64(self) -> Result<u64> {
        match self {
            Value::Byte(v) => Ok(v as u64),
            Value::Short(v) => Ok(v as u64),
            Value::Unsigned(v) => Ok(v as u64),
            Value::UnsignedBig(v) => Ok(v),
            Value::Signed(v) => Ok(v as u64),
            Value::SignedBig(v) => Ok(v as u64),
            other => Err(unexpected("u64", &other)),
        }
    }

    pub fn into_f64(self) -> Result<f64> {
        match self {
            Value::Float(v) => Ok(v as f64),
            Value::Double(v) => Ok(v),
            Value::Rational(n, d) => Ok(n as f64 / d as f64),
            Value::SRational(n, d) => Ok(n as f64 / d as f64),
            Value::Byte(v) => Ok(v as f64),
            Value::Short(v) => Ok(v as f64),
            Value::Unsigned(v) => Ok(v as f64),
            other => Err(unexpected("f64", &other)),
        }
    }

    pub fn into_string(self) -> Result<String> {
        match self {
            Value::Ascii(s) => Ok(s),
            other => Err(unexpected("Ascii", &other)),
        }
    }

    pub fn into_list(self) -> Result<Vec<Value>> {
        match self {
            Value::List(v) => Ok(v),
            // A single scalar is a length-1 array for callers that always want a Vec.
            other => Ok(vec![other]),
        }
    }

    pub fn into_u32_vec(self) -> Result<Vec<u32>> {
        self.into_list()?.into_iter().map(Value::into_u32).collect()
    }

    pub fn into_u64_vec(self) -> Result<Vec<u64>> {
        self.into_list()?.into_iter().map(Value::into_u64).collect()
    }

    pub fn into_u16_vec(self) -> Result<Vec<u16>> {
        self.into_list()?.into_iter().map(Value::into_u16).collect()
    }

    pub fn into_f64_vec(self) -> Result<Vec<f64>> {
        self.into_list()?.into_iter().map(Value::into_f64).collect()
    }
}

fn unexpected(want: &str, got: &Value) -> CogTiffError {
    CogTiffError::General(format!("expected {want}-convertible value, got {got:?}"))
}
