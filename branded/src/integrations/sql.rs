//! Relational value translation for branded types.
//!
//! A driver-neutral shim: on read the registry wraps the driver-native
//! value, on write it unwraps and hands back the inner value, optionally
//! tagged with fixed-length/ANSI string hints declared separately per
//! wrapper type.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::errors::BrandError;
use crate::{BrandedConverter, BrandedDispatcher};

/// Driver-neutral representation of a column or parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Int(i64),
    UInt(u64),
    Text(String),
}

/// Storage hints for string-valued wrapper types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StringHint {
    pub length: Option<usize>,
    pub ansi: bool,
}

impl StringHint {
    /// Variable-length ANSI string.
    pub fn ansi() -> Self {
        Self { length: None, ansi: true }
    }

    /// Fixed-length string.
    pub fn fixed(length: usize) -> Self {
        Self {
            length: Some(length),
            ansi: false,
        }
    }

    /// Fixed-length ANSI string.
    pub fn fixed_ansi(length: usize) -> Self {
        Self {
            length: Some(length),
            ansi: true,
        }
    }
}

/// A value on its way to the driver, with any applicable string hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlParameter {
    pub value: SqlValue,
    pub hint: Option<StringHint>,
}

type ReadFn = Box<dyn Fn(SqlValue) -> Result<Box<dyn Any + Send + Sync>, BrandError> + Send + Sync>;
type WriteFn = Box<dyn Fn(&dyn Any) -> Result<SqlValue, BrandError> + Send + Sync>;

struct Entry {
    read: ReadFn,
    write: WriteFn,
}

/// Registry of bidirectional value translators, keyed by wrapper type.
#[derive(Default)]
pub struct SqlTranslatorRegistry {
    entries: HashMap<TypeId, Entry>,
    hints: HashMap<TypeId, StringHint>,
}

impl SqlTranslatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares storage hints for a string-valued wrapper type. Hints are
    /// attached to written parameters whose value is text.
    pub fn register_string_hint<B: Any>(&mut self, hint: StringHint) {
        self.hints.insert(TypeId::of::<B>(), hint);
    }

    /// Wraps a driver-native value into the wrapper type `B`.
    pub fn read<B: Any>(&self, value: SqlValue) -> Result<B, BrandError> {
        let entry = self
            .entries
            .get(&TypeId::of::<B>())
            .ok_or_else(BrandError::not_registered::<B>)?;
        let wrapped = (entry.read)(value)?;
        wrapped
            .downcast::<B>()
            .map(|boxed| *boxed)
            .map_err(|_| BrandError::not_registered::<B>())
    }

    /// Unwraps `value` into a driver-bound parameter.
    pub fn write<B: Any>(&self, value: &B) -> Result<SqlParameter, BrandError> {
        let entry = self
            .entries
            .get(&TypeId::of::<B>())
            .ok_or_else(BrandError::not_registered::<B>)?;
        let value = (entry.write)(value)?;
        let hint = match value {
            SqlValue::Text(_) => self.hints.get(&TypeId::of::<B>()).copied(),
            _ => None,
        };
        Ok(SqlParameter { value, hint })
    }

    pub fn is_registered<B: Any>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<B>())
    }
}

impl BrandedDispatcher for SqlTranslatorRegistry {
    fn dispatch<B, I, C>(&mut self)
    where
        B: Clone + Send + Sync + 'static,
        I: Send + Sync + 'static,
        C: BrandedConverter<B, I> + 'static,
    {
        let read: ReadFn = Box::new(|value| {
            let found = kind_name(&value);
            let inner =
                decode_inner::<I>(value).ok_or_else(|| BrandError::invalid_cast::<B>(found))?;
            Ok(Box::new(C::wrap(inner)) as Box<dyn Any + Send + Sync>)
        });

        let write: WriteFn = Box::new(|any| {
            let wrapper = any
                .downcast_ref::<B>()
                .cloned()
                .ok_or_else(BrandError::not_registered::<B>)?;
            encode_inner(&C::unwrap(wrapper)).ok_or_else(BrandError::unsupported::<B, I>)
        });

        self.entries
            .insert(TypeId::of::<B>(), Entry { read, write });
    }
}

fn decode_inner<I: Any>(value: SqlValue) -> Option<I> {
    let id = TypeId::of::<I>();
    let decoded: Box<dyn Any> = match value {
        SqlValue::Int(v) if id == TypeId::of::<i64>() => Box::new(v),
        SqlValue::Int(v) if id == TypeId::of::<i32>() => Box::new(i32::try_from(v).ok()?),
        SqlValue::UInt(v) if id == TypeId::of::<u64>() => Box::new(v),
        SqlValue::UInt(v) if id == TypeId::of::<u32>() => Box::new(u32::try_from(v).ok()?),
        SqlValue::Text(v) if id == TypeId::of::<String>() => Box::new(v),
        _ => return None,
    };
    decoded.downcast::<I>().ok().map(|boxed| *boxed)
}

fn encode_inner<I: Any>(inner: &I) -> Option<SqlValue> {
    let any = inner as &dyn Any;
    if let Some(v) = any.downcast_ref::<i32>() {
        Some(SqlValue::Int(i64::from(*v)))
    } else if let Some(v) = any.downcast_ref::<i64>() {
        Some(SqlValue::Int(*v))
    } else if let Some(v) = any.downcast_ref::<u32>() {
        Some(SqlValue::UInt(u64::from(*v)))
    } else if let Some(v) = any.downcast_ref::<u64>() {
        Some(SqlValue::UInt(*v))
    } else {
        any.downcast_ref::<String>()
            .map(|v| SqlValue::Text(v.clone()))
    }
}

fn kind_name(value: &SqlValue) -> &'static str {
    match value {
        SqlValue::Int(_) => "a signed integer",
        SqlValue::UInt(_) => "an unsigned integer",
        SqlValue::Text(_) => "text",
    }
}
