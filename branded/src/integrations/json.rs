//! JSON value translation for branded types.
//!
//! Per dispatched wrapper the registry stores a reader that decodes the
//! inner primitive out of a [`serde_json::Value`] and wraps it, and a writer
//! that unwraps and encodes the inner primitive. Supported inner kinds:
//! `i32`, `i64`, `u32`, `u64`, `String`.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use serde_json::Value;

use crate::errors::BrandError;
use crate::{BrandedConverter, BrandedDispatcher};

type DecodeFn = Box<dyn Fn(&Value) -> Result<Box<dyn Any + Send + Sync>, BrandError> + Send + Sync>;
type EncodeFn = Box<dyn Fn(&dyn Any) -> Result<Value, BrandError> + Send + Sync>;

struct Entry {
    decode: DecodeFn,
    encode: EncodeFn,
}

/// Registry of JSON codecs, keyed by wrapper type.
#[derive(Default)]
pub struct JsonConverterRegistry {
    entries: HashMap<TypeId, Entry>,
}

impl JsonConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a JSON value into the wrapper type `B`.
    ///
    /// An explicit JSON `null` is an [`BrandError::InvalidCast`] naming `B`,
    /// as is a value of the wrong JSON kind.
    pub fn decode<B: Any>(&self, value: &Value) -> Result<B, BrandError> {
        let entry = self
            .entries
            .get(&TypeId::of::<B>())
            .ok_or_else(BrandError::not_registered::<B>)?;
        let wrapped = (entry.decode)(value)?;
        wrapped
            .downcast::<B>()
            .map(|boxed| *boxed)
            .map_err(|_| BrandError::not_registered::<B>())
    }

    /// Unwraps the inner value of `value` and encodes it as JSON.
    pub fn encode<B: Any>(&self, value: &B) -> Result<Value, BrandError> {
        let entry = self
            .entries
            .get(&TypeId::of::<B>())
            .ok_or_else(BrandError::not_registered::<B>)?;
        (entry.encode)(value)
    }

    pub fn is_registered<B: Any>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<B>())
    }
}

impl BrandedDispatcher for JsonConverterRegistry {
    fn dispatch<B, I, C>(&mut self)
    where
        B: Clone + Send + Sync + 'static,
        I: Send + Sync + 'static,
        C: BrandedConverter<B, I> + 'static,
    {
        let decode: DecodeFn = if is_supported::<I>() {
            Box::new(|value| {
                if value.is_null() {
                    return Err(BrandError::invalid_cast::<B>("null"));
                }
                let inner = decode_inner::<I>(value)
                    .ok_or_else(|| BrandError::invalid_cast::<B>(kind_name(value)))?;
                Ok(Box::new(C::wrap(inner)) as Box<dyn Any + Send + Sync>)
            })
        } else {
            Box::new(|_| Err(BrandError::unsupported::<B, I>()))
        };

        let encode: EncodeFn = if is_supported::<I>() {
            Box::new(|any| {
                let wrapper = any
                    .downcast_ref::<B>()
                    .cloned()
                    .ok_or_else(BrandError::not_registered::<B>)?;
                encode_inner(&C::unwrap(wrapper)).ok_or_else(BrandError::unsupported::<B, I>)
            })
        } else {
            Box::new(|_| Err(BrandError::unsupported::<B, I>()))
        };

        self.entries
            .insert(TypeId::of::<B>(), Entry { decode, encode });
    }
}

fn is_supported<I: Any>() -> bool {
    let id = TypeId::of::<I>();
    id == TypeId::of::<i32>()
        || id == TypeId::of::<i64>()
        || id == TypeId::of::<u32>()
        || id == TypeId::of::<u64>()
        || id == TypeId::of::<String>()
}

fn decode_inner<I: Any>(value: &Value) -> Option<I> {
    let id = TypeId::of::<I>();
    let decoded: Box<dyn Any> = if id == TypeId::of::<i32>() {
        Box::new(i32::try_from(value.as_i64()?).ok()?)
    } else if id == TypeId::of::<i64>() {
        Box::new(value.as_i64()?)
    } else if id == TypeId::of::<u32>() {
        Box::new(u32::try_from(value.as_u64()?).ok()?)
    } else if id == TypeId::of::<u64>() {
        Box::new(value.as_u64()?)
    } else if id == TypeId::of::<String>() {
        Box::new(value.as_str()?.to_owned())
    } else {
        return None;
    };
    decoded.downcast::<I>().ok().map(|boxed| *boxed)
}

fn encode_inner<I: Any>(inner: &I) -> Option<Value> {
    let any = inner as &dyn Any;
    if let Some(v) = any.downcast_ref::<i32>() {
        Some(Value::from(*v))
    } else if let Some(v) = any.downcast_ref::<i64>() {
        Some(Value::from(*v))
    } else if let Some(v) = any.downcast_ref::<u32>() {
        Some(Value::from(*v))
    } else if let Some(v) = any.downcast_ref::<u64>() {
        Some(Value::from(*v))
    } else {
        any.downcast_ref::<String>().map(|v| Value::from(v.clone()))
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
