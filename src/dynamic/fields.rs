//! Field-number-keyed storage for a [`super::DynamicMessage`]'s fields.
//!
//! Backed by a `BTreeMap` so iteration is always ascending by field number, which is what
//! the binary serializer's determinism guarantee relies on.
use std::collections::BTreeMap;

use super::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FieldStorage {
    fields: BTreeMap<u32, Value>,
}

impl FieldStorage {
    pub(crate) fn has(&self, number: u32) -> bool {
        self.fields.contains_key(&number)
    }

    pub(crate) fn get(&self, number: u32) -> Option<&Value> {
        self.fields.get(&number)
    }

    pub(crate) fn get_mut(&mut self, number: u32) -> Option<&mut Value> {
        self.fields.get_mut(&number)
    }

    pub(crate) fn set(&mut self, number: u32, value: Value) {
        self.fields.insert(number, value);
    }

    pub(crate) fn clear(&mut self, number: u32) {
        self.fields.remove(&number);
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (u32, &Value)> {
        self.fields.iter().map(|(n, v)| (*n, v))
    }
}
