use std::collections::BTreeMap;

use crate::registry::types::ParamValue;

/// Mixed-radix key space of one registered signature.
///
/// Every parameter position maps a value to an ordinal: ints by value, bools
/// as 0/1, symbols by first-seen order at that position. The composite key is
/// only defined while every ordinal fits its range estimate; callers must
/// fall back to exact tuple comparison otherwise.
#[derive(Debug, Clone)]
pub(crate) struct KeySpace {
    ranges: Vec<u64>,
    symbols: Vec<BTreeMap<String, u64>>,
}

impl KeySpace {
    pub(crate) fn new(ranges: Vec<u64>) -> Self {
        let symbols = vec![BTreeMap::new(); ranges.len()];
        Self { ranges, symbols }
    }

    /// Ordinals for creation; interns unseen symbols.
    pub(crate) fn intern(&mut self, values: &[ParamValue]) -> Vec<u64> {
        values
            .iter()
            .enumerate()
            .map(|(position, value)| match value {
                ParamValue::Symbol(symbol) => {
                    let table = &mut self.symbols[position];
                    let next = table.len() as u64;
                    *table.entry(symbol.clone()).or_insert(next)
                }
                other => scalar_ordinal(other).unwrap_or(u64::MAX),
            })
            .collect()
    }

    /// Ordinals for lookup. `None` means some symbol was never created, so no
    /// part can carry this tuple.
    pub(crate) fn lookup(&self, values: &[ParamValue]) -> Option<Vec<u64>> {
        values
            .iter()
            .enumerate()
            .map(|(position, value)| match value {
                ParamValue::Symbol(symbol) => self.symbols.get(position)?.get(symbol).copied(),
                other => Some(scalar_ordinal(other).unwrap_or(u64::MAX)),
            })
            .collect()
    }

    pub(crate) fn encode(&self, ordinals: &[u64]) -> Option<u64> {
        encode_mixed_radix(&self.ranges, ordinals)
    }
}

fn scalar_ordinal(value: &ParamValue) -> Option<u64> {
    match value {
        ParamValue::Bool(flag) => Some(u64::from(*flag)),
        ParamValue::Int(number) => u64::try_from(*number).ok(),
        ParamValue::Symbol(_) => None,
    }
}

pub(crate) fn encode_mixed_radix(ranges: &[u64], ordinals: &[u64]) -> Option<u64> {
    if ranges.len() != ordinals.len() {
        return None;
    }

    let mut key = 0u64;
    let mut weight = 1u64;
    for (ordinal, range) in ordinals.iter().zip(ranges) {
        if ordinal >= range {
            return None;
        }
        key = key.checked_add(ordinal.checked_mul(weight)?)?;
        weight = weight.checked_mul(*range)?;
    }
    Some(key)
}
