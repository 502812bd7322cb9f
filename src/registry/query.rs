use std::{fmt, sync::Arc};

use crate::registry::types::{ParamType, ParamValue, Part};

pub type ValuePredicate = Arc<dyn Fn(&ParamValue) -> bool + Send + Sync>;

#[derive(Clone)]
pub enum ParamMatcher {
    Any,
    Exact(ParamValue),
    Where(ValuePredicate),
}

impl ParamMatcher {
    pub fn predicate(predicate: impl Fn(&ParamValue) -> bool + Send + Sync + 'static) -> Self {
        Self::Where(Arc::new(predicate))
    }

    pub fn matches(&self, value: &ParamValue) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == value,
            Self::Where(predicate) => predicate(value),
        }
    }
}

impl fmt::Debug for ParamMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Exact(value) => f.debug_tuple("Exact").field(value).finish(),
            Self::Where(_) => f.write_str("Where(..)"),
        }
    }
}

/// Lookup request against one part kind.
///
/// Concrete values replay the creation key; matchers force a creation-order
/// scan applied positionally.
#[derive(Debug, Clone, Default)]
pub struct PartQuery {
    pub(crate) signature: Option<Vec<ParamType>>,
    pub(crate) values: Option<Vec<ParamValue>>,
    pub(crate) matchers: Vec<(usize, ParamMatcher)>,
}

impl PartQuery {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_values<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        Self {
            values: Some(values.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn with_signature(mut self, param_types: Vec<ParamType>) -> Self {
        self.signature = Some(param_types);
        self
    }

    pub fn at(mut self, index: usize, matcher: ParamMatcher) -> Self {
        self.matchers.push((index, matcher));
        self
    }

    /// Positional matchers, one per parameter starting at index 0.
    pub fn matching(mut self, matchers: Vec<ParamMatcher>) -> Self {
        self.matchers.extend(matchers.into_iter().enumerate());
        self
    }

    pub fn is_exact(&self) -> bool {
        self.values.is_some() && self.matchers.is_empty()
    }

    pub(crate) fn accepts(&self, part: &Part, part_types: &[ParamType]) -> bool {
        if let Some(signature) = self.signature.as_ref()
            && signature.as_slice() != part_types
        {
            return false;
        }
        if let Some(values) = self.values.as_ref()
            && values != &part.values
        {
            return false;
        }
        self.matchers.iter().all(|(index, matcher)| {
            part.values
                .get(*index)
                .is_some_and(|value| matcher.matches(value))
        })
    }
}
