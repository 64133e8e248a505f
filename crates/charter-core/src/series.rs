//! TimeSeries container for indicator output.

/// A time-indexed series of values aligned index-for-index with a candle buffer.
///
/// Warm-up positions hold `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries<T> {
    values: Vec<Option<T>>,
}

impl<T> TimeSeries<T> {
    /// Creates a new empty TimeSeries.
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// A series of `len` missing values.
    pub fn empty(len: usize) -> Self {
        let mut values = Vec::with_capacity(len);
        values.resize_with(len, || None);
        Self { values }
    }

    /// Wraps already-aligned values.
    pub fn from_options(values: Vec<Option<T>>) -> Self {
        Self { values }
    }

    /// Creates a series whose first `start_index` entries are missing.
    pub fn with_offset(values: Vec<Option<T>>, start_index: usize) -> Self {
        let mut aligned = Vec::with_capacity(start_index + values.len());
        aligned.resize_with(start_index, || None);
        aligned.extend(values);
        Self { values: aligned }
    }

    /// Index of the first present value.
    pub fn start_index(&self) -> Option<usize> {
        self.values.iter().position(Option::is_some)
    }

    /// Returns the number of values in this series.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this series is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Gets the value at the given candle index, if available.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.values.get(index).and_then(|v| v.as_ref())
    }

    /// Last present value at the tail, if the tail is present.
    pub fn last(&self) -> Option<&T> {
        self.values.last().and_then(|v| v.as_ref())
    }

    /// Returns an iterator over (index, value) pairs of present values.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|val| (i, val)))
    }

    /// Returns the underlying values slice.
    pub fn values(&self) -> &[Option<T>] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Option<T>> {
        self.values
    }
}

impl<T> Default for TimeSeries<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> TimeSeries<T> {
    /// Creates a fully present series.
    pub fn from_values(values: &[T]) -> Self {
        Self {
            values: values.iter().cloned().map(Some).collect(),
        }
    }
}

impl<T> FromIterator<Option<T>> for TimeSeries<T> {
    fn from_iter<I: IntoIterator<Item = Option<T>>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
