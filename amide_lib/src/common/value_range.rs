/// Range of observed values, `NaN` bounds while empty.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ValueRange {
    /// Lower bound
    pub low: f64,
    /// Upper bound
    pub high: f64,
}

impl ValueRange {
    /// Constructs new, empty range.
    pub fn empty() -> ValueRange {
        ValueRange {
            low: f64::NAN,
            high: f64::NAN,
        }
    }

    /// Constructs minimal range, where all samples from an iterator
    /// are inside the range.
    pub fn from_samples<T>(iter: impl IntoIterator<Item = T>) -> ValueRange
    where
        T: Into<f64>,
    {
        let mut range = ValueRange::empty();
        for val in iter {
            range.extend(val.into());
        }
        range
    }

    pub fn is_empty(&self) -> bool {
        self.low.is_nan() || self.high.is_nan()
    }

    /// Extend the range with new value.
    /// `NaN` values are ignored.
    pub fn extend(&mut self, val: f64) {
        if val.is_nan() {
            return;
        }

        if self.is_empty() {
            self.low = val;
            self.high = val;
        }

        if val > self.high {
            self.high = val;
        }

        if val < self.low {
            self.low = val;
        }
    }

    /// Distance between bounds, zero for empty range
    pub fn span(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.high - self.low
        }
    }
}

impl Default for ValueRange {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn extends_over_samples() {
        let mut range = ValueRange::from_samples([0.0f32, 5.0, 3.0]);
        range.extend(-2.5);
        range.extend(1.0);
        assert_eq!(range, ValueRange { low: -2.5, high: 5.0 });
        assert_eq!(range.span(), 7.5);
    }

    #[test]
    fn nan_ignored() {
        let mut range = ValueRange::default();
        assert!(range.is_empty());
        assert_eq!(range.span(), 0.0);

        range.extend(f64::NAN);
        assert!(range.is_empty());

        range.extend(2.0);
        assert_eq!(range, ValueRange { low: 2.0, high: 2.0 });
        assert_eq!(range.span(), 0.0);
    }
}
