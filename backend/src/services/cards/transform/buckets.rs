use common::model::enriched::AgeBucket;

/// Fixed-width age windows covering `0..=max` for one batch.
///
/// Windows are right-closed: `[0, w]`, `(w, 2w]`, `(2w, 3w]` and so on, with
/// as many windows as it takes to reach `max` (at least one). An age that is an
/// exact multiple of the width belongs to the lower window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binning {
    width: i64,
    max: i64,
}

impl Binning {
    /// `None` when `ages` is empty: there is no maximum to size the windows by.
    pub fn from_ages(width: i64, ages: impl IntoIterator<Item = i64>) -> Option<Self> {
        debug_assert!(width > 0);
        ages.into_iter().max().map(|max| Self {
            width,
            max: max.max(0),
        })
    }

    pub fn buckets(&self) -> Vec<AgeBucket> {
        let count = self.index(self.max) + 1;
        (0..count)
            .map(|k| AgeBucket::new(k, self.width))
            .collect()
    }

    pub fn assign(&self, days: i64) -> AgeBucket {
        AgeBucket::new(self.index(days), self.width)
    }

    fn index(&self, days: i64) -> i64 {
        let days = days.clamp(0, self.max);
        // ceil(days / width) - 1, with 0 in the first window
        ((days + self.width - 1) / self.width - 1).max(0)
    }
}
