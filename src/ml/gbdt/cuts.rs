/// Histogram cut points for one feature.
///
/// A value lands in bin `b` where `b` counts the cuts strictly below it, so
/// `value <= cuts[s]` exactly when its bin is `<= s`. Non-finite values land
/// in bin 0, matching the left branch taken at prediction time.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct FeatureCuts {
    cuts: Vec<f64>,
}

impl FeatureCuts {
    /// Midpoints between distinct values, or quantile midpoints once there
    /// are more distinct values than `max_bin`.
    pub(super) fn build(column: impl Iterator<Item = f64>, max_bin: usize) -> Self {
        let mut distinct: Vec<f64> = column.filter(|v| v.is_finite()).collect();
        distinct.sort_by(f64::total_cmp);
        distinct.dedup();
        let m = distinct.len();
        if m < 2 {
            return Self { cuts: Vec::new() };
        }

        let mut cuts = Vec::with_capacity(m.min(max_bin) - 1);
        if m <= max_bin {
            for pair in distinct.windows(2) {
                cuts.push(midpoint(pair[0], pair[1]));
            }
        } else {
            for k in 1..max_bin {
                let idx = (k * m / max_bin).clamp(1, m - 1);
                let cut = midpoint(distinct[idx - 1], distinct[idx]);
                if cuts.last().is_none_or(|&last| cut > last) {
                    cuts.push(cut);
                }
            }
        }
        Self { cuts }
    }

    pub(super) fn bin(&self, value: f64) -> u8 {
        if !value.is_finite() {
            return 0;
        }
        self.cuts.partition_point(|&cut| cut < value) as u8
    }

    pub(super) fn n_bins(&self) -> usize {
        self.cuts.len() + 1
    }

    /// Threshold separating bins `..=split_bin` from the rest.
    pub(super) fn threshold(&self, split_bin: usize) -> f64 {
        self.cuts[split_bin]
    }
}

fn midpoint(a: f64, b: f64) -> f64 {
    a + (b - a) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn few_distinct_values_get_exact_midpoints() {
        let cuts = FeatureCuts::build([2.0, 0.0, 1.0, 1.0, 2.0].into_iter(), 256);
        assert_eq!(cuts.cuts, vec![0.5, 1.5]);
        assert_eq!(cuts.n_bins(), 3);
        assert_eq!(cuts.bin(0.0), 0);
        assert_eq!(cuts.bin(0.5), 0);
        assert_eq!(cuts.bin(1.0), 1);
        assert_eq!(cuts.bin(2.0), 2);
        assert_eq!(cuts.bin(f64::NAN), 0);
    }

    #[test]
    fn bin_agrees_with_threshold_comparison() {
        let values: Vec<f64> = (0..50).map(|i| (i * 37 % 101) as f64 * 1.5).collect();
        let cuts = FeatureCuts::build(values.iter().copied(), 8);
        assert!(cuts.n_bins() <= 8);
        for &value in &values {
            let bin = cuts.bin(value) as usize;
            for split in 0..cuts.n_bins() - 1 {
                assert_eq!(bin <= split, value <= cuts.threshold(split));
            }
        }
    }

    #[test]
    fn constant_column_has_single_bin() {
        let cuts = FeatureCuts::build([3.0, 3.0, 3.0].into_iter(), 256);
        assert_eq!(cuts.n_bins(), 1);
        assert_eq!(cuts.bin(3.0), 0);
    }
}
