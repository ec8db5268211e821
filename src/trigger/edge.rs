// SPDX-License-Identifier: GPL-3.0-or-later

/// Detects rising edges on a fixed number of digital lines.
///
/// Every line starts out low, so a line that is already high when the first sample is taken
/// counts as a rising edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct EdgeDetector<const N: usize> {
    previous: [bool; N],
}

impl<const N: usize> EdgeDetector<N> {
    pub(crate) fn new() -> Self {
        Self { previous: [false; N] }
    }

    /// The levels from the last call to [`update`](Self::update).
    pub(crate) fn levels(&self) -> [bool; N] {
        self.previous
    }

    /// Record a new sample of every line, returning `true` if any of them went from low to high.
    ///
    /// Multiple lines rising in the same sample still only count as one event.
    pub(crate) fn update(&mut self, levels: [bool; N]) -> bool {
        let rising = self
            .previous
            .iter()
            .zip(levels.iter())
            .any(|(previous, current)| !previous && *current);
        self.previous = levels;
        rising
    }
}

impl<const N: usize> Default for EdgeDetector<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::EdgeDetector;

    #[test]
    fn single_rising_edge() {
        let mut detector = EdgeDetector::<2>::new();
        assert!(!detector.update([false, false]));
        assert!(detector.update([true, false]));
        assert_eq!(detector.levels(), [true, false]);
    }

    #[test]
    fn held_high_fires_once() {
        let mut detector = EdgeDetector::<2>::new();
        assert!(detector.update([false, true]));
        for _ in 0..10 {
            assert!(!detector.update([false, true]));
        }
    }

    #[test]
    fn falling_edge_ignored() {
        let mut detector = EdgeDetector::<2>::new();
        detector.update([true, true]);
        assert!(!detector.update([false, true]));
        assert!(!detector.update([false, false]));
        assert!(detector.update([true, false]));
    }

    #[test]
    fn simultaneous_edges_are_one_event() {
        let mut detector = EdgeDetector::<2>::new();
        assert!(detector.update([true, true]));
        assert!(!detector.update([true, true]));
    }

    #[test]
    fn edge_on_other_line_while_one_held() {
        let mut detector = EdgeDetector::<2>::new();
        assert!(detector.update([true, false]));
        assert!(detector.update([true, true]));
        assert!(!detector.update([true, true]));
    }

    #[test]
    fn idempotent_for_repeated_samples() {
        let samples = [[false, false], [true, false], [false, true], [true, true]];
        for sample in &samples {
            let mut detector = EdgeDetector::<2>::new();
            detector.update(*sample);
            let state = detector.clone();
            assert!(!detector.update(*sample));
            assert_eq!(detector, state);
        }
    }
}
