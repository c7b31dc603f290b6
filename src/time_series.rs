/// Speed sample taken on a timer tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSeriesPoint {
    /// Seconds since the first keystroke
    pub t: f64,
    pub wpm: f64,
}

impl TimeSeriesPoint {
    pub fn new(t: f64, wpm: f64) -> Self {
        Self { t, wpm }
    }
}

impl From<TimeSeriesPoint> for (f64, f64) {
    fn from(p: TimeSeriesPoint) -> Self {
        (p.t, p.wpm)
    }
}

/// WPM over the course of one race, fed once per second
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WpmSeries {
    points: Vec<TimeSeriesPoint>,
}

impl WpmSeries {
    pub fn push(&mut self, t: f64, wpm: f64) {
        self.points.push(TimeSeriesPoint::new(t, wpm));
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Highest sampled speed, 0 for an empty series
    pub fn peak(&self) -> f64 {
        self.points.iter().map(|p| p.wpm).fold(0.0, f64::max)
    }

    /// `(t, wpm)` pairs as the chart widget wants them
    pub fn coords(&self) -> Vec<(f64, f64)> {
        self.points.iter().copied().map(Into::into).collect()
    }
}
