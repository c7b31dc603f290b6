use typing_racer::time_series::WpmSeries;

/// X (seconds) and Y (WPM) upper bounds for the results chart
pub fn compute_chart_params(series: &WpmSeries, time_limit: u32) -> (f64, f64) {
    let overall_duration = match series.points().last() {
        Some(point) => point.t,
        None => time_limit as f64,
    }
    .max(1.0);

    let highest_wpm = series.peak().ceil().max(1.0);
    (overall_duration, highest_wpm)
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

/// Text track with the car placed at `position` percent of the way to the flag
pub fn track_line(position: f64, width: usize) -> String {
    const CAR: char = '>';
    const FLAG: char = '|';
    if width < 3 {
        return CAR.to_string();
    }
    let lane = width - 2;
    let offset = ((position.clamp(0.0, 100.0) / 100.0) * (lane - 1) as f64).round() as usize;

    let mut line = String::with_capacity(width);
    line.push_str(&"=".repeat(offset));
    line.push(CAR);
    line.push_str(&"-".repeat(lane - 1 - offset));
    line.push(' ');
    line.push(FLAG);
    line
}
