/// Travel time in minutes for one track traversal.
///
/// Effective speed is the lower of the track limit and the train's own
/// maximum, floored at 5 km/h so degenerate inputs cannot blow up the
/// division. Weather and track-condition factors scale the base time,
/// a 2-minute handling buffer is added, and the result is rounded up,
/// never below 1 minute.
pub fn segment_minutes(
    distance_km: f64,
    track_speed: f64,
    train_speed: f64,
    weather: &str,
    condition: &str,
) -> i32 {
    let vmax = f64::max(5.0, f64::min(track_speed, train_speed));
    let mut base = distance_km / vmax * 60.0;
    base *= weather_factor(weather);
    base *= condition_factor(condition);
    (((base + 2.0).ceil()) as i32).max(1)
}

fn weather_factor(weather: &str) -> f64 {
    let w = weather.trim().to_lowercase();
    if w.contains("clear") || w.contains("sun") {
        1.0
    } else if w.contains("rain") {
        1.15
    } else if w.contains("fog") {
        1.25
    } else if w.contains("storm") {
        1.40
    } else {
        1.10
    }
}

fn condition_factor(condition: &str) -> f64 {
    let c = condition.trim().to_lowercase();
    if matches!(c.as_str(), "free" | "operational" | "ok") {
        1.0
    } else if c.contains("occupied") {
        1.10
    } else if c.contains("maint") || c.contains("under") {
        1.50
    } else {
        1.10
    }
}
