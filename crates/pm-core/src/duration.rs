/// Formats seconds as `"H hr M min S sec"`.
///
/// Fractional seconds are truncated. Zero hours drop the hour part; zero hours
/// and minutes leave only seconds. Negative and NaN input render as `"0 sec"`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds > 0.0 {
        seconds.trunc() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours} hr {minutes} min {secs} sec")
    } else if minutes > 0 {
        format!("{minutes} min {secs} sec")
    } else {
        format!("{secs} sec")
    }
}
