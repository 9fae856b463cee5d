/// Milliseconds in one day
pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Current UTC timestamp (milliseconds)
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Encode a non-negative integer in lowercase base36.
pub fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::with_capacity(13);
    while value > 0 {
        buf.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    buf.reverse();
    buf.into_iter().map(char::from).collect()
}

/// Generate a record id for documents created without one.
///
/// Layout: base36 millisecond timestamp followed by an 8-char random base36
/// suffix. Ids sort roughly by creation time and need no database sequence.
pub fn record_id() -> String {
    use rand::Rng;
    let ts = u64::try_from(now_millis()).unwrap_or_default();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| {
            let n: u64 = rng.gen_range(0..36);
            to_base36(n)
        })
        .collect();
    format!("{}{}", to_base36(ts), suffix)
}
