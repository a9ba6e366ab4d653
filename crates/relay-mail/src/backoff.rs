use std::time::Duration;

/// Delay before retrying after the `attempt`-th failed delivery.
///
/// `base * 2^(attempt - 1)`, capped at `max`. Attempt 0 is treated as 1.
#[must_use]
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    base.checked_mul(1_u32 << exponent)
        .map_or(max, |delay| delay.min(max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 30)]
    #[case(1, 30)]
    #[case(2, 60)]
    #[case(3, 120)]
    #[case(7, 1920)]
    #[case(8, 3600)]
    #[case(40, 3600)]
    fn doubles_until_capped(#[case] attempt: u32, #[case] expected_secs: u64) {
        let delay = backoff_delay(attempt, Duration::from_secs(30), Duration::from_secs(3600));
        assert_eq!(delay, Duration::from_secs(expected_secs));
    }

    #[test]
    fn huge_base_saturates_to_max() {
        let delay = backoff_delay(32, Duration::from_secs(u64::MAX / 2), Duration::from_secs(10));
        assert_eq!(delay, Duration::from_secs(10));
    }
}
