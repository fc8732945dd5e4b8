use crate::db::SampleStore;
use crate::error::Result;

/// Signed percent change of the latest sample for `exchange` against the mean of
/// the samples in `[latest.ts - window, latest.ts)`.
///
/// Returns `None` when there is no sample yet, when the window holds no earlier
/// samples, or when that baseline is not positive.
pub async fn windowed_change_percent(
    store: &SampleStore,
    exchange: &str,
    window_minutes: u32,
) -> Result<Option<f64>> {
    let Some(latest) = store.latest(exchange).await? else {
        return Ok(None);
    };

    let cutoff = latest.timestamp - i64::from(window_minutes) * 60;
    let baseline = store
        .average_quote_volume(exchange, cutoff, latest.timestamp)
        .await?;

    Ok(baseline.and_then(|avg| relative_change(latest.quote_volume, avg)))
}

/// `(latest - baseline) / baseline * 100`, undefined for a non-positive baseline.
pub fn relative_change(latest: f64, baseline: f64) -> Option<f64> {
    if baseline <= 0.0 || !baseline.is_finite() {
        return None;
    }
    Some((latest - baseline) / baseline * 100.0)
}

pub fn exceeds_threshold(change_pct: f64, threshold_pct: f64) -> bool {
    change_pct.abs() >= threshold_pct
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_735_689_600;

    #[test]
    fn relative_change_sign_and_magnitude() {
        let up = relative_change(130.0, 100.0).unwrap();
        let down = relative_change(70.0, 100.0).unwrap();
        assert!((up - 30.0).abs() < 1e-9, "up={up}");
        assert!((down + 30.0).abs() < 1e-9, "down={down}");
    }

    #[test]
    fn relative_change_rejects_non_positive_baseline() {
        assert_eq!(relative_change(10.0, 0.0), None);
        assert_eq!(relative_change(10.0, -5.0), None);
    }

    #[test]
    fn threshold_is_inclusive_and_symmetric() {
        assert!(exceeds_threshold(20.0, 20.0));
        assert!(exceeds_threshold(-25.0, 20.0));
        assert!(!exceeds_threshold(19.99, 20.0));
        assert!(!exceeds_threshold(-4.0, 20.0));
    }

    #[tokio::test]
    async fn no_samples_means_no_change() {
        let store = SampleStore::in_memory().await.unwrap();
        assert_eq!(windowed_change_percent(&store, "binance", 15).await.unwrap(), None);
    }

    #[tokio::test]
    async fn single_sample_has_no_baseline() {
        let store = SampleStore::in_memory().await.unwrap();
        store.append(T0, "binance", 0.0, 1_000.0).await.unwrap();
        assert_eq!(windowed_change_percent(&store, "binance", 15).await.unwrap(), None);
    }

    #[tokio::test]
    async fn zero_baseline_means_no_change() {
        let store = SampleStore::in_memory().await.unwrap();
        store.append(T0, "okx", 0.0, 0.0).await.unwrap();
        store.append(T0 + 60, "okx", 0.0, 500.0).await.unwrap();
        assert_eq!(windowed_change_percent(&store, "okx", 15).await.unwrap(), None);
    }

    #[tokio::test]
    async fn latest_is_compared_against_trailing_mean() {
        let store = SampleStore::in_memory().await.unwrap();
        store.append(T0, "bybit", 0.0, 90.0).await.unwrap();
        store.append(T0 + 60, "bybit", 0.0, 110.0).await.unwrap();
        store.append(T0 + 120, "bybit", 0.0, 130.0).await.unwrap();

        let pct = windowed_change_percent(&store, "bybit", 15).await.unwrap().unwrap();
        assert!((pct - 30.0).abs() < 1e-9, "pct={pct}");

        store.append(T0 + 180, "bybit", 0.0, 77.0).await.unwrap();
        // baseline = mean(90, 110, 130) = 110 → (77 - 110) / 110
        let pct = windowed_change_percent(&store, "bybit", 15).await.unwrap().unwrap();
        assert!((pct + 30.0).abs() < 1e-9, "pct={pct}");
    }

    #[tokio::test]
    async fn samples_older_than_window_are_excluded() {
        let store = SampleStore::in_memory().await.unwrap();
        // Far outside a 5 minute window.
        store.append(T0, "deribit", 0.0, 1_000_000.0).await.unwrap();
        store.append(T0 + 3_000, "deribit", 0.0, 100.0).await.unwrap();
        store.append(T0 + 3_060, "deribit", 0.0, 100.0).await.unwrap();
        store.append(T0 + 3_120, "deribit", 0.0, 150.0).await.unwrap();

        let pct = windowed_change_percent(&store, "deribit", 5).await.unwrap().unwrap();
        assert!((pct - 50.0).abs() < 1e-9, "pct={pct}");
    }

    #[tokio::test]
    async fn window_start_is_inclusive() {
        let store = SampleStore::in_memory().await.unwrap();
        store.append(T0, "okx", 0.0, 200.0).await.unwrap();
        store.append(T0 + 900, "okx", 0.0, 300.0).await.unwrap();

        let pct = windowed_change_percent(&store, "okx", 15).await.unwrap().unwrap();
        assert!((pct - 50.0).abs() < 1e-9, "pct={pct}");
    }
}
