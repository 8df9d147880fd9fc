use std::sync::LazyLock;

use prometheus::*;

static METRIC_ANALYSIS_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "vidlens_analysis_count",
        "count of the video analyses by outcome",
        &["outcome"]
    )
    .unwrap()
});

static METRIC_STAGE_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "vidlens_stage_duration",
        "duration of each analysis stage in seconds",
        &["stage"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1., 2.5, 5., 10., 30., 60.]
    )
    .unwrap()
});

static METRIC_INDEX_SIZE: LazyLock<IntGauge> = LazyLock::new(|| {
    register_int_gauge!("vidlens_index_size", "number of vectors in the similarity index").unwrap()
});

static METRIC_TREND_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "vidlens_trend_failures",
        "count of the trend fetch failures degraded to an empty summary"
    )
    .unwrap()
});

/// 记录一次分析的结果，`outcome` 为 `ok` 或 `error`
pub fn inc_analysis(outcome: &str) {
    METRIC_ANALYSIS_COUNT.with_label_values(&[outcome]).inc();
}

pub fn observe_stage(stage: &str, seconds: f64) {
    METRIC_STAGE_DURATION.with_label_values(&[stage]).observe(seconds);
}

pub fn set_index_size(size: usize) {
    METRIC_INDEX_SIZE.set(size as i64);
}

pub fn inc_trend_failure() {
    METRIC_TREND_FAILURES.inc();
}

/// 以文本格式导出所有指标
pub fn gather_text() -> anyhow::Result<String> {
    let mut buffer = String::new();
    TextEncoder::new().encode_utf8(&prometheus::gather(), &mut buffer)?;
    Ok(buffer)
}
