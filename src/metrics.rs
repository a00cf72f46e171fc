use std::sync::LazyLock;

use prometheus::*;

static METRIC_IMAGES_ADDED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("clip_images_added", "count of the images added to the tensor store")
        .unwrap()
});

static METRIC_SEARCH_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("clip_search_count", "count of the text searches", &["size"]).unwrap()
});

static METRIC_SEARCH_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "clip_search_duration",
        "duration of the batched forward pass in seconds",
        &["size"]
    )
    .unwrap()
});

static METRIC_SEARCH_MAX_SCORE: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "clip_search_max_score",
        "max score of the per-query search",
        &["size"],
        (5..=100).step_by(5).map(|x| x as f64).collect()
    )
    .unwrap()
});

/// 增加已添加图片计数
pub fn inc_images_added(count: usize) {
    METRIC_IMAGES_ADDED.inc_by(count as u64);
}

/// 记录一次搜索的耗时与最高分
pub fn observe_search(store_size: usize, duration: f32, max_score: f32) {
    let size = to_fixed_size(store_size);

    METRIC_SEARCH_COUNT.with_label_values(&[size]).inc();
    METRIC_SEARCH_DURATION.with_label_values(&[size]).observe(duration as f64);
    METRIC_SEARCH_MAX_SCORE.with_label_values(&[size]).observe(max_score as f64);
}

/// 将张量库大小调整到几个固定区间
fn to_fixed_size(count: usize) -> &'static str {
    if count <= 100 {
        "100"
    } else if count <= 1000 {
        "1000"
    } else if count <= 10000 {
        "10000"
    } else {
        "10000+"
    }
}
