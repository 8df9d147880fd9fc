mod common;

use std::path::Path;
use std::sync::Arc;

use rstest::*;
use vidlens::Error;
use vidlens::media::{FrameSampler, VideoDecoder, sample_timestamps};

use common::*;

#[rstest]
#[case(10., 10)]
#[case(10., 2)]
#[case(3.7, 7)]
#[case(0.04, 25)]
#[case(3600., 100)]
fn timestamps_span_the_video(#[case] duration: f64, #[case] n: usize) {
    let ts = sample_timestamps(duration, n);
    assert_eq!(ts.len(), n);
    assert_eq!(ts[0], 0.);
    assert_eq!(*ts.last().unwrap(), duration);
    assert!(ts.windows(2).all(|w| w[0] <= w[1]));
    assert!(ts.iter().all(|&t| (0. ..=duration).contains(&t)));
}

#[test]
fn single_frame_is_taken_at_start() {
    assert_eq!(sample_timestamps(42., 1), vec![0.]);
    assert!(sample_timestamps(42., 0).is_empty());
}

#[test]
fn timestamps_are_linear() {
    assert_eq!(sample_timestamps(10., 5), vec![0., 2.5, 5., 7.5, 10.]);
}

#[tokio::test]
async fn sampler_requests_frames_in_order() {
    let decoder = Arc::new(FakeDecoder::new(8.));
    let sampler = FrameSampler::new(decoder.clone(), 5);
    let meta = decoder.probe(Path::new("v.mp4")).await.unwrap();
    let frames = sampler.sample(Path::new("v.mp4"), &meta).await.unwrap();

    let timestamps: Vec<f64> = frames.iter().map(|f| f.timestamp).collect();
    assert_eq!(timestamps, vec![0., 2., 4., 6., 8.]);
    assert_eq!(*decoder.requested.lock().unwrap(), timestamps);
    assert!(frames.iter().all(|f| f.image.dimensions() == (4, 2)));
}

#[tokio::test]
async fn sampler_rejects_zero_count() {
    let sampler = FrameSampler::new(Arc::new(FakeDecoder::new(8.)), 0);
    let err = sampler.sample(Path::new("v.mp4"), &metadata(8.)).await.unwrap_err();
    assert!(err.is_validation());
}

#[rstest]
#[case(0.)]
#[case(-1.)]
#[case(f64::NAN)]
#[tokio::test]
async fn sampler_rejects_invalid_duration(#[case] duration: f64) {
    let decoder = Arc::new(FakeDecoder::new(duration));
    let sampler = FrameSampler::new(decoder.clone(), 3);
    let err = sampler.sample(Path::new("v.mp4"), &metadata(duration)).await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
    assert!(decoder.requested.lock().unwrap().is_empty());
}
