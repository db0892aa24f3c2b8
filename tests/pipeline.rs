//! End-to-end pipeline tests.
//!
//! These drive a full frame through every stage with in-process
//! collaborators: a scripted detector, an in-memory crop store, an
//! in-memory publisher and the real display relay.

use crittercam::config::{
    ClipSettings, CropSettings, DetectionSettings, DisplaySettings, ModelSettings, PipelineConfig,
    PublishSettings,
};
use crittercam::{
    BoundingBox, Detection, DisplayRelay, Frame, FramePipeline, InMemoryCropStore,
    InMemoryPublisher, RelayState, Resolution, StubDetector, CROP_OUTPUT_SIZE,
};
use std::path::PathBuf;

/// The production-shaped configuration: clip (1266, 900, 640x640), model
/// input 300x300, threshold 0.2, pad 20, resolution 480p.
fn production_config() -> PipelineConfig {
    PipelineConfig {
        source_url: "stub://camera".to_string(),
        model: ModelSettings {
            backend: "stub".to_string(),
            artifact_path: None,
            input_width: 300,
            input_height: 300,
        },
        clip: ClipSettings {
            left: 1266,
            top: 900,
            width: 640,
            height: 640,
        },
        detection: DetectionSettings {
            threshold: 0.2,
            keep_labels: [3, 8, 12].into_iter().collect(),
            excluded_labels: [4, 9, 16].into_iter().collect(),
        },
        crop: CropSettings {
            pad: 20,
            store_dir: PathBuf::from("crops"),
        },
        display: DisplaySettings {
            resolution: "480p".to_string(),
            sink_path: PathBuf::from("/tmp/results.mjpeg"),
        },
        publish: PublishSettings {
            broker_addr: "127.0.0.1:1883".to_string(),
            topic: "things/crittercam/infer".to_string(),
            client_id: "crittercam".to_string(),
            username: None,
            password: None,
        },
    }
}

fn pipeline_with(
    cfg: &PipelineConfig,
    detector: StubDetector,
) -> (FramePipeline, InMemoryCropStore, InMemoryPublisher) {
    let store = InMemoryCropStore::new();
    let publisher = InMemoryPublisher::new();
    let relay = DisplayRelay::new(Resolution::parse(&cfg.display.resolution).unwrap()).unwrap();
    let pipeline = FramePipeline::new(
        cfg,
        Box::new(detector),
        Box::new(store.clone()),
        Box::new(publisher.clone()),
        relay,
    );
    (pipeline, store, publisher)
}

/// A raw camera frame large enough to cover the production clip region.
fn raw_camera_frame() -> Frame {
    Frame::blank(1266 + 640, 900 + 640)
}

#[test]
fn single_bird_detection_produces_crop_summary_and_preview() {
    let cfg = production_config();
    let detector = StubDetector::scripted(vec![vec![Detection::new(
        3,
        0.85,
        BoundingBox::new(100.0, 100.0, 200.0, 200.0),
    )]]);
    let (mut pipeline, store, publisher) = pipeline_with(&cfg, detector);

    let report = pipeline.process_frame(&raw_camera_frame()).unwrap();
    assert_eq!(report.kept, 1);
    assert_eq!(report.crops_exported, 1);

    // Crop export: one object, classifier-input-sized, sequence key zero.
    let objects = store.objects();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].0, "cropped_image_0.jpg");
    let crop = Frame::decode_jpeg(&objects[0].1).unwrap();
    assert_eq!(crop.width(), CROP_OUTPUT_SIZE);
    assert_eq!(crop.height(), CROP_OUTPUT_SIZE);

    // Summary: exactly {"bird": 0.85}.
    let messages = publisher.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "things/crittercam/infer");
    let payload: serde_json::Value = serde_json::from_str(&messages[0].1).unwrap();
    assert_eq!(payload.as_object().unwrap().len(), 1);
    assert!((payload["bird"].as_f64().unwrap() - 0.85).abs() < 1e-6);
}

#[test]
fn annotated_preview_differs_from_clean_frame() {
    let cfg = production_config();
    let detector = StubDetector::scripted(vec![vec![Detection::new(
        3,
        0.85,
        BoundingBox::new(100.0, 100.0, 200.0, 200.0),
    )]]);
    let (mut pipeline, store, _publisher) = pipeline_with(&cfg, detector);

    let idle_preview = pipeline.relay_mut().slot().snapshot();
    pipeline.process_frame(&raw_camera_frame()).unwrap();
    let annotated_preview = pipeline.relay_mut().slot().snapshot();

    // The relay now shows the annotated frame, not the idle canvas.
    assert_ne!(*idle_preview, *annotated_preview);

    // The crop came from the clean copy: a white frame's crop stays white,
    // with no overlay pixels. JPEG is lossy, so allow a small tolerance.
    let crop = Frame::decode_jpeg(&store.objects()[0].1).unwrap();
    for pixel in crop.as_image().pixels() {
        for channel in pixel.0 {
            assert!(
                channel > 230,
                "crop contains non-white pixels; overlay leaked into the clean copy"
            );
        }
    }
}

#[test]
fn excluded_label_is_annotated_and_summarized_but_not_cropped() {
    let mut cfg = production_config();
    // Label 4 (boat) is in both keep and excluded: overlay + summary, no crop.
    cfg.detection.keep_labels.insert(4);
    let detector = StubDetector::scripted(vec![vec![Detection::new(
        4,
        0.6,
        BoundingBox::new(50.0, 50.0, 120.0, 120.0),
    )]]);
    let (mut pipeline, store, publisher) = pipeline_with(&cfg, detector);

    let report = pipeline.process_frame(&raw_camera_frame()).unwrap();
    assert_eq!(report.kept, 1);
    assert_eq!(report.crops_exported, 0);
    assert!(store.is_empty());

    let payload: serde_json::Value =
        serde_json::from_str(&publisher.messages()[0].1).unwrap();
    assert!((payload["boat"].as_f64().unwrap() - 0.6).abs() < 1e-6);
}

#[test]
fn detection_outside_clip_bounds_produces_no_crop_and_no_panic() {
    let cfg = production_config();
    // Scaled entirely past the right edge of the 640-wide clip:
    // 310 * (640/300) = 661 > 640 even before padding.
    let detector = StubDetector::scripted(vec![vec![Detection::new(
        3,
        0.9,
        BoundingBox::new(310.0, 310.0, 320.0, 320.0),
    )]]);
    let (mut pipeline, store, publisher) = pipeline_with(&cfg, detector);

    let report = pipeline.process_frame(&raw_camera_frame()).unwrap();
    assert_eq!(report.kept, 1);
    assert_eq!(report.crops_exported, 0);
    assert!(store.is_empty());

    // Still summarized.
    let payload: serde_json::Value =
        serde_json::from_str(&publisher.messages()[0].1).unwrap();
    assert!(payload["bird"].is_number());
}

#[test]
fn same_label_twice_keeps_last_probability() {
    let cfg = production_config();
    let detector = StubDetector::scripted(vec![vec![
        Detection::new(3, 0.3, BoundingBox::new(10.0, 10.0, 50.0, 50.0)),
        Detection::new(3, 0.9, BoundingBox::new(100.0, 100.0, 200.0, 200.0)),
    ]]);
    let (mut pipeline, _store, publisher) = pipeline_with(&cfg, detector);

    pipeline.process_frame(&raw_camera_frame()).unwrap();

    let payload: serde_json::Value =
        serde_json::from_str(&publisher.messages()[0].1).unwrap();
    assert_eq!(payload.as_object().unwrap().len(), 1);
    assert!((payload["bird"].as_f64().unwrap() - 0.9).abs() < 1e-6);
}

#[test]
fn below_threshold_and_unlisted_labels_are_dropped() {
    let cfg = production_config();
    let detector = StubDetector::scripted(vec![vec![
        // At the threshold exactly: dropped (comparison is strict).
        Detection::new(3, 0.2, BoundingBox::new(10.0, 10.0, 50.0, 50.0)),
        // Person is not in the keep set.
        Detection::new(15, 0.95, BoundingBox::new(10.0, 10.0, 50.0, 50.0)),
    ]]);
    let (mut pipeline, store, publisher) = pipeline_with(&cfg, detector);

    let report = pipeline.process_frame(&raw_camera_frame()).unwrap();
    assert_eq!(report.kept, 0);
    assert!(store.is_empty());
    assert_eq!(publisher.messages()[0].1, "{}");
}

#[test]
fn successive_frames_advance_crop_sequence() {
    let cfg = production_config();
    let bird = Detection::new(3, 0.85, BoundingBox::new(100.0, 100.0, 200.0, 200.0));
    let detector = StubDetector::scripted(vec![vec![bird.clone()], vec![bird]]);
    let (mut pipeline, store, publisher) = pipeline_with(&cfg, detector);

    pipeline.process_frame(&raw_camera_frame()).unwrap();
    pipeline.process_frame(&raw_camera_frame()).unwrap();

    assert_eq!(
        store.keys(),
        vec!["cropped_image_0.jpg", "cropped_image_1.jpg"]
    );
    assert_eq!(publisher.len(), 2);
}

#[test]
fn relay_state_machine_transitions() {
    let cfg = production_config();
    let (mut pipeline, _store, _publisher) =
        pipeline_with(&cfg, StubDetector::scripted(vec![]));

    assert_eq!(pipeline.relay_mut().state(), RelayState::Idle);
    pipeline.relay_mut().spawn(std::io::sink()).unwrap();
    assert_eq!(pipeline.relay_mut().state(), RelayState::Streaming);
    pipeline.relay_mut().stop();
    assert_eq!(pipeline.relay_mut().state(), RelayState::Stopped);
}
