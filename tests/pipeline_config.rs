use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use roomscan_kernel::config::PipelineConfig;
use roomscan_kernel::detect::StubBackend;
use roomscan_kernel::SpeakerPipeline;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "ROOMSCAN_CONFIG",
        "ROOMSCAN_SPEAKER_WIDTH_CM",
        "ROOMSCAN_PRUNE_TIMEOUT_SECS",
        "ROOMSCAN_MODEL_PATH",
        "ROOMSCAN_LABELS_PATH",
        "ROOMSCAN_DETECT_EVERY_N",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_toml_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let toml = r#"
        [detector]
        confidence_threshold = 0.4
        iou_threshold = 0.6
        model_path = "models/speaker.onnx"
        input_size = 320

        [depth]
        window_radius = 2
        min_m = 0.3
        max_m = 8.0

        [tracker]
        merge_distance_m = 0.25
        prune_timeout_secs = 5.0

        [speaker]
        width_cm = 22.0

        [pipeline]
        detect_every_n = 3
    "#;
    file.write_all(toml.as_bytes()).expect("write config");

    std::env::set_var("ROOMSCAN_CONFIG", file.path());
    std::env::set_var("ROOMSCAN_SPEAKER_WIDTH_CM", "30");
    std::env::set_var("ROOMSCAN_DETECT_EVERY_N", "1");
    std::env::set_var("ROOMSCAN_MODEL_PATH", "/opt/models/yolo.onnx");

    let cfg = PipelineConfig::load().expect("load config");

    assert_eq!(cfg.detector.thresholds.confidence, 0.4);
    assert_eq!(cfg.detector.thresholds.iou, 0.6);
    assert_eq!(cfg.detector.input_size, 320);
    assert_eq!(cfg.detector.model_path, Some(PathBuf::from("/opt/models/yolo.onnx")));
    assert_eq!(cfg.depth.radius, 2);
    assert_eq!(cfg.depth.min_m, 0.3);
    assert_eq!(cfg.depth.max_m, 8.0);
    assert_eq!(cfg.tracker.merge_distance_m, 0.25);
    assert_eq!(cfg.tracker.prune_timeout_secs, 5.0);
    assert_eq!(cfg.speaker_width_cm, 30.0);
    assert_eq!(cfg.detect_every_n, 1);

    clear_env();
}

#[test]
fn json_config_file_is_accepted() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("temp config");
    file.write_all(br#"{"speaker": {"width_cm": 12.5}}"#)
        .expect("write config");
    std::env::set_var("ROOMSCAN_CONFIG", file.path());

    let cfg = PipelineConfig::load().expect("load config");
    assert_eq!(cfg.speaker_width_cm, 12.5);
    assert_eq!(cfg.detect_every_n, 2);

    clear_env();
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = PipelineConfig::load().expect("load config");
    assert_eq!(cfg, PipelineConfig::default());
    assert!(cfg.detector.model_path.is_none());
}

#[test]
fn rejects_invalid_env_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ROOMSCAN_PRUNE_TIMEOUT_SECS", "soon");
    let err = PipelineConfig::load().unwrap_err();
    assert!(err.to_string().contains("ROOMSCAN_PRUNE_TIMEOUT_SECS"));
    clear_env();

    std::env::set_var("ROOMSCAN_SPEAKER_WIDTH_CM", "120");
    let err = PipelineConfig::load().unwrap_err();
    assert!(err.to_string().contains("speaker width"));
    clear_env();

    std::env::set_var("ROOMSCAN_DETECT_EVERY_N", "0");
    assert!(PipelineConfig::load().is_err());
    clear_env();
}

#[test]
fn missing_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ROOMSCAN_CONFIG", "/nonexistent/roomscan.toml");
    let err = PipelineConfig::load().unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));

    clear_env();
}

#[test]
fn pipeline_picks_up_labels_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut labels = NamedTempFile::new().expect("temp labels");
    labels.write_all(b"speaker\nsubwoofer\n").expect("write labels");
    std::env::set_var("ROOMSCAN_LABELS_PATH", labels.path());

    let cfg = PipelineConfig::load().expect("load config");
    let pipeline = SpeakerPipeline::from_config(StubBackend::empty(8), &cfg).expect("pipeline");
    assert_eq!(pipeline.detector().labels(), ["speaker", "subwoofer"]);

    clear_env();
}
