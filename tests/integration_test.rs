//! Integration tests: config, record parsing, window features, labeling,
//! classifiers and sinks.

use l4s_ids::{
    collectors::{CaptureLayout, EcnCodepoint, ObservationAdapter, PacketObservation},
    config::{AlertFormat, IdsConfig, Mode},
    features::{FeatureDeriver, FeatureVector, RollingHistory, WindowRotator, WindowSnapshot},
    labeling::{Label, LabelAssigner},
    model::{load_classifier, ClassificationResult, Classifier, TreeClassifier},
    pipeline::{RunSummary, Stage, WindowOutcome, WindowProcessor},
    queue::{NoQueueStats, QueueStats, CLASSIC_QUEUE_DELAY_MS, L4S_QUEUE_DELAY_MS},
    storage::{read_dataset, AlertSink, AlertStore, DatasetWriter},
    IdsError,
};
use std::io::Write;
use std::net::IpAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

const ATTACKER: &str = "192.168.54.10";

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn name(&self) -> &str {
        "failing"
    }

    fn classify(&self, _features: &FeatureVector) -> l4s_ids::Result<Label> {
        Err(IdsError::Classify("backend unavailable".into()))
    }
}

fn obs(frame_len: u64, ecn: EcnCodepoint) -> PacketObservation {
    PacketObservation {
        ts: 1.0,
        frame_len,
        ecn,
        ..Default::default()
    }
}

fn rtt_window(rtt_ms: f64) -> WindowSnapshot {
    WindowSnapshot {
        packet_count: 1,
        total_bytes: 100,
        packet_sizes: vec![100],
        arrival_times: vec![0.0],
        rtt_samples: vec![rtt_ms],
        ..Default::default()
    }
}

/// Root splits on `ratio_ce <= 0.25`: benign to the left, attack to the right.
fn ce_tree_json() -> String {
    serde_json::json!({
        "feature_names": l4s_ids::features::DETECTOR_FEATURES,
        "classes": [0, 1],
        "children_left": [1, -1, -1],
        "children_right": [2, -1, -1],
        "feature": [2, -2, -2],
        "threshold": [0.25, -2.0, -2.0],
        "value": [[[5.0, 5.0]], [[10.0, 0.0]], [[0.0, 10.0]]]
    })
    .to_string()
}

fn ce_tree() -> TreeClassifier {
    TreeClassifier::from_json(&ce_tree_json(), Path::new("tree.json")).unwrap()
}

#[test]
fn config_load_default() {
    let c = IdsConfig::load(Path::new("nonexistent.json")).unwrap();
    assert_eq!(c.mode, Mode::Collect);
    assert_eq!(c.window.interval_secs, 1.0);
    assert_eq!(c.window.history_capacity, 10);
    assert_eq!(c.labeling.attack_byte_share, 0.10);
    assert_eq!(c.labeling.attacker_addrs, vec![ATTACKER.parse::<IpAddr>().unwrap()]);
    assert_eq!(c.capture_layout(), CaptureLayout::Collector);
}

#[test]
fn config_partial_file_and_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    std::fs::write(&path, r#"{ "mode": "detect", "window": { "interval_secs": 0.5 } }"#).unwrap();
    let c = IdsConfig::load(&path).unwrap();
    assert_eq!(c.mode, Mode::Detect);
    assert_eq!(c.window.interval_secs, 0.5);
    assert_eq!(c.window.history_capacity, 10);
    assert_eq!(c.capture_layout(), CaptureLayout::Detector);

    // Zero, below one nanosecond, or beyond what a Duration holds.
    for secs in ["0", "1e-10", "1e30", "-1"] {
        std::fs::write(&path, format!(r#"{{ "window": {{ "interval_secs": {} }} }}"#, secs)).unwrap();
        assert!(matches!(IdsConfig::load(&path), Err(IdsError::Config(_))), "{}", secs);
    }

    std::fs::write(&path, r#"{ "labeling": { "attack_byte_share": 1.5 } }"#).unwrap();
    assert!(matches!(IdsConfig::load(&path), Err(IdsError::Config(_))));

    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(IdsConfig::load(&path), Err(IdsError::Config(_))));
}

#[test]
fn mode_names() {
    assert_eq!("collector".parse::<Mode>().unwrap(), Mode::Collect);
    assert_eq!("DETECT".parse::<Mode>().unwrap(), Mode::Detect);
    assert!("sniff".parse::<Mode>().is_err());
}

#[test]
fn adapter_parses_collector_record() {
    let adapter = ObservationAdapter::new(CaptureLayout::Collector);
    let o = adapter
        .adapt("1700000000.250,192.168.54.10,1514,1448,0.012,3,1")
        .unwrap();
    assert_eq!(o.ts, 1700000000.25);
    assert_eq!(o.src, Some(ATTACKER.parse().unwrap()));
    assert_eq!(o.frame_len, 1514);
    assert_eq!(o.payload_len, 1448);
    assert!((o.rtt_ms.unwrap() - 12.0).abs() < 1e-9);
    assert_eq!(o.ecn, EcnCodepoint::Ce);
    assert!(o.retransmission);
    assert_eq!(adapter.accepted(), 1);
}

#[test]
fn adapter_empty_fields_are_missing_not_errors() {
    let adapter = ObservationAdapter::new(CaptureLayout::Collector);
    let o = adapter.adapt("1700000000.0,,60,,,,").unwrap();
    assert_eq!(o.src, None);
    assert_eq!(o.payload_len, 0);
    assert_eq!(o.rtt_ms, None);
    assert_eq!(o.ecn, EcnCodepoint::NotEct);
    assert!(!o.retransmission);

    // Zero RTT is not a sample.
    let o = adapter.adapt("1700000000.0,10.0.0.1,60,0,0,1,").unwrap();
    assert_eq!(o.rtt_ms, None);
    assert_eq!(o.ecn, EcnCodepoint::Ect1);
}

#[test]
fn adapter_discards_malformed_records() {
    let adapter = ObservationAdapter::new(CaptureLayout::Collector);
    assert!(adapter.adapt("not-a-time,10.0.0.1,60,0,,1,").is_none());
    assert!(adapter.adapt("1.0,10.0.0.1,60").is_none());
    assert!(adapter.adapt("1.0,not-an-ip,60,0,,1,").is_none());
    assert!(adapter.adapt("1.0,10.0.0.1,sixty,0,,1,").is_none());
    assert!(adapter.adapt("").is_none());
    assert_eq!(adapter.discarded(), 4);
    assert_eq!(adapter.accepted(), 0);
}

#[test]
fn adapter_parses_detector_record() {
    let adapter = ObservationAdapter::new(CaptureLayout::Detector);
    let o = adapter.adapt("12.5,1200,0x01,1,502").unwrap();
    assert_eq!(o.frame_len, 1200);
    assert_eq!(o.ecn, EcnCodepoint::Ect1);
    assert!(o.cwr);
    assert_eq!(o.window_size, Some(502));

    let o = adapter.adapt("12.6,80,2,0,").unwrap();
    assert_eq!(o.ecn, EcnCodepoint::Ect0);
    assert!(!o.cwr);
    assert_eq!(o.window_size, None);
}

#[test]
fn ecn_counts_and_ratios() {
    let rotator = WindowRotator::new(std::iter::empty());
    for ecn in [EcnCodepoint::Ect1, EcnCodepoint::Ect1, EcnCodepoint::Ce, EcnCodepoint::NotEct] {
        rotator.record(&obs(100, ecn));
    }
    let snapshot = rotator.rotate();
    let mut history = RollingHistory::default();
    let f = FeatureDeriver::new(1.0)
        .derive(&snapshot, &mut history, &QueueStats::default())
        .unwrap();

    assert_eq!(f.ect1_count, 2);
    assert_eq!(f.ce_count, 1);
    assert_eq!(f.ratio_ect1, 0.5);
    assert_eq!(f.ratio_ce, 0.25);
    assert_eq!(f.ce_mark_rate, 1.0);
    for ratio in [f.ratio_ect1, f.ratio_ce, f.ratio_cwr, f.retransmission_rate] {
        assert!((0.0..=1.0).contains(&ratio));
    }
}

#[test]
fn throughput_and_packet_stats() {
    let snapshot = WindowSnapshot {
        packet_count: 3,
        total_bytes: 3000,
        useful_bytes: 1500,
        packet_sizes: vec![1000, 1000, 1000],
        arrival_times: vec![0.5, 0.0, 0.25],
        window_sizes: vec![100, 300],
        ..Default::default()
    };
    let mut history = RollingHistory::default();
    let f = FeatureDeriver::new(1.0)
        .derive(&snapshot, &mut history, &QueueStats::default())
        .unwrap();

    assert_eq!(f.throughput_bps, 24000.0);
    assert_eq!(f.goodput_bps, 12000.0);
    assert_eq!(f.packet_rate_pps, 3.0);
    assert_eq!(f.packet_size_mean, 1000.0);
    assert_eq!(f.packet_size_std, 0.0);
    // Gaps are taken over sorted arrival times: 0.25, 0.25.
    assert_eq!(f.iat_mean, 0.25);
    assert_eq!(f.jitter_ms, 0.0);
    assert_eq!(f.tcp_win_mean, 200.0);
    // Single window in history: burstiness is 1.
    assert_eq!(f.burstiness, 1.0);
    assert_eq!(f.rtt_mean, 0.0);
}

#[test]
fn empty_window_is_skipped() {
    let mut history = RollingHistory::default();
    history.push(5.0, 1000.0);
    let out = FeatureDeriver::new(1.0).derive(&WindowSnapshot::default(), &mut history, &QueueStats::default());
    assert!(out.is_none());
    assert_eq!(history.len(), 1);
    assert_eq!(history.last_rtt(), Some(5.0));
}

#[test]
fn rolling_rtt_trend() {
    let deriver = FeatureDeriver::new(1.0);
    let mut history = RollingHistory::new(10);
    let mut last = None;
    for rtt in [10.0, 12.0, 14.0, 16.0, 18.0] {
        last = deriver.derive(&rtt_window(rtt), &mut history, &QueueStats::default());
    }
    let f = last.unwrap();
    assert!((f.rolling_slope_rtt - 2.0).abs() < 1e-9);
    assert!((f.rolling_mean_rtt - 14.0).abs() < 1e-9);
    assert!((f.rtt_gradient - 2.0).abs() < 1e-9);

    // First window: no previous value, no slope yet.
    let mut fresh = RollingHistory::new(10);
    let first = deriver.derive(&rtt_window(10.0), &mut fresh, &QueueStats::default()).unwrap();
    assert_eq!(first.rtt_gradient, 0.0);
    assert_eq!(first.rolling_slope_rtt, 0.0);

    // A slope needs four points of history.
    let mut short = RollingHistory::new(10);
    let slopes: Vec<f64> = [10.0, 12.0, 14.0, 16.0]
        .into_iter()
        .map(|rtt| {
            deriver
                .derive(&rtt_window(rtt), &mut short, &QueueStats::default())
                .unwrap()
                .rolling_slope_rtt
        })
        .collect();
    assert_eq!(&slopes[..3], &[0.0, 0.0, 0.0]);
    assert!((slopes[3] - 2.0).abs() < 1e-9);
}

#[test]
fn history_is_bounded() {
    let deriver = FeatureDeriver::new(1.0);
    let mut history = RollingHistory::new(3);
    for rtt in [1.0, 2.0, 3.0, 4.0, 5.0] {
        deriver.derive(&rtt_window(rtt), &mut history, &QueueStats::default());
    }
    assert_eq!(history.len(), 3);
    assert_eq!(history.rtt_series(), vec![3.0, 4.0, 5.0]);
}

#[test]
fn queue_stats_merge_into_features() {
    let stats = QueueStats::parse("# tc dualpi2\nl4s_queue_delay_ms=0.8\nclassic_queue_delay_ms 12.5\nbogus=abc\n");
    assert_eq!(stats.get(L4S_QUEUE_DELAY_MS), 0.8);
    assert_eq!(stats.get(CLASSIC_QUEUE_DELAY_MS), 12.5);
    assert_eq!(stats.get("bogus"), 0.0);

    let mut history = RollingHistory::default();
    let f = FeatureDeriver::new(1.0).derive(&rtt_window(1.0), &mut history, &stats).unwrap();
    assert_eq!(f.l4s_queue_delay_ms, 0.8);
    assert_eq!(f.classic_queue_delay_ms, 12.5);
}

#[test]
fn label_threshold_is_strict() {
    let assigner = LabelAssigner::default();
    let mut snapshot = WindowSnapshot {
        packet_count: 2,
        total_bytes: 1000,
        attacker_bytes: 101,
        ..Default::default()
    };
    assert_eq!(assigner.assign(&snapshot), Label::Attack);
    snapshot.attacker_bytes = 100;
    assert_eq!(assigner.assign(&snapshot), Label::Benign);
    assert_eq!(Label::Attack.to_string(), "1");
}

#[test]
fn rotator_attributes_attacker_bytes() {
    let attacker: IpAddr = ATTACKER.parse().unwrap();
    let rotator = WindowRotator::new([attacker]);
    let mut from_attacker = obs(900, EcnCodepoint::Ect1);
    from_attacker.src = Some(attacker);
    let mut from_other = obs(100, EcnCodepoint::Ect1);
    from_other.src = Some("10.0.0.7".parse().unwrap());
    rotator.record(&from_attacker);
    rotator.record(&from_other);

    let snapshot = rotator.rotate();
    assert_eq!(snapshot.total_bytes, 1000);
    assert_eq!(snapshot.attacker_bytes, 900);
    assert_eq!(LabelAssigner::default().assign(&snapshot), Label::Attack);

    // Next window starts empty.
    assert!(rotator.rotate().is_empty());
    assert_eq!(rotator.rotations(), 2);
}

#[test]
fn dataset_appends_with_single_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("dataset.csv");
    let f = FeatureVector {
        throughput_bps: 24000.0,
        ratio_ce: 0.25,
        cwr_count: 3,
        ..Default::default()
    };

    let mut writer = DatasetWriter::open(&path).unwrap();
    writer.append(Label::Attack, &f).unwrap();
    writer.append(Label::Benign, &f).unwrap();
    assert_eq!(writer.rows_written(), 2);
    drop(writer);

    let mut writer = DatasetWriter::open(&path).unwrap();
    writer.append(Label::Benign, &f).unwrap();
    drop(writer);

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.matches("timestamp,label,").count(), 1);
    assert!(text.starts_with("timestamp,label,throughput_bps,goodput_bps,"));
    assert!(text.lines().next().unwrap().ends_with("l4s_queue_delay_ms,classic_queue_delay_ms"));

    let rows = read_dataset(&path).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].label(), Some(Label::Attack));
    assert_eq!(rows[1].label(), Some(Label::Benign));
    assert_eq!(rows[2].features(), f);
}

#[test]
fn dataset_floats_survive_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dataset.csv");
    let f = FeatureVector {
        ratio_ce: 0.1 + 0.2,
        ratio_ect1: 1.0 / 3.0,
        jitter_ms: 0.000123456789,
        iat_mean: 1e-7 / 3.0,
        throughput_bps: 123456789.0 / 7.0,
        ..Default::default()
    };
    let mut writer = DatasetWriter::open(&path).unwrap();
    writer.append(Label::Benign, &f).unwrap();
    drop(writer);

    let back = read_dataset(&path).unwrap()[0].features();
    for (a, b) in [
        (back.ratio_ce, f.ratio_ce),
        (back.ratio_ect1, f.ratio_ect1),
        (back.jitter_ms, f.jitter_ms),
        (back.iat_mean, f.iat_mean),
        (back.throughput_bps, f.throughput_bps),
    ] {
        assert_eq!(a.to_bits(), b.to_bits(), "{} != {}", a, b);
    }
}

#[test]
fn tree_classifier_predicts() {
    let tree = ce_tree();
    assert_eq!(tree.node_count(), 3);
    let quiet = FeatureVector { ratio_ce: 0.05, ..Default::default() };
    let marked = FeatureVector { ratio_ce: 0.4, ..Default::default() };
    let edge = FeatureVector { ratio_ce: 0.25, ..Default::default() };
    assert_eq!(tree.classify(&quiet).unwrap(), Label::Benign);
    assert_eq!(tree.classify(&marked).unwrap(), Label::Attack);
    assert_eq!(tree.classify(&edge).unwrap(), Label::Benign);
}

#[test]
fn tree_classifier_maps_feature_names() {
    // Export trained on a different column order: column 0 is ratio_ce.
    let json = serde_json::json!({
        "feature_names": ["ratio_ce", "flow_throughput_bps"],
        "children_left": [1, -1, -1],
        "children_right": [2, -1, -1],
        "feature": [0, -2, -2],
        "threshold": [0.1, -2.0, -2.0],
        "value": [[0.5, 0.5], [1.0, 0.0], [0.0, 1.0]]
    })
    .to_string();
    let tree = TreeClassifier::from_json(&json, Path::new("tree.json")).unwrap();
    let marked = FeatureVector { ratio_ce: 0.9, throughput_bps: 0.0, ..Default::default() };
    assert_eq!(tree.classify(&marked).unwrap(), Label::Attack);
}

#[test]
fn tree_classifier_rejects_bad_exports() {
    let cyclic = serde_json::json!({
        "children_left": [0, -1], "children_right": [1, -1],
        "feature": [0, -2], "threshold": [1.0, -2.0],
        "value": [[1.0, 0.0], [0.0, 1.0]]
    })
    .to_string();
    let unknown_feature = serde_json::json!({
        "feature_names": ["queue_depth"],
        "children_left": [1, -1, -1], "children_right": [2, -1, -1],
        "feature": [0, -2, -2], "threshold": [1.0, -2.0, -2.0],
        "value": [[1.0, 0.0], [1.0, 0.0], [0.0, 1.0]]
    })
    .to_string();
    let ragged = serde_json::json!({
        "children_left": [-1], "children_right": [-1, -1],
        "feature": [-2], "threshold": [-2.0], "value": [[1.0, 0.0]]
    })
    .to_string();
    let no_classes = serde_json::json!({
        "classes": [],
        "children_left": [-1], "children_right": [-1],
        "feature": [-2], "threshold": [-2.0], "value": [[]]
    })
    .to_string();
    for json in [cyclic, unknown_feature, ragged, no_classes, "[]".to_string()] {
        let err = TreeClassifier::from_json(&json, Path::new("bad.json")).unwrap_err();
        assert!(matches!(err, IdsError::ModelLoad { .. }), "{}", err);
    }
}

#[test]
fn classifier_rejects_non_finite_inputs() {
    let f = FeatureVector { throughput_bps: f64::NAN, ..Default::default() };
    assert!(matches!(ce_tree().classify(&f), Err(IdsError::Classify(_))));
}

#[test]
fn missing_model_fails_closed() {
    let err = load_classifier(Path::new("nonexistent.onnx")).err().unwrap();
    assert!(matches!(err, IdsError::ModelLoad { .. }));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    std::fs::write(&path, ce_tree_json()).unwrap();
    let classifier = load_classifier(&path).unwrap();
    assert_eq!(classifier.name(), "decision-tree");
}

#[test]
fn collector_processor_writes_labeled_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dataset.csv");
    let stage = Stage::Collect {
        labeler: LabelAssigner::default(),
        dataset: DatasetWriter::open(&path).unwrap(),
    };
    let mut processor = WindowProcessor::new(
        FeatureDeriver::new(1.0),
        RollingHistory::default(),
        stage,
        Box::new(NoQueueStats),
    );

    assert!(processor.process(&WindowSnapshot::default()).unwrap().is_none());
    let mut snapshot = rtt_window(8.0);
    snapshot.attacker_bytes = 100;
    match processor.process(&snapshot).unwrap() {
        Some(WindowOutcome::Labeled { label, .. }) => assert_eq!(label, Label::Attack),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(processor.history().len(), 1);

    let rows = read_dataset(&path).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].rtt_mean, 8.0);
}

#[test]
fn detector_processor_alerts_and_journals() {
    let dir = tempfile::tempdir().unwrap();
    let out = SharedBuf::default();
    let journal = AlertStore::open(&dir.path().join("alerts.db")).unwrap();
    let alerts = AlertSink::new(AlertFormat::Text, Box::new(out.clone())).with_journal(journal);
    let stage = Stage::Detect { classifier: Box::new(ce_tree()), alerts };
    let mut processor = WindowProcessor::new(
        FeatureDeriver::new(1.0),
        RollingHistory::default(),
        stage,
        Box::new(NoQueueStats),
    );

    let snapshot = WindowSnapshot {
        packet_count: 4,
        total_bytes: 4000,
        ce_marks: 2,
        cwr_flags: 1,
        packet_sizes: vec![1000; 4],
        arrival_times: vec![0.0, 0.1, 0.2, 0.3],
        ..Default::default()
    };
    match processor.process(&snapshot).unwrap() {
        Some(WindowOutcome::Classified(r)) => assert_eq!(r.label, Label::Attack),
        other => panic!("unexpected outcome {:?}", other),
    }

    let text = out.text();
    assert!(text.contains("ATTACK"));
    assert!(text.contains("CE ratio 0.500"));
    assert!(text.contains("CWR 1"));
    assert!(text.contains("0.03 Mbps"));

    let Stage::Detect { alerts, .. } = processor.stage() else {
        panic!("detector stage expected");
    };
    assert_eq!(alerts.emitted(), 1);
    let entries = alerts.journal().unwrap().recent(10).unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].attack);
    assert_eq!(entries[0].cwr_count, 1);
    assert_eq!(entries[0].ratio_ce, 0.5);
}

#[test]
fn json_alert_line() {
    let out = SharedBuf::default();
    let mut sink = AlertSink::new(AlertFormat::Json, Box::new(out.clone()));
    let result = ClassificationResult {
        label: Label::Benign,
        features: FeatureVector { throughput_bps: 2e6, ratio_ce: 0.0, ..Default::default() },
    };
    sink.emit(&result).unwrap();
    let line: serde_json::Value = serde_json::from_str(out.text().trim()).unwrap();
    assert_eq!(line["verdict"], "normal");
    assert_eq!(line["throughput_mbps"], 2.0);
    assert_eq!(line["cwr_count"], 0);
}

/// Rejects its first write, accepts everything after.
struct FlakyOut {
    failed: bool,
    inner: SharedBuf,
}

impl Write for FlakyOut {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if !self.failed {
            self.failed = true;
            return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn alert_sink_failure_loses_only_that_window() {
    let out = SharedBuf::default();
    let flaky = FlakyOut { failed: false, inner: out.clone() };
    let alerts = AlertSink::new(AlertFormat::Json, Box::new(flaky));
    let stage = Stage::Detect { classifier: Box::new(ce_tree()), alerts };
    let mut processor = WindowProcessor::new(
        FeatureDeriver::new(1.0),
        RollingHistory::default(),
        stage,
        Box::new(NoQueueStats),
    );

    assert!(matches!(processor.process(&rtt_window(4.0)), Err(IdsError::Io(_))));
    match processor.process(&rtt_window(5.0)).unwrap() {
        Some(WindowOutcome::Classified(r)) => assert_eq!(r.label, Label::Benign),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(out.text().lines().count(), 1);
    assert_eq!(processor.history().len(), 2);
}

#[test]
fn classification_failure_leaves_window_unclassified() {
    let out = SharedBuf::default();
    let alerts = AlertSink::new(AlertFormat::Text, Box::new(out.clone()));
    let stage = Stage::Detect { classifier: Box::new(FailingClassifier), alerts };
    let mut processor = WindowProcessor::new(
        FeatureDeriver::new(1.0),
        RollingHistory::default(),
        stage,
        Box::new(NoQueueStats),
    );

    for _ in 0..2 {
        match processor.process(&rtt_window(3.0)).unwrap() {
            Some(WindowOutcome::Unclassified { reason, .. }) => assert!(reason.contains("backend unavailable")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
    assert!(out.text().is_empty());
    // History still advances for unclassified windows.
    assert_eq!(processor.history().len(), 2);
}

#[test]
fn journal_retention_prunes_old_verdicts() {
    use chrono::{Duration, Utc};

    let dir = tempfile::tempdir().unwrap();
    let store = AlertStore::open(&dir.path().join("alerts.db")).unwrap();
    let now = Utc::now();
    for age_days in [40, 10, 0] {
        let result = ClassificationResult {
            label: Label::Attack,
            features: FeatureVector { timestamp: now - Duration::days(age_days), ..Default::default() },
        };
        store.record(&result).unwrap();
    }
    assert_eq!(store.apply_retention(0, now).unwrap(), 0);
    assert_eq!(store.apply_retention(30, now).unwrap(), 1);
    assert_eq!(store.count().unwrap(), 2);
}

#[test]
fn capture_end_is_an_error_only_for_the_detector() {
    let summary = RunSummary { capture_ended: true, ..Default::default() };
    assert!(summary.clone().into_result(Mode::Collect).is_ok());
    assert!(matches!(summary.into_result(Mode::Detect), Err(IdsError::CaptureEnded)));
    let stopped = RunSummary::default();
    assert!(stopped.into_result(Mode::Detect).is_ok());
}
