use arcforge::{
    ArchiveFormat, ArchiveWriter, CommitPipeline, CommitState, CompressionMethod,
    CompressionSettings, CreatorError, Engine, ErrorKind, ItemSet, OutStream, PriorArchive,
    PropertyValue, ResultCode, SetProperties, TargetKind, UpdateCallback,
};
use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::tempdir;

// ---------- recording engine ----------

#[derive(Default)]
struct Log {
    calls: Vec<String>,
    properties: Vec<(Vec<String>, Vec<PropertyValue>)>,
}

#[derive(Clone)]
struct FakeEngine {
    log: Rc<RefCell<Log>>,
    result: ResultCode,
    message: Option<String>,
    has_setter: bool,
    setter_result: ResultCode,
}

impl FakeEngine {
    fn new() -> Self {
        Self {
            log: Rc::default(),
            result: ResultCode::Ok,
            message: None,
            has_setter: true,
            setter_result: ResultCode::Ok,
        }
    }

    fn failing(result: ResultCode, message: Option<&str>) -> Self {
        Self { result, message: message.map(str::to_string), ..Self::new() }
    }

    fn calls(&self) -> Vec<String> {
        self.log.borrow().calls.clone()
    }

    fn writer(&self, prior: Option<Vec<u8>>) -> Box<dyn ArchiveWriter> {
        Box::new(FakeWriter { engine: self.clone(), prior })
    }
}

impl Engine for FakeEngine {
    fn create_writer(&self, format: ArchiveFormat) -> Result<Box<dyn ArchiveWriter>, CreatorError> {
        self.log.borrow_mut().calls.push(format!("create:{}", format));
        Ok(self.writer(None))
    }

    fn open_archive(
        &self,
        format: ArchiveFormat,
        path: &Path,
    ) -> Result<Box<dyn PriorArchive>, CreatorError> {
        self.log.borrow_mut().calls.push(format!("open:{}", format));
        // A directory standing in for the destination reads as an empty archive.
        let contents = fs::read(path).unwrap_or_default();
        Ok(Box::new(FakePrior { engine: self.clone(), contents }))
    }
}

struct FakePrior {
    engine: FakeEngine,
    contents: Vec<u8>,
}

impl PriorArchive for FakePrior {
    fn updatable_writer(&mut self) -> Result<Box<dyn ArchiveWriter>, CreatorError> {
        self.engine.log.borrow_mut().calls.push("updatable".into());
        Ok(self.engine.writer(Some(self.contents.clone())))
    }

    fn close(&mut self) -> Result<(), CreatorError> {
        self.engine.log.borrow_mut().calls.push("close".into());
        Ok(())
    }
}

struct FakeWriter {
    engine: FakeEngine,
    prior: Option<Vec<u8>>,
}

impl SetProperties for FakeWriter {
    fn set_properties(&mut self, names: &[&str], values: &[PropertyValue]) -> ResultCode {
        let mut log = self.engine.log.borrow_mut();
        log.calls.push("set_properties".into());
        log.properties.push((names.iter().map(|n| n.to_string()).collect(), values.to_vec()));
        self.engine.setter_result
    }
}

impl ArchiveWriter for FakeWriter {
    fn property_setter(&mut self) -> Option<&mut dyn SetProperties> {
        if self.engine.has_setter {
            Some(self)
        } else {
            None
        }
    }

    /// Writes the prior contents followed by one line per item name.
    fn update_items(
        &mut self,
        out: &mut dyn OutStream,
        items_count: u32,
        callback: &mut dyn UpdateCallback,
    ) -> ResultCode {
        self.engine.log.borrow_mut().calls.push(format!("update:{}", items_count));
        let mut payload = self.prior.clone().unwrap_or_default();
        for i in 0..items_count {
            let name = callback.item(i).unwrap().name.clone();
            writeln!(payload, "{}", name).unwrap();
        }
        if let Err(e) = out.write_all(&payload) {
            callback.report_error(format!("write failed: {}", e));
            return ResultCode::Fail;
        }
        if let Some(message) = &self.engine.message {
            callback.report_error(message.clone());
        }
        self.engine.result
    }
}

// ---------- helpers ----------

fn items(names: &[&str]) -> ItemSet {
    let mut set = ItemSet::new();
    for name in names {
        set.add_buffer(*name, name.as_bytes().to_vec());
    }
    set
}

fn tmp_of(path: &Path) -> PathBuf {
    arcforge::fsx::temp_path_for(path)
}

// ---------- new archives ----------

#[test]
fn new_archive_is_committed() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("out.7z");
    let settings = CompressionSettings::new(ArchiveFormat::SevenZip);
    let engine = FakeEngine::new();

    let mut pipeline = CommitPipeline::new(&settings, engine.clone());
    let report = pipeline.commit_to_path(&dest, &items(&["a", "b"])).unwrap();

    assert_eq!(report.state, CommitState::Committed);
    assert_eq!(report.target, TargetKind::SingleFile);
    assert_eq!(report.paths, vec![dest.clone()]);
    assert_eq!(pipeline.state(), CommitState::Committed);
    assert_eq!(fs::read_to_string(&dest).unwrap(), "a\nb\n");
    assert_eq!(engine.calls(), ["create:7z", "set_properties", "update:2"]);

    let log = engine.log.borrow();
    assert_eq!(log.properties[0].0, ["x", "s"]);
    assert_eq!(log.properties[0].1, [PropertyValue::UInt(5), PropertyValue::Bool(false)]);
}

#[test]
fn empty_property_bag_issues_no_call() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("out.tar");
    let settings = CompressionSettings::new(ArchiveFormat::Tar);
    let engine = FakeEngine::new();

    CommitPipeline::new(&settings, engine.clone()).commit_to_path(&dest, &items(&["a"])).unwrap();
    assert_eq!(engine.calls(), ["create:tar", "update:1"]);
}

#[test]
fn header_encryption_without_password_is_not_sent() {
    let dir = tempdir().unwrap();
    let mut settings = CompressionSettings::new(ArchiveFormat::SevenZip);
    settings.set_password_with_headers("", true);
    let engine = FakeEngine::new();

    CommitPipeline::new(&settings, engine.clone())
        .commit_to_path(dir.path().join("a.7z"), &items(&["a"]))
        .unwrap();
    let log = engine.log.borrow();
    assert!(!log.properties[0].0.contains(&"he".to_string()));
}

#[test]
fn method_and_dictionary_reach_the_engine() {
    let dir = tempdir().unwrap();
    let mut settings = CompressionSettings::new(ArchiveFormat::SevenZip);
    settings.set_compression_method(CompressionMethod::BZip2).unwrap();
    settings.set_dictionary_size(900 * 1024).unwrap();
    settings.set_password_with_headers("pw", true);
    let engine = FakeEngine::new();

    CommitPipeline::new(&settings, engine.clone())
        .commit_to_path(dir.path().join("a.7z"), &items(&["a"]))
        .unwrap();
    let log = engine.log.borrow();
    assert_eq!(log.properties[0].0, ["he", "x", "0", "s", "0d"]);
    assert_eq!(log.properties[0].1[2], PropertyValue::Str("BZip2".into()));
    assert_eq!(log.properties[0].1[4], PropertyValue::Str("921600b".into()));
}

#[test]
fn buffer_output_is_replaced() {
    let settings = CompressionSettings::new(ArchiveFormat::Zip);
    let mut buffer = b"stale contents".to_vec();
    let report = CommitPipeline::new(&settings, FakeEngine::new())
        .commit_to_buffer(&mut buffer, &items(&["x"]))
        .unwrap();
    assert_eq!(report.target, TargetKind::Buffer);
    assert!(report.paths.is_empty());
    assert_eq!(buffer, b"x\n");
}

#[test]
fn stream_output() {
    let settings = CompressionSettings::new(ArchiveFormat::Zip);
    let mut cursor = std::io::Cursor::new(Vec::new());
    let report = CommitPipeline::new(&settings, FakeEngine::new())
        .commit_to_stream(&mut cursor, &items(&["s"]))
        .unwrap();
    assert_eq!(report.target, TargetKind::Stream);
    assert_eq!(cursor.into_inner(), b"s\n");
}

// ---------- existing destination ----------

#[test]
fn existing_destination_without_update_mode_is_state_error() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("out.zip");
    fs::write(&dest, b"old\n").unwrap();
    let settings = CompressionSettings::new(ArchiveFormat::Zip);
    let engine = FakeEngine::new();

    let mut pipeline = CommitPipeline::new(&settings, engine.clone());
    let err = pipeline.commit_to_path(&dest, &items(&["a"])).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(pipeline.state(), CommitState::Failed);
    assert!(!engine.calls().iter().any(|c| c.starts_with("update")));
    assert_eq!(fs::read(&dest).unwrap(), b"old\n");
    assert!(!tmp_of(&dest).exists());
}

#[test]
fn update_replaces_destination_with_merged_archive() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("out.zip");
    fs::write(&dest, b"old\n").unwrap();
    let mut settings = CompressionSettings::new(ArchiveFormat::Zip);
    settings.set_update_mode(true);
    let engine = FakeEngine::new();

    let mut pipeline = CommitPipeline::new(&settings, engine.clone());
    let report = pipeline.commit_to_path(&dest, &items(&["new"])).unwrap();

    assert_eq!(report.state, CommitState::Finalized);
    assert_eq!(report.target, TargetKind::InPlaceUpdate);
    assert_eq!(pipeline.state(), CommitState::Finalized);
    assert_eq!(fs::read_to_string(&dest).unwrap(), "old\nnew\n");
    assert!(!tmp_of(&dest).exists());
    assert_eq!(
        engine.calls(),
        [
            "create:zip",
            "set_properties",
            "open:zip",
            "updatable",
            "set_properties",
            "update:1",
            "close",
        ]
    );
}

#[test]
fn update_on_single_file_format_is_configuration_error() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("out.xz");
    fs::write(&dest, b"old").unwrap();
    let mut settings = CompressionSettings::new(ArchiveFormat::Xz);
    settings.set_update_mode(true);

    let err = CommitPipeline::new(&settings, FakeEngine::new())
        .commit_to_path(&dest, &items(&["a"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(!tmp_of(&dest).exists());
    assert_eq!(fs::read(&dest).unwrap(), b"old");
}

#[test]
fn stale_temp_file_blocks_update() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("out.zip");
    fs::write(&dest, b"old").unwrap();
    fs::write(tmp_of(&dest), b"stale").unwrap();
    let mut settings = CompressionSettings::new(ArchiveFormat::Zip);
    settings.set_update_mode(true);
    let engine = FakeEngine::new();

    let err = CommitPipeline::new(&settings, engine.clone())
        .commit_to_path(&dest, &items(&["a"]))
        .unwrap_err();
    match err {
        CreatorError::Io { path, .. } => assert_eq!(path, tmp_of(&dest)),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!engine.calls().iter().any(|c| c.starts_with("open")));
    assert_eq!(fs::read(tmp_of(&dest)).unwrap(), b"stale");
}

#[test]
fn failed_update_keeps_destination_and_temp() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("out.zip");
    fs::write(&dest, b"old\n").unwrap();
    let mut settings = CompressionSettings::new(ArchiveFormat::Zip);
    settings.set_update_mode(true);
    let engine = FakeEngine::failing(ResultCode::Fail, Some("item vanished"));

    let err = CommitPipeline::new(&settings, engine.clone())
        .commit_to_path(&dest, &items(&["a"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Engine);
    assert!(err.to_string().contains("item vanished"));
    assert_eq!(fs::read(&dest).unwrap(), b"old\n");
    assert!(tmp_of(&dest).exists(), "temp file is not cleaned up by the pipeline");
    assert_eq!(engine.calls().last().map(String::as_str), Some("close"));
}

#[test]
fn rename_failure_leaves_new_data_in_temp() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("occupied");
    fs::create_dir(&dest).unwrap();
    fs::write(dest.join("keep"), b"x").unwrap();
    let mut settings = CompressionSettings::new(ArchiveFormat::Tar);
    settings.set_update_mode(true);

    let mut pipeline = CommitPipeline::new(&settings, FakeEngine::new());
    let err = pipeline.commit_to_path(&dest, &items(&["fresh"])).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(pipeline.state(), CommitState::Failed);
    assert!(dest.join("keep").exists());
    assert_eq!(fs::read_to_string(tmp_of(&dest)).unwrap(), "fresh\n");
}

// ---------- volumes ----------

#[test]
fn volumes_bypass_update_logic() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("big.7z");
    fs::write(&dest, b"untouched").unwrap();
    let mut settings = CompressionSettings::new(ArchiveFormat::SevenZip);
    settings.set_update_mode(true);
    settings.set_volume_size(4);
    let engine = FakeEngine::new();

    let report = CommitPipeline::new(&settings, engine.clone())
        .commit_to_path(&dest, &items(&["alpha", "beta"]))
        .unwrap();

    assert_eq!(report.target, TargetKind::MultiVolume);
    assert_eq!(report.state, CommitState::Committed);
    assert_eq!(report.paths.len(), 3);
    let joined: Vec<u8> = report.paths.iter().flat_map(|p| fs::read(p).unwrap()).collect();
    assert_eq!(joined, b"alpha\nbeta\n");
    assert_eq!(fs::read(&report.paths[0]).unwrap().len(), 4);
    assert_eq!(fs::read(&dest).unwrap(), b"untouched");
    assert!(!engine.calls().iter().any(|c| c.starts_with("open")));
}

#[test]
fn volumes_on_fresh_destination() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("split.zip");
    let mut settings = CompressionSettings::new(ArchiveFormat::Zip);
    settings.set_volume_size(1_048_576);

    let report = CommitPipeline::new(&settings, FakeEngine::new())
        .commit_to_path(&dest, &items(&["one"]))
        .unwrap();
    assert_eq!(report.target, TargetKind::MultiVolume);
    assert_eq!(report.paths, vec![dir.path().join("split.zip.001")]);
    assert!(!dest.exists());
}

#[test]
fn existing_first_volume_is_left_alone() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("data.zip");
    let first = dir.path().join("data.zip.001");
    fs::write(&first, b"someone else's file").unwrap();
    let mut settings = CompressionSettings::new(ArchiveFormat::Zip);
    settings.set_volume_size(1_048_576);
    let engine = FakeEngine::new();

    let mut pipeline = CommitPipeline::new(&settings, engine.clone());
    let err = pipeline.commit_to_path(&dest, &items(&["a"])).unwrap_err();

    match err {
        CreatorError::Io { path, .. } => assert_eq!(path, first),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(pipeline.state(), CommitState::Failed);
    assert!(!engine.calls().iter().any(|c| c.starts_with("update")));
    assert_eq!(fs::read(&first).unwrap(), b"someone else's file");
}

#[test]
fn failed_volume_write_removes_only_its_own_volumes() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("data.7z");
    let second = dir.path().join("data.7z.002");
    fs::write(&second, b"stale tail").unwrap();
    let mut settings = CompressionSettings::new(ArchiveFormat::SevenZip);
    settings.set_volume_size(4);

    let err = CommitPipeline::new(&settings, FakeEngine::new())
        .commit_to_path(&dest, &items(&["alpha", "beta"]))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Engine);
    assert!(err.to_string().contains("write failed"));
    assert!(!dir.path().join("data.7z.001").exists());
    assert_eq!(fs::read(&second).unwrap(), b"stale tail");
}

#[test]
fn volumes_of_an_earlier_run_block_a_new_one() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("d.zip");
    let mut settings = CompressionSettings::new(ArchiveFormat::Zip);
    settings.set_volume_size(2);

    let first = CommitPipeline::new(&settings, FakeEngine::new())
        .commit_to_path(&dest, &items(&["long-item-name"]))
        .unwrap();
    assert_eq!(first.paths.len(), 8);

    let err = CommitPipeline::new(&settings, FakeEngine::new())
        .commit_to_path(&dest, &items(&["x"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    for path in &first.paths {
        assert!(path.exists());
    }
}

// ---------- engine failures ----------

#[test]
fn engine_result_codes_become_engine_errors() {
    let cases = [
        (ResultCode::NotImplemented, Some("ignored"), "Unsupported operation"),
        (ResultCode::Fail, None, "unknown error"),
        (ResultCode::Aborted, Some("user cancelled"), "user cancelled"),
    ];
    for (code, message, expected) in cases {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("out.zip");
        let settings = CompressionSettings::new(ArchiveFormat::Zip);

        let err = CommitPipeline::new(&settings, FakeEngine::failing(code, message))
            .commit_to_path(&dest, &items(&["a"]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Engine);
        assert!(err.to_string().contains(expected), "{code:?}: {err}");
        assert!(!dest.exists(), "new destination is removed after an engine failure");
    }
}

#[test]
fn unwritable_destination_is_io_error() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("missing").join("out.zip");
    let settings = CompressionSettings::new(ArchiveFormat::Zip);
    let engine = FakeEngine::new();

    let mut pipeline = CommitPipeline::new(&settings, engine.clone());
    let err = pipeline.commit_to_path(&dest, &items(&["a"])).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Io);
    match err {
        CreatorError::Io { path, .. } => assert_eq!(path, dest),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(pipeline.state(), CommitState::Failed);
    assert!(!engine.calls().iter().any(|c| c.starts_with("update")));
    assert!(!dest.exists());
}

#[test]
fn missing_property_setter_fails_before_any_file() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("out.7z");
    let settings = CompressionSettings::new(ArchiveFormat::SevenZip);
    let engine = FakeEngine { has_setter: false, ..FakeEngine::new() };

    let err = CommitPipeline::new(&settings, engine)
        .commit_to_path(&dest, &items(&["a"]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Engine);
    assert!(err.to_string().contains("unsupported"));
    assert!(!dest.exists());
}

#[test]
fn rejected_properties_fail_the_commit() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("out.7z");
    let settings = CompressionSettings::new(ArchiveFormat::SevenZip);
    let engine = FakeEngine { setter_result: ResultCode::InvalidArgument, ..FakeEngine::new() };

    let err = CommitPipeline::new(&settings, engine.clone())
        .commit_to_path(&dest, &items(&["a"]))
        .unwrap_err();
    assert!(err.to_string().contains("Cannot set properties"));
    assert!(!engine.calls().iter().any(|c| c.starts_with("update")));
    assert!(!dest.exists());
}

#[test]
fn pipeline_can_be_reused_after_failure() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("out.zip");
    fs::write(&dest, b"old\n").unwrap();
    let mut settings = CompressionSettings::new(ArchiveFormat::Zip);

    {
        let mut pipeline = CommitPipeline::new(&settings, FakeEngine::new());
        assert!(pipeline.commit_to_path(&dest, &items(&["a"])).is_err());
        assert_eq!(pipeline.state(), CommitState::Failed);
        let report = pipeline.commit_to_path(dir.path().join("other.zip"), &items(&["a"])).unwrap();
        assert_eq!(report.state, CommitState::Committed);
    }

    settings.set_update_mode(true);
    let report = CommitPipeline::new(&settings, FakeEngine::new())
        .commit_to_path(&dest, &items(&["b"]))
        .unwrap();
    assert_eq!(report.state, CommitState::Finalized);
    assert_eq!(fs::read_to_string(&dest).unwrap(), "old\nb\n");
}
