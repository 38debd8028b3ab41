//! End-to-end lifecycle scenarios: intake, preview, upload, processing.

use shared::intake::MAX_FILE_BYTES;
use shared::progress::PROCESSING_CEILING;
use shared::{
    AnalysisParams, Environment, ErrorKind, FileCandidate, FileIntake, IntakeError, ModeKind,
    IntakePolicy, ProgressState, Tick, Ticket, Timer, UploadOrchestrator,
};

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Single-slot timer host that also remembers every interval it ever started,
/// so tests can fire leftovers and check they are inert.
#[derive(Default)]
struct Host {
    slot: Option<Timer>,
    started: Vec<Ticket>,
}

impl Host {
    fn apply(&mut self, timer: Timer) {
        if let Timer::Interval { ticket, .. } = timer {
            self.started.push(ticket);
        }
        self.slot = match timer {
            Timer::Cancel => None,
            other => Some(other),
        };
    }

    fn interval(&self) -> Ticket {
        match self.slot {
            Some(Timer::Interval { ticket, .. }) => ticket,
            other => panic!("expected a running interval, got {:?}", other),
        }
    }

    fn delay(&self) -> Ticket {
        match self.slot {
            Some(Timer::Delay { ticket, .. }) => ticket,
            other => panic!("expected a pending delay, got {:?}", other),
        }
    }
}

fn observe(trace: &mut Vec<ModeKind>, progress: &ProgressState) {
    if trace.last() != Some(&progress.mode_kind()) {
        trace.push(progress.mode_kind());
    }
}

#[test]
fn valid_file_traverses_preview_and_returns_to_idle() {
    let mut host = Host::default();
    let mut intake = FileIntake::default();
    let mut progress = ProgressState::new();

    let selection = intake
        .select_file(FileCandidate::new("canopy.jpg", 10 * MIB, "image/jpeg"), &mut progress)
        .unwrap();
    host.apply(selection.timer);
    assert_eq!(progress.mode_kind(), ModeKind::PreviewLoading);
    assert_eq!(progress.file_name(), Some("canopy.jpg"));

    let ticket = host.interval();
    let mut values = vec![progress.progress()];
    for _ in 0..12 {
        if progress.advance_preview(ticket) == Tick::Stop {
            host.apply(Timer::Cancel);
        }
        values.push(progress.progress());
    }
    assert!(values.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(values.iter().all(|value| *value <= 70.0));

    let timer = intake
        .finish_decode(selection.decode, Some("data:image/jpeg;base64,AA".into()), &mut progress)
        .unwrap();
    host.apply(timer);
    assert_eq!(progress.progress(), 100.0);

    assert!(progress.settle(host.delay()));
    assert_eq!(progress.mode_kind(), ModeKind::Idle);
    assert_eq!(progress.progress(), 0.0);
    assert_eq!(progress.file_name(), None);
    assert_eq!(intake.preview(), Some("data:image/jpeg;base64,AA"));
}

#[test]
fn oversized_file_is_rejected_before_any_transition() {
    let mut intake = FileIntake::default();
    let mut progress = ProgressState::new();

    let error = intake
        .select_file(FileCandidate::new("mosaic.tif", 6 * GIB, "image/tiff"), &mut progress)
        .unwrap_err();

    assert_eq!(
        error,
        IntakeError::FileTooLarge {
            size: 6 * GIB,
            limit: MAX_FILE_BYTES
        }
    );
    assert_eq!(error.kind(), ErrorKind::FileTooLarge);
    assert_eq!(progress.mode_kind(), ModeKind::Idle);
    assert!(intake.selected().is_none());
}

#[test]
fn unsupported_type_is_rejected_before_any_transition() {
    let mut intake = FileIntake::new(IntakePolicy::images_only());
    let mut progress = ProgressState::new();

    let error = intake
        .select_file(FileCandidate::new("crowns.gpkg", 2 * MIB, "application/geopackage+sqlite3"), &mut progress)
        .unwrap_err();

    assert_eq!(
        error,
        IntakeError::UnsupportedFileType {
            mime: "application/geopackage+sqlite3".into()
        }
    );
    assert_eq!(error.kind(), ErrorKind::UnsupportedFileType);
    assert_eq!(progress, ProgressState::new());
    assert!(intake.selected().is_none());

    // The rejection leaves the intake ready for the next file.
    let accepted = intake
        .select_file(FileCandidate::new("canopy.png", 2 * MIB, "image/png"), &mut progress)
        .unwrap();
    assert_eq!(progress.mode_kind(), ModeKind::PreviewLoading);
    assert!(intake.selected().is_some_and(|file| file.size_ok));
    assert!(intake.finish_decode(accepted.decode, None, &mut progress).is_some());
}

#[test]
fn successful_upload_goes_idle_uploading_processing_idle() {
    let mut host = Host::default();
    let mut progress = ProgressState::new();
    let mut orchestrator = UploadOrchestrator::new();
    let mut trace = vec![progress.mode_kind()];

    let params = AnalysisParams::new(Environment::Forest, 0.5);
    let (request, timer) = orchestrator.begin("canopy.jpg", params, &mut progress);
    host.apply(timer);
    observe(&mut trace, &progress);

    let total = 10 * MIB;
    let mut last_reported = 0.0;
    for percent in [0, 25, 50, 100] {
        orchestrator.on_upload_progress(request.id, total * percent / 100, Some(total), &mut progress);
        last_reported = percent as f64;
        assert_eq!(progress.progress(), last_reported);
    }
    assert_eq!(progress.progress(), last_reported);

    host.apply(orchestrator.on_upload_sent(request.id, &mut progress).unwrap());
    observe(&mut trace, &progress);
    assert_eq!(progress.progress(), 0.0);

    let ticket = host.interval();
    for _ in 0..30 {
        progress.advance_processing(ticket, 0.8);
        assert!(progress.progress() < 100.0);
    }

    let body = r#"{"image": "data:image/png;base64,AAAA", "statistics": {"total_trees": 42}}"#;
    let (outcome, timer) = orchestrator
        .on_response(request.id, 200, body, &mut progress)
        .unwrap();
    host.apply(timer);
    assert_eq!(progress.progress(), 100.0);
    assert!(progress.settle(host.delay()));
    observe(&mut trace, &progress);

    assert_eq!(
        trace,
        vec![
            ModeKind::Idle,
            ModeKind::Uploading,
            ModeKind::Processing,
            ModeKind::Idle
        ]
    );
    assert_eq!(outcome.unwrap().statistics.total_trees, 42);
}

#[test]
fn simulated_processing_stalls_at_the_ceiling() {
    let mut host = Host::default();
    let mut progress = ProgressState::new();
    let mut orchestrator = UploadOrchestrator::new();

    let (request, timer) = orchestrator.begin("big.tif", AnalysisParams::default(), &mut progress);
    host.apply(timer);
    host.apply(orchestrator.on_upload_sent(request.id, &mut progress).unwrap());

    let ticket = host.interval();
    let draws = [0.0, 0.3, 0.99, 0.7, 0.1];
    for i in 0..1000 {
        if progress.advance_processing(ticket, draws[i % draws.len()]) == Tick::Stop {
            host.apply(Timer::Cancel);
            break;
        }
    }
    assert_eq!(progress.progress(), PROCESSING_CEILING);
    assert!(host.slot.is_none());

    for _ in 0..50 {
        progress.advance_processing(ticket, 0.99);
    }
    assert_eq!(progress.progress(), PROCESSING_CEILING);

    host.apply(progress.complete_processing().unwrap());
    assert_eq!(progress.progress(), 100.0);
}

#[test]
fn server_error_during_processing_resets_to_idle() {
    let mut host = Host::default();
    let mut progress = ProgressState::new();
    let mut orchestrator = UploadOrchestrator::new();

    let (request, timer) = orchestrator.begin("plot.png", AnalysisParams::default(), &mut progress);
    host.apply(timer);
    host.apply(orchestrator.on_upload_sent(request.id, &mut progress).unwrap());
    let ticket = host.interval();
    progress.advance_processing(ticket, 0.5);

    let (outcome, timer) = orchestrator
        .on_response(request.id, 500, "internal error", &mut progress)
        .unwrap();
    host.apply(timer);

    assert_eq!(outcome.unwrap_err().kind(), ErrorKind::ServerError);
    assert_eq!(progress.mode_kind(), ModeKind::Idle);
    assert_eq!(progress.progress(), 0.0);
    assert!(host.slot.is_none());
    assert_eq!(progress.advance_processing(ticket, 0.5), Tick::Stale);
    assert_eq!(progress.progress(), 0.0);
}

#[test]
fn discard_and_reselect_leaves_one_live_timer() {
    let mut host = Host::default();
    let mut intake = FileIntake::default();
    let mut progress = ProgressState::new();
    let mut orchestrator = UploadOrchestrator::new();

    let first = intake
        .select_file(FileCandidate::new("first.png", MIB, "image/png"), &mut progress)
        .unwrap();
    host.apply(first.timer);
    progress.advance_preview(host.interval());

    intake.clear();
    host.apply(orchestrator.abandon(&mut progress));
    assert!(host.slot.is_none());

    let second = intake
        .select_file(FileCandidate::new("second.png", MIB, "image/png"), &mut progress)
        .unwrap();
    host.apply(second.timer);

    let live: Vec<Ticket> = host
        .started
        .clone()
        .into_iter()
        .filter(|ticket| progress.clone().advance_preview(*ticket) != Tick::Stale)
        .collect();
    assert_eq!(live, vec![host.interval()]);

    assert_eq!(progress.advance_preview(host.started[0]), Tick::Stale);
    assert_eq!(progress.progress(), 0.0);
    assert_eq!(
        intake.finish_decode(first.decode, Some("stale".into()), &mut progress),
        None
    );
    assert_eq!(progress.file_name(), Some("second.png"));
}

#[test]
fn upload_pre_empts_a_running_preview() {
    let mut host = Host::default();
    let mut intake = FileIntake::default();
    let mut progress = ProgressState::new();
    let mut orchestrator = UploadOrchestrator::new();

    let selection = intake
        .select_file(FileCandidate::new("a.png", MIB, "image/png"), &mut progress)
        .unwrap();
    host.apply(selection.timer);
    let preview_ticket = host.interval();

    let (request, timer) = orchestrator.begin("a.png", AnalysisParams::default(), &mut progress);
    host.apply(timer);
    assert!(host.slot.is_none());
    assert_eq!(progress.advance_preview(preview_ticket), Tick::Stale);

    // The decode finishing late must not complete or collapse the upload.
    assert_eq!(
        intake.finish_decode(selection.decode, Some("data:".into()), &mut progress),
        None
    );
    orchestrator.on_upload_progress(request.id, 1, Some(4), &mut progress);
    assert_eq!(progress.mode_kind(), ModeKind::Uploading);
    assert_eq!(progress.progress(), 25.0);
    assert_eq!(intake.preview(), Some("data:"));
}
