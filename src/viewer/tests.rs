// SPDX-License-Identifier: MPL-2.0
//! Orchestrator-level scenarios: initialization, fan-out consistency,
//! layout survival, cine ownership, event handling, and teardown
//! discipline, all driven against the mock engine and manual scheduler.

use super::*;
use crate::engine::{EngineImage, FrameMetadata};
use crate::measurements::MeasurementRecord;
use crate::test_utils::{white_capture, ManualScheduler, MockEngine};
use crate::tools::ToolMode;

struct Fixture {
    engine: Rc<MockEngine>,
    scheduler: Rc<ManualScheduler>,
    viewer: ViewerOrchestrator,
}

fn study() -> StudyDescriptor {
    StudyDescriptor {
        patient_name: "DOE^JANE".to_string(),
        patient_id: "P-1234".to_string(),
        study_date: "2024-03-18".to_string(),
        modality: "CT".to_string(),
        accession_number: "ACC-77".to_string(),
        image_url: "img:seriesA".to_string(),
    }
}

fn fixture_with_study(study: StudyDescriptor) -> Fixture {
    let engine = MockEngine::shared();
    let scheduler = ManualScheduler::shared();
    let viewer = ViewerOrchestrator::new(
        engine.clone() as Rc<dyn RenderingEngine>,
        scheduler.clone() as Rc<dyn Scheduler>,
        ViewerConfig::default(),
        study,
    );
    Fixture {
        engine,
        scheduler,
        viewer,
    }
}

fn fixture() -> Fixture {
    fixture_with_study(study())
}

fn grid_surfaces(layout: GridLayout) -> Vec<SurfaceId> {
    (0..layout.panel_count())
        .map(|slot| SurfaceId::new(slot as u64))
        .collect()
}

fn initialized(rows: usize, cols: usize) -> Fixture {
    let mut f = fixture();
    let layout = GridLayout::new(rows, cols).expect("valid layout");
    let surfaces = grid_surfaces(layout);
    f.viewer.initialize(layout, &surfaces).expect("initialize");
    f
}

// =============================================================================
// Initialization
// =============================================================================

#[test]
fn initialize_brings_viewer_to_ready() {
    let f = initialized(2, 2);
    assert_eq!(f.viewer.status(), &ViewerStatus::Ready);
    assert!(f.engine.was_initialized());
    assert_eq!(f.engine.enabled_surfaces().len(), 4);
    assert_eq!(f.viewer.panels().len(), 4);
}

#[test]
fn initialize_registers_the_full_tool_set() {
    let f = initialized(1, 1);
    assert_eq!(f.engine.added_tools(), ToolId::ALL.to_vec());
}

#[test]
fn initialize_activates_pan_and_demotes_the_rest() {
    let f = initialized(1, 1);
    assert_eq!(f.viewer.active_tool(), ToolId::Pan);
    assert_eq!(f.engine.tool_mode_of(ToolId::Pan), Some(ToolMode::Active));
    for tool in ToolId::ALL {
        if tool != ToolId::Pan {
            assert_eq!(f.engine.tool_mode_of(tool), Some(ToolMode::Passive));
        }
    }
}

#[test]
fn initialize_displays_first_frame_on_every_panel() {
    let f = initialized(2, 2);
    let loads = f.engine.load_requests();
    assert_eq!(loads.len(), 4);
    for (slot, load) in loads.iter().enumerate() {
        assert_eq!(load.0, SurfaceId::new(slot as u64));
        assert_eq!(load.1, ImageId::new("img:seriesA"));
    }
}

#[test]
fn engine_init_failure_blocks_the_viewer() {
    let mut f = fixture();
    f.engine.fail_initialize("decode workers unavailable");

    let layout = GridLayout::new(1, 1).expect("valid");
    let result = f.viewer.initialize(layout, &grid_surfaces(layout));

    assert!(matches!(result, Err(Error::EngineInit(_))));
    match f.viewer.status() {
        ViewerStatus::Failed(message) => {
            assert!(message.contains("decode workers unavailable"));
        }
        other => panic!("expected Failed status, got {other:?}"),
    }
}

#[test]
fn surface_enable_failure_blocks_the_viewer() {
    let mut f = fixture();
    f.engine.fail_enable("surface has no backing element");

    let layout = GridLayout::new(1, 1).expect("valid");
    let result = f.viewer.initialize(layout, &grid_surfaces(layout));

    assert!(result.is_err());
    assert!(matches!(f.viewer.status(), ViewerStatus::Failed(_)));
}

#[test]
fn layout_surface_count_mismatch_is_rejected() {
    let mut f = fixture();
    let layout = GridLayout::new(2, 2).expect("valid");
    let result = f.viewer.initialize(layout, &grid_surfaces(GridLayout::default()));
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

// =============================================================================
// End-to-end scenario
// =============================================================================

#[test]
fn window_level_scenario_keeps_all_panels_and_overlay_consistent() {
    let mut f = initialized(2, 2);

    f.viewer
        .change_tool(ToolId::from_name("Wwwc").expect("known tool"));
    f.viewer
        .set_window_level(400.0, 40.0)
        .expect("valid window level");

    let snapshot = f.viewer.overlay_snapshot();
    assert_eq!(snapshot.transform.window().width(), 400.0);
    assert_eq!(snapshot.transform.window().center(), 40.0);
    assert_eq!(snapshot.total_images, 10);
    assert_eq!(snapshot.current_image_index, 0);

    let first = f.viewer.panels()[0].transform();
    for panel in f.viewer.panels() {
        assert_eq!(panel.transform(), first);
        let surface = panel.surface().expect("mounted");
        assert_eq!(f.engine.viewport(surface), Some(first));
    }

    assert_eq!(f.viewer.active_tool(), ToolId::Wwwc);
    assert_eq!(f.engine.tool_mode_of(ToolId::Wwwc), Some(ToolMode::Active));
    assert_eq!(f.engine.tool_mode_of(ToolId::Pan), Some(ToolMode::Passive));
}

// =============================================================================
// Tool selection
// =============================================================================

#[test]
fn reactivating_the_current_tool_causes_no_engine_traffic() {
    let mut f = initialized(1, 1);
    let log_len = f.engine.tool_mode_log().len();

    f.viewer.change_tool(ToolId::Pan);

    assert_eq!(f.engine.tool_mode_log().len(), log_len);
}

#[test]
fn changing_tool_leaves_exactly_one_active() {
    let mut f = initialized(1, 1);
    f.viewer.change_tool(ToolId::Length);
    f.viewer.change_tool(ToolId::Zoom);

    let active: Vec<ToolId> = ToolId::ALL
        .into_iter()
        .filter(|&tool| f.engine.tool_mode_of(tool) == Some(ToolMode::Active))
        .collect();
    assert_eq!(active, vec![ToolId::Zoom]);
}

// =============================================================================
// Transform fan-out
// =============================================================================

#[test]
fn zoom_in_updates_overlay_snapshot_immediately() {
    let mut f = initialized(2, 2);
    f.viewer.zoom_in().expect("zoom in");

    let snapshot = f.viewer.overlay_snapshot();
    assert!((snapshot.transform.scale() - 1.2).abs() < 1e-9);
    for panel in f.viewer.panels() {
        assert_eq!(panel.transform(), snapshot.transform);
    }
}

#[test]
fn zoom_out_then_fit_restores_unit_scale() {
    let mut f = initialized(1, 1);
    f.viewer.zoom_out().expect("zoom out");
    f.viewer.zoom_out().expect("zoom out");
    f.viewer.fit().expect("fit");
    assert_eq!(f.viewer.overlay_snapshot().transform.scale(), 1.0);
}

#[test]
fn invalid_window_level_leaves_every_panel_untouched() {
    let mut f = initialized(2, 2);
    let before: Vec<_> = f.viewer.panels().iter().map(Panel::transform).collect();

    assert!(f.viewer.set_window_level(0.0, 40.0).is_err());
    assert!(f.viewer.set_window_level(-5.0, 40.0).is_err());

    let after: Vec<_> = f.viewer.panels().iter().map(Panel::transform).collect();
    assert_eq!(before, after);
}

#[test]
fn reset_returns_to_configured_window_level() {
    let mut f = initialized(1, 1);
    f.viewer.set_window_level(1500.0, -600.0).expect("apply");
    f.viewer.zoom_in().expect("zoom");
    f.viewer
        .rotate(RotationDirection::Clockwise)
        .expect("rotate");

    f.viewer.reset_transform().expect("reset");

    let transform = f.viewer.overlay_snapshot().transform;
    assert_eq!(transform.window().width(), 400.0);
    assert_eq!(transform.window().center(), 40.0);
    assert_eq!(transform.scale(), 1.0);
    assert_eq!(transform.rotation_degrees(), 0);
}

// =============================================================================
// Layout changes
// =============================================================================

#[test]
fn layout_change_preserves_transform_and_tool() {
    let mut f = initialized(2, 2);
    f.viewer.zoom_in().expect("zoom");
    f.viewer
        .rotate(RotationDirection::Clockwise)
        .expect("rotate");
    f.viewer.change_tool(ToolId::Length);
    let transform_before = f.viewer.overlay_snapshot().transform;

    let layout = GridLayout::new(1, 1).expect("valid");
    let new_surface = SurfaceId::new(100);
    f.viewer
        .set_layout(layout, &[new_surface])
        .expect("layout change");

    assert_eq!(f.viewer.panels().len(), 1);
    assert_eq!(f.viewer.panels()[0].transform(), transform_before);
    assert_eq!(f.engine.viewport(new_surface), Some(transform_before));
    assert_eq!(
        f.engine.tool_mode_log().last(),
        Some(&(ToolId::Length, ToolMode::Active))
    );
    // Only the new panel's listener is live.
    assert_eq!(f.engine.active_listener_count(), 1);
}

#[test]
fn layout_change_disposes_the_running_cine_session() {
    let mut f = initialized(2, 2);
    assert!(f.viewer.toggle_cine().expect("start cine"));
    assert_eq!(f.scheduler.active_timers(), 1);

    let layout = GridLayout::new(1, 1).expect("valid");
    f.viewer
        .set_layout(layout, &[SurfaceId::new(50)])
        .expect("layout change");

    assert_eq!(f.scheduler.active_timers(), 0);
    assert!(!f.viewer.cine_playing());

    // A fresh session starts on the next request, bound to the new panel.
    assert!(f.viewer.toggle_cine().expect("restart cine"));
    assert_eq!(f.scheduler.active_timers(), 1);
}

// =============================================================================
// Image navigation (clamped)
// =============================================================================

#[test]
fn navigation_clamps_at_sequence_boundaries() {
    let mut f = initialized(1, 1);

    assert!(!f.viewer.previous_image(), "already at first image");

    for _ in 0..9 {
        assert!(f.viewer.next_image());
    }
    assert_eq!(f.viewer.overlay_snapshot().current_image_index, 9);
    assert!(!f.viewer.next_image(), "clamped at last image, no wrap");
    assert_eq!(f.viewer.overlay_snapshot().current_image_index, 9);
}

#[test]
fn navigation_requests_display_on_every_mounted_panel() {
    let mut f = initialized(2, 2);
    let loads_before = f.engine.load_requests().len();

    assert!(f.viewer.next_image());

    assert_eq!(f.engine.load_requests().len(), loads_before + 4);
}

#[test]
fn boundary_noop_issues_no_display_requests() {
    let mut f = initialized(1, 1);
    let loads_before = f.engine.load_requests().len();

    assert!(!f.viewer.previous_image());

    assert_eq!(f.engine.load_requests().len(), loads_before);
}

// =============================================================================
// Cine ownership
// =============================================================================

#[test]
fn toggle_cine_starts_and_stops_playback() {
    let mut f = initialized(1, 1);

    assert!(f.viewer.toggle_cine().expect("start"));
    assert!(f.viewer.cine_playing());

    f.scheduler.fire_all();
    assert_eq!(f.viewer.overlay_snapshot().current_image_index, 1);

    assert!(!f.viewer.toggle_cine().expect("stop"));
    assert!(!f.viewer.cine_playing());
    assert_eq!(f.scheduler.active_timers(), 0);
}

#[test]
fn cine_with_zero_panels_is_a_guarded_noop() {
    let mut f = fixture();
    assert!(!f.viewer.toggle_cine().expect("guarded"));
    assert!(!f.viewer.cine_playing());
    assert_eq!(f.scheduler.active_timers(), 0);
}

#[test]
fn cine_over_empty_sequence_is_rejected() {
    let mut f = fixture_with_study(StudyDescriptor::default());
    let layout = GridLayout::new(1, 1).expect("valid");
    f.viewer
        .initialize(layout, &grid_surfaces(layout))
        .expect("initialize");

    assert!(matches!(
        f.viewer.toggle_cine(),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn set_cine_rate_reaches_a_running_session() {
    let mut f = initialized(1, 1);
    f.viewer.toggle_cine().expect("start");

    f.viewer.set_cine_rate(20.0);

    assert_eq!(f.scheduler.active_timers(), 1);
    assert_eq!(
        f.scheduler.periods(),
        vec![std::time::Duration::from_millis(50)]
    );
}

#[test]
fn cine_frame_callback_reports_indices() {
    let mut f = initialized(1, 1);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    f.viewer
        .set_cine_frame_callback(Box::new(move |index| sink.borrow_mut().push(index)))
        .expect("bind callback");

    f.viewer.toggle_cine().expect("start");
    f.scheduler.fire_all();
    f.scheduler.fire_all();

    assert_eq!(*seen.borrow(), vec![1, 2]);
}

// =============================================================================
// Engine events
// =============================================================================

#[test]
fn current_load_completion_is_displayed() {
    let mut f = initialized(1, 1);
    let (surface, image_id, token) = f.engine.load_requests()[0].clone();

    f.viewer.handle_event(EngineEvent::ImageLoaded {
        surface,
        token,
        outcome: LoadOutcome::Loaded(EngineImage {
            image_id: image_id.clone(),
        }),
    });

    assert_eq!(f.engine.displayed(), vec![(surface, image_id)]);
}

#[test]
fn superseded_load_completion_is_dropped() {
    let mut f = initialized(1, 1);
    let (surface, image_id, stale_token) = f.engine.load_requests()[0].clone();

    // A newer request supersedes the initial one.
    assert!(f.viewer.next_image());

    f.viewer.handle_event(EngineEvent::ImageLoaded {
        surface,
        token: stale_token,
        outcome: LoadOutcome::Loaded(EngineImage { image_id }),
    });
    assert!(f.engine.displayed().is_empty());

    // The newer load still lands.
    let (surface, image_id, token) = f.engine.load_requests()[1].clone();
    f.viewer.handle_event(EngineEvent::ImageLoaded {
        surface,
        token,
        outcome: LoadOutcome::Loaded(EngineImage {
            image_id: image_id.clone(),
        }),
    });
    assert_eq!(f.engine.displayed(), vec![(surface, image_id)]);
}

#[test]
fn failed_load_keeps_the_last_frame_and_the_viewer_alive() {
    let mut f = initialized(2, 2);
    let (surface, _, token) = f.engine.load_requests()[0].clone();

    f.viewer.handle_event(EngineEvent::ImageLoaded {
        surface,
        token,
        outcome: LoadOutcome::Failed(crate::error::ImageLoadError::DecodeFailed(
            "bad pixel data".to_string(),
        )),
    });

    assert!(f.engine.displayed().is_empty());
    assert_eq!(f.viewer.status(), &ViewerStatus::Ready);
}

#[test]
fn image_rendered_assembles_overlay_metadata() {
    let mut f = initialized(1, 1);
    f.engine.set_frame_meta(
        ImageId::new("img:seriesA"),
        FrameMetadata {
            series_number: Some(3),
            instance_number: Some(7),
        },
    );

    f.viewer.handle_event(EngineEvent::ImageRendered {
        surface: SurfaceId::new(0),
    });

    let metadata = f.viewer.overlay_snapshot().metadata.expect("metadata");
    assert_eq!(metadata.patient_name, "DOE^JANE");
    assert_eq!(metadata.modality, "CT");
    assert_eq!(metadata.series_number, Some(3));
    assert_eq!(metadata.instance_number, Some(7));
}

// =============================================================================
// Measurements
// =============================================================================

#[test]
fn measurement_events_rebuild_the_snapshot_wholesale() {
    let mut f = initialized(1, 1);
    let surface = SurfaceId::new(0);
    f.engine
        .set_tool_state(surface, ToolKind::Length, vec![MeasurementRecord::length(5.0)]);
    f.engine.set_tool_state(surface, ToolKind::Angle, vec![]);

    f.viewer
        .handle_event(EngineEvent::MeasurementCompleted { surface });

    let group = f.viewer.measurements();
    assert_eq!(
        group.records_of(ToolKind::Length),
        Some(&[MeasurementRecord::length(5.0)][..])
    );
    assert_eq!(group.records_of(ToolKind::Angle), None);

    // A removal triggers the same full rebuild.
    f.engine.set_tool_state(surface, ToolKind::Length, vec![]);
    f.viewer
        .handle_event(EngineEvent::MeasurementRemoved { surface });
    assert!(f.viewer.measurements().is_empty());
}

#[test]
fn clear_measurements_empties_engine_state_and_snapshot() {
    let mut f = initialized(2, 2);
    let surface = SurfaceId::new(0);
    f.engine
        .set_tool_state(surface, ToolKind::Length, vec![MeasurementRecord::length(5.0)]);
    f.viewer
        .handle_event(EngineEvent::MeasurementCompleted { surface });
    assert!(!f.viewer.measurements().is_empty());
    let updates_before = f.engine.update_image_count();

    f.viewer.clear_measurements();

    assert!(f.viewer.measurements().is_empty());
    assert!(f.engine.tool_state(surface, ToolKind::Length).is_empty());
    // One re-render per mounted panel.
    assert_eq!(f.engine.update_image_count(), updates_before + 4);
}

// =============================================================================
// Export and print
// =============================================================================

#[test]
fn export_encodes_the_primary_panel_capture() {
    let mut f = initialized(2, 2);
    f.engine
        .set_captured_frame(SurfaceId::new(0), white_capture());
    f.viewer.handle_event(EngineEvent::ImageRendered {
        surface: SurfaceId::new(0),
    });

    let exported = f.viewer.export_image(ExportFormat::Png).expect("export");

    assert_eq!(&exported.bytes[..4], &[0x89, b'P', b'N', b'G']);
    assert!(exported.filename.starts_with("DOE_JANE-"));
    assert!(exported.filename.ends_with(".png"));
}

#[test]
fn export_without_capture_fails_cleanly() {
    let f = initialized(1, 1);
    assert!(matches!(
        f.viewer.export_image(ExportFormat::Jpeg),
        Err(Error::Export(_))
    ));
}

#[test]
fn print_document_contains_frame_and_metadata_table() {
    let mut f = initialized(1, 1);
    f.engine
        .set_captured_frame(SurfaceId::new(0), white_capture());
    f.viewer.handle_event(EngineEvent::ImageRendered {
        surface: SurfaceId::new(0),
    });

    let html = f.viewer.print_document().expect("print");

    assert!(html.contains("DICOM Print - DOE^JANE"));
    assert!(html.contains("data:image/png;base64,"));
    assert!(html.contains("<tr><td>Modality:</td><td>CT</td></tr>"));
}

// =============================================================================
// Resize and teardown
// =============================================================================

#[test]
fn resize_all_reaches_every_mounted_surface() {
    let f = initialized(2, 2);
    f.viewer.resize_all();
    assert_eq!(f.engine.resized_surfaces().len(), 4);
}

#[test]
fn shutdown_releases_every_resource() {
    let mut f = initialized(2, 2);
    f.viewer.toggle_cine().expect("start cine");

    f.viewer.shutdown();

    assert_eq!(f.scheduler.active_timers(), 0, "cine timer cancelled");
    assert_eq!(
        f.engine.attach_count(),
        f.engine.detach_count(),
        "every listener detached"
    );
    assert_eq!(f.engine.disabled_surfaces().len(), 4);
}

#[test]
fn shutdown_detaches_listeners_in_reverse_attachment_order() {
    let mut f = initialized(2, 2);
    let attached: Vec<_> = (0..4)
        .map(|raw| crate::engine::ListenerHandle::new(raw))
        .collect();

    f.viewer.shutdown();

    let mut expected = attached;
    expected.reverse();
    assert_eq!(f.engine.detach_order(), expected);
}
