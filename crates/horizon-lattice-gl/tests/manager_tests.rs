//! Integration tests for the GL context manager.
//!
//! These run against the headless driver and need no GPU. WGL coverage lives
//! in `wgl_tests.rs` and is ignored by default.

use horizon_lattice_gl::{
    BinderState, GlConfig, GlDriver, GlError, GlErrorKind, GlManager, HeadlessCall,
    HeadlessDriver, NativeInstanceHandle, PixelFormatRequest, VsyncSupport, WindowId,
};

const A: WindowId = WindowId::MAIN;
const B: WindowId = WindowId::new(1);
const C: WindowId = WindowId::new(2);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

fn instance() -> NativeInstanceHandle {
    NativeInstanceHandle::from_raw(0x400000).unwrap()
}

fn setup_with(driver: HeadlessDriver, config: GlConfig) -> (GlManager<HeadlessDriver>, HeadlessDriver) {
    init_tracing();
    let observer = driver.clone();
    let mut manager = GlManager::new(driver, config);
    manager.initialize().unwrap();
    (manager, observer)
}

fn setup() -> (GlManager<HeadlessDriver>, HeadlessDriver) {
    setup_with(HeadlessDriver::new(), GlConfig::default())
}

fn create(
    manager: &mut GlManager<HeadlessDriver>,
    observer: &HeadlessDriver,
    id: WindowId,
    width: u32,
    height: u32,
) {
    manager
        .window_create(id, observer.create_window(), instance(), width, height)
        .unwrap();
}

fn create_with(
    manager: &mut GlManager<HeadlessDriver>,
    observer: &HeadlessDriver,
    id: WindowId,
    format: PixelFormatRequest,
) -> Result<(), GlError> {
    manager.window_create_with_format(id, observer.create_window(), instance(), 640, 480, &format)
}

fn incompatible() -> PixelFormatRequest {
    PixelFormatRequest::default().with_color_bits(16)
}

/// Return `id`'s device context to the driver behind the manager's back, so
/// the next bind to it fails.
fn invalidate_device_context(manager: &GlManager<HeadlessDriver>, observer: &HeadlessDriver, id: WindowId) {
    let window = manager.window(id).unwrap().native_window();
    let dc = manager.get_hdc(id).unwrap();
    observer.clone().release_device_context(window, dc).unwrap();
}

// ============================================================================
// Display groups
// ============================================================================

#[test]
fn test_compatible_windows_share_one_context() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    create(&mut manager, &observer, B, 640, 480);
    create(&mut manager, &observer, C, 320, 240);

    assert_eq!(manager.window_count(), 3);
    assert_eq!(manager.display_count(), 1);
    assert_eq!(observer.stats().contexts_created, 1);
    assert_eq!(manager.get_hglrc(A).unwrap(), manager.get_hglrc(C).unwrap());
    assert_ne!(manager.get_hdc(A).unwrap(), manager.get_hdc(C).unwrap());
}

#[test]
fn test_formats_differing_only_in_depth_are_compatible() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    create_with(
        &mut manager,
        &observer,
        B,
        PixelFormatRequest::default().with_depth_bits(16),
    )
    .unwrap();

    assert_eq!(manager.display_count(), 1);
    assert_eq!(manager.window_display(A).unwrap(), manager.window_display(B).unwrap());
}

#[test]
fn test_incompatible_windows_get_one_group_each() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    create_with(&mut manager, &observer, B, incompatible()).unwrap();
    create_with(
        &mut manager,
        &observer,
        C,
        PixelFormatRequest::default().with_double_buffer(false),
    )
    .unwrap();

    assert_eq!(manager.display_count(), 3);
    assert_eq!(observer.live_contexts(), 3);
    let groups: Vec<_> = [A, B, C]
        .into_iter()
        .map(|id| manager.window_display(id).unwrap().index())
        .collect();
    assert_eq!(groups, vec![0, 1, 2]);
}

#[test]
fn test_later_groups_share_objects_with_the_first() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    create_with(&mut manager, &observer, B, incompatible()).unwrap();

    let first = manager.get_hglrc(A).unwrap();
    let second = manager.get_hglrc(B).unwrap();
    assert_eq!(observer.share_source(first), None);
    assert_eq!(observer.share_source(second), Some(first));
}

#[test]
fn test_sharing_can_be_disabled() {
    let config = GlConfig::default().with_share_contexts(false);
    let (mut manager, observer) = setup_with(HeadlessDriver::new(), config);
    create(&mut manager, &observer, A, 800, 600);
    create_with(&mut manager, &observer, B, incompatible()).unwrap();

    assert_eq!(observer.share_source(manager.get_hglrc(B).unwrap()), None);
}

#[test]
fn test_group_outlives_its_windows() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    manager.window_destroy(A).unwrap();

    assert_eq!(manager.display_count(), 1);
    assert_eq!(observer.live_contexts(), 1);

    create(&mut manager, &observer, B, 800, 600);
    assert_eq!(manager.display_count(), 1);
    assert_eq!(observer.stats().contexts_created, 1);
}

// ============================================================================
// Window registry
// ============================================================================

#[test]
fn test_scenario_two_compatible_windows() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    create(&mut manager, &observer, B, 640, 480);
    assert_eq!(manager.display_count(), 1);
    assert_eq!(manager.window_count(), 2);

    manager.set_use_vsync(A, true).unwrap();
    assert!(manager.is_using_vsync(A).unwrap());
    assert!(!manager.is_using_vsync(B).unwrap());

    manager.window_resize(A, 1024, 768).unwrap();
    assert_eq!(manager.window_get_width(A).unwrap(), 1024);
    assert_eq!(manager.window_get_height(A).unwrap(), 768);
    assert_eq!(manager.window_get_height(B).unwrap(), 480);
    assert_eq!(manager.main_window_width().unwrap(), 1024);
    assert_eq!(manager.main_window_height().unwrap(), 768);
}

#[test]
fn test_duplicate_id_leaves_first_window_alone() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    let hdc = manager.get_hdc(A).unwrap();

    let err = manager
        .window_create(A, observer.create_window(), instance(), 320, 240)
        .unwrap_err();
    assert_eq!(err, GlError::DuplicateWindow(A));
    assert_eq!(err.kind(), GlErrorKind::InvalidArgument);

    assert_eq!(manager.window_count(), 1);
    assert_eq!(manager.window_get_width(A).unwrap(), 800);
    assert_eq!(manager.get_hdc(A).unwrap(), hdc);
    assert_eq!(observer.leased_device_contexts(), 1);
}

#[test]
fn test_unknown_window_is_not_found() {
    let (mut manager, _observer) = setup();

    assert_eq!(manager.window_destroy(A), Err(GlError::WindowNotFound(A)));
    assert_eq!(manager.window_get_width(A), Err(GlError::WindowNotFound(A)));
    assert_eq!(manager.window_resize(A, 10, 10), Err(GlError::WindowNotFound(A)));
    assert_eq!(manager.set_use_vsync(A, true), Err(GlError::WindowNotFound(A)));
    assert_eq!(manager.is_using_vsync(A), Err(GlError::WindowNotFound(A)));
    assert_eq!(manager.window_make_current(A), Err(GlError::WindowNotFound(A)));
    assert_eq!(manager.get_hdc(A).unwrap_err().kind(), GlErrorKind::NotFound);
    assert_eq!(manager.get_hglrc(A).unwrap_err().kind(), GlErrorKind::NotFound);
}

#[test]
fn test_resize_rejects_zero_dimensions() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);

    let err = manager.window_resize(A, 1024, 0).unwrap_err();
    assert_eq!(err.kind(), GlErrorKind::InvalidArgument);
    assert_eq!(manager.window_get_height(A).unwrap(), 600);
}

#[test]
fn test_window_bookkeeping() {
    let (mut manager, observer) = setup();
    let hwnd = observer.create_window();
    manager.window_create(B, hwnd, instance(), 640, 480).unwrap();

    let window = manager.window(B).unwrap();
    assert_eq!(window.native_window(), hwnd);
    assert_eq!(window.native_instance(), instance());
    assert_eq!(window.width(), 640);
    assert!(!window.use_vsync());
    assert!(manager.contains_window(B));
    assert!(!manager.contains_window(A));
    assert_eq!(manager.window_ids(), vec![B]);
}

// ============================================================================
// Rollback
// ============================================================================

#[test]
fn test_failed_context_creation_rolls_back() {
    let (mut manager, observer) = setup();
    observer.fail_next(HeadlessCall::CreateContext);

    let err = manager
        .window_create(A, observer.create_window(), instance(), 800, 600)
        .unwrap_err();
    assert_eq!(err.kind(), GlErrorKind::ContextCreation);
    assert!(!manager.contains_window(A));
    assert_eq!(manager.display_count(), 0);
    assert_eq!(observer.leased_device_contexts(), 0);

    // The reserved slot was discarded, so the retry lands in group 0.
    create(&mut manager, &observer, A, 800, 600);
    assert_eq!(manager.window_display(A).unwrap().index(), 0);
}

#[test]
fn test_failed_format_negotiation_rolls_back() {
    let (mut manager, observer) = setup();

    let err = create_with(
        &mut manager,
        &observer,
        A,
        PixelFormatRequest::default().with_color_bits(0),
    )
    .unwrap_err();
    assert!(matches!(err, GlError::ContextCreation { window, .. } if window == A));
    assert_eq!(manager.display_count(), 0);
    assert_eq!(observer.leased_device_contexts(), 0);
}

#[test]
fn test_failed_format_apply_keeps_existing_group() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    observer.fail_next(HeadlessCall::ApplyPixelFormat);

    let err = manager
        .window_create(B, observer.create_window(), instance(), 640, 480)
        .unwrap_err();
    assert_eq!(err.kind(), GlErrorKind::ContextCreation);
    assert_eq!(manager.display_count(), 1);
    assert_eq!(manager.window_count(), 1);
    assert!(manager.get_hglrc(A).is_ok());
    assert_eq!(observer.leased_device_contexts(), 1);
}

#[test]
fn test_failed_rebind_after_context_creation_is_reported() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    manager.window_make_current(A).unwrap();
    invalidate_device_context(&manager, &observer, A);

    let err = create_with(&mut manager, &observer, B, incompatible()).unwrap_err();
    assert_eq!(err.kind(), GlErrorKind::ContextBind);
    assert!(matches!(err, GlError::ContextBind { window, .. } if window == A));
    assert!(!manager.contains_window(B));
    assert_eq!(manager.binder_state(), BinderState::Idle);
    assert_eq!(manager.display_count(), 2);
    assert_eq!(observer.leased_device_contexts(), 0);

    // The new group kept its context, so the retry creates nothing.
    let created = observer.stats().contexts_created;
    create_with(&mut manager, &observer, B, incompatible()).unwrap();
    assert_eq!(manager.window_display(B).unwrap().index(), 1);
    assert_eq!(observer.stats().contexts_created, created);
}

#[test]
fn test_failed_device_context_acquisition() {
    let (mut manager, observer) = setup();
    observer.fail_next(HeadlessCall::AcquireDeviceContext);

    let err = manager
        .window_create(A, observer.create_window(), instance(), 800, 600)
        .unwrap_err();
    assert_eq!(err.kind(), GlErrorKind::ContextCreation);
    assert_eq!(manager.window_count(), 0);
    assert_eq!(observer.stats().pixel_formats_chosen, 0);
}

// ============================================================================
// Binding
// ============================================================================

#[test]
fn test_repeated_make_current_binds_once() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    let before = observer.stats().make_current_calls;

    manager.window_make_current(A).unwrap();
    manager.window_make_current(A).unwrap();

    assert_eq!(observer.stats().make_current_calls, before + 1);
    assert_eq!(manager.binder_state(), BinderState::Bound(A));
}

#[test]
fn test_switching_windows_rebinds() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    create(&mut manager, &observer, B, 640, 480);

    manager.window_make_current(A).unwrap();
    manager.window_make_current(B).unwrap();

    assert_eq!(manager.current_window(), Some(B));
    let expected = (manager.get_hdc(B).unwrap(), manager.get_hglrc(B).unwrap());
    assert_eq!(observer.current(), Some(expected));
}

#[test]
fn test_release_current_is_idempotent() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    manager.window_make_current(A).unwrap();

    manager.release_current();
    assert_eq!(manager.binder_state(), BinderState::Idle);
    manager.release_current();
    assert_eq!(manager.binder_state(), BinderState::Idle);
    assert!(observer.current().is_none());
}

#[test]
fn test_failed_bind_leaves_binder_idle() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    create(&mut manager, &observer, B, 640, 480);
    manager.window_make_current(A).unwrap();
    observer.fail_next(HeadlessCall::MakeCurrent);

    let err = manager.window_make_current(B).unwrap_err();
    assert_eq!(err.kind(), GlErrorKind::ContextBind);
    assert_eq!(manager.binder_state(), BinderState::Idle);
    assert!(observer.current().is_none());
}

#[test]
fn test_make_current_recovers_after_foreign_release() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    manager.window_make_current(A).unwrap();

    // Foreign code clears the thread's context behind the manager's back.
    observer.clone().release_current().unwrap();
    assert!(observer.current().is_none());

    manager.make_current().unwrap();
    let expected = (manager.get_hdc(A).unwrap(), manager.get_hglrc(A).unwrap());
    assert_eq!(observer.current(), Some(expected));
}

// ============================================================================
// Presentation
// ============================================================================

#[test]
fn test_swap_buffers_requires_current_window() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);

    let err = manager.swap_buffers().unwrap_err();
    assert_eq!(err.kind(), GlErrorKind::InvalidState);
    assert_eq!(observer.stats().swap_buffers_calls, 0);

    manager.window_make_current(A).unwrap();
    manager.swap_buffers().unwrap();
    assert_eq!(observer.stats().swap_buffers_calls, 1);
}

#[test]
fn test_destroying_bound_window_unbinds() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    manager.window_make_current(A).unwrap();

    manager.window_destroy(A).unwrap();

    assert_eq!(manager.binder_state(), BinderState::Idle);
    assert!(observer.current().is_none());
    assert_eq!(observer.leased_device_contexts(), 0);
    assert_eq!(manager.swap_buffers().unwrap_err().kind(), GlErrorKind::InvalidState);
}

#[test]
fn test_destroying_other_window_keeps_binding() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    create(&mut manager, &observer, B, 640, 480);
    manager.window_make_current(A).unwrap();

    manager.window_destroy(B).unwrap();

    assert_eq!(manager.current_window(), Some(A));
    manager.swap_buffers().unwrap();
}

#[test]
fn test_failed_swap_is_reported() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    manager.window_make_current(A).unwrap();
    observer.fail_next(HeadlessCall::SwapBuffers);

    let err = manager.swap_buffers().unwrap_err();
    assert!(matches!(err, GlError::SwapBuffers { window, .. } if window == A));
    assert_eq!(err.kind(), GlErrorKind::Present);
    assert_eq!(manager.current_window(), Some(A));
}

// ============================================================================
// Vsync
// ============================================================================

#[test]
fn test_vsync_sets_interval_on_window_context() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    assert_eq!(manager.vsync_support(), VsyncSupport::Unknown);

    manager.set_use_vsync(A, true).unwrap();
    let context = manager.get_hglrc(A).unwrap();
    assert_eq!(observer.swap_interval(context), Some(1));
    assert_eq!(manager.vsync_support(), VsyncSupport::Supported);

    manager.set_use_vsync(A, false).unwrap();
    assert_eq!(observer.swap_interval(context), Some(0));
    assert!(!manager.is_using_vsync(A).unwrap());
    assert_eq!(observer.stats().swap_control_loads, 1);
}

#[test]
fn test_vsync_restores_idle_binding() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);

    manager.set_use_vsync(A, true).unwrap();

    assert_eq!(manager.binder_state(), BinderState::Idle);
    assert!(observer.current().is_none());
    assert_eq!(manager.current_swap_interval(), None);
}

#[test]
fn test_vsync_restores_previous_window() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    create_with(&mut manager, &observer, B, incompatible()).unwrap();
    manager.window_make_current(B).unwrap();

    manager.set_use_vsync(A, true).unwrap();

    assert_eq!(manager.current_window(), Some(B));
    let expected = (manager.get_hdc(B).unwrap(), manager.get_hglrc(B).unwrap());
    assert_eq!(observer.current(), Some(expected));
    assert_eq!(observer.swap_interval(manager.get_hglrc(A).unwrap()), Some(1));
    assert_eq!(observer.swap_interval(manager.get_hglrc(B).unwrap()), Some(0));
}

#[test]
fn test_vsync_reports_failed_restore() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    create_with(&mut manager, &observer, B, incompatible()).unwrap();
    manager.window_make_current(B).unwrap();
    invalidate_device_context(&manager, &observer, B);

    let err = manager.set_use_vsync(A, true).unwrap_err();
    assert_eq!(err.kind(), GlErrorKind::ContextBind);
    assert!(matches!(err, GlError::ContextBind { window, .. } if window == B));

    // The interval reached A's context before the restore failed.
    assert!(manager.is_using_vsync(A).unwrap());
    assert_eq!(observer.swap_interval(manager.get_hglrc(A).unwrap()), Some(1));
    assert_eq!(manager.current_window(), None);
    assert!(observer.current().is_none());
}

#[test]
fn test_rejected_swap_interval_keeps_setting() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    observer.fail_next(HeadlessCall::SwapInterval);

    manager.set_use_vsync(A, true).unwrap();

    assert!(!manager.is_using_vsync(A).unwrap());
    assert_eq!(manager.vsync_support(), VsyncSupport::Supported);
    assert_eq!(observer.swap_interval(manager.get_hglrc(A).unwrap()), Some(0));
    assert_eq!(manager.binder_state(), BinderState::Idle);

    manager.set_use_vsync(A, true).unwrap();
    assert!(manager.is_using_vsync(A).unwrap());
}

#[test]
fn test_vsync_on_current_window_keeps_it_current() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    manager.window_make_current(A).unwrap();
    let before = observer.stats().make_current_calls;

    manager.set_use_vsync(A, true).unwrap();

    assert_eq!(manager.current_window(), Some(A));
    assert_eq!(observer.stats().make_current_calls, before);
    assert_eq!(manager.current_swap_interval(), Some(1));
}

#[test]
fn test_missing_swap_control_is_a_noop() {
    let (mut manager, observer) = setup_with(
        HeadlessDriver::new().with_swap_control(false),
        GlConfig::default(),
    );
    create(&mut manager, &observer, A, 800, 600);

    manager.set_use_vsync(A, true).unwrap();
    manager.set_use_vsync(A, true).unwrap();

    assert!(!manager.is_using_vsync(A).unwrap());
    assert_eq!(manager.vsync_support(), VsyncSupport::Unsupported);
    assert_eq!(observer.stats().swap_control_loads, 1);
    assert_eq!(observer.stats().swap_interval_calls, 0);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_initialize_is_idempotent() {
    let (mut manager, observer) = setup();
    manager.initialize().unwrap();
    assert_eq!(observer.stats().probes, 1);
}

#[test]
fn test_drop_releases_native_resources() {
    let (mut manager, observer) = setup();
    create(&mut manager, &observer, A, 800, 600);
    create_with(&mut manager, &observer, B, incompatible()).unwrap();
    manager.window_destroy(A).unwrap();
    manager.window_make_current(B).unwrap();

    drop(manager);

    let stats = observer.stats();
    assert!(observer.current().is_none());
    assert_eq!(observer.live_contexts(), 0);
    assert_eq!(observer.leased_device_contexts(), 0);
    assert_eq!(stats.contexts_deleted, 2);
    assert_eq!(stats.device_contexts_released, 2);
}
