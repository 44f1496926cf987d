//! Unit tests for command_recorder.rs

use crate::renderer::mock_device::MockDevice;
use crate::renderer::CommandRecorder;

// ============================================================================
// SETUP BUFFER TESTS
// ============================================================================

#[test]
fn test_new_begins_setup_buffer() {
    let device = MockDevice::new();
    let recorder = CommandRecorder::new(&device).unwrap();

    let setup = recorder.setup_buffer().unwrap();
    let commands = device.commands();
    assert_eq!(commands[0], "allocate_command_buffers(1)");
    assert_eq!(commands[1], format!("begin_command_buffer({})", setup.0));
    assert_eq!(commands[2], "allocate_command_buffers(2)");

    // setup + pre-present + post-present
    assert_eq!(device.live_command_buffer_count(), 3);
    assert_ne!(recorder.pre_present_buffer(), recorder.post_present_buffer());
}

#[test]
fn test_flush_setup_ends_submits_waits_and_frees() {
    let device = MockDevice::new();
    let mut recorder = CommandRecorder::new(&device).unwrap();
    let setup = recorder.setup_buffer().unwrap();
    device.clear_commands();

    recorder.flush_setup(&device).unwrap();

    assert_eq!(
        device.commands(),
        vec![
            format!("end_command_buffer({})", setup.0),
            format!("queue_submit({})", setup.0),
            "queue_wait_idle".to_string(),
            format!("free_command_buffers({})", setup.0),
        ]
    );
    assert!(recorder.setup_buffer().is_none());
    assert_eq!(device.live_command_buffer_count(), 2);

    // Submitted without semaphores
    let submits = device.submits();
    assert!(submits[0].waits.is_empty());
    assert!(submits[0].signals.is_empty());
}

#[test]
fn test_flush_setup_twice_is_noop() {
    let device = MockDevice::new();
    let mut recorder = CommandRecorder::new(&device).unwrap();
    recorder.flush_setup(&device).unwrap();
    device.clear_commands();

    recorder.flush_setup(&device).unwrap();
    assert!(device.commands().is_empty());
}

#[test]
fn test_flush_setup_frees_buffer_on_submit_failure() {
    let device = MockDevice::new();
    let mut recorder = CommandRecorder::new(&device).unwrap();
    device.fail_next_submit(crate::error::Error::DeviceLost("submit".to_string()));

    assert!(recorder.flush_setup(&device).is_err());
    assert!(recorder.setup_buffer().is_none());
    assert_eq!(device.live_command_buffer_count(), 2);
}

#[test]
fn test_begin_setup_after_flush_allocates_new_buffer() {
    let device = MockDevice::new();
    let mut recorder = CommandRecorder::new(&device).unwrap();
    let first = recorder.setup_buffer().unwrap();
    recorder.flush_setup(&device).unwrap();

    let second = recorder.begin_setup(&device).unwrap();
    assert_ne!(first, second);
    assert_eq!(recorder.setup_buffer(), Some(second));

    // Already recording: same buffer
    assert_eq!(recorder.begin_setup(&device).unwrap(), second);
}

// ============================================================================
// DRAW BUFFER TESTS
// ============================================================================

#[test]
fn test_draw_buffers_allocated_once_then_reset() {
    let device = MockDevice::new();
    let mut recorder = CommandRecorder::new(&device).unwrap();
    device.clear_commands();

    let first = recorder.draw_buffer(&device, 0, 3).unwrap();
    assert_eq!(device.commands(), vec!["allocate_command_buffers(3)".to_string()]);
    assert_eq!(recorder.draw_buffer_count(), 3);
    device.clear_commands();

    let again = recorder.draw_buffer(&device, 0, 3).unwrap();
    assert_eq!(first, again);
    assert_eq!(device.commands(), vec![format!("reset_command_buffer({})", first.0)]);

    let other = recorder.draw_buffer(&device, 2, 3).unwrap();
    assert_ne!(first, other);
}

#[test]
fn test_draw_buffers_reallocated_when_image_count_changes() {
    let device = MockDevice::new();
    let mut recorder = CommandRecorder::new(&device).unwrap();
    recorder.flush_setup(&device).unwrap();

    recorder.draw_buffer(&device, 0, 3).unwrap();
    assert_eq!(device.live_command_buffer_count(), 2 + 3);

    recorder.draw_buffer(&device, 1, 2).unwrap();
    assert_eq!(recorder.draw_buffer_count(), 2);
    assert_eq!(device.live_command_buffer_count(), 2 + 2);
}

#[test]
fn test_draw_buffer_index_out_of_range() {
    let device = MockDevice::new();
    let mut recorder = CommandRecorder::new(&device).unwrap();
    assert!(recorder.draw_buffer(&device, 3, 3).is_err());
    assert_eq!(recorder.draw_buffer_count(), 0);
}

// ============================================================================
// DESTROY TESTS
// ============================================================================

#[test]
fn test_destroy_frees_everything_once() {
    let device = MockDevice::new();
    let mut recorder = CommandRecorder::new(&device).unwrap();
    recorder.draw_buffer(&device, 0, 3).unwrap();

    recorder.destroy(&device);
    assert_eq!(device.live_command_buffer_count(), 0);
    assert_eq!(recorder.draw_buffer_count(), 0);

    device.clear_commands();
    recorder.destroy(&device);
    assert!(device.commands().is_empty());
}
