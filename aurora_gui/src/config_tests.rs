//! Unit tests for PresenterConfig

use crate::aurora::{Error, PresenterConfig};

#[test]
fn test_default_config_is_valid() {
    let config = PresenterConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.frames_in_flight, 2);
    assert_eq!(config.desired_image_count, 3);
    assert!(config.vsync);
}

#[test]
fn test_zero_frames_in_flight_rejected() {
    let config = PresenterConfig {
        frames_in_flight: 0,
        ..PresenterConfig::default()
    };
    assert!(matches!(config.validate(), Err(Error::InitializationFailed(_))));
}

#[test]
fn test_zero_image_count_rejected() {
    let config = PresenterConfig {
        desired_image_count: 0,
        ..PresenterConfig::default()
    };
    assert!(matches!(config.validate(), Err(Error::InitializationFailed(_))));
}

#[test]
fn test_zero_fence_timeout_rejected() {
    let config = PresenterConfig {
        fence_timeout_ns: 0,
        ..PresenterConfig::default()
    };
    assert!(matches!(config.validate(), Err(Error::InitializationFailed(_))));
}

#[test]
fn test_slot_count_independent_of_image_count() {
    // Two in flight with four images is a legal combination.
    let config = PresenterConfig {
        frames_in_flight: 2,
        desired_image_count: 4,
        ..PresenterConfig::default()
    };
    assert!(config.validate().is_ok());
}
