//! Integration tests for device resolution and kernel driver binding
//!
//! Drives the public API end to end against the mock backend:
//! - Listing output
//! - Detach and reattach sessions
//! - Device-not-found handling
//! - Session cleanup on failure
//! - Shared device ownership across snapshots

use binding::test_utils::{MockBackend, MockCall, MockDevice};
use binding::{
    AttachSpec, Context, DeviceSnapshot, DriverAction, Error, Field, Operation,
    apply_driver_action, list_devices,
};

fn two_device_context(first: &MockDevice, second: &MockDevice) -> Context<MockBackend> {
    Context::with_backend(MockBackend::with_devices(vec![first.clone(), second.clone()]))
}

mod listing {
    use super::*;

    #[test]
    fn test_list_two_devices_in_enumeration_order() {
        let first = MockDevice::new(1, 1, 3);
        let second = MockDevice::new(1, 2, 4);
        let context = two_device_context(&first, &second);
        let snapshot = context.list_devices().unwrap();

        let mut out: Vec<u8> = Vec::new();
        list_devices(&snapshot, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec!["Device: bus=1 port=1 addr=3", "Device: bus=1 port=2 addr=4"]
        );
        // Listing never opens a device
        assert!(first.calls().is_empty());
        assert!(second.calls().is_empty());
    }

    #[test]
    fn test_unsorted_enumeration_is_kept() {
        let first = MockDevice::new(3, 1, 20);
        let second = MockDevice::new(1, 4, 2);
        let context = two_device_context(&first, &second);
        let snapshot = context.list_devices().unwrap();

        let mut out: Vec<u8> = Vec::new();
        list_devices(&snapshot, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Device: bus=3 port=1 addr=20\n"));
    }

    #[test]
    fn test_enumeration_failure() {
        let backend = MockBackend::new();
        backend.fail_listing(rusb::Error::Io);
        let context = Context::with_backend(backend);

        let err = context.list_devices().err().unwrap();
        assert!(err.to_string().contains("LIBUSB_ERROR_IO"));
    }
}

mod driver_actions {
    use super::*;

    #[test]
    fn test_detach_scenario() {
        let target = MockDevice::new(1, 1, 3);
        let other = MockDevice::new(1, 2, 4);
        let context = two_device_context(&target, &other);
        let snapshot = context.list_devices().unwrap();

        let spec = AttachSpec::parse("1", "3", "0").unwrap();
        apply_driver_action(&snapshot, &spec, DriverAction::Detach).unwrap();

        assert_eq!(
            target.calls(),
            vec![
                MockCall::Open,
                MockCall::DetachKernelDriver(0),
                MockCall::Close
            ]
        );
        assert!(other.calls().is_empty());
        assert_eq!(target.open_handles(), 0);
    }

    #[test]
    fn test_reattach_scenario() {
        let target = MockDevice::new(2, 1, 5);
        let context = Context::with_backend(MockBackend::with_devices(vec![target.clone()]));
        let snapshot = context.list_devices().unwrap();

        let spec = AttachSpec::parse("2", "5", "1").unwrap();
        apply_driver_action(&snapshot, &spec, DriverAction::Reattach).unwrap();

        assert_eq!(
            target.calls(),
            vec![
                MockCall::Open,
                MockCall::AttachKernelDriver(1),
                MockCall::Close
            ]
        );
    }

    #[test]
    fn test_missing_device_opens_nothing() {
        let first = MockDevice::new(1, 1, 3);
        let second = MockDevice::new(1, 2, 4);
        let context = two_device_context(&first, &second);
        let snapshot = context.list_devices().unwrap();

        let spec = AttachSpec::parse("9", "9", "0").unwrap();
        let err = apply_driver_action(&snapshot, &spec, DriverAction::Detach).unwrap_err();

        assert!(matches!(err, Error::DeviceNotFound { bus: 9, address: 9 }));
        assert!(first.calls().is_empty());
        assert!(second.calls().is_empty());
    }

    /// Parse then act, stopping at the first error like the command front end
    fn detach_from_text(
        snapshot: &DeviceSnapshot<'_, MockDevice>,
        bus: &str,
        address: &str,
        interface: &str,
    ) -> binding::Result<()> {
        let spec = AttachSpec::parse(bus, address, interface)?;
        apply_driver_action(snapshot, &spec, DriverAction::Detach)
    }

    #[test]
    fn test_invalid_bus_fails_before_matching() {
        let target = MockDevice::new(1, 1, 3);
        let context = Context::with_backend(MockBackend::with_devices(vec![target.clone()]));
        let snapshot = context.list_devices().unwrap();

        let err = detach_from_text(&snapshot, "abc", "3", "0").unwrap_err();
        assert!(target.calls().is_empty());
        assert_eq!(target.open_handles(), 0);
        match &err {
            Error::Validation { fields } => assert_eq!(fields.as_slice(), &[Field::Bus]),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("busID"));
    }

    #[test]
    fn test_permission_denied_on_open() {
        let target = MockDevice::new(1, 1, 3);
        target.fail_open(rusb::Error::Access);
        let context = Context::with_backend(MockBackend::with_devices(vec![target.clone()]));
        let snapshot = context.list_devices().unwrap();

        let err = apply_driver_action(&snapshot, &AttachSpec::new(1, 3, 0), DriverAction::Detach)
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Subsystem {
                operation: Operation::Open,
                ..
            }
        ));
        assert_eq!(target.calls(), vec![MockCall::Open]);
    }

    #[test]
    fn test_already_detached_closes_session() {
        let target = MockDevice::new(1, 1, 3);
        target.fail_detach(rusb::Error::NotFound);
        let context = Context::with_backend(MockBackend::with_devices(vec![target.clone()]));
        let snapshot = context.list_devices().unwrap();

        let err = apply_driver_action(&snapshot, &AttachSpec::new(1, 3, 0), DriverAction::Detach)
            .unwrap_err();

        assert_eq!(err.native(), Some(rusb::Error::NotFound));
        assert!(!err.is_not_found());
        assert_eq!(target.open_handles(), 0);
        assert_eq!(target.calls().last(), Some(&MockCall::Close));
    }

    #[test]
    fn test_duplicate_address_selects_first() {
        let first = MockDevice::new(1, 1, 3);
        let duplicate = MockDevice::new(1, 7, 3);
        let context = two_device_context(&first, &duplicate);
        let snapshot = context.list_devices().unwrap();

        apply_driver_action(&snapshot, &AttachSpec::new(1, 3, 0), DriverAction::Detach).unwrap();

        assert_eq!(first.calls().len(), 3);
        assert!(duplicate.calls().is_empty());
    }
}

mod ownership {
    use super::*;

    #[test]
    fn test_copy_survives_snapshot_drop() {
        let mock = MockDevice::new(1, 1, 3);
        let probe = mock.release_probe();
        let context = Context::with_backend(MockBackend::with_devices(vec![mock]));

        let copy = {
            let snapshot = context.list_devices().unwrap();
            snapshot.iter().next().unwrap().clone()
        };
        assert_eq!(copy.bus_number(), 1);
        assert_eq!(copy.device_address(), 3);
        assert_eq!(probe.releases(), 0);

        drop(copy);
        drop(context);
        assert_eq!(probe.releases(), 1);
    }

    #[test]
    fn test_snapshot_does_not_see_later_devices() {
        let first = MockDevice::new(1, 1, 3);
        let context = Context::with_backend(MockBackend::with_devices(vec![first]));

        let before = context.list_devices().unwrap();
        context.backend().add_device(MockDevice::new(1, 2, 4));
        let after = context.list_devices().unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 2);

        let spec = AttachSpec::new(1, 4, 0);
        assert!(before.resolve(&spec).unwrap_err().is_not_found());
        assert_eq!(after.resolve(&spec).unwrap().port_number(), 2);
    }

    #[test]
    fn test_independent_snapshots_share_device() {
        let mock = MockDevice::new(1, 1, 3);
        let context = Context::with_backend(MockBackend::with_devices(vec![mock.clone()]));

        let first = context.list_devices().unwrap();
        let second = context.list_devices().unwrap();
        assert_eq!(context.backend().listings(), 2);
        // test handle + backend + two snapshots
        assert_eq!(mock.ref_count(), 4);

        drop(first);
        assert_eq!(mock.ref_count(), 3);
        drop(second);
        assert_eq!(mock.ref_count(), 2);
    }
}
