//! Integration tests: discovery, identity assignment and waits through the
//! public client API, against the in-memory driver.

use std::sync::Arc;
use std::time::Duration;

use xusb_lib::protocol::*;
use xusb_lib::transport::mock::{MockBus, MockDriver, MockSlot};
use xusb_lib::wire::{
    BUS_INFO_EX_LIST_SIZE, BusInfoEx, BusInfoExKind, Capabilities, InputStateV1, LedSetting,
    ProtocolVersion, SetStateFlags, SubDevice, Vibration, buttons,
};
use xusb_lib::{ClientOptions, Status, Xusb, XusbError};

const TIMEOUT: Duration = Duration::from_secs(5);

fn client(d: &Arc<MockDriver>) -> Xusb<MockDriver> {
    Xusb::new(Arc::clone(d), d.clone(), ClientOptions::default())
}

/// (user index, bus instance, index on bus) for every device.
fn assignments(x: &Xusb<MockDriver>) -> Vec<(u8, u8, u8)> {
    x.devices()
        .iter()
        .map(|d| (d.user_index(), d.bus_instance(), d.index_on_bus()))
        .collect()
}

#[test]
fn player_two_led_and_unreadable_led() {
    let d = Arc::new(
        MockDriver::new().with_bus(
            MockBus::new("bus0", ProtocolVersion::V1_1, 4)
                .with_slot(0, MockSlot::connected().with_led(LedSetting::Player2))
                .with_slot(2, MockSlot::connected().without_led()),
        ),
    );
    let x = client(&d);
    assert_eq!(assignments(&x), vec![(0, 0, 2), (1, 0, 0)]);
}

#[test]
fn same_led_pattern_on_two_buses() {
    let d = Arc::new(
        MockDriver::new()
            .with_bus(
                MockBus::new("bus0", ProtocolVersion::V1_0, 4)
                    .with_slot(0, MockSlot::connected().with_led(LedSetting::Player3)),
            )
            .with_bus(
                MockBus::new("bus1", ProtocolVersion::V1_1, 4)
                    .with_slot(0, MockSlot::connected().with_led(LedSetting::Player3)),
            ),
    );
    let x = client(&d);
    assert_eq!(assignments(&x), vec![(0, 1, 0), (2, 0, 0)]);
}

#[test]
fn hotplug_is_found_on_lookup() {
    let d = Arc::new(MockDriver::new());
    let x = client(&d);
    assert!(x.devices().is_empty());

    d.add_bus(
        MockBus::new("late", ProtocolVersion::V1_2, 4).with_slot(0, MockSlot::connected()),
    );
    assert!(x.input_state(0).unwrap().is_connected());

    d.remove_bus("late");
    x.refresh();
    let err = x.input_state(0).unwrap_err();
    assert!(matches!(err, XusbError::DeviceNotFound(0)));
    assert_eq!(d.open_handles(), 0);
}

#[test]
fn unplugged_bus_surfaces_transport_status() {
    let d = Arc::new(MockDriver::new().with_bus(
        MockBus::new("bus0", ProtocolVersion::V1_2, 4).with_slot(0, MockSlot::connected()),
    ));
    let x = client(&d);
    let dev = x.device(0).unwrap();
    d.remove_bus("bus0");
    // no refresh yet: the old snapshot still resolves, the driver refuses
    let err = dev.input_state().unwrap_err();
    assert_eq!(err.status(), Status::DEVICE_NOT_CONNECTED);
}

#[test]
fn set_state_and_read_back_led() {
    let d = Arc::new(MockDriver::new().with_bus(
        MockBus::new("bus0", ProtocolVersion::V1_1, 4).with_slot(0, MockSlot::connected()),
    ));
    let x = client(&d);
    x.set_state(
        0,
        LedSetting::Player4,
        Vibration::LEFT_FULL,
        SetStateFlags::ALL,
    )
    .unwrap();
    assert_eq!(x.led_state(0).unwrap().setting(), Some(LedSetting::Player4));
    assert_eq!(d.bus("bus0").unwrap().slots[&0].vibration, Vibration::LEFT_FULL);

    // the LED now says player 4, so the next refresh moves the device there
    x.refresh();
    assert_eq!(assignments(&x), vec![(3, 0, 0)]);
}

#[test]
fn capabilities_follow_bus_version() {
    let d = Arc::new(
        MockDriver::new()
            .with_bus(MockBus::new("a", ProtocolVersion::V1_0, 1).with_slot(0, MockSlot::connected()))
            .with_bus(MockBus::new("b", ProtocolVersion::V1_1, 1).with_slot(0, MockSlot::connected()))
            .with_bus(MockBus::new("c", ProtocolVersion::V1_4, 1).with_slot(0, MockSlot::connected())),
    );
    let x = client(&d);
    assert!(x.capabilities(0).unwrap().is_none());
    assert!(matches!(x.capabilities(1).unwrap(), Capabilities::V1_1(_)));
    match x.capabilities(2).unwrap() {
        Capabilities::V1_2(c) => assert_eq!(c.version, ProtocolVersion::V1_4.raw()),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn bus_info_ex_empty_reply() {
    let d = Arc::new(MockDriver::new().with_bus(MockBus::new("bus0", ProtocolVersion::V1_4, 4)));
    let x = client(&d);
    let info = x.bus_info_ex(0, BusInfoExKind::Full).unwrap();
    assert!(info.is_empty());
    assert!(info.raw().is_empty());
    assert!(info.minimal().is_err());
    assert!(info.basic().is_err());
    assert!(info.full().is_err());
}

#[test]
fn bus_info_ex_basic_reply() {
    let data = vec![0u8; BusInfoExKind::Basic.data_len()];
    let d = Arc::new(MockDriver::new().with_bus(
        MockBus::new("bus0", ProtocolVersion::V1_4, 4)
            .with_info_ex(BusInfoEx::new(ProtocolVersion::V1_4.raw(), false, data).unwrap()),
    ));
    let x = client(&d);
    let info = x.bus_info_ex(0, BusInfoExKind::Basic).unwrap();
    assert_eq!(info.kind(), Some(BusInfoExKind::Basic));
    assert_eq!(info.basic().unwrap().len(), BUS_INFO_EX_LIST_SIZE);
    assert!(info.minimal().is_err());
}

#[test]
fn guide_wait_end_to_end() {
    let d = Arc::new(MockDriver::new().with_bus(
        MockBus::new("bus0", ProtocolVersion::V1_2, 4).with_slot(0, MockSlot::connected()),
    ));
    let x = client(&d);
    let t = x.wait_for_guide_async(0);
    assert!(d.wait_for_pending(1, TIMEOUT));

    // second wait on the same user index is busy
    let busy = x.wait_for_guide(0).unwrap_err();
    assert_eq!(busy.status(), Status::OPERATION_IN_PROGRESS);

    let mut reply = InputStateV1 {
        version: 0x0102,
        status: 1,
        ..Default::default()
    };
    reply.gamepad.standard.buttons = buttons::GUIDE | buttons::A;
    d.complete_pending(Ok(reply.encode().to_vec()));

    let state = t.join().unwrap().unwrap();
    assert!(state.gamepad().is_pressed(buttons::GUIDE));
    assert!(state.gamepad().is_pressed(buttons::A));
    assert!(!x.is_waiting(0));
}

#[test]
fn cancel_idle_wait_is_noop() {
    let d = Arc::new(MockDriver::new());
    let x = client(&d);
    x.cancel_wait(0);
    x.cancel_all_waits();
    assert!(!x.is_waiting(0));
}

#[test]
fn battery_request_is_sent_on_sync_handle() {
    let d = Arc::new(MockDriver::new().with_bus(
        MockBus::new("bus0", ProtocolVersion::V1_3, 4).with_slot(1, MockSlot::connected()),
    ));
    let x = client(&d);
    x.battery_info(0, SubDevice::Headset).unwrap();
    let req = d.requests_for(IOCTL_DEVICE_GET_BATTERY_INFORMATION).remove(0);
    assert!(!req.overlapped);
    assert_eq!(req.input, vec![0x02, 0x01, 1, 1]);
}
