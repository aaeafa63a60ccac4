use std::sync::Arc;

use tokio::{select, sync::mpsc};
use uuid::Uuid;

use ble_peripheral_rust::{
    Peripheral, PeripheralImpl,
    gatt::peripheral_event::{
        PeripheralEvent, ReadRequestResponse, RequestResponse, WriteRequestResponse,
    },
    uuid::ShortUuid,
};

use crate::consts::*;
use crate::error::{AttError, AttStatus};
use crate::input::KeyEvent;
use crate::service::{AttributeId, KeyboardService, Notification};
use crate::services::{
    StaticValues, advertised_services, build_battery_service, build_device_info_service,
    build_hid_service,
};

/// Bring-up parameters for the peripheral.
#[derive(Clone, Debug)]
pub struct BleConfig {
    pub device_name: String,
    pub appearance: Option<u16>,
    pub statics: StaticValues,
}

/// Returns the 16-bit assigned number of a Bluetooth base UUID.
pub fn short_uuid(uuid: Uuid) -> Option<u16> {
    let v = u16::try_from(uuid.as_fields().0).ok()?;
    (Uuid::from_short(v) == uuid).then_some(v)
}

// The stack addresses characteristics by UUID only, so the input and output
// Report characteristics share 0x2A4D. Input is read-only and output is the
// only writable one, which makes the request kind enough to tell them apart.

pub fn read_target(characteristic: Uuid) -> Option<AttributeId> {
    Some(match short_uuid(characteristic)? {
        UUID_HID_INFO => AttributeId::HidInformation,
        UUID_HID_REPORT_MAP => AttributeId::ReportMap,
        UUID_HID_CONTROL_POINT => AttributeId::ControlPoint,
        UUID_HID_PROTOCOL_MODE => AttributeId::ProtocolMode,
        UUID_HID_REPORT => AttributeId::InputReport,
        UUID_BOOT_KEYBOARD_INPUT => AttributeId::BootInputReport,
        UUID_BOOT_KEYBOARD_OUTPUT => AttributeId::BootOutputReport,
        _ => return None,
    })
}

pub fn write_target(characteristic: Uuid) -> Option<AttributeId> {
    Some(match short_uuid(characteristic)? {
        UUID_HID_INFO => AttributeId::HidInformation,
        UUID_HID_REPORT_MAP => AttributeId::ReportMap,
        UUID_HID_CONTROL_POINT => AttributeId::ControlPoint,
        UUID_HID_PROTOCOL_MODE => AttributeId::ProtocolMode,
        UUID_HID_REPORT => AttributeId::OutputReport,
        UUID_BOOT_KEYBOARD_INPUT => AttributeId::BootInputReport,
        UUID_BOOT_KEYBOARD_OUTPUT => AttributeId::BootOutputReport,
        _ => return None,
    })
}

pub fn subscription_target(characteristic: Uuid) -> Option<AttributeId> {
    match short_uuid(characteristic)? {
        UUID_HID_REPORT => Some(AttributeId::InputClientConfig),
        UUID_BOOT_KEYBOARD_INPUT => Some(AttributeId::BootClientConfig),
        _ => None,
    }
}

pub fn to_response(status: AttStatus) -> RequestResponse {
    match status {
        AttStatus::Success => RequestResponse::Success,
        AttStatus::InvalidOffset => RequestResponse::InvalidOffset,
        AttStatus::UnlikelyError => RequestResponse::UnlikelyError,
        AttStatus::ReadNotPermitted | AttStatus::RequestNotSupported => {
            RequestResponse::RequestNotSupported
        }
    }
}

async fn send_notification(peripheral: &mut Peripheral, n: Notification) {
    tracing::trace!(uuid = %format!("{:#06x}", n.characteristic()), value = ?n.value, "TX report");
    if let Err(e) = peripheral
        .update_characteristic(Uuid::from_short(n.characteristic()), n.value.to_vec().into())
        .await
    {
        // No retry and no queue: the report is dropped.
        tracing::warn!(error = %AttError::TransportWriteFailure, cause = %format!("{e:#}"), "Notification dropped");
    }
}

pub async fn ble_owner_task(
    keyboard: Arc<KeyboardService>,
    mut key_rx: mpsc::Receiver<KeyEvent>,
    mut evt_rx: mpsc::Receiver<PeripheralEvent>,
    evt_tx: mpsc::Sender<PeripheralEvent>,
    config: BleConfig,
) -> anyhow::Result<()> {
    let services = [
        build_hid_service(),
        build_battery_service(config.statics.battery_level),
        build_device_info_service(&config.statics),
    ];
    let advertised = advertised_services();

    let mut peripheral = Peripheral::new(evt_tx).await?;

    // Backoff until powered
    let mut delay_ms = 50u64;
    loop {
        if peripheral.is_powered().await? {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        delay_ms = (delay_ms * 2).min(1000);
    }

    for service in &services {
        peripheral.add_service(service).await?;
    }

    peripheral
        .start_advertising(&config.device_name, &advertised, config.appearance)
        .await?;
    let mut advertising = true;
    tracing::info!("Advertising {}", &config.device_name);

    loop {
        select! {
            ev = evt_rx.recv() => {
                match ev {
                    Some(PeripheralEvent::StateUpdate { is_powered }) => {
                        tracing::info!(%is_powered, "Adapter powered");
                        if is_powered && !advertising {
                            if let Err(e) = peripheral
                                .start_advertising(&config.device_name, &advertised, config.appearance)
                                .await
                            {
                                tracing::error!(error = %format!("{e:#}"), "advertise start error");
                            } else {
                                advertising = true;
                            }
                        } else if !is_powered && advertising {
                            if let Err(e) = peripheral.stop_advertising().await {
                                tracing::error!(error = %format!("{e:#}"), "advertise stop error");
                            }
                            advertising = false;
                        }
                    }
                    Some(PeripheralEvent::CharacteristicSubscriptionUpdate { request, subscribed }) => {
                        match subscription_target(request.characteristic) {
                            Some(cccd) => {
                                keyboard.set_notifications(cccd, subscribed);
                                tracing::info!(%subscribed, ?cccd, "Report notify");
                            }
                            None => tracing::debug!(%subscribed, ?request, "Other subscription"),
                        }
                    }
                    Some(PeripheralEvent::ReadRequest { request, offset, responder }) => {
                        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
                        let mut value = Vec::new();
                        let status = match read_target(request.characteristic) {
                            Some(attr) => keyboard.handle_read(attr, offset, &mut value),
                            None => match config.statics.read(request.characteristic, offset) {
                                Some(Ok(v)) => {
                                    value = v;
                                    AttStatus::Success
                                }
                                Some(Err(e)) => e.status(),
                                None => {
                                    tracing::debug!(?request, "Read of unknown characteristic");
                                    AttStatus::RequestNotSupported
                                }
                            },
                        };
                        let sent = responder.send(ReadRequestResponse {
                            value: value.into(),
                            response: to_response(status),
                        });
                        if sent.is_err() {
                            tracing::warn!(?request, error = %AttError::TransportWriteFailure, "Read response dropped");
                        }
                    }
                    Some(PeripheralEvent::WriteRequest { request, offset, value, responder }) => {
                        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
                        let status = match write_target(request.characteristic) {
                            Some(attr) => keyboard.handle_write(attr, offset, &value),
                            None => {
                                tracing::debug!(?request, "Write to unknown characteristic");
                                AttStatus::RequestNotSupported
                            }
                        };
                        let sent = responder.send(WriteRequestResponse { response: to_response(status) });
                        if sent.is_err() {
                            tracing::warn!(?request, error = %AttError::TransportWriteFailure, "Write response dropped");
                        }
                    }
                    None => break,
                }
            }
            key = key_rx.recv() => {
                let Some(key) = key else { break };
                if let Some(n) = keyboard.on_key_event(key) {
                    send_notification(&mut peripheral, n).await;
                }
            }
        }
    }

    peripheral.stop_advertising().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_uuid_only_matches_base_uuids() {
        assert_eq!(short_uuid(Uuid::from_short(UUID_HID_REPORT)), Some(0x2A4D));
        assert_eq!(short_uuid(Uuid::nil()), None);
        assert_eq!(short_uuid(Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0)), None);
    }

    #[test]
    fn report_uuid_resolves_by_request_kind() {
        let report = Uuid::from_short(UUID_HID_REPORT);
        assert_eq!(read_target(report), Some(AttributeId::InputReport));
        assert_eq!(write_target(report), Some(AttributeId::OutputReport));
        assert_eq!(subscription_target(report), Some(AttributeId::InputClientConfig));
        assert_eq!(
            subscription_target(Uuid::from_short(UUID_BOOT_KEYBOARD_INPUT)),
            Some(AttributeId::BootClientConfig)
        );
        assert_eq!(read_target(Uuid::from_short(UUID_BATTERY_LEVEL)), None);
    }

    #[test]
    fn status_maps_to_stack_response() {
        assert!(matches!(to_response(AttStatus::InvalidOffset), RequestResponse::InvalidOffset));
        assert!(matches!(
            to_response(AttStatus::ReadNotPermitted),
            RequestResponse::RequestNotSupported
        ));
        assert!(matches!(to_response(AttStatus::UnlikelyError), RequestResponse::UnlikelyError));
    }
}
