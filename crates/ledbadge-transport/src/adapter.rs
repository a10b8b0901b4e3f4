//! A concrete [`ledbadge_core::Transport`] backed by `btleplug`, mapping
//! the four logical endpoints onto real GATT characteristics.
//!
//! This adapter is intentionally outside the protocol core's dependency
//! graph (`ledbadge-core`/`ledbadge-client` know nothing of `btleplug`):
//! it depends on `ledbadge-core`, never the other way around, so the
//! protocol stack stays testable against the in-memory harness in
//! `ledbadge_core::transport::test_support` without pulling in real
//! Bluetooth stack dependencies.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use btleplug::{
    api::{Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType},
    platform::{Adapter, Manager, Peripheral},
};
use bytes::Bytes;
use futures::StreamExt;
use ledbadge_core::{Endpoint, NotifyEndpoint, Transport};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    error::{Result, TransportError},
    uuids,
};

/// How to pick the badge peripheral out of everything a BLE scan turns up.
#[derive(Debug, Clone)]
pub enum DeviceFilter {
    /// Match on the advertised local name (case-sensitive substring).
    Name(String),
    /// Match on the platform-reported device address string.
    Address(String),
}

impl DeviceFilter {
    async fn matches(&self, peripheral: &Peripheral) -> bool {
        match self {
            Self::Name(want) => peripheral
                .properties()
                .await
                .ok()
                .flatten()
                .and_then(|p| p.local_name)
                .is_some_and(|name| name.contains(want.as_str())),
            Self::Address(want) => peripheral.address().to_string().eq_ignore_ascii_case(want),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Name(n) => format!("name contains {n:?}"),
            Self::Address(a) => format!("address {a}"),
        }
    }
}

/// How long to scan for an adapter's first matching advertisement before
/// giving up with [`TransportError::DeviceNotFound`].
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// One write-capable GATT characteristic, adapted to [`Endpoint`].
struct GattEndpoint {
    peripheral: Peripheral,
    characteristic: Characteristic,
    write_type: WriteType,
}

#[async_trait]
impl Endpoint for GattEndpoint {
    async fn write(&self, bytes: &[u8]) -> ledbadge_core::Result<()> {
        self.peripheral.write(&self.characteristic, bytes, self.write_type).await.map_err(|err| {
            ledbadge_core::CoreError::Unavailable(format!(
                "GATT write to {} failed: {err}",
                self.characteristic.uuid
            ))
        })
    }

    fn prefers_without_response(&self) -> bool {
        matches!(self.write_type, WriteType::WithoutResponse)
    }
}

/// A connected badge link: the [`Transport`] handle the protocol core
/// drives, plus the background notification-forwarding task's handle.
pub struct BadgeLink {
    /// Shared transport, ready to be wrapped in a
    /// [`ledbadge_core::NotificationBus`].
    pub transport: Arc<Transport>,
    forwarder: tokio::task::JoinHandle<()>,
}

impl Drop for BadgeLink {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// Scan for a peripheral matching `filter` on the first available
/// adapter, connect, discover services, resolve every characteristic in
/// the endpoint table below, and wire up notification forwarding.
///
/// # Errors
///
/// Returns [`TransportError::NoAdapter`] if the host has no Bluetooth
/// adapter, [`TransportError::DeviceNotFound`] if no advertisement
/// matching `filter` arrives within `scan_timeout`, and
/// [`TransportError::CharacteristicNotFound`] if the connected peripheral
/// is missing one of the expected characteristics (it is not a
/// conforming badge).
pub async fn connect(filter: DeviceFilter, scan_timeout: Duration) -> Result<BadgeLink> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    let adapter = adapters.into_iter().next().ok_or(TransportError::NoAdapter)?;

    let peripheral = scan_for(&adapter, &filter, scan_timeout).await?;
    peripheral.connect().await?;
    peripheral.discover_services().await?;

    let characteristics = peripheral.characteristics();
    let by_uuid: HashMap<Uuid, Characteristic> =
        characteristics.into_iter().map(|c| (c.uuid, c)).collect();

    let find = |endpoint: &'static str, uuid: Uuid| -> Result<Characteristic> {
        by_uuid
            .get(&uuid)
            .cloned()
            .ok_or_else(|| TransportError::CharacteristicNotFound { endpoint, uuid: uuid.to_string() })
    };

    let data_write_char = find("Data-W", uuids::DATA_WRITE)?;
    // Some boards expose the Ctrl-W characteristic at FD04 instead of FD02;
    // take whichever is present rather than hard-failing on the primary.
    let ctrl_write_char = match by_uuid.get(&uuids::CTRL_WRITE_PRIMARY) {
        Some(characteristic) => characteristic.clone(),
        None => find("Ctrl-W", uuids::CTRL_WRITE_SECONDARY)?,
    };
    let data_notify_char = find("Data-N", uuids::DATA_NOTIFY)?;
    let ctrl_info_char = find("Ctrl-N (info)", uuids::CTRL_NOTIFY_INFO)?;
    let ctrl_ready_char = find("Ctrl-N (ready)", uuids::CTRL_NOTIFY_READY)?;
    let ctrl_other_char = find("Ctrl-N (other)", uuids::CTRL_NOTIFY_OTHER)?;

    for characteristic in [&data_notify_char, &ctrl_info_char, &ctrl_ready_char, &ctrl_other_char] {
        peripheral.subscribe(characteristic).await?;
    }

    let data_write_type = write_type_for(&data_write_char);
    let ctrl_write_type = write_type_for(&ctrl_write_char);

    let data_write: Arc<dyn Endpoint> = Arc::new(GattEndpoint {
        peripheral: peripheral.clone(),
        characteristic: data_write_char,
        write_type: data_write_type,
    });
    let ctrl_write: Arc<dyn Endpoint> = Arc::new(GattEndpoint {
        peripheral: peripheral.clone(),
        characteristic: ctrl_write_char,
        write_type: ctrl_write_type,
    });

    let (transport, tx) = Transport::new(data_write, ctrl_write);
    let transport = Arc::new(transport);

    let notify_map: HashMap<Uuid, NotifyEndpoint> = HashMap::from([
        (data_notify_char.uuid, NotifyEndpoint::Data),
        (ctrl_info_char.uuid, NotifyEndpoint::CtrlInfo),
        (ctrl_ready_char.uuid, NotifyEndpoint::CtrlReady),
        (ctrl_other_char.uuid, NotifyEndpoint::CtrlOther),
    ]);

    let forwarder = spawn_notification_forwarder(peripheral, notify_map, tx).await?;

    Ok(BadgeLink { transport, forwarder })
}

fn write_type_for(characteristic: &Characteristic) -> WriteType {
    use btleplug::api::CharPropFlags;
    if characteristic.properties.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE) {
        WriteType::WithoutResponse
    } else {
        WriteType::WithResponse
    }
}

async fn scan_for(adapter: &Adapter, filter: &DeviceFilter, scan_timeout: Duration) -> Result<Peripheral> {
    adapter.start_scan(ScanFilter::default()).await?;

    let deadline = tokio::time::Instant::now() + scan_timeout;
    loop {
        for peripheral in adapter.peripherals().await? {
            if filter.matches(&peripheral).await {
                adapter.stop_scan().await.ok();
                return Ok(peripheral);
            }
        }
        if tokio::time::Instant::now() >= deadline {
            adapter.stop_scan().await.ok();
            return Err(TransportError::DeviceNotFound { filter: filter.describe() });
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

/// Spawn the task that drains `peripheral`'s merged notification stream
/// and forwards each payload, tagged by which logical endpoint its
/// characteristic backs, into `tx` — the channel
/// [`ledbadge_core::NotificationBus::spawn`] takes ownership of on the
/// other side.
async fn spawn_notification_forwarder(
    peripheral: Peripheral,
    notify_map: HashMap<Uuid, NotifyEndpoint>,
    tx: mpsc::Sender<(NotifyEndpoint, Bytes)>,
) -> Result<tokio::task::JoinHandle<()>> {
    let mut stream = peripheral.notifications().await?;
    Ok(tokio::spawn(async move {
        while let Some(data) = stream.next().await {
            let Some(&endpoint) = notify_map.get(&data.uuid) else {
                tracing::debug!(uuid = %data.uuid, "notification from unmapped characteristic, dropping");
                continue;
            };
            if tx.send((endpoint, Bytes::from(data.value))).await.is_err() {
                tracing::debug!("notification bus gone, stopping forwarder");
                break;
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::DeviceFilter;

    // Scanning and GATT discovery need a real adapter and peripheral, so
    // only the pure filter-description logic is unit tested here; the
    // connect() path is exercised against real hardware, not in CI.

    #[test]
    fn describe_formats_name_filter() {
        let filter = DeviceFilter::Name("LED-Badge".to_owned());
        assert_eq!(filter.describe(), "name contains \"LED-Badge\"");
    }

    #[test]
    fn describe_formats_address_filter() {
        let filter = DeviceFilter::Address("AA:BB:CC:DD:EE:FF".to_owned());
        assert_eq!(filter.describe(), "address AA:BB:CC:DD:EE:FF");
    }
}
