// VitalsWatch: Bluedroid GATT Server
//
// One primary service with seven read+notify characteristics, each followed
// by its CCCD.  Bluedroid appends a descriptor to the most recently added
// characteristic, so the attribute table is built one characteristic at a
// time: characteristic -> CCCD -> next characteristic.
//
// Callbacks run on the Bluedroid task; the polling cycle only calls
// `set_and_notify`.  Both sides meet in `State` behind a mutex.

use std::sync::{Arc, Mutex, MutexGuard};

use enumset::enum_set;
use esp_idf_svc::bt::ble::gap::{AdvConfiguration, BleGapEvent, EspBleGap};
use esp_idf_svc::bt::ble::gatt::server::{ConnectionId, EspGatts, GattsEvent, TransferId};
use esp_idf_svc::bt::ble::gatt::{
    AutoResponse, GattCharacteristic, GattDescriptor, GattId, GattInterface, GattServiceId,
    GattStatus, Handle, Permission, Property,
};
use esp_idf_svc::bt::{BdAddr, Ble, BtDriver, BtStatus, BtUuid};
use esp_idf_svc::sys::{EspError, ESP_FAIL};

use crate::config::*;
use crate::publish::ble::{notify_subscribers, Characteristic, GattNotifier};

type BleDriver = BtDriver<'static, Ble>;
type BleGap = Arc<EspBleGap<'static, Ble, Arc<BleDriver>>>;
type BleGatts = Arc<EspGatts<'static, Ble, Arc<BleDriver>>>;

const CCCD_UUID: u16 = 0x2902;
const CCCD_NOTIFY: u8 = 0x01;
// service + 7 × (declaration + value + CCCD)
const SERVICE_HANDLES: u16 = 1 + 7 * 3;

#[derive(Debug, Clone)]
struct Peer {
    addr: BdAddr,
    conn_id: ConnectionId,
    subscribed: [bool; 7],
}

/// Snapshot of a subscribed peer, taken under the lock.
struct Subscriber {
    addr: BdAddr,
    conn_id: ConnectionId,
}

impl std::fmt::Display for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.addr)
    }
}

#[derive(Default)]
struct State {
    gatt_if: Option<GattInterface>,
    service_handle: Option<Handle>,
    value_handles: [Option<Handle>; 7],
    cccd_handles: [Option<Handle>; 7],
    /// Characteristic whose CCCD is being added.
    pending: Option<Characteristic>,
    peers: heapless::Vec<Peer, BLE_MAX_CONNECTIONS>,
}

#[derive(Clone)]
pub struct GattServer {
    gap: BleGap,
    gatts: BleGatts,
    state: Arc<Mutex<State>>,
}

impl GattServer {
    /// Register the GAP/GATTS callbacks and the application.  Service
    /// creation and advertising continue asynchronously from the callbacks.
    pub fn start(bt: Arc<BleDriver>) -> anyhow::Result<Self> {
        let server = Self {
            gap: Arc::new(EspBleGap::new(bt.clone())?),
            gatts: Arc::new(EspGatts::new(bt)?),
            state: Arc::new(Mutex::new(State::default())),
        };

        let gap_server = server.clone();
        server.gap.subscribe(move |event| {
            gap_server.check_esp_status(gap_server.on_gap_event(event));
        })?;

        let gatts_server = server.clone();
        server.gatts.subscribe(move |(gatt_if, event)| {
            gatts_server.check_esp_status(gatts_server.on_gatts_event(gatt_if, event));
        })?;

        server.gatts.register_app(BLE_APP_ID)?;
        log::info!("BLE GATT app registered");
        Ok(server)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn on_gap_event(&self, event: BleGapEvent) -> Result<(), EspError> {
        log::debug!("GAP event: {:?}", event);
        if let BleGapEvent::AdvertisingConfigured(status) = event {
            self.check_bt_status(status)?;
            self.gap.start_advertising()?;
            log::info!("BLE advertising as '{}'", BLE_DEVICE_NAME);
        }
        Ok(())
    }

    fn on_gatts_event(&self, gatt_if: GattInterface, event: GattsEvent) -> Result<(), EspError> {
        match event {
            GattsEvent::ServiceRegistered { status, app_id } => {
                self.check_gatt_status(status)?;
                if app_id == BLE_APP_ID {
                    self.create_service(gatt_if)?;
                }
            }
            GattsEvent::ServiceCreated {
                status,
                service_handle,
                ..
            } => {
                self.check_gatt_status(status)?;
                self.state().service_handle = Some(service_handle);
                self.gatts.start_service(service_handle)?;
                self.add_characteristic(service_handle, Characteristic::ALL[0])?;
            }
            GattsEvent::CharacteristicAdded {
                status,
                attr_handle,
                service_handle,
                char_uuid,
            } => {
                self.check_gatt_status(status)?;
                self.register_characteristic(service_handle, attr_handle, char_uuid)?;
            }
            GattsEvent::DescriptorAdded {
                status,
                attr_handle,
                service_handle,
                ..
            } => {
                self.check_gatt_status(status)?;
                self.register_cccd(service_handle, attr_handle)?;
            }
            GattsEvent::PeerConnected { conn_id, addr, .. } => {
                self.on_connect(conn_id, addr);
            }
            GattsEvent::PeerDisconnected { addr, .. } => {
                self.on_disconnect(addr)?;
            }
            GattsEvent::Write {
                conn_id,
                trans_id,
                addr,
                handle,
                need_rsp,
                value,
                ..
            } => {
                self.on_write(addr, handle, value);
                if need_rsp {
                    self.respond(gatt_if, conn_id, trans_id)?;
                }
            }
            _ => (),
        }
        Ok(())
    }

    fn create_service(&self, gatt_if: GattInterface) -> Result<(), EspError> {
        self.state().gatt_if = Some(gatt_if);

        self.gap.set_device_name(BLE_DEVICE_NAME)?;
        self.gap.set_adv_conf(&AdvConfiguration {
            include_name: true,
            include_txpower: true,
            min_interval: BLE_PREFERRED_INTERVAL_MIN,
            max_interval: BLE_PREFERRED_INTERVAL_MAX,
            flag: 2,
            service_uuid: Some(BtUuid::uuid128(SERVICE_UUID)),
            ..Default::default()
        })?;

        self.gatts.create_service(
            gatt_if,
            &GattServiceId {
                id: GattId {
                    uuid: BtUuid::uuid128(SERVICE_UUID),
                    inst_id: 0,
                },
                is_primary: true,
            },
            SERVICE_HANDLES,
        )?;
        Ok(())
    }

    fn add_characteristic(&self, service_handle: Handle, characteristic: Characteristic) -> Result<(), EspError> {
        self.gatts.add_characteristic(
            service_handle,
            &GattCharacteristic {
                uuid: BtUuid::uuid128(characteristic.uuid()),
                permissions: enum_set!(Permission::Read),
                properties: enum_set!(Property::Read | Property::Notify),
                max_len: BLE_CHARACTERISTIC_MAX_LEN,
                auto_rsp: AutoResponse::ByGatt,
            },
            b"0",
        )?;
        Ok(())
    }

    fn register_characteristic(
        &self,
        service_handle: Handle,
        attr_handle: Handle,
        char_uuid: BtUuid,
    ) -> Result<(), EspError> {
        let characteristic = {
            let mut state = self.state();
            if state.service_handle != Some(service_handle) {
                return Ok(());
            }
            let Some(characteristic) = Characteristic::ALL
                .into_iter()
                .find(|c| BtUuid::uuid128(c.uuid()) == char_uuid)
            else {
                return Ok(());
            };
            state.value_handles[characteristic.index()] = Some(attr_handle);
            state.pending = Some(characteristic);
            characteristic
        };
        log::debug!("Characteristic {:?} at handle {}", characteristic, attr_handle);

        self.gatts.add_descriptor(
            service_handle,
            &GattDescriptor {
                uuid: BtUuid::uuid16(CCCD_UUID),
                permissions: enum_set!(Permission::Read | Permission::Write),
            },
        )?;
        Ok(())
    }

    fn register_cccd(&self, service_handle: Handle, attr_handle: Handle) -> Result<(), EspError> {
        let next = {
            let mut state = self.state();
            let Some(characteristic) = state.pending.take() else {
                return Ok(());
            };
            state.cccd_handles[characteristic.index()] = Some(attr_handle);
            Characteristic::ALL.get(characteristic.index() + 1).copied()
        };

        match next {
            Some(characteristic) => self.add_characteristic(service_handle, characteristic),
            None => {
                log::info!("BLE service ready ({} characteristics)", Characteristic::ALL.len());
                Ok(())
            }
        }
    }

    fn on_connect(&self, conn_id: ConnectionId, addr: BdAddr) {
        let mut state = self.state();
        let peer = Peer {
            addr,
            conn_id,
            subscribed: [false; 7],
        };
        if state.peers.push(peer).is_ok() {
            log::info!("BLE client connected: {}", addr);
        } else {
            log::warn!("BLE client {} ignored, {} already connected", addr, BLE_MAX_CONNECTIONS);
        }
    }

    /// On-disconnect hook: forget the peer and advertise again.
    fn on_disconnect(&self, addr: BdAddr) -> Result<(), EspError> {
        {
            let mut state = self.state();
            if let Some(index) = state.peers.iter().position(|p| p.addr == addr) {
                state.peers.swap_remove(index);
            }
        }
        log::info!("BLE client disconnected: {}, restarting advertising", addr);
        self.gap.start_advertising()?;
        Ok(())
    }

    fn on_write(&self, addr: BdAddr, handle: Handle, value: &[u8]) {
        let mut state = self.state();
        let Some(index) = state.cccd_handles.iter().position(|h| *h == Some(handle)) else {
            return;
        };
        let enabled = value.first().is_some_and(|b| b & CCCD_NOTIFY != 0);
        if let Some(peer) = state.peers.iter_mut().find(|p| p.addr == addr) {
            peer.subscribed[index] = enabled;
            log::info!(
                "BLE client {} {} {:?}",
                addr,
                if enabled { "subscribed to" } else { "unsubscribed from" },
                Characteristic::ALL[index]
            );
        }
    }

    fn respond(&self, gatt_if: GattInterface, conn_id: ConnectionId, trans_id: TransferId) -> Result<(), EspError> {
        self.gatts
            .send_response(gatt_if, conn_id, trans_id, GattStatus::Ok, None)?;
        Ok(())
    }

    fn check_esp_status(&self, status: Result<(), EspError>) {
        if let Err(e) = status {
            log::warn!("BLE callback error: {:?}", e);
        }
    }

    fn check_bt_status(&self, status: BtStatus) -> Result<(), EspError> {
        if matches!(status, BtStatus::Success) {
            Ok(())
        } else {
            log::warn!("BT status: {:?}", status);
            Err(EspError::from_infallible::<ESP_FAIL>())
        }
    }

    fn check_gatt_status(&self, status: GattStatus) -> Result<(), EspError> {
        if matches!(status, GattStatus::Ok) {
            Ok(())
        } else {
            log::warn!("GATT status: {:?}", status);
            Err(EspError::from_infallible::<ESP_FAIL>())
        }
    }
}

impl GattNotifier for GattServer {
    fn set_and_notify(&mut self, characteristic: Characteristic, value: &[u8]) -> anyhow::Result<()> {
        // Copy out what is needed and release the lock: `notify` can block on
        // the Bluedroid queue while the BTC task waits on this same mutex.
        let (gatt_if, handle, subscribers) = {
            let state = self.state();
            let (Some(gatt_if), Some(handle)) = (state.gatt_if, state.value_handles[characteristic.index()]) else {
                anyhow::bail!("GATT service not ready");
            };
            let subscribers: heapless::Vec<Subscriber, BLE_MAX_CONNECTIONS> = state
                .peers
                .iter()
                .filter(|p| p.subscribed[characteristic.index()])
                .map(|p| Subscriber {
                    addr: p.addr,
                    conn_id: p.conn_id,
                })
                .collect();
            (gatt_if, handle, subscribers)
        };

        self.gatts.set_attr(handle, value)?;
        notify_subscribers(characteristic, subscribers, |subscriber| {
            self.gatts.notify(gatt_if, subscriber.conn_id, handle, value)
        });
        Ok(())
    }
}
