//! Single-peer Just-Works bonding.
//!
//! The remote pairs with one host. A new bond replaces the old one, and
//! every change (keys or CCCD state) is published on [`BOND_UPDATES`] for
//! the storage task to persist.

use core::cell::RefCell;

use defmt::{info, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use heapless::Vec;
use nrf_softdevice::ble::gatt_server;
use nrf_softdevice::ble::security::{IoCapabilities, SecurityHandler};
use nrf_softdevice::ble::{
    Address, AddressType, Connection, EncryptionInfo, IdentityKey, IdentityResolutionKey,
    MasterId, SecurityMode,
};
use nrf_softdevice::raw;
use printer_remote::bond::{BondRecord, MAX_SYS_ATTRS_LEN};

/// Latest bond to persist.
pub static BOND_UPDATES: Signal<CriticalSectionRawMutex, BondRecord> = Signal::new();

#[derive(Clone, Copy)]
struct Peer {
    master_id: MasterId,
    key: EncryptionInfo,
    peer_id: IdentityKey,
}

pub struct Bonder {
    peer: RefCell<Option<Peer>>,
    sys_attrs: RefCell<Vec<u8, MAX_SYS_ATTRS_LEN>>,
}

impl Bonder {
    pub fn new() -> Self {
        Self {
            peer: RefCell::new(None),
            sys_attrs: RefCell::new(Vec::new()),
        }
    }

    /// Restore the bond loaded from flash at boot.
    pub fn restore(&self, record: &BondRecord) {
        let irk = IdentityResolutionKey::from_raw(raw::ble_gap_irk_t { irk: record.irk });
        let addr = Address::new(address_type_from_u8(record.addr_type), record.addr);

        *self.peer.borrow_mut() = Some(Peer {
            master_id: MasterId {
                ediv: record.ediv,
                rand: record.rand,
            },
            key: EncryptionInfo {
                ltk: record.ltk,
                flags: record.ltk_flags,
            },
            peer_id: IdentityKey { irk, addr },
        });
        *self.sys_attrs.borrow_mut() = record.sys_attrs.clone();
        info!("Bond restored");
    }

    /// Snapshot of the current bond, if any.
    pub fn record(&self) -> Option<BondRecord> {
        let peer = (*self.peer.borrow())?;
        Some(BondRecord {
            ediv: peer.master_id.ediv,
            rand: peer.master_id.rand,
            ltk: peer.key.ltk,
            ltk_flags: peer.key.flags,
            irk: peer.peer_id.irk.as_raw().irk,
            addr_type: address_type_to_u8(peer.peer_id.addr.address_type()),
            addr: peer.peer_id.addr.bytes(),
            sys_attrs: self.sys_attrs.borrow().clone(),
        })
    }

    fn is_bonded_peer(&self, conn: &Connection) -> bool {
        self.peer
            .borrow()
            .as_ref()
            .map_or(false, |p| p.peer_id.is_match(conn.peer_address()))
    }

    fn publish(&self) {
        if let Some(record) = self.record() {
            BOND_UPDATES.signal(record);
        }
    }
}

impl SecurityHandler for Bonder {
    fn io_capabilities(&self) -> IoCapabilities {
        IoCapabilities::None
    }

    fn can_bond(&self, _conn: &Connection) -> bool {
        true
    }

    fn on_bonded(
        &self,
        _conn: &Connection,
        master_id: MasterId,
        key: EncryptionInfo,
        peer_id: IdentityKey,
    ) {
        info!("Bonded with host");
        *self.peer.borrow_mut() = Some(Peer {
            master_id,
            key,
            peer_id,
        });
        // A new host starts without subscriptions.
        self.sys_attrs.borrow_mut().clear();
        self.publish();
    }

    fn get_key(&self, _conn: &Connection, master_id: MasterId) -> Option<EncryptionInfo> {
        self.peer
            .borrow()
            .as_ref()
            .and_then(|p| (p.master_id == master_id).then_some(p.key))
    }

    fn on_security_update(&self, _conn: &Connection, mode: SecurityMode) {
        info!("BLE security mode updated: {}", mode);
    }

    fn save_sys_attrs(&self, conn: &Connection) {
        if !self.is_bonded_peer(conn) {
            return;
        }

        let mut buf = [0u8; MAX_SYS_ATTRS_LEN];
        match gatt_server::get_sys_attrs(conn, &mut buf) {
            Ok(len) => {
                let mut attrs = self.sys_attrs.borrow_mut();
                if attrs.as_slice() == &buf[..len] {
                    return;
                }
                attrs.clear();
                let _ = attrs.extend_from_slice(&buf[..len]);
            }
            Err(_) => {
                warn!("Could not read system attributes");
                return;
            }
        }
        self.publish();
    }

    fn load_sys_attrs(&self, conn: &Connection) {
        let attrs = self.sys_attrs.borrow();
        let stored = (self.is_bonded_peer(conn) && !attrs.is_empty()).then_some(attrs.as_slice());
        if gatt_server::set_sys_attrs(conn, stored).is_err() {
            warn!("Could not restore system attributes");
        }
    }
}

fn address_type_to_u8(t: AddressType) -> u8 {
    match t {
        AddressType::Public => 0,
        AddressType::RandomStatic => 1,
        AddressType::RandomPrivateResolvable => 2,
        AddressType::RandomPrivateNonResolvable => 3,
        AddressType::Anonymous => 4,
    }
}

fn address_type_from_u8(b: u8) -> AddressType {
    match b {
        0 => AddressType::Public,
        2 => AddressType::RandomPrivateResolvable,
        3 => AddressType::RandomPrivateNonResolvable,
        4 => AddressType::Anonymous,
        _ => AddressType::RandomStatic,
    }
}
