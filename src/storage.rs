//! Persistent storage for the host bond.
//!
//! Uses the nRF52840's internal flash via `sequential-storage` crate so the
//! bond survives System OFF (which resets the chip). The record is one map
//! item; `sequential-storage` handles wear levelling and GC of the pages.

use crate::ble::bonder::BOND_UPDATES;
use crate::error::Error;
use defmt::{error, info};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use nrf_softdevice::Flash;
use printer_remote::bond::{BondRecord, MAX_BOND_RECORD_SIZE};
use printer_remote::config::{STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};

/// Flash page size for nRF52840 (4 KB).
const FLASH_PAGE_SIZE: u32 = 4096;

/// Start address of our storage region.
const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;

/// End address (exclusive) of our storage region.
const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

/// Key for the bond record in the map storage.
const KEY_BOND: u8 = 0x02;

/// Scratch buffer: record plus `sequential-storage` item overhead.
const BUF_SIZE: usize = MAX_BOND_RECORD_SIZE + 32;

static FLUSH_REQUEST: Signal<CriticalSectionRawMutex, ()> = Signal::new();
static FLUSHED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Wait until every bond change published so far is in flash.
pub async fn flush() {
    FLUSHED.reset();
    FLUSH_REQUEST.signal(());
    FLUSHED.wait().await;
}

/// Read the stored bond, if there is a valid one.
pub async fn load_bond(
    flash: &mut impl embedded_storage_async::nor_flash::NorFlash,
) -> Option<BondRecord> {
    let mut buf = [0u8; BUF_SIZE];

    match sequential_storage::map::fetch_item::<u8, &[u8], _>(
        flash,
        STORAGE_START..STORAGE_END,
        &mut sequential_storage::cache::NoCache::new(),
        &mut buf,
        &KEY_BOND,
    )
    .await
    {
        Ok(Some(data)) => {
            let record = BondRecord::deserialize(data);
            match record {
                Some(_) => info!("Loaded bond from flash"),
                None => error!("Stored bond is not readable, ignoring it"),
            }
            record
        }
        Ok(None) => {
            info!("No bond in flash");
            None
        }
        Err(e) => {
            error!("Flash read error: {:?}", defmt::Debug2Format(&e));
            None
        }
    }
}

/// Write `record` to flash, replacing the previous one.
pub async fn save_bond(
    flash: &mut impl embedded_storage_async::nor_flash::NorFlash,
    record: &BondRecord,
) -> Result<(), Error> {
    let mut data_buf = [0u8; MAX_BOND_RECORD_SIZE];
    let len = record.serialize(&mut data_buf);
    if len == 0 {
        return Err(Error::BufferOverflow);
    }
    let item = &data_buf[..len];

    let mut buf = [0u8; BUF_SIZE];
    sequential_storage::map::store_item::<u8, &[u8], _>(
        flash,
        STORAGE_START..STORAGE_END,
        &mut sequential_storage::cache::NoCache::new(),
        &mut buf,
        &KEY_BOND,
        &item,
    )
    .await
    .map_err(|e| {
        error!("Flash write error: {:?}", defmt::Debug2Format(&e));
        Error::Storage
    })
}

async fn store(flash: &mut Flash, record: &BondRecord) {
    match save_bond(flash, record).await {
        Ok(()) => info!("Bond saved to flash"),
        Err(e) => error!("Bond not saved: {}", e),
    }
}

/// Persists every bond change published by the bonder and answers
/// [`flush`] requests.
#[embassy_executor::task]
pub async fn bond_store_task(mut flash: Flash) -> ! {
    loop {
        match select(BOND_UPDATES.wait(), FLUSH_REQUEST.wait()).await {
            Either::First(record) => store(&mut flash, &record).await,
            Either::Second(()) => {
                if let Some(record) = BOND_UPDATES.try_take() {
                    store(&mut flash, &record).await;
                }
                FLUSHED.signal(());
            }
        }
    }
}
