use common::Sku;
use document_store::KeyedLocks;

/// One async mutex per SKU.
///
/// Every read-modify-write of a SKU's stock or lock entry runs while holding
/// that SKU's guard. Guards for different SKUs are independent, and a SKU's
/// entry is dropped once nobody holds or waits for it.
pub type SkuLocks = KeyedLocks<Sku>;
