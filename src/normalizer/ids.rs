use chrono::Utc;

use crate::schemas::ItemKind;

/// Source of durable item and thread ids.
pub trait ItemIdGenerator: Send + Sync {
    fn generate_item_id(&self, kind: ItemKind, thread_id: &str) -> String;

    fn generate_thread_id(&self) -> String;
}

/// Generates `cthi_{unix_millis}_{6 hex}` item ids and `cthr_{12 hex}`
/// thread ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIdGenerator;

fn random_hex(len: usize) -> String {
    let mut hex = uuid::Uuid::new_v4().simple().to_string();
    hex.truncate(len);
    hex
}

impl ItemIdGenerator for DefaultIdGenerator {
    fn generate_item_id(&self, _kind: ItemKind, _thread_id: &str) -> String {
        format!("cthi_{}_{}", Utc::now().timestamp_millis(), random_hex(6))
    }

    fn generate_thread_id(&self) -> String {
        format!("cthr_{}", random_hex(12))
    }
}
