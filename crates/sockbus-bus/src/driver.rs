//! Backend selection. The concrete adapter is chosen once at startup
//! from settings; everything downstream sees only `Arc<dyn Bus>`.

use std::sync::Arc;

use sockbus_core::ConnectError;
use sockbus_settings::{BusKind, BusSettings};

use crate::{Bus, MemoryBus, NatsBus, RedisBus};

/// Construct the configured bus driver. Failure here is process-fatal;
/// there is no gateway without a bus.
pub async fn connect(settings: &BusSettings) -> Result<Arc<dyn Bus>, ConnectError> {
    let bus: Arc<dyn Bus> = match settings.driver {
        BusKind::Memory => Arc::new(MemoryBus::new(settings.delivery_buffer)),
        BusKind::Redis => Arc::new(
            RedisBus::connect(&settings.redis_url, settings.delivery_buffer).await?,
        ),
        BusKind::Nats => {
            Arc::new(NatsBus::connect(&settings.nats_url, settings.delivery_buffer).await?)
        }
    };
    tracing::info!(driver = settings.driver.as_str(), "bus driver ready");
    Ok(bus)
}
