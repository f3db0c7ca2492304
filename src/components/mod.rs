//! Default host components.

/// Cache component (dynamic dispatch).
pub mod cache;
/// Disk component (dispatch table).
pub mod disk;

pub use cache::Cache;
pub use disk::{Disk, DiskProfile};

use crate::runtime::error::RegistryResult;
use crate::runtime::registry::{ComponentCatalog, ComponentDescriptor, NativeComponent};

/// Register the default component set (`Disk`, `Cache`) into `catalog`.
pub fn register_defaults(catalog: &ComponentCatalog) -> RegistryResult<()> {
    catalog.register_typed(disk::descriptor())?;
    catalog.register_descriptor(
        ComponentDescriptor::new(cache::CACHE, |params| {
            let cache = Cache::from_params(params)?;
            Ok(Box::new(cache) as Box<dyn NativeComponent>)
        })
        .with_params(cache::CACHE_PARAMS),
    )?;
    Ok(())
}
