//! Built-in integrations.

pub mod halo;
pub mod hue;

use crate::services::descriptor_registry::DescriptorRegistry;

/// Register every built-in integration descriptor.
pub fn register_builtin(registry: &mut DescriptorRegistry) {
    registry.register(hue::descriptor());
    registry.register(halo::descriptor());
}
