//! Graphics context owning the wgpu device.
//!
//! Unlike a process-wide singleton, a [`GpuContext`] is created by whoever
//! owns the render loop and passed down explicitly. Atlases and renderers keep
//! an `Arc` to its [`GpuResources`].

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{RenderError, RenderResult};
use crate::logging::targets;

/// Configuration options for graphics context initialization.
#[derive(Debug, Clone)]
pub struct GraphicsConfig {
    /// Preferred GPU backends to use.
    pub backends: wgpu::Backends,
    /// Power preference for adapter selection.
    pub power_preference: wgpu::PowerPreference,
    /// Required device features.
    pub required_features: wgpu::Features,
    /// Required device limits.
    pub required_limits: wgpu::Limits,
    /// Enable debug validation layers.
    pub debug_validation: bool,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::PRIMARY,
            power_preference: wgpu::PowerPreference::LowPower,
            required_features: wgpu::Features::empty(),
            required_limits: if cfg!(target_arch = "wasm32") {
                wgpu::Limits::downlevel_webgl2_defaults()
            } else {
                wgpu::Limits::default()
            },
            debug_validation: cfg!(debug_assertions),
        }
    }
}

impl GraphicsConfig {
    /// Set the backends to try.
    pub fn backends(mut self, backends: wgpu::Backends) -> Self {
        self.backends = backends;
        self
    }

    /// Set the adapter power preference.
    pub fn power_preference(mut self, preference: wgpu::PowerPreference) -> Self {
        self.power_preference = preference;
        self
    }
}

/// Device, queue and the objects they came from.
#[derive(Debug)]
pub struct GpuResources {
    /// The wgpu instance.
    pub instance: wgpu::Instance,
    /// The selected adapter.
    pub adapter: wgpu::Adapter,
    /// The logical device.
    pub device: wgpu::Device,
    /// The command queue.
    pub queue: wgpu::Queue,
}

impl GpuResources {
    fn new(config: &GraphicsConfig) -> RenderResult<Self> {
        let flags = if config.debug_validation {
            wgpu::InstanceFlags::debugging()
        } else {
            wgpu::InstanceFlags::empty()
        };

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: config.backends,
            flags,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: config.power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(RenderError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        info!(
            target: targets::GPU,
            name = adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            "selected graphics adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("strata-text-device"),
                required_features: config.required_features,
                required_limits: config.required_limits.clone(),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
            },
            None,
        ))?;

        debug!(target: targets::GPU, "created graphics device and queue");

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }
}

/// Owner of the GPU device used for glyph atlases and text drawing.
///
/// # Example
///
/// ```no_run
/// use strata_text::gpu::{GpuContext, GraphicsConfig};
///
/// let gpu = GpuContext::new(GraphicsConfig::default()).unwrap();
/// println!("{}", gpu.adapter_info().name);
/// ```
pub struct GpuContext {
    resources: Arc<GpuResources>,
    config: GraphicsConfig,
}

impl GpuContext {
    /// Select an adapter and create a device.
    ///
    /// # Errors
    ///
    /// Returns an error if no suitable adapter was found or device creation
    /// failed.
    pub fn new(config: GraphicsConfig) -> RenderResult<Self> {
        let resources = GpuResources::new(&config)?;
        Ok(Self {
            resources: Arc::new(resources),
            config,
        })
    }

    /// The logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.resources.device
    }

    /// The command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.resources.queue
    }

    /// Shared handle to the device and queue.
    pub fn resources(&self) -> Arc<GpuResources> {
        Arc::clone(&self.resources)
    }

    /// The configuration used to create this context.
    pub fn config(&self) -> &GraphicsConfig {
        &self.config
    }

    /// Information about the graphics adapter.
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.resources.adapter.get_info()
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let info = self.adapter_info();
        f.debug_struct("GpuContext")
            .field("adapter", &info.name)
            .field("backend", &info.backend)
            .field("device_type", &info.device_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphics_config_builder() {
        let config = GraphicsConfig::default()
            .backends(wgpu::Backends::VULKAN)
            .power_preference(wgpu::PowerPreference::HighPerformance);
        assert_eq!(config.backends, wgpu::Backends::VULKAN);
        assert_eq!(config.power_preference, wgpu::PowerPreference::HighPerformance);
    }

    #[test]
    #[ignore = "requires GPU"]
    fn test_context_creation() {
        let gpu = GpuContext::new(GraphicsConfig::default()).unwrap();
        assert!(gpu.device().limits().max_texture_array_layers >= 1);
    }
}
