//! Vulkan swapchain management
//!
//! Owns the presentable image chain and its per-image views. Selection of
//! format, present mode, extent and image count lives in free functions
//! so the policies can be tested without a device.

use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device, Instance};

use crate::render::vulkan::{PhysicalDeviceInfo, VulkanError, VulkanResult};

/// Prefer 8-bit sRGB with the sRGB-nonlinear color space, else the first
/// reported format. Deterministic for a given input list.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    formats
        .iter()
        .find(|sf| {
            sf.format == vk::Format::B8G8R8A8_SRGB
                && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .copied()
        .unwrap_or(formats[0])
}

/// Prefer FIFO (vsync'd, the only mode Vulkan guarantees), else
/// fall back to the first reported mode.
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    modes
        .iter()
        .copied()
        .find(|&mode| mode == vk::PresentModeKHR::FIFO)
        .unwrap_or(modes[0])
}

/// Use the surface's current extent unless it reports the "undefined"
/// sentinel, in which case clamp the framebuffer size into the surface's
/// min/max bounds.
pub fn choose_swap_extent(
    caps: &vk::SurfaceCapabilitiesKHR,
    window_extent: vk::Extent2D,
) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: window_extent
                .width
                .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: window_extent
                .height
                .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }
}

/// One more image than the minimum so the driver never blocks acquire,
/// clamped to the maximum when the surface bounds it (zero = unbounded).
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = caps.min_image_count + 1;
    if caps.max_image_count > 0 {
        count.min(caps.max_image_count)
    } else {
        count
    }
}

/// Swapchain wrapper with RAII cleanup
///
/// Images are owned by the chain itself; the views are owned here and
/// destroyed together with the chain.
pub struct Swapchain {
    device: Device,
    swapchain_loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a new swapchain for the surface
    pub fn new(
        instance: &Instance,
        device: Device,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
        physical_device: &PhysicalDeviceInfo,
        window_extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        Self::build(
            instance,
            device,
            surface,
            surface_loader,
            physical_device,
            window_extent,
            vk::SwapchainKHR::null(),
        )
    }

    /// Create a replacement chain against the old handle
    ///
    /// The old swapchain must still be alive when this is called; the
    /// driver retires it once the new chain exists.
    pub fn recreate(
        instance: &Instance,
        device: Device,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
        physical_device: &PhysicalDeviceInfo,
        window_extent: vk::Extent2D,
        old_swapchain: vk::SwapchainKHR,
    ) -> VulkanResult<Self> {
        Self::build(
            instance,
            device,
            surface,
            surface_loader,
            physical_device,
            window_extent,
            old_swapchain,
        )
    }

    fn build(
        instance: &Instance,
        device: Device,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
        physical_device: &PhysicalDeviceInfo,
        window_extent: vk::Extent2D,
        old_swapchain: vk::SwapchainKHR,
    ) -> VulkanResult<Self> {
        let swapchain_loader = SwapchainLoader::new(instance, &device);

        let caps = unsafe {
            surface_loader
                .get_physical_device_surface_capabilities(physical_device.device, surface)
                .map_err(VulkanError::Api)?
        };
        let formats = unsafe {
            surface_loader
                .get_physical_device_surface_formats(physical_device.device, surface)
                .map_err(VulkanError::Api)?
        };
        let present_modes = unsafe {
            surface_loader
                .get_physical_device_surface_present_modes(physical_device.device, surface)
                .map_err(VulkanError::Api)?
        };

        let format = choose_surface_format(&formats);
        let present_mode = choose_present_mode(&present_modes);
        let extent = choose_swap_extent(&caps, window_extent);
        let image_count = choose_image_count(&caps);

        log::info!(
            "Swapchain: {:?}/{:?}, {}x{}, {} images, {:?}",
            format.format,
            format.color_space,
            extent.width,
            extent.height,
            image_count,
            present_mode
        );

        // Graphics and present families may differ; concurrent sharing
        // avoids ownership transfers in that case.
        let family_indices = [
            physical_device.graphics_family,
            physical_device.present_family,
        ];
        let (sharing_mode, queue_family_indices): (vk::SharingMode, &[u32]) =
            if physical_device.graphics_family == physical_device.present_family {
                (vk::SharingMode::EXCLUSIVE, &[])
            } else {
                (vk::SharingMode::CONCURRENT, &family_indices)
            };

        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(queue_family_indices)
            .pre_transform(caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain);

        let swapchain = unsafe {
            swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        let images = unsafe {
            swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(VulkanError::Api)?
        };

        let image_views: Result<Vec<_>, _> = images
            .iter()
            .map(|&image| {
                let create_info = vk::ImageViewCreateInfo::builder()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(format.format)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });
                unsafe { device.create_image_view(&create_info, None) }
            })
            .collect();
        let image_views = image_views.map_err(VulkanError::Api)?;

        Ok(Self {
            device,
            swapchain_loader,
            swapchain,
            images,
            image_views,
            format,
            extent,
        })
    }

    /// Swapchain extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Surface format
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// Per-image views
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Number of images in the chain
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Swapchain extension loader
    pub fn loader(&self) -> &SwapchainLoader {
        &self.swapchain_loader
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &image_view in &self.image_views {
                self.device.destroy_image_view(image_view, None);
            }
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR { format, color_space }
    }

    fn caps_with_extents(
        current: vk::Extent2D,
        min: vk::Extent2D,
        max: vk::Extent2D,
    ) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            current_extent: current,
            min_image_extent: min,
            max_image_extent: max,
            ..Default::default()
        }
    }

    #[test]
    fn test_preferred_format_wins_regardless_of_position() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::R5G6B5_UNORM_PACK16, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let chosen = choose_surface_format(&formats);
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_SRGB);
        assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn test_format_selection_is_idempotent() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
        ];
        let first = choose_surface_format(&formats);
        let second = choose_surface_format(&formats);
        assert_eq!(first.format, second.format);
        assert_eq!(first.color_space, second.color_space);
        // No preferred entry: falls back to the first.
        assert_eq!(first.format, vk::Format::R8G8B8A8_UNORM);
    }

    #[test]
    fn test_fifo_preferred_regardless_of_order() {
        let modes = [
            vk::PresentModeKHR::MAILBOX,
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::FIFO,
        ];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_present_mode_is_always_a_member_of_the_input() {
        let modes = [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE];
        let chosen = choose_present_mode(&modes);
        assert!(modes.contains(&chosen));
        assert_eq!(chosen, vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn test_current_extent_is_honored_when_defined() {
        let caps = caps_with_extents(
            vk::Extent2D { width: 640, height: 480 },
            vk::Extent2D { width: 1, height: 1 },
            vk::Extent2D { width: 4096, height: 4096 },
        );
        let extent = choose_swap_extent(&caps, vk::Extent2D { width: 800, height: 600 });
        assert_eq!(extent.width, 640);
        assert_eq!(extent.height, 480);
    }

    #[test]
    fn test_undefined_extent_uses_clamped_framebuffer_size() {
        // The u32::MAX sentinel means the surface has no fixed extent.
        let caps = caps_with_extents(
            vk::Extent2D { width: u32::MAX, height: u32::MAX },
            vk::Extent2D { width: 100, height: 100 },
            vk::Extent2D { width: 1024, height: 768 },
        );

        // 800x600 falls inside the bounds and passes through.
        let extent = choose_swap_extent(&caps, vk::Extent2D { width: 800, height: 600 });
        assert_eq!((extent.width, extent.height), (800, 600));

        // Out-of-range sizes clamp to the reported bounds.
        let small = choose_swap_extent(&caps, vk::Extent2D { width: 1, height: 1 });
        assert_eq!((small.width, small.height), (100, 100));
        let large = choose_swap_extent(&caps, vk::Extent2D { width: 9999, height: 9999 });
        assert_eq!((large.width, large.height), (1024, 768));
    }

    #[test]
    fn test_image_count_is_min_plus_one_clamped_by_max() {
        let mut caps = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 3,
            ..Default::default()
        };
        assert_eq!(choose_image_count(&caps), 3);

        caps.max_image_count = 2;
        assert_eq!(choose_image_count(&caps), 2);

        // Zero max means the surface does not bound the count.
        caps.min_image_count = 4;
        caps.max_image_count = 0;
        assert_eq!(choose_image_count(&caps), 5);
    }
}
