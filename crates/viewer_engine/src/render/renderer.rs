//! Frame lifecycle owner
//!
//! The renderer owns every Vulkan object and drives the per-frame
//! protocol: wait on the frame slot's fence, acquire, wait out any
//! submission still reading the acquired image, update that image's
//! uniforms, submit, present, advance the slot. Swapchain loss at
//! acquire skips the frame entirely; suboptimal at present recreates
//! after the image is handed off.
//!
//! Field declaration order doubles as teardown order: the
//! swapchain-dependent objects go first, the context last.

use ash::vk;
use std::time::Instant;

use crate::assets::SceneAssets;
use crate::config::ViewerConfig;
use crate::render::uniforms::{CameraUbo, LightUbo};
use crate::render::vulkan::{
    CommandPool, DepthBuffer, DescriptorPool, DescriptorSetLayout, Framebuffer, FrameSync,
    GraphicsPipeline, IndexBuffer, RenderPass, ShaderModule, Swapchain, Texture, UniformBuffer,
    VertexBuffer, VulkanContext, VulkanError, VulkanResult,
};
use crate::render::window::Window;

/// Number of frames the CPU may record ahead of the GPU
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// What to do after an acquire attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Render into the given swapchain image
    Render(u32),
    /// The chain is stale; rebuild it and submit nothing this frame
    RecreateAndSkip,
}

/// What to do after presenting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Nothing further
    Presented,
    /// The image was handed off but the chain should be rebuilt
    Recreate,
}

/// True when the framebuffer has drawable area
///
/// A zero extent means the window is minimized: frames are skipped and
/// the event loop should block until the window is restored instead of
/// spinning.
pub fn has_drawable_extent(width: u32, height: u32) -> bool {
    width > 0 && height > 0
}

/// Classify the result of `acquire_next_image`
///
/// Out-of-date means no usable image exists, so the frame is skipped
/// with zero submissions. A suboptimal-but-successful acquire still
/// yields a usable image and renders normally; the matching present
/// reports suboptimal again and triggers the rebuild.
pub fn classify_acquire(
    result: Result<(u32, bool), vk::Result>,
) -> VulkanResult<AcquireOutcome> {
    match result {
        Ok((image_index, _suboptimal)) => Ok(AcquireOutcome::Render(image_index)),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::RecreateAndSkip),
        Err(err) => Err(VulkanError::Api(err)),
    }
}

/// Classify the result of `queue_present`
///
/// Both suboptimal and out-of-date rebuild the chain; the image was (or
/// may have been) presented either way, so the frame still counts.
pub fn classify_present(result: Result<bool, vk::Result>) -> VulkanResult<PresentOutcome> {
    match result {
        Ok(false) => Ok(PresentOutcome::Presented),
        Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::Recreate),
        Err(err) => Err(VulkanError::Api(err)),
    }
}

/// Owns the Vulkan objects and renders the spinning model
pub struct Renderer {
    // Swapchain-dependent objects, rebuilt on resize.
    descriptor_pool: DescriptorPool,
    descriptor_sets: Vec<vk::DescriptorSet>,
    camera_buffers: Vec<UniformBuffer<CameraUbo>>,
    light_buffers: Vec<UniformBuffer<LightUbo>>,
    framebuffers: Vec<Framebuffer>,
    depth_buffer: DepthBuffer,
    pipeline: GraphicsPipeline,
    render_pass: RenderPass,
    swapchain: Swapchain,

    // Swapchain-independent GPU resources.
    descriptor_set_layout: DescriptorSetLayout,
    texture: Texture,
    vertex_buffer: VertexBuffer,
    index_buffer: IndexBuffer,

    // Frame protocol state.
    command_buffers: Vec<vk::CommandBuffer>,
    frame_sync: Vec<FrameSync>,
    images_in_flight: Vec<vk::Fence>,
    current_frame: usize,
    start_time: Instant,

    // Shader paths are kept so the pipeline can be rebuilt on resize.
    vertex_shader_path: String,
    fragment_shader_path: String,

    command_pool: CommandPool,
    context: VulkanContext,
}

impl Renderer {
    /// Build the full rendering stack for a window and a loaded scene
    pub fn new(
        window: &mut Window,
        config: &ViewerConfig,
        assets: &SceneAssets,
    ) -> VulkanResult<Self> {
        let context = VulkanContext::new(window, &config.window.title, config.validation.enabled)?;
        let device = context.raw_device();

        let command_pool =
            CommandPool::new(device.clone(), context.device.graphics_family)?;

        let vertex_buffer = VertexBuffer::new(
            device.clone(),
            context.instance(),
            context.physical_device.device,
            &command_pool,
            context.graphics_queue(),
            &assets.mesh.vertices,
        )?;
        let index_buffer = IndexBuffer::new(
            device.clone(),
            context.instance(),
            context.physical_device.device,
            &command_pool,
            context.graphics_queue(),
            &assets.mesh.indices,
        )?;
        let texture = Texture::new(
            device.clone(),
            context.instance(),
            context.physical_device.device,
            &command_pool,
            context.graphics_queue(),
            &assets.texture,
            context.physical_device.max_sampler_anisotropy(),
        )?;

        let descriptor_set_layout = DescriptorSetLayout::new(device.clone())?;

        let (width, height) = window.framebuffer_size();
        let swapchain = Swapchain::new(
            context.instance(),
            device.clone(),
            context.surface(),
            context.surface_loader(),
            &context.physical_device,
            vk::Extent2D { width, height },
        )?;

        let (render_pass, pipeline, depth_buffer, framebuffers) = Self::build_swapchain_targets(
            &context,
            &swapchain,
            &descriptor_set_layout,
            &config.shaders.vertex,
            &config.shaders.fragment,
        )?;

        let (camera_buffers, light_buffers) =
            Self::build_uniform_buffers(&context, swapchain.image_count())?;

        let descriptor_pool =
            DescriptorPool::new(device.clone(), swapchain.image_count() as u32)?;
        let descriptor_sets = descriptor_pool.allocate_per_image_sets(
            descriptor_set_layout.handle(),
            &camera_buffers,
            &light_buffers,
            &texture,
        )?;

        let command_buffers =
            command_pool.allocate_command_buffers(swapchain.image_count() as u32)?;
        Self::record_command_buffers(
            &device,
            &command_buffers,
            &render_pass,
            &pipeline,
            &framebuffers,
            swapchain.extent(),
            &vertex_buffer,
            &index_buffer,
            &descriptor_sets,
        )?;

        let frame_sync = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|_| FrameSync::new(device.clone()))
            .collect::<VulkanResult<Vec<_>>>()?;
        let images_in_flight = vec![vk::Fence::null(); swapchain.image_count()];

        log::info!(
            "Renderer ready: {} swapchain images, {} frames in flight",
            swapchain.image_count(),
            MAX_FRAMES_IN_FLIGHT
        );

        Ok(Self {
            descriptor_pool,
            descriptor_sets,
            camera_buffers,
            light_buffers,
            framebuffers,
            depth_buffer,
            pipeline,
            render_pass,
            swapchain,
            descriptor_set_layout,
            texture,
            vertex_buffer,
            index_buffer,
            command_buffers,
            frame_sync,
            images_in_flight,
            current_frame: 0,
            start_time: Instant::now(),
            vertex_shader_path: config.shaders.vertex.clone(),
            fragment_shader_path: config.shaders.fragment.clone(),
            command_pool,
            context,
        })
    }

    /// Render and present one frame
    ///
    /// Returns without submitting anything when the window has a zero
    /// extent or the swapchain is out of date at acquire.
    pub fn draw_frame(&mut self, window: &Window) -> VulkanResult<()> {
        let (width, height) = window.framebuffer_size();
        if !has_drawable_extent(width, height) {
            return Ok(());
        }

        let device = self.context.raw_device();
        self.frame_sync[self.current_frame].in_flight.wait(u64::MAX)?;

        let acquire_result = unsafe {
            self.swapchain.loader().acquire_next_image(
                self.swapchain.handle(),
                u64::MAX,
                self.frame_sync[self.current_frame].image_available.handle(),
                vk::Fence::null(),
            )
        };
        let image_index = match classify_acquire(acquire_result)? {
            AcquireOutcome::Render(index) => index as usize,
            AcquireOutcome::RecreateAndSkip => {
                self.recreate_swapchain(window)?;
                return Ok(());
            }
        };

        // A previous frame slot may still be rendering to this image.
        if self.images_in_flight[image_index] != vk::Fence::null() {
            unsafe {
                device
                    .wait_for_fences(&[self.images_in_flight[image_index]], true, u64::MAX)
                    .map_err(VulkanError::Api)?;
            }
        }
        self.images_in_flight[image_index] =
            self.frame_sync[self.current_frame].in_flight.handle();

        // Safe to write: nothing on the GPU reads this image's uniforms now.
        let elapsed = self.start_time.elapsed().as_secs_f32();
        self.camera_buffers[image_index]
            .update(&CameraUbo::at_time(elapsed, self.swapchain.extent()))?;

        self.frame_sync[self.current_frame].in_flight.reset()?;

        let wait_semaphores = [self.frame_sync[self.current_frame].image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let signal_semaphores = [self.frame_sync[self.current_frame].render_finished.handle()];
        let submit_buffers = [self.command_buffers[image_index]];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&submit_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            device
                .queue_submit(
                    self.context.graphics_queue(),
                    &[submit_info.build()],
                    self.frame_sync[self.current_frame].in_flight.handle(),
                )
                .map_err(VulkanError::Api)?;
        }

        let swapchains = [self.swapchain.handle()];
        let image_indices = [image_index as u32];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let present_result = unsafe {
            self.swapchain
                .loader()
                .queue_present(self.context.present_queue(), &present_info)
        };
        if classify_present(present_result)? == PresentOutcome::Recreate {
            self.recreate_swapchain(window)?;
        }

        self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;
        Ok(())
    }

    /// Rebuild everything derived from the swapchain
    pub fn recreate_swapchain(&mut self, window: &Window) -> VulkanResult<()> {
        let (width, height) = window.framebuffer_size();
        if !has_drawable_extent(width, height) {
            // Minimized; the next nonzero-size frame will rebuild.
            return Ok(());
        }

        self.context.wait_idle();
        log::debug!("Recreating swapchain at {}x{}", width, height);

        let device = self.context.raw_device();

        // The new chain is built against the old handle before the old
        // object drops, so the driver can retire it cleanly.
        let new_swapchain = Swapchain::recreate(
            self.context.instance(),
            device.clone(),
            self.context.surface(),
            self.context.surface_loader(),
            &self.context.physical_device,
            vk::Extent2D { width, height },
            self.swapchain.handle(),
        )?;
        self.swapchain = new_swapchain;

        let (render_pass, pipeline, depth_buffer, framebuffers) = Self::build_swapchain_targets(
            &self.context,
            &self.swapchain,
            &self.descriptor_set_layout,
            &self.vertex_shader_path,
            &self.fragment_shader_path,
        )?;
        self.render_pass = render_pass;
        self.pipeline = pipeline;
        self.depth_buffer = depth_buffer;
        self.framebuffers = framebuffers;

        let (camera_buffers, light_buffers) =
            Self::build_uniform_buffers(&self.context, self.swapchain.image_count())?;
        self.camera_buffers = camera_buffers;
        self.light_buffers = light_buffers;

        self.descriptor_pool =
            DescriptorPool::new(device.clone(), self.swapchain.image_count() as u32)?;
        self.descriptor_sets = self.descriptor_pool.allocate_per_image_sets(
            self.descriptor_set_layout.handle(),
            &self.camera_buffers,
            &self.light_buffers,
            &self.texture,
        )?;

        self.command_pool.free_command_buffers(&self.command_buffers);
        self.command_buffers = self
            .command_pool
            .allocate_command_buffers(self.swapchain.image_count() as u32)?;
        Self::record_command_buffers(
            &device,
            &self.command_buffers,
            &self.render_pass,
            &self.pipeline,
            &self.framebuffers,
            self.swapchain.extent(),
            &self.vertex_buffer,
            &self.index_buffer,
            &self.descriptor_sets,
        )?;

        // Old image/fence associations are void with the new chain.
        self.images_in_flight = vec![vk::Fence::null(); self.swapchain.image_count()];

        Ok(())
    }

    /// Block until the device finishes all submitted work
    pub fn wait_idle(&self) {
        self.context.wait_idle();
    }

    fn build_swapchain_targets(
        context: &VulkanContext,
        swapchain: &Swapchain,
        descriptor_set_layout: &DescriptorSetLayout,
        vertex_shader_path: &str,
        fragment_shader_path: &str,
    ) -> VulkanResult<(RenderPass, GraphicsPipeline, DepthBuffer, Vec<Framebuffer>)> {
        let device = context.raw_device();

        let render_pass = RenderPass::new(device.clone(), swapchain.format().format)?;

        let vertex_shader = ShaderModule::from_file(device.clone(), vertex_shader_path)?;
        let fragment_shader = ShaderModule::from_file(device.clone(), fragment_shader_path)?;
        let pipeline = GraphicsPipeline::new(
            device.clone(),
            render_pass.handle(),
            descriptor_set_layout.handle(),
            &vertex_shader,
            &fragment_shader,
            swapchain.extent(),
        )?;

        let depth_buffer = DepthBuffer::new(
            device.clone(),
            context.instance(),
            context.physical_device.device,
            swapchain.extent(),
        )?;

        let framebuffers = swapchain
            .image_views()
            .iter()
            .map(|&view| {
                Framebuffer::new(
                    device.clone(),
                    render_pass.handle(),
                    &[view, depth_buffer.image_view()],
                    swapchain.extent(),
                )
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        Ok((render_pass, pipeline, depth_buffer, framebuffers))
    }

    fn build_uniform_buffers(
        context: &VulkanContext,
        image_count: usize,
    ) -> VulkanResult<(
        Vec<UniformBuffer<CameraUbo>>,
        Vec<UniformBuffer<LightUbo>>,
    )> {
        let device = context.raw_device();

        let camera_buffers = (0..image_count)
            .map(|_| {
                UniformBuffer::<CameraUbo>::new(
                    device.clone(),
                    context.instance(),
                    context.physical_device.device,
                )
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        // The light is static, so each copy is written once up front.
        let light = LightUbo::scene_light();
        let light_buffers = (0..image_count)
            .map(|_| {
                let buffer = UniformBuffer::<LightUbo>::new(
                    device.clone(),
                    context.instance(),
                    context.physical_device.device,
                )?;
                buffer.update(&light)?;
                Ok(buffer)
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        Ok((camera_buffers, light_buffers))
    }

    #[allow(clippy::too_many_arguments)]
    fn record_command_buffers(
        device: &ash::Device,
        command_buffers: &[vk::CommandBuffer],
        render_pass: &RenderPass,
        pipeline: &GraphicsPipeline,
        framebuffers: &[Framebuffer],
        extent: vk::Extent2D,
        vertex_buffer: &VertexBuffer,
        index_buffer: &IndexBuffer,
        descriptor_sets: &[vk::DescriptorSet],
    ) -> VulkanResult<()> {
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: [0.0, 0.0, 0.0, 1.0],
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];

        for (i, &command_buffer) in command_buffers.iter().enumerate() {
            let begin_info = vk::CommandBufferBeginInfo::builder();
            unsafe {
                device
                    .begin_command_buffer(command_buffer, &begin_info)
                    .map_err(VulkanError::Api)?;
            }

            let render_pass_info = vk::RenderPassBeginInfo::builder()
                .render_pass(render_pass.handle())
                .framebuffer(framebuffers[i].handle())
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent,
                })
                .clear_values(&clear_values);

            unsafe {
                device.cmd_begin_render_pass(
                    command_buffer,
                    &render_pass_info,
                    vk::SubpassContents::INLINE,
                );
                device.cmd_bind_pipeline(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    pipeline.handle(),
                );
                device.cmd_bind_vertex_buffers(
                    command_buffer,
                    0,
                    &[vertex_buffer.handle()],
                    &[0],
                );
                device.cmd_bind_index_buffer(
                    command_buffer,
                    index_buffer.handle(),
                    0,
                    vk::IndexType::UINT32,
                );
                device.cmd_bind_descriptor_sets(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    pipeline.layout(),
                    0,
                    &[descriptor_sets[i]],
                    &[],
                );
                device.cmd_draw_indexed(command_buffer, index_buffer.index_count(), 1, 0, 0, 0);
                device.cmd_end_render_pass(command_buffer);
                device
                    .end_command_buffer(command_buffer)
                    .map_err(VulkanError::Api)?;
            }
        }

        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // Every owned object is destroyed by its own Drop in field order;
        // the device just needs to be quiet first.
        self.context.wait_idle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_date_acquire_skips_the_frame() {
        let outcome = classify_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap();
        assert_eq!(outcome, AcquireOutcome::RecreateAndSkip);
    }

    #[test]
    fn test_suboptimal_acquire_still_renders() {
        let outcome = classify_acquire(Ok((3, true))).unwrap();
        assert_eq!(outcome, AcquireOutcome::Render(3));
    }

    #[test]
    fn test_acquire_device_loss_is_fatal() {
        let outcome = classify_acquire(Err(vk::Result::ERROR_DEVICE_LOST));
        assert!(matches!(
            outcome,
            Err(VulkanError::Api(vk::Result::ERROR_DEVICE_LOST))
        ));
    }

    #[test]
    fn test_suboptimal_present_recreates_after_handoff() {
        assert_eq!(classify_present(Ok(true)).unwrap(), PresentOutcome::Recreate);
        assert_eq!(
            classify_present(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(),
            PresentOutcome::Recreate
        );
    }

    #[test]
    fn test_clean_present_needs_no_action() {
        assert_eq!(classify_present(Ok(false)).unwrap(), PresentOutcome::Presented);
    }

    #[test]
    fn test_present_surface_loss_is_fatal() {
        let outcome = classify_present(Err(vk::Result::ERROR_SURFACE_LOST_KHR));
        assert!(matches!(
            outcome,
            Err(VulkanError::Api(vk::Result::ERROR_SURFACE_LOST_KHR))
        ));
    }

    #[test]
    fn test_at_least_two_frames_in_flight() {
        assert!(MAX_FRAMES_IN_FLIGHT >= 2);
    }

    #[test]
    fn test_zero_extent_is_not_drawable() {
        // A minimized window must block on events rather than render.
        assert!(!has_drawable_extent(0, 0));
        assert!(!has_drawable_extent(0, 600));
        assert!(!has_drawable_extent(800, 0));
        assert!(has_drawable_extent(800, 600));
    }
}
